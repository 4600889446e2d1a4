use serde::Deserialize;

use crate::error::MigrationModelError;
use crate::model::MigrationModel;

/// Raw, unvalidated model settings, as they appear in YAML input.
///
/// All validation is delayed until conversion into a
/// [`MigrationModel`]; the settings themselves only require the
/// fields to parse.
///
/// ```
/// let yaml = "
/// name: island_model
/// pop_sizes: [1.0, 4.0]
/// rate_matrix: [0.2, 0.05]
/// rate_flags: [true, true]
/// ";
/// let settings: demes_migration::MigrationModelSettings =
///     serde_yaml::from_str(yaml).unwrap();
/// let model = demes_migration::MigrationModel::try_from(settings).unwrap();
/// assert_eq!(model.name(), "island_model");
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationModelSettings {
    /// Effective population size per deme; the length fixes the deme
    /// count.
    pub pop_sizes: Vec<f64>,
    /// Packed migration rate vector; the length selects the layout.
    pub rate_matrix: Vec<f64>,
    /// Optional per-slot indicator flags.
    #[serde(default)]
    pub rate_flags: Option<Vec<bool>>,
    /// Optional model name, used as the trace-log column prefix.
    #[serde(default)]
    pub name: Option<String>,
}

impl TryFrom<MigrationModelSettings> for MigrationModel {
    type Error = MigrationModelError;

    fn try_from(settings: MigrationModelSettings) -> Result<Self, Self::Error> {
        let model = MigrationModel::new(
            settings.rate_matrix,
            settings.pop_sizes,
            settings.rate_flags,
        )?;
        Ok(match settings.name {
            Some(name) => model.with_name(name),
            None => model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_settings_parse() {
        let yaml = "
pop_sizes: [7.0, 7.0]
rate_matrix: [0.1, 0.1]
";
        let settings: MigrationModelSettings = serde_yaml::from_str(yaml).unwrap();
        assert!(settings.rate_flags.is_none());
        assert!(settings.name.is_none());
        let model = MigrationModel::try_from(settings).unwrap();
        assert_eq!(model.name(), "migModel");
        assert_eq!(model.num_demes(), 2);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = "
pop_sizes: [7.0, 7.0]
rate_matrix: [0.1, 0.1]
generation_time: 25
";
        assert!(serde_yaml::from_str::<MigrationModelSettings>(yaml).is_err());
    }

    #[test]
    fn flag_length_mismatch_is_fatal() {
        let yaml = "
pop_sizes: [7.0, 7.0]
rate_matrix: [0.1, 0.1]
rate_flags: [true]
";
        let settings: MigrationModelSettings = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            MigrationModel::try_from(settings),
            Err(MigrationModelError::FlagError(_))
        ));
    }
}
