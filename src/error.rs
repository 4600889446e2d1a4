use thiserror::Error;

/// Error type for this crate.
///
/// Construction is the only fallible part of the model: a rate vector
/// whose length matches none of the recognized layouts, an indicator
/// flag vector of the wrong length, or out-of-domain parameter values
/// all abort initialization.  There is no partial or degraded mode.
///
/// # Example
///
/// Two demes admit rate vectors of length 4 (square), 2 (asymmetric)
/// or 1 (symmetric).  A length of 3 fits none of them:
///
/// ```
/// let yaml = "
/// pop_sizes: [7.0, 7.0]
/// rate_matrix: [0.1, 0.1, 0.1]
/// ";
/// assert!(matches!(
///     demes_migration::loads(yaml),
///     Err(demes_migration::MigrationModelError::LayoutError(_))
/// ));
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MigrationModelError {
    /// Rate vector length incompatible with the deme count.
    #[error("{0:?}")]
    LayoutError(String),
    /// Errors related to the indicator flag vector.
    #[error("{0:?}")]
    FlagError(String),
    /// Errors related to low-level parameter values.
    #[error("{0:?}")]
    ValueError(String),
    /// Errors coming from `serde_yaml`.
    #[error(transparent)]
    YamlError(#[from] serde_yaml::Error),
}
