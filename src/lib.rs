//! # Markovian migration models for structured-coalescent inference.
//!
//! This crate implements the computational core shared by
//! structured-coalescent likelihoods and uniformization-based
//! proposal operators: a continuous-time migration process among a
//! fixed set of demes, exposed as an infinitesimal generator, a
//! uniformized discrete-time transition matrix, and a
//! self-extending cache of that matrix's powers.
//!
//! Models are usually loaded from YAML settings:
//!
//! ```
//! use demes_migration::{MatrixVariant, TraceLoggable};
//!
//! let yaml = "
//! pop_sizes: [7.0, 7.0]
//! rate_matrix: [0.1, 0.1]
//! ";
//! let mut model = demes_migration::loads(yaml).unwrap();
//! assert_eq!(model.mu(MatrixVariant::Backward), 0.1);
//!
//! let mut header = Vec::new();
//! model.write_trace_header(&mut header).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

mod macros;

mod error;
mod layout;
mod log_output;
mod model;
mod pop_size;
mod power_cache;
mod rate;
mod settings;

pub use error::MigrationModelError;
pub use layout::RateLayout;
pub use log_output::TraceLoggable;
pub use model::{MatrixVariant, MigrationModel};
pub use pop_size::PopSize;
pub use rate::MigrationRate;
pub use settings::MigrationModelSettings;

/// Build a validated [`MigrationModel`] from YAML text.
///
/// # Errors
///
/// Returns an error for unparseable YAML or for settings that fail
/// model validation (unrecognized rate-vector length, flag length
/// mismatch, out-of-domain values).
pub fn loads(yaml: &str) -> Result<MigrationModel, MigrationModelError> {
    let settings: MigrationModelSettings = serde_yaml::from_str(yaml)?;
    settings.try_into()
}

/// Build a validated [`MigrationModel`] from a YAML reader.
///
/// # Errors
///
/// See [`loads`].
pub fn load<R: std::io::Read>(reader: R) -> Result<MigrationModel, MigrationModelError> {
    let settings: MigrationModelSettings = serde_yaml::from_reader(reader)?;
    settings.try_into()
}
