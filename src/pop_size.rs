use crate::error::MigrationModelError;

/// The effective population size of a deme.
///
/// This is a newtype wrapper for [`f64`](std::primitive::f64).
///
/// # Notes
///
/// * The size may take on non-integer values, but must be positive
///   and finite.
///
/// # Examples
///
/// ```
/// let s = demes_migration::PopSize::try_from(7.0).unwrap();
/// assert_eq!(s, 7.0);
/// ```
///
/// Zero and non-finite values are rejected:
///
/// ```
/// assert!(demes_migration::PopSize::try_from(0.0).is_err());
/// assert!(demes_migration::PopSize::try_from(f64::NAN).is_err());
/// ```
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct PopSize(f64);

impl PopSize {
    fn validate<F>(&self, f: F) -> Result<(), MigrationModelError>
    where
        F: std::ops::FnOnce(String) -> MigrationModelError,
    {
        if self.0.is_nan() || self.0.is_infinite() || self.0 <= 0.0 {
            let msg = format!("population sizes must be 0 < N < Infinity, got: {}", self.0);
            Err(f(msg))
        } else {
            Ok(())
        }
    }
}

impl TryFrom<f64> for PopSize {
    type Error = MigrationModelError;
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let rv = Self(value);
        rv.validate(MigrationModelError::ValueError)?;
        Ok(rv)
    }
}

impl_newtype_traits!(PopSize);
