use crate::error::MigrationModelError;

/// A backward-time migration rate between an ordered pair of demes.
///
/// This is a newtype wrapper for [`f64`](std::primitive::f64).
///
/// # Notes
///
/// * Rates are per unit time, not per-generation probabilities, so
///   there is no upper bound.  Zero is allowed and simply means the
///   corresponding pathway is never taken.
///
/// # Examples
///
/// ```
/// let r = demes_migration::MigrationRate::try_from(0.1).unwrap();
/// assert_eq!(r, 0.1);
/// assert!(demes_migration::MigrationRate::try_from(-0.1).is_err());
/// ```
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct MigrationRate(f64);

impl MigrationRate {
    fn validate<F>(&self, f: F) -> Result<(), MigrationModelError>
    where
        F: std::ops::FnOnce(String) -> MigrationModelError,
    {
        if !self.0.is_finite() || self.0.is_sign_negative() {
            let msg = format!("migration rates must be 0 <= m < Infinity, got: {}", self.0);
            Err(f(msg))
        } else {
            Ok(())
        }
    }
}

impl TryFrom<f64> for MigrationRate {
    type Error = MigrationModelError;
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let rv = Self(value);
        rv.validate(MigrationModelError::ValueError)?;
        Ok(rv)
    }
}

impl_newtype_traits!(MigrationRate);
