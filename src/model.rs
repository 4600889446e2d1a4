use ndarray::Array2;

use crate::error::MigrationModelError;
use crate::layout::RateLayout;
use crate::pop_size::PopSize;
use crate::power_cache::PowerCache;
use crate::rate::MigrationRate;

/// Fallback logging name for models built without one.
pub(crate) const DEFAULT_MODEL_NAME: &str = "migModel";

/// Selects which of the model's two uniformized processes an accessor
/// addresses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatrixVariant {
    /// The backward-time migration process itself.
    Backward,
    /// The symmetrized process, `0.5 * (rate(i, j) + rate(j, i))` per
    /// pair, used where diagonalization needs a symmetric generator.
    Symmetrized,
}

/// A continuous-time Markov migration model over a fixed set of demes.
///
/// The packed rate vector and the population sizes are the single
/// source of truth.  Everything else — the generator `Q`, its
/// symmetrized counterpart, the uniformization constants and the
/// uniformized transition matrices `R = I + Q/mu` together with their
/// cached powers — is derived lazily: mutating a parameter marks the
/// model dirty, and the next derived read rebuilds in one O(n²) pass.
///
/// Derived reads take `&mut self` because they may rebuild.  The
/// model is meant to be owned by a single sampling-chain context;
/// wrap it in a mutex if a chain runner ever shares it across
/// threads.
///
/// # Uniformization precondition
///
/// When every rate is zero (or every active rate, under indicator
/// flags), `mu == 0` and `R` is undefined; its entries come out as
/// NaN.  Callers must check [`MigrationModel::mu`] before asking for
/// transition matrices or powers.
///
/// # Examples
///
/// ```
/// use demes_migration::MatrixVariant;
///
/// let yaml = "
/// pop_sizes: [7.0, 7.0]
/// rate_matrix: [0.1, 0.1]
/// ";
/// let mut model = demes_migration::loads(yaml).unwrap();
/// assert_eq!(model.num_demes(), 2);
/// assert_eq!(model.mu(MatrixVariant::Backward), 0.1);
/// ```
#[derive(Clone, Debug)]
pub struct MigrationModel {
    name: String,
    num_demes: usize,
    layout: RateLayout,
    rates: Vec<f64>,
    pop_sizes: Vec<f64>,
    rate_flags: Option<Vec<bool>>,

    dirty: bool,
    total_pop_size: f64,
    mu: f64,
    mu_sym: f64,
    q: Array2<f64>,
    q_sym: Array2<f64>,
    r: Array2<f64>,
    r_sym: Array2<f64>,
    powers: PowerCache,
    powers_sym: PowerCache,
}

impl MigrationModel {
    /// Build a model from a packed rate vector, per-deme population
    /// sizes, and an optional indicator flag vector.
    ///
    /// The deme count is the length of `pop_sizes`; the rate layout
    /// is inferred from the length of `rates` (see [`RateLayout`]).
    ///
    /// # Errors
    ///
    /// * [`MigrationModelError::LayoutError`] if `rates` fits no
    ///   layout for the deme count.
    /// * [`MigrationModelError::FlagError`] if `rate_flags` is
    ///   present with a length different from `rates`.
    /// * [`MigrationModelError::ValueError`] for non-finite or
    ///   out-of-domain population sizes and rates.
    pub fn new(
        rates: Vec<f64>,
        pop_sizes: Vec<f64>,
        rate_flags: Option<Vec<bool>>,
    ) -> Result<Self, MigrationModelError> {
        let num_demes = pop_sizes.len();
        let layout = RateLayout::for_dimension(rates.len(), num_demes)?;

        for size in &pop_sizes {
            PopSize::try_from(*size)?;
        }
        for rate in &rates {
            MigrationRate::try_from(*rate)?;
        }

        if let Some(flags) = &rate_flags {
            if flags.len() != rates.len() {
                return Err(MigrationModelError::FlagError(format!(
                    "rate flag vector has {} elements, rate vector has {}",
                    flags.len(),
                    rates.len()
                )));
            }
        }

        Ok(Self {
            name: DEFAULT_MODEL_NAME.to_string(),
            num_demes,
            layout,
            rates,
            pop_sizes,
            rate_flags,
            dirty: true,
            total_pop_size: 0.0,
            mu: 0.0,
            mu_sym: 0.0,
            q: Array2::zeros((num_demes, num_demes)),
            q_sym: Array2::zeros((num_demes, num_demes)),
            r: Array2::zeros((num_demes, num_demes)),
            r_sym: Array2::zeros((num_demes, num_demes)),
            powers: PowerCache::new(num_demes),
            powers_sym: PowerCache::new(num_demes),
        })
    }

    /// Build a model whose ordered deme pairs all share one rate.
    ///
    /// The rate vector is laid out asymmetric-packed, so individual
    /// pathways remain independently mutable afterwards.
    pub fn uniform(rate: f64, pop_sizes: Vec<f64>) -> Result<Self, MigrationModelError> {
        let n = pop_sizes.len();
        Self::new(vec![rate; n * n.saturating_sub(1)], pop_sizes, None)
    }

    /// Attach a name, used as the column prefix by the trace-log
    /// contract.
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Name of this model instance.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of demes in the migration model.
    pub fn num_demes(&self) -> usize {
        self.num_demes
    }

    /// Storage layout of the packed rate vector.
    pub fn layout(&self) -> RateLayout {
        self.layout
    }

    /// Whether an indicator flag vector is configured.
    pub fn has_rate_flags(&self) -> bool {
        self.rate_flags.is_some()
    }

    /// Migration rate between demes `i` and `j` as the model sees it.
    ///
    /// Returns 0 on the diagonal, and 0 for pathways whose indicator
    /// flag is switched off.
    pub fn rate(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return 0.0;
        }
        let offset = self.layout.offset(self.num_demes, i, j);
        match &self.rate_flags {
            Some(flags) if !flags[offset] => 0.0,
            _ => self.rates[offset],
        }
    }

    /// Stored migration rate between demes `i` and `j`, ignoring
    /// indicator flags.
    ///
    /// Reporting uses this so that disabled rates remain visible.
    /// Returns 0 on the diagonal.
    pub fn rate_raw(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return 0.0;
        }
        self.rates[self.layout.offset(self.num_demes, i, j)]
    }

    /// Indicator flag for the pair `(i, j)`.
    ///
    /// `true` universally when no flags are configured; `false` on
    /// the diagonal.
    pub fn rate_flag(&self, i: usize, j: usize) -> bool {
        if i == j {
            return false;
        }
        match &self.rate_flags {
            None => true,
            Some(flags) => flags[self.layout.offset(self.num_demes, i, j)],
        }
    }

    /// Set the migration rate between demes `i` and `j` and mark the
    /// model dirty.
    ///
    /// Writing to the diagonal is a silent no-op, mirroring the read
    /// side's treatment of diagonal entries.  Under the symmetric
    /// layout both directions of the pair share the written slot.
    pub fn set_rate(&mut self, i: usize, j: usize, rate: f64) {
        if i == j {
            return;
        }
        let offset = self.layout.offset(self.num_demes, i, j);
        self.rates[offset] = rate;
        self.dirty = true;
    }

    /// Set the indicator flag for the pair `(i, j)` and mark the
    /// model dirty.
    ///
    /// A model built without flags gains an all-true flag vector on
    /// the first call.  The diagonal is a silent no-op.
    pub fn set_rate_flag(&mut self, i: usize, j: usize, active: bool) {
        if i == j {
            return;
        }
        let offset = self.layout.offset(self.num_demes, i, j);
        let num_slots = self.rates.len();
        self.rate_flags.get_or_insert_with(|| vec![true; num_slots])[offset] = active;
        self.dirty = true;
    }

    /// Effective population size of deme `i`.
    pub fn pop_size(&self, i: usize) -> f64 {
        self.pop_sizes[i]
    }

    /// Set the effective population size of deme `i` and mark the
    /// model dirty.
    pub fn set_pop_size(&mut self, i: usize, size: f64) {
        self.pop_sizes[i] = size;
        self.dirty = true;
    }

    /// Notify the model that its parameters were rewound by an
    /// external accept/reject mechanism.
    ///
    /// Restores never change the parameter vectors through this type,
    /// so the only thing to do is force a rebuild on the next read.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Total effective population size across all demes.
    pub fn total_pop_size(&mut self) -> f64 {
        self.update_matrices();
        self.total_pop_size
    }

    /// Uniformization constant: the largest absolute diagonal entry
    /// of the selected generator.
    ///
    /// A value of 0 means no active migration anywhere; the
    /// transition matrix and its powers are undefined in that case.
    pub fn mu(&mut self, variant: MatrixVariant) -> f64 {
        self.update_matrices();
        match variant {
            MatrixVariant::Backward => self.mu,
            MatrixVariant::Symmetrized => self.mu_sym,
        }
    }

    /// The infinitesimal generator `Q` of the selected variant.
    ///
    /// Off-diagonal `[i, j]` entries hold the backward-time rate from
    /// deme `i` to deme `j`; each diagonal entry is the negated sum
    /// of its row's off-diagonals, so rows sum to zero.
    pub fn generator(&mut self, variant: MatrixVariant) -> &Array2<f64> {
        self.update_matrices();
        match variant {
            MatrixVariant::Backward => &self.q,
            MatrixVariant::Symmetrized => &self.q_sym,
        }
    }

    /// The uniformized transition matrix `R = I + Q/mu` of the
    /// selected variant.  Row-stochastic whenever `mu > 0`.
    pub fn transition_matrix(&mut self, variant: MatrixVariant) -> &Array2<f64> {
        self.update_matrices();
        match variant {
            MatrixVariant::Backward => &self.r,
            MatrixVariant::Symmetrized => &self.r_sym,
        }
    }

    /// The `n`th power of the selected uniformized transition matrix.
    ///
    /// Powers are cached: a previously served power is never
    /// recomputed, and once the power sequence is detected to have
    /// stopped changing, every higher request returns the converged
    /// matrix.  See [`MigrationModel::steady_power`].
    pub fn transition_power(&mut self, n: usize, variant: MatrixVariant) -> &Array2<f64> {
        self.update_matrices();
        match variant {
            MatrixVariant::Backward => self.powers.power(&self.r, n),
            MatrixVariant::Symmetrized => self.powers_sym.power(&self.r_sym, n),
        }
    }

    /// Element-wise upper bound over all powers of the selected
    /// transition matrix, once its steady state is known; a matrix of
    /// all ones otherwise.
    pub fn power_ceiling(&mut self, variant: MatrixVariant) -> Array2<f64> {
        self.update_matrices();
        match variant {
            MatrixVariant::Backward => self.powers.ceiling(),
            MatrixVariant::Symmetrized => self.powers_sym.ceiling(),
        }
    }

    /// Power at and above which the selected transition matrix's
    /// powers no longer change, or `None` while undetected.
    pub fn steady_power(&mut self, variant: MatrixVariant) -> Option<usize> {
        self.update_matrices();
        match variant {
            MatrixVariant::Backward => self.powers.steady_power(),
            MatrixVariant::Symmetrized => self.powers_sym.steady_power(),
        }
    }

    /// Bring every derived field back in sync with the parameter
    /// vectors.  No-op while clean.
    fn update_matrices(&mut self) {
        if !self.dirty {
            return;
        }

        let n = self.num_demes;
        self.total_pop_size = self.pop_sizes.iter().sum();

        let mut q = Array2::zeros((n, n));
        let mut q_sym = Array2::zeros((n, n));
        for i in 0..n {
            let mut diag = 0.0;
            let mut diag_sym = 0.0;
            for j in 0..n {
                if i == j {
                    continue;
                }
                let rate = self.rate(i, j);
                q[[i, j]] = rate;
                diag -= rate;

                // Symmetrization feeds diagonalization, which wants
                // the full pathway structure, so flags are ignored.
                let sym = 0.5 * (self.rate_raw(i, j) + self.rate_raw(j, i));
                q_sym[[i, j]] = sym;
                diag_sym -= sym;
            }
            q[[i, i]] = diag;
            q_sym[[i, i]] = diag_sym;
        }

        let mu = (0..n).fold(0.0_f64, |mu, i| mu.max(-q[[i, i]]));
        let mu_sym = (0..n).fold(0.0_f64, |mu, i| mu.max(-q_sym[[i, i]]));

        self.r = Array2::eye(n) + q.mapv(|v| v / mu);
        self.r_sym = Array2::eye(n) + q_sym.mapv(|v| v / mu_sym);
        self.mu = mu;
        self.mu_sym = mu_sym;
        self.q = q;
        self.q_sym = q_sym;

        self.powers = PowerCache::new(n);
        self.powers_sym = PowerCache::new(n);

        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_deme_model() -> MigrationModel {
        MigrationModel::new(vec![0.1, 0.1], vec![7.0, 7.0], None).unwrap()
    }

    #[test]
    fn set_then_get_round_trips_exactly() {
        let mut model = two_deme_model();
        model.set_rate(1, 0, 0.123456789);
        assert_eq!(model.rate_raw(1, 0), 0.123456789);
        assert_eq!(model.rate(1, 0), 0.123456789);
    }

    #[test]
    fn diagonal_reads_are_zero_and_writes_are_ignored() {
        let mut model = two_deme_model();
        assert_eq!(model.rate(0, 0), 0.0);
        assert_eq!(model.rate_raw(1, 1), 0.0);
        assert!(!model.rate_flag(0, 0));
        model.set_rate(0, 0, 55.0);
        assert_eq!(model.rates, vec![0.1, 0.1]);
    }

    #[test]
    fn masked_rates_read_zero_but_stay_stored() {
        let mut model =
            MigrationModel::new(vec![0.1, 0.3], vec![1.0, 1.0], Some(vec![true, false])).unwrap();
        assert_eq!(model.rate(1, 0), 0.0);
        assert_eq!(model.rate_raw(1, 0), 0.3);
        assert!(!model.rate_flag(1, 0));
        assert!(model.rate_flag(0, 1));
        // Row 1 has no active outgoing pathway.
        assert_eq!(model.generator(MatrixVariant::Backward)[[1, 1]], 0.0);
    }

    #[test]
    fn flag_mutation_materializes_flags_and_dirties() {
        let mut model = two_deme_model();
        assert!(!model.has_rate_flags());
        let _ = model.mu(MatrixVariant::Backward);
        model.set_rate_flag(0, 1, false);
        assert!(model.has_rate_flags());
        assert!(!model.rate_flag(0, 1));
        assert!(model.rate_flag(1, 0));
        // Deme 0 lost its only outgoing pathway.
        assert_eq!(model.generator(MatrixVariant::Backward)[[0, 0]], 0.0);
    }

    #[test]
    fn symmetrization_ignores_flags() {
        let mut model =
            MigrationModel::new(vec![0.25, 0.75], vec![1.0, 1.0], Some(vec![false, false])).unwrap();
        let q_sym = model.generator(MatrixVariant::Symmetrized).clone();
        assert_eq!(q_sym[[0, 1]], 0.5);
        assert_eq!(q_sym[[1, 0]], 0.5);
        // The plain generator sees only masked rates.
        assert_eq!(model.generator(MatrixVariant::Backward)[[0, 1]], 0.0);
    }

    #[test]
    fn mutation_invalidates_derived_state() {
        let mut model = two_deme_model();
        assert_eq!(model.total_pop_size(), 14.0);
        let r_before = model.transition_matrix(MatrixVariant::Backward).clone();
        model.set_pop_size(0, 10.0);
        assert_eq!(model.total_pop_size(), 17.0);
        // R does not depend on population sizes.
        assert_eq!(model.transition_matrix(MatrixVariant::Backward), &r_before);
    }

    #[test]
    fn invalidate_forces_rebuild_on_next_read() {
        let mut model = two_deme_model();
        let _ = model.mu(MatrixVariant::Backward);
        assert!(!model.dirty);
        model.invalidate();
        assert!(model.dirty);
        let _ = model.total_pop_size();
        assert!(!model.dirty);
    }

    #[test]
    fn uniform_constructor_fills_every_ordered_pair() {
        let mut model = MigrationModel::uniform(0.25, vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(model.layout(), RateLayout::AsymmetricPacked);
        for i in 0..3 {
            for j in 0..3 {
                if i != j {
                    assert_eq!(model.rate(i, j), 0.25);
                }
            }
        }
        assert_eq!(model.mu(MatrixVariant::Backward), 0.5);
    }

    #[test]
    fn construction_rejects_bad_inputs() {
        assert!(matches!(
            MigrationModel::new(vec![0.1; 3], vec![1.0, 1.0], None),
            Err(MigrationModelError::LayoutError(_))
        ));
        assert!(matches!(
            MigrationModel::new(vec![0.1, 0.1], vec![1.0, 1.0], Some(vec![true])),
            Err(MigrationModelError::FlagError(_))
        ));
        assert!(matches!(
            MigrationModel::new(vec![-0.1, 0.1], vec![1.0, 1.0], None),
            Err(MigrationModelError::ValueError(_))
        ));
        assert!(matches!(
            MigrationModel::new(vec![0.1, 0.1], vec![1.0, 0.0], None),
            Err(MigrationModelError::ValueError(_))
        ));
    }

    #[test]
    fn symmetric_layout_shares_one_slot_per_pair() {
        let mut model = MigrationModel::new(vec![0.5], vec![1.0, 1.0], None).unwrap();
        assert_eq!(model.layout(), RateLayout::SymmetricPacked);
        assert_eq!(model.rate(0, 1), 0.5);
        assert_eq!(model.rate(1, 0), 0.5);
        model.set_rate(1, 0, 0.75);
        assert_eq!(model.rate(0, 1), 0.75);
    }
}
