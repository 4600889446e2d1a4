use ndarray::{Array2, Zip};

/// How often (in powers) the extension loop checks for steady state.
const STEADY_CHECK_STRIDE: usize = 10;

/// Lazily extended cache of powers of a uniformized transition matrix.
///
/// The cache always holds at least `R^0 = I`.  Alongside the power
/// sequence it maintains an element-wise running maximum over every
/// power computed so far, and a flag recording whether two
/// consecutively computed powers have been observed numerically
/// identical.  Once that happens, all higher powers are served as the
/// converged matrix without further multiplication.
///
/// The steady-state probe runs only at every 10th power and uses a
/// strict zero-difference test.  Periodic chains never trip it, and
/// neither does a sequence that is close to, but not exactly at, its
/// fixed point.  Consumers that convolve over these powers accept
/// both behaviors.
#[derive(Clone, Debug)]
pub(crate) struct PowerCache {
    powers: Vec<Array2<f64>>,
    ceiling: Array2<f64>,
    steady: bool,
}

impl PowerCache {
    pub(crate) fn new(dim: usize) -> Self {
        Self {
            powers: vec![Array2::eye(dim)],
            ceiling: Array2::eye(dim),
            steady: false,
        }
    }

    fn dim(&self) -> usize {
        self.powers[0].nrows()
    }

    /// `matrix` raised to the `n`th power.
    ///
    /// Previously computed powers are returned as-is, never
    /// recomputed.  Requests past a detected steady state return the
    /// converged matrix regardless of `n`.
    pub(crate) fn power(&mut self, matrix: &Array2<f64>, n: usize) -> &Array2<f64> {
        if n < self.powers.len() {
            return &self.powers[n];
        }

        if self.steady {
            return self.powers.last().expect("cache holds at least I");
        }

        let start = self.powers.len();
        for i in start..=n {
            let next = self.powers[i - 1].dot(matrix);
            self.powers.push(next);

            let newest = &self.powers[i];
            Zip::from(&mut self.ceiling).and(newest).for_each(|c, &v| {
                if v > *c {
                    *c = v;
                }
            });

            // Occasionally check whether the iteration has reached
            // steady state.
            if i % STEADY_CHECK_STRIDE == 0 {
                let mut max_diff = 0.0_f64;
                Zip::from(&self.powers[i])
                    .and(&self.powers[i - 1])
                    .for_each(|&a, &b| max_diff = max_diff.max((a - b).abs()));

                if !(max_diff > 0.0) {
                    self.steady = true;
                    return &self.powers[i];
                }
            }
        }
        &self.powers[n]
    }

    /// Element-wise upper bound over all powers, once known.
    ///
    /// Until steady state has been detected there is no bound to
    /// offer, and a matrix of all ones is returned instead.
    pub(crate) fn ceiling(&self) -> Array2<f64> {
        if self.steady {
            self.ceiling.clone()
        } else {
            Array2::ones((self.dim(), self.dim()))
        }
    }

    /// Power at and above which the cached matrix no longer changes,
    /// or `None` while undetected.
    pub(crate) fn steady_power(&self) -> Option<usize> {
        if self.steady {
            Some(self.powers.len())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn identity_is_always_cached() {
        let mut cache = PowerCache::new(2);
        let r = array![[0.0, 1.0], [1.0, 0.0]];
        assert_eq!(cache.power(&r, 0), &Array2::<f64>::eye(2));
    }

    #[test]
    fn powers_of_a_permutation_matrix_alternate() {
        let mut cache = PowerCache::new(2);
        let r = array![[0.0, 1.0], [1.0, 0.0]];
        assert_eq!(cache.power(&r, 1), &r);
        assert_eq!(cache.power(&r, 2), &Array2::<f64>::eye(2));
        assert_eq!(cache.power(&r, 31), &r);
        // The stride-10 probe compares R^10k against R^10k-1, which
        // for a period-2 chain always differ.
        assert_eq!(cache.steady_power(), None);
        assert_eq!(cache.ceiling(), Array2::<f64>::ones((2, 2)));
    }

    #[test]
    fn absorbing_chain_reaches_steady_state() {
        // One absorbing deme: R^k == R exactly for all k >= 1, so the
        // first probe (power 10) detects steady state.
        let mut cache = PowerCache::new(2);
        let r = array![[0.0, 1.0], [0.0, 1.0]];
        assert_eq!(cache.power(&r, 500), &r);
        assert_eq!(cache.steady_power(), Some(11));
        assert_eq!(cache.ceiling(), array![[1.0, 1.0], [0.0, 1.0]]);
    }

    #[test]
    fn requests_past_steady_state_return_the_converged_matrix() {
        let mut cache = PowerCache::new(2);
        let r = array![[0.0, 1.0], [0.0, 1.0]];
        let converged = cache.power(&r, 50).clone();
        assert_eq!(cache.power(&r, 10_000), &converged);
        // Powers computed before convergence stay individually
        // addressable.
        assert_eq!(cache.power(&r, 0), &Array2::<f64>::eye(2));
    }
}
