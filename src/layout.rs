use crate::error::MigrationModelError;

/// Storage layout of the packed migration rate vector.
///
/// The layout is inferred once from the vector's length at
/// construction and is fixed for the life of the model.
///
/// * [`RateLayout::Square`]: `n * n` entries indexed row-major.
///   Diagonal slots exist in storage but are never addressed.
/// * [`RateLayout::AsymmetricPacked`]: `n * (n - 1)` entries, one per
///   ordered pair, diagonal omitted, row-major with the column index
///   shifted down past the diagonal.
/// * [`RateLayout::SymmetricPacked`]: `n * (n - 1) / 2` entries, one
///   shared by both directions of an unordered pair, packed by
///   triangular index.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RateLayout {
    #[allow(missing_docs)]
    Square,
    #[allow(missing_docs)]
    AsymmetricPacked,
    #[allow(missing_docs)]
    SymmetricPacked,
}

impl RateLayout {
    /// Infer the layout from the rate vector length and the deme count.
    ///
    /// A length matching none of the recognized layouts is a fatal
    /// configuration error.
    pub fn for_dimension(rate_dim: usize, num_demes: usize) -> Result<Self, MigrationModelError> {
        let n = num_demes;
        if n == 0 {
            return Err(MigrationModelError::LayoutError(
                "cannot infer a rate layout for zero demes".to_string(),
            ));
        }
        if rate_dim == n * n {
            Ok(Self::Square)
        } else if rate_dim == n * (n - 1) {
            Ok(Self::AsymmetricPacked)
        } else if rate_dim == n * (n - 1) / 2 {
            Ok(Self::SymmetricPacked)
        } else {
            Err(MigrationModelError::LayoutError(format!(
                "rate vector has {rate_dim} elements, which fits no layout for {n} demes"
            )))
        }
    }

    /// Number of storage slots this layout occupies for `num_demes` demes.
    pub fn num_slots(&self, num_demes: usize) -> usize {
        let n = num_demes;
        match self {
            Self::Square => n * n,
            Self::AsymmetricPacked => n * (n - 1),
            Self::SymmetricPacked => n * (n - 1) / 2,
        }
    }

    /// Offset into the packed rate vector for the ordered pair `(i, j)`.
    ///
    /// # Panics
    ///
    /// Panics if `i == j`.  Diagonal entries have no stored
    /// representation; asking for one is a defect in the caller, not
    /// a recoverable condition.
    pub fn offset(&self, num_demes: usize, i: usize, j: usize) -> usize {
        if i == j {
            panic!("requested rate array offset for diagonal element ({i}, {i})");
        }
        match self {
            Self::Square => i * num_demes + j,
            Self::AsymmetricPacked => {
                let col = if j > i { j - 1 } else { j };
                i * (num_demes - 1) + col
            }
            Self::SymmetricPacked => {
                let (lo, hi) = if j < i { (j, i) } else { (i, j) };
                hi * (hi - 1) / 2 + lo
            }
        }
    }
}
