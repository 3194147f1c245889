use rand::seq::SliceRandom as _;
use rand::Rng;
use std::num::NonZeroUsize;
use thiserror::Error;

/// A random assignment of row positions to disjoint folds.
///
/// Fold sizes differ by at most one.
#[derive(Debug, Clone)]
pub struct FoldPartition {
    folds: Vec<Vec<usize>>,
}

impl FoldPartition {
    pub fn random<R: Rng + ?Sized>(
        rng: &mut R,
        rows: usize,
        folds: NonZeroUsize,
    ) -> Result<Self, PartitionError> {
        let folds = folds.get();
        if folds < 2 {
            return Err(PartitionError::TooFewFolds { folds });
        }
        if folds > rows {
            return Err(PartitionError::TooManyFolds { folds, rows });
        }

        let mut positions = (0..rows).collect::<Vec<_>>();
        positions.shuffle(rng);

        let mut partition = vec![Vec::with_capacity(rows / folds + 1); folds];
        for (i, position) in positions.into_iter().enumerate() {
            partition[i % folds].push(position);
        }
        Ok(Self { folds: partition })
    }

    pub fn folds(&self) -> impl '_ + Iterator<Item = &[usize]> {
        self.folds.iter().map(|f| f.as_slice())
    }

    pub fn len(&self) -> usize {
        self.folds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    /// Size of the largest fold for `rows` rows split `folds` ways.
    pub fn largest_fold_len(rows: usize, folds: usize) -> usize {
        (rows + folds - 1) / folds
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("cross-validation needs at least 2 folds, got {folds}")]
    TooFewFolds { folds: usize },

    #[error("cannot split {rows} rows into {folds} folds")]
    TooManyFolds { folds: usize, rows: usize },
}
