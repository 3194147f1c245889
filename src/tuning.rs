use crate::cross_validation::{CrossValidationError, CrossValidationOptions, CrossValidationTable};
use crate::knn::{FitError, KnnRegressor};
use crate::table::Table;
use thiserror::Error;

/// Chooses k by cross-validation and refits on the whole table in one call.
#[derive(Debug, Clone)]
pub struct KnnTuner {
    grid: Vec<usize>,
    cross_validation: CrossValidationOptions,
}

impl KnnTuner {
    pub fn new(grid: impl IntoIterator<Item = usize>) -> Self {
        Self {
            grid: grid.into_iter().collect(),
            cross_validation: CrossValidationOptions::default(),
        }
    }

    /// The kernel of `options` is used both for the sweep and for the refit.
    pub fn cross_validation(mut self, options: CrossValidationOptions) -> Self {
        self.cross_validation = options;
        self
    }

    pub fn tune(&self, table: &Table) -> Result<TunedKnn, TuneError> {
        let cross_validation = self.cross_validation.sweep(table, &self.grid)?;

        let best = cross_validation
            .best()
            .ok_or(CrossValidationError::NoCandidates)?;
        tracing::info!(k = best.k.get(), rmse = best.mean, "selected k");

        let regressor = self.cross_validation.knn_options(best.k).fit(table)?;
        Ok(TunedKnn {
            cross_validation,
            regressor,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TunedKnn {
    cross_validation: CrossValidationTable,
    regressor: KnnRegressor,
}

impl TunedKnn {
    pub fn best_k(&self) -> usize {
        self.regressor.k()
    }

    pub fn cross_validation(&self) -> &CrossValidationTable {
        &self.cross_validation
    }

    /// The model refitted on the full table at the selected k.
    pub fn regressor(&self) -> &KnnRegressor {
        &self.regressor
    }

    pub fn into_parts(self) -> (CrossValidationTable, KnnRegressor) {
        (self.cross_validation, self.regressor)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TuneError {
    #[error("cross-validation failed")]
    CrossValidation(#[from] CrossValidationError),

    #[error("refitting at the selected k failed")]
    Fit(#[from] FitError),
}
