//! Prediction curves for presenting fitted models.
use crate::functions;
use crate::kernel::Kernel;
use crate::knn::{FitError, KnnOptions, KnnRegressor};
use crate::table::Table;
use serde::Serialize;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub x: f64,
    pub actual: f64,
    pub predicted: f64,
}

/// Predictions of one model over a table, in ascending feature order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionCurve {
    pub k: usize,
    pub kernel: Kernel,
    pub points: Vec<CurvePoint>,
}

impl PredictionCurve {
    pub fn new(regressor: &KnnRegressor, table: &Table) -> Self {
        let mut table = table.clone();
        table.sort_rows_by_feature();
        let points = table
            .rows()
            .map(|(x, actual)| CurvePoint {
                x,
                actual,
                predicted: regressor.predict(x),
            })
            .collect();
        Self {
            k: regressor.k(),
            kernel: regressor.kernel(),
            points,
        }
    }

    pub fn predicted(&self) -> impl '_ + Iterator<Item = f64> + Clone {
        self.points.iter().map(|p| p.predicted)
    }

    /// Variance of the predicted values; shrinks as k grows.
    pub fn variance(&self) -> f64 {
        functions::variance(self.predicted())
    }
}

/// Fits one model per k on `table` and returns their curves.
pub fn illustrate(
    table: &Table,
    ks: &[NonZeroUsize],
    kernel: Kernel,
) -> Result<Vec<PredictionCurve>, FitError> {
    ks.iter()
        .map(|&k| {
            let regressor = KnnOptions::new().k(k).kernel(kernel).fit(table)?;
            Ok(PredictionCurve::new(&regressor, table))
        })
        .collect()
}
