pub use cross_validation::{
    CrossValidationError, CrossValidationOptions, CrossValidationRow, CrossValidationTable,
    ResampleMetric,
};
pub use dataset::{Dataset, DatasetOptions, LoadError};
pub use kernel::Kernel;
pub use knn::{FitError, KnnOptions, KnnRegressor, Neighbors};
pub use partition::{FoldPartition, PartitionError};
pub use report::{CurvePoint, PredictionCurve};
pub use table::{Table, TableError};
pub use tuning::{KnnTuner, TuneError, TunedKnn};

pub mod cross_validation;
pub mod dataset;
pub mod kernel;
pub mod report;

mod functions;
mod knn;
mod partition;
mod table;
mod tuning;
