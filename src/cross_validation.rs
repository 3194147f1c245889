//! Repeated k-fold cross-validation over a grid of neighborhood sizes.
use crate::functions::{self, RunningMean};
use crate::kernel::Kernel;
use crate::knn::{FitError, KnnOptions};
use crate::partition::{FoldPartition, PartitionError};
use crate::table::Table;
use itertools::Itertools as _;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use thiserror::Error;

/// How held-out errors are turned into one RMSE per repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleMetric {
    /// Squared errors are summed over all folds, then divided by the row count.
    Pooled,

    /// RMSE is computed per held-out fold and averaged over the folds.
    FoldAverage,
}

impl ResampleMetric {
    pub const ALL: [ResampleMetric; 2] = [ResampleMetric::Pooled, ResampleMetric::FoldAverage];

    pub fn name(self) -> &'static str {
        match self {
            ResampleMetric::Pooled => "pooled",
            ResampleMetric::FoldAverage => "fold-average",
        }
    }
}

impl Default for ResampleMetric {
    fn default() -> Self {
        ResampleMetric::Pooled
    }
}

impl fmt::Display for ResampleMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResampleMetric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResampleMetric::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMetric(s.to_owned()))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown resample metric {0:?} (expected \"pooled\" or \"fold-average\")")]
pub struct UnknownMetric(pub String);

#[derive(Debug, Clone)]
pub struct CrossValidationOptions {
    folds: NonZeroUsize,
    repetitions: NonZeroUsize,
    kernel: Kernel,
    metric: ResampleMetric,
    seed: Option<u64>,
    parallel: bool,
}

impl CrossValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folds(mut self, folds: NonZeroUsize) -> Self {
        self.folds = folds;
        self
    }

    pub fn repetitions(mut self, repetitions: NonZeroUsize) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn metric(mut self, metric: ResampleMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Fixes the fold shuffling. Without a seed every sweep draws fresh folds.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Predictor options matching this sweep, for refitting at a chosen k.
    pub fn knn_options(&self, k: NonZeroUsize) -> KnnOptions {
        KnnOptions::new().k(k).kernel(self.kernel)
    }

    /// Evaluates every k in `candidates` and returns the RMSE table.
    ///
    /// Candidates are sorted and deduplicated. Nothing is computed unless every
    /// candidate fits in the smallest training split.
    pub fn sweep(
        &self,
        table: &Table,
        candidates: &[usize],
    ) -> Result<CrossValidationTable, CrossValidationError> {
        let ks = candidates
            .iter()
            .copied()
            .sorted()
            .dedup()
            .collect::<Vec<_>>();
        self.validate(table.rows_len(), &ks)?;

        tracing::info!(
            rows = table.rows_len(),
            folds = self.folds.get(),
            repetitions = self.repetitions.get(),
            candidates = ks.len(),
            kernel = %self.kernel,
            metric = %self.metric,
            "starting cross-validation sweep"
        );

        let rngs = self.repetition_rngs().collect::<Vec<_>>();
        let curves = if self.parallel {
            rngs.into_par_iter()
                .enumerate()
                .map(|(i, mut rng)| self.evaluate_repetition(i, &mut rng, table, &ks))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            rngs.into_iter()
                .enumerate()
                .map(|(i, mut rng)| self.evaluate_repetition(i, &mut rng, table, &ks))
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut means = vec![RunningMean::new(); ks.len()];
        let mut columns = vec![Vec::with_capacity(curves.len()); ks.len()];
        for curve in curves {
            for ((rmse, mean), column) in curve.into_iter().zip(&mut means).zip(&mut columns) {
                mean.push(rmse);
                column.push(rmse);
            }
        }

        let rows = ks
            .into_iter()
            .zip(columns)
            .zip(means)
            .map(|((k, repetitions), mean)| {
                Ok(CrossValidationRow {
                    k: NonZeroUsize::new(k).ok_or(CrossValidationError::ZeroK)?,
                    repetitions,
                    mean: mean.get(),
                })
            })
            .collect::<Result<Vec<_>, CrossValidationError>>()?;
        Ok(CrossValidationTable { rows })
    }

    fn validate(&self, rows: usize, ks: &[usize]) -> Result<(), CrossValidationError> {
        let max_k = match ks.last() {
            None => return Err(CrossValidationError::NoCandidates),
            Some(_) if ks[0] == 0 => return Err(CrossValidationError::ZeroK),
            Some(&k) => k,
        };

        let folds = self.folds.get();
        if folds < 2 {
            return Err(PartitionError::TooFewFolds { folds }.into());
        }
        if folds > rows {
            return Err(PartitionError::TooManyFolds { folds, rows }.into());
        }

        let available = rows - FoldPartition::largest_fold_len(rows, folds);
        if max_k > available {
            return Err(CrossValidationError::KTooLarge {
                k: max_k,
                available,
            });
        }
        Ok(())
    }

    fn repetition_rngs(&self) -> impl Iterator<Item = StdRng> {
        let seed_u64 = self.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let mut seed = [0u8; 32];
        seed[0..8].copy_from_slice(&seed_u64.to_be_bytes()[..]);
        let mut rng = StdRng::from_seed(seed);
        (0..self.repetitions.get()).map(move |_| {
            let mut seed = [0u8; 32];
            rng.fill(&mut seed);
            StdRng::from_seed(seed)
        })
    }

    fn evaluate_repetition<R: Rng + ?Sized>(
        &self,
        repetition: usize,
        rng: &mut R,
        table: &Table,
        ks: &[usize],
    ) -> Result<Vec<f64>, CrossValidationError> {
        let partition = FoldPartition::random(rng, table.rows_len(), self.folds)?;
        let max_k = NonZeroUsize::new(ks[ks.len() - 1]).ok_or(CrossValidationError::ZeroK)?;
        let options = self.knn_options(max_k);

        let mut pooled = vec![0.0; ks.len()];
        let mut fold_average = vec![RunningMean::new(); ks.len()];
        for fold in partition.folds() {
            let regressor = options.fit(&table.exclude(fold))?;
            let mut squared_errors = vec![0.0; ks.len()];
            for (x, y) in table.select(fold).rows() {
                let estimates = regressor
                    .neighbors(x, max_k.get() + 1)
                    .estimate_all(ks, self.kernel);
                for (e, estimate) in squared_errors.iter_mut().zip(estimates) {
                    *e += (estimate - y).powi(2);
                }
            }

            for ((sse, total), mean) in squared_errors
                .into_iter()
                .zip(&mut pooled)
                .zip(&mut fold_average)
            {
                *total += sse;
                mean.push(functions::rmse(sse, fold.len()));
            }
        }

        let curve = match self.metric {
            ResampleMetric::Pooled => pooled
                .into_iter()
                .map(|sse| functions::rmse(sse, table.rows_len()))
                .collect::<Vec<_>>(),
            ResampleMetric::FoldAverage => fold_average.into_iter().map(|m| m.get()).collect(),
        };
        tracing::debug!(
            repetition,
            min_rmse = curve.iter().copied().fold(f64::INFINITY, f64::min),
            "finished repetition"
        );
        Ok(curve)
    }
}

impl Default for CrossValidationOptions {
    fn default() -> Self {
        Self {
            folds: NonZeroUsize::new(10).expect("never fails"),
            repetitions: NonZeroUsize::new(5).expect("never fails"),
            kernel: Kernel::default(),
            metric: ResampleMetric::default(),
            seed: None,
            parallel: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidationRow {
    pub k: NonZeroUsize,

    /// One RMSE per repetition, in repetition order.
    pub repetitions: Vec<f64>,

    /// Running mean of `repetitions`.
    pub mean: f64,
}

/// Cross-validated RMSE per candidate k, in ascending order of k.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidationTable {
    rows: Vec<CrossValidationRow>,
}

impl CrossValidationTable {
    pub fn rows(&self) -> &[CrossValidationRow] {
        &self.rows
    }

    pub fn get(&self, k: usize) -> Option<&CrossValidationRow> {
        self.rows
            .binary_search_by_key(&k, |row| row.k.get())
            .ok()
            .map(|i| &self.rows[i])
    }

    /// The row with the smallest mean RMSE. Ties go to the smallest k.
    pub fn best(&self) -> Option<&CrossValidationRow> {
        self.rows
            .iter()
            .fold(None, |best: Option<&CrossValidationRow>, row| match best {
                Some(best) if best.mean <= row.mean => Some(best),
                _ => Some(row),
            })
    }

    pub fn best_k(&self) -> Option<usize> {
        self.best().map(|row| row.k.get())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CrossValidationError {
    #[error("at least one candidate k is required")]
    NoCandidates,

    #[error("candidate k values must be at least 1")]
    ZeroK,

    #[error("k = {k} exceeds the {available} rows available for training in each fold")]
    KTooLarge { k: usize, available: usize },

    #[error(transparent)]
    Partition(#[from] PartitionError),
}

impl From<FitError> for CrossValidationError {
    fn from(f: FitError) -> Self {
        match f {
            FitError::TooFewRows { k, rows } => Self::KTooLarge { k, available: rows },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).expect("non-zero")
    }

    fn noisy_data(n: usize) -> (Vec<f64>, Vec<f64>) {
        let xs = (0..n).map(|i| i as f64 * 0.37).collect::<Vec<_>>();
        let ys = xs
            .iter()
            .enumerate()
            .map(|(i, x)| 30.0 - 2.0 * x + ((i * 7919) % 13) as f64 - 6.0)
            .collect();
        (xs, ys)
    }

    #[test]
    fn leave_one_out_on_linear_data() -> Result<(), anyhow::Error> {
        let xs = (1..=10).map(|i| i as f64).collect::<Vec<_>>();
        let table = Table::new(&xs, &xs)?;
        let options = CrossValidationOptions::new()
            .folds(nz(10))
            .repetitions(nz(3))
            .seed(0);

        let result = options.sweep(&table, &[2, 1])?;
        let k1 = result.get(1).expect("k=1 row");
        let k2 = result.get(2).expect("k=2 row");
        assert_eq!(k1.repetitions, [1.0, 1.0, 1.0]);
        for &rmse in &k2.repetitions {
            assert_relative_eq!(rmse, 0.45f64.sqrt(), epsilon = 1e-12);
        }
        assert_eq!(result.best_k(), Some(2));

        let result = options
            .metric(ResampleMetric::FoldAverage)
            .sweep(&table, &[1, 2])?;
        assert_relative_eq!(result.rows()[0].mean, 1.0, epsilon = 1e-12);
        assert_relative_eq!(result.rows()[1].mean, 0.3, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn running_mean_equals_direct_average() -> Result<(), anyhow::Error> {
        let (xs, ys) = noisy_data(60);
        let table = Table::new(&xs, &ys)?;
        let result = CrossValidationOptions::new()
            .folds(nz(5))
            .repetitions(nz(7))
            .seed(3)
            .sweep(&table, &(1..=20).collect::<Vec<_>>())?;

        assert_eq!(result.rows().len(), 20);
        for row in result.rows() {
            assert_eq!(row.repetitions.len(), 7);
            assert_relative_eq!(
                row.mean,
                functions::mean(row.repetitions.iter().copied()),
                epsilon = 1e-9
            );
        }
        Ok(())
    }

    #[test]
    fn seeded_sweeps_are_reproducible_and_parallel_agrees() -> Result<(), anyhow::Error> {
        let (xs, ys) = noisy_data(45);
        let table = Table::new(&xs, &ys)?;
        let ks = [1, 3, 5, 9, 15];
        let options = CrossValidationOptions::new()
            .folds(nz(5))
            .repetitions(nz(4))
            .kernel(Kernel::Triangular)
            .seed(11);

        let a = options.sweep(&table, &ks)?;
        let b = options.sweep(&table, &ks)?;
        let c = options.clone().parallel(true).sweep(&table, &ks)?;
        assert_eq!(a, b);
        assert_eq!(a, c);

        let d = options.seed(12).sweep(&table, &ks)?;
        assert_ne!(a, d);
        Ok(())
    }

    #[test]
    fn candidates_are_sorted_and_deduplicated() -> Result<(), anyhow::Error> {
        let (xs, ys) = noisy_data(30);
        let table = Table::new(&xs, &ys)?;
        let result = CrossValidationOptions::new()
            .seed(0)
            .sweep(&table, &[5, 1, 3, 5, 1])?;
        let ks = result.rows().iter().map(|r| r.k.get()).collect::<Vec<_>>();
        assert_eq!(ks, [1, 3, 5]);
        assert!(result.get(2).is_none());
        Ok(())
    }

    #[test]
    fn k_too_large_fails_before_any_work() -> Result<(), anyhow::Error> {
        let (xs, ys) = noisy_data(10);
        let table = Table::new(&xs, &ys)?;
        let options = CrossValidationOptions::new().folds(nz(5)).seed(0);

        assert!(options.sweep(&table, &[1, 8]).is_ok());
        let err = options
            .sweep(&table, &[1, 9])
            .expect_err("k=9 does not fit in 8 training rows");
        assert_eq!(err, CrossValidationError::KTooLarge { k: 9, available: 8 });
        assert_eq!(
            err.to_string(),
            "k = 9 exceeds the 8 rows available for training in each fold"
        );
        Ok(())
    }

    #[test]
    fn invalid_inputs() -> Result<(), anyhow::Error> {
        let (xs, ys) = noisy_data(10);
        let table = Table::new(&xs, &ys)?;
        let options = CrossValidationOptions::new();

        assert_eq!(
            options.sweep(&table, &[]).err(),
            Some(CrossValidationError::NoCandidates)
        );
        assert_eq!(
            options.sweep(&table, &[0, 1]).err(),
            Some(CrossValidationError::ZeroK)
        );
        assert_eq!(
            options.clone().folds(nz(1)).sweep(&table, &[1]).err(),
            Some(CrossValidationError::Partition(
                PartitionError::TooFewFolds { folds: 1 }
            ))
        );
        assert_eq!(
            options.folds(nz(11)).sweep(&table, &[1]).err(),
            Some(CrossValidationError::Partition(
                PartitionError::TooManyFolds { folds: 11, rows: 10 }
            ))
        );
        Ok(())
    }

    #[test]
    fn best_prefers_smallest_k_on_ties() {
        let table = CrossValidationTable {
            rows: [(1, 3.0), (2, 2.0), (3, 2.0), (4, 5.0)]
                .iter()
                .map(|&(k, mean)| CrossValidationRow {
                    k: nz(k),
                    repetitions: vec![mean],
                    mean,
                })
                .collect(),
        };
        assert_eq!(table.best_k(), Some(2));
        assert_eq!(table.best().map(|row| row.mean), Some(2.0));
    }

    #[test]
    fn empty_table_has_no_best_row() {
        let table = CrossValidationTable { rows: Vec::new() };
        assert!(table.best().is_none());
        assert_eq!(table.best_k(), None);
    }

    #[test]
    fn metric_names_parse_case_insensitively() -> Result<(), anyhow::Error> {
        for metric in ResampleMetric::ALL.iter().copied() {
            assert_eq!(metric.to_string().parse::<ResampleMetric>()?, metric);
        }
        assert_eq!("Fold-Average".parse::<ResampleMetric>()?, ResampleMetric::FoldAverage);
        assert_eq!("POOLED".parse::<ResampleMetric>()?, ResampleMetric::Pooled);
        assert!("mean".parse::<ResampleMetric>().is_err());
        Ok(())
    }
}
