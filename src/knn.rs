use crate::functions;
use crate::kernel::Kernel;
use crate::table::Table;
use ordered_float::OrderedFloat;
use std::num::NonZeroUsize;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct KnnOptions {
    k: NonZeroUsize,
    kernel: Kernel,
}

impl KnnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn k(mut self, k: NonZeroUsize) -> Self {
        self.k = k;
        self
    }

    pub fn kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn fit(&self, table: &Table) -> Result<KnnRegressor, FitError> {
        KnnRegressor::fit(table, self.clone())
    }
}

impl Default for KnnOptions {
    fn default() -> Self {
        Self {
            k: NonZeroUsize::new(7).expect("never fails"),
            kernel: Kernel::default(),
        }
    }
}

/// k-nearest-neighbors regressor over a single feature.
///
/// Distances are absolute differences of feature values. When several training
/// rows are equally distant from a query, the one that comes first in the
/// training table is preferred.
#[derive(Debug, Clone)]
pub struct KnnRegressor {
    k: usize,
    kernel: Kernel,
    training: Vec<(f64, f64)>,
}

impl KnnRegressor {
    pub fn fit(table: &Table, options: KnnOptions) -> Result<Self, FitError> {
        let k = options.k.get();
        if k > table.rows_len() {
            return Err(FitError::TooFewRows {
                k,
                rows: table.rows_len(),
            });
        }
        Ok(Self {
            k,
            kernel: options.kernel,
            training: table.rows().collect(),
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn predict(&self, x: f64) -> f64 {
        // One extra neighbor provides the bandwidth for weighted kernels.
        self.neighbors(x, self.k + 1).estimate(self.k, self.kernel)
    }

    pub fn predict_table(&self, table: &Table) -> Vec<f64> {
        table.feature().map(|x| self.predict(x)).collect()
    }

    pub fn neighbors(&self, x: f64, count: usize) -> Neighbors {
        Neighbors::search(self.training.iter().copied(), x, count)
    }
}

/// The nearest training rows of a query, closest first.
#[derive(Debug, Clone)]
pub struct Neighbors {
    distances: Vec<f64>,
    targets: Vec<f64>,
}

impl Neighbors {
    /// Finds up to `count` nearest rows of `training` to `x`.
    pub fn search(training: impl Iterator<Item = (f64, f64)>, x: f64, count: usize) -> Self {
        let mut candidates = training
            .enumerate()
            .map(|(i, (feature, target))| ((OrderedFloat((feature - x).abs()), i), target))
            .collect::<Vec<_>>();

        // The row index in the key makes the order total, so the unstable
        // selection still resolves ties by training order.
        if count == 0 {
            candidates.clear();
        } else if count < candidates.len() {
            candidates.select_nth_unstable_by_key(count - 1, |&(key, _)| key);
            candidates.truncate(count);
        }
        candidates.sort_unstable_by_key(|&(key, _)| key);

        let (distances, targets): (Vec<f64>, Vec<f64>) = candidates
            .into_iter()
            .map(|((distance, _), target)| (distance.0, target))
            .unzip();
        Self { distances, targets }
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Weighted mean of the `k` nearest targets.
    ///
    /// Panics if `k` is zero or larger than `self.len()`.
    pub fn estimate(&self, k: usize, kernel: Kernel) -> f64 {
        assert!(0 < k && k <= self.len(), "k={} of {}", k, self.len());
        let targets = &self.targets[..k];
        if kernel.is_uniform() {
            return functions::mean(targets.iter().copied());
        }

        let bandwidth = self
            .distances
            .get(k)
            .copied()
            .unwrap_or(self.distances[k - 1]);
        let mut total_weight = 0.0;
        let mut weighted_sum = 0.0;
        for (&distance, &target) in self.distances[..k].iter().zip(targets) {
            let scaled = if bandwidth > 0.0 {
                distance / bandwidth
            } else {
                0.0
            };
            let w = kernel.weight(scaled);
            total_weight += w;
            weighted_sum += w * target;
        }

        if total_weight > 0.0 && total_weight.is_finite() {
            weighted_sum / total_weight
        } else {
            functions::mean(targets.iter().copied())
        }
    }

    /// Estimates for every k in `ks`, which must be sorted in ascending order.
    pub fn estimate_all(&self, ks: &[usize], kernel: Kernel) -> Vec<f64> {
        debug_assert!(ks.windows(2).all(|w| w[0] <= w[1]));
        if !kernel.is_uniform() {
            return ks.iter().map(|&k| self.estimate(k, kernel)).collect();
        }

        let mut estimates = Vec::with_capacity(ks.len());
        let mut ks = ks.iter().copied().peekable();
        let mut sum = 0.0;
        for (i, &target) in self.targets.iter().enumerate() {
            sum += target;
            while ks.peek() == Some(&(i + 1)) {
                ks.next();
                estimates.push(sum / (i + 1) as f64);
            }
        }
        assert!(ks.next().is_none(), "k exceeds the number of neighbors");
        estimates
    }
}

#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FitError {
    #[error("k = {k} exceeds the {rows} available training rows")]
    TooFewRows { k: usize, rows: usize },
}
