pub fn mean(xs: impl Iterator<Item = f64>) -> f64 {
    let mut count = 0;
    let mut total = 0.0;
    for x in xs {
        count += 1;
        total += x;
    }
    assert_ne!(count, 0);
    total / count as f64
}

pub fn variance(xs: impl Iterator<Item = f64> + Clone) -> f64 {
    let n = xs.clone().count() as f64;
    let m = mean(xs.clone());
    xs.map(|x| (x - m).powi(2)).sum::<f64>() / n
}

pub fn rmse(sum_of_squared_errors: f64, samples: usize) -> f64 {
    debug_assert_ne!(samples, 0);
    (sum_of_squared_errors / samples as f64).sqrt()
}

/// Incremental mean that never stores the values it has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMean {
    count: usize,
    mean: f64,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: f64) {
        self.count += 1;
        self.mean += (x - self.mean) / self.count as f64;
    }

    pub fn get(&self) -> f64 {
        self.mean
    }
}
