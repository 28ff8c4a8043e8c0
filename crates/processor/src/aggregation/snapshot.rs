use crate::error::{AggregationError, AggregationResult};
use serde::{Deserialize, Serialize};

/// Immutable, sorted sample set for rank-based statistics
///
/// A snapshot is created once per aggregation window from the raw samples,
/// read, and discarded. The samples are sorted on construction so every
/// statistic is a read over an ordered slice.
///
/// All statistics of an empty snapshot are `0`.
///
/// # Examples
///
/// ```
/// use processor::aggregation::Snapshot;
///
/// let snapshot = Snapshot::new(vec![5, 1, 4, 2, 3]);
/// assert_eq!(snapshot.min(), 1);
/// assert_eq!(snapshot.max(), 5);
/// assert_eq!(snapshot.median(), 3.0);
/// assert!(snapshot.quantile(1.5).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    values: Vec<i64>,
}

impl Snapshot {
    /// Sort the samples and wrap them
    pub fn new(mut values: Vec<i64>) -> Self {
        values.sort_unstable();
        Self { values }
    }

    /// Samples in ascending order
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at quantile `q`, interpolating between the bracketing samples
    ///
    /// The rank position is `q * (n + 1)`; positions before the first sample
    /// clamp to the minimum and positions at or past the last clamp to the
    /// maximum.
    ///
    /// # Errors
    ///
    /// [`AggregationError::InvalidArgument`] when `q` is outside `[0, 1]`.
    pub fn quantile(&self, q: f64) -> AggregationResult<f64> {
        if !(0.0..=1.0).contains(&q) {
            return Err(AggregationError::InvalidArgument {
                name: "quantile",
                value: q,
                reason: "must be within [0, 1]".to_string(),
            });
        }
        Ok(self.rank_value(q))
    }

    fn rank_value(&self, q: f64) -> f64 {
        let n = self.values.len();
        if n == 0 {
            return 0.0;
        }

        let pos = q * (n + 1) as f64;
        if pos < 1.0 {
            return self.values[0] as f64;
        }
        if pos >= n as f64 {
            return self.values[n - 1] as f64;
        }

        let index = pos.floor() as usize;
        let lower = self.values[index - 1] as f64;
        let upper = self.values[index] as f64;
        lower + (pos - pos.floor()) * (upper - lower)
    }

    pub fn median(&self) -> f64 {
        self.rank_value(0.5)
    }

    pub fn p75(&self) -> f64 {
        self.rank_value(0.75)
    }

    pub fn p95(&self) -> f64 {
        self.rank_value(0.95)
    }

    pub fn p98(&self) -> f64 {
        self.rank_value(0.98)
    }

    pub fn p99(&self) -> f64 {
        self.rank_value(0.99)
    }

    pub fn p999(&self) -> f64 {
        self.rank_value(0.999)
    }

    pub fn min(&self) -> i64 {
        self.values.first().copied().unwrap_or(0)
    }

    pub fn max(&self) -> i64 {
        self.values.last().copied().unwrap_or(0)
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().map(|&v| v as f64).sum::<f64>() / self.values.len() as f64
    }

    /// Sample standard deviation (Bessel's correction, n-1)
    pub fn std_dev(&self) -> f64 {
        let n = self.values.len();
        if n <= 1 {
            return 0.0;
        }

        let mean = self.mean();
        let sum_sq: f64 = self
            .values
            .iter()
            .map(|&v| {
                let diff = v as f64 - mean;
                diff * diff
            })
            .sum();
        (sum_sq / (n - 1) as f64).sqrt()
    }
}

impl From<Vec<i64>> for Snapshot {
    fn from(values: Vec<i64>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<i64> for Snapshot {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
