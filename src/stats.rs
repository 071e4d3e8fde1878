//! SPC statistics: mean, sample standard deviation and ±3σ control limits.

use serde::{Deserialize, Serialize};

use crate::data::{SamplePoint, TimeSeries};
use crate::error::{SpcError, SpcResult};

/// Control limits sit this many standard deviations from the mean.
pub const SIGMA_MULTIPLIER: f64 = 3.0;

/// Derived, read-only summary of one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpcSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub upper_control_limit: f64,
    pub lower_control_limit: f64,
    pub count: usize,
}

impl SpcSummary {
    fn from_moments(mean: f64, std_dev: f64, count: usize) -> Self {
        let band = SIGMA_MULTIPLIER * std_dev;
        Self {
            mean,
            std_dev,
            upper_control_limit: mean + band,
            lower_control_limit: mean - band,
            count,
        }
    }

    pub fn in_control(&self, value: f64) -> bool {
        value >= self.lower_control_limit && value <= self.upper_control_limit
    }
}

/// Sample mean and sample (n - 1) standard deviation over the values.
///
/// A single point has no spread and gets `std_dev = 0`.
pub fn summarize(series: &TimeSeries) -> SpcResult<SpcSummary> {
    if series.is_empty() {
        return Err(SpcError::InvalidInput("series is empty".to_string()));
    }
    if let Some(p) = series.points().iter().find(|p| !p.value.is_finite()) {
        return Err(SpcError::InvalidInput(format!(
            "non-finite value {} on {}",
            p.value, p.date
        )));
    }

    let n = series.len();
    let mean = series.values().sum::<f64>() / n as f64;
    let std_dev = if n < 2 {
        0.0
    } else {
        let ss: f64 = series.values().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    };
    Ok(SpcSummary::from_moments(mean, std_dev, n))
}

/// Points strictly outside the control limits.
pub fn out_of_control(series: &TimeSeries, summary: &SpcSummary) -> Vec<SamplePoint> {
    series
        .points()
        .iter()
        .filter(|p| !summary.in_control(p.value))
        .copied()
        .collect()
}
