// Per-group statistics over trial results
//
// Mean is computed exactly in f64. Median and spread go through aprender and
// trueno on f32, the same way the regression statistics do; their precision
// is ample for ranking output combinations.

use crate::error::{CompileError, Result};
use aprender::stats::DescriptiveStats;
use serde::{Deserialize, Serialize};
use trueno::Vector;

/// Statistic used to score an output combination within a bucket
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum CentralTendency {
    #[default]
    Mean,
    /// More robust when trial timings have spikes
    Median,
}

impl CentralTendency {
    /// Score of a non-empty set of results
    pub fn summarize(self, results: &[f64]) -> Result<f64> {
        if results.is_empty() {
            return Err(CompileError::Statistics(
                "cannot summarize an empty group".to_string(),
            ));
        }
        match self {
            Self::Mean => Ok(results.iter().sum::<f64>() / results.len() as f64),
            Self::Median => median(results),
        }
    }
}

/// Whether lower or higher scores win
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationGoal {
    /// Results are costs (run time)
    #[default]
    Minimize,
    /// Results are rewards (throughput)
    Maximize,
}

impl OptimizationGoal {
    /// True when `candidate` is strictly better than `incumbent`
    pub fn prefers(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Minimize => candidate < incumbent,
            Self::Maximize => candidate > incumbent,
        }
    }
}

/// Median via aprender's R-7 quantile
pub fn median(results: &[f64]) -> Result<f64> {
    let samples: Vec<f32> = results.iter().map(|&r| r as f32).collect();
    let vector = Vector::from_slice(&samples);
    let stats = DescriptiveStats::new(&vector);
    stats
        .quantile(0.5)
        .map(f64::from)
        .map_err(|e| CompileError::Statistics(format!("median failed: {}", e)))
}

/// Standard deviation of a group; 0 for fewer than two results
pub fn spread(results: &[f64]) -> f64 {
    if results.len() < 2 {
        return 0.0;
    }
    let samples: Vec<f32> = results.iter().map(|&r| r as f32).collect();
    f64::from(Vector::from_slice(&samples).stddev().unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_is_exact() {
        let mean = CentralTendency::Mean.summarize(&[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(mean, (0.1 + 0.2 + 0.3) / 3.0);
    }

    #[test]
    fn test_median_odd_length() {
        let m = CentralTendency::Median
            .summarize(&[9.0, 1.0, 5.0, 3.0, 7.0])
            .unwrap();
        assert_eq!(m, 5.0);
    }

    #[test]
    fn test_median_ignores_outlier() {
        let m = CentralTendency::Median
            .summarize(&[2.0, 2.0, 2.0, 1000.0, 2.0])
            .unwrap();
        assert_eq!(m, 2.0);
    }

    #[test]
    fn test_empty_group_is_an_error() {
        assert!(CentralTendency::Mean.summarize(&[]).is_err());
    }

    #[test]
    fn test_goal_preference() {
        assert!(OptimizationGoal::Minimize.prefers(1.0, 2.0));
        assert!(!OptimizationGoal::Minimize.prefers(2.0, 2.0));
        assert!(OptimizationGoal::Maximize.prefers(3.0, 2.0));
        assert!(!OptimizationGoal::Maximize.prefers(2.0, 2.0));
    }

    #[test]
    fn test_spread() {
        assert_eq!(spread(&[4.0]), 0.0);
        assert_eq!(spread(&[3.0, 3.0, 3.0]), 0.0);
        assert!(spread(&[1.0, 5.0]) > 0.0);
    }
}
