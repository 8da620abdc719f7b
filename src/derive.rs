//! Secondary metrics computed from aggregated ones.
//!
//! Division follows IEEE semantics: a zero denominator yields `±inf` or `NaN`
//! and is passed on, never raised.

use tracing::debug;

use crate::aggregate::GroupedTable;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum Derivation {
    /// `numerator / denominator`
    Ratio {
        numerator: String,
        denominator: String,
    },
    /// `constant / denominator`
    ConstantRatio { numerator: f64, denominator: String },
    /// `left + right`
    Sum { left: String, right: String },
    /// `(comparison - baseline) / baseline * 100`
    PercentDiff {
        baseline: String,
        comparison: String,
    },
}

/// A named column and how to compute it.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMetric {
    pub name: String,
    pub derivation: Derivation,
}

impl DerivedMetric {
    pub fn ratio(name: &str, numerator: &str, denominator: &str) -> Self {
        DerivedMetric {
            name: name.to_string(),
            derivation: Derivation::Ratio {
                numerator: numerator.to_string(),
                denominator: denominator.to_string(),
            },
        }
    }

    pub fn constant_ratio(name: &str, numerator: f64, denominator: &str) -> Self {
        DerivedMetric {
            name: name.to_string(),
            derivation: Derivation::ConstantRatio {
                numerator,
                denominator: denominator.to_string(),
            },
        }
    }

    pub fn sum(name: &str, left: &str, right: &str) -> Self {
        DerivedMetric {
            name: name.to_string(),
            derivation: Derivation::Sum {
                left: left.to_string(),
                right: right.to_string(),
            },
        }
    }

    pub fn percent_diff(name: &str, baseline: &str, comparison: &str) -> Self {
        DerivedMetric {
            name: name.to_string(),
            derivation: Derivation::PercentDiff {
                baseline: baseline.to_string(),
                comparison: comparison.to_string(),
            },
        }
    }
}

/// Relative change from `baseline` to `comparison`, in percent.
pub fn percent_diff(baseline: f64, comparison: f64) -> f64 {
    (comparison - baseline) / baseline * 100.0
}

impl GroupedTable {
    /// Append one derived column. Inputs may be earlier derived columns.
    pub fn derive(&mut self, metric: &DerivedMetric) -> Result<()> {
        match &metric.derivation {
            Derivation::Ratio {
                numerator,
                denominator,
            } => {
                let n = self.metric_index(numerator)?;
                let d = self.metric_index(denominator)?;
                self.push_metric(&metric.name, |row| row[n] / row[d]);
            }
            Derivation::ConstantRatio {
                numerator,
                denominator,
            } => {
                let d = self.metric_index(denominator)?;
                let numerator = *numerator;
                self.push_metric(&metric.name, |row| numerator / row[d]);
            }
            Derivation::Sum { left, right } => {
                let l = self.metric_index(left)?;
                let r = self.metric_index(right)?;
                self.push_metric(&metric.name, |row| row[l] + row[r]);
            }
            Derivation::PercentDiff {
                baseline,
                comparison,
            } => {
                let b = self.metric_index(baseline)?;
                let c = self.metric_index(comparison)?;
                self.push_metric(&metric.name, |row| percent_diff(row[b], row[c]));
            }
        }
        debug!(metric = %metric.name, "derived");
        Ok(())
    }

    /// Append several derived columns in order.
    pub fn derive_all(&mut self, metrics: &[DerivedMetric]) -> Result<()> {
        metrics.iter().try_for_each(|metric| self.derive(metric))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_diff_of_equal_values_is_zero() {
        assert_eq!(percent_diff(42.0, 42.0), 0.0);
    }

    #[test]
    fn percent_diff_zero_over_zero_is_nan() {
        assert!(percent_diff(0.0, 0.0).is_nan());
    }

    #[test]
    fn percent_diff_drop_below_zero_baseline() {
        assert_eq!(percent_diff(0.0, -5.0), f64::NEG_INFINITY);
    }
}
