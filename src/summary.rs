//! Group summarizer: per-group count, mean and standard deviation
//!
//! Groups come out in natural key order (see [`Dataset::partition`]).
//! Missing cells are excluded from every statistic.

use crate::dataset::{Dataset, GroupKey, TreatmentKey};
use crate::error::{BalanceError, Result};
use serde::{Deserialize, Serialize};

/// Divisor used for the standard deviation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SdConvention {
    /// Divide by N (ddof = 0)
    #[default]
    Population,
    /// Divide by N - 1 (ddof = 1)
    Sample,
}

impl SdConvention {
    fn ddof(self) -> usize {
        match self {
            SdConvention::Population => 0,
            SdConvention::Sample => 1,
        }
    }
}

/// Count, mean and standard deviation of a sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    pub count: usize,
    pub mean: f64,
    pub sd: f64,
}

/// Summary of one covariate within one treatment group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub key: GroupKey,
    pub count: usize,
    pub mean: f64,
    pub sd: f64,
}

/// Compute count, mean and standard deviation of `values`
///
/// Returns `InsufficientData` when there are not more values than the
/// convention's ddof (an empty sample, or a single value with `Sample`).
pub fn describe(values: &[f64], convention: SdConvention) -> Result<Moments> {
    let count = values.len();
    let ddof = convention.ddof();
    if count == 0 || count <= ddof {
        return Err(BalanceError::InsufficientData {
            required: ddof + 1,
            actual: count,
        });
    }

    let mean = values.iter().sum::<f64>() / count as f64;
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    let sd = (squares / (count - ddof) as f64).sqrt();

    Ok(Moments { count, mean, sd })
}

/// Summarize `variable` per treatment group (population standard deviation)
///
/// Fails with `EmptyGroup` when a group has no non-missing observation of
/// the variable, so no NaN ever reaches a rendered table.
pub fn summarize(
    variable: &str,
    dataset: &Dataset,
    treatment_key: &TreatmentKey,
) -> Result<Vec<GroupSummary>> {
    summarize_with(variable, dataset, treatment_key, SdConvention::Population)
}

/// [`summarize`] with an explicit standard deviation convention
pub fn summarize_with(
    variable: &str,
    dataset: &Dataset,
    treatment_key: &TreatmentKey,
    convention: SdConvention,
) -> Result<Vec<GroupSummary>> {
    let column = dataset.numeric_column(variable)?;
    let groups = dataset.partition(treatment_key)?;

    groups
        .iter()
        .map(|group| {
            let values = group.values(&column);
            if values.is_empty() {
                return Err(BalanceError::EmptyGroup {
                    covariate: variable.to_string(),
                    group: group.key.to_string(),
                });
            }
            let moments = describe(&values, convention)?;
            Ok(GroupSummary {
                key: group.key.clone(),
                count: moments.count,
                mean: moments.mean,
                sd: moments.sd,
            })
        })
        .collect()
}
