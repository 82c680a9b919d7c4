//! Balance report: summaries and significance tiers for every covariate
//!
//! The report is the renderer-independent result of the aggregate and test
//! stages. [`crate::latex`] turns it into markup; it can also be exported
//! as JSON.

use crate::config::{BalanceConfig, PopulationMode};
use crate::dataset::{Dataset, Group, GroupKey, TreatmentKey};
use crate::error::{BalanceError, Result};
use crate::significance::{test_significance_with, SignificanceTier, Thresholds, TwoSampleTest};
use crate::summary::{describe, Moments};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One treatment group column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupColumn {
    pub key: GroupKey,
    /// Number of rows in the group
    pub observations: usize,
}

/// Group statistics for one covariate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCell {
    pub count: usize,
    pub mean: f64,
    pub sd: f64,
    pub tier: SignificanceTier,
}

/// One covariate across the whole dataset and every group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovariateRow {
    pub name: String,
    /// All-data statistics, never starred
    pub overall: Moments,
    /// One cell per group, in column order
    pub cells: Vec<GroupCell>,
}

/// Computed balance table prior to formatting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    pub treatment: TreatmentKey,
    pub groups: Vec<GroupColumn>,
    pub rows: Vec<CovariateRow>,
    /// Total dataset row count
    pub observations: usize,
    pub thresholds: Thresholds,
}

impl BalanceReport {
    /// Summarize and test every covariate
    ///
    /// All inputs are validated first; any error aborts the whole report.
    pub fn build(
        dataset: &Dataset,
        treatment: &TreatmentKey,
        covariates: &[&str],
        config: &BalanceConfig,
    ) -> Result<Self> {
        config.validate()?;
        validate_covariates(dataset, covariates)?;

        let groups = dataset.partition(treatment)?;
        let test = config.test.tester();

        let rows = covariates
            .iter()
            .map(|name| {
                tracing::debug!("summarizing covariate {} over {} groups", name, groups.len());
                build_row(dataset, &groups, name, config, test)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            treatment: treatment.clone(),
            groups: groups
                .iter()
                .map(|g| GroupColumn {
                    key: g.key.clone(),
                    observations: g.size(),
                })
                .collect(),
            rows,
            observations: dataset.len(),
            thresholds: config.thresholds,
        })
    }

    /// Export as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn validate_covariates(dataset: &Dataset, covariates: &[&str]) -> Result<()> {
    if dataset.is_empty() {
        return Err(BalanceError::EmptyDataset);
    }
    if covariates.is_empty() {
        return Err(BalanceError::NoCovariates);
    }

    let mut seen = HashSet::new();
    for name in covariates {
        if !seen.insert(*name) {
            return Err(BalanceError::DuplicateCovariate(name.to_string()));
        }
        if !dataset.has_column(name) {
            return Err(BalanceError::MissingCovariate(name.to_string()));
        }
    }
    Ok(())
}

fn build_row(
    dataset: &Dataset,
    groups: &[Group],
    name: &str,
    config: &BalanceConfig,
    test: &dyn TwoSampleTest,
) -> Result<CovariateRow> {
    let column = dataset.numeric_column(name)?;
    let population: Vec<f64> = column.iter().flatten().copied().collect();

    // Sample sd needs two values; a single observation reports sd 0
    let overall = match describe(&population, config.overall_sd) {
        Ok(moments) => moments,
        Err(BalanceError::InsufficientData { actual: 1, .. }) => Moments {
            count: 1,
            mean: population[0],
            sd: 0.0,
        },
        Err(_) => {
            return Err(BalanceError::EmptyGroup {
                covariate: name.to_string(),
                group: "all".to_string(),
            })
        }
    };

    let cells = groups
        .iter()
        .map(|group| {
            let values = group.values(&column);
            if values.is_empty() {
                return Err(BalanceError::EmptyGroup {
                    covariate: name.to_string(),
                    group: group.key.to_string(),
                });
            }
            let moments = describe(&values, config.group_sd).unwrap_or(Moments {
                count: values.len(),
                mean: values[0],
                sd: 0.0,
            });

            let tier = match config.population {
                PopulationMode::Full => {
                    test_significance_with(test, &values, &population, &config.thresholds)?
                }
                PopulationMode::ExcludeGroup => {
                    let rest = rest_of_population(&column, group);
                    test_significance_with(test, &values, &rest, &config.thresholds)?
                }
            };

            Ok(GroupCell {
                count: moments.count,
                mean: moments.mean,
                sd: moments.sd,
                tier,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CovariateRow {
        name: name.to_string(),
        overall,
        cells,
    })
}

/// Non-missing values of rows outside `group`
fn rest_of_population(column: &[Option<f64>], group: &Group) -> Vec<f64> {
    let members: HashSet<usize> = group.rows.iter().copied().collect();
    column
        .iter()
        .enumerate()
        .filter(|(row, _)| !members.contains(row))
        .filter_map(|(_, value)| *value)
        .collect()
}
