//! Balance tables - group-wise covariate summaries with significance stars
//!
//! This library summarizes covariates per treatment group (count, mean,
//! standard deviation), tests each group mean against the overall population
//! with a two-sample t-test, and renders the result as a LaTeX `tabular`.
//!
//! The pipeline is aggregate → test → format:
//!
//! ```
//! use balance_table::{single_treatment_table, Dataset};
//!
//! let data = Dataset::from_json_str(r#"[
//!     {"arm": "A", "age": 5.0}, {"arm": "A", "age": 5.0},
//!     {"arm": "B", "age": 5.0}, {"arm": "B", "age": 5.0}
//! ]"#).unwrap();
//!
//! let table = single_treatment_table(&data, "arm", &["age"], &[0.1, 0.05, 0.01]).unwrap();
//! assert!(table.contains("age & 5.000 & 5.000 & 5.000 \\\\"));
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod label;
pub mod latex;
pub mod report;
pub mod significance;
pub mod summary;

pub use config::{BalanceConfig, PopulationMode};
pub use dataset::{Dataset, GroupKey, KeyPart, Record, TreatmentKey, Value};
pub use error::{BalanceError, Result};
pub use label::{Abbreviate, LabelFormatter, LabelStyle, Lookup, Verbatim};
pub use latex::LatexTable;
pub use report::BalanceReport;
pub use significance::{
    test_significance, test_significance_with, SignificanceTier, StudentTTest, TTestResult,
    TestKind, Thresholds, TwoSampleTest, WelchTTest,
};
pub use summary::{describe, summarize, summarize_with, GroupSummary, Moments, SdConvention};

/// Render a balance table with default settings and the given thresholds
///
/// Single-column keys use verbatim group labels; composite keys use the
/// first three characters of each key component.
pub fn render(
    dataset: &Dataset,
    treatment_key: &TreatmentKey,
    covariates: &[&str],
    thresholds: &Thresholds,
) -> Result<String> {
    render_with_config(
        dataset,
        treatment_key,
        covariates,
        &BalanceConfig::with_thresholds(*thresholds),
    )
}

/// Render a balance table with an explicit configuration
pub fn render_with_config(
    dataset: &Dataset,
    treatment_key: &TreatmentKey,
    covariates: &[&str],
    config: &BalanceConfig,
) -> Result<String> {
    Ok(build_table(dataset, treatment_key, covariates, config)?.render())
}

/// Summarize, test and lay out the table without joining it into text
pub fn build_table(
    dataset: &Dataset,
    treatment_key: &TreatmentKey,
    covariates: &[&str],
    config: &BalanceConfig,
) -> Result<LatexTable> {
    let report = BalanceReport::build(dataset, treatment_key, covariates, config)?;
    let labels = config.label_style(treatment_key.is_composite()).formatter();
    latex::layout(&report, config, labels.as_ref())
}

/// Balance table for one categorical treatment column
pub fn single_treatment_table(
    dataset: &Dataset,
    treatment: &str,
    covariates: &[&str],
    thresholds: &[f64],
) -> Result<String> {
    let thresholds = Thresholds::from_slice(thresholds)?;
    render(
        dataset,
        &TreatmentKey::single(treatment),
        covariates,
        &thresholds,
    )
}

/// Balance table for groups formed by several treatment columns
pub fn multi_treatment_table(
    dataset: &Dataset,
    treatments: &[&str],
    covariates: &[&str],
    thresholds: &[f64],
) -> Result<String> {
    let thresholds = Thresholds::from_slice(thresholds)?;
    render(
        dataset,
        &TreatmentKey::composite(treatments.iter().copied()),
        covariates,
        &thresholds,
    )
}
