//! Significance tester: two-sample t-tests and star tiers
//!
//! A group's values are compared with the population of the same covariate
//! and the two-tailed p-value is mapped onto a [`SignificanceTier`].
//!
//! - [`WelchTTest`] (default) does not assume equal variances
//! - [`StudentTTest`] pools the variances
//!
//! Both draw p-values from `statrs`' Student t distribution. Renderers only
//! see the [`TwoSampleTest`] trait, so either can be swapped in.

use crate::error::{BalanceError, Result};
use crate::summary::{describe, Moments, SdConvention};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::fmt;

/// Outcome of a two-sample t-test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTestResult {
    /// t statistic (sign follows `a - b`)
    pub statistic: f64,
    /// Degrees of freedom
    pub df: f64,
    /// Two-tailed p-value
    pub pvalue: f64,
}

/// A two-sample location test producing a two-tailed p-value
pub trait TwoSampleTest {
    fn run(&self, a: &[f64], b: &[f64]) -> Result<TTestResult>;

    fn p_value(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        Ok(self.run(a, b)?.pvalue)
    }
}

/// Independent t-test with unequal variances (Welch-Satterthwaite df)
#[derive(Debug, Clone, Copy, Default)]
pub struct WelchTTest;

/// Independent t-test with pooled variance (df = n1 + n2 - 2)
#[derive(Debug, Clone, Copy, Default)]
pub struct StudentTTest;

/// Sample size, mean and unbiased variance
struct SampleMoments {
    n: f64,
    mean: f64,
    var: f64,
}

fn sample_moments(values: &[f64]) -> Result<SampleMoments> {
    let Moments { count, mean, sd } = describe(values, SdConvention::Sample)?;
    Ok(SampleMoments {
        n: count as f64,
        mean,
        var: sd * sd,
    })
}

fn two_tailed(statistic: f64, df: f64) -> Result<f64> {
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| BalanceError::Distribution(e.to_string()))?;
    Ok((2.0 * (1.0 - dist.cdf(statistic.abs()))).clamp(0.0, 1.0))
}

impl TwoSampleTest for WelchTTest {
    fn run(&self, a: &[f64], b: &[f64]) -> Result<TTestResult> {
        let a = sample_moments(a)?;
        let b = sample_moments(b)?;

        let va = a.var / a.n;
        let vb = b.var / b.n;
        let se2 = va + vb;
        if se2 <= 0.0 {
            return Err(BalanceError::ZeroVariance);
        }

        let statistic = (a.mean - b.mean) / se2.sqrt();
        let df = se2.powi(2) / (va.powi(2) / (a.n - 1.0) + vb.powi(2) / (b.n - 1.0));
        let pvalue = two_tailed(statistic, df)?;

        Ok(TTestResult {
            statistic,
            df,
            pvalue,
        })
    }
}

impl TwoSampleTest for StudentTTest {
    fn run(&self, a: &[f64], b: &[f64]) -> Result<TTestResult> {
        let a = sample_moments(a)?;
        let b = sample_moments(b)?;

        let df = a.n + b.n - 2.0;
        let pooled = ((a.n - 1.0) * a.var + (b.n - 1.0) * b.var) / df;
        let se2 = pooled * (1.0 / a.n + 1.0 / b.n);
        if se2 <= 0.0 {
            return Err(BalanceError::ZeroVariance);
        }

        let statistic = (a.mean - b.mean) / se2.sqrt();
        let pvalue = two_tailed(statistic, df)?;

        Ok(TTestResult {
            statistic,
            df,
            pvalue,
        })
    }
}

/// Which t-test variant to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    #[default]
    Welch,
    Student,
}

impl TestKind {
    pub fn tester(self) -> &'static dyn TwoSampleTest {
        match self {
            TestKind::Welch => &WelchTTest,
            TestKind::Student => &StudentTTest,
        }
    }
}

/// Star annotation for a p-value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceTier {
    #[default]
    None,
    One,
    Two,
    Three,
}

impl SignificanceTier {
    pub fn stars(self) -> &'static str {
        match self {
            SignificanceTier::None => "",
            SignificanceTier::One => "*",
            SignificanceTier::Two => "**",
            SignificanceTier::Three => "***",
        }
    }

    pub fn is_significant(self) -> bool {
        self != SignificanceTier::None
    }
}

impl fmt::Display for SignificanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stars())
    }
}

/// P-value cut-offs, loosest first (`*`, `**`, `***`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thresholds(pub [f64; 3]);

impl Default for Thresholds {
    fn default() -> Self {
        Self([0.10, 0.05, 0.01])
    }
}

impl Thresholds {
    /// Validated thresholds: each in (0, 1], each stricter than the previous
    pub fn new(values: [f64; 3]) -> Result<Self> {
        let thresholds = Self(values);
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Build from a slice, as callers pass `[0.1, 0.05, 0.01]`
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let values: [f64; 3] = values
            .try_into()
            .map_err(|_| BalanceError::UnsortedThresholds(values.to_vec()))?;
        Self::new(values)
    }

    pub fn validate(&self) -> Result<()> {
        let [loose, middle, tight] = self.0;
        let in_range = self.0.iter().all(|t| *t > 0.0 && *t <= 1.0);
        if !in_range || !(loose > middle && middle > tight) {
            return Err(BalanceError::UnsortedThresholds(self.0.to_vec()));
        }
        Ok(())
    }

    pub fn values(&self) -> [f64; 3] {
        self.0
    }

    /// Map a p-value onto a tier; NaN is never significant
    pub fn classify(&self, pvalue: f64) -> SignificanceTier {
        let [loose, middle, tight] = self.0;
        if pvalue <= tight {
            SignificanceTier::Three
        } else if pvalue <= middle {
            SignificanceTier::Two
        } else if pvalue <= loose {
            SignificanceTier::One
        } else {
            SignificanceTier::None
        }
    }
}

/// Test a group against the population with Welch's t-test
pub fn test_significance(
    subpopulation: &[f64],
    population: &[f64],
    thresholds: &Thresholds,
) -> Result<SignificanceTier> {
    test_significance_with(&WelchTTest, subpopulation, population, thresholds)
}

/// Test a group against the population with an explicit test
///
/// Samples too small or too flat for a t-test yield `SignificanceTier::None`.
/// Any other failure of the test is returned to the caller.
pub fn test_significance_with(
    test: &dyn TwoSampleTest,
    subpopulation: &[f64],
    population: &[f64],
    thresholds: &Thresholds,
) -> Result<SignificanceTier> {
    match test.p_value(subpopulation, population) {
        Ok(pvalue) => Ok(thresholds.classify(pvalue)),
        Err(e) if e.is_degenerate_sample() => {
            tracing::warn!("Significance test skipped: {}", e);
            Ok(SignificanceTier::None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welch_significant_difference() {
        let baseline = [10.0, 12.0, 11.0, 13.0, 10.0];
        let current = [25.0, 27.0, 26.0, 28.0, 25.0];

        let result = WelchTTest.run(&baseline, &current).unwrap();
        assert!(result.statistic < 0.0);
        assert!(result.pvalue < 0.001, "p-value {}", result.pvalue);
    }

    #[test]
    fn test_welch_no_difference() {
        let baseline = [10.0, 12.0, 11.0, 13.0, 10.0];
        let current = [11.0, 13.0, 10.0, 12.0, 11.0];

        let result = WelchTTest.run(&baseline, &current).unwrap();
        // t = -0.258, df = 7.86 -> p = 0.803
        assert!((result.statistic + 0.2582).abs() < 1e-3);
        assert!((result.df - 7.8603).abs() < 1e-3);
        assert!((result.pvalue - 0.8029).abs() < 1e-3);
    }

    #[test]
    fn test_welch_flat_group_against_population() {
        // Sub variance is zero, so df collapses to n_pop - 1 = 5
        let result = WelchTTest
            .run(&[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0, 100.0, 100.0, 100.0])
            .unwrap();
        assert!((result.statistic + 2.2361).abs() < 1e-3);
        assert!((result.df - 5.0).abs() < 1e-9);
        assert!((result.pvalue - 0.0756).abs() < 1e-3);
    }

    #[test]
    fn test_student_pooled_variance() {
        let result = StudentTTest
            .run(&[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0, 100.0, 100.0, 100.0])
            .unwrap();
        assert_eq!(result.df, 7.0);
        assert!((result.statistic + 1.5275).abs() < 1e-3);
        assert!((result.pvalue - 0.1705).abs() < 1e-3);
    }

    #[test]
    fn test_insufficient_samples() {
        assert_eq!(
            WelchTTest.run(&[10.0], &[12.0, 13.0]).unwrap_err(),
            BalanceError::InsufficientData {
                required: 2,
                actual: 1
            }
        );
        assert!(StudentTTest.run(&[], &[12.0, 13.0]).is_err());
    }

    #[test]
    fn test_zero_variance() {
        assert_eq!(
            WelchTTest.run(&[5.0, 5.0], &[5.0, 5.0, 5.0]).unwrap_err(),
            BalanceError::ZeroVariance
        );
        assert_eq!(
            StudentTTest.run(&[5.0, 5.0], &[7.0, 7.0]).unwrap_err(),
            BalanceError::ZeroVariance
        );
    }

    #[test]
    fn test_classify_tiers() {
        let t = Thresholds::default();
        assert_eq!(t.classify(0.001), SignificanceTier::Three);
        assert_eq!(t.classify(0.01), SignificanceTier::Three);
        assert_eq!(t.classify(0.03), SignificanceTier::Two);
        assert_eq!(t.classify(0.05), SignificanceTier::Two);
        assert_eq!(t.classify(0.07), SignificanceTier::One);
        assert_eq!(t.classify(0.10), SignificanceTier::One);
        assert_eq!(t.classify(0.5), SignificanceTier::None);
        assert_eq!(t.classify(f64::NAN), SignificanceTier::None);
    }

    #[test]
    fn test_thresholds_validation() {
        assert!(Thresholds::new([0.1, 0.05, 0.01]).is_ok());
        assert!(Thresholds::new([0.2, 0.1, 0.001]).is_ok());
        assert!(Thresholds::new([0.01, 0.05, 0.1]).is_err());
        assert!(Thresholds::new([0.1, 0.1, 0.01]).is_err());
        assert!(Thresholds::new([1.5, 0.05, 0.01]).is_err());
        assert!(Thresholds::new([0.1, 0.05, 0.0]).is_err());
        assert!(Thresholds::from_slice(&[0.1, 0.05]).is_err());
        assert_eq!(
            Thresholds::from_slice(&[0.1, 0.05, 0.01]).unwrap(),
            Thresholds::default()
        );
    }

    #[test]
    fn test_degenerate_input_has_no_stars() {
        let t = Thresholds::default();
        assert_eq!(
            test_significance(&[5.0], &[5.0, 6.0, 7.0], &t).unwrap(),
            SignificanceTier::None
        );
        assert_eq!(
            test_significance(&[5.0, 5.0, 5.0], &[5.0, 5.0, 5.0, 5.0], &t).unwrap(),
            SignificanceTier::None
        );
    }

    #[test]
    fn test_significance_with_student() {
        let t = Thresholds::default();
        let pop = [1.0, 1.0, 1.0, 100.0, 100.0, 100.0];
        assert_eq!(
            test_significance(&[1.0, 1.0, 1.0], &pop, &t).unwrap(),
            SignificanceTier::One
        );
        assert_eq!(
            test_significance_with(&StudentTTest, &[1.0, 1.0, 1.0], &pop, &t).unwrap(),
            SignificanceTier::None
        );
    }

    /// Reports a t statistic with zero degrees of freedom
    struct ZeroDfTest;

    impl TwoSampleTest for ZeroDfTest {
        fn run(&self, _a: &[f64], _b: &[f64]) -> Result<TTestResult> {
            Ok(TTestResult {
                statistic: 1.0,
                df: 0.0,
                pvalue: two_tailed(1.0, 0.0)?,
            })
        }
    }

    #[test]
    fn test_distribution_failure_is_returned() {
        let t = Thresholds::default();
        let err = test_significance_with(&ZeroDfTest, &[1.0, 2.0], &[3.0, 4.0], &t).unwrap_err();
        assert!(matches!(err, BalanceError::Distribution(_)));
        assert!(!err.is_degenerate_sample());
    }

    #[test]
    fn test_sample_moments_use_unbiased_variance() {
        let m = sample_moments(&[2.0, 4.0, 6.0]).unwrap();
        assert_eq!(m.n, 3.0);
        assert_eq!(m.mean, 4.0);
        assert!((m.var - 4.0).abs() < 1e-12);
        assert_eq!(
            sample_moments(&[]).err(),
            Some(BalanceError::InsufficientData {
                required: 2,
                actual: 0
            })
        );
    }

    #[test]
    fn test_tier_stars() {
        assert_eq!(SignificanceTier::None.stars(), "");
        assert_eq!(SignificanceTier::Three.to_string(), "***");
        assert!(SignificanceTier::One.is_significant());
        assert!(SignificanceTier::Three > SignificanceTier::One);
    }
}
