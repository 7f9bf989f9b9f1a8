//! Statistics Calculator Module
//! Handles the quantile arithmetic behind Q-Q plots and GWAS summaries.

use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

/// Median of the chi-squared distribution with one degree of freedom.
pub const CHI2_1DF_MEDIAN: f64 = 0.454_936_423_119_572_7;

/// Default offset used by `ppoints`.
pub const DEFAULT_PPOINTS_OFFSET: f64 = 0.5;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("ppoints offset must be within [0, 1], got {0}")]
    InvalidOffset(f64),
    #[error("No values to compute statistics on")]
    Empty,
    #[error("Values have zero variance")]
    ZeroVariance,
    #[error("Distribution error: {0}")]
    Distribution(String),
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Plotting positions `(i + 1 - a) / (n + 1 - 2a)` for `i` in `0..n`.
    ///
    /// These are the probabilities at which the expected distribution of a
    /// Q-Q plot is evaluated.
    pub fn ppoints(n: usize, a: f64) -> Result<Vec<f64>, StatsError> {
        if !(0.0..=1.0).contains(&a) {
            return Err(StatsError::InvalidOffset(a));
        }

        let denom = n as f64 + 1.0 - 2.0 * a;
        Ok((0..n).map(|i| (i as f64 + 1.0 - a) / denom).collect())
    }

    /// `-log10` of every value.
    pub fn neg_log10(values: &[f64]) -> Vec<f64> {
        values.par_iter().map(|v| -v.log10()).collect()
    }

    /// Sorted copy of the values, NaN last.
    pub fn sorted(values: &[f64]) -> Vec<f64> {
        let mut sorted = values.to_vec();
        sorted.par_sort_unstable_by(|a, b| a.total_cmp(b));
        sorted
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    pub fn median(values: &[f64]) -> f64 {
        Self::percentile(&Self::sorted(values), 50.0)
    }

    /// Mean and population standard deviation (ddof = 0).
    pub fn mean_std(values: &[f64]) -> Result<(f64, f64), StatsError> {
        let n = values.len();
        if n == 0 {
            return Err(StatsError::Empty);
        }

        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        Ok((mean, variance.sqrt()))
    }

    /// Standard normal quantiles for the given probabilities.
    pub fn normal_quantiles(probabilities: &[f64]) -> Result<Vec<f64>, StatsError> {
        let normal =
            Normal::new(0.0, 1.0).map_err(|e| StatsError::Distribution(e.to_string()))?;
        Ok(probabilities
            .par_iter()
            .map(|&p| normal.inverse_cdf(p))
            .collect())
    }

    /// Genomic inflation factor (lambda GC) of a set of p-values.
    ///
    /// Each p-value is turned into a 1-df chi-squared statistic through the
    /// two-sided normal quantile, which stays accurate for tiny p-values.
    pub fn genomic_inflation(pvalues: &[f64]) -> Result<f64, StatsError> {
        if pvalues.is_empty() {
            return Err(StatsError::Empty);
        }

        let normal =
            Normal::new(0.0, 1.0).map_err(|e| StatsError::Distribution(e.to_string()))?;
        let chi2: Vec<f64> = pvalues
            .par_iter()
            .map(|&p| normal.inverse_cdf(p / 2.0).powi(2))
            .collect();

        Ok(Self::median(&chi2) / CHI2_1DF_MEDIAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_ppoints() {
        let p = StatsCalculator::ppoints(4, 0.5).unwrap();
        assert_eq!(p, vec![0.125, 0.375, 0.625, 0.875]);

        let blom = StatsCalculator::ppoints(2, 3.0 / 8.0).unwrap();
        assert!(approx(blom[0], 0.625 / 2.25, 1e-12));

        assert!(StatsCalculator::ppoints(0, 0.5).unwrap().is_empty());
        assert!(matches!(
            StatsCalculator::ppoints(3, 1.5),
            Err(StatsError::InvalidOffset(_))
        ));
    }

    #[test]
    fn test_neg_log10() {
        let out = StatsCalculator::neg_log10(&[1.0, 0.1, 1e-8]);
        assert!(approx(out[0], 0.0, 1e-12));
        assert!(approx(out[1], 1.0, 1e-12));
        assert!(approx(out[2], 8.0, 1e-12));
    }

    #[test]
    fn test_percentile_numpy_compatible() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!(approx(StatsCalculator::percentile(&sorted, 50.0), 2.5, 1e-12));
        assert!(approx(StatsCalculator::percentile(&sorted, 25.0), 1.75, 1e-12));
        assert!(StatsCalculator::percentile(&[], 50.0).is_nan());
        assert_eq!(StatsCalculator::median(&[5.0, 1.0, 3.0]), 3.0);
    }

    #[test]
    fn test_mean_std_population() {
        let (mean, std) = StatsCalculator::mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!(approx(mean, 5.0, 1e-12));
        assert!(approx(std, 2.0, 1e-12));
        assert!(matches!(StatsCalculator::mean_std(&[]), Err(StatsError::Empty)));
    }

    #[test]
    fn test_normal_quantiles() {
        let q = StatsCalculator::normal_quantiles(&[0.5, 0.975]).unwrap();
        assert!(approx(q[0], 0.0, 1e-9));
        assert!(approx(q[1], 1.959964, 1e-5));
    }

    #[test]
    fn test_genomic_inflation_uniform_is_one() {
        let pvalues = StatsCalculator::ppoints(10_000, 0.5).unwrap();
        let lambda = StatsCalculator::genomic_inflation(&pvalues).unwrap();
        assert!(approx(lambda, 1.0, 1e-3), "lambda = {lambda}");
    }

    #[test]
    fn test_genomic_inflation_detects_inflation() {
        let pvalues: Vec<f64> = StatsCalculator::ppoints(1000, 0.5)
            .unwrap()
            .into_iter()
            .map(|p| p / 4.0)
            .collect();
        assert!(StatsCalculator::genomic_inflation(&pvalues).unwrap() > 1.5);
    }
}
