//! Comparison metrics between two aligned numeric columns.
//!
//! # Zero fallback
//!
//! [`log2_fold_change()`] returns `0` whenever the ratio has no real,
//! finite logarithm: a zero denominator, a zero or negative ratio, and
//! missing (`NaN`) input all give `0` rather than an error or a missing
//! value. Downstream views plot these columns directly and must not see
//! holes, so this is a fixed policy and is tested as such.

use num_traits::Float;

use crate::error::PimmsError;

/// `log2(a / b)`, or `0` where that is not a finite real number.
pub fn log2_fold_change<F: Float>(a: F, b: F) -> F {
    if b.is_zero() {
        return F::zero();
    }
    let fc = (a / b).log2();
    if fc.is_finite() {
        fc
    } else {
        F::zero()
    }
}

fn check_lengths(a: usize, b: usize) -> Result<(), PimmsError> {
    if a != b {
        return Err(PimmsError::ColumnLengthMismatch {
            name: "comparison input".to_string(),
            expected: a,
            found: b,
        });
    }
    Ok(())
}

/// Element-wise [`log2_fold_change()`] of two aligned sequences.
pub fn fold_change_comparison(series_a: &[f64], series_b: &[f64]) -> Result<Vec<f64>, PimmsError> {
    check_lengths(series_a.len(), series_b.len())?;
    Ok(series_a
        .iter()
        .zip(series_b)
        .map(|(&a, &b)| log2_fold_change(a, b))
        .collect())
}

/// Percentile ranks of `values`. Tied values all get the *minimum* rank of
/// their group, and ranks are expressed as a fraction of the number of
/// non-missing values, so the largest value has percentile `1`.
///
/// Missing (`NaN`) values are not ranked and stay `NaN`.
pub fn percentile_rank(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).filter(|&i| !values[i].is_nan()).collect();
    let n = order.len() as f64;
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![f64::NAN; values.len()];
    let mut position = 0;
    while position < order.len() {
        // the tie group starting at this position all share its 1-based rank
        let value = values[order[position]];
        let rank = (position + 1) as f64;
        let mut end = position;
        while end < order.len() && values[order[end]] == value {
            ranks[order[end]] = rank / n;
            end += 1;
        }
        position = end;
    }
    ranks
}

/// Difference of the independent percentile ranks of two aligned
/// sequences, `percentile(a) - percentile(b)`, in `[-1, 1]`.
pub fn percentile_rank_comparison(
    series_a: &[f64],
    series_b: &[f64],
) -> Result<Vec<f64>, PimmsError> {
    check_lengths(series_a.len(), series_b.len())?;
    let percentile_a = percentile_rank(series_a);
    let percentile_b = percentile_rank(series_b);
    Ok(percentile_a
        .iter()
        .zip(&percentile_b)
        .map(|(a, b)| a - b)
        .collect())
}

/// The built-in comparison metrics, each stored in its own named column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ComparisonMetric {
    FoldChange,
    PctlRank,
}

impl ComparisonMetric {
    /// The name of the comparison column this metric is stored in.
    pub fn column_name(&self) -> &'static str {
        match self {
            ComparisonMetric::FoldChange => "fold_change",
            ComparisonMetric::PctlRank => "pctl_rank",
        }
    }

    /// Compute this metric for the aligned `(test, control)` pair.
    pub fn run(&self, test: &[f64], control: &[f64]) -> Result<Vec<f64>, PimmsError> {
        match self {
            ComparisonMetric::FoldChange => fold_change_comparison(test, control),
            ComparisonMetric::PctlRank => percentile_rank_comparison(test, control),
        }
    }

    pub fn all() -> [ComparisonMetric; 2] {
        [ComparisonMetric::FoldChange, ComparisonMetric::PctlRank]
    }
}
