//! Summaries over columns of data: value counts and fixed-width histograms.
//!

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

use crate::error::PimmsError;

/// The largest number of bins [`histogram()`] will build.
pub const MAX_HISTOGRAM_BINS: usize = 1_000_000;

/// Count the distinct values of an iterator, ordered by descending count.
///
/// Ties keep the order in which values were first seen, so the output is
/// reproducible for the same input.
pub fn value_counts<K, I>(values: I) -> IndexMap<K, usize>
where
    K: Hash + Eq,
    I: IntoIterator<Item = K>,
{
    let mut counts: IndexMap<K, usize> = IndexMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    // stable sort, so first-seen order breaks ties
    counts.sort_by(|_, a, _, b| b.cmp(a));
    counts
}

/// One bin of a fixed-width histogram, covering `[start, end)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Bin finite values into consecutive bins of width `bin_size`, aligned to
/// multiples of `bin_size`. The last bin is closed on the right, so the
/// maximum value is always counted.
///
/// Returns an empty histogram if there are no finite values or the bin
/// size is not positive.
///
/// # Errors
/// A [`PimmsError::ArgumentError`] if the values would span more than
/// [`MAX_HISTOGRAM_BINS`] bins of this width.
pub fn histogram(values: &[f64], bin_size: f64) -> Result<Vec<HistogramBin>, PimmsError> {
    if !(bin_size > 0.0) {
        return Ok(Vec::new());
    }
    let finite: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    let (Some(min), Some(max)) = (
        finite.iter().copied().reduce(f64::min),
        finite.iter().copied().reduce(f64::max),
    ) else {
        return Ok(Vec::new());
    };

    let first = (min / bin_size).floor() * bin_size;
    let span = ((max - first) / bin_size).floor();
    if !first.is_finite() || !(span < MAX_HISTOGRAM_BINS as f64) {
        return Err(PimmsError::ArgumentError(clap::Error::raw(
            clap::error::ErrorKind::InvalidValue,
            format!(
                "a bin size of {} needs more than {} histogram bins for values from {} to {}\n",
                bin_size, MAX_HISTOGRAM_BINS, min, max
            ),
        )));
    }
    let nbins = span as usize + 1;
    let mut bins: Vec<HistogramBin> = (0..nbins)
        .map(|i| HistogramBin {
            start: first + i as f64 * bin_size,
            end: first + (i + 1) as f64 * bin_size,
            count: 0,
        })
        .collect();

    for value in finite {
        let index = (((value - first) / bin_size).floor() as usize).min(nbins - 1);
        bins[index].count += 1;
    }
    Ok(bins)
}
