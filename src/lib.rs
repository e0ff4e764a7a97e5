//! Merging and comparison of control and test transposon insertion
//! mutagenesis screens.

pub mod circos;
pub mod commands;
pub mod comparison;
pub mod data;
pub mod error;
pub mod gff;
pub mod io;
pub mod merge;
pub mod metrics;
pub mod reporting;
pub mod stats;
pub mod table;
pub mod test_utilities;
pub mod traits;
pub mod transport;

/// A 1-based genome position, as in GFF files.
pub type Position = u32;

pub mod prelude {
    pub use crate::comparison::{
        ComparisonConfig, ComparisonTable, MetricSelection, Side, VennSet, KEY_COLUMNS,
    };
    pub use crate::error::PimmsError;
    pub use crate::gff::{GffRecord, GffTable};
    pub use crate::merge::{merge_add_suffix, merge_with_report, MergeReport};
    pub use crate::metrics::{
        fold_change_comparison, log2_fold_change, percentile_rank_comparison, ComparisonMetric,
    };
    pub use crate::stats::{DifferentialStatistics, RscriptStatistics, StatisticsOutcome};
    pub use crate::table::Table;
}
