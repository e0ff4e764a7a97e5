//! TSV Serializing helpers, functionality, etc.

use crate::{data::DatumType, traits::TsvSerialize};
use lazy_static::lazy_static;

lazy_static! {
    /// The TSV configuration for measurement tables, where missing
    /// values are written as empty cells.
    pub static ref TABLE_TSV: TsvConfig = TsvConfig {
        no_value_string: "".to_string(),
    };

    /// The TSV configuration for feature files, where `.` is the
    /// missing value placeholder.
    pub static ref GFF_TSV: TsvConfig = TsvConfig {
        no_value_string: ".".to_string(),
    };
}

/// This is an extensible type to handle common
/// TSV output configurations, e.g. what to print
/// for `None` or [`DatumType::NoValue`].
pub struct TsvConfig {
    pub no_value_string: String,
}

impl TsvSerialize for String {
    fn to_tsv(&self, _config: &TsvConfig) -> String {
        self.to_string()
    }
}

impl<U: TsvSerialize> TsvSerialize for Vec<U> {
    fn to_tsv(&self, config: &TsvConfig) -> String {
        self.iter()
            .map(|x| x.to_tsv(config))
            .collect::<Vec<_>>()
            .join("\t")
    }
}

impl TsvSerialize for &DatumType {
    fn to_tsv(&self, config: &TsvConfig) -> String {
        (*self).to_tsv(config)
    }
}

impl TsvSerialize for DatumType {
    fn to_tsv(&self, config: &TsvConfig) -> String {
        match self {
            DatumType::NoValue => config.no_value_string.clone(),
            other => other.to_string(),
        }
    }
}
