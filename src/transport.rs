//! The JSON transport form of [`GffTable`](crate::gff::GffTable) and
//! [`ComparisonTable`](crate::comparison::ComparisonTable).
//!
//! Every serialized value is a [`TransportRecord`]: a JSON object with a
//! `kind` tag naming the type, a `version`, and one field per attribute.
//! Tables are stored as [`TableRecord`]s (column names plus row-major
//! data) and paths as plain strings.

use serde::{Deserialize, Serialize};

use crate::{
    comparison::ComparisonConfig,
    error::PimmsError,
    stats::{Embedding, StatisticsOutcome},
    table::TableRecord,
};

/// The version written to, and required of, every record.
pub const TRANSPORT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GffTableRecord {
    pub version: u32,
    pub path: String,
    pub header: Option<String>,
    pub data: TableRecord,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTableRecord {
    pub version: u32,
    pub control_path: Option<String>,
    pub test_path: Option<String>,
    pub config: ComparisonConfig,
    pub data: TableRecord,
    pub comparison_columns: Vec<String>,
    pub statistics: Option<StatisticsOutcome>,
    pub embedding: Option<Embedding>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportRecord {
    FeatureTable(GffTableRecord),
    ComparisonTable(ComparisonTableRecord),
}

impl TransportRecord {
    /// The `kind` tag of this record.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportRecord::FeatureTable(_) => "feature_table",
            TransportRecord::ComparisonTable(_) => "comparison_table",
        }
    }

    fn version(&self) -> u32 {
        match self {
            TransportRecord::FeatureTable(record) => record.version,
            TransportRecord::ComparisonTable(record) => record.version,
        }
    }

    pub fn to_json(&self) -> Result<String, PimmsError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a record, checking its version.
    pub fn from_json(json: &str) -> Result<Self, PimmsError> {
        let record: TransportRecord = serde_json::from_str(json)?;
        if record.version() != TRANSPORT_VERSION {
            return Err(PimmsError::TransportKind {
                expected: format!("{} version {}", record.kind(), TRANSPORT_VERSION),
                found: format!("{} version {}", record.kind(), record.version()),
            });
        }
        Ok(record)
    }
}
