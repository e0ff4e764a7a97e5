//! The differential statistics collaborator.
//!
//! Replicate-pool count columns are handed to an external routine through
//! the [`DifferentialStatistics`] trait as a [`StatisticsInput`]: a wide
//! counts table keyed by feature id, a pool → group metadata map, and a
//! flag to apply the routine's standard filtering. It returns per-feature
//! statistics and a two-dimensional embedding of the pools.
//!
//! [`RscriptStatistics`] runs a script as a subprocess, exchanging CSV
//! files through a temporary directory.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::{
    comparison::Side,
    data::{DatumType, MISSING_VALUES},
    error::PimmsError,
    table::Table,
};

/// The prefix of every statistics column merged into a comparison table.
pub const STATISTICS_PREFIX: &str = "deseq_";

lazy_static! {
    /// Replicate pool columns after merging, e.g. `Blood_MP3_test`.
    static ref POOL_COLUMN: Regex = Regex::new(r"_MP\d+_(control|test)$").unwrap();
}

/// Find the replicate pool columns and their group, in column order.
pub fn pool_columns<'a, I>(column_names: I) -> Vec<(String, Side)>
where
    I: IntoIterator<Item = &'a str>,
{
    column_names
        .into_iter()
        .filter_map(|name| {
            let captures = POOL_COLUMN.captures(name)?;
            let side = match captures.get(1)?.as_str() {
                "control" => Side::Control,
                _ => Side::Test,
            };
            Some((name.to_string(), side))
        })
        .collect()
}

/// The input to a [`DifferentialStatistics`] run.
#[derive(Clone, Debug, PartialEq)]
pub struct StatisticsInput {
    /// Feature ids, one per row of every pool's counts.
    pub feature_ids: Vec<String>,
    /// Counts for each pool, keyed by pool column name.
    pub counts: IndexMap<String, Vec<f64>>,
    /// The group of each pool.
    pub metadata: IndexMap<String, Side>,
    pub apply_filter: bool,
}

impl StatisticsInput {
    /// Build the input from the pool columns of `table`, using
    /// `feature_id` as the row key.
    ///
    /// Feature ids must be unique and counts must be finite and
    /// non-negative.
    pub fn from_table(
        table: &Table,
        feature_id: &str,
        pools: &[(String, Side)],
        apply_filter: bool,
    ) -> Result<Self, PimmsError> {
        let feature_ids: Vec<String> = table
            .get_column(feature_id)?
            .iter()
            .map(|value| value.to_string())
            .collect();
        let mut seen = HashSet::new();
        if let Some(duplicate) = feature_ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(PimmsError::StatisticsFailure(format!(
                "feature id '{}' occurs more than once",
                duplicate
            )));
        }

        let mut counts = IndexMap::new();
        let mut metadata = IndexMap::new();
        for (pool, side) in pools {
            let values = table.numeric_column(pool)?;
            if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(PimmsError::StatisticsFailure(format!(
                    "pool '{}' has missing or negative counts",
                    pool
                )));
            }
            counts.insert(pool.clone(), values);
            metadata.insert(pool.clone(), *side);
        }

        Ok(Self {
            feature_ids,
            counts,
            metadata,
            apply_filter,
        })
    }

    /// The number of pools in each group.
    pub fn group_sizes(&self) -> (usize, usize) {
        let control = self
            .metadata
            .values()
            .filter(|side| **side == Side::Control)
            .count();
        (control, self.metadata.len() - control)
    }
}

/// Per-feature statistics. Values the routine could not compute are `NaN`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FeatureStatistics {
    pub feature_id: String,
    #[serde(rename = "baseMean", deserialize_with = "missing_float")]
    pub base_mean: f64,
    #[serde(rename = "log2FoldChange", deserialize_with = "missing_float")]
    pub log2_fold_change: f64,
    #[serde(rename = "lfcSE", deserialize_with = "missing_float")]
    pub lfc_se: f64,
    #[serde(deserialize_with = "missing_float")]
    pub stat: f64,
    #[serde(deserialize_with = "missing_float")]
    pub pvalue: f64,
    #[serde(deserialize_with = "missing_float")]
    pub padj: f64,
}

/// The statistics columns, without their prefix, in output order.
pub const STATISTICS_NAMES: [&str; 6] = [
    "baseMean",
    "log2FoldChange",
    "lfcSE",
    "stat",
    "pvalue",
    "padj",
];

impl FeatureStatistics {
    /// The statistics in [`STATISTICS_NAMES`] order.
    pub fn values(&self) -> [f64; 6] {
        [
            self.base_mean,
            self.log2_fold_change,
            self.lfc_se,
            self.stat,
            self.pvalue,
            self.padj,
        ]
    }
}

fn missing_float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let text = String::deserialize(deserializer)?;
    let text = text.trim();
    if MISSING_VALUES.contains(&text) {
        return Ok(f64::NAN);
    }
    text.parse::<f64>().map_err(serde::de::Error::custom)
}

/// A two-dimensional embedding of the replicate pools, for QC plots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// `(x, y)` for each pool, keyed by pool column name.
    pub coordinates: IndexMap<String, (f64, f64)>,
    pub x_label: String,
    pub y_label: String,
}

impl Embedding {
    /// The group label of a pool: the last `_`-separated token of its name.
    pub fn group(pool: &str) -> &str {
        pool.rsplit('_').next().unwrap_or(pool)
    }
}

/// What a [`DifferentialStatistics`] run returns.
#[derive(Clone, Debug, PartialEq)]
pub struct StatisticsOutput {
    pub features: Vec<FeatureStatistics>,
    pub embedding: Embedding,
}

impl StatisticsOutput {
    /// Check the output against its input: every statistic row names an
    /// input feature, and every input pool has finite coordinates.
    pub fn validate(&self, input: &StatisticsInput) -> Result<(), PimmsError> {
        if self.features.is_empty() {
            return Err(PimmsError::StatisticsFailure(
                "no per-feature statistics were returned".to_string(),
            ));
        }
        let known: HashSet<&str> = input.feature_ids.iter().map(String::as_str).collect();
        if let Some(unknown) = self
            .features
            .iter()
            .find(|row| !known.contains(row.feature_id.as_str()))
        {
            return Err(PimmsError::StatisticsFailure(format!(
                "statistics returned for unknown feature '{}'",
                unknown.feature_id
            )));
        }
        for pool in input.metadata.keys() {
            match self.embedding.coordinates.get(pool) {
                Some((x, y)) if x.is_finite() && y.is_finite() => {}
                _ => {
                    return Err(PimmsError::StatisticsFailure(format!(
                        "embedding has no coordinates for pool '{}'",
                        pool
                    )))
                }
            }
        }
        Ok(())
    }

    /// The statistics as `deseq_`-prefixed columns aligned to `feature_ids`.
    /// Features without statistics get missing values.
    pub fn feature_columns(&self, feature_ids: &[DatumType]) -> Vec<(String, Vec<DatumType>)> {
        let by_id: HashMap<&str, &FeatureStatistics> = self
            .features
            .iter()
            .map(|row| (row.feature_id.as_str(), row))
            .collect();
        let rows: Vec<Option<&FeatureStatistics>> = feature_ids
            .iter()
            .map(|id| by_id.get(id.to_string().as_str()).copied())
            .collect();

        STATISTICS_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let values = rows
                    .iter()
                    .map(|row| row.map_or(DatumType::NoValue, |s| DatumType::from_f64(s.values()[i])))
                    .collect();
                (format!("{}{}", STATISTICS_PREFIX, name), values)
            })
            .collect()
    }
}

/// The outcome log of a statistics run: how many replicate pools were
/// found, whether the routine was run, and whether it succeeded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsOutcome {
    pub mutantpools: usize,
    pub run: bool,
    pub success: bool,
}

/// A differential statistics routine over replicate pool counts.
pub trait DifferentialStatistics {
    fn run(&self, input: &StatisticsInput) -> Result<StatisticsOutput, PimmsError>;
}

/// Run an external script as `<executable> <script> <counts.csv>
/// <metadata.csv> <output dir> <TRUE|FALSE>`.
///
/// The script must write `results.csv` (`feature_id`, `baseMean`,
/// `log2FoldChange`, `lfcSE`, `stat`, `pvalue`, `padj`), `pca.csv`
/// (`pool`, `PC1`, `PC2`) and `pca_variance.csv` (`component`,
/// `variance`, as a fraction) to the output directory.
#[derive(Clone, Debug)]
pub struct RscriptStatistics {
    executable: String,
    script: PathBuf,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    pool: String,
    #[serde(rename = "PC1", deserialize_with = "missing_float")]
    x: f64,
    #[serde(rename = "PC2", deserialize_with = "missing_float")]
    y: f64,
}

#[derive(Deserialize)]
struct VarianceRow {
    component: String,
    #[serde(deserialize_with = "missing_float")]
    variance: f64,
}

impl RscriptStatistics {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self::with_executable("Rscript", script)
    }

    pub fn with_executable(executable: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            script: script.into(),
        }
    }

    fn write_inputs(input: &StatisticsInput, dir: &Path) -> Result<(PathBuf, PathBuf), PimmsError> {
        let counts_path = dir.join("counts.csv");
        let mut writer = csv::Writer::from_path(&counts_path)?;
        let mut header = vec!["feature_id".to_string()];
        header.extend(input.counts.keys().cloned());
        writer.write_record(&header)?;
        for (i, id) in input.feature_ids.iter().enumerate() {
            let mut record = vec![id.clone()];
            record.extend(input.counts.values().map(|counts| counts[i].to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;

        let metadata_path = dir.join("metadata.csv");
        let mut writer = csv::Writer::from_path(&metadata_path)?;
        writer.write_record(["pool", "group"])?;
        for (pool, side) in &input.metadata {
            let group = side.to_string();
            writer.write_record([pool.as_str(), group.as_str()])?;
        }
        writer.flush()?;
        Ok((counts_path, metadata_path))
    }

    fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, PimmsError> {
        let file = File::open(path).map_err(|e| {
            PimmsError::StatisticsFailure(format!("could not open {}: {}", path.display(), e))
        })?;
        let mut reader = csv::Reader::from_reader(file);
        let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
        Ok(rows)
    }

    fn read_outputs(dir: &Path) -> Result<StatisticsOutput, PimmsError> {
        let features: Vec<FeatureStatistics> = Self::read_rows(&dir.join("results.csv"))?;
        let points: Vec<EmbeddingRow> = Self::read_rows(&dir.join("pca.csv"))?;
        let variance: Vec<VarianceRow> = Self::read_rows(&dir.join("pca_variance.csv"))?;

        let label = |i: usize, default: &str| {
            variance.get(i).map_or(default.to_string(), |row| {
                format!("{}: {:.0}% variance", row.component, row.variance * 100.0)
            })
        };
        let embedding = Embedding {
            coordinates: points
                .into_iter()
                .map(|row| (row.pool, (row.x, row.y)))
                .collect(),
            x_label: label(0, "PC1"),
            y_label: label(1, "PC2"),
        };
        Ok(StatisticsOutput {
            features,
            embedding,
        })
    }
}

impl DifferentialStatistics for RscriptStatistics {
    fn run(&self, input: &StatisticsInput) -> Result<StatisticsOutput, PimmsError> {
        let dir = tempfile::tempdir()?;
        let (counts_path, metadata_path) = Self::write_inputs(input, dir.path())?;

        log::debug!(
            "running {} {} with {} pools",
            self.executable,
            self.script.display(),
            input.metadata.len()
        );
        let output = Command::new(&self.executable)
            .arg(&self.script)
            .arg(&counts_path)
            .arg(&metadata_path)
            .arg(dir.path())
            .arg(if input.apply_filter { "TRUE" } else { "FALSE" })
            .output()
            .map_err(|e| {
                PimmsError::StatisticsFailure(format!("could not run {}: {}", self.executable, e))
            })?;
        if !output.status.success() {
            return Err(PimmsError::StatisticsFailure(format!(
                "{} exited with {}: {}",
                self.executable,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Self::read_outputs(dir.path())
    }
}
