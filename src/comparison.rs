//! The [`ComparisonTable`]: control and test measurement tables merged on
//! their feature identifier columns, plus derived comparison columns.
//!
//! A comparison table is built in steps:
//!
//!  1. [`ComparisonTable::load()`] reads and inner-joins the two input
//!     tables, suffixing every non-key column with `_control` or `_test`.
//!  2. [`ComparisonTable::derive_default_metrics()`] adds the
//!     `fold_change` and `pctl_rank` comparison columns from the NIM score
//!     column pair.
//!  3. [`ComparisonTable::run_external_statistics()`] optionally adds the
//!     `deseq_` statistics columns and a pool embedding, when replicate
//!     pool columns are present.
//!
//! Score columns are always found through
//! [`ComparisonTable::get_score_columns()`], which requires exactly one
//! matching column on each side.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{
    data::DatumType,
    error::PimmsError,
    merge::{merge_with_report, MergeReport},
    metrics::ComparisonMetric,
    stats::{
        pool_columns, DifferentialStatistics, Embedding, StatisticsInput, StatisticsOutcome,
    },
    table::Table,
    transport::{ComparisonTableRecord, TransportRecord, TRANSPORT_VERSION},
};

/// The identifier columns control and test rows are matched on.
pub const KEY_COLUMNS: [&str; 8] = [
    "seq_id",
    "locus_tag",
    "type",
    "gene",
    "start",
    "end",
    "feat_length",
    "product",
];

/// The substring of the per-feature insert position percentile columns.
pub const INSERT_PERCENTILE: &str = "insert_posn_as_percentile";

/// Which input a column came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Control,
    Test,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Control => write!(f, "control"),
            Side::Test => write!(f, "test"),
        }
    }
}

/// Column naming conventions and display settings of a [`ComparisonTable`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    pub key_columns: Vec<String>,
    pub control_suffix: String,
    pub test_suffix: String,
    pub nim_substring: String,
    pub nrm_substring: String,
    /// The key column that identifies a feature to the statistics routine.
    pub feature_id: String,
    /// Decimal places of [`ComparisonTable::get_rows()`].
    pub decimals: u32,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            key_columns: KEY_COLUMNS.iter().map(|name| name.to_string()).collect(),
            control_suffix: "_control".to_string(),
            test_suffix: "_test".to_string(),
            nim_substring: "NIM_score".to_string(),
            nrm_substring: "NRM_score".to_string(),
            feature_id: "locus_tag".to_string(),
            decimals: 3,
        }
    }
}

/// Which comparison columns a column projection keeps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetricSelection {
    /// Keep every registered comparison column.
    All,
    /// Keep only the named comparison column.
    Only(String),
    /// Drop every comparison column.
    None,
}

impl FromStr for MetricSelection {
    type Err = PimmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(PimmsError::InvalidComparisonMetric(s.to_string())),
            "all" => Ok(MetricSelection::All),
            "none" => Ok(MetricSelection::None),
            name => Ok(MetricSelection::Only(name.to_string())),
        }
    }
}

/// The Venn region of a feature: in both sets, the control set only, or
/// the test set only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum VennSet {
    #[value(name = "AB")]
    Both,
    #[value(name = "Ab")]
    ControlOnly,
    #[value(name = "aB")]
    TestOnly,
}

impl fmt::Display for VennSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VennSet::Both => write!(f, "AB"),
            VennSet::ControlOnly => write!(f, "Ab"),
            VennSet::TestOnly => write!(f, "aB"),
        }
    }
}

/// The Venn region of every row of a [`ComparisonTable`].
#[derive(Clone, Debug, PartialEq)]
pub struct VennSets {
    pub membership: Vec<Option<VennSet>>,
}

impl VennSets {
    pub fn count(&self, set: VennSet) -> usize {
        self.membership.iter().filter(|m| **m == Some(set)).count()
    }

    /// The row indices in a region.
    pub fn rows(&self, set: VennSet) -> Vec<usize> {
        self.membership
            .iter()
            .enumerate()
            .filter(|(_, m)| **m == Some(set))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Merged control and test measurements, with derived comparison columns.
#[derive(Clone, Debug, PartialEq)]
pub struct ComparisonTable {
    control_path: Option<PathBuf>,
    test_path: Option<PathBuf>,
    config: ComparisonConfig,
    data: Table,
    comparison_columns: Vec<String>,
    statistics: Option<StatisticsOutcome>,
    embedding: Option<Embedding>,
}

impl ComparisonTable {
    /// Read the control and test measurement files and merge them with
    /// the default column conventions.
    pub fn load(
        control_path: impl Into<PathBuf>,
        test_path: impl Into<PathBuf>,
    ) -> Result<Self, PimmsError> {
        Self::load_with_config(control_path, test_path, ComparisonConfig::default())
    }

    pub fn load_with_config(
        control_path: impl Into<PathBuf>,
        test_path: impl Into<PathBuf>,
        config: ComparisonConfig,
    ) -> Result<Self, PimmsError> {
        let control_path = control_path.into();
        let test_path = test_path.into();
        let control = Table::from_path(&control_path)?;
        let test = Table::from_path(&test_path)?;
        let table = Self::from_tables(&control, &test, config)?;
        log::info!(
            "loaded {} features from {} and {}",
            table.len(),
            control_path.display(),
            test_path.display()
        );
        Ok(table.with_paths(control_path, test_path))
    }

    /// Merge two already loaded tables.
    pub fn from_tables(
        control: &Table,
        test: &Table,
        config: ComparisonConfig,
    ) -> Result<Self, PimmsError> {
        Self::from_tables_with_report(control, test, config).map(|(table, _)| table)
    }

    /// Like [`ComparisonTable::from_tables()`], also returning the merge's
    /// counts of unmatched control (left) and test (right) rows.
    pub fn from_tables_with_report(
        control: &Table,
        test: &Table,
        config: ComparisonConfig,
    ) -> Result<(Self, MergeReport), PimmsError> {
        let (data, report) = merge_with_report(
            control,
            test,
            config.key_columns.as_slice(),
            &config.control_suffix,
            &config.test_suffix,
        )?;
        let table = Self {
            control_path: None,
            test_path: None,
            config,
            data,
            comparison_columns: Vec::new(),
            statistics: None,
            embedding: None,
        };
        Ok((table, report))
    }

    /// Record the files the control and test tables were read from.
    pub fn with_paths(mut self, control_path: impl Into<PathBuf>, test_path: impl Into<PathBuf>) -> Self {
        self.control_path = Some(control_path.into());
        self.test_path = Some(test_path.into());
        self
    }

    pub fn control_path(&self) -> Option<&Path> {
        self.control_path.as_deref()
    }

    pub fn test_path(&self) -> Option<&Path> {
        self.test_path.as_deref()
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    /// The registered comparison columns, in registration order.
    pub fn comparison_columns(&self) -> &[String] {
        &self.comparison_columns
    }

    /// The outcome log of the last statistics run, if any.
    pub fn statistics(&self) -> Option<&StatisticsOutcome> {
        self.statistics.as_ref()
    }

    /// The pool embedding from a successful statistics run.
    pub fn embedding(&self) -> Option<&Embedding> {
        self.embedding.as_ref()
    }

    /// Get the number of merged features.
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// All column names, in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.data.column_names()
    }

    /// Add the built-in comparison metrics of the NIM score columns.
    pub fn derive_default_metrics(&mut self) -> Result<(), PimmsError> {
        for metric in ComparisonMetric::all() {
            self.derive_metric(metric)?;
        }
        Ok(())
    }

    /// Compute `metric` of the `(test, control)` NIM score columns into its
    /// comparison column. An existing column of that name is kept as is,
    /// and registered as a comparison column.
    pub fn derive_metric(&mut self, metric: ComparisonMetric) -> Result<(), PimmsError> {
        let name = metric.column_name();
        if self.data.has_column(name) {
            self.register(name);
            return Ok(());
        }
        let (test_column, control_column) = self.get_nim_score_columns()?;
        let test = self.data.numeric_column(&test_column)?;
        let control = self.data.numeric_column(&control_column)?;
        let values = metric
            .run(&test, &control)?
            .into_iter()
            .map(DatumType::from_f64)
            .collect();
        log::debug!("derived {} from {} and {}", name, test_column, control_column);
        self.insert_comparison_column(name, values)?;
        Ok(())
    }

    fn register(&mut self, name: &str) {
        if !self.comparison_columns.iter().any(|c| c == name) {
            self.comparison_columns.push(name.to_string());
        }
    }

    /// Append a comparison column and register it. If a column of that
    /// name already exists this does nothing and returns `false`.
    ///
    /// # Errors
    /// A [`PimmsError::ColumnLengthMismatch`] if `values` does not have one
    /// value per row.
    pub fn insert_comparison_column(
        &mut self,
        name: &str,
        values: Vec<DatumType>,
    ) -> Result<bool, PimmsError> {
        if self.data.has_column(name) {
            return Ok(false);
        }
        self.data.push_column(name, values)?;
        self.register(name);
        Ok(true)
    }

    /// The columns from the control input.
    pub fn control_data_columns(&self) -> Vec<String> {
        self.side_columns(&self.config.control_suffix)
    }

    /// The columns from the test input.
    pub fn test_data_columns(&self) -> Vec<String> {
        self.side_columns(&self.config.test_suffix)
    }

    fn side_columns(&self, suffix: &str) -> Vec<String> {
        self.data
            .column_names()
            .into_iter()
            .filter(|name| name.ends_with(suffix))
            .map(String::from)
            .collect()
    }

    /// The `(test, control)` data columns containing `substring`.
    pub fn test_control_columns_containing(&self, substring: &str) -> (Vec<String>, Vec<String>) {
        let containing = |columns: Vec<String>| -> Vec<String> {
            columns
                .into_iter()
                .filter(|name| name.contains(substring))
                .collect()
        };
        (
            containing(self.test_data_columns()),
            containing(self.control_data_columns()),
        )
    }

    /// The `(test, control)` pair of columns containing `substring`.
    ///
    /// # Errors
    /// A [`PimmsError::AmbiguousColumn`] unless exactly one column on each
    /// side contains `substring`.
    pub fn get_score_columns(&self, substring: &str) -> Result<(String, String), PimmsError> {
        let (test, control) = self.test_control_columns_containing(substring);
        let test = single_column(substring, Side::Test, test)?;
        let control = single_column(substring, Side::Control, control)?;
        Ok((test, control))
    }

    pub fn get_nim_score_columns(&self) -> Result<(String, String), PimmsError> {
        self.get_score_columns(&self.config.nim_substring)
    }

    pub fn get_nrm_score_columns(&self) -> Result<(String, String), PimmsError> {
        self.get_score_columns(&self.config.nrm_substring)
    }

    /// A projection of the column names.
    ///
    /// With `simple`, only the key columns (without `seq_id`), the test and
    /// control NRM and NIM score columns, and the comparison columns are
    /// kept. `selection` then narrows the comparison columns.
    ///
    /// # Errors
    /// A [`PimmsError::InvalidComparisonMetric`] if `selection` names an
    /// unregistered column, and any error of the score column lookups.
    pub fn get_columns(
        &self,
        simple: bool,
        selection: &MetricSelection,
    ) -> Result<Vec<String>, PimmsError> {
        if let MetricSelection::Only(name) = selection {
            if !self.comparison_columns.contains(name) {
                return Err(PimmsError::InvalidComparisonMetric(name.clone()));
            }
        }

        let columns: Vec<String> = if simple {
            let (nim_test, nim_control) = self.get_nim_score_columns()?;
            let (nrm_test, nrm_control) = self.get_nrm_score_columns()?;
            self.config
                .key_columns
                .iter()
                .filter(|name| name.as_str() != "seq_id")
                .cloned()
                .chain([nrm_test, nrm_control, nim_test, nim_control])
                .chain(self.comparison_columns.iter().cloned())
                .collect()
        } else {
            self.data
                .column_names()
                .into_iter()
                .map(String::from)
                .collect()
        };

        let columns = match selection {
            MetricSelection::All => columns,
            MetricSelection::None => self.without_comparisons(columns),
            MetricSelection::Only(name) => {
                let mut columns = self.without_comparisons(columns);
                columns.push(name.clone());
                columns
            }
        };
        Ok(columns)
    }

    fn without_comparisons(&self, columns: Vec<String>) -> Vec<String> {
        columns
            .into_iter()
            .filter(|name| !self.comparison_columns.contains(name))
            .collect()
    }

    /// The merged table with floats rounded for display (3 decimal places
    /// by default).
    pub fn get_rows(&self) -> Table {
        self.data.round(self.config.decimals)
    }

    /// The rounded display table restricted to a [`ComparisonTable::get_columns()`]
    /// projection.
    pub fn get_projection(
        &self,
        simple: bool,
        selection: &MetricSelection,
    ) -> Result<Table, PimmsError> {
        let columns = self.get_columns(simple, selection)?;
        Ok(self.data.select(&columns)?.round(self.config.decimals))
    }

    /// Run the differential statistics routine on the replicate pool
    /// columns, and record the outcome.
    ///
    /// On success the `deseq_` statistics columns are added and registered
    /// as comparison columns, and the pool embedding is kept. If there are
    /// no pool columns, either group has no pools, or the routine fails,
    /// the table is left as it was. Failures are logged, never returned.
    pub fn run_external_statistics(
        &mut self,
        engine: &dyn DifferentialStatistics,
        apply_filter: bool,
    ) -> StatisticsOutcome {
        let pools = pool_columns(self.data.column_names());
        let mut outcome = StatisticsOutcome {
            mutantpools: pools.len(),
            ..Default::default()
        };
        let has_group = |side: Side| pools.iter().any(|(_, s)| *s == side);

        if pools.is_empty() {
            log::info!("no replicate pool columns found, statistics not run");
        } else if !has_group(Side::Control) || !has_group(Side::Test) {
            log::warn!(
                "statistics not run: {} replicate pools, but both control and test pools are required",
                pools.len()
            );
        } else {
            outcome.run = true;
            match self.apply_statistics(engine, &pools, apply_filter) {
                Ok(added) => {
                    outcome.success = true;
                    log::info!("added {} statistics columns from {} pools", added, pools.len());
                }
                Err(e) => log::warn!("differential statistics failed: {}", e),
            }
        }
        self.statistics = Some(outcome);
        outcome
    }

    fn apply_statistics(
        &mut self,
        engine: &dyn DifferentialStatistics,
        pools: &[(String, Side)],
        apply_filter: bool,
    ) -> Result<usize, PimmsError> {
        let input =
            StatisticsInput::from_table(&self.data, &self.config.feature_id, pools, apply_filter)?;
        let output = engine.run(&input)?;
        output.validate(&input)?;

        // build on a copy, so a failure part way leaves the table unchanged
        let mut data = self.data.clone();
        let mut added = Vec::new();
        for (name, values) in output.feature_columns(self.data.get_column(&self.config.feature_id)?) {
            if !data.has_column(&name) {
                data.push_column(name.as_str(), values)?;
                added.push(name);
            }
        }

        self.data = data;
        for name in &added {
            self.register(name);
        }
        self.embedding = Some(output.embedding);
        Ok(added.len())
    }

    /// Assign every row to a Venn region.
    ///
    /// A row is in a side's set when its NIM score is at most `threshold`
    /// and its two insert position percentile columns satisfy
    /// `first >= window.0` and `second <= window.1`.
    pub fn venn_sets(&self, threshold: f64, window: (f64, f64)) -> Result<VennSets, PimmsError> {
        let (nim_test, nim_control) = self.get_nim_score_columns()?;
        let (percentile_test, percentile_control) =
            self.test_control_columns_containing(INSERT_PERCENTILE);

        let in_set = |nim: &str, percentiles: Vec<String>, side: Side| -> Result<Vec<bool>, PimmsError> {
            if percentiles.len() != 2 {
                return Err(PimmsError::AmbiguousColumn {
                    substring: INSERT_PERCENTILE.to_string(),
                    side,
                    matches: percentiles,
                    expected: 2,
                });
            }
            let nim = self.data.numeric_column(nim)?;
            let first = self.data.numeric_column(&percentiles[0])?;
            let second = self.data.numeric_column(&percentiles[1])?;
            Ok((0..self.len())
                .map(|i| nim[i] <= threshold && first[i] >= window.0 && second[i] <= window.1)
                .collect())
        };
        let control = in_set(&nim_control, percentile_control, Side::Control)?;
        let test = in_set(&nim_test, percentile_test, Side::Test)?;

        let membership = control
            .iter()
            .zip(&test)
            .map(|(&a, &b)| match (a, b) {
                (true, true) => Some(VennSet::Both),
                (true, false) => Some(VennSet::ControlOnly),
                (false, true) => Some(VennSet::TestOnly),
                (false, false) => None,
            })
            .collect();
        Ok(VennSets { membership })
    }

    /// Serialize to the JSON transport form.
    pub fn to_json(&self) -> Result<String, PimmsError> {
        let path_string = |path: &Option<PathBuf>| {
            path.as_ref()
                .map(|p| p.to_string_lossy().into_owned())
        };
        let record = ComparisonTableRecord {
            version: TRANSPORT_VERSION,
            control_path: path_string(&self.control_path),
            test_path: path_string(&self.test_path),
            config: self.config.clone(),
            data: self.data.to_record(),
            comparison_columns: self.comparison_columns.clone(),
            statistics: self.statistics,
            embedding: self.embedding.clone(),
        };
        TransportRecord::ComparisonTable(record).to_json()
    }

    /// Rebuild a [`ComparisonTable`] from its JSON transport form.
    /// Registered comparison columns missing from the data are dropped.
    pub fn from_json(json: &str) -> Result<Self, PimmsError> {
        let record = match TransportRecord::from_json(json)? {
            TransportRecord::ComparisonTable(record) => record,
            other => {
                return Err(PimmsError::TransportKind {
                    expected: "comparison_table".to_string(),
                    found: other.kind().to_string(),
                })
            }
        };
        let data = Table::from_record(record.data)?;
        let comparison_columns = record
            .comparison_columns
            .into_iter()
            .filter(|name| data.has_column(name))
            .collect();
        Ok(Self {
            control_path: record.control_path.map(PathBuf::from),
            test_path: record.test_path.map(PathBuf::from),
            config: record.config,
            data,
            comparison_columns,
            statistics: record.statistics,
            embedding: record.embedding,
        })
    }
}

fn single_column(substring: &str, side: Side, matches: Vec<String>) -> Result<String, PimmsError> {
    match <[String; 1]>::try_from(matches) {
        Ok([column]) => Ok(column),
        Err(matches) => Err(PimmsError::AmbiguousColumn {
            substring: substring.to_string(),
            side,
            matches,
            expected: 1,
        }),
    }
}
