//! Insertion site feature files: the [`GffRecord`] row type, the
//! [`GffIterator`] parsing iterator, and the [`GffTable`] container.
//!
//! Insertion sites are stored as nine-column, tab-separated GFF files with
//! a `#`-prefixed comment header and no column-name row. The `score`
//! column holds a per-site insertion count, or the placeholder `.` for
//! every row when each row is a single insertion. In that *empty score*
//! case, insertion density is found by counting rows per `start`
//! position (see [`GffTable::empty_score()`] and
//! [`GffTable::insertion_density()`]).
//!
//! Fields other than `start` and `end` are kept as the exact text read,
//! so that [`GffTable::to_gff3()`] writes the columns back unmodified.

use indexmap::IndexMap;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use crate::{
    data::{
        operations::{histogram, value_counts, HistogramBin},
        DatumType,
    },
    error::PimmsError,
    io::{read_decoded_line, InputFile, OutputFile, GFF_TSV, TsvConfig},
    table::TableRecord,
    transport::{GffTableRecord, TransportRecord, TRANSPORT_VERSION},
    traits::TsvSerialize,
    Position,
};

/// The fixed GFF3 columns, in file order.
pub const GFF3_COLUMNS: [&str; 9] = [
    "seq_id",
    "source",
    "type",
    "start",
    "end",
    "score",
    "strand",
    "phase",
    "attributes",
];

/// The placeholder for a missing value in a GFF column.
pub const GFF_MISSING: &str = ".";

/// A directive after which a GFF3 file contains sequences, not features.
const FASTA_DIRECTIVE: &str = "##FASTA";

// for GffIterator only
const PARSE_CAPACITY: usize = 512;

/// One feature (insertion site) row.
#[derive(Clone, Debug, PartialEq)]
pub struct GffRecord {
    pub seq_id: String,
    pub source: String,
    pub feature_type: String,
    pub start: Position,
    pub end: Position,
    pub score: String,
    pub strand: String,
    pub phase: String,
    pub attributes: String,
}

impl GffRecord {
    /// The numeric score, or `None` for the `.` placeholder or non-numeric text.
    pub fn score_value(&self) -> Option<f64> {
        if self.score == GFF_MISSING {
            return None;
        }
        self.score.trim().parse::<f64>().ok()
    }

    /// Get a field by its GFF3 column name, as text.
    pub fn field(&self, column: &str) -> Result<String, PimmsError> {
        let value = match column {
            "seq_id" => self.seq_id.clone(),
            "source" => self.source.clone(),
            "type" => self.feature_type.clone(),
            "start" => self.start.to_string(),
            "end" => self.end.to_string(),
            "score" => self.score.clone(),
            "strand" => self.strand.clone(),
            "phase" => self.phase.clone(),
            "attributes" => self.attributes.clone(),
            _ => return Err(PimmsError::UnknownColumn(column.to_string())),
        };
        Ok(value)
    }

    fn to_datums(&self) -> Vec<DatumType> {
        vec![
            DatumType::from(self.seq_id.as_str()),
            DatumType::from(self.source.as_str()),
            DatumType::from(self.feature_type.as_str()),
            DatumType::Integer64(self.start as i64),
            DatumType::Integer64(self.end as i64),
            DatumType::from(self.score.as_str()),
            DatumType::from(self.strand.as_str()),
            DatumType::from(self.phase.as_str()),
            DatumType::from(self.attributes.as_str()),
        ]
    }

    fn from_datums(row: Vec<DatumType>, line_number: usize) -> Result<Self, PimmsError> {
        let fields: Vec<String> = row.iter().map(|value| value.to_tsv(&GFF_TSV)).collect();
        let line = fields.join("\t");
        parse_gff_line(&line, line_number)
    }
}

impl TsvSerialize for GffRecord {
    fn to_tsv(&self, _config: &TsvConfig) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.seq_id,
            self.source,
            self.feature_type,
            self.start,
            self.end,
            self.score,
            self.strand,
            self.phase,
            self.attributes
        )
    }
}

/// Parse one GFF line into a [`GffRecord`]. The line must have exactly nine
/// tab-separated fields; anything else is an error rather than a shifted row.
pub fn parse_gff_line(line: &str, line_number: usize) -> Result<GffRecord, PimmsError> {
    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() != GFF3_COLUMNS.len() {
        return Err(PimmsError::GffParse {
            line_number,
            reason: format!("has {} fields, expected {}", columns.len(), GFF3_COLUMNS.len()),
            line: line.to_string(),
        });
    }

    let position = |text: &str| {
        text.trim()
            .parse::<Position>()
            .map_err(|_| PimmsError::GffInvalidPosition {
                line_number,
                line: line.to_string(),
            })
    };

    Ok(GffRecord {
        seq_id: columns[0].to_string(),
        source: columns[1].to_string(),
        feature_type: columns[2].to_string(),
        start: position(columns[3])?,
        end: position(columns[4])?,
        score: columns[5].to_string(),
        strand: columns[6].to_string(),
        phase: columns[7].to_string(),
        attributes: columns[8].to_string(),
    })
}

/// A parsing iterator over GFF feature lines, yielding [`GffRecord`]s.
/// Comment lines and blank lines are skipped, and iteration ends at a
/// `##FASTA` directive.
pub struct GffIterator {
    reader: BufReader<Box<dyn Read>>,
    line_buffer: Vec<u8>,
    line_number: usize,
    done: bool,
}

impl std::fmt::Debug for GffIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GffIterator").finish_non_exhaustive()
    }
}

impl GffIterator {
    /// Create a new parsing iterator over a (possibly gzip-compressed) GFF file.
    pub fn new(filepath: impl Into<PathBuf>) -> Result<Self, PimmsError> {
        let input_file = InputFile::new(filepath);
        let reader = input_file.reader()?;
        Ok(Self::from_reader(reader, 0))
    }

    /// Create a new parsing iterator over a reader. `lines_read` is the
    /// number of lines already consumed, used for error line numbers.
    pub fn from_reader(reader: BufReader<Box<dyn Read>>, lines_read: usize) -> Self {
        Self {
            reader,
            line_buffer: Vec::with_capacity(PARSE_CAPACITY),
            line_number: lines_read,
            done: false,
        }
    }
}

impl Iterator for GffIterator {
    type Item = Result<GffRecord, PimmsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line_number = self.line_number + 1;
            match read_decoded_line(&mut self.reader, &mut self.line_buffer, line_number) {
                Ok(None) => return None,
                Ok(Some(text)) => {
                    self.line_number = line_number;
                    let line = text.trim_end_matches(&['\n', '\r'][..]);
                    if line.starts_with(FASTA_DIRECTIVE) {
                        self.done = true;
                        return None;
                    }
                    if line.starts_with('#') || line.trim().is_empty() {
                        continue;
                    }
                    return Some(parse_gff_line(line, line_number));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// A single insertion density value at a genome position.
#[derive(Clone, Debug, PartialEq)]
pub struct InsertionCount {
    pub position: Position,
    pub value: f64,
}

/// A parsed insertion-site feature file.
///
/// A [`GffTable`] is a snapshot: it is built by parsing a file (or
/// rebuilt from its serialized form) and not modified afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct GffTable {
    path: PathBuf,
    header: Option<String>,
    records: Vec<GffRecord>,
}

impl GffTable {
    /// Build a [`GffTable`] from already parsed parts.
    pub fn new(path: impl Into<PathBuf>, header: Option<String>, records: Vec<GffRecord>) -> Self {
        Self {
            path: path.into(),
            header,
            records,
        }
    }

    /// Parse a GFF file. The `#` comment lines before the first feature
    /// are kept verbatim as the header.
    pub fn from_path(filepath: impl Into<PathBuf>) -> Result<Self, PimmsError> {
        let path = filepath.into();
        let mut input_file = InputFile::new(&path);
        let has_header = input_file.collect_metadata("#")?;
        let header = if has_header {
            input_file.comments.as_ref().map(|lines| lines.concat())
        } else {
            None
        };

        let reader = input_file.continue_reading()?;
        let records = GffIterator::from_reader(reader, input_file.skip_lines)
            .collect::<Result<Vec<_>, _>>()?;
        log::info!("read {} features from {}", records.len(), path.display());
        Ok(Self::new(path, header, records))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn records(&self) -> &[GffRecord] {
        &self.records
    }

    /// Get the total number of features.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Return whether the [`GffTable`] has no features.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Counts of each distinct value in a column, by descending count.
    pub fn value_counts(&self, column: &str) -> Result<IndexMap<String, usize>, PimmsError> {
        let values = self
            .records
            .iter()
            .map(|record| record.field(column))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(value_counts(values))
    }

    /// Whether every row's score is the `.` placeholder. When true,
    /// insertion density must come from counting rows per position, not
    /// from the score column.
    pub fn empty_score(&self) -> bool {
        self.records.iter().all(|record| record.score == GFF_MISSING)
    }

    /// The distinct sequence names, in the order first seen.
    pub fn dna_sequences(&self) -> Vec<&str> {
        let mut seen = indexmap::IndexSet::new();
        for record in &self.records {
            seen.insert(record.seq_id.as_str());
        }
        seen.into_iter().collect()
    }

    /// Insertion density by genome position.
    ///
    /// With an empty score, this is the number of rows at each `start`,
    /// sorted by position. Otherwise it is each row's `(start, score)`, in
    /// file order, skipping rows without a numeric score.
    pub fn insertion_density(&self) -> Vec<InsertionCount> {
        if self.empty_score() {
            let mut counts: Vec<InsertionCount> =
                value_counts(self.records.iter().map(|record| record.start))
                    .into_iter()
                    .map(|(position, count)| InsertionCount {
                        position,
                        value: count as f64,
                    })
                    .collect();
            counts.sort_by_key(|count| count.position);
            counts
        } else {
            self.records
                .iter()
                .filter_map(|record| {
                    record.score_value().map(|value| InsertionCount {
                        position: record.start,
                        value,
                    })
                })
                .collect()
        }
    }

    /// Insertion density within `[start, end]`, e.g. the insertions in a
    /// single gene.
    pub fn inserts_in_range(&self, start: Position, end: Position) -> Vec<InsertionCount> {
        self.insertion_density()
            .into_iter()
            .filter(|count| count.position >= start && count.position <= end)
            .collect()
    }

    /// A fixed-width histogram of the insertion density values.
    pub fn density_histogram(&self, bin_size: f64) -> Result<Vec<HistogramBin>, PimmsError> {
        let values: Vec<f64> = self
            .insertion_density()
            .iter()
            .map(|count| count.value)
            .collect();
        histogram(&values, bin_size)
    }

    /// Write the header text followed by the nine columns of every row.
    pub fn to_gff3(&self, filepath: impl Into<PathBuf>) -> Result<(), PimmsError> {
        let output = OutputFile::new(filepath, self.header.clone());
        let mut writer = output.writer()?;
        for record in &self.records {
            writeln!(writer, "{}", record.to_tsv(&GFF_TSV))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Serialize to the JSON transport form, with the rows as a
    /// column-names-plus-data table and the path as a string.
    pub fn to_json(&self) -> Result<String, PimmsError> {
        let record = GffTableRecord {
            version: TRANSPORT_VERSION,
            path: self.path.to_string_lossy().into_owned(),
            header: self.header.clone(),
            data: TableRecord {
                columns: GFF3_COLUMNS.iter().map(|name| name.to_string()).collect(),
                data: self.records.iter().map(GffRecord::to_datums).collect(),
            },
        };
        TransportRecord::FeatureTable(record).to_json()
    }

    /// Rebuild a [`GffTable`] from its JSON transport form.
    pub fn from_json(json: &str) -> Result<Self, PimmsError> {
        let record = match TransportRecord::from_json(json)? {
            TransportRecord::FeatureTable(record) => record,
            other => {
                return Err(PimmsError::TransportKind {
                    expected: "feature_table".to_string(),
                    found: other.kind().to_string(),
                })
            }
        };
        let data = record.data;
        if data.columns != GFF3_COLUMNS {
            return Err(PimmsError::SchemaError {
                table: "feature".to_string(),
                missing: GFF3_COLUMNS
                    .iter()
                    .filter(|name| !data.columns.iter().any(|c| c == *name))
                    .map(|name| name.to_string())
                    .collect(),
            });
        }
        let records = data
            .data
            .into_iter()
            .enumerate()
            .map(|(i, row)| GffRecord::from_datums(row, i + 1))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(PathBuf::from(record.path), record.header, records))
    }
}
