//! The [`Table`] type: an ordered set of named, equal-length columns of
//! [`DatumType`] values.
//!
//! Per-feature measurement files have a handful of fixed identifier
//! columns plus an arbitrary set of measurement columns, so column names
//! and types are only known at runtime. [`Table`] keeps columns in the
//! order they were read or inserted, which makes every projection and
//! serialization of a table reproducible.
//!
//! Tables are treated as values: operations like [`Table::select()`] and
//! [`Table::round()`] return new tables and never alter their input.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::PathBuf;

use crate::{
    data::{parse_column, DatumType},
    error::PimmsError,
    io::{get_base_extension, InputFile, OutputFile, TABLE_TSV},
    traits::{TsvSerialize, TsvWriter},
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: IndexMap<String, Vec<DatumType>>,
    nrows: usize,
}

/// The self-describing transport form of a [`Table`]: column names plus
/// row-major data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub columns: Vec<String>,
    pub data: Vec<Vec<DatumType>>,
}

impl Table {
    /// Create a new empty [`Table`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a [`Table`] from `(name, values)` pairs. All columns must have
    /// the same length, and names must be unique.
    pub fn from_columns<S: Into<String>>(
        columns: Vec<(S, Vec<DatumType>)>,
    ) -> Result<Self, PimmsError> {
        let mut table = Table::new();
        for (name, values) in columns {
            table.push_column(name, values)?;
        }
        Ok(table)
    }

    /// Read a delimited measurement file with a header row. Files with a
    /// `.tsv` or `.txt` base extension are read as tab-delimited, all
    /// others as comma-delimited. Gzip-compressed input is detected
    /// automatically.
    pub fn from_path(filepath: impl Into<PathBuf>) -> Result<Self, PimmsError> {
        let filepath = filepath.into();
        let delimiter = match get_base_extension(&filepath).as_deref() {
            Some("tsv") | Some("txt") => b'\t',
            _ => b',',
        };
        let reader = InputFile::new(&filepath).reader()?;
        let table = Self::from_reader(reader, delimiter)?;
        log::debug!(
            "read {} rows and {} columns from {}",
            table.nrows(),
            table.ncols(),
            filepath.display()
        );
        Ok(table)
    }

    /// Read delimited text with a header row from any reader.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self, PimmsError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(reader);

        let names: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(PimmsError::DuplicateColumn(name.clone()));
            }
        }

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        for result in reader.records() {
            let record = result?;
            for (column, cell) in cells.iter_mut().zip(record.iter()) {
                column.push(cell.to_string());
            }
        }

        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| (name, parse_column(&raw)))
            .collect();
        Self::from_columns(columns)
    }

    /// Get the number of rows.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Get the number of columns.
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Return whether the [`Table`] has no rows.
    pub fn is_empty(&self) -> bool {
        self.nrows == 0
    }

    /// The column names, in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[DatumType]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Like [`Table::column()`], but a missing column is an error.
    pub fn get_column(&self, name: &str) -> Result<&[DatumType], PimmsError> {
        self.column(name)
            .ok_or_else(|| PimmsError::UnknownColumn(name.to_string()))
    }

    /// Get a column as floats. Missing values are `NaN`; a column holding
    /// strings is an error.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>, PimmsError> {
        self.get_column(name)?
            .iter()
            .map(|value| {
                value
                    .as_f64()
                    .ok_or_else(|| PimmsError::InvalidColumnType(name.to_string()))
            })
            .collect()
    }

    /// Get a single cell.
    pub fn cell(&self, row: usize, name: &str) -> Option<&DatumType> {
        self.columns.get(name).and_then(|values| values.get(row))
    }

    /// Get one row, in column order.
    pub fn row(&self, index: usize) -> Vec<&DatumType> {
        self.columns.values().map(|values| &values[index]).collect()
    }

    /// Append a column. The first column pushed to an empty table sets the
    /// number of rows.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<DatumType>,
    ) -> Result<(), PimmsError> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(PimmsError::DuplicateColumn(name));
        }
        if self.columns.is_empty() {
            self.nrows = values.len();
        } else if values.len() != self.nrows {
            return Err(PimmsError::ColumnLengthMismatch {
                name,
                expected: self.nrows,
                found: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Create a new [`Table`] with only the named columns, in the order given.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table, PimmsError> {
        let mut table = Table::new();
        for name in names {
            let name = name.as_ref();
            table.push_column(name, self.get_column(name)?.to_vec())?;
        }
        // keep the row count even if no columns were selected
        table.nrows = self.nrows;
        Ok(table)
    }

    /// Create a new [`Table`] from a set of row indices, in the order given.
    ///
    /// # Panics
    /// Panics if an index is out of bounds.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                let taken = indices.iter().map(|&i| values[i].clone()).collect();
                (name.clone(), taken)
            })
            .collect();
        Table {
            columns,
            nrows: indices.len(),
        }
    }

    /// Create a new [`Table`] with all float values rounded to `decimals` places.
    pub fn round(&self, decimals: u32) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                let rounded = values.iter().map(|value| value.round(decimals)).collect();
                (name.clone(), rounded)
            })
            .collect();
        Table {
            columns,
            nrows: self.nrows,
        }
    }

    /// Convert to the row-major transport form.
    pub fn to_record(&self) -> TableRecord {
        let columns = self.columns.keys().cloned().collect();
        let data = (0..self.nrows)
            .map(|i| self.row(i).into_iter().cloned().collect())
            .collect();
        TableRecord { columns, data }
    }

    /// Rebuild a [`Table`] from its transport form.
    pub fn from_record(record: TableRecord) -> Result<Table, PimmsError> {
        let ncols = record.columns.len();
        let nrows = record.data.len();
        let mut values: Vec<Vec<DatumType>> = vec![Vec::with_capacity(nrows); ncols];
        for row in record.data {
            if row.len() != ncols {
                return Err(PimmsError::ColumnLengthMismatch {
                    name: "<row>".to_string(),
                    expected: ncols,
                    found: row.len(),
                });
            }
            for (column, value) in values.iter_mut().zip(row) {
                column.push(value);
            }
        }
        let mut table = Table::from_columns(record.columns.into_iter().zip(values).collect())?;
        table.nrows = nrows;
        Ok(table)
    }

    /// Write this table as TSV with a header row to any writer.
    pub fn write_tsv<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), PimmsError> {
        let header: Vec<String> = self.columns.keys().cloned().collect();
        writeln!(writer, "{}", header.to_tsv(&TABLE_TSV))?;
        for i in 0..self.nrows {
            writeln!(writer, "{}", self.row(i).to_tsv(&TABLE_TSV))?;
        }
        Ok(())
    }
}

impl TsvWriter for Table {
    fn to_tsv(&self, output: Option<impl Into<PathBuf>>) -> Result<(), PimmsError> {
        let output = output.map_or(OutputFile::new_stdout(None), |file| {
            OutputFile::new(file, None)
        });
        let mut writer = output.writer()?;
        self.write_tsv(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> Table {
        Table::from_columns(vec![
            (
                "locus_tag",
                vec![
                    DatumType::String("g1".to_string()),
                    DatumType::String("g2".to_string()),
                ],
            ),
            (
                "NIM_score",
                vec![DatumType::Float64(0.12345), DatumType::NoValue],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_reader_infers_types() {
        let csv = "locus_tag,start,NIM_score\ng1,1,0.5\ng2,200,\n";
        let table = Table::from_reader(csv.as_bytes(), b',').unwrap();
        assert_eq!(table.nrows(), 2);
        assert_eq!(table.column_names(), vec!["locus_tag", "start", "NIM_score"]);
        assert_eq!(table.cell(1, "start"), Some(&DatumType::Integer64(200)));
        assert_eq!(table.cell(1, "NIM_score"), Some(&DatumType::NoValue));
    }

    #[test]
    fn test_from_reader_duplicate_header() {
        let csv = "a,b,a\n1,2,3\n";
        let result = Table::from_reader(csv.as_bytes(), b',');
        assert!(matches!(result, Err(PimmsError::DuplicateColumn(name)) if name == "a"));
    }

    #[test]
    fn test_from_reader_ragged_row() {
        let csv = "a,b\n1,2\n3\n";
        let result = Table::from_reader(csv.as_bytes(), b',');
        assert!(matches!(result, Err(PimmsError::CsvError(_))));
    }

    #[test]
    fn test_push_column_length_mismatch() {
        let mut table = small_table();
        let result = table.push_column("x", vec![DatumType::Integer64(1)]);
        assert!(matches!(
            result,
            Err(PimmsError::ColumnLengthMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_numeric_column() {
        let table = small_table();
        let values = table.numeric_column("NIM_score").unwrap();
        assert_eq!(values[0], 0.12345);
        assert!(values[1].is_nan());
        assert!(matches!(
            table.numeric_column("locus_tag"),
            Err(PimmsError::InvalidColumnType(_))
        ));
        assert!(matches!(
            table.numeric_column("gene"),
            Err(PimmsError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_select_and_take_rows() {
        let table = small_table();
        let selected = table.select(&["NIM_score"]).unwrap();
        assert_eq!(selected.column_names(), vec!["NIM_score"]);
        let taken = table.take_rows(&[1, 0]);
        assert_eq!(
            taken.cell(0, "locus_tag"),
            Some(&DatumType::String("g2".to_string()))
        );
    }

    #[test]
    fn test_round_does_not_modify() {
        let table = small_table();
        let rounded = table.round(3);
        assert_eq!(rounded.cell(0, "NIM_score"), Some(&DatumType::Float64(0.123)));
        assert_eq!(table.cell(0, "NIM_score"), Some(&DatumType::Float64(0.12345)));
    }

    #[test]
    fn test_record_round_trip() {
        let table = small_table();
        let record = table.to_record();
        assert_eq!(record.columns, vec!["locus_tag", "NIM_score"]);
        assert_eq!(record.data.len(), 2);
        assert_eq!(Table::from_record(record).unwrap(), table);
    }

    #[test]
    fn test_write_tsv() {
        let table = small_table();
        let mut buffer = Vec::new();
        table.write_tsv(&mut buffer).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "locus_tag\tNIM_score\ng1\t0.12345\ng2\t\n"
        );
    }
}
