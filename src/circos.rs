//! Circular genome plot ("circos") ring data.
//!
//! A ring is a list of [`CircosRecord`]s, each a block of a sequence with a
//! value. Feature files become rings with [`from_gff()`], and comparison
//! table columns with [`from_table()`].

use serde::Serialize;

use crate::{
    data::DatumType, error::PimmsError, gff::GffTable, io::TsvConfig, table::Table,
    traits::TsvSerialize,
};

/// One block of a circos ring.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CircosRecord {
    pub block_id: String,
    pub start: i64,
    pub end: i64,
    /// `NaN` where the source had no value.
    pub value: f64,
    /// An optional label, e.g. the locus tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TsvSerialize for CircosRecord {
    fn to_tsv(&self, config: &TsvConfig) -> String {
        let value = if self.value.is_nan() {
            config.no_value_string.clone()
        } else {
            self.value.to_string()
        };
        let mut line = format!("{}\t{}\t{}\t{}", self.block_id, self.start, self.end, value);
        if let Some(name) = &self.name {
            line.push('\t');
            line.push_str(name);
        }
        line
    }
}

/// A ring from a feature file, with its scores as values. Each block
/// starts one before the feature so that single-base features have a
/// width.
pub fn from_gff(gff: &GffTable) -> Vec<CircosRecord> {
    gff.records()
        .iter()
        .map(|record| CircosRecord {
            block_id: record.seq_id.clone(),
            start: record.start as i64 - 1,
            end: record.end as i64,
            value: record.score_value().unwrap_or(f64::NAN),
            name: None,
        })
        .collect()
}

/// A ring from the `seq_id`, `start`, `end` and `locus_tag` columns of a
/// table, with `value_column` as values.
pub fn from_table(table: &Table, value_column: &str) -> Result<Vec<CircosRecord>, PimmsError> {
    let block_ids = table.get_column("seq_id")?;
    let starts = table.numeric_column("start")?;
    let ends = table.numeric_column("end")?;
    let names = table.column("locus_tag");
    let values = table.numeric_column(value_column)?;

    let records = (0..table.nrows())
        .map(|i| CircosRecord {
            block_id: block_ids[i].to_string(),
            start: starts[i] as i64,
            end: ends[i] as i64,
            value: values[i],
            name: names.and_then(|names| match &names[i] {
                DatumType::NoValue => None,
                name => Some(name.to_string()),
            }),
        })
        .collect();
    Ok(records)
}

/// Keep the blocks within `[start, end]`.
pub fn limit_genome(ring: &[CircosRecord], start: i64, end: i64) -> Vec<CircosRecord> {
    ring.iter()
        .filter(|record| record.start >= start && record.end <= end)
        .cloned()
        .collect()
}

/// Drop the rows where both `first` and `second` have a zero value. The
/// same rows are dropped from every ring in `others`.
///
/// # Errors
/// A [`PimmsError::ColumnLengthMismatch`] if the rings are not all the
/// same length.
pub fn drop_both_zero(
    first: &[CircosRecord],
    second: &[CircosRecord],
    others: &[&[CircosRecord]],
) -> Result<Vec<Vec<CircosRecord>>, PimmsError> {
    for (i, ring) in std::iter::once(second).chain(others.iter().copied()).enumerate() {
        if ring.len() != first.len() {
            return Err(PimmsError::ColumnLengthMismatch {
                name: format!("ring {}", i + 2),
                expected: first.len(),
                found: ring.len(),
            });
        }
    }

    let keep: Vec<bool> = first
        .iter()
        .zip(second)
        .map(|(a, b)| !(a.value == 0.0 && b.value == 0.0))
        .collect();
    let reduce = |ring: &[CircosRecord]| -> Vec<CircosRecord> {
        ring.iter()
            .zip(&keep)
            .filter(|(_, keep)| **keep)
            .map(|(record, _)| record.clone())
            .collect()
    };

    Ok(std::iter::once(first)
        .chain(std::iter::once(second))
        .chain(others.iter().copied())
        .map(reduce)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gff::GffRecord;
    use crate::io::TABLE_TSV;

    fn record(start: i64, end: i64, value: f64) -> CircosRecord {
        CircosRecord {
            block_id: "NC_000913".to_string(),
            start,
            end,
            value,
            name: None,
        }
    }

    fn gff_record(start: u32, score: &str) -> GffRecord {
        GffRecord {
            seq_id: "NC_000913".to_string(),
            source: "pimms".to_string(),
            feature_type: "insert".to_string(),
            start,
            end: start,
            score: score.to_string(),
            strand: "+".to_string(),
            phase: ".".to_string(),
            attributes: ".".to_string(),
        }
    }

    #[test]
    fn test_from_gff_shifts_start() {
        let gff = GffTable::new("inserts.gff", None, vec![gff_record(10, "4"), gff_record(20, ".")]);
        let ring = from_gff(&gff);
        assert_eq!(ring[0], record(9, 10, 4.0));
        assert_eq!(ring[1].start, 19);
        assert!(ring[1].value.is_nan());
        assert_eq!(ring[1].to_tsv(&TABLE_TSV), "NC_000913\t19\t20\t");
    }

    #[test]
    fn test_from_table() {
        let table = Table::from_columns(vec![
            ("seq_id", vec![DatumType::from("NC_000913")]),
            ("locus_tag", vec![DatumType::from("b0001")]),
            ("start", vec![DatumType::from(190i64)]),
            ("end", vec![DatumType::from(255i64)]),
            ("fold_change", vec![DatumType::from(1.5)]),
        ])
        .unwrap();
        let ring = from_table(&table, "fold_change").unwrap();
        assert_eq!(ring[0].name.as_deref(), Some("b0001"));
        assert_eq!(ring[0].to_tsv(&TABLE_TSV), "NC_000913\t190\t255\t1.5\tb0001");
        assert!(from_table(&table, "pctl_rank").is_err());
    }

    #[test]
    fn test_limit_genome() {
        let ring = vec![record(0, 10, 1.0), record(5, 20, 1.0), record(15, 30, 1.0)];
        assert_eq!(limit_genome(&ring, 0, 20).len(), 2);
        assert_eq!(limit_genome(&ring, 5, 30), ring[1..].to_vec());
    }

    #[test]
    fn test_drop_both_zero() {
        let inner = vec![record(0, 1, 0.0), record(1, 2, 0.0), record(2, 3, 3.0)];
        let outer = vec![record(0, 1, 0.0), record(1, 2, 2.0), record(2, 3, 0.0)];
        let histogram = vec![record(0, 1, 7.0), record(1, 2, 8.0), record(2, 3, 9.0)];
        let rings = drop_both_zero(&inner, &outer, &[histogram.as_slice()]).unwrap();
        assert_eq!(rings.len(), 3);
        assert!(rings.iter().all(|ring| ring.len() == 2));
        assert_eq!(rings[2][0].value, 8.0);

        let short = vec![record(0, 1, 0.0)];
        assert!(drop_both_zero(&inner, &short, &[]).is_err());
    }
}
