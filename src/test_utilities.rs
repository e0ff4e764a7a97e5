//! Test cases and test utility functions.
//!

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::io::Write;
use tempfile::NamedTempFile;

use crate::{
    comparison::KEY_COLUMNS,
    data::DatumType,
    error::PimmsError,
    gff::{GffRecord, GffTable},
    table::Table,
    Position,
};

// Stochastic test table defaults
//
// This is the random number of features to use in tests.
// The tradeoff is catching stochastic errors vs test time.
pub const NRANDOM_FEATURES: usize = 10000;

// feature length
pub const MIN_LEN: i64 = 100;
pub const MAX_LEN: i64 = 5000;

// NIM scores are fractions of insertion-free feature length
pub const MAX_NIM: f64 = 1.0;

// read counts of a single replicate pool
pub const MAX_POOL_COUNT: i64 = 2000;

/// Build a random measurement table of `n` consecutive features, with
/// `{prefix}_NRM_score`, `{prefix}_NIM_score` and `pools` replicate pool
/// columns (`{prefix}_MP1`, ...). The same seed gives the same features.
pub fn random_measurements(
    n: usize,
    prefix: &str,
    pools: usize,
    seed: u64,
) -> Result<Table, PimmsError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut columns: Vec<(String, Vec<DatumType>)> = KEY_COLUMNS
        .iter()
        .map(|name| (name.to_string(), Vec::with_capacity(n)))
        .collect();
    let mut nrm = Vec::with_capacity(n);
    let mut nim = Vec::with_capacity(n);
    let mut counts = vec![Vec::with_capacity(n); pools];

    // features are laid out in order along a single sequence
    let mut start = 1;
    for i in 0..n {
        let len = rng.gen_range(MIN_LEN..MAX_LEN);
        let end = start + len - 1;
        let values = [
            DatumType::from("NC_000913"),
            DatumType::from(format!("b{:04}", i)),
            DatumType::from("CDS"),
            DatumType::from(format!("gene{}", i)),
            DatumType::from(start),
            DatumType::from(end),
            DatumType::from(len),
            DatumType::from("hypothetical protein"),
        ];
        for (column, value) in columns.iter_mut().zip(values) {
            column.1.push(value);
        }
        start = end + rng.gen_range(1..500);
    }

    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    for _ in 0..n {
        let score: f64 = rng.gen_range(0.0..MAX_NIM);
        nim.push(DatumType::from(score));
        nrm.push(DatumType::from(score * rng.gen_range(0.5..2.0)));
        for pool in counts.iter_mut() {
            pool.push(DatumType::from(rng.gen_range(0..MAX_POOL_COUNT)));
        }
    }

    columns.push((format!("{}_NRM_score", prefix), nrm));
    columns.push((format!("{}_NIM_score", prefix), nim));
    for (i, pool) in counts.into_iter().enumerate() {
        columns.push((format!("{}_MP{}", prefix, i + 1), pool));
    }
    Table::from_columns(columns)
}

/// Build a random control and test pair sharing the same `n` features.
pub fn random_comparison_pair(
    n: usize,
    pools: usize,
    seed: u64,
) -> Result<(Table, Table), PimmsError> {
    let control = random_measurements(n, "Media_Input", pools, seed)?;
    let test = random_measurements(n, "Blood_Output", pools, seed)?;
    Ok((control, test))
}

/// Build a random insertion site [`GffTable`] with `n` single-base inserts
/// along a sequence of `seqlen`.
pub fn random_gff(n: usize, seqlen: Position, seed: u64) -> GffTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let records = (0..n)
        .map(|i| {
            let position = rng.gen_range(1..=seqlen);
            GffRecord {
                seq_id: "NC_000913".to_string(),
                source: "pimms".to_string(),
                feature_type: "insert".to_string(),
                start: position,
                end: position,
                score: ".".to_string(),
                strand: if rng.gen_bool(0.5) { "+" } else { "-" }.to_string(),
                phase: ".".to_string(),
                attributes: format!("ID=insert{}", i),
            }
        })
        .collect();
    GffTable::new("random.gff", None, records)
}

/// Write a [`Table`] to a temporary `.tsv` file.
pub fn temp_tsv(table: &Table) -> Result<NamedTempFile, PimmsError> {
    let mut file = tempfile::Builder::new().suffix(".tsv").tempfile()?;
    table.write_tsv(&mut file)?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_measurements_seeded() {
        let a = random_measurements(50, "Media_Input", 2, 7).unwrap();
        let b = random_measurements(50, "Media_Input", 2, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.nrows(), 50);
        assert!(a.has_column("Media_Input_MP2"));
    }

    #[test]
    fn test_temp_tsv_reads_back() {
        let table = random_measurements(20, "Media_Input", 1, 3).unwrap();
        let file = temp_tsv(&table).unwrap();
        let read = Table::from_path(file.path()).unwrap();
        assert_eq!(read.column_names(), table.column_names());
        assert_eq!(read.get_column("locus_tag").unwrap(), table.get_column("locus_tag").unwrap());
        assert_eq!(read.get_column("end").unwrap(), table.get_column("end").unwrap());
    }
}
