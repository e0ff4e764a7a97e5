//! Inner joins of two [`Table`]s on a set of key columns, with
//! source-specific suffixes on every non-key column.
//!
//! # Ordering
//!
//! Output rows follow the left table's row order; when a left row matches
//! several right rows, the matches follow the right table's row order.
//! Output columns are the key columns (in the order given), then the left
//! table's non-key columns, then the right table's, each group in the
//! order of its input table. Given the same inputs and suffixes the output
//! is always identical.

use std::collections::{HashMap, HashSet};

use crate::{data::DatumType, error::PimmsError, table::Table};

/// Counts of the rows a merge dropped because their key had no partner.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergeReport {
    pub left_unmatched: usize,
    pub right_unmatched: usize,
    pub matched: usize,
}

/// The key of one row, as rendered text. Missing values get a sentinel
/// that cannot collide with any rendered value.
fn row_key<S: AsRef<str>>(table: &Table, keys: &[S], row: usize) -> Vec<String> {
    keys.iter()
        .map(|key| match table.cell(row, key.as_ref()) {
            Some(DatumType::NoValue) | None => "\u{0}".to_string(),
            Some(value) => value.to_string(),
        })
        .collect()
}

fn table_name(suffix: &str, fallback: &str) -> String {
    let name = suffix.trim_start_matches('_');
    if name.is_empty() {
        fallback.to_string()
    } else {
        name.to_string()
    }
}

fn missing_keys<S: AsRef<str>>(table: &Table, keys: &[S]) -> Vec<String> {
    keys.iter()
        .map(AsRef::as_ref)
        .filter(|key| !table.has_column(key))
        .map(String::from)
        .collect()
}

/// Rename every non-key column by appending `suffix`.
fn suffixed_columns<S: AsRef<str>>(
    table: &Table,
    keys: &[S],
    suffix: &str,
) -> Vec<(String, String)> {
    let keys: HashSet<&str> = keys.iter().map(AsRef::as_ref).collect();
    table
        .column_names()
        .into_iter()
        .filter(|name| !keys.contains(name))
        .map(|name| (name.to_string(), format!("{}{}", name, suffix)))
        .collect()
}

/// Inner join `left` and `right` on the `on` columns, appending
/// `left_suffix` to every non-key column of `left` and `right_suffix` to
/// every non-key column of `right`. Key columns are never renamed.
///
/// Rows whose key appears in only one input are dropped. A missing key
/// cell matches a missing cell in the same key column. The inputs are not
/// modified.
///
/// # Errors
/// A [`PimmsError::SchemaError`] if a key column is missing from either
/// table (the table is named after its suffix), and a
/// [`PimmsError::SuffixCollision`] if the renamed columns are not unique.
pub fn merge_add_suffix<S: AsRef<str>>(
    left: &Table,
    right: &Table,
    on: &[S],
    left_suffix: &str,
    right_suffix: &str,
) -> Result<Table, PimmsError> {
    merge_with_report(left, right, on, left_suffix, right_suffix).map(|(table, _)| table)
}

/// Like [`merge_add_suffix()`], also reporting how many rows were dropped.
pub fn merge_with_report<S: AsRef<str>>(
    left: &Table,
    right: &Table,
    on: &[S],
    left_suffix: &str,
    right_suffix: &str,
) -> Result<(Table, MergeReport), PimmsError> {
    for (table, suffix, fallback) in [(left, left_suffix, "left"), (right, right_suffix, "right")] {
        let missing = missing_keys(table, on);
        if !missing.is_empty() {
            return Err(PimmsError::SchemaError {
                table: table_name(suffix, fallback),
                missing,
            });
        }
    }

    let left_columns = suffixed_columns(left, on, left_suffix);
    let right_columns = suffixed_columns(right, on, right_suffix);

    let mut names: HashSet<&str> = on.iter().map(AsRef::as_ref).collect();
    for (_, renamed) in left_columns.iter().chain(&right_columns) {
        if !names.insert(renamed.as_str()) {
            return Err(PimmsError::SuffixCollision(renamed.clone()));
        }
    }

    // index the right rows by key, keeping row order within each key
    let mut right_index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for j in 0..right.nrows() {
        right_index.entry(row_key(right, on, j)).or_default().push(j);
    }

    let mut left_rows = Vec::new();
    let mut right_rows = Vec::new();
    let mut right_matched = vec![false; right.nrows()];
    let mut report = MergeReport::default();
    for i in 0..left.nrows() {
        match right_index.get(&row_key(left, on, i)) {
            Some(matches) => {
                for &j in matches {
                    left_rows.push(i);
                    right_rows.push(j);
                    right_matched[j] = true;
                }
            }
            None => report.left_unmatched += 1,
        }
    }
    report.right_unmatched = right_matched.iter().filter(|&&m| !m).count();
    report.matched = left_rows.len();

    let left_taken = left.take_rows(&left_rows);
    let right_taken = right.take_rows(&right_rows);

    let mut merged = Table::new();
    for key in on {
        let key = key.as_ref();
        merged.push_column(key, left_taken.get_column(key)?.to_vec())?;
    }
    for (name, renamed) in &left_columns {
        merged.push_column(renamed.as_str(), left_taken.get_column(name)?.to_vec())?;
    }
    for (name, renamed) in &right_columns {
        merged.push_column(renamed.as_str(), right_taken.get_column(name)?.to_vec())?;
    }

    log::info!(
        "merged {} rows; dropped {} unmatched left rows and {} unmatched right rows",
        report.matched,
        report.left_unmatched,
        report.right_unmatched
    );
    Ok((merged, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<DatumType> {
        values.iter().map(|&v| DatumType::from(v)).collect()
    }

    fn ints(values: &[i64]) -> Vec<DatumType> {
        values.iter().map(|&v| DatumType::from(v)).collect()
    }

    fn control_table() -> Table {
        Table::from_columns(vec![
            ("locus_tag", strings(&["g1", "g2", "g3"])),
            ("start", ints(&[1, 200, 500])),
            ("NIM_score", ints(&[0, 4, 9])),
        ])
        .unwrap()
    }

    fn test_table() -> Table {
        Table::from_columns(vec![
            ("NIM_score", ints(&[5, 7, 1])),
            ("start", ints(&[500, 1, 900])),
            ("locus_tag", strings(&["g3", "g1", "g4"])),
        ])
        .unwrap()
    }

    #[test]
    fn test_inner_join_keeps_intersection() {
        let merged = merge_add_suffix(
            &control_table(),
            &test_table(),
            &["locus_tag", "start"],
            "_control",
            "_test",
        )
        .unwrap();
        assert_eq!(merged.nrows(), 2);
        assert_eq!(
            merged.column_names(),
            vec!["locus_tag", "start", "NIM_score_control", "NIM_score_test"]
        );
        // left row order is kept
        assert_eq!(merged.cell(0, "locus_tag"), Some(&DatumType::from("g1")));
        assert_eq!(merged.cell(0, "NIM_score_test"), Some(&DatumType::Integer64(7)));
        assert_eq!(merged.cell(1, "locus_tag"), Some(&DatumType::from("g3")));
        assert_eq!(merged.cell(1, "NIM_score_control"), Some(&DatumType::Integer64(9)));
    }

    #[test]
    fn test_merge_report() {
        let (_, report) =
            merge_with_report(&control_table(), &test_table(), &["locus_tag"], "_control", "_test").unwrap();
        assert_eq!(
            report,
            MergeReport {
                left_unmatched: 1,
                right_unmatched: 1,
                matched: 2
            }
        );
    }

    #[test]
    fn test_inputs_unchanged() {
        let left = control_table();
        let right = test_table();
        let before = (left.clone(), right.clone());
        // a second merge of the same inputs gives the same result
        let first = merge_add_suffix(&left, &right, &["locus_tag"], "_control", "_test").unwrap();
        let second = merge_add_suffix(&left, &right, &["locus_tag"], "_control", "_test").unwrap();
        assert_eq!((left, right), before);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_key_names_table() {
        let result = merge_add_suffix(&control_table(), &test_table(), &["gene"], "_control", "_test");
        match result {
            Err(PimmsError::SchemaError { table, missing }) => {
                assert_eq!(table, "control");
                assert_eq!(missing, vec!["gene".to_string()]);
            }
            other => panic!("expected a schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_key_in_right() {
        let right = test_table().select(&["locus_tag", "NIM_score"]).unwrap();
        let result = merge_add_suffix(&control_table(), &right, &["locus_tag", "start"], "_control", "_test");
        assert!(matches!(result, Err(PimmsError::SchemaError { table, .. }) if table == "test"));
    }

    #[test]
    fn test_equal_suffixes_collide() {
        let result = merge_add_suffix(&control_table(), &test_table(), &["locus_tag"], "_x", "_x");
        assert!(matches!(result, Err(PimmsError::SuffixCollision(_))));
    }

    #[test]
    fn test_duplicate_keys_cartesian() {
        let right = Table::from_columns(vec![
            ("locus_tag", strings(&["g1", "g1"])),
            ("NIM_score", ints(&[1, 2])),
        ])
        .unwrap();
        let merged =
            merge_add_suffix(&control_table(), &right, &["locus_tag"], "_control", "_test").unwrap();
        assert_eq!(merged.nrows(), 2);
        assert_eq!(merged.numeric_column("NIM_score_test").unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_missing_key_cells_match() {
        let left = Table::from_columns(vec![
            ("locus_tag", strings(&["g1", "g2"])),
            ("gene", vec![DatumType::NoValue, DatumType::from("thrA")]),
            ("NIM_score", ints(&[3, 4])),
        ])
        .unwrap();
        let right = Table::from_columns(vec![
            ("locus_tag", strings(&["g1", "g2"])),
            ("gene", vec![DatumType::NoValue, DatumType::NoValue]),
            ("NIM_score", ints(&[5, 6])),
        ])
        .unwrap();
        let (merged, report) =
            merge_with_report(&left, &right, &["locus_tag", "gene"], "_control", "_test").unwrap();
        assert_eq!(merged.nrows(), 1);
        assert_eq!(merged.cell(0, "gene"), Some(&DatumType::NoValue));
        assert_eq!(merged.cell(0, "NIM_score_test"), Some(&DatumType::Integer64(5)));
        // a missing cell never matches a present one
        assert_eq!(report.left_unmatched, 1);
        assert_eq!(report.right_unmatched, 1);
    }

    #[test]
    fn test_merge_report_duplicate_keys() {
        let left = Table::from_columns(vec![
            ("locus_tag", strings(&["g1", "g1", "g2"])),
            ("NIM_score", ints(&[1, 2, 3])),
        ])
        .unwrap();
        let right = Table::from_columns(vec![
            ("locus_tag", strings(&["g1", "g5"])),
            ("NIM_score", ints(&[4, 5])),
        ])
        .unwrap();
        let (merged, report) =
            merge_with_report(&left, &right, &["locus_tag"], "_control", "_test").unwrap();
        assert_eq!(merged.nrows(), 2);
        assert_eq!(
            report,
            MergeReport {
                left_unmatched: 1,
                right_unmatched: 1,
                matched: 2
            }
        );
    }
}
