//! End-to-end tests of the pimms binary against the fixtures in tests_data/.

use pimms::prelude::*;
use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

fn pimms_binary_path() -> &'static str {
    env!("CARGO_BIN_EXE_pimms")
}

fn run_pimms(args: &[&str]) -> Output {
    Command::new(pimms_binary_path())
        .args(args)
        .output()
        .expect("could not run pimms")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(String::from)
        .collect()
}

#[test]
fn test_compare_simple_fold_change() {
    let output = run_pimms(&[
        "compare",
        "--control",
        "tests_data/control.csv",
        "--test",
        "tests_data/test.csv",
        "--simple",
        "--metric",
        "fold_change",
    ]);
    assert!(output.status.success(), "{:?}", output);

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 5);
    assert_eq!(
        lines[0],
        "locus_tag\ttype\tgene\tstart\tend\tfeat_length\tproduct\t\
         Blood_Output_NRM_score_test\tMedia_Input_NRM_score_control\t\
         Blood_Output_NIM_score_test\tMedia_Input_NIM_score_control\tfold_change"
    );
    assert_eq!(
        lines[4],
        "b0004\tCDS\tthrC\t3734\t5020\t1286\tthreonine synthase\t41\t4.75\t0.9\t0.1\t3.17"
    );
    let fold_changes: Vec<&str> = lines[1..]
        .iter()
        .map(|line| line.rsplit('\t').next().unwrap())
        .collect();
    assert_eq!(fold_changes, vec!["0", "1", "-2", "3.17"]);

    // b0005 and b0006 have no partner
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1 control features had no matching test feature"));
    assert!(stderr.contains("1 test features had no matching control feature"));
}

#[test]
fn test_compare_repeated_control_feature() {
    let fixture = std::fs::read_to_string("tests_data/control.csv").unwrap();
    let repeated = fixture.lines().nth(1).unwrap();
    let mut control = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    write!(control, "{}{}\n", fixture, repeated).unwrap();
    let output = run_pimms(&[
        "compare",
        "--control",
        control.path().to_str().unwrap(),
        "--test",
        "tests_data/test.csv",
        "--simple",
    ]);
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(stdout_lines(&output).len(), 6);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1 control features had no matching test feature"), "{}", stderr);
    assert!(stderr.contains("1 test features had no matching control feature"), "{}", stderr);
}

#[test]
fn test_compare_all_columns() {
    let output = run_pimms(&[
        "compare",
        "--control",
        "tests_data/control.csv",
        "--test",
        "tests_data/test.csv",
    ]);
    assert!(output.status.success(), "{:?}", output);

    let lines = stdout_lines(&output);
    let header: Vec<&str> = lines[0].split('\t').collect();
    assert_eq!(header[0], "seq_id");
    assert!(header.contains(&"Media_Input_MP2_control"));
    assert!(header.contains(&"Blood_Output_MP1_test"));
    assert_eq!(&header[header.len() - 2..], &["fold_change", "pctl_rank"]);

    let pctl_ranks: Vec<&str> = lines[1..]
        .iter()
        .map(|line| line.rsplit('\t').next().unwrap())
        .collect();
    assert_eq!(pctl_ranks, vec!["0.25", "-0.25", "-0.75", "0.5"]);
}

#[test]
fn test_compare_metric_none() {
    let output = run_pimms(&[
        "compare",
        "--control",
        "tests_data/control.csv",
        "--test",
        "tests_data/test.csv",
        "--metric",
        "none",
    ]);
    assert!(output.status.success(), "{:?}", output);
    let lines = stdout_lines(&output);
    assert!(!lines[0].contains("fold_change"));
    assert!(!lines[0].contains("pctl_rank"));
}

#[test]
fn test_compare_unknown_metric() {
    let output = run_pimms(&[
        "compare",
        "--control",
        "tests_data/control.csv",
        "--test",
        "tests_data/test.csv",
        "--metric",
        "deseq_padj",
    ]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Error:"));
}

#[test]
fn test_compare_json_output() {
    let json = NamedTempFile::new().unwrap();
    let tsv = tempfile::Builder::new().suffix(".tsv").tempfile().unwrap();
    let json_path = json.path().to_str().unwrap();
    let tsv_path = tsv.path().to_str().unwrap();
    let output = run_pimms(&[
        "compare",
        "--control",
        "tests_data/control.csv",
        "--test",
        "tests_data/test.csv",
        "--output",
        tsv_path,
        "--json",
        json_path,
    ]);
    assert!(output.status.success(), "{:?}", output);
    assert!(output.stdout.is_empty());

    let text = std::fs::read_to_string(json.path()).unwrap();
    let table = ComparisonTable::from_json(&text).unwrap();
    assert_eq!(table.len(), 4);
    assert_eq!(table.comparison_columns(), &["fold_change", "pctl_rank"]);
    assert_eq!(
        table.control_path().unwrap().to_str(),
        Some("tests_data/control.csv")
    );

    let written = Table::from_path(tsv.path()).unwrap();
    assert_eq!(written.nrows(), 4);
    assert!(written.has_column("pctl_rank"));
}

#[test]
fn test_compare_statistics_failure_keeps_table() {
    let output = run_pimms(&[
        "compare",
        "--control",
        "tests_data/control.csv",
        "--test",
        "tests_data/test.csv",
        "--rscript",
        "tests_data/no_such_script.R",
    ]);
    assert!(output.status.success(), "{:?}", output);
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 5);
    assert!(!lines[0].contains("deseq_"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("statistics run failed"));
}

#[test]
fn test_compare_missing_key_column() {
    let output = run_pimms(&[
        "compare",
        "--control",
        "tests_data/control.csv",
        "--test",
        "tests_data/scored.gff",
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_gff_density_counts() {
    let output = run_pimms(&["gff", "tests_data/inserts.gff"]);
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "position\tvalue\n200\t3\n350\t1\n3000\t1\n"
    );
    assert!(String::from_utf8_lossy(&output.stderr).contains("score column is empty"));
}

#[test]
fn test_gff_density_region() {
    let output = run_pimms(&["gff", "tests_data/scored.gff", "--region", "300", "5000"]);
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "position\tvalue\n350\t1\n3000\t12\n"
    );
    assert!(output.stderr.is_empty());
}

#[test]
fn test_gff_histogram() {
    let output = run_pimms(&["gff", "tests_data/scored.gff", "--bin-size", "5"]);
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "start\tend\tcount\n0\t5\t2\n5\t10\t0\n10\t15\t1\n"
    );
}

#[test]
fn test_gff_histogram_bad_bin_size() {
    let output = run_pimms(&["gff", "tests_data/scored.gff", "--bin-size", "0"]);
    assert!(!output.status.success());
}

#[test]
fn test_gff_histogram_tiny_bin_size() {
    let output = run_pimms(&["gff", "tests_data/scored.gff", "--bin-size", "1e-9"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error:"), "{}", stderr);
    assert!(stderr.contains("histogram bins"), "{}", stderr);
}

#[test]
fn test_gff_circos() {
    let output = run_pimms(&["gff", "tests_data/scored.gff", "--circos"]);
    assert!(output.status.success(), "{:?}", output);
    let lines = stdout_lines(&output);
    assert_eq!(lines[0], "block_id\tstart\tend\tvalue");
    assert_eq!(lines[1], "NC_000913\t199\t200\t3");
    assert_eq!(lines.len(), 4);
}

#[test]
fn test_gff_malformed() {
    let output = run_pimms(&["gff", "tests_data/malformed.gff"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Error:"));
}

#[test]
fn test_venn_both() {
    let output = run_pimms(&[
        "venn",
        "--control",
        "tests_data/control.csv",
        "--test",
        "tests_data/test.csv",
        "--threshold",
        "0.5",
        "--set",
        "AB",
    ]);
    assert!(output.status.success(), "{:?}", output);
    let lines = stdout_lines(&output);
    assert_eq!(
        lines,
        vec![
            "locus_tag\tgene\tBlood_Output_NIM_score_test\tMedia_Input_NIM_score_control\tset",
            "b0001\tthrL\t0.5\t0\tAB",
            "b0002\tthrA\t0.5\t0.25\tAB",
        ]
    );
}

#[test]
fn test_venn_all_rows() {
    let output = run_pimms(&[
        "venn",
        "--control",
        "tests_data/control.csv",
        "--test",
        "tests_data/test.csv",
        "--threshold",
        "0.5",
    ]);
    assert!(output.status.success(), "{:?}", output);
    let sets: Vec<String> = stdout_lines(&output)[1..]
        .iter()
        .map(|line| line.rsplit('\t').next().unwrap().to_string())
        .collect();
    assert_eq!(sets, vec!["AB", "AB", "aB", "Ab"]);
}

#[test]
fn test_venn_bad_set_label() {
    let output = run_pimms(&[
        "venn",
        "--control",
        "tests_data/control.csv",
        "--test",
        "tests_data/test.csv",
        "--threshold",
        "0.5",
        "--set",
        "ab",
    ]);
    assert!(!output.status.success());
}
