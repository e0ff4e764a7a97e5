use std::io::Write;
use std::path::PathBuf;

use crate::{
    circos,
    comparison::{ComparisonConfig, ComparisonTable, MetricSelection, VennSet},
    data::{operations::histogram, DatumType},
    error::PimmsError,
    gff::GffTable,
    io::{OutputFile, TABLE_TSV},
    reporting::{CommandOutput, Report},
    stats::RscriptStatistics,
    table::Table,
    traits::{TsvSerialize, TsvWriter},
    Position,
};

fn output_stream(output: Option<&PathBuf>, header: Option<String>) -> OutputFile {
    output.map_or(OutputFile::new_stdout(header.clone()), |file| {
        OutputFile::new(file, header)
    })
}

/// Merge the control and test tables and compute the comparison columns,
/// reporting how many features the inner join dropped.
fn load_comparison(
    control: &PathBuf,
    test: &PathBuf,
    report: &mut Report,
) -> Result<ComparisonTable, PimmsError> {
    let control_table = Table::from_path(control)?;
    let test_table = Table::from_path(test)?;
    let (comparison, merge_report) = ComparisonTable::from_tables_with_report(
        &control_table,
        &test_table,
        ComparisonConfig::default(),
    )?;

    for (name, other, dropped) in [
        ("control", "test", merge_report.left_unmatched),
        ("test", "control", merge_report.right_unmatched),
    ] {
        if dropped > 0 {
            report.add_issue(format!(
                "{} {} features had no matching {} feature and were dropped",
                dropped, name, other
            ));
        }
    }
    Ok(comparison.with_paths(control, test))
}

/// Merge control and test measurement tables, add comparison metrics, and
/// write the rounded table as TSV.
#[allow(clippy::too_many_arguments)]
pub fn pimms_compare(
    control: &PathBuf,
    test: &PathBuf,
    output: Option<&PathBuf>,
    simple: bool,
    selection: &MetricSelection,
    json: Option<&PathBuf>,
    rscript: Option<&PathBuf>,
    apply_filter: bool,
) -> Result<CommandOutput<()>, PimmsError> {
    let mut report = Report::new();
    let mut comparison = load_comparison(control, test, &mut report)?;
    comparison.derive_default_metrics()?;

    if let Some(script) = rscript {
        let engine = RscriptStatistics::new(script);
        let outcome = comparison.run_external_statistics(&engine, apply_filter);
        if outcome.mutantpools == 0 {
            report.add_issue("no replicate pool columns were found; statistics were not run".to_string());
        } else if !outcome.run {
            report.add_issue(format!(
                "{} replicate pools found, but both control and test pools are needed; statistics were not run",
                outcome.mutantpools
            ));
        } else if !outcome.success {
            report.add_issue("the differential statistics run failed; see the log for details".to_string());
        }
    }

    let rows = comparison.get_projection(simple, selection)?;
    rows.to_tsv(output)?;

    if let Some(json_path) = json {
        let mut writer = OutputFile::new(json_path, None).writer()?;
        writer.write_all(comparison.to_json()?.as_bytes())?;
        writer.flush()?;
    }
    Ok(CommandOutput::new((), report))
}

/// Write the insertion density of a feature file: per-position values,
/// their histogram, or circos ring blocks.
pub fn pimms_gff(
    gff_path: &PathBuf,
    output: Option<&PathBuf>,
    bin_size: Option<f64>,
    circos_ring: bool,
    region: Option<(Position, Position)>,
) -> Result<CommandOutput<()>, PimmsError> {
    let gff = GffTable::from_path(gff_path)?;
    let mut report = Report::new();
    if gff.empty_score() {
        report.add_issue(
            "the score column is empty; insertion density is the number of inserts at each position"
                .to_string(),
        );
    }

    if circos_ring {
        let mut ring = circos::from_gff(&gff);
        if let Some((start, end)) = region {
            ring = circos::limit_genome(&ring, start as i64, end as i64);
        }
        let mut writer = output_stream(output, Some("block_id\tstart\tend\tvalue\n".to_string()))
            .writer()?;
        for record in &ring {
            writeln!(writer, "{}", record.to_tsv(&TABLE_TSV))?;
        }
        writer.flush()?;
        return Ok(CommandOutput::new((), report));
    }

    let density = match region {
        Some((start, end)) => gff.inserts_in_range(start, end),
        None => gff.insertion_density(),
    };

    match bin_size {
        Some(bin_size) => {
            if bin_size <= 0.0 {
                return Err(PimmsError::ArgumentError(clap::Error::raw(
                    clap::error::ErrorKind::InvalidValue,
                    "--bin-size must be positive\n",
                )));
            }
            let values: Vec<f64> = density.iter().map(|count| count.value).collect();
            let bins = histogram(&values, bin_size)?;
            let mut writer =
                output_stream(output, Some("start\tend\tcount\n".to_string())).writer()?;
            for bin in &bins {
                writeln!(writer, "{}\t{}\t{}", bin.start, bin.end, bin.count)?;
            }
            writer.flush()?;
        }
        None => {
            let mut writer =
                output_stream(output, Some("position\tvalue\n".to_string())).writer()?;
            for count in &density {
                writeln!(writer, "{}\t{}", count.position, count.value)?;
            }
            writer.flush()?;
        }
    }
    Ok(CommandOutput::new((), report))
}

/// Assign each merged feature to a Venn region of NIM score threshold
/// sets, and write the rows of one region (or all rows).
pub fn pimms_venn(
    control: &PathBuf,
    test: &PathBuf,
    threshold: f64,
    window: (f64, f64),
    set: Option<VennSet>,
    output: Option<&PathBuf>,
) -> Result<CommandOutput<()>, PimmsError> {
    let mut report = Report::new();
    let comparison = load_comparison(control, test, &mut report)?;
    let sets = comparison.venn_sets(threshold, window)?;
    let (nim_test, nim_control) = comparison.get_nim_score_columns()?;

    let rows = comparison.get_rows();
    let columns = ["locus_tag", "gene", nim_test.as_str(), nim_control.as_str()];
    let selected = rows.select(&columns)?;

    let keep: Vec<usize> = match set {
        Some(set) => sets.rows(set),
        None => (0..comparison.len()).collect(),
    };
    let mut table = selected.take_rows(&keep);
    let labels = keep
        .iter()
        .map(|&i| match sets.membership[i] {
            Some(set) => set.to_string().into(),
            None => DatumType::NoValue,
        })
        .collect();
    table.push_column("set", labels)?;
    table.to_tsv(output)?;

    for region in [VennSet::Both, VennSet::ControlOnly, VennSet::TestOnly] {
        log::info!("{}: {} features", region, sets.count(region));
    }
    if sets.membership.iter().all(Option::is_none) {
        report.add_issue("no features passed the threshold in either condition".to_string());
    }
    Ok(CommandOutput::new((), report))
}
