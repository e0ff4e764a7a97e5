use std::path::PathBuf;

use clap::{Parser, Subcommand};
use env_logger::Env;
use pimms::{
    commands::{pimms_compare, pimms_gff, pimms_venn},
    comparison::{MetricSelection, VennSet},
    error::PimmsError,
    Position,
};

const INFO: &str = "\
pimms: merge and compare control and test insertion mutagenesis screens
usage: pimms [--help] <subcommand>

Subcommands:

  compare: merge control and test tables and compute comparison metrics.
  gff:     insertion density, histograms and circos blocks from a GFF file.
  venn:    assign features to NIM score threshold Venn sets.

";

#[derive(Parser)]
#[clap(name = "pimms")]
#[clap(about = INFO)]
struct Cli {
    /// increase logging verbosity (-d for info, -dd for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Compare {
        /// the control condition measurement table (CSV, or TSV with a .tsv extension)
        #[arg(long, required = true)]
        control: PathBuf,

        /// the test condition measurement table
        #[arg(long, required = true)]
        test: PathBuf,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// only output the identifier, NRM score, NIM score and comparison columns
        #[arg(long)]
        simple: bool,

        /// which comparison columns to output: 'all', 'none', or a column name
        #[arg(long, default_value = "all")]
        metric: MetricSelection,

        /// also write the comparison table in its JSON transport form
        #[arg(long)]
        json: Option<PathBuf>,

        /// a differential statistics script to run on replicate pool columns
        #[arg(long)]
        rscript: Option<PathBuf>,

        /// do not apply the statistics script's standard filtering
        #[arg(long)]
        no_filter: bool,
    },
    Gff {
        /// an insertion site GFF file
        #[arg(required = true)]
        gff: PathBuf,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// output a histogram of insertion density with this bin width
        #[arg(long)]
        bin_size: Option<f64>,

        /// output circos ring blocks instead of insertion density
        #[arg(long, conflicts_with = "bin_size")]
        circos: bool,

        /// only use insertions within START END
        #[arg(long, num_args = 2, value_names = ["START", "END"])]
        region: Option<Vec<Position>>,
    },
    Venn {
        /// the control condition measurement table
        #[arg(long, required = true)]
        control: PathBuf,

        /// the test condition measurement table
        #[arg(long, required = true)]
        test: PathBuf,

        /// the largest NIM score of a feature in a set
        #[arg(long, required = true)]
        threshold: f64,

        /// the insert position percentile window LO HI
        #[arg(long, num_args = 2, value_names = ["LO", "HI"], default_values_t = [0.0, 1.0])]
        window: Vec<f64>,

        /// only output one region: AB (both), Ab (control only) or aB (test only)
        #[arg(long)]
        set: Option<VennSet>,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn run() -> Result<(), PimmsError> {
    let cli = Cli::parse();

    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match &cli.command {
        Some(Commands::Compare {
            control,
            test,
            output,
            simple,
            metric,
            json,
            rscript,
            no_filter,
        }) => pimms_compare(
            control,
            test,
            output.as_ref(),
            *simple,
            metric,
            json.as_ref(),
            rscript.as_ref(),
            !*no_filter,
        ),
        Some(Commands::Gff {
            gff,
            output,
            bin_size,
            circos,
            region,
        }) => {
            let region = region.as_ref().map(|bounds| (bounds[0], bounds[1]));
            pimms_gff(gff, output.as_ref(), *bin_size, *circos, region)
        }
        Some(Commands::Venn {
            control,
            test,
            threshold,
            window,
            set,
            output,
        }) => pimms_venn(
            control,
            test,
            *threshold,
            (window[0], window[1]),
            *set,
            output.as_ref(),
        ),
        None => {
            println!("{}\n", INFO);
            std::process::exit(1);
        }
    };
    let output = result?;
    if !output.report().is_empty() {
        eprint!("{}", output.report());
    }
    Ok(())
}

fn main() {
    match run() {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
