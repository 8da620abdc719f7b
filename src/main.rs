use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bench_graphs::catalog::{chart_from_table, ChartKind, ChartRequest, TableKind, ThroughputType};
use bench_graphs::chart::ImageFormat;
use bench_graphs::sink::{output_path, write_artifact};
use bench_graphs::table::Table;
use bench_graphs::{catalog, summarize, utils, Error, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render one chart next to the input table
    Chart {
        #[arg(value_enum)]
        kind: ChartKind,
        /// Benchmark results (CSV with a header row)
        csv: PathBuf,
        /// Throughput column for the typed throughput charts
        #[arg(long, value_enum, default_value_t)]
        throughput_type: ThroughputType,
        #[arg(long, value_enum, default_value_t)]
        format: ImageFormat,
    },
    /// Print a booktabs table
    Table {
        #[arg(value_enum)]
        kind: TableKind,
        csv: PathBuf,
        /// Also write the table to the graphs directory
        #[arg(short, long)]
        output: bool,
    },
    /// Print the aggregated statistics of a table
    Summary {
        csv: PathBuf,
        /// Sweep parameter column
        #[arg(long, default_value = "workers")]
        sweep: String,
        /// Metric column, repeatable
        #[arg(long, required = true)]
        metric: Vec<String>,
    },
    /// Render every chart the table has the columns for
    All {
        csv: PathBuf,
        #[arg(long, value_enum, default_value_t)]
        format: ImageFormat,
    },
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Chart {
            kind,
            csv,
            throughput_type,
            format,
        } => {
            let request = ChartRequest::new(kind)
                .throughput(throughput_type)
                .format(format);
            let path = catalog::chart_file(&csv, &request)?;
            println!("Wrote {}", path.display());
        }
        Commands::Table { kind, csv, output } => {
            let tex = catalog::table_file(&csv, kind)?;
            print!("{tex}");
            if output {
                let path = output_path(&csv, kind.descriptor(), "tex");
                write_artifact(&path, tex.as_bytes())?;
                println!("Wrote {}", path.display());
            }
        }
        Commands::Summary { csv, sweep, metric } => {
            let metrics: Vec<&str> = metric.iter().map(String::as_str).collect();
            let grouped = summarize(&csv, &sweep, &metrics)?;
            utils::print_grouped_with_title(&csv.display().to_string(), &grouped);
        }
        Commands::All { csv, format } => render_all(&csv, format)?,
    }
    Ok(())
}

fn render_all(csv: &Path, format: ImageFormat) -> Result<()> {
    let table = Table::from_path(csv)?;

    let requests: Vec<ChartRequest> = ChartKind::ALL
        .iter()
        .flat_map(|kind| ChartRequest::expand(*kind, format))
        .filter(|request| {
            let applies = request.applies_to(&table);
            if !applies {
                info!(chart = %request.descriptor(), "missing columns, skipped");
            }
            applies
        })
        .collect();

    if requests.is_empty() {
        return Err(Error::Config(format!(
            "no chart applies to the columns of {}",
            csv.display()
        )));
    }

    let pb = ProgressBar::new(requests.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{bar:40} {pos}/{len} Charts | {msg}") {
        pb.set_style(style.progress_chars("=>-"));
    }

    let mut failed = 0;
    for request in &requests {
        pb.set_message(request.descriptor());
        match chart_from_table(&table, csv, request) {
            Ok(path) => pb.println(format!("Wrote {}", path.display())),
            Err(err) => {
                warn!(chart = %request.descriptor(), error = %err, "chart failed");
                failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if failed > 0 {
        return Err(Error::Render(format!(
            "{failed} of {} charts failed",
            requests.len()
        )));
    }
    Ok(())
}
