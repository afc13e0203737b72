mod reports;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};

use pathlog_core::{
    AgentSummary, BatchProcessor, LogLayout, health_curve, read_log, render_health_plot,
    summarize, write_summary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Colored human-readable summary
    Console,
    /// Machine-readable JSON
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "pathlog", version)]
#[command(about = "Graph, summarize and stage PathOS agent simulation logs")]
struct Args {
    /// Root directory holding agent logs and derived outputs
    #[arg(long, global = true)]
    log_root: Option<PathBuf>,

    /// JSON file overriding directory and file naming
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Plot health over time for a single agent log
    Graph {
        /// Log to read (defaults to <root>/agent-0.csv)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Image to write (defaults to <root>/graphs/agent-0.png)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Compute the summary of a single agent log
    Summarize {
        /// Log to read (defaults to <root>/agent-0.csv)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Summary CSV to write (defaults to <root>/summaries/agent-0-summary.csv)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also print the summary rows
        #[arg(long)]
        print: bool,
    },
    /// Graph and summarize every staged agent folder
    Batch {
        /// Report format
        #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
        report: ReportFormat,
        /// Optional path to write the report instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let layout = resolve_layout(&args)?;
    match &args.command {
        Command::Graph { input, output } => {
            announce_banner();
            run_graph(&layout, input.as_deref(), output.as_deref())
        }
        Command::Summarize {
            input,
            output,
            print,
        } => {
            announce_banner();
            let summary = run_summarize(&layout, input.as_deref(), output.as_deref())?;
            if *print {
                reports::print_summary(&mut stdout().lock(), &summary)?;
            }
            Ok(())
        }
        Command::Batch { report, output } => run_batch(&layout, *report, output.as_deref()),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn announce_banner() {
    println!("{}", "📈 PathOS Log Processor".bright_cyan().bold());
    println!("{}", "========================".cyan());
}

fn resolve_layout(args: &Args) -> Result<LogLayout> {
    let layout = match &args.config {
        Some(path) => LogLayout::load(path)
            .with_context(|| format!("failed to load layout from {}", path.display()))?,
        None => LogLayout::default(),
    };
    Ok(match &args.log_root {
        Some(root) => layout.with_root(root),
        None => layout,
    })
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

fn run_graph(layout: &LogLayout, input: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let input = input.map_or_else(|| layout.single_log_path(), Path::to_path_buf);
    let output = output.map_or_else(|| layout.single_graph_path(), Path::to_path_buf);

    let records =
        read_log(&input).with_context(|| format!("failed to read {}", input.display()))?;
    let curve = health_curve(&records);
    ensure_parent(&output)?;
    render_health_plot(&curve, &output, layout.plot)
        .with_context(|| format!("failed to graph {}", input.display()))?;
    info!("wrote {} health points", curve.len());
    println!("✅ Graph written to {}", output.display().to_string().green());
    Ok(())
}

fn run_summarize(
    layout: &LogLayout,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<AgentSummary> {
    let input = input.map_or_else(|| layout.single_log_path(), Path::to_path_buf);
    let output = output.map_or_else(|| layout.single_summary_path(), Path::to_path_buf);

    let records =
        read_log(&input).with_context(|| format!("failed to read {}", input.display()))?;
    let summary = summarize(&records);
    ensure_parent(&output)?;
    write_summary(&output, &summary)
        .with_context(|| format!("failed to summarize {}", input.display()))?;
    println!("✅ Summary written to {}", output.display().to_string().green());
    Ok(summary)
}

fn run_batch(layout: &LogLayout, format: ReportFormat, output: Option<&Path>) -> Result<()> {
    if format == ReportFormat::Console && output.is_none() {
        announce_banner();
    }
    let report = BatchProcessor::new(layout)
        .run()
        .with_context(|| format!("batch run under {} aborted", layout.root.display()))?;

    let mut writer = report_writer(output)?;
    match format {
        ReportFormat::Json => reports::generate_json_report(&mut writer, &report)?,
        ReportFormat::Console => reports::generate_console_report(&mut writer, &report)?,
    }
    writer.flush()?;
    Ok(())
}

/// Buffered destination for a batch report: the named file, or stdout.
fn report_writer(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(stdout())),
    })
}
