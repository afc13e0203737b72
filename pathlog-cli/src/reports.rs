use anyhow::Result;
use colored::Colorize;
use std::io::Write;

use pathlog_core::{AgentSummary, BatchReport, FolderOutcome};

pub fn generate_console_report<W: Write>(w: &mut W, report: &BatchReport) -> Result<()> {
    writeln!(w)?;
    writeln!(w, "{}", "📊 Batch Results Summary".bright_cyan().bold())?;
    writeln!(w, "{}", "========================".cyan())?;

    writeln!(w, "Folders graphed: {}", report.graphed.len())?;
    writeln!(
        w,
        "Images written: {}",
        report.images_written().to_string().green()
    )?;
    writeln!(w, "Folders summarized: {}", report.summarized.len())?;
    writeln!(
        w,
        "Summaries written: {}",
        report.summaries_written().to_string().green()
    )?;
    let elapsed = report.finished_at - report.started_at;
    writeln!(w, "Total time: {}ms", elapsed.num_milliseconds())?;
    writeln!(w)?;

    write_stage_section(w, "🖼  Graphed", &report.graphed)?;
    write_stage_section(w, "🧮 Summarized", &report.summarized)?;

    if report.graphed.is_empty() && report.summarized.is_empty() {
        writeln!(w, "{}", "No staged agent folders found.".yellow())?;
    }
    Ok(())
}

fn write_stage_section<W: Write>(w: &mut W, title: &str, outcomes: &[FolderOutcome]) -> Result<()> {
    if outcomes.is_empty() {
        return Ok(());
    }
    writeln!(w, "{}", title.bright_yellow().bold())?;
    for outcome in outcomes {
        writeln!(
            w,
            "✅ {} → {} ({} files)",
            outcome.folder.bold(),
            outcome.stage.dir_name(),
            outcome.outputs.len()
        )?;
        for output in &outcome.outputs {
            writeln!(w, "     • {}", output.display())?;
        }
    }
    writeln!(w)?;
    Ok(())
}

pub fn generate_json_report<W: Write>(w: &mut W, report: &BatchReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *w, report)?;
    writeln!(w)?;
    Ok(())
}

pub fn print_summary<W: Write>(w: &mut W, summary: &AgentSummary) -> Result<()> {
    for row in summary.rows() {
        writeln!(w, "  {:20} {}", row.label.bold(), row.value)?;
    }
    Ok(())
}
