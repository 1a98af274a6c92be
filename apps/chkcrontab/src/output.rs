//! Report rendering.
//!
//! Supports `human` (default) and `json` outputs. Diagnostics go to stdout;
//! the closing summary line goes to stderr.

use crate::lint::{FileOutcome, RunReport};
use crate::models::{Code, Diagnostic, FileReport, Severity, Summary};
use owo_colors::OwoColorize;
use serde::Deserialize;
use serde_json::{json, Value as JsonVal};
use std::io::{self, IsTerminal, Write};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Colour only for a terminal, and never when `NO_COLOR` is set.
pub fn use_colors(format: OutputFormat) -> bool {
    format == OutputFormat::Human
        && std::env::var_os("NO_COLOR").is_none()
        && io::stdout().is_terminal()
}

fn severity_label(sev: Severity, color: bool) -> String {
    match (sev, color) {
        (Severity::Error, true) => sev.as_str().red().bold().to_string(),
        (Severity::Warning, true) => sev.as_str().yellow().bold().to_string(),
        (_, false) => sev.as_str().to_string(),
    }
}

fn shown<'a>(
    report: &'a FileReport,
    show_suppressed: bool,
) -> impl Iterator<Item = &'a Diagnostic> + 'a {
    report
        .diagnostics
        .iter()
        .filter(move |d| show_suppressed || !d.suppressed)
}

/// Render the human report: one line per diagnostic, files in input order.
pub fn render_human(run: &RunReport, show_suppressed: bool, color: bool) -> String {
    let mut out = String::new();
    for outcome in &run.files {
        match outcome {
            FileOutcome::Checked(report) => {
                for d in shown(report, show_suppressed) {
                    let mut line = format!(
                        "{}:{}: {}: {}",
                        report.path,
                        d.line,
                        severity_label(d.severity, color),
                        d.message
                    );
                    if d.suppressed {
                        line.push_str(" (suppressed)");
                    }
                    out.push_str(&line);
                    out.push('\n');
                }
            }
            FileOutcome::Failed { path, error } => {
                out.push_str(&format!(
                    "{path}: {}: {error}\n",
                    severity_label(Severity::Error, color)
                ));
            }
        }
    }
    out
}

pub fn summary_line(summary: &Summary) -> String {
    let mut line = format!(
        "{} errors, {} warnings in {} files",
        summary.errors, summary.warnings, summary.files
    );
    if summary.suppressed > 0 {
        line.push_str(&format!(" ({} suppressed)", summary.suppressed));
    }
    line
}

/// Compose the JSON report. Pure so it can be tested.
pub fn compose_json(run: &RunReport, show_suppressed: bool) -> JsonVal {
    let files: Vec<JsonVal> = run
        .files
        .iter()
        .map(|outcome| match outcome {
            FileOutcome::Checked(report) => {
                let diagnostics: Vec<&Diagnostic> = shown(report, show_suppressed).collect();
                json!({
                    "path": report.path,
                    "variant": report.variant,
                    "lines": report.lines,
                    "variables": report.variables,
                    "cron_env": report.cron_env,
                    "diagnostics": diagnostics,
                    "summary": report.summary,
                })
            }
            FileOutcome::Failed { path, error } => json!({
                "path": path,
                "error": error,
            }),
        })
        .collect();
    json!({
        "files": files,
        "summary": run.summary,
    })
}

/// Write the report in the requested format to `out`.
pub fn write_report(
    out: &mut dyn Write,
    run: &RunReport,
    format: OutputFormat,
    show_suppressed: bool,
    color: bool,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &compose_json(run, show_suppressed))?;
            writeln!(out)
        }
        OutputFormat::Human => out.write_all(render_human(run, show_suppressed, color).as_bytes()),
    }
}

/// Print the report to stdout and the summary line to stderr.
pub fn print_report(run: &RunReport, format: OutputFormat, show_suppressed: bool) -> io::Result<()> {
    let color = use_colors(format);
    let stdout = io::stdout();
    write_report(&mut stdout.lock(), run, format, show_suppressed, color)?;
    let summary = summary_line(&run.summary);
    if color && run.summary.errors > 0 {
        eprintln!("{}", summary.bold());
    } else {
        eprintln!("{summary}");
    }
    Ok(())
}

fn stderr_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal()
}

/// Prefix for fatal messages on stderr.
pub fn error_prefix() -> String {
    if stderr_colors() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix() -> String {
    if stderr_colors() {
        "note:".cyan().bold().to_string()
    } else {
        "note:".to_string()
    }
}

/// Table of every diagnostic code, for `--list-codes`.
pub fn render_codes() -> String {
    let width = Code::ALL.iter().map(|c| c.as_str().len()).max().unwrap_or(0);
    Code::ALL
        .iter()
        .map(|c| {
            format!(
                "{:<width$}  {:<7}  {}\n",
                c.as_str(),
                c.severity().as_str(),
                c.summary()
            )
        })
        .collect()
}
