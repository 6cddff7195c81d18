//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.
//! Progress and stage markers go to stderr so stdout stays parseable.

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use ovaflow_core::{Stage, UploadSession};

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(Table::new(rows).with(Style::rounded()).to_string())
        }
        OutputFormat::Plain => Ok(data.iter().map(id_fn).collect::<Vec<_>>().join("\n")),
        structured => render_structured(structured, data),
    }
}

/// Render a single item. Table mode uses `detail_fn` for a key/value view.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Plain => Ok(id_fn(data)),
        structured => render_structured(structured, data),
    }
}

fn render_structured<T: Serialize + ?Sized>(
    format: OutputFormat,
    data: &T,
) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
        _ => serde_json::to_string_pretty(data)?,
    })
}

/// Print rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Stage markers ────────────────────────────────────────────────────

fn color_stderr() -> bool {
    io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// `✓ LibraryEnsured`, green when stderr is a terminal.
pub fn stage_line(stage: Stage, color: bool) -> String {
    if color {
        format!("{} {}", "✓".green().bold(), stage.bold())
    } else {
        format!("✓ {stage}")
    }
}

/// Announce completed stages on stderr.
pub fn print_stages(stages: &[Stage], quiet: bool) {
    if quiet {
        return;
    }
    let color = color_stderr();
    for stage in stages {
        eprintln!("{}", stage_line(*stage, color));
    }
}

/// `created` / `found` marker for an ensured object.
pub fn ensured_label(created: bool) -> &'static str {
    if created { "created" } else { "found" }
}

pub fn elapsed(start: chrono::DateTime<chrono::Utc>, end: chrono::DateTime<chrono::Utc>) -> String {
    let secs = (end - start).num_seconds().max(0).unsigned_abs();
    humantime::format_duration(Duration::from_secs(secs)).to_string()
}

// ── Upload progress ──────────────────────────────────────────────────

/// Percentage bar fed by upload-session polls. Hidden in quiet mode.
pub struct UploadProgress {
    bar: ProgressBar,
}

impl UploadProgress {
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(100)
        };
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message("uploading");
        Self { bar }
    }

    pub fn update(&self, session: &UploadSession) {
        self.bar.set_position(u64::from(session.client_progress));
        self.bar.set_message(session.state.to_string());
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
