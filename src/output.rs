use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

const BOX_WIDTH: usize = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Error,
}

impl Tone {
    fn paint(self, text: &str) -> ColoredString {
        match self {
            Tone::Info => text.blue(),
            Tone::Success => text.green(),
            Tone::Warning => text.yellow(),
            Tone::Error => text.red(),
        }
    }
}

/// Frame `text` in a `+---+` box. Width follows the longest line.
pub fn boxed(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let border = format!("+{}+", "-".repeat(width + 2));

    let mut out = String::new();
    out.push_str(&border);
    out.push('\n');
    for line in lines {
        let pad = width - line.chars().count();
        out.push_str(&format!("| {}{} |\n", line, " ".repeat(pad)));
    }
    out.push_str(&border);
    out
}

pub fn print_boxed(text: &str, tone: Tone) {
    for line in boxed(text).lines() {
        println!("{}", tone.paint(line));
    }
}

pub fn print_success(message: &str) {
    print_boxed(message, Tone::Success);
}

pub fn print_error(message: &str) {
    print_boxed(message, Tone::Error);
}

pub fn print_warning(message: &str) {
    print_boxed(message, Tone::Warning);
}

fn centered(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let left = (width - len) / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(width - len - left))
}

/// Application header with platform and local time.
pub fn header_lines(now: chrono::DateTime<chrono::Local>) -> Vec<String> {
    let inner = BOX_WIDTH - 2;
    let title = format!("ARGUS v{}", env!("CARGO_PKG_VERSION"));
    let system_info = format!("{} | {}", std::env::consts::OS, now.format("%Y-%m-%d %H:%M:%S"));
    let empty = format!("║{}║", " ".repeat(inner));

    vec![
        format!("╔{}╗", "═".repeat(inner)),
        empty.clone(),
        format!("║{}║", centered(&title, inner)),
        format!("║{}║", centered("Advanced Security Intelligence Platform", inner)),
        empty.clone(),
        format!("║{}║", centered(&system_info, inner)),
        empty,
        format!("╚{}╝", "═".repeat(inner)),
    ]
}

pub fn print_header() {
    for line in header_lines(chrono::Local::now()) {
        println!("{}", line.green());
    }
}

/// Spinner shown on stderr while a module runs. Hidden when stderr is not a terminal.
pub fn start_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub struct OutputWriter {
    file: Option<PathBuf>,
}

impl OutputWriter {
    pub fn new(file: Option<PathBuf>) -> Self {
        Self { file }
    }

    /// Pretty JSON for the terminal
    pub fn format_result(result: &Value) -> Result<String> {
        Ok(serde_json::to_string_pretty(result)?)
    }

    pub fn print_result(&self, result: &Value) -> Result<()> {
        let rule = "=".repeat(BOX_WIDTH);
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "\n{}", "RESULTS:".bold())?;
        writeln!(stdout, "{}", rule)?;
        writeln!(stdout, "{}", Self::format_result(result)?)?;
        writeln!(stdout, "{}", rule)?;
        stdout.flush()?;
        Ok(())
    }

    /// Write the record to the configured file, if any. Returns the path written.
    pub fn export(&self, result: &Value) -> Result<Option<&Path>> {
        let Some(path) = self.file.as_deref() else {
            return Ok(None);
        };

        let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, result)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(Some(path))
    }
}
