use crate::errors::Result;
use crate::scanner::ScanReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Defines the possible output formats for the scan report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// A human-readable progress log and report.
    #[default]
    Text,
    /// JSON format, suitable for machine processing.
    Json,
    /// Comma-Separated Values format, one row per matching line.
    Csv,
}

/// Writes status lines and the scan report in the selected format.
///
/// In `Text` mode every status line goes to the writer. The machine formats
/// keep the writer for the structured report only and route status lines to
/// the log.
pub struct OutputFormatter<W: Write> {
    writer: W,
    format: OutputFormat,
    tool_name: String,
    tool_version: String,
}

impl<W: Write> OutputFormatter<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            tool_name: env!("CARGO_PKG_NAME").to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Emits one human-readable progress line.
    pub fn status(&mut self, line: impl AsRef<str>) -> Result<()> {
        let line = line.as_ref();
        match self.format {
            OutputFormat::Text => writeln!(self.writer, "{line}")?,
            OutputFormat::Json | OutputFormat::Csv => {
                if !line.is_empty() {
                    info!("{line}");
                }
            }
        }
        Ok(())
    }

    /// Writes the scan report.
    pub fn write_report(&mut self, report: &ScanReport, bad_flag: &str) -> Result<()> {
        match self.format {
            OutputFormat::Text => self.write_text(report, bad_flag),
            OutputFormat::Json => self.write_json(report, bad_flag),
            OutputFormat::Csv => self.write_csv(report),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_text(&mut self, report: &ScanReport, bad_flag: &str) -> Result<()> {
        if report.is_empty() {
            writeln!(self.writer, "No files found containing '{bad_flag}'.")?;
            return Ok(());
        }

        writeln!(
            self.writer,
            "Found {} file(s) with '{}':",
            report.files.len(),
            bad_flag
        )?;
        for file in &report.files {
            let rel = display_path(report.relative(&file.path));
            for line in &file.lines {
                writeln!(
                    self.writer,
                    "  {}:{}: {}",
                    rel,
                    line.line_number,
                    line.line_content.trim()
                )?;
            }
        }
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "Total: {} occurrence(s) in {} file(s)",
            report.total_occurrences(),
            report.files.len()
        )?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_json(&mut self, report: &ScanReport, bad_flag: &str) -> Result<()> {
        #[derive(Serialize)]
        struct JsonOutput<'a> {
            tool: ToolInfo<'a>,
            scan_time: DateTime<Utc>,
            root: String,
            flag: &'a str,
            files_scanned: usize,
            files_skipped_binary: usize,
            files_unreadable: usize,
            total_occurrences: usize,
            files: Vec<JsonFile<'a>>,
        }

        #[derive(Serialize)]
        struct ToolInfo<'a> {
            name: &'a str,
            version: &'a str,
        }

        #[derive(Serialize)]
        struct JsonFile<'a> {
            file: String,
            occurrences: usize,
            lines: &'a [crate::scanner::LineMatch],
        }

        let output = JsonOutput {
            tool: ToolInfo {
                name: &self.tool_name,
                version: &self.tool_version,
            },
            scan_time: Utc::now(),
            root: report.root.display().to_string(),
            flag: bad_flag,
            files_scanned: report.files_scanned,
            files_skipped_binary: report.files_skipped_binary,
            files_unreadable: report.files_unreadable,
            total_occurrences: report.total_occurrences(),
            files: report
                .files
                .iter()
                .map(|f| JsonFile {
                    file: display_path(report.relative(&f.path)),
                    occurrences: f.occurrences(),
                    lines: &f.lines,
                })
                .collect(),
        };

        serde_json::to_writer_pretty(&mut self.writer, &output)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_csv(&mut self, report: &ScanReport) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(&mut self.writer);

        wtr.write_record(["File", "Line", "Occurrences", "Content"])?;
        for file in &report.files {
            let rel = display_path(report.relative(&file.path));
            for line in &file.lines {
                let line_number = line.line_number.to_string();
                let occurrences = line.occurrences.to_string();
                wtr.write_record([
                    rel.as_str(),
                    line_number.as_str(),
                    occurrences.as_str(),
                    line.line_content.trim(),
                ])?;
            }
        }

        wtr.flush()?;
        Ok(())
    }
}

/// Forward slashes on every platform, so reports are comparable.
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
