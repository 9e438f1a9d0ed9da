//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use keepdays_domain::{ArchiveKey, DatePartPath, Tier};
use keepdays_janitor::{ReconcileReport, TaggedArchive};
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// One archive as shown by `classify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveRow {
    /// Object key
    pub key: String,
    /// Archive group
    pub archive_group: String,
    /// Computed tier
    pub tier: Tier,
    /// Keep-days for the tier, if the group's table covers it
    pub keep_days: Option<u32>,
    /// Keep-days tag currently on the object
    pub current_tag: Option<u32>,
}

impl ArchiveRow {
    /// Whether reconciliation would write a tag for this archive.
    pub fn needs_update(&self) -> bool {
        match (self.keep_days, self.current_tag) {
            (Some(expected), Some(current)) => current < expected,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Output format in use.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format parsed archive keys with their date parts.
    pub fn format_parsed(&self, archives: &[ArchiveKey]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<serde_json::Value> = archives
                    .iter()
                    .map(|archive| {
                        let parts = DatePartPath::new(&archive.timestamp());
                        let parts: serde_json::Map<String, serde_json::Value> = parts
                            .iter()
                            .map(|(part, value)| (part.as_str().to_string(), value.into()))
                            .collect();
                        serde_json::json!({
                            "key": archive.as_str(),
                            "archive_group": archive.archive_group(),
                            "timestamp": archive.timestamp(),
                            "date_parts": parts,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Quiet => Ok(archives
                .iter()
                .map(ArchiveKey::archive_group)
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Key", "Group", "Timestamp", "Date parts"]);
                for archive in archives {
                    builder.push_record([
                        archive.as_str().to_string(),
                        archive.archive_group().to_string(),
                        archive.timestamp().to_string(),
                        DatePartPath::new(&archive.timestamp()).to_string(),
                    ]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format classified archives.
    pub fn format_archives(&self, rows: &[ArchiveRow]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(rows)?),
            OutputFormat::Quiet => Ok(rows
                .iter()
                .map(|row| row.key.as_str())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if rows.is_empty() {
                    return Ok(self.colorize("No archives found.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record(["Key", "Group", "Tier", "Keep days", "Current tag"]);
                for row in rows {
                    let keep_days = row
                        .keep_days
                        .map_or_else(|| self.colorize("n/a", "red"), |d| d.to_string());
                    let current = match row.current_tag {
                        Some(days) if row.needs_update() => {
                            self.colorize(&days.to_string(), "yellow")
                        }
                        Some(days) => days.to_string(),
                        None if row.needs_update() => self.colorize("-", "yellow"),
                        None => "-".to_string(),
                    };
                    builder.push_record([
                        row.key.clone(),
                        row.archive_group.clone(),
                        row.tier.to_string(),
                        keep_days,
                        current,
                    ]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format the result of tagging uploads.
    pub fn format_tagged(&self, tagged: &[TaggedArchive]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(tagged)?),
            OutputFormat::Quiet => Ok(tagged
                .iter()
                .map(|t| t.key.as_str())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Key", "Group", "Tier", "Keep days", "Written"]);
                for t in tagged {
                    let written = if t.written {
                        self.colorize("yes", "green")
                    } else {
                        self.colorize("dry run", "yellow")
                    };
                    builder.push_record([
                        t.key.clone(),
                        t.archive_group.clone(),
                        t.tier.to_string(),
                        t.keep_days.to_string(),
                        written,
                    ]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format a reconciliation report.
    pub fn format_report(&self, report: &ReconcileReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Quiet => Ok(report.total_corrected().to_string()),
            OutputFormat::Table => {
                let mut lines = Vec::new();
                if !report.groups.is_empty() {
                    let mut builder = Builder::default();
                    builder.push_record(["Group", "Checked", "Corrected", "Skipped"]);
                    for group in &report.groups {
                        builder.push_record([
                            group.archive_group.clone(),
                            group.checked.to_string(),
                            group.corrected.to_string(),
                            group.skipped.len().to_string(),
                        ]);
                    }
                    lines.push(self.render(builder));
                }
                for key in &report.malformed {
                    lines.push(self.warning(&format!("Not an archive key: {}", key)));
                }
                lines.push(self.success(&format!(
                    "Fixed {} tag(s) across {} archive(s) in {}",
                    report.total_corrected(),
                    report.total_checked(),
                    report.bucket
                )));
                Ok(lines.join("\n"))
            }
        }
    }

    fn render(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}
