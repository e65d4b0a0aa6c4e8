// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Formatting of validation reports

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::error::ModlintResult;
use crate::report::{FileValidationReport, ValidationReport};
use crate::result::ValidationIssue;

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Json,
}

/// Trait for formatting validation reports
pub trait ReportFormatter {
    fn format(&self, report: &ValidationReport) -> ModlintResult<String>;
    fn supported_formats(&self) -> &[ReportFormat];
}

/// Human readable formatter for terminals
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormatter;

impl TextFormatter {
    fn write_file(out: &mut String, file: &FileValidationReport) -> std::fmt::Result {
        writeln!(
            out,
            "  {} [{:?}] {} error(s), {} warning(s), {} info(s)",
            file.file_path, file.status, file.error_count, file.warning_count, file.info_count
        )?;
        for issue in file.errors.iter().chain(&file.warnings).chain(&file.infos) {
            Self::write_issue(out, issue)?;
        }
        Ok(())
    }

    fn write_issue(out: &mut String, issue: &ValidationIssue) -> std::fmt::Result {
        let location = issue.location.as_deref().unwrap_or("-");
        write!(out, "    {:?} {} at {location}", issue.severity, issue.code)?;
        if let Some(line) = issue.line {
            write!(out, " (line {line})")?;
        }
        writeln!(out, ": {}", issue.message)?;
        if let Some(suggestion) = &issue.suggestion {
            writeln!(out, "      suggestion: {} ({:.0}% confidence)", suggestion.description, suggestion.confidence * 100.0)?;
        }
        Ok(())
    }
}

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &ValidationReport) -> ModlintResult<String> {
        let mut out = String::new();
        let summary = &report.summary;

        writeln!(out, "Validation report {}", report.report_id)?;
        writeln!(out, "Generated: {}", report.generated_at.to_rfc3339())?;
        writeln!(out, "Status: {:?}{}", report.overall_status, if report.is_complete { "" } else { " (incomplete)" })?;
        writeln!(out)?;

        writeln!(out, "Summary")?;
        writeln!(
            out,
            "  Files: {} total, {} valid, {} with warnings, {} failed",
            summary.total_files, summary.valid_files, summary.files_with_warnings, summary.failed_files
        )?;
        writeln!(out, "  Issues: {} errors, {} warnings, {} infos", summary.total_errors, summary.total_warnings, summary.total_infos)?;
        writeln!(out, "  Broken references: {}", summary.broken_references)?;
        writeln!(out, "  Cycles: {}", summary.cycles)?;
        writeln!(out, "  Validation time: {} ms", summary.total_validation_time_ms)?;

        if let Some(order) = &report.load_order {
            writeln!(out)?;
            writeln!(out, "Load order")?;
            for phase in &order.phases {
                writeln!(out, "  {}: {}", phase.description, phase.documents.join(", "))?;
            }
            for cycle in &order.cycles {
                writeln!(out, "  cycle: {}", cycle.describe())?;
            }
            if !order.unplaced.is_empty() {
                writeln!(out, "  unplaced: {}", order.unplaced.join(", "))?;
            }
        }

        if !report.file_reports.is_empty() {
            writeln!(out)?;
            writeln!(out, "Files")?;
            for file in &report.file_reports {
                Self::write_file(&mut out, file)?;
            }
        }

        if !report.recommendations.is_empty() {
            writeln!(out)?;
            writeln!(out, "Recommendations")?;
            for rec in &report.recommendations {
                writeln!(out, "  [{:?}] {} ({:?}, confidence {:.2})", rec.priority, rec.title, rec.category, rec.confidence)?;
                writeln!(out, "    {}", rec.description)?;
                if !rec.affected_files.is_empty() {
                    writeln!(out, "    affected: {}", rec.affected_files.join(", "))?;
                }
            }
        }
        Ok(out)
    }

    fn supported_formats(&self) -> &[ReportFormat] {
        &[ReportFormat::Text]
    }
}

/// Pretty printed JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &ValidationReport) -> ModlintResult<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }

    fn supported_formats(&self) -> &[ReportFormat] {
        &[ReportFormat::Json]
    }
}

/// Render a report in the requested format
pub fn format_report(report: &ValidationReport, format: ReportFormat) -> ModlintResult<String> {
    match format {
        ReportFormat::Text => TextFormatter.format(report),
        ReportFormat::Json => JsonFormatter.format(report),
    }
}
