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

//! Reporting for validation runs
//!
//! [`generate_report`] turns a [`ComprehensiveResult`] into a
//! [`ValidationReport`], the serializable structure consumed by the command
//! line and any other front end. Reference findings are folded into the
//! per-file breakdown of their source document, and recommendations are
//! derived from the kinds of problems found.
//!
//! Formatters live in [`formatter`]: plain text for terminals and pretty JSON
//! for tooling.

pub mod formatter;

pub use formatter::{JsonFormatter, ReportFormat, ReportFormatter, TextFormatter, format_report};

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::DeclaredType;
use crate::graph::AnalysisComplexity;
use crate::result::{ComprehensiveResult, IssueCategory, IssueSeverity, OverallStatus, ValidationIssue, ValidationResult};
use crate::scheduler::LoadOrder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecommendationPriority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecommendationCategory {
    Performance,
    Security,
    Maintainability,
    Reliability,
    Compatibility,
}

/// Actionable advice derived from a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: RecommendationPriority,
    pub category: RecommendationCategory,
    pub affected_files: Vec<String>,
    pub can_auto_fix: bool,
    pub confidence: f32,
}

/// Corpus wide counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_files: usize,
    /// Files without errors, including those with warnings
    pub valid_files: usize,
    pub files_with_warnings: usize,
    pub failed_files: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub total_infos: usize,
    pub total_validation_time_ms: u64,
    /// Error count per issue code
    pub error_types: BTreeMap<String, usize>,
    pub warning_types: BTreeMap<String, usize>,
    pub broken_references: usize,
    pub cycles: usize,
}

/// Per-document section of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileValidationReport {
    pub file_path: String,
    pub declared_type: DeclaredType,
    pub status: OverallStatus,
    pub is_valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub validation_time_ms: u64,
    /// Issue lists are empty unless the report is detailed
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub infos: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub overall_status: OverallStatus,
    pub is_complete: bool,
    pub summary: ValidationSummary,
    /// Sorted by path
    pub file_reports: Vec<FileValidationReport>,
    pub load_order: Option<LoadOrder>,
    /// Highest priority first
    pub recommendations: Vec<Recommendation>,
    pub additional_data: BTreeMap<String, String>,
}

/// Build a report for a finished run
///
/// With `detailed` unset the per-file sections only carry counts.
pub fn generate_report(result: &ComprehensiveResult, detailed: bool) -> ValidationReport {
    let mut file_results: BTreeMap<String, ValidationResult> = result.documents.clone();
    if let Some(references) = &result.references {
        for issue in references.broken_references.iter().map(ValidationIssue::from).chain(references.warnings.iter().map(ValidationIssue::from)) {
            if let Some(file) = file_results.get_mut(&issue.file_path) {
                match issue.severity {
                    IssueSeverity::Error | IssueSeverity::Critical => {
                        file.is_valid = false;
                        file.errors.push(issue);
                    }
                    IssueSeverity::Warning => file.warnings.push(issue),
                    IssueSeverity::Info => file.infos.push(issue),
                }
            }
        }
    }

    let summary = summarize(result, &file_results);
    let recommendations = recommend(result, &file_results);
    let file_reports = file_results.into_values().map(|file| file_report(file, detailed)).collect();

    let mut additional_data = result.metadata.clone();
    additional_data.insert("started_at".to_string(), result.started_at.to_rfc3339());
    additional_data.insert("finished_at".to_string(), result.finished_at.to_rfc3339());

    ValidationReport {
        report_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        overall_status: result.overall_status,
        is_complete: result.is_complete,
        summary,
        file_reports,
        load_order: result.dependency_analysis.as_ref().map(|d| d.load_order.clone()),
        recommendations,
        additional_data,
    }
}

fn file_report(file: ValidationResult, detailed: bool) -> FileValidationReport {
    let status = file.status();
    let (error_count, warning_count, info_count) = (file.errors.len(), file.warnings.len(), file.infos.len());
    let (errors, warnings, infos) = if detailed { (file.errors, file.warnings, file.infos) } else { Default::default() };
    FileValidationReport {
        file_path: file.path,
        declared_type: file.declared_type,
        status,
        is_valid: file.is_valid,
        error_count,
        warning_count,
        info_count,
        validation_time_ms: file.duration.as_millis() as u64,
        errors,
        warnings,
        infos,
    }
}

fn summarize(result: &ComprehensiveResult, files: &BTreeMap<String, ValidationResult>) -> ValidationSummary {
    let mut summary = ValidationSummary {
        total_files: files.len(),
        broken_references: result.references.as_ref().map_or(0, |r| r.broken_reference_count),
        cycles: result.cycle_count(),
        ..Default::default()
    };
    for file in files.values() {
        if file.is_valid {
            summary.valid_files += 1;
            if !file.warnings.is_empty() {
                summary.files_with_warnings += 1;
            }
        } else {
            summary.failed_files += 1;
        }
        summary.total_errors += file.errors.len();
        summary.total_warnings += file.warnings.len();
        summary.total_infos += file.infos.len();
        summary.total_validation_time_ms += file.duration.as_millis() as u64;
        for issue in &file.errors {
            *summary.error_types.entry(issue.code.clone()).or_default() += 1;
        }
        for issue in &file.warnings {
            *summary.warning_types.entry(issue.code.clone()).or_default() += 1;
        }
    }
    summary
}

fn files_with<'a>(files: &'a BTreeMap<String, ValidationResult>, category: IssueCategory) -> Vec<&'a ValidationResult> {
    files.values().filter(|f| f.errors.iter().any(|e| e.category == category)).collect()
}

fn paths(files: &[&ValidationResult]) -> Vec<String> {
    files.iter().map(|f| f.path.clone()).collect()
}

fn recommend(result: &ComprehensiveResult, files: &BTreeMap<String, ValidationResult>) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let critical = files_with(files, IssueCategory::Critical);
    if !critical.is_empty() || result.metadata.contains_key("exception") {
        recommendations.push(Recommendation {
            id: "investigate-critical-failures".to_string(),
            title: "Investigate failed validations".to_string(),
            description: match result.metadata.get("exception") {
                Some(reason) => format!("The run aborted: {reason}"),
                None => format!("Validation itself failed for {} document(s)", critical.len()),
            },
            priority: RecommendationPriority::Critical,
            category: RecommendationCategory::Reliability,
            affected_files: paths(&critical),
            can_auto_fix: false,
            confidence: 1.0,
        });
    }

    if let Some(analysis) = result.dependency_analysis.as_ref().filter(|d| !d.load_order.cycles.is_empty()) {
        let members: BTreeSet<String> = analysis.load_order.cycles.iter().flat_map(|c| c.nodes.iter().cloned()).collect();
        let rendered: Vec<String> = analysis.load_order.cycles.iter().map(|c| c.describe()).collect();
        recommendations.push(Recommendation {
            id: "break-dependency-cycles".to_string(),
            title: "Break dependency cycles".to_string(),
            description: format!("Documents in a cycle cannot be given a load phase: {}", rendered.join("; ")),
            priority: RecommendationPriority::High,
            category: RecommendationCategory::Reliability,
            affected_files: members.into_iter().collect(),
            can_auto_fix: false,
            confidence: 0.9,
        });
    }

    if let Some(references) = result.references.as_ref().filter(|r| !r.broken_references.is_empty()) {
        let sources: BTreeSet<String> = references.broken_references.iter().map(|r| r.source_document.clone()).collect();
        recommendations.push(Recommendation {
            id: "fix-broken-references".to_string(),
            title: "Fix broken references".to_string(),
            description: format!("{} reference(s) point at entities that are not declared anywhere in the corpus", references.broken_reference_count),
            priority: RecommendationPriority::High,
            category: RecommendationCategory::Reliability,
            affected_files: sources.into_iter().collect(),
            can_auto_fix: false,
            confidence: 0.85,
        });
    }

    let schema = files_with(files, IssueCategory::Schema);
    if !schema.is_empty() {
        recommendations.push(Recommendation {
            id: "fix-schema-errors".to_string(),
            title: "Fix schema violations".to_string(),
            description: "Some documents do not conform to the schema of their declared type".to_string(),
            priority: RecommendationPriority::Medium,
            category: RecommendationCategory::Compatibility,
            affected_files: paths(&schema),
            can_auto_fix: false,
            confidence: 0.8,
        });
    }

    let rule = files_with(files, IssueCategory::Rule);
    if !rule.is_empty() {
        let rule_errors: Vec<&ValidationIssue> = rule.iter().flat_map(|f| &f.errors).filter(|e| e.category == IssueCategory::Rule).collect();
        let can_auto_fix = rule_errors.iter().all(|e| e.suggestion.as_ref().is_some_and(|s| s.can_auto_fix));
        let confidence = if can_auto_fix {
            rule_errors.iter().filter_map(|e| e.suggestion.as_ref()).map(|s| s.confidence).fold(1.0_f32, f32::min)
        } else {
            0.6
        };
        recommendations.push(Recommendation {
            id: "resolve-rule-violations".to_string(),
            title: "Resolve rule violations".to_string(),
            description: format!("{} business rule violation(s) reported as errors", rule_errors.len()),
            priority: RecommendationPriority::Medium,
            category: RecommendationCategory::Maintainability,
            affected_files: paths(&rule),
            can_auto_fix,
            confidence,
        });
    }

    let warned: Vec<&ValidationResult> = files.values().filter(|f| f.is_valid && !f.warnings.is_empty()).collect();
    if files.values().all(|f| f.is_valid) && !warned.is_empty() {
        recommendations.push(Recommendation {
            id: "review-warnings".to_string(),
            title: "Review warnings".to_string(),
            description: "No errors were found, but some documents produced warnings".to_string(),
            priority: RecommendationPriority::Low,
            category: RecommendationCategory::Maintainability,
            affected_files: paths(&warned),
            can_auto_fix: false,
            confidence: 0.5,
        });
    }

    if let Some(analysis) = &result.dependency_analysis {
        let complex: Vec<String> =
            analysis.documents.iter().filter(|(_, d)| d.complexity == AnalysisComplexity::VeryComplex).map(|(path, _)| path.clone()).collect();
        if !complex.is_empty() {
            recommendations.push(Recommendation {
                id: "split-complex-documents".to_string(),
                title: "Split very complex documents".to_string(),
                description: "These documents depend on many others and are slow to analyze".to_string(),
                priority: RecommendationPriority::Low,
                category: RecommendationCategory::Performance,
                affected_files: complex,
                can_auto_fix: false,
                confidence: 0.5,
            });
        }
    }

    recommendations.sort_by_key(|r| Reverse(r.priority));
    recommendations
}
