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

//! Per-document and per-run validation results

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::DeclaredType;
use crate::error::ModlintError;
use crate::graph::{AnalysisComplexity, DependencyEdge};
use crate::integrity::{ReferenceError, ReferenceIntegrityResult, ReferenceWarning};
use crate::rules::{RuleSeverity, Suggestion, Violation};
use crate::scheduler::LoadOrder;
use crate::schema::{SchemaValidationError, SchemaValidationResult, SchemaValidationWarning};

/// Outcome of a run, ordered from best to worst
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OverallStatus {
    #[default]
    Passed,
    PassedWithWarnings,
    Failed,
    CriticalError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IssueSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl From<RuleSeverity> for IssueSeverity {
    fn from(severity: RuleSeverity) -> Self {
        match severity {
            RuleSeverity::Info => IssueSeverity::Info,
            RuleSeverity::Warning => IssueSeverity::Warning,
            RuleSeverity::Error => IssueSeverity::Error,
            RuleSeverity::Critical => IssueSeverity::Critical,
        }
    }
}

/// Which stage produced an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IssueCategory {
    Structural,
    Schema,
    Rule,
    Reference,
    Cycle,
    Critical,
}

/// One reportable finding about a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: String,
    pub message: String,
    pub severity: IssueSeverity,
    pub category: IssueCategory,
    pub file_path: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<Suggestion>,
}

impl ValidationIssue {
    pub fn new(code: impl Into<String>, message: impl Into<String>, severity: IssueSeverity, category: IssueCategory, file_path: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity,
            category,
            file_path: file_path.into(),
            line: None,
            column: None,
            location: None,
            context: BTreeMap::new(),
            suggestion: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>, line: Option<u32>, column: Option<u32>) -> Self {
        self.location = Some(location.into());
        self.line = line;
        self.column = column;
        self
    }

    /// Structural issue raised when a document cannot be used at all
    pub fn structural(path: &str, err: &ModlintError) -> Self {
        Self::new(err.code(), err.to_string(), IssueSeverity::Error, IssueCategory::Structural, path)
    }

    pub fn with_suggestion(mut self, suggestion: Option<Suggestion>) -> Self {
        self.suggestion = suggestion;
        self
    }
}

impl From<&SchemaValidationError> for ValidationIssue {
    fn from(error: &SchemaValidationError) -> Self {
        Self::new(format!("SCHEMA_{:?}", error.kind), &error.message, IssueSeverity::Error, IssueCategory::Schema, &error.file_path)
            .at(&error.location, error.line, error.column)
    }
}

impl From<&SchemaValidationWarning> for ValidationIssue {
    fn from(warning: &SchemaValidationWarning) -> Self {
        Self::new("SCHEMA_WARNING", &warning.message, IssueSeverity::Warning, IssueCategory::Schema, &warning.file_path)
            .at(&warning.location, warning.line, warning.column)
    }
}

impl From<&Violation> for ValidationIssue {
    fn from(violation: &Violation) -> Self {
        let mut issue = Self::new(&violation.rule_id, &violation.message, violation.severity.into(), IssueCategory::Rule, &violation.document)
            .at(&violation.location, violation.line, violation.column);
        issue.context = violation.context.clone();
        issue
    }
}

impl From<&ReferenceError> for ValidationIssue {
    fn from(error: &ReferenceError) -> Self {
        Self::new(format!("REFERENCE_{:?}", error.kind), &error.message, IssueSeverity::Error, IssueCategory::Reference, &error.source_document)
            .at(&error.location, None, None)
    }
}

impl From<&ReferenceWarning> for ValidationIssue {
    fn from(warning: &ReferenceWarning) -> Self {
        Self::new(format!("REFERENCE_{:?}", warning.kind), &warning.message, IssueSeverity::Warning, IssueCategory::Reference, &warning.source_document)
            .at(&warning.location, None, None)
    }
}

/// Validation outcome of one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub path: String,
    pub declared_type: DeclaredType,
    pub is_valid: bool,
    /// Error and critical issues
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub infos: Vec<ValidationIssue>,
    pub duration: Duration,
}

impl ValidationResult {
    /// Sort issues into buckets by severity
    pub fn from_issues(path: impl Into<String>, declared_type: DeclaredType, issues: Vec<ValidationIssue>, duration: Duration) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut infos = Vec::new();
        for issue in issues {
            match issue.severity {
                IssueSeverity::Error | IssueSeverity::Critical => errors.push(issue),
                IssueSeverity::Warning => warnings.push(issue),
                IssueSeverity::Info => infos.push(issue),
            }
        }
        Self { path: path.into(), declared_type, is_valid: errors.is_empty(), errors, warnings, infos, duration }
    }

    /// Result for a document whose validation itself failed
    pub fn critical(path: &str, declared_type: DeclaredType, message: impl Into<String>, duration: Duration) -> Self {
        let issue = ValidationIssue::new("VALIDATION_FAILED", message, IssueSeverity::Critical, IssueCategory::Critical, path);
        Self::from_issues(path, declared_type, vec![issue], duration)
    }

    pub fn status(&self) -> OverallStatus {
        if self.errors.iter().any(|e| e.severity == IssueSeverity::Critical) {
            OverallStatus::CriticalError
        } else if !self.errors.is_empty() {
            OverallStatus::Failed
        } else if !self.warnings.is_empty() {
            OverallStatus::PassedWithWarnings
        } else {
            OverallStatus::Passed
        }
    }

    /// Every issue, errors first
    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().chain(&self.warnings).chain(&self.infos)
    }
}

/// Dependency footprint of one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDependencies {
    pub declared_type: DeclaredType,
    pub dependencies: Vec<String>,
    pub reference_count: usize,
    pub complexity: AnalysisComplexity,
}

/// Dependency analysis of a corpus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyAnalysisResult {
    pub edges: Vec<DependencyEdge>,
    pub load_order: LoadOrder,
    pub documents: BTreeMap<String, DocumentDependencies>,
}

/// Everything a batch run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveResult {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Per-document results, keyed and ordered by path
    pub documents: BTreeMap<String, ValidationResult>,
    pub dependency_analysis: Option<DependencyAnalysisResult>,
    pub schema: Option<SchemaValidationResult>,
    pub references: Option<ReferenceIntegrityResult>,
    pub overall_status: OverallStatus,
    /// False when the run was cancelled or hit its deadline
    pub is_complete: bool,
    pub metadata: BTreeMap<String, String>,
}

impl ComprehensiveResult {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            documents: BTreeMap::new(),
            dependency_analysis: None,
            schema: None,
            references: None,
            overall_status: OverallStatus::Passed,
            is_complete: true,
            metadata: BTreeMap::new(),
        }
    }

    /// Wrap a single-document result so it can be reported like a corpus run
    pub fn from_document(result: ValidationResult) -> Self {
        let finished_at = Utc::now();
        let started_at = chrono::Duration::from_std(result.duration).map_or(finished_at, |elapsed| finished_at - elapsed);
        let mut comprehensive = Self::new(started_at);
        comprehensive.finished_at = finished_at;
        comprehensive.overall_status = result.status();
        comprehensive.metadata.insert("mode".to_string(), "single_document".to_string());
        comprehensive.metadata.insert("document_count".to_string(), "1".to_string());
        comprehensive.documents.insert(result.path.clone(), result);
        comprehensive
    }

    /// Cycles found by dependency analysis
    pub fn cycle_count(&self) -> usize {
        self.dependency_analysis.as_ref().map_or(0, |d| d.load_order.cycles.len())
    }
}
