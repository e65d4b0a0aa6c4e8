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

//! Cross-document dependency and validation analysis
//!
//! This crate analyzes a corpus of game data documents that declare entities
//! and reference each other by string identifier. It classifies each document,
//! extracts its references, builds the document dependency graph, orders the
//! corpus into load phases, and validates every document against schemas and
//! business rules before checking that every reference resolves.
//!
//! [`ValidationOrchestrator`] is the entry point; [`generate_report`] turns its
//! result into the serializable [`ValidationReport`].

pub mod classifier;
pub mod config;
pub mod document;
pub mod error;
pub mod extractor;
pub mod graph;
pub mod index;
pub mod integrity;
pub mod orchestrator;
pub mod report;
pub mod result;
pub mod rules;
pub mod scheduler;
pub mod schema;

use std::sync::Arc;

pub use classifier::{DeclaredType, classify};
pub use config::{CycleSeverity, ValidationSettings};
pub use document::{Document, DocumentLoader, Element, JsonFileLoader, MemoryLoader};
pub use error::{ModlintError, ModlintResult, RuleError};
pub use extractor::{DeclaredEntity, ExtractedReference, extract_references};
pub use graph::{DependencyEdge, DependencyGraph, DependencyKind, ReferenceStrength};
pub use index::IdentifierIndex;
pub use integrity::{ReferenceError, ReferenceErrorKind, ReferenceIntegrityChecker, ReferenceIntegrityResult, ReferenceWarning};
pub use orchestrator::{CancellationToken, ValidationOrchestrator};
pub use report::{ReportFormat, ReportFormatter, ValidationReport, format_report, generate_report};
pub use result::{ComprehensiveResult, IssueCategory, IssueSeverity, OverallStatus, ValidationIssue, ValidationResult};
pub use rules::{RuleEngine, StaticCatalog, Violation};
pub use scheduler::{CycleReport, LoadOrder, Phase, find_cycles, schedule};
pub use schema::{Schema, SchemaRegistry, SchemaSource};

/// Orchestrator reading JSON documents from disk with the given settings
pub fn create_file_orchestrator(settings: ValidationSettings) -> ValidationOrchestrator {
    ValidationOrchestrator::new(Arc::new(JsonFileLoader)).with_settings(settings)
}
