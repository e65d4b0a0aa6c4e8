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

//! Error types shared by every analysis stage

use thiserror::Error;

/// Result alias used throughout the engine
pub type ModlintResult<T> = Result<T, ModlintError>;

/// Errors raised by the analysis engine and its collaborators
#[derive(Error, Debug)]
pub enum ModlintError {
    #[error("failed to load document '{path}': {reason}")]
    DocumentLoad { path: String, reason: String },

    #[error("malformed document '{path}': {reason}")]
    DocumentParse { path: String, reason: String },

    #[error("schema for '{declared_type}' could not be loaded: {reason}")]
    SchemaLoad { declared_type: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("worker pool could not be created: {0}")]
    WorkerPool(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("report formatting failed: {0}")]
    Format(#[from] std::fmt::Error),
}

impl ModlintError {
    /// Short machine readable code, used as the error code of issues built from this error
    pub fn code(&self) -> &'static str {
        match self {
            ModlintError::DocumentLoad { .. } => "DOCUMENT_LOAD",
            ModlintError::DocumentParse { .. } => "DOCUMENT_PARSE",
            ModlintError::SchemaLoad { .. } => "SCHEMA_LOAD",
            ModlintError::Config(_) => "CONFIG",
            ModlintError::WorkerPool(_) => "WORKER_POOL",
            ModlintError::Io(_) => "IO",
            ModlintError::Serialization(_) => "SERIALIZATION",
            ModlintError::Format(_) => "FORMAT",
        }
    }
}

/// Failure while evaluating a single rule predicate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("member '{member}' holds '{raw}', which is not a valid {expected}")]
    InvalidValue { member: String, raw: String, expected: String },

    #[error("{0}")]
    Evaluation(String),
}
