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

//! Configuration types for corpus validation

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ModlintError, ModlintResult};

/// How dependency cycles affect the overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleSeverity {
    /// Cycles downgrade a run to "passed with warnings"
    Warning,
    /// Cycles fail the run
    Error,
}

/// Settings controlling which stages run and how they are executed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Check documents against registered or synthesized schemas
    pub validate_schema: bool,
    /// Build the dependency graph and load order
    pub validate_dependencies: bool,
    /// Evaluate the rule engine against every entity
    pub validate_rules: bool,
    /// Run the corpus wide reference integrity check
    pub validate_references: bool,
    /// Include declared range constraints when deriving rules
    pub validate_value_ranges: bool,
    /// Fan per-document validation out over a worker pool
    pub enable_parallel_validation: bool,
    /// Width of the worker pool
    pub max_validation_threads: usize,
    /// Severity attached to dependency cycles
    pub cycle_severity: CycleSeverity,
    /// Optional deadline for a whole run, in milliseconds
    pub timeout_ms: Option<u64>,
    /// Keep per-issue detail in generated reports
    pub generate_detailed_report: bool,
    /// Free-form options copied into run metadata
    pub custom_options: BTreeMap<String, String>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            validate_schema: true,
            validate_dependencies: true,
            validate_rules: true,
            validate_references: true,
            validate_value_ranges: true,
            enable_parallel_validation: true,
            max_validation_threads: default_parallelism(),
            cycle_severity: CycleSeverity::Warning,
            timeout_ms: None,
            generate_detailed_report: true,
            custom_options: BTreeMap::new(),
        }
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

impl ValidationSettings {
    /// Create settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable schema validation
    pub fn with_schema_validation(mut self, enable: bool) -> Self {
        self.validate_schema = enable;
        self
    }

    /// Enable or disable dependency analysis
    pub fn with_dependency_validation(mut self, enable: bool) -> Self {
        self.validate_dependencies = enable;
        self
    }

    /// Enable or disable rule evaluation
    pub fn with_rule_validation(mut self, enable: bool) -> Self {
        self.validate_rules = enable;
        self
    }

    /// Enable or disable the reference integrity check
    pub fn with_reference_validation(mut self, enable: bool) -> Self {
        self.validate_references = enable;
        self
    }

    /// Enable or disable range constraint rules
    pub fn with_value_ranges(mut self, enable: bool) -> Self {
        self.validate_value_ranges = enable;
        self
    }

    /// Enable or disable parallel per-document validation
    pub fn with_parallel(mut self, enable: bool) -> Self {
        self.enable_parallel_validation = enable;
        self
    }

    /// Set the worker pool width
    pub fn with_max_threads(mut self, threads: usize) -> Self {
        self.max_validation_threads = threads;
        self
    }

    /// Set how cycles are weighted
    pub fn with_cycle_severity(mut self, severity: CycleSeverity) -> Self {
        self.cycle_severity = severity;
        self
    }

    /// Set a deadline for the whole run
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Add a free-form option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_options.insert(key.into(), value.into());
        self
    }

    /// Deadline as a duration, if one is configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Worker count actually used, never zero
    pub fn effective_threads(&self) -> usize {
        if self.enable_parallel_validation { self.max_validation_threads.max(1) } else { 1 }
    }

    /// Reject settings that cannot produce a meaningful run
    pub fn validate(&self) -> ModlintResult<()> {
        if self.enable_parallel_validation && self.max_validation_threads == 0 {
            return Err(ModlintError::Config("max_validation_threads must be at least 1".to_string()));
        }
        if self.timeout_ms == Some(0) {
            return Err(ModlintError::Config("timeout_ms must be greater than zero".to_string()));
        }
        Ok(())
    }
}
