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

//! # Schema Validation
//!
//! Structural conformance checks for documents. A schema describes the root
//! marker of a document and the shape of the entity elements below it:
//! attributes with a value type and required flag, and child elements that
//! are either simple values or nested complex elements.
//!
//! Schemas are registered per declared type through [`SchemaRegistry`]. When
//! no schema is registered one is synthesized from the document itself (see
//! [`synthesis`]). Before a run fans out, [`SchemaCache::prepare`] resolves
//! one schema per declared type so workers only read shared state.

pub mod synthesis;
pub mod validator;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classifier::DeclaredType;
use crate::document::Document;
use crate::error::{ModlintError, ModlintResult};

pub use synthesis::synthesize;
pub use validator::{SchemaErrorKind, SchemaValidationError, SchemaValidationResult, SchemaValidationWarning, SchemaValidator};

/// Primitive value type of an attribute or simple element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Integer,
    Decimal,
    Boolean,
    DateTime,
    String,
}

impl ValueType {
    /// Infer a type by trial parsing: integer, decimal, boolean, datetime, then string
    pub fn infer(raw: &str) -> ValueType {
        let raw = raw.trim();
        if raw.parse::<i64>().is_ok() {
            ValueType::Integer
        } else if parse_decimal(raw).is_some() {
            ValueType::Decimal
        } else if parse_bool(raw).is_some() {
            ValueType::Boolean
        } else if is_datetime(raw) {
            ValueType::DateTime
        } else {
            ValueType::String
        }
    }

    /// Whether `raw` is a valid value of this type
    pub fn accepts(self, raw: &str) -> bool {
        let raw = raw.trim();
        match self {
            ValueType::Integer => raw.parse::<i64>().is_ok(),
            ValueType::Decimal => parse_decimal(raw).is_some(),
            ValueType::Boolean => parse_bool(raw).is_some(),
            ValueType::DateTime => is_datetime(raw),
            ValueType::String => true,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Integer => "integer",
            ValueType::Decimal => "decimal",
            ValueType::Boolean => "boolean",
            ValueType::DateTime => "datetime",
            ValueType::String => "string",
        }
    }
}

pub(crate) fn parse_decimal(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn is_datetime(raw: &str) -> bool {
    DateTime::parse_from_rfc3339(raw).is_ok()
        || NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}

/// Attribute declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSchema {
    pub name: String,
    pub value_type: ValueType,
    #[serde(default)]
    pub required: bool,
}

/// Content of a child element declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildContent {
    /// Simple element holding a typed text value
    Simple(ValueType),
    /// Nested element with its own attributes and children
    Complex(ElementSchema),
}

/// Child element declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSchema {
    pub name: String,
    pub content: ChildContent,
    #[serde(default)]
    pub required: bool,
}

/// Shape of one element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSchema {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<AttributeSchema>,
    #[serde(default)]
    pub children: Vec<ChildSchema>,
}

impl ElementSchema {
    pub fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&ChildSchema> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Schema of a whole document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Expected root marker
    pub root: String,
    /// Shape of every entity element under the root
    pub entity: ElementSchema,
    /// True when inferred from document content rather than registered
    #[serde(default)]
    pub synthesized: bool,
}

/// Where a registered schema comes from
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaSource {
    Inline(Schema),
    Json(String),
    File(PathBuf),
}

impl SchemaSource {
    /// Load the schema this source describes
    pub fn load(&self, declared_type: DeclaredType) -> ModlintResult<Schema> {
        let schema_load = |reason: String| ModlintError::SchemaLoad { declared_type: declared_type.to_string(), reason };
        match self {
            SchemaSource::Inline(schema) => Ok(schema.clone()),
            SchemaSource::Json(text) => serde_json::from_str(text).map_err(|e| schema_load(e.to_string())),
            SchemaSource::File(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| schema_load(format!("{}: {e}", path.display())))?;
                serde_json::from_str(&text).map_err(|e| schema_load(format!("{}: {e}", path.display())))
            }
        }
    }
}

/// Registered schema sources keyed by declared type
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    sources: RwLock<HashMap<DeclaredType, SchemaSource>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the schema for a type
    pub fn register(&self, declared_type: DeclaredType, source: SchemaSource) {
        debug!(%declared_type, "registering schema");
        self.sources.write().insert(declared_type, source);
    }

    /// Remove a registered schema, returning whether one existed
    pub fn unregister(&self, declared_type: DeclaredType) -> bool {
        self.sources.write().remove(&declared_type).is_some()
    }

    pub fn is_registered(&self, declared_type: DeclaredType) -> bool {
        self.sources.read().contains_key(&declared_type)
    }

    pub fn source(&self, declared_type: DeclaredType) -> Option<SchemaSource> {
        self.sources.read().get(&declared_type).cloned()
    }

    pub fn registered_types(&self) -> Vec<DeclaredType> {
        let mut types: Vec<DeclaredType> = self.sources.read().keys().copied().collect();
        types.sort();
        types
    }
}

/// Outcome of resolving the schema for a document
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaResolution {
    Ready(Arc<Schema>),
    /// A registered schema could not be loaded
    LoadFailed(String),
    /// Nothing registered and nothing to synthesize from
    Unavailable,
}

/// Per-run schema snapshot, built before documents are validated
///
/// Workers only read from it; every schema the run needs is resolved or
/// synthesized in [`SchemaCache::prepare`].
#[derive(Debug, Default, Clone)]
pub struct SchemaCache {
    by_type: HashMap<DeclaredType, SchemaResolution>,
    /// Documents of unknown type each get a schema of their own
    by_path: HashMap<String, SchemaResolution>,
}

impl SchemaCache {
    /// Resolve one schema per known declared type present in `documents`
    ///
    /// Registered schemas win. Otherwise the first document of the type that
    /// has a representative entity is used to synthesize one. Documents of
    /// unknown type are synthesized individually.
    pub fn prepare<'a>(registry: &SchemaRegistry, documents: impl IntoIterator<Item = &'a Document>) -> Self {
        let mut by_type: HashMap<DeclaredType, SchemaResolution> = HashMap::new();
        let mut by_path: HashMap<String, SchemaResolution> = HashMap::new();
        for document in documents {
            let declared_type = document.declared_type;
            if !declared_type.is_known() {
                by_path.insert(document.path.clone(), resolve_uncached(registry, document));
                continue;
            }
            if matches!(by_type.get(&declared_type), Some(SchemaResolution::Ready(_) | SchemaResolution::LoadFailed(_))) {
                continue;
            }
            by_type.insert(declared_type, resolve_uncached(registry, document));
        }
        debug!(types = by_type.len(), unknown = by_path.len(), "prepared schema cache");
        Self { by_type, by_path }
    }

    /// Schema prepared for a document
    pub fn resolve(&self, document: &Document) -> SchemaResolution {
        let cached = if document.declared_type.is_known() { self.by_type.get(&document.declared_type) } else { self.by_path.get(&document.path) };
        cached.cloned().unwrap_or(SchemaResolution::Unavailable)
    }

    pub fn len(&self) -> usize {
        self.by_type.len() + self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty() && self.by_path.is_empty()
    }
}

fn resolve_uncached(registry: &SchemaRegistry, document: &Document) -> SchemaResolution {
    if let Some(source) = registry.source(document.declared_type) {
        return match source.load(document.declared_type) {
            Ok(schema) => SchemaResolution::Ready(Arc::new(schema)),
            Err(err) => {
                warn!(path = %document.path, error = %err, "registered schema failed to load");
                SchemaResolution::LoadFailed(err.to_string())
            }
        };
    }
    match synthesize(document) {
        Some(schema) => SchemaResolution::Ready(Arc::new(schema)),
        None => SchemaResolution::Unavailable,
    }
}
