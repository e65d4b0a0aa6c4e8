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

//! Parsed document trees and the loader boundary
//!
//! Documents arrive from a loader collaborator as a tree of [`Element`]s.
//! The engine never mutates a tree after it has been loaded; every stage
//! reads it and produces new records.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classifier::{DeclaredType, classify};
use crate::error::{ModlintError, ModlintResult};

/// A node of a parsed document tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Element (marker) name
    pub name: String,
    /// Attribute values keyed by attribute name
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Child elements in document order
    #[serde(default)]
    pub children: Vec<Element>,
    /// Text content for leaf elements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// 1-based source line, when the loader knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// 1-based source column, when the loader knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// True when the element has no child elements
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Trimmed text content, if any
    pub fn text_value(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Visit this element and every descendant in document order, together with its locator
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Element, &str)) {
        let root = format!("/{}", self.name);
        self.walk_from(&root, visit);
    }

    fn walk_from<'a>(&'a self, locator: &str, visit: &mut impl FnMut(&'a Element, &str)) {
        visit(self, locator);
        for (child, child_locator) in self.children_with_locators(locator) {
            child.walk_from(&child_locator, visit);
        }
    }

    /// Direct children paired with `parent[n]` style locators
    pub fn children_with_locators(&self, parent: &str) -> Vec<(&Element, String)> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        self.children
            .iter()
            .map(|child| {
                let position = seen.entry(child.name.as_str()).or_insert(0);
                *position += 1;
                (child, format!("{parent}/{}[{}]", child.name, position))
            })
            .collect()
    }
}

/// Locator of an attribute on the element at `element_locator`
pub fn attribute_locator(element_locator: &str, attribute: &str) -> String {
    format!("{element_locator}/@{attribute}")
}

/// A loaded and classified document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Unique key of the document within a corpus
    pub path: String,
    /// Entity category derived from the root marker
    pub declared_type: DeclaredType,
    /// Parsed tree
    pub root: Element,
}

impl Document {
    /// Wrap a parsed tree, classifying it from its root marker
    pub fn new(path: impl Into<String>, root: Element) -> Self {
        let declared_type = classify(&root);
        Self { path: path.into(), declared_type, root }
    }

    /// Locator of the root element
    pub fn root_locator(&self) -> String {
        format!("/{}", self.root.name)
    }
}

/// Collaborator that turns a document path into a parsed tree
#[cfg_attr(test, mockall::automock)]
pub trait DocumentLoader: Send + Sync {
    /// Load and parse the document at `path`
    fn load(&self, path: &str) -> ModlintResult<Element>;
}

/// Loader over trees that are already in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    documents: HashMap<String, Element>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a document
    pub fn insert(&mut self, path: impl Into<String>, root: Element) {
        self.documents.insert(path.into(), root);
    }

    pub fn with_document(mut self, path: impl Into<String>, root: Element) -> Self {
        self.insert(path, root);
        self
    }

    /// Paths of every stored document, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.documents.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl DocumentLoader for MemoryLoader {
    fn load(&self, path: &str) -> ModlintResult<Element> {
        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| ModlintError::DocumentLoad { path: path.to_string(), reason: "no such document".to_string() })
    }
}

/// Loader reading JSON encoded [`Element`] trees from disk
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFileLoader;

impl DocumentLoader for JsonFileLoader {
    fn load(&self, path: &str) -> ModlintResult<Element> {
        let content = std::fs::read_to_string(Path::new(path))
            .map_err(|e| ModlintError::DocumentLoad { path: path.to_string(), reason: e.to_string() })?;
        serde_json::from_str(&content).map_err(|e| ModlintError::DocumentParse { path: path.to_string(), reason: e.to_string() })
    }
}
