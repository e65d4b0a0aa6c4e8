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

//! Reference integrity across a corpus

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::DeclaredType;
use crate::extractor::{Cardinality, ExtractedReference};
use crate::index::IdentifierIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReferenceErrorKind {
    /// Nothing in the corpus declares the identifier
    ObjectNotFound,
    /// The identifier exists, but only under other entity types
    TypeNotFound,
}

/// A reference that does not resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceError {
    pub source_document: String,
    pub location: String,
    pub target_type: DeclaredType,
    pub target_id: String,
    pub kind: ReferenceErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReferenceWarningKind {
    /// An optional single reference resolves to more than one declaration
    SuspiciousReference,
    /// The same type and identifier are declared more than once
    DuplicateDeclaration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceWarning {
    pub source_document: String,
    pub location: String,
    pub target_type: DeclaredType,
    pub target_id: String,
    pub kind: ReferenceWarningKind,
    pub message: String,
}

/// Outcome of checking every reference of a corpus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceIntegrityResult {
    pub is_valid: bool,
    pub broken_references: Vec<ReferenceError>,
    pub warnings: Vec<ReferenceWarning>,
    pub total_references: usize,
    pub broken_reference_count: usize,
    pub indexed_entities: usize,
}

/// Resolves references against a prebuilt identifier index
#[derive(Debug, Clone, Copy)]
pub struct ReferenceIntegrityChecker<'a> {
    index: &'a IdentifierIndex,
}

impl<'a> ReferenceIntegrityChecker<'a> {
    pub fn new(index: &'a IdentifierIndex) -> Self {
        Self { index }
    }

    pub fn check(&self, references: &[ExtractedReference]) -> ReferenceIntegrityResult {
        let mut broken_references = Vec::new();
        let mut warnings = Vec::new();

        for reference in references {
            let matches = self.index.lookup(reference.target_type, &reference.target_id).count();
            if matches == 0 {
                broken_references.push(self.broken(reference));
            } else if !reference.required && reference.cardinality == Cardinality::One && matches > 1 {
                warnings.push(ReferenceWarning {
                    source_document: reference.source_document.clone(),
                    location: reference.location.clone(),
                    target_type: reference.target_type,
                    target_id: reference.target_id.clone(),
                    kind: ReferenceWarningKind::SuspiciousReference,
                    message: format!("Reference to {} resolves to {matches} declarations", reference.describe()),
                });
            }
        }

        for ((entity_type, id), declarations) in self.index.duplicates() {
            let first = declarations[0];
            for duplicate in &declarations[1..] {
                warnings.push(ReferenceWarning {
                    source_document: duplicate.document.clone(),
                    location: duplicate.location.clone(),
                    target_type: entity_type,
                    target_id: id.clone(),
                    kind: ReferenceWarningKind::DuplicateDeclaration,
                    message: format!("{entity_type}.{id} is already declared in {} at {}", first.document, first.location),
                });
            }
        }

        let broken_reference_count = broken_references.len();
        debug!(total = references.len(), broken = broken_reference_count, warnings = warnings.len(), "checked reference integrity");
        ReferenceIntegrityResult {
            is_valid: broken_reference_count == 0,
            broken_references,
            warnings,
            total_references: references.len(),
            broken_reference_count,
            indexed_entities: self.index.len(),
        }
    }

    fn broken(&self, reference: &ExtractedReference) -> ReferenceError {
        let declared_as = self.index.types_for(&reference.target_id);
        let (kind, message) = if declared_as.is_empty() {
            (ReferenceErrorKind::ObjectNotFound, format!("Referenced object {} was not found", reference.describe()))
        } else {
            let names: Vec<String> = declared_as.iter().map(ToString::to_string).collect();
            (
                ReferenceErrorKind::TypeNotFound,
                format!("'{}' is declared as {} but referenced as {}", reference.target_id, names.join(", "), reference.target_type),
            )
        };
        ReferenceError {
            source_document: reference.source_document.clone(),
            location: reference.location.clone(),
            target_type: reference.target_type,
            target_id: reference.target_id.clone(),
            kind,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Element};
    use crate::extractor::Directness;

    fn reference(target_type: DeclaredType, id: &str, required: bool) -> ExtractedReference {
        ExtractedReference {
            source_document: "x.json".to_string(),
            location: "/root/a[1]/@ref".to_string(),
            target_type,
            target_id: id.to_string(),
            required,
            cardinality: Cardinality::One,
            directness: Directness::Direct,
        }
    }

    fn index() -> IdentifierIndex {
        let docs = vec![
            Document::new(
                "items.json",
                Element::new("Items").with_child(Element::new("Item").with_attr("id", "sword")).with_child(Element::new("Item").with_attr("id", "shield")),
            ),
            Document::new("more.json", Element::new("Items").with_child(Element::new("Item").with_attr("id", "shield"))),
            Document::new("skeletons.json", Element::new("skeletons").with_child(Element::new("skeleton").with_attr("id", "human"))),
        ];
        IdentifierIndex::build(&docs)
    }

    #[test]
    fn test_missing_object() {
        let index = index();
        let result = ReferenceIntegrityChecker::new(&index).check(&[reference(DeclaredType::Items, "missing_42", true)]);
        assert!(!result.is_valid);
        assert_eq!(result.broken_reference_count, 1);
        assert_eq!(result.broken_references[0].kind, ReferenceErrorKind::ObjectNotFound);
        assert_eq!(result.total_references, 1);
    }

    #[test]
    fn test_type_mismatch() {
        let index = index();
        let result = ReferenceIntegrityChecker::new(&index).check(&[reference(DeclaredType::Items, "human", true)]);
        assert_eq!(result.broken_references[0].kind, ReferenceErrorKind::TypeNotFound);
        assert_eq!(result.broken_references[0].message, "'human' is declared as Skeleton but referenced as Item");
    }

    #[test]
    fn test_ambiguous_optional_reference_is_suspicious() {
        let index = index();
        let result = ReferenceIntegrityChecker::new(&index)
            .check(&[reference(DeclaredType::Items, "shield", false), reference(DeclaredType::Items, "shield", true)]);
        assert!(result.is_valid);
        let kinds: Vec<ReferenceWarningKind> = result.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![ReferenceWarningKind::SuspiciousReference, ReferenceWarningKind::DuplicateDeclaration]);
        assert_eq!(result.warnings[1].source_document, "more.json");
    }

    #[test]
    fn test_resolved_references() {
        let index = index();
        let result = ReferenceIntegrityChecker::new(&index).check(&[reference(DeclaredType::Items, "sword", true), reference(DeclaredType::Skeletons, "human", false)]);
        assert!(result.is_valid);
        assert!(result.broken_references.is_empty());
        assert_eq!(result.total_references, 2);
        assert_eq!(result.indexed_entities, 4);
    }
}
