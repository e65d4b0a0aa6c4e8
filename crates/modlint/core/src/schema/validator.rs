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

//! Checking documents against a resolved schema

use serde::{Deserialize, Serialize};

use crate::document::{Document, Element, attribute_locator};
use crate::schema::{ChildContent, ElementSchema, Schema, SchemaResolution};

/// Category of a schema error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SchemaErrorKind {
    ElementNotFound,
    AttributeNotFound,
    InvalidValue,
    MissingRequiredAttribute,
    TypeMismatch,
    /// The schema itself could not be used
    SchemaValidationError,
}

/// One located schema error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaValidationError {
    pub file_path: String,
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub location: String,
    pub kind: SchemaErrorKind,
}

/// One located schema warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaValidationWarning {
    pub file_path: String,
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub location: String,
}

/// Schema outcome for one document or, merged, for a corpus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaValidationResult {
    pub is_valid: bool,
    pub errors: Vec<SchemaValidationError>,
    pub warnings: Vec<SchemaValidationWarning>,
    pub validated_files: Vec<String>,
}

impl SchemaValidationResult {
    /// Empty, valid result
    pub fn valid() -> Self {
        Self { is_valid: true, ..Default::default() }
    }

    /// Fold another result into this one
    pub fn merge(&mut self, other: SchemaValidationResult) {
        self.is_valid &= other.is_valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.validated_files.extend(other.validated_files);
    }
}

/// Stateless checker walking a document against its schema
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaValidator;

struct Pass<'a> {
    path: &'a str,
    errors: Vec<SchemaValidationError>,
    warnings: Vec<SchemaValidationWarning>,
}

impl Pass<'_> {
    fn error(&mut self, element: &Element, location: String, kind: SchemaErrorKind, message: String) {
        self.errors.push(SchemaValidationError {
            file_path: self.path.to_string(),
            message,
            line: element.line,
            column: element.column,
            location,
            kind,
        });
    }

    fn warning(&mut self, element: &Element, location: String, message: String) {
        self.warnings.push(SchemaValidationWarning {
            file_path: self.path.to_string(),
            message,
            line: element.line,
            column: element.column,
            location,
        });
    }

    fn check_element(&mut self, element: &Element, schema: &ElementSchema, locator: &str) {
        for attribute in &schema.attributes {
            match element.attr(&attribute.name) {
                None if attribute.required => self.error(
                    element,
                    attribute_locator(locator, &attribute.name),
                    SchemaErrorKind::MissingRequiredAttribute,
                    format!("Required attribute '{}' is missing", attribute.name),
                ),
                Some(value) if !attribute.value_type.accepts(value) => self.error(
                    element,
                    attribute_locator(locator, &attribute.name),
                    SchemaErrorKind::TypeMismatch,
                    format!("Attribute '{}' value '{}' is not a valid {}", attribute.name, value, attribute.value_type.name()),
                ),
                _ => {}
            }
        }
        for name in element.attributes.keys() {
            if schema.attribute(name).is_none() {
                self.warning(element, attribute_locator(locator, name), format!("Attribute '{name}' is not declared by the schema"));
            }
        }

        for declared in schema.children.iter().filter(|c| c.required) {
            if !element.children.iter().any(|c| c.name == declared.name) {
                self.error(
                    element,
                    locator.to_string(),
                    SchemaErrorKind::ElementNotFound,
                    format!("Required element '{}' is missing", declared.name),
                );
            }
        }

        for (child, child_locator) in element.children_with_locators(locator) {
            let Some(declared) = schema.child(&child.name) else {
                self.warning(child, child_locator, format!("Element '{}' is not declared by the schema", child.name));
                continue;
            };
            match &declared.content {
                ChildContent::Complex(nested) => self.check_element(child, nested, &child_locator),
                ChildContent::Simple(_) if !child.is_leaf() => self.error(
                    child,
                    child_locator,
                    SchemaErrorKind::InvalidValue,
                    format!("Element '{}' should hold a simple value", child.name),
                ),
                ChildContent::Simple(value_type) => {
                    if let Some(text) = child.text_value().filter(|t| !value_type.accepts(t)) {
                        self.error(
                            child,
                            child_locator,
                            SchemaErrorKind::TypeMismatch,
                            format!("Element '{}' value '{}' is not a valid {}", child.name, text, value_type.name()),
                        );
                    }
                }
            }
        }
    }
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a document against an already resolved schema
    pub fn validate(&self, document: &Document, resolution: &SchemaResolution) -> SchemaValidationResult {
        match resolution {
            SchemaResolution::Ready(schema) => self.validate_against(document, schema),
            SchemaResolution::LoadFailed(reason) => SchemaValidationResult {
                is_valid: false,
                errors: vec![SchemaValidationError {
                    file_path: document.path.clone(),
                    message: format!("Schema validation failed: {reason}"),
                    line: None,
                    column: None,
                    location: document.root_locator(),
                    kind: SchemaErrorKind::SchemaValidationError,
                }],
                warnings: Vec::new(),
                validated_files: vec![document.path.clone()],
            },
            SchemaResolution::Unavailable => SchemaValidationResult {
                is_valid: true,
                errors: Vec::new(),
                warnings: vec![SchemaValidationWarning {
                    file_path: document.path.clone(),
                    message: format!("No schema available for {}", document.root.name),
                    line: document.root.line,
                    column: document.root.column,
                    location: document.root_locator(),
                }],
                validated_files: vec![document.path.clone()],
            },
        }
    }

    /// Validate a document against `schema`
    pub fn validate_against(&self, document: &Document, schema: &Schema) -> SchemaValidationResult {
        let mut pass = Pass { path: &document.path, errors: Vec::new(), warnings: Vec::new() };
        let root = &document.root;
        let root_locator = document.root_locator();

        if root.name != schema.root {
            pass.error(
                root,
                root_locator,
                SchemaErrorKind::ElementNotFound,
                format!("Root element '{}' does not match schema root '{}'", root.name, schema.root),
            );
        } else {
            for (child, locator) in root.children_with_locators(&root_locator) {
                if child.name == schema.entity.name {
                    pass.check_element(child, &schema.entity, &locator);
                } else {
                    pass.warning(child, locator, format!("Element '{}' is not declared by the schema", child.name));
                }
            }
        }

        SchemaValidationResult {
            is_valid: pass.errors.is_empty(),
            errors: pass.errors,
            warnings: pass.warnings,
            validated_files: vec![document.path.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSchema, ChildSchema, ValueType, synthesize};
    use std::sync::Arc;

    fn item_schema() -> Schema {
        Schema {
            root: "Items".into(),
            entity: ElementSchema {
                name: "Item".into(),
                attributes: vec![
                    AttributeSchema { name: "id".into(), value_type: ValueType::String, required: true },
                    AttributeSchema { name: "weight".into(), value_type: ValueType::Decimal, required: false },
                ],
                children: vec![
                    ChildSchema { name: "Price".into(), content: ChildContent::Simple(ValueType::Integer), required: true },
                    ChildSchema {
                        name: "ItemComponent".into(),
                        content: ChildContent::Complex(ElementSchema {
                            name: "ItemComponent".into(),
                            attributes: vec![AttributeSchema { name: "slots".into(), value_type: ValueType::Integer, required: true }],
                            children: Vec::new(),
                        }),
                        required: false,
                    },
                ],
            },
            synthesized: false,
        }
    }

    #[test]
    fn test_conforming_document_is_valid() {
        let root = Element::new("Items").with_child(
            Element::new("Item")
                .with_attr("id", "sword")
                .with_attr("weight", "1.5")
                .with_child(Element::new("Price").with_text("12"))
                .with_child(Element::new("ItemComponent").with_attr("slots", "2")),
        );
        let result = SchemaValidator::new().validate_against(&Document::new("items.json", root), &item_schema());
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
        assert_eq!(result.validated_files, vec!["items.json"]);
    }

    #[test]
    fn test_located_errors() {
        let root = Element::new("Items").with_child(
            Element::new("Item")
                .at(4, 3)
                .with_attr("weight", "heavy")
                .with_attr("colour", "red")
                .with_child(Element::new("ItemComponent").with_attr("slots", "two"))
                .with_child(Element::new("Price").with_child(Element::new("Amount"))),
        );
        let result = SchemaValidator::new().validate_against(&Document::new("items.json", root), &item_schema());
        assert!(!result.is_valid);

        let kinds: Vec<(SchemaErrorKind, &str)> = result.errors.iter().map(|e| (e.kind, e.location.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (SchemaErrorKind::MissingRequiredAttribute, "/Items/Item[1]/@id"),
                (SchemaErrorKind::TypeMismatch, "/Items/Item[1]/@weight"),
                (SchemaErrorKind::TypeMismatch, "/Items/Item[1]/ItemComponent[1]/@slots"),
                (SchemaErrorKind::InvalidValue, "/Items/Item[1]/Price[1]"),
            ]
        );
        assert_eq!(result.errors[0].line, Some(4));
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].location, "/Items/Item[1]/@colour");
    }

    #[test]
    fn test_missing_required_child() {
        let root = Element::new("Items").with_child(Element::new("Item").with_attr("id", "a"));
        let result = SchemaValidator::new().validate_against(&Document::new("items.json", root), &item_schema());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, SchemaErrorKind::ElementNotFound);
        assert_eq!(result.errors[0].message, "Required element 'Price' is missing");
    }

    #[test]
    fn test_root_mismatch() {
        let result = SchemaValidator::new().validate_against(&Document::new("x.json", Element::new("items")), &item_schema());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, SchemaErrorKind::ElementNotFound);
    }

    #[test]
    fn test_load_failure_is_single_error() {
        let doc = Document::new("items.json", Element::new("Items"));
        let result = SchemaValidator::new().validate(&doc, &SchemaResolution::LoadFailed("bad file".into()));
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, SchemaErrorKind::SchemaValidationError);
        assert_eq!(result.errors[0].message, "Schema validation failed: bad file");
    }

    #[test]
    fn test_unavailable_schema_warns() {
        let doc = Document::new("items.json", Element::new("Items"));
        let result = SchemaValidator::new().validate(&doc, &SchemaResolution::Unavailable);
        assert!(result.is_valid);
        assert_eq!(result.warnings[0].message, "No schema available for Items");
    }

    #[test]
    fn test_synthesized_schema_flags_missing_attributes() {
        let root = Element::new("Items")
            .with_child(Element::new("Item").with_attr("id", "a").with_attr("value", "10"))
            .with_child(Element::new("Item").with_attr("id", "b"))
            .with_child(Element::new("Item").with_attr("id", "c").with_attr("value", "cheap"));
        let doc = Document::new("items.json", root);
        let schema = synthesize(&doc).unwrap();
        let result = SchemaValidator::new().validate(&doc, &SchemaResolution::Ready(Arc::new(schema)));
        let kinds: Vec<SchemaErrorKind> = result.errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![SchemaErrorKind::MissingRequiredAttribute, SchemaErrorKind::TypeMismatch]);
    }

    #[test]
    fn test_merge() {
        let mut total = SchemaValidationResult::valid();
        total.merge(SchemaValidationResult { is_valid: false, validated_files: vec!["a".into()], ..Default::default() });
        total.merge(SchemaValidationResult { is_valid: true, validated_files: vec!["b".into()], ..Default::default() });
        assert!(!total.is_valid);
        assert_eq!(total.validated_files, vec!["a", "b"]);
    }
}
