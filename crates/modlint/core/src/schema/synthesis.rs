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

//! Schema synthesis from a document's own structure
//!
//! The first representative entity element is taken as the template. Its
//! attributes become required attributes of the inferred type; nested
//! attributes are optional. Child elements that have children of their own
//! become complex declarations, the rest become simple typed values.

use crate::document::{Document, Element};
use crate::schema::{AttributeSchema, ChildContent, ChildSchema, ElementSchema, Schema, ValueType};

/// Infer a schema for `document`, or `None` when it has no entity to learn from
pub fn synthesize(document: &Document) -> Option<Schema> {
    let template = representative(document)?;
    Some(Schema { root: document.root.name.clone(), entity: element_schema(template, true), synthesized: true })
}

fn representative(document: &Document) -> Option<&Element> {
    match document.declared_type.entity_element() {
        Some(name) => document.root.children.iter().find(|c| c.name == name),
        None => document.root.children.first(),
    }
}

fn element_schema(element: &Element, top_level: bool) -> ElementSchema {
    let attributes = element
        .attributes
        .iter()
        .map(|(name, value)| AttributeSchema { name: name.clone(), value_type: ValueType::infer(value), required: top_level })
        .collect();

    let mut children: Vec<ChildSchema> = Vec::new();
    for child in &element.children {
        if children.iter().any(|c| c.name == child.name) {
            continue;
        }
        let content = if !child.is_leaf() {
            ChildContent::Complex(element_schema(child, false))
        } else if let Some(text) = child.text_value() {
            ChildContent::Simple(ValueType::infer(text))
        } else {
            ChildContent::Simple(ValueType::String)
        };
        children.push(ChildSchema { name: child.name.clone(), content, required: false });
    }

    ElementSchema { name: element.name.clone(), attributes, children }
}
