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

//! Entity shapes and entity instances
//!
//! An [`EntityCatalog`] describes, per declared type, the members an entity
//! has, the constraints declared on them and which members are only
//! serialized under a condition. [`Entity::from_element`] reads an entity
//! element into typed member values following that shape.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::classifier::DeclaredType;
use crate::document::Element;
use crate::error::RuleError;
use crate::schema::{parse_bool, parse_decimal};

/// Primitive kind of an entity member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberKind {
    Text,
    Integer,
    Decimal,
    Boolean,
}

/// Typed member value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
}

impl FieldValue {
    fn parse(kind: MemberKind, raw: &str) -> Option<FieldValue> {
        let raw = raw.trim();
        match kind {
            MemberKind::Text => Some(FieldValue::Text(raw.to_string())),
            MemberKind::Integer => raw.parse().ok().map(FieldValue::Integer),
            MemberKind::Decimal => parse_decimal(raw).map(FieldValue::Decimal),
            MemberKind::Boolean => parse_bool(raw).map(FieldValue::Boolean),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    /// True when the value equals the default of its kind
    pub fn is_default(&self) -> bool {
        match self {
            FieldValue::Text(v) => v.is_empty(),
            FieldValue::Integer(v) => *v == 0,
            FieldValue::Decimal(v) => *v == 0.0,
            FieldValue::Boolean(v) => !*v,
        }
    }

    pub fn render(&self) -> String {
        match self {
            FieldValue::Text(v) => v.clone(),
            FieldValue::Integer(v) => v.to_string(),
            FieldValue::Decimal(v) => v.to_string(),
            FieldValue::Boolean(v) => v.to_string(),
        }
    }
}

/// Constraint declared on a member
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Required,
    Range { min: f64, max: f64 },
    Pattern(&'static str),
}

impl Constraint {
    /// Suffix used in derived rule ids
    pub fn label(&self) -> &'static str {
        match self {
            Constraint::Required => "Required",
            Constraint::Range { .. } => "Range",
            Constraint::Pattern(_) => "Pattern",
        }
    }

    /// Failure message for `member`
    pub fn format_message(&self, member: &str) -> String {
        match self {
            Constraint::Required => format!("{member} is required"),
            Constraint::Range { min, max } if max.is_infinite() => format!("{member} must be at least {min}"),
            Constraint::Range { min, max } => format!("{member} must be between {min} and {max}"),
            Constraint::Pattern(pattern) => format!("{member} must match the pattern {pattern}"),
        }
    }
}

/// Predicate deciding whether a member should be serialized for an entity
pub type ShouldSerialize = fn(&Entity) -> bool;

/// One declared member of an entity shape
#[derive(Debug, Clone)]
pub struct MemberSpec {
    pub name: &'static str,
    pub kind: MemberKind,
    pub constraints: Vec<Constraint>,
    pub should_serialize: Option<ShouldSerialize>,
}

impl MemberSpec {
    pub fn new(name: &'static str, kind: MemberKind) -> Self {
        Self { name, kind, constraints: Vec::new(), should_serialize: None }
    }

    pub fn required(mut self) -> Self {
        self.constraints.push(Constraint::Required);
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.constraints.push(Constraint::Range { min, max });
        self
    }

    pub fn minimum(mut self, min: f64) -> Self {
        self.constraints.push(Constraint::Range { min, max: f64::INFINITY });
        self
    }

    pub fn pattern(mut self, pattern: &'static str) -> Self {
        self.constraints.push(Constraint::Pattern(pattern));
        self
    }

    pub fn serialized_when(mut self, predicate: ShouldSerialize) -> Self {
        self.should_serialize = Some(predicate);
        self
    }
}

/// Declared members of one entity type
#[derive(Debug, Clone, Default)]
pub struct EntityShape {
    pub members: Vec<MemberSpec>,
}

impl EntityShape {
    pub fn member(&self, name: &str) -> Option<&MemberSpec> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// An entity read from a document
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub entity_type: DeclaredType,
    /// Raw `id` attribute, trimmed
    pub id: Option<String>,
    pub document: String,
    pub location: String,
    /// 1-based position among the document's entity elements
    pub position: usize,
    pub line: Option<u32>,
    pub column: Option<u32>,
    members: BTreeMap<String, FieldValue>,
    invalid: BTreeMap<String, String>,
    children: BTreeSet<String>,
}

impl Entity {
    /// Read `element` following `shape`
    ///
    /// Member values come from the attribute of the same name or, failing
    /// that, from the text of a simple child element of the same name.
    /// Values that do not parse as the member kind are kept aside and
    /// surface as evaluation failures when a rule reads them.
    pub fn from_element(
        entity_type: DeclaredType,
        shape: &EntityShape,
        element: &Element,
        document: &str,
        location: &str,
        position: usize,
    ) -> Self {
        let mut members = BTreeMap::new();
        let mut invalid = BTreeMap::new();
        for spec in &shape.members {
            let raw = element.attr(spec.name).map(str::to_string).or_else(|| {
                element.children.iter().find(|c| c.name == spec.name && c.is_leaf()).and_then(|c| c.text_value().map(str::to_string))
            });
            let Some(raw) = raw else { continue };
            match FieldValue::parse(spec.kind, &raw) {
                Some(value) => {
                    members.insert(spec.name.to_string(), value);
                }
                None => {
                    invalid.insert(spec.name.to_string(), raw);
                }
            }
        }
        Self {
            entity_type,
            id: element.attr("id").map(|id| id.trim().to_string()),
            document: document.to_string(),
            location: location.to_string(),
            position,
            line: element.line,
            column: element.column,
            members,
            invalid,
            children: element.children.iter().map(|c| c.name.clone()).collect(),
        }
    }

    /// Member value, or an error when the raw value did not parse
    pub fn value(&self, member: &str) -> Result<Option<&FieldValue>, RuleError> {
        if let Some(raw) = self.invalid.get(member) {
            return Err(RuleError::InvalidValue { member: member.to_string(), raw: raw.clone(), expected: "value of the declared kind".to_string() });
        }
        Ok(self.members.get(member))
    }

    /// Numeric member value
    pub fn number(&self, member: &str) -> Result<Option<f64>, RuleError> {
        match self.value(member)? {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| RuleError::InvalidValue { member: member.to_string(), raw: value.render(), expected: "number".to_string() }),
        }
    }

    /// Text member value, if present
    pub fn text(&self, member: &str) -> Option<&str> {
        match self.members.get(member) {
            Some(FieldValue::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Whether the entity element has a child element named `name`
    pub fn has_child(&self, name: &str) -> bool {
        self.children.contains(name)
    }

    /// Whether a non-empty `id` is present
    pub fn has_id(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// Collaborator describing entity shapes and type specific predicates
pub trait EntityCatalog: Send + Sync {
    /// Shape of the entity type declared by documents of `declared_type`
    fn shape(&self, declared_type: DeclaredType) -> Option<EntityShape>;
}

/// Catalog of the built-in entity types
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticCatalog;

fn item_has_mesh(entity: &Entity) -> bool {
    entity.text("mesh").is_some_and(|mesh| !mesh.is_empty())
}

fn character_has_upgrades(entity: &Entity) -> bool {
    entity.has_child("upgrade_targets")
}

impl EntityCatalog for StaticCatalog {
    fn shape(&self, declared_type: DeclaredType) -> Option<EntityShape> {
        use MemberKind::{Boolean, Decimal, Integer, Text};

        let members = match declared_type {
            DeclaredType::CraftingPieces => vec![
                MemberSpec::new("name", Text).required(),
                MemberSpec::new("piece_type", Text).required(),
                MemberSpec::new("length", Decimal),
                MemberSpec::new("weight", Decimal).range(0.0, 1000.0),
                MemberSpec::new("difficulty", Integer).range(0.0, 300.0),
                MemberSpec::new("is_hidden", Boolean),
            ],
            DeclaredType::Items => vec![
                MemberSpec::new("name", Text).required(),
                MemberSpec::new("mesh", Text),
                MemberSpec::new("weight", Decimal).range(0.0, 1000.0),
                MemberSpec::new("value", Integer).minimum(0.0),
                MemberSpec::new("swing_damage", Integer).range(0.0, 1000.0),
                MemberSpec::new("thrust_damage", Integer).range(0.0, 1000.0),
                MemberSpec::new("swing_speed", Integer).range(0.0, 200.0),
                MemberSpec::new("thrust_speed", Integer).range(0.0, 200.0),
                MemberSpec::new("lod_atlas_index", Integer).serialized_when(item_has_mesh),
            ],
            DeclaredType::Characters => vec![
                MemberSpec::new("name", Text).required(),
                MemberSpec::new("level", Integer).range(1.0, 62.0),
                MemberSpec::new("occupation", Text).pattern("^[A-Za-z]+$"),
                MemberSpec::new("upgrade_requires", Text).serialized_when(character_has_upgrades),
            ],
            DeclaredType::CombatParameters => vec![
                MemberSpec::new("damage_multiplier", Decimal).range(0.0, 10.0),
                MemberSpec::new("speed_multiplier", Decimal).range(0.0, 10.0),
            ],
            DeclaredType::ModuleStrings => vec![MemberSpec::new("text", Text).required()],
            DeclaredType::Unknown => return None,
            _ => Vec::new(),
        };
        Some(EntityShape { members })
    }
}
