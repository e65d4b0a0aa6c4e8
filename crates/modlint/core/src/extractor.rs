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

//! # Reference Extraction
//!
//! Walks a classified document and lists the symbolic references it makes
//! into other entities. Each declared type has a static strategy: a table of
//! reference slots naming the element and attribute that hold a reference,
//! the entity type it points at and how strongly it binds.
//!
//! Reference values are either bare identifiers (`iron_sword`) or carry an
//! entity type prefix (`Item.iron_sword`). A known prefix overrides the
//! slot's target type. Slots with `Many` cardinality hold comma separated
//! lists.
//!
//! Extraction is total: empty values, unknown prefixes and empty list
//! entries produce no reference and are otherwise ignored.

use serde::{Deserialize, Serialize};

use crate::classifier::DeclaredType;
use crate::document::{Document, attribute_locator};

/// How many targets a reference slot may name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    One,
    Many,
}

/// Whether the reference sits on the entity element or below it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Directness {
    Direct,
    Indirect,
}

/// Coarse classification of a reference for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceCategory {
    Direct,
    Indirect,
    Collection,
}

/// One symbolic reference found in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedReference {
    /// Path of the document holding the reference
    pub source_document: String,
    /// Locator of the attribute holding the reference
    pub location: String,
    /// Entity type the reference expects
    pub target_type: DeclaredType,
    /// Identifier of the referenced entity
    pub target_id: String,
    pub required: bool,
    pub cardinality: Cardinality,
    pub directness: Directness,
}

impl ExtractedReference {
    pub fn category(&self) -> ReferenceCategory {
        match (self.cardinality, self.directness) {
            (Cardinality::Many, _) => ReferenceCategory::Collection,
            (Cardinality::One, Directness::Direct) => ReferenceCategory::Direct,
            (Cardinality::One, Directness::Indirect) => ReferenceCategory::Indirect,
        }
    }

    /// Human readable `Type.id` form
    pub fn describe(&self) -> String {
        format!("{}.{}", self.target_type, self.target_id)
    }
}

/// An entity declared by a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredEntity {
    pub entity_type: DeclaredType,
    pub id: String,
    pub document: String,
    pub location: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// Static description of where a type keeps one kind of reference
#[derive(Debug, Clone, Copy)]
pub struct ReferenceSlot {
    pub element: &'static str,
    pub attribute: &'static str,
    pub target: DeclaredType,
    pub required: bool,
    pub cardinality: Cardinality,
    pub directness: Directness,
}

const fn slot(
    element: &'static str,
    attribute: &'static str,
    target: DeclaredType,
    required: bool,
    cardinality: Cardinality,
    directness: Directness,
) -> ReferenceSlot {
    ReferenceSlot { element, attribute, target, required, cardinality, directness }
}

use Cardinality::{Many, One};
use DeclaredType as T;
use Directness::{Direct, Indirect};

static CRAFTING_PIECE_SLOTS: &[ReferenceSlot] = &[slot("BladeData", "physics_material", T::PhysicsMaterials, false, One, Indirect)];

static ITEM_SLOTS: &[ReferenceSlot] = &[
    slot("Piece", "id", T::CraftingPieces, true, One, Indirect),
    slot("Weapon", "physics_material", T::PhysicsMaterials, false, One, Indirect),
    slot("Item", "action_set", T::ActionSets, false, One, Direct),
];

static ACTION_SET_SLOTS: &[ReferenceSlot] = &[
    slot("action_set", "skeleton", T::Skeletons, true, One, Direct),
    slot("action", "type", T::ActionTypes, false, One, Indirect),
];

static COMBAT_PARAMETER_SLOTS: &[ReferenceSlot] =
    &[slot("combat_parameter", "collision_material", T::PhysicsMaterials, false, One, Direct)];

static MONSTER_SLOTS: &[ReferenceSlot] = &[
    slot("monster", "skeleton", T::Skeletons, true, One, Direct),
    slot("monster", "action_set", T::ActionSets, true, One, Direct),
    slot("monster", "female_action_set", T::ActionSets, false, One, Direct),
];

static CHARACTER_SLOTS: &[ReferenceSlot] = &[
    slot("NPCCharacter", "skeleton", T::Skeletons, false, One, Direct),
    slot("NPCCharacter", "monster", T::Monsters, false, One, Direct),
    slot("equipment", "id", T::Items, true, One, Indirect),
    slot("upgrade_target", "id", T::Characters, false, One, Indirect),
];

static PARTY_SLOTS: &[ReferenceSlot] = &[
    slot("party", "leader", T::Characters, false, One, Direct),
    slot("troop", "id", T::Characters, true, One, Indirect),
];

static SCENE_SLOTS: &[ReferenceSlot] = &[
    slot("scene", "map_icon", T::MapIcons, false, One, Direct),
    slot("scene", "sounds", T::Sounds, false, Many, Direct),
];

static MAP_ICON_SLOTS: &[ReferenceSlot] = &[slot("map_icon", "sound", T::Sounds, false, One, Direct)];

/// Reference slots registered for a declared type
pub fn strategy_for(declared_type: DeclaredType) -> &'static [ReferenceSlot] {
    match declared_type {
        T::CraftingPieces => CRAFTING_PIECE_SLOTS,
        T::Items => ITEM_SLOTS,
        T::ActionSets => ACTION_SET_SLOTS,
        T::CombatParameters => COMBAT_PARAMETER_SLOTS,
        T::Monsters => MONSTER_SLOTS,
        T::Characters => CHARACTER_SLOTS,
        T::Parties => PARTY_SLOTS,
        T::Scenes => SCENE_SLOTS,
        T::MapIcons => MAP_ICON_SLOTS,
        T::ActionTypes | T::Skeletons | T::PhysicsMaterials | T::ModuleStrings | T::Sounds | T::Unknown => &[],
    }
}

/// Resolve one raw reference token into its target type and identifier
fn parse_target(raw: &str, slot_target: DeclaredType) -> Option<(DeclaredType, String)> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some((prefix, id)) = raw.split_once('.') {
        if let Some(prefixed) = DeclaredType::from_entity_name(prefix) {
            let id = id.trim();
            return (!id.is_empty()).then(|| (prefixed, id.to_string()));
        }
        // Capitalized prefixes are meant as type names; an unknown one is malformed
        if prefix.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
            return None;
        }
    }
    Some((slot_target, raw.to_string()))
}

/// List every reference the document makes, in document order
pub fn extract_references(document: &Document) -> Vec<ExtractedReference> {
    let slots = strategy_for(document.declared_type);
    if slots.is_empty() {
        return Vec::new();
    }

    let mut references = Vec::new();
    document.root.walk(&mut |element, locator| {
        for slot in slots.iter().filter(|s| s.element == element.name) {
            let Some(raw) = element.attr(slot.attribute) else {
                continue;
            };
            let location = attribute_locator(locator, slot.attribute);
            let tokens: Vec<&str> = match slot.cardinality {
                Cardinality::One => vec![raw],
                Cardinality::Many => raw.split(',').collect(),
            };
            for token in tokens {
                if let Some((target_type, target_id)) = parse_target(token, slot.target) {
                    references.push(ExtractedReference {
                        source_document: document.path.clone(),
                        location: location.clone(),
                        target_type,
                        target_id,
                        required: slot.required,
                        cardinality: slot.cardinality,
                        directness: slot.directness,
                    });
                }
            }
        }
    });
    references
}

/// List the entities a document declares
pub fn declared_entities(document: &Document) -> Vec<DeclaredEntity> {
    let Some(element_name) = document.declared_type.entity_element() else {
        return Vec::new();
    };
    document
        .root
        .children_with_locators(&document.root_locator())
        .into_iter()
        .filter(|(child, _)| child.name == element_name)
        .filter_map(|(child, location)| {
            let id = child.attr("id").map(str::trim).filter(|id| !id.is_empty())?;
            Some(DeclaredEntity {
                entity_type: document.declared_type,
                id: id.to_string(),
                document: document.path.clone(),
                location,
                line: child.line,
                column: child.column,
            })
        })
        .collect()
}
