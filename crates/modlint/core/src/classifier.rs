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

//! Document classification by root marker

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::Element;

/// Entity category a document declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeclaredType {
    CraftingPieces,
    Items,
    ActionTypes,
    ActionSets,
    CombatParameters,
    Skeletons,
    PhysicsMaterials,
    Monsters,
    Characters,
    Parties,
    Scenes,
    ModuleStrings,
    Sounds,
    MapIcons,
    Unknown,
}

struct TypeInfo {
    declared: DeclaredType,
    roots: &'static [&'static str],
    element: &'static str,
    entity: &'static str,
}

static TYPE_TABLE: &[TypeInfo] = &[
    TypeInfo { declared: DeclaredType::CraftingPieces, roots: &["CraftingPieces", "crafting_pieces"], element: "CraftingPiece", entity: "CraftingPiece" },
    TypeInfo { declared: DeclaredType::Items, roots: &["Items", "items"], element: "Item", entity: "Item" },
    TypeInfo { declared: DeclaredType::ActionTypes, roots: &["action_types"], element: "action", entity: "ActionType" },
    TypeInfo { declared: DeclaredType::ActionSets, roots: &["action_sets"], element: "action_set", entity: "ActionSet" },
    TypeInfo { declared: DeclaredType::CombatParameters, roots: &["combat_parameters"], element: "combat_parameter", entity: "CombatParameter" },
    TypeInfo { declared: DeclaredType::Skeletons, roots: &["skeletons"], element: "skeleton", entity: "Skeleton" },
    TypeInfo { declared: DeclaredType::PhysicsMaterials, roots: &["physics_materials"], element: "physics_material", entity: "PhysicsMaterial" },
    TypeInfo { declared: DeclaredType::Monsters, roots: &["monsters"], element: "monster", entity: "Monster" },
    TypeInfo { declared: DeclaredType::Characters, roots: &["characters", "NPCCharacters"], element: "NPCCharacter", entity: "Character" },
    TypeInfo { declared: DeclaredType::Parties, roots: &["parties"], element: "party", entity: "Party" },
    TypeInfo { declared: DeclaredType::Scenes, roots: &["scenes"], element: "scene", entity: "Scene" },
    TypeInfo { declared: DeclaredType::ModuleStrings, roots: &["strings"], element: "string", entity: "ModuleString" },
    TypeInfo { declared: DeclaredType::Sounds, roots: &["sounds"], element: "sound", entity: "Sound" },
    TypeInfo { declared: DeclaredType::MapIcons, roots: &["map_icons"], element: "map_icon", entity: "MapIcon" },
];

impl DeclaredType {
    /// Every known (non-`Unknown`) type
    pub fn known() -> impl Iterator<Item = DeclaredType> {
        TYPE_TABLE.iter().map(|info| info.declared)
    }

    fn info(self) -> Option<&'static TypeInfo> {
        TYPE_TABLE.iter().find(|info| info.declared == self)
    }

    /// Look a type up by its root marker name
    pub fn from_root_marker(name: &str) -> DeclaredType {
        TYPE_TABLE
            .iter()
            .find(|info| info.roots.contains(&name))
            .map(|info| info.declared)
            .unwrap_or(DeclaredType::Unknown)
    }

    /// Look a type up by the entity type name used in references (`Item`, `CraftingPiece`, ...)
    pub fn from_entity_name(name: &str) -> Option<DeclaredType> {
        TYPE_TABLE.iter().find(|info| info.entity == name).map(|info| info.declared)
    }

    /// Canonical root marker
    pub fn root_marker(self) -> Option<&'static str> {
        self.info().map(|info| info.roots[0])
    }

    /// Name of the element declaring one entity of this type
    pub fn entity_element(self) -> Option<&'static str> {
        self.info().map(|info| info.element)
    }

    /// Entity type name used in reference prefixes and rule ids
    pub fn entity_name(self) -> &'static str {
        self.info().map(|info| info.entity).unwrap_or("Unknown")
    }

    pub fn is_known(self) -> bool {
        self != DeclaredType::Unknown
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity_name())
    }
}

/// Determine the declared type of a parsed tree from its root marker
pub fn classify(root: &Element) -> DeclaredType {
    DeclaredType::from_root_marker(&root.name)
}
