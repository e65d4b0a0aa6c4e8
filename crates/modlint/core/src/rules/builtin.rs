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

//! Baseline and type specific rules

use regex::Regex;

use crate::classifier::DeclaredType;
use crate::error::RuleError;
use crate::rules::{Rule, RuleCategory, RuleSeverity};

pub const ID_REQUIRED: &str = "Entity_IdRequired";
pub const ID_FORMAT: &str = "Entity_IdFormat";
pub const POSITIVE_LENGTH: &str = "CraftingPiece_PositiveLength";
pub const VALID_PIECE_TYPE: &str = "CraftingPiece_ValidPieceType";
pub const ITEM_COMPONENT_REQUIRED: &str = "Item_ComponentRequired";

const ID_PATTERN: &str = r"^[a-z0-9_.\-]*[a-z][a-z0-9_.\-]*$";
const PIECE_TYPES: &[&str] = &["Blade", "Guard", "Handle", "Pommel"];

/// Rules every entity is checked against
pub fn baseline_rules() -> Vec<Rule> {
    let id_pattern = Regex::new(ID_PATTERN).map_err(|e| RuleError::Evaluation(e.to_string()));
    vec![
        Rule::new(
            ID_REQUIRED,
            "Identifier required",
            RuleCategory::DataIntegrity,
            RuleSeverity::Error,
            |entity| Ok(entity.has_id()),
            |_| "id cannot be null or empty".to_string(),
        ),
        Rule::new(
            ID_FORMAT,
            "Identifier format",
            RuleCategory::Convention,
            RuleSeverity::Warning,
            move |entity| {
                let regex = id_pattern.as_ref().map_err(Clone::clone)?;
                // Blank ids are reported by the required rule
                Ok(entity.id.as_deref().filter(|id| !id.is_empty()).is_none_or(|id| regex.is_match(id)))
            },
            |entity| {
                format!(
                    "id '{}' should use lowercase letters, digits, '_', '.' or '-' and contain a letter",
                    entity.id.as_deref().unwrap_or_default()
                )
            },
        ),
    ]
}

/// Predicates registered for specific declared types
pub fn type_rules(declared_type: DeclaredType) -> Vec<Rule> {
    match declared_type {
        DeclaredType::CraftingPieces => vec![
            Rule::new(
                POSITIVE_LENGTH,
                "Positive piece length",
                RuleCategory::DataIntegrity,
                RuleSeverity::Error,
                |entity| Ok(entity.number("length")?.is_none_or(|length| length > 0.0)),
                |_| "CraftingPiece length must be positive".to_string(),
            )
            .on_member("length"),
            Rule::new(
                VALID_PIECE_TYPE,
                "Known piece type",
                RuleCategory::BusinessLogic,
                RuleSeverity::Error,
                |entity| Ok(entity.text("piece_type").is_none_or(|t| t.is_empty() || PIECE_TYPES.contains(&t))),
                |entity| {
                    format!("Piece type '{}' is not one of {}", entity.text("piece_type").unwrap_or_default(), PIECE_TYPES.join(", "))
                },
            )
            .on_member("piece_type"),
        ],
        DeclaredType::Items => vec![Rule::new(
            ITEM_COMPONENT_REQUIRED,
            "Item component present",
            RuleCategory::BusinessLogic,
            RuleSeverity::Warning,
            |entity| Ok(entity.has_child("ItemComponent")),
            |entity| format!("Item '{}' does not declare an ItemComponent", entity.id.as_deref().unwrap_or_default()),
        )],
        _ => Vec::new(),
    }
}
