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

//! Fix suggestions for well known violations
//!
//! Suggestions are descriptive. A [`FixAction`] names the member to change
//! and the proposed value; nothing in the engine applies it.

use serde::{Deserialize, Serialize};

use crate::rules::Violation;
use crate::rules::builtin::{ID_FORMAT, ID_REQUIRED, POSITIVE_LENGTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuggestionKind {
    FixMissingValue,
    AdjustRange,
    NormalizeFormat,
    RemoveRedundancy,
    OptimizeStructure,
}

/// Proposed member change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixAction {
    pub member: String,
    pub proposed_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub title: String,
    pub description: String,
    pub kind: SuggestionKind,
    pub can_auto_fix: bool,
    /// Between 0 and 1
    pub confidence: f32,
    pub fix: Option<FixAction>,
}

/// Map a violation to a suggestion; unknown rule ids have none
pub fn suggestion_for(violation: &Violation) -> Option<Suggestion> {
    match violation.rule_id.as_str() {
        ID_REQUIRED => {
            let position = violation.context.get("position").map(String::as_str).unwrap_or("1");
            let proposed = format!("{}_{position}", violation.entity_type.entity_name().to_lowercase());
            Some(Suggestion {
                id: "GenerateId".to_string(),
                title: "Generate identifier".to_string(),
                description: format!("Assign the identifier '{proposed}' to the entity at {}", violation.location),
                kind: SuggestionKind::FixMissingValue,
                can_auto_fix: true,
                confidence: 0.9,
                fix: Some(FixAction { member: "id".to_string(), proposed_value: proposed }),
            })
        }
        POSITIVE_LENGTH => Some(Suggestion {
            id: "SetPositiveLength".to_string(),
            title: "Set a positive length".to_string(),
            description: format!("Replace the length at {} with a positive value", violation.location),
            kind: SuggestionKind::AdjustRange,
            can_auto_fix: true,
            confidence: 0.8,
            fix: Some(FixAction { member: "length".to_string(), proposed_value: "1".to_string() }),
        }),
        ID_FORMAT => {
            let current = violation.entity_id.as_deref()?;
            let proposed = normalize_id(current);
            Some(Suggestion {
                id: "NormalizeId".to_string(),
                title: "Normalize identifier".to_string(),
                description: format!("Rename '{current}' to '{proposed}'"),
                kind: SuggestionKind::NormalizeFormat,
                can_auto_fix: true,
                confidence: 0.7,
                fix: Some(FixAction { member: "id".to_string(), proposed_value: proposed }),
            })
        }
        _ => None,
    }
}

/// Lowercase an id and replace characters outside the allowed set with `_`
pub fn normalize_id(id: &str) -> String {
    let mut normalized: String = id
        .trim()
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') { c } else { '_' })
        .collect();
    if !normalized.chars().any(|c| c.is_ascii_lowercase()) {
        normalized.insert_str(0, "id_");
    }
    normalized
}
