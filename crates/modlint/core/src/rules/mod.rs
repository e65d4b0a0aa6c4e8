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

//! # Rule Engine
//!
//! Business rules over entities read from documents. The rule set of a
//! declared type is derived once and cached; it merges four sources:
//!
//! 1. Baseline integrity rules shared by every entity
//! 2. Type specific predicates registered in [`builtin`]
//! 3. One rule per constraint declared on a member by the [`EntityCatalog`]
//! 4. One consistency rule per member that is only serialized under a
//!    condition: when the condition does not hold the member must keep its
//!    default value
//!
//! Rules are pure. Evaluation runs every rule against an entity and collects
//! all violations; a predicate that fails (or panics) is reported as a
//! violation of that rule instead of aborting the evaluation.

pub mod builtin;
pub mod catalog;
pub mod suggestions;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::DeclaredType;
use crate::document::Document;
use crate::error::RuleError;

pub use catalog::{Constraint, Entity, EntityCatalog, EntityShape, FieldValue, MemberKind, MemberSpec, StaticCatalog};
pub use suggestions::{FixAction, Suggestion, SuggestionKind, suggestion_for};

/// Broad area a rule protects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleCategory {
    BusinessLogic,
    DataIntegrity,
    Performance,
    Security,
    Consistency,
    Convention,
}

/// Severity of a rule violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

pub type Predicate = Arc<dyn Fn(&Entity) -> Result<bool, RuleError> + Send + Sync>;
pub type MessageBuilder = Arc<dyn Fn(&Entity) -> String + Send + Sync>;

/// A named, pure predicate over an entity
#[derive(Clone)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub category: RuleCategory,
    pub severity: RuleSeverity,
    /// Member the rule inspects, recorded in violation context
    pub member: Option<&'static str>,
    predicate: Predicate,
    message: MessageBuilder,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("severity", &self.severity)
            .finish()
    }
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: RuleCategory,
        severity: RuleSeverity,
        predicate: impl Fn(&Entity) -> Result<bool, RuleError> + Send + Sync + 'static,
        message: impl Fn(&Entity) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            severity,
            member: None,
            predicate: Arc::new(predicate),
            message: Arc::new(message),
        }
    }

    pub fn on_member(mut self, member: &'static str) -> Self {
        self.member = Some(member);
        self
    }

    /// Evaluate against one entity, returning a violation on failure
    pub fn evaluate(&self, entity: &Entity) -> Option<Violation> {
        let outcome = catch_unwind(AssertUnwindSafe(|| (self.predicate)(entity)))
            .unwrap_or_else(|_| Err(RuleError::Evaluation("predicate panicked".to_string())));
        match outcome {
            Ok(true) => None,
            Ok(false) => Some(self.violation(entity, (self.message)(entity), false)),
            Err(err) => Some(self.violation(entity, format!("Rule evaluation failed: {err}"), true)),
        }
    }

    fn violation(&self, entity: &Entity, message: String, evaluation_failed: bool) -> Violation {
        let mut context = BTreeMap::new();
        context.insert("entity_type".to_string(), entity.entity_type.to_string());
        context.insert("position".to_string(), entity.position.to_string());
        if let Some(id) = entity.id.as_ref().filter(|id| !id.is_empty()) {
            context.insert("entity_id".to_string(), id.clone());
        }
        if let Some(member) = self.member {
            context.insert("member".to_string(), member.to_string());
            if let Ok(Some(value)) = entity.value(member) {
                context.insert("value".to_string(), value.render());
            }
        }
        if evaluation_failed {
            context.insert("evaluation_failed".to_string(), "true".to_string());
        }
        Violation {
            rule_id: self.id.clone(),
            rule_name: self.name.clone(),
            category: self.category,
            severity: self.severity,
            entity_type: entity.entity_type,
            entity_id: entity.id.clone(),
            message,
            document: entity.document.clone(),
            location: entity.location.clone(),
            line: entity.line,
            column: entity.column,
            context,
        }
    }
}

/// One failed rule evaluation against one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub rule_name: String,
    pub category: RuleCategory,
    pub severity: RuleSeverity,
    pub entity_type: DeclaredType,
    pub entity_id: Option<String>,
    pub message: String,
    pub document: String,
    pub location: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub context: BTreeMap<String, String>,
}

/// Derives, caches and evaluates rule sets
pub struct RuleEngine {
    catalog: Arc<dyn EntityCatalog>,
    include_ranges: bool,
    cache: RwLock<HashMap<DeclaredType, Arc<[Rule]>>>,
}

impl fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEngine")
            .field("include_ranges", &self.include_ranges)
            .field("cached_types", &self.cache.read().len())
            .finish()
    }
}

impl RuleEngine {
    pub fn new(catalog: Arc<dyn EntityCatalog>) -> Self {
        Self { catalog, include_ranges: true, cache: RwLock::new(HashMap::new()) }
    }

    /// Include or drop range constraint rules
    pub fn with_value_ranges(mut self, enable: bool) -> Self {
        self.include_ranges = enable;
        self
    }

    /// Rule set of a type, derived on first use
    pub fn rules_for(&self, declared_type: DeclaredType) -> Arc<[Rule]> {
        if let Some(rules) = self.cache.read().get(&declared_type) {
            return Arc::clone(rules);
        }
        let rules: Arc<[Rule]> = self.derive(declared_type).into();
        debug!(%declared_type, count = rules.len(), "derived rule set");
        Arc::clone(self.cache.write().entry(declared_type).or_insert(rules))
    }

    /// Derive rule sets up front so evaluation only reads the cache
    pub fn prepare(&self, types: impl IntoIterator<Item = DeclaredType>) {
        for declared_type in types {
            self.rules_for(declared_type);
        }
    }

    pub fn cached_types(&self) -> usize {
        self.cache.read().len()
    }

    fn derive(&self, declared_type: DeclaredType) -> Vec<Rule> {
        let Some(shape) = self.catalog.shape(declared_type) else {
            return Vec::new();
        };
        let entity_name = declared_type.entity_name();

        let mut rules = builtin::baseline_rules();
        rules.extend(builtin::type_rules(declared_type));

        for member in &shape.members {
            for constraint in &member.constraints {
                if matches!(constraint, Constraint::Range { .. }) && !self.include_ranges {
                    continue;
                }
                rules.push(constraint_rule(entity_name, member, constraint));
            }
        }

        for member in shape.members.iter().filter(|m| m.should_serialize.is_some()) {
            if let Some(rule) = should_serialize_rule(entity_name, member) {
                rules.push(rule);
            }
        }
        rules
    }

    /// Read every entity element of a document into an [`Entity`]
    pub fn entities(&self, document: &Document) -> Vec<Entity> {
        let (Some(element_name), Some(shape)) = (document.declared_type.entity_element(), self.catalog.shape(document.declared_type)) else {
            return Vec::new();
        };
        document
            .root
            .children_with_locators(&document.root_locator())
            .into_iter()
            .filter(|(child, _)| child.name == element_name)
            .enumerate()
            .map(|(i, (child, locator))| Entity::from_element(document.declared_type, &shape, child, &document.path, &locator, i + 1))
            .collect()
    }

    /// Evaluate every rule against one entity
    pub fn evaluate(&self, entity: &Entity) -> Vec<Violation> {
        self.rules_for(entity.entity_type).iter().filter_map(|rule| rule.evaluate(entity)).collect()
    }

    /// Evaluate every entity of a document
    pub fn evaluate_document(&self, document: &Document) -> Vec<Violation> {
        self.entities(document).iter().flat_map(|entity| self.evaluate(entity)).collect()
    }

    /// Suggested fix for a violation, when one is known
    pub fn suggest(&self, violation: &Violation) -> Option<Suggestion> {
        suggestion_for(violation)
    }
}

fn constraint_rule(entity_name: &str, member: &MemberSpec, constraint: &Constraint) -> Rule {
    let id = format!("{entity_name}_{}_{}", member.name, constraint.label());
    let name = format!("{entity_name} {} {}", member.name, constraint.label().to_lowercase());
    let member_name = member.name;
    let message = constraint.format_message(member_name);
    let severity = match constraint {
        Constraint::Required => RuleSeverity::Error,
        Constraint::Range { .. } => RuleSeverity::Warning,
        Constraint::Pattern(_) => RuleSeverity::Info,
    };
    let category = match constraint {
        Constraint::Required => RuleCategory::DataIntegrity,
        Constraint::Range { .. } => RuleCategory::BusinessLogic,
        Constraint::Pattern(_) => RuleCategory::Convention,
    };

    let predicate: Box<dyn Fn(&Entity) -> Result<bool, RuleError> + Send + Sync> = match constraint.clone() {
        Constraint::Required => Box::new(move |entity: &Entity| Ok(entity.value(member_name)?.is_some_and(|v| !matches!(v, FieldValue::Text(t) if t.is_empty())))),
        Constraint::Range { min, max } => {
            Box::new(move |entity: &Entity| Ok(entity.number(member_name)?.is_none_or(|v| v >= min && v <= max)))
        }
        Constraint::Pattern(pattern) => {
            let compiled = Regex::new(pattern).map_err(|e| RuleError::Evaluation(format!("invalid pattern {pattern}: {e}")));
            Box::new(move |entity: &Entity| {
                let regex = compiled.as_ref().map_err(Clone::clone)?;
                Ok(match entity.value(member_name)? {
                    None => true,
                    Some(value) => regex.is_match(&value.render()),
                })
            })
        }
    };

    Rule::new(id, name, category, severity, predicate, move |_| message.clone()).on_member(member_name)
}

fn should_serialize_rule(entity_name: &str, member: &MemberSpec) -> Option<Rule> {
    let should_serialize = member.should_serialize?;
    let member_name = member.name;
    Some(
        Rule::new(
            format!("{entity_name}_{member_name}_ShouldSerialize"),
            format!("{entity_name} {member_name} serialization"),
            RuleCategory::Convention,
            RuleSeverity::Info,
            move |entity: &Entity| {
                if should_serialize(entity) {
                    return Ok(true);
                }
                Ok(entity.value(member_name)?.is_none_or(FieldValue::is_default))
            },
            move |_| format!("{member_name} should not be serialized"),
        )
        .on_member(member_name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Element;

    fn engine() -> RuleEngine {
        RuleEngine::new(Arc::new(StaticCatalog))
    }

    fn entity(declared_type: DeclaredType, element: Element) -> Entity {
        let shape = StaticCatalog.shape(declared_type).unwrap();
        Entity::from_element(declared_type, &shape, &element, "doc.json", "/root/x[1]", 1)
    }

    fn ids(violations: &[Violation]) -> Vec<&str> {
        violations.iter().map(|v| v.rule_id.as_str()).collect()
    }

    #[test]
    fn test_rule_set_is_derived_once() {
        let engine = engine();
        let first = engine.rules_for(DeclaredType::Items);
        let second = engine.rules_for(DeclaredType::Items);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.cached_types(), 1);

        let rule_ids: Vec<&str> = first.iter().map(|r| r.id.as_str()).collect();
        assert!(rule_ids.contains(&"Entity_IdRequired"));
        assert!(rule_ids.contains(&"Item_ComponentRequired"));
        assert!(rule_ids.contains(&"Item_weight_Range"));
        assert!(rule_ids.contains(&"Item_name_Required"));
        assert!(rule_ids.contains(&"Item_lod_atlas_index_ShouldSerialize"));
    }

    #[test]
    fn test_ranges_can_be_disabled() {
        let engine = engine().with_value_ranges(false);
        let rules = engine.rules_for(DeclaredType::Items);
        assert!(rules.iter().all(|r| !r.id.ends_with("_Range")));
    }

    #[test]
    fn test_unknown_type_has_no_rules() {
        assert!(engine().rules_for(DeclaredType::Unknown).is_empty());
    }

    #[test]
    fn test_blank_id_gives_one_error() {
        let engine = engine();
        let violations = engine.evaluate(&entity(DeclaredType::Skeletons, Element::new("skeleton").with_attr("id", "  ")));
        let errors: Vec<&Violation> = violations.iter().filter(|v| v.severity == RuleSeverity::Error).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule_id, "Entity_IdRequired");
        assert_eq!(errors[0].message, "id cannot be null or empty");
    }

    #[test]
    fn test_all_rules_run_without_short_circuit() {
        let element = Element::new("Item").with_attr("weight", "2000").with_attr("swing_speed", "500");
        let violations = engine().evaluate(&entity(DeclaredType::Items, element));
        assert_eq!(
            ids(&violations),
            vec!["Entity_IdRequired", "Item_ComponentRequired", "Item_name_Required", "Item_weight_Range", "Item_swing_speed_Range"]
        );
        let range = &violations[3];
        assert_eq!(range.severity, RuleSeverity::Warning);
        assert_eq!(range.message, "weight must be between 0 and 1000");
        assert_eq!(range.context.get("value").map(String::as_str), Some("2000"));
    }

    #[test]
    fn test_evaluation_failure_becomes_violation() {
        let element = Element::new("Item").with_attr("id", "axe").with_attr("name", "Axe").with_attr("weight", "heavy").with_child(Element::new("ItemComponent"));
        let violations = engine().evaluate(&entity(DeclaredType::Items, element));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_id, "Item_weight_Range");
        assert!(violations[0].message.starts_with("Rule evaluation failed: "));
        assert_eq!(violations[0].context.get("evaluation_failed").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_panicking_predicate_is_caught() {
        let rule = Rule::new("Test_Panics", "panics", RuleCategory::BusinessLogic, RuleSeverity::Error, |_| panic!("boom"), |_| String::new());
        let violation = rule.evaluate(&entity(DeclaredType::Skeletons, Element::new("skeleton"))).unwrap();
        assert_eq!(violation.message, "Rule evaluation failed: predicate panicked");
    }

    #[test]
    fn test_should_serialize_consistency() {
        let engine = engine();
        let without_mesh = Element::new("Item").with_attr("id", "a").with_attr("name", "A").with_attr("lod_atlas_index", "3").with_child(Element::new("ItemComponent"));
        let violations = engine.evaluate(&entity(DeclaredType::Items, without_mesh));
        assert_eq!(ids(&violations), vec!["Item_lod_atlas_index_ShouldSerialize"]);
        assert_eq!(violations[0].message, "lod_atlas_index should not be serialized");
        assert_eq!(violations[0].severity, RuleSeverity::Info);

        let with_mesh = Element::new("Item")
            .with_attr("id", "a")
            .with_attr("name", "A")
            .with_attr("mesh", "axe_mesh")
            .with_attr("lod_atlas_index", "3")
            .with_child(Element::new("ItemComponent"));
        assert!(engine.evaluate(&entity(DeclaredType::Items, with_mesh)).is_empty());
    }

    #[test]
    fn test_pattern_constraint() {
        let element = Element::new("NPCCharacter").with_attr("id", "guard").with_attr("name", "Guard").with_attr("occupation", "Soldier 2");
        let violations = engine().evaluate(&entity(DeclaredType::Characters, element));
        assert_eq!(ids(&violations), vec!["Character_occupation_Pattern"]);
        assert_eq!(violations[0].severity, RuleSeverity::Info);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let engine = engine();
        let target = entity(DeclaredType::CraftingPieces, Element::new("CraftingPiece").with_attr("id", "Blade 1").with_attr("length", "-2"));
        let first = serde_json::to_string(&engine.evaluate(&target)).unwrap();
        let second = serde_json::to_string(&engine.evaluate(&target)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_evaluate_document_reads_every_entity() {
        let doc = Document::new(
            "pieces.json",
            Element::new("CraftingPieces")
                .with_child(Element::new("CraftingPiece").with_attr("id", "a").with_attr("name", "A").with_attr("piece_type", "Blade").with_attr("length", "10"))
                .with_child(Element::new("CraftingPiece").with_attr("id", "b").with_attr("name", "B").with_attr("piece_type", "Spoon").with_attr("length", "0")),
        );
        let violations = engine().evaluate_document(&doc);
        assert_eq!(ids(&violations), vec!["CraftingPiece_PositiveLength", "CraftingPiece_ValidPieceType"]);
        assert!(violations.iter().all(|v| v.location == "/CraftingPieces/CraftingPiece[2]"));
        assert_eq!(violations[0].context.get("position").map(String::as_str), Some("2"));
    }
}
