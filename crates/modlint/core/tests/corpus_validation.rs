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

//! End to end validation of small corpora

use modlint_core::report::RecommendationPriority;
use modlint_core::schema::{AttributeSchema, ElementSchema, ValueType};
use modlint_core::{
    CancellationToken, DeclaredType, Element, IssueCategory, IssueSeverity, MemoryLoader, OverallStatus, ReferenceErrorKind, ReportFormat, Schema,
    SchemaSource, ValidationOrchestrator, ValidationSettings, create_file_orchestrator, format_report, generate_report,
};
use std::sync::Arc;

fn item(id: &str) -> Element {
    Element::new("Item").with_attr("id", id).with_attr("name", "Item").with_attr("weight", "2.5").with_child(Element::new("ItemComponent"))
}

fn items(ids: &[&str]) -> Element {
    ids.iter().fold(Element::new("Items"), |root, id| root.with_child(item(id)))
}

fn guard(equipment: &str) -> Element {
    Element::new("characters").with_child(
        Element::new("NPCCharacter")
            .with_attr("id", "guard")
            .with_attr("name", "Guard")
            .with_attr("level", "12")
            .with_child(Element::new("Equipments").with_child(Element::new("equipment").with_attr("id", equipment))),
    )
}

fn paths(values: &[&str]) -> Vec<String> {
    values.iter().map(|p| p.to_string()).collect()
}

#[test]
fn test_broken_reference_is_reported_once() {
    let loader = MemoryLoader::new().with_document("characters.json", guard("missing_42")).with_document("items.json", items(&["sword"]));
    let orchestrator = ValidationOrchestrator::new(Arc::new(loader));

    let result = orchestrator.validate_corpus(&paths(&["items.json", "characters.json"]));
    let references = result.references.as_ref().unwrap();
    assert!(!references.is_valid);
    assert_eq!(references.broken_reference_count, 1);
    let broken = &references.broken_references[0];
    assert_eq!(broken.kind, ReferenceErrorKind::ObjectNotFound);
    assert_eq!(broken.target_type, DeclaredType::Items);
    assert_eq!(broken.target_id, "missing_42");
    assert_eq!(broken.source_document, "characters.json");
    assert_eq!(broken.location, "/characters/NPCCharacter[1]/Equipments[1]/equipment[1]/@id");
    assert_eq!(result.overall_status, OverallStatus::Failed);

    let report = orchestrator.generate_report(&result);
    assert_eq!(report.summary.broken_references, 1);
    assert_eq!(report.file_reports[0].file_path, "characters.json");
    assert_eq!(report.file_reports[0].error_count, 1);
    assert_eq!(report.recommendations[0].priority, RecommendationPriority::High);
}

#[test]
fn test_resolved_reference_passes() {
    let loader = MemoryLoader::new().with_document("characters.json", guard("sword")).with_document("items.json", items(&["sword"]));
    let orchestrator = ValidationOrchestrator::new(Arc::new(loader));

    let result = orchestrator.validate_corpus(&paths(&["characters.json", "items.json"]));
    assert_eq!(result.references.as_ref().unwrap().broken_reference_count, 0);
    assert_eq!(result.overall_status, OverallStatus::Passed);
    assert!(result.is_complete);
}

#[test]
fn test_blank_id_yields_one_rule_error() {
    let loader = MemoryLoader::new().with_document("items.json", items(&[""]));
    let orchestrator = ValidationOrchestrator::new(Arc::new(loader));

    let result = orchestrator.validate_corpus(&paths(&["items.json"]));
    let document = &result.documents["items.json"];
    let rule_errors: Vec<_> = document.errors.iter().filter(|e| e.category == IssueCategory::Rule).collect();
    assert_eq!(rule_errors.len(), 1);
    assert_eq!(rule_errors[0].code, "Entity_IdRequired");
    assert_eq!(rule_errors[0].message, "id cannot be null or empty");
    assert_eq!(rule_errors[0].severity, IssueSeverity::Error);

    let suggestion = rule_errors[0].suggestion.as_ref().unwrap();
    assert!(suggestion.can_auto_fix);
    assert_eq!(suggestion.fix.as_ref().unwrap().proposed_value, "item_1");
    assert_eq!(result.overall_status, OverallStatus::Failed);
}

#[test]
fn test_range_violation_is_a_warning() {
    let root = Element::new("Items").with_child(item("anvil").with_attr("weight", "5000"));
    let orchestrator = ValidationOrchestrator::new(Arc::new(MemoryLoader::new().with_document("items.json", root)));

    let result = orchestrator.validate_document("items.json");
    assert!(result.is_valid);
    let warning = result.warnings.iter().find(|w| w.code == "Item_weight_Range").unwrap();
    assert_eq!(warning.message, "weight must be between 0 and 1000");
    assert_eq!(warning.context["value"], "5000");

    let without_ranges =
        ValidationOrchestrator::new(Arc::new(MemoryLoader::new().with_document("items.json", Element::new("Items").with_child(item("anvil").with_attr("weight", "5000")))))
            .with_settings(ValidationSettings::default().with_value_ranges(false));
    assert!(without_ranges.validate_document("items.json").warnings.iter().all(|w| w.code != "Item_weight_Range"));
}

#[test]
fn test_registered_schema_is_enforced() {
    let loader = MemoryLoader::new().with_document("items.json", items(&["sword"]));
    let orchestrator = ValidationOrchestrator::new(Arc::new(loader));
    let schema = Schema {
        root: "Items".to_string(),
        entity: ElementSchema {
            name: "Item".to_string(),
            attributes: vec![
                AttributeSchema { name: "id".to_string(), value_type: ValueType::String, required: true },
                AttributeSchema { name: "rarity".to_string(), value_type: ValueType::Integer, required: true },
            ],
            children: Vec::new(),
        },
        synthesized: false,
    };
    orchestrator.register_schema(DeclaredType::Items, SchemaSource::Inline(schema));

    let result = orchestrator.validate_corpus(&paths(&["items.json"]));
    let schema_result = result.schema.as_ref().unwrap();
    assert!(!schema_result.is_valid);
    assert_eq!(schema_result.errors.len(), 1);
    assert_eq!(schema_result.errors[0].message, "Required attribute 'rarity' is missing");
    // name, weight and ItemComponent are not declared
    assert_eq!(schema_result.warnings.len(), 3);

    assert!(orchestrator.unregister_schema(DeclaredType::Items));
    let result = orchestrator.validate_corpus(&paths(&["items.json"]));
    assert!(result.schema.as_ref().unwrap().is_valid);
}

#[test]
fn test_unreadable_schema_is_a_single_error() {
    let loader = MemoryLoader::new().with_document("items.json", items(&["sword", "shield"]));
    let orchestrator = ValidationOrchestrator::new(Arc::new(loader));
    orchestrator.register_schema(DeclaredType::Items, SchemaSource::Json("{ not json".to_string()));

    let result = orchestrator.validate_document("items.json");
    let schema_errors: Vec<_> = result.errors.iter().filter(|e| e.category == IssueCategory::Schema).collect();
    assert_eq!(schema_errors.len(), 1);
    assert!(schema_errors[0].message.starts_with("Schema validation failed:"));
}

#[test]
fn test_results_are_sorted_and_deterministic() {
    let loader = Arc::new(
        MemoryLoader::new()
            .with_document("z.json", items(&["zeta", "Bad Id"]))
            .with_document("m.json", guard("zeta"))
            .with_document("a.json", items(&["alpha"]))
            .with_document("k.json", guard("nothing_here")),
    );
    let corpus = paths(&["z.json", "m.json", "k.json", "a.json"]);

    let parallel = ValidationOrchestrator::new(loader.clone()).with_settings(ValidationSettings::default().with_max_threads(4));
    let sequential = ValidationOrchestrator::new(loader).with_settings(ValidationSettings::default().with_parallel(false));

    let first = parallel.validate_corpus(&corpus);
    let second = parallel.validate_corpus(&corpus);
    let third = sequential.validate_corpus(&corpus);

    assert_eq!(first.documents.keys().collect::<Vec<_>>(), vec!["a.json", "k.json", "m.json", "z.json"]);
    for other in [&second, &third] {
        assert_eq!(first.overall_status, other.overall_status);
        assert_eq!(first.references, other.references);
        assert_eq!(first.dependency_analysis, other.dependency_analysis);
        assert_eq!(first.schema, other.schema);
        for (path, result) in &first.documents {
            let other = &other.documents[path];
            assert_eq!(result.errors, other.errors);
            assert_eq!(result.warnings, other.warnings);
            assert_eq!(result.infos, other.infos);
        }
    }

    let report = parallel.generate_report(&first);
    let order: Vec<&str> = report.file_reports.iter().map(|f| f.file_path.as_str()).collect();
    assert_eq!(order, vec!["a.json", "k.json", "m.json", "z.json"]);
}

#[test]
fn test_cancellation_marks_result_incomplete() {
    let loader = MemoryLoader::new().with_document("a.json", items(&["alpha"])).with_document("b.json", items(&["beta"]));
    let orchestrator = ValidationOrchestrator::new(Arc::new(loader));
    let token = CancellationToken::new();
    token.cancel();

    let result = orchestrator.validate_corpus_with(&paths(&["a.json", "b.json"]), &token);
    assert!(!result.is_complete);
    assert_eq!(result.metadata.get("incomplete").map(String::as_str), Some("true"));
    assert!(result.documents.is_empty());

    let report = generate_report(&result, true);
    assert!(!report.is_complete);
    assert_eq!(report.additional_data["abandoned_documents"], "2");
}

#[test]
fn test_malformed_corpus_still_produces_a_report() {
    let orchestrator = ValidationOrchestrator::new(Arc::new(MemoryLoader::new()));
    let result = orchestrator.validate_corpus(&paths(&["one.json", "two.json"]));

    assert_eq!(result.overall_status, OverallStatus::Failed);
    assert!(result.documents.values().all(|d| !d.is_valid && d.errors[0].category == IssueCategory::Structural));

    let report = orchestrator.generate_report(&result);
    assert_eq!(report.summary.failed_files, 2);
    assert_eq!(report.summary.valid_files, 0);
    let text = format_report(&report, ReportFormat::Text).unwrap();
    assert!(text.contains("one.json [Failed]"));
}

#[test]
fn test_unknown_documents_are_validated_structurally() {
    let root = Element::new("custom_data").with_child(Element::new("entry").with_attr("key", "a"));
    let orchestrator = ValidationOrchestrator::new(Arc::new(MemoryLoader::new().with_document("custom.json", root)));

    let result = orchestrator.validate_document("custom.json");
    assert_eq!(result.declared_type, DeclaredType::Unknown);
    assert!(result.issues().all(|i| i.category != IssueCategory::Rule));
    assert!(result.is_valid);
}

#[test]
fn test_json_files_on_disk() {
    let dir = std::env::temp_dir().join(format!("modlint-corpus-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let items_path = dir.join("items.json");
    let broken_path = dir.join("broken.json");
    std::fs::write(&items_path, serde_json::to_string(&items(&["sword"])).unwrap()).unwrap();
    std::fs::write(&broken_path, "{ \"name\": ").unwrap();

    let orchestrator = create_file_orchestrator(ValidationSettings::default());
    let corpus = vec![items_path.display().to_string(), broken_path.display().to_string()];
    let result = orchestrator.validate_corpus(&corpus);

    assert!(result.documents[&corpus[0]].is_valid);
    assert_eq!(result.documents[&corpus[1]].errors[0].code, "DOCUMENT_PARSE");
    std::fs::remove_dir_all(&dir).unwrap();
}
