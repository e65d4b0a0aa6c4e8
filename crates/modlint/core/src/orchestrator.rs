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

//! Validation orchestrator
//!
//! Drives the whole pipeline for a corpus: load and classify every document,
//! index declarations, extract references, build the dependency graph and
//! load order, then validate each document on a bounded worker pool and
//! finish with the corpus wide reference integrity check.
//!
//! Shared state (the identifier index, the schema cache and the rule cache)
//! is built before the fan-out and only read by workers. Each worker writes
//! exactly one result into a map keyed by path, so results come back in path
//! order no matter how the pool scheduled them.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, error, info, instrument, warn};

use crate::classifier::DeclaredType;
use crate::config::{CycleSeverity, ValidationSettings};
use crate::document::{Document, DocumentLoader};
use crate::error::{ModlintError, ModlintResult};
use crate::extractor::{ExtractedReference, extract_references};
use crate::graph::{AnalysisComplexity, DependencyGraph};
use crate::index::IdentifierIndex;
use crate::integrity::ReferenceIntegrityChecker;
use crate::report::{ValidationReport, generate_report};
use crate::result::{
    ComprehensiveResult, DependencyAnalysisResult, DocumentDependencies, IssueCategory, IssueSeverity, OverallStatus, ValidationIssue,
    ValidationResult,
};
use crate::rules::{EntityCatalog, RuleEngine, StaticCatalog};
use crate::scheduler::{self, CycleReport, LoadOrder};
use crate::schema::{SchemaCache, SchemaRegistry, SchemaSource, SchemaValidationResult, SchemaValidator};

/// Cooperative cancellation shared between a caller and a running batch
///
/// Workers check the token before picking up a document. Documents already
/// in flight finish; the rest are abandoned.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that trips on its own once `timeout` has elapsed
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { cancelled: Arc::default(), deadline: Some(Instant::now() + timeout) }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn or_timeout(mut self, timeout: Option<Duration>) -> Self {
        if self.deadline.is_none() {
            self.deadline = timeout.map(|t| Instant::now() + t);
        }
        self
    }
}

/// Read-only state handed to every per-document worker
struct StageContext<'a> {
    settings: &'a ValidationSettings,
    schema_cache: &'a SchemaCache,
    rules: &'a RuleEngine,
    validator: SchemaValidator,
}

impl StageContext<'_> {
    fn validate(&self, document: &Document) -> (Vec<ValidationIssue>, Option<SchemaValidationResult>) {
        let mut issues = Vec::new();

        let schema = self.settings.validate_schema.then(|| {
            let resolution = self.schema_cache.resolve(document);
            self.validator.validate(document, &resolution)
        });
        if let Some(result) = &schema {
            issues.extend(result.errors.iter().map(ValidationIssue::from));
            issues.extend(result.warnings.iter().map(ValidationIssue::from));
        }

        if self.settings.validate_rules {
            for violation in self.rules.evaluate_document(document) {
                let suggestion = self.rules.suggest(&violation);
                issues.push(ValidationIssue::from(&violation).with_suggestion(suggestion));
            }
        }
        (issues, schema)
    }

    /// Validate one document, turning a panic into a critical result for that document only
    fn validate_guarded(&self, document: &Document) -> (ValidationResult, Option<SchemaValidationResult>) {
        let start = Instant::now();
        match catch_unwind(AssertUnwindSafe(|| self.validate(document))) {
            Ok((issues, schema)) => (ValidationResult::from_issues(&document.path, document.declared_type, issues, start.elapsed()), schema),
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!(path = %document.path, %reason, "document validation failed");
                let message = format!("Validation failed: {reason}");
                (ValidationResult::critical(&document.path, document.declared_type, message, start.elapsed()), None)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

type FanOut = (BTreeMap<String, ValidationResult>, Vec<(String, SchemaValidationResult)>, usize);

/// Entry point for every analysis operation
pub struct ValidationOrchestrator {
    settings: ValidationSettings,
    loader: Arc<dyn DocumentLoader>,
    catalog: Arc<dyn EntityCatalog>,
    schemas: SchemaRegistry,
}

impl ValidationOrchestrator {
    /// Orchestrator with default settings and the built-in entity catalog
    pub fn new(loader: Arc<dyn DocumentLoader>) -> Self {
        Self { settings: ValidationSettings::default(), loader, catalog: Arc::new(StaticCatalog), schemas: SchemaRegistry::new() }
    }

    pub fn with_settings(mut self, settings: ValidationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn EntityCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn settings(&self) -> &ValidationSettings {
        &self.settings
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Register (or replace) the schema used for a declared type
    pub fn register_schema(&self, declared_type: DeclaredType, source: SchemaSource) {
        info!(%declared_type, "registering schema");
        self.schemas.register(declared_type, source);
    }

    /// Drop a registered schema; later runs synthesize one instead
    pub fn unregister_schema(&self, declared_type: DeclaredType) -> bool {
        let removed = self.schemas.unregister(declared_type);
        debug!(%declared_type, removed, "unregistering schema");
        removed
    }

    /// Validate a corpus, honoring the configured timeout
    pub fn validate_corpus(&self, paths: &[String]) -> ComprehensiveResult {
        self.validate_corpus_with(paths, &CancellationToken::new())
    }

    /// Validate a corpus under an external cancellation token
    #[instrument(skip(self, paths, token), fields(documents = paths.len()))]
    pub fn validate_corpus_with(&self, paths: &[String], token: &CancellationToken) -> ComprehensiveResult {
        let start = Instant::now();
        let token = token.clone().or_timeout(self.settings.timeout());
        let mut result = ComprehensiveResult::new(Utc::now());
        result.metadata.insert("worker_threads".to_string(), self.settings.effective_threads().to_string());
        for (key, value) in &self.settings.custom_options {
            result.metadata.insert(format!("option.{key}"), value.clone());
        }

        info!("starting corpus validation");
        let outcome = catch_unwind(AssertUnwindSafe(|| self.run(paths, &token, &mut result)));
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err.to_string()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };

        result.overall_status = match failure {
            Some(reason) => {
                error!(%reason, "corpus validation aborted");
                result.metadata.insert("exception".to_string(), reason);
                OverallStatus::CriticalError
            }
            None => self.overall_status(&result),
        };
        result.finished_at = Utc::now();
        result.metadata.insert("duration_ms".to_string(), start.elapsed().as_millis().to_string());
        info!(status = ?result.overall_status, complete = result.is_complete, "corpus validation finished");
        result
    }

    fn run(&self, paths: &[String], token: &CancellationToken, result: &mut ComprehensiveResult) -> ModlintResult<()> {
        self.settings.validate()?;

        let (documents, failures) = self.load_documents(paths);
        result.metadata.insert("document_count".to_string(), (documents.len() + failures.len()).to_string());
        result.metadata.insert("load_failures".to_string(), failures.len().to_string());
        for (path, err) in failures {
            let issue = ValidationIssue::structural(&path, &err);
            result.documents.insert(path.clone(), ValidationResult::from_issues(path, DeclaredType::Unknown, vec![issue], Duration::ZERO));
        }

        let index = IdentifierIndex::build(&documents);
        let references: Vec<ExtractedReference> = documents.iter().flat_map(extract_references).collect();
        debug!(entities = index.len(), references = references.len(), "indexed corpus");

        if self.settings.validate_dependencies {
            let analysis = analyze_dependencies(&documents, &references, &index);
            for cycle in &analysis.load_order.cycles {
                warn!(cycle = %cycle.describe(), "dependency cycle detected");
            }
            result.metadata.insert("cycle_count".to_string(), analysis.load_order.cycles.len().to_string());
            result.dependency_analysis = Some(analysis);
        }

        let schema_cache = if self.settings.validate_schema { SchemaCache::prepare(&self.schemas, &documents) } else { SchemaCache::default() };
        let rules = self.rule_engine();
        if self.settings.validate_rules {
            rules.prepare(documents.iter().map(|d| d.declared_type).collect::<BTreeSet<_>>());
        }
        let context = StageContext {
            settings: &self.settings,
            schema_cache: &schema_cache,
            rules: &rules,
            validator: SchemaValidator::new(),
        };

        let (validated, schema_results, abandoned) = self.fan_out(&context, &documents, token)?;
        result.documents.extend(validated);

        if self.settings.validate_schema {
            let mut schema = SchemaValidationResult::valid();
            for (_, partial) in schema_results {
                schema.merge(partial);
            }
            result.schema = Some(schema);
        }

        if abandoned > 0 {
            warn!(abandoned, "validation cancelled before every document was processed");
            result.is_complete = false;
            result.metadata.insert("incomplete".to_string(), "true".to_string());
            result.metadata.insert("abandoned_documents".to_string(), abandoned.to_string());
            return Ok(());
        }

        if self.settings.validate_references {
            result.references = Some(ReferenceIntegrityChecker::new(&index).check(&references));
        }
        Ok(())
    }

    fn fan_out(&self, context: &StageContext<'_>, documents: &[Document], token: &CancellationToken) -> ModlintResult<FanOut> {
        let results = Mutex::new(BTreeMap::new());
        let schema_results = Mutex::new(Vec::new());
        let abandoned = AtomicUsize::new(0);

        let work = |document: &Document| {
            if token.is_cancelled() {
                abandoned.fetch_add(1, Ordering::Relaxed);
                return;
            }
            let (validation, schema) = context.validate_guarded(document);
            if let Some(schema) = schema {
                schema_results.lock().push((document.path.clone(), schema));
            }
            results.lock().insert(document.path.clone(), validation);
        };

        let threads = self.settings.effective_threads();
        if threads > 1 && documents.len() > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("modlint-worker-{i}"))
                .build()
                .map_err(|e| ModlintError::WorkerPool(e.to_string()))?;
            pool.install(|| documents.par_iter().for_each(&work));
        } else {
            documents.iter().for_each(&work);
        }

        let mut schema_results = schema_results.into_inner();
        schema_results.sort_by(|a, b| a.0.cmp(&b.0));
        Ok((results.into_inner(), schema_results, abandoned.into_inner()))
    }

    /// Validate a single document in isolation
    ///
    /// References are extracted but not resolved against any corpus; the
    /// number that leave the document is reported as an info issue.
    #[instrument(skip(self))]
    pub fn validate_document(&self, path: &str) -> ValidationResult {
        let start = Instant::now();
        let root = match self.loader.load(path) {
            Ok(root) => root,
            Err(err) => {
                warn!(error = %err, "document could not be loaded");
                return ValidationResult::from_issues(path, DeclaredType::Unknown, vec![ValidationIssue::structural(path, &err)], start.elapsed());
            }
        };
        let document = Document::new(path, root);

        let schema_cache = SchemaCache::prepare(&self.schemas, [&document]);
        let rules = self.rule_engine();
        let context = StageContext {
            settings: &self.settings,
            schema_cache: &schema_cache,
            rules: &rules,
            validator: SchemaValidator::new(),
        };
        let (mut result, _) = context.validate_guarded(&document);

        if self.settings.validate_references {
            let index = IdentifierIndex::build([&document]);
            let external = extract_references(&document).iter().filter(|r| index.lookup(r.target_type, &r.target_id).next().is_none()).count();
            if external > 0 {
                result.infos.push(ValidationIssue::new(
                    "EXTERNAL_REFERENCES",
                    format!("{external} references point outside this document and were not checked"),
                    IssueSeverity::Info,
                    IssueCategory::Reference,
                    path,
                ));
            }
        }
        result.duration = start.elapsed();
        debug!(status = ?result.status(), "document validated");
        result
    }

    /// Phases and cycles for a corpus; documents that fail to load are left out
    #[instrument(skip(self, paths), fields(documents = paths.len()))]
    pub fn determine_load_order(&self, paths: &[String]) -> LoadOrder {
        let order = scheduler::schedule(&self.corpus_graph(paths));
        info!(phases = order.phases.len(), cycles = order.cycles.len(), unplaced = order.unplaced.len(), "computed load order");
        order
    }

    /// Elementary cycles of a corpus's dependency graph
    pub fn find_cycles(&self, paths: &[String]) -> Vec<CycleReport> {
        scheduler::find_cycles(&self.corpus_graph(paths))
    }

    /// Build the report for a finished run
    pub fn generate_report(&self, result: &ComprehensiveResult) -> ValidationReport {
        generate_report(result, self.settings.generate_detailed_report)
    }

    /// Validate one document and report it with every issue listed
    pub fn document_report(&self, path: &str) -> ValidationReport {
        generate_report(&ComprehensiveResult::from_document(self.validate_document(path)), true)
    }

    fn corpus_graph(&self, paths: &[String]) -> DependencyGraph {
        let (documents, failures) = self.load_documents(paths);
        for (path, err) in &failures {
            warn!(%path, error = %err, "skipping document that failed to load");
        }
        let index = IdentifierIndex::build(&documents);
        let references: Vec<ExtractedReference> = documents.iter().flat_map(extract_references).collect();
        DependencyGraph::from_references(documents.iter().map(|d| d.path.as_str()), &references, &index)
    }

    /// Load every distinct path, in path order
    fn load_documents(&self, paths: &[String]) -> (Vec<Document>, Vec<(String, ModlintError)>) {
        let unique: BTreeSet<&str> = paths.iter().map(String::as_str).collect();
        let mut documents = Vec::with_capacity(unique.len());
        let mut failures = Vec::new();
        for path in unique {
            match self.loader.load(path) {
                Ok(root) => {
                    let document = Document::new(path, root);
                    debug!(%path, declared_type = %document.declared_type, "loaded document");
                    documents.push(document);
                }
                Err(err) => {
                    warn!(%path, error = %err, "failed to load document");
                    failures.push((path.to_string(), err));
                }
            }
        }
        (documents, failures)
    }

    fn rule_engine(&self) -> RuleEngine {
        RuleEngine::new(Arc::clone(&self.catalog)).with_value_ranges(self.settings.validate_value_ranges)
    }

    fn overall_status(&self, result: &ComprehensiveResult) -> OverallStatus {
        let mut status = result.documents.values().map(ValidationResult::status).max().unwrap_or_default();
        if let Some(schema) = &result.schema {
            if !schema.is_valid {
                status = status.max(OverallStatus::Failed);
            } else if !schema.warnings.is_empty() {
                status = status.max(OverallStatus::PassedWithWarnings);
            }
        }
        if let Some(references) = &result.references {
            if !references.is_valid {
                status = status.max(OverallStatus::Failed);
            } else if !references.warnings.is_empty() {
                status = status.max(OverallStatus::PassedWithWarnings);
            }
        }
        if result.cycle_count() > 0 {
            status = status.max(match self.settings.cycle_severity {
                CycleSeverity::Warning => OverallStatus::PassedWithWarnings,
                CycleSeverity::Error => OverallStatus::Failed,
            });
        }
        status
    }
}

fn analyze_dependencies(documents: &[Document], references: &[ExtractedReference], index: &IdentifierIndex) -> DependencyAnalysisResult {
    let graph = DependencyGraph::from_references(documents.iter().map(|d| d.path.as_str()), references, index);
    let load_order = scheduler::schedule(&graph);

    let mut reference_counts: HashMap<&str, usize> = HashMap::new();
    for reference in references {
        *reference_counts.entry(reference.source_document.as_str()).or_default() += 1;
    }

    let documents = documents
        .iter()
        .map(|document| {
            let dependencies: Vec<String> = graph.dependencies_of(&document.path).into_iter().map(str::to_string).collect();
            let reference_count = reference_counts.get(document.path.as_str()).copied().unwrap_or(0);
            let entry = DocumentDependencies {
                declared_type: document.declared_type,
                complexity: AnalysisComplexity::from_counts(dependencies.len(), reference_count),
                dependencies,
                reference_count,
            };
            (document.path.clone(), entry)
        })
        .collect();

    DependencyAnalysisResult { edges: graph.edges().into_iter().cloned().collect(), load_order, documents }
}
