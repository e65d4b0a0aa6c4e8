pub mod order;
pub mod validate;

use crate::config::ModlintConfig;
use anyhow::{Context, Result};
use modlint_core::{ValidationOrchestrator, create_file_orchestrator};
use std::path::{Path, PathBuf};

pub struct CommandContext {
    pub config: ModlintConfig,
    pub orchestrator: ValidationOrchestrator,
}

impl CommandContext {
    pub fn new(config: ModlintConfig) -> Result<Self> {
        config.settings.validate()?;
        let orchestrator = create_file_orchestrator(config.settings.clone());
        config.register_schemas(&orchestrator)?;
        Ok(Self { config, orchestrator })
    }
}

/// Expand directories into the `.json` files they contain, sorted
pub fn collect_documents(inputs: &[PathBuf]) -> Result<Vec<String>> {
    let mut documents = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let entries = std::fs::read_dir(input).with_context(|| format!("reading directory {}", input.display()))?;
            for entry in entries {
                let path = entry?.path();
                if is_json(&path) {
                    documents.push(path.display().to_string());
                }
            }
        } else {
            documents.push(input.display().to_string());
        }
    }
    documents.sort();
    documents.dedup();
    Ok(documents)
}

fn is_json(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
