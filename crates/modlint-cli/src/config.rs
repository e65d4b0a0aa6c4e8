use anyhow::{Context, Result, bail};
use modlint_core::{DeclaredType, ReportFormat, SchemaSource, ValidationOrchestrator, ValidationSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModlintConfig {
    pub settings: ValidationSettings,
    /// Root marker (e.g. `Items`) to schema file
    pub schemas: BTreeMap<String, PathBuf>,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub format: ReportFormat,
    /// Write the report here instead of stdout
    pub output: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { format: ReportFormat::Text, output: None }
    }
}

impl ModlintConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// `--config` flag first, then `$MODLINT_CONFIG`, then defaults
    pub fn resolve_config(cli_config: Option<PathBuf>) -> Result<Self> {
        let config = if let Some(config_path) = cli_config {
            Self::load_from_file(config_path)?
        } else if let Ok(env_config) = std::env::var("MODLINT_CONFIG") {
            Self::load_from_file(env_config)?
        } else {
            Self::default()
        };
        config.settings.validate()?;
        Ok(config)
    }

    /// Register every configured schema file with the orchestrator
    pub fn register_schemas(&self, orchestrator: &ValidationOrchestrator) -> Result<()> {
        for (marker, path) in &self.schemas {
            let declared_type = DeclaredType::from_root_marker(marker);
            if !declared_type.is_known() {
                bail!("unknown document type '{marker}' in [schemas]");
            }
            orchestrator.register_schema(declared_type, SchemaSource::File(path.clone()));
        }
        Ok(())
    }
}
