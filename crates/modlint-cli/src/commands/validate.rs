use crate::commands::{CommandContext, collect_documents};
use anyhow::{Context, Result, bail};
use modlint_core::{OverallStatus, ReportFormat, format_report};
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

pub fn validate_corpus(ctx: &CommandContext, inputs: &[std::path::PathBuf]) -> Result<ExitCode> {
    let documents = collect_documents(inputs)?;
    if documents.is_empty() {
        bail!("no documents found");
    }
    info!(documents = documents.len(), "validating corpus");

    let result = ctx.orchestrator.validate_corpus(&documents);
    let report = ctx.orchestrator.generate_report(&result);
    let rendered = format_report(&report, ctx.config.report.format)?;

    match &ctx.config.report.output {
        Some(path) => {
            std::fs::write(path, rendered).with_context(|| format!("writing report to {}", path.display()))?;
            println!("Report written to {} ({:?})", path.display(), report.overall_status);
        }
        None => println!("{rendered}"),
    }

    Ok(exit_code(report.overall_status))
}

pub fn check_document(ctx: &CommandContext, path: &Path, format: Option<ReportFormat>) -> Result<ExitCode> {
    let report = ctx.orchestrator.document_report(&path.display().to_string());
    println!("{}", format_report(&report, format.unwrap_or(ctx.config.report.format))?);
    Ok(exit_code(report.overall_status))
}

pub fn exit_code(status: OverallStatus) -> ExitCode {
    match status {
        OverallStatus::Passed | OverallStatus::PassedWithWarnings => ExitCode::SUCCESS,
        OverallStatus::Failed => ExitCode::from(1),
        OverallStatus::CriticalError => ExitCode::from(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModlintConfig;

    #[test]
    fn test_check_renders_a_detailed_report() {
        let ctx = CommandContext::new(ModlintConfig::default()).unwrap();
        let report = ctx.orchestrator.document_report("missing-document.json");
        assert_eq!(report.overall_status, OverallStatus::Failed);

        let text = format_report(&report, ReportFormat::Text).unwrap();
        assert!(text.contains("missing-document.json"));
        assert!(text.contains("DOCUMENT_LOAD"));
    }
}
