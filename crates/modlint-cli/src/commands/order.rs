use crate::commands::{CommandContext, collect_documents};
use anyhow::Result;
use modlint_core::ReportFormat;
use std::path::PathBuf;
use std::process::ExitCode;

pub fn show_load_order(ctx: &CommandContext, inputs: &[PathBuf], format: Option<ReportFormat>) -> Result<ExitCode> {
    let documents = collect_documents(inputs)?;
    let order = ctx.orchestrator.determine_load_order(&documents);

    if format.unwrap_or(ctx.config.report.format) == ReportFormat::Json {
        println!("{}", serde_json::to_string_pretty(&order)?);
    } else {
        println!("Load Order ({} documents):", documents.len());
        for phase in &order.phases {
            let marker = if phase.parallelizable { " (parallel)" } else { "" };
            println!("  {}{marker}", phase.description);
            for document in &phase.documents {
                println!("    {document}");
            }
        }
        if !order.unplaced.is_empty() {
            println!();
            println!("Unplaced (in or behind a cycle):");
            for document in &order.unplaced {
                println!("    {document}");
            }
        }
        for cycle in &order.cycles {
            println!("  cycle: {}", cycle.describe());
        }
    }

    Ok(if order.is_complete() { ExitCode::SUCCESS } else { ExitCode::from(1) })
}

pub fn show_cycles(ctx: &CommandContext, inputs: &[PathBuf]) -> Result<ExitCode> {
    let documents = collect_documents(inputs)?;
    let cycles = ctx.orchestrator.find_cycles(&documents);

    if cycles.is_empty() {
        println!("No dependency cycles found.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("Dependency Cycles:");
    println!("{:<6} {:<8} {}", "#", "Length", "Path");
    println!("{}", "-".repeat(60));
    for (i, cycle) in cycles.iter().enumerate() {
        println!("{:<6} {:<8} {}", i + 1, cycle.nodes.len(), cycle.describe());
    }
    Ok(ExitCode::from(1))
}
