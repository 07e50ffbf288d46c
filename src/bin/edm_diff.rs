//! Schema Evolution CLI
//!
//! Compares two versions of a schema document and reports the safe
//! evolution path. Errors abort; warnings are blocking too, so every
//! ambiguous heuristic finding gets human review before code
//! generation.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use edmgen::codegen::cpp::migration_rules;
use edmgen::{
    read_model_file, validate, EvolutionDeclarations, SchemaComparator,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "edm-diff")]
#[command(about = "Compute the evolution path between two schema versions")]
struct Cli {
    /// Old schema document
    old: PathBuf,

    /// New schema document
    new: PathBuf,

    /// Evolution-declaration document with user-asserted renames
    #[arg(short, long)]
    evolution: Option<PathBuf>,

    /// Package name for both models
    #[arg(short, long, default_value = "edm")]
    package: String,

    /// Write a JSON report
    #[arg(short, long)]
    report: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(clean) => {
            if !clean {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let old = read_model_file(&cli.old, &cli.package)
        .with_context(|| format!("failed to read {}", cli.old.display()))?;
    validate(&old, None)?;
    let new = read_model_file(&cli.new, &cli.package)
        .with_context(|| format!("failed to read {}", cli.new.display()))?;
    validate(&new, None)?;

    let declarations = cli
        .evolution
        .as_ref()
        .map(EvolutionDeclarations::read_file)
        .transpose()
        .context("failed to read evolution declarations")?;

    println!(
        "🔍 Comparing schema version {} -> {}",
        old.schema_version, new.schema_version
    );
    let result = SchemaComparator::new(&old, &new, declarations.as_ref()).compare()?;

    for change in &result.schema_changes {
        println!("  {change}");
    }
    for warning in &result.warnings {
        println!("⚠️  {warning}");
    }
    for error in &result.errors {
        println!("❌ {error}");
    }

    if let Some(ref path) = cli.report {
        let report = serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "old_version": old.schema_version,
            "new_version": new.schema_version,
            "errors": result.errors,
            "warnings": result.warnings,
            "schema_changes": result.schema_changes,
            "migration_rules": migration_rules(&result, old.schema_version),
        });
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("✅ Report written to {}", path.display());
    }

    if !result.errors.is_empty() {
        println!("❌ {} forbidden change(s) detected", result.errors.len());
        return Ok(false);
    }
    if !result.warnings.is_empty() {
        // Warnings block by policy: unconfirmed heuristics need a
        // declaration or a human decision before generation.
        println!(
            "⚠️  {} unconfirmed finding(s); declare them in an evolution file to proceed",
            result.warnings.len()
        );
        return Ok(false);
    }

    if result.schema_changes.is_empty() {
        println!("✅ Schemas are identical");
    } else {
        println!(
            "✅ {} change(s), {} requiring migration rules",
            result.schema_changes.len(),
            result.backend_relevant_changes().len()
        );
    }
    Ok(true)
}
