//! Schema Compiler CLI
//!
//! Parses and validates a schema document and, on request, builds the
//! pre-processed rendering context for a target-language backend.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use edmgen::codegen::{build_context, BackendRegistry};
use edmgen::{read_model_file, validate, DataModel};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "edmgen")]
#[command(about = "Compile and validate event-data-model schemas")]
struct Cli {
    /// Package name for the generated model
    #[arg(short, long, default_value = "edm")]
    package: String,

    /// Schema document of a separately compiled upstream model
    #[arg(long)]
    upstream: Option<PathBuf>,

    /// Package name of the upstream model
    #[arg(long, default_value = "upstream")]
    upstream_package: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a schema document
    Validate {
        /// Schema document
        schema: PathBuf,
    },

    /// Validate and build the backend rendering context
    Generate {
        /// Schema document
        schema: PathBuf,
        /// Target-language backend
        #[arg(short, long, default_value = "cpp")]
        backend: String,
        /// Write the rendering context as JSON instead of a summary
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let upstream = load_upstream(&cli)?;

    match cli.command {
        Commands::Validate { schema } => {
            let model = read_model_file(&schema, &cli.package)
                .with_context(|| format!("failed to read {}", schema.display()))?;
            validate(&model, upstream.as_ref())?;
            println!(
                "✅ {} - schema version {}, {} components, {} datatypes valid",
                schema.display(),
                model.schema_version,
                model.components.len(),
                model.datatypes.len()
            );
            Ok(())
        }

        Commands::Generate {
            schema,
            backend,
            output,
        } => {
            let model = read_model_file(&schema, &cli.package)
                .with_context(|| format!("failed to read {}", schema.display()))?;
            validate(&model, upstream.as_ref())?;

            let registry = BackendRegistry::for_options(&model.options);
            let backend = registry
                .get(&backend)
                .with_context(|| format!("unknown backend '{backend}'"))?;
            let context = build_context(backend, &model, upstream.as_ref())?;

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&context)?;
                std::fs::write(&path, json)?;
                println!("✅ Rendering context written to {}", path.display());
            } else {
                println!(
                    "✅ {} types pre-processed for backend '{}'",
                    context.types.len(),
                    backend.name()
                );
            }
            Ok(())
        }
    }
}

fn load_upstream(cli: &Cli) -> anyhow::Result<Option<DataModel>> {
    let Some(ref path) = cli.upstream else {
        return Ok(None);
    };
    let model = read_model_file(path, &cli.upstream_package)
        .with_context(|| format!("failed to read upstream model {}", path.display()))?;
    validate(&model, None)?;
    Ok(Some(model))
}
