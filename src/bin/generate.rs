//! Artifact Generation CLI
//!
//! Loads a metamodel graph definition from JSON, runs the derivation
//! pipeline, and writes the artifact bundle plus the two OpenAPI documents.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use metamodel_api_schemas::config::OutputFormat;
use metamodel_api_schemas::model::GraphDefinition;
use metamodel_api_schemas::{generate, GeneratorConfig};

#[derive(Parser)]
#[command(name = "apischema-generate")]
#[command(about = "Derive API schema artifacts from a metamodel graph definition")]
struct Cli {
    /// Path to the graph definition JSON
    graph: PathBuf,

    /// Directory to write artifacts into
    #[arg(short, long, default_value = "artifacts")]
    out: PathBuf,

    /// Path to a config file (apischema.toml is picked up automatically)
    #[arg(short, long)]
    config: Option<String>,

    /// Run the pipeline but write nothing
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = GeneratorConfig::load_from(cli.config.as_deref())?;

    println!("📐 Artifact Generation");
    println!("  Graph: {:?}", cli.graph);
    println!();

    let text = fs::read_to_string(&cli.graph)?;
    let graph = GraphDefinition::from_json(&text)?.into_graph()?;
    let set = generate(&graph, &config)?;

    println!("📊 Summary:");
    for (namespace, artifacts) in &set.namespaces {
        println!("  {} ({} resources):", namespace, artifacts.resources.len());
        for endpoint in artifacts.resources.keys().take(10) {
            println!("    - {}", endpoint);
        }
        if artifacts.resources.len() > 10 {
            println!("    ... and {} more", artifacts.resources.len() - 10);
        }
    }
    if let Some(fingerprint) = &set.fingerprint {
        println!("  Fingerprint: {}", fingerprint);
    }

    if cli.dry_run {
        println!();
        println!("🔍 Dry run - not writing artifacts");
        return Ok(());
    }

    fs::create_dir_all(&cli.out)?;
    let render = |value: &serde_json::Value| -> serde_json::Result<String> {
        match config.output.format {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    };

    let bundle = serde_json::to_value(&set)?;
    fs::write(cli.out.join("api-schemas.json"), render(&bundle)?)?;
    fs::write(
        cli.out.join("openapi-resources.json"),
        render(&set.open_api_resources)?,
    )?;
    fs::write(
        cli.out.join("openapi-descriptors.json"),
        render(&set.open_api_descriptors)?,
    )?;

    println!();
    println!("✅ Artifacts written to {:?}", cli.out);
    Ok(())
}
