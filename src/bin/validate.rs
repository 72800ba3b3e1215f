//! Artifact Validation CLI
//!
//! Compiles every JSON Schema in an artifact bundle against the 2020-12
//! draft, confirming the generator emitted well-formed schemas.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "apischema-validate")]
#[command(about = "Validate the JSON Schemas in an artifact bundle")]
struct Cli {
    /// Path to the api-schemas.json bundle
    bundle: PathBuf,
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
    println!("🔎 Schema Validation");
    println!("  Bundle: {:?}", cli.bundle);
    println!();

    let bundle: Value = serde_json::from_str(&fs::read_to_string(&cli.bundle)?)?;
    let namespaces = bundle
        .get("namespaces")
        .and_then(Value::as_object)
        .ok_or_else(|| anyhow::anyhow!("bundle has no namespaces"))?;

    let mut checked = 0usize;
    let mut failures = 0usize;

    for (namespace, artifacts) in namespaces {
        let resources = artifacts
            .get("resources")
            .and_then(Value::as_object)
            .ok_or_else(|| anyhow::anyhow!("namespace {namespace} has no resources"))?;

        for (endpoint, resource) in resources {
            for key in ["json_schema", "json_schema_for_insert"] {
                let Some(schema) = resource.get(key) else {
                    continue;
                };
                checked += 1;
                match JSONSchema::options().with_draft(Draft::Draft202012).compile(schema) {
                    Ok(_) => {}
                    Err(e) => {
                        failures += 1;
                        println!("❌ {}/{} ({}): {}", namespace, endpoint, key, e);
                    }
                }
            }
        }
    }

    println!();
    println!("📊 {} schemas checked, {} failures", checked, failures);
    if failures > 0 {
        anyhow::bail!("{failures} schemas failed to compile");
    }
    println!("✅ All schemas compile");
    Ok(())
}
