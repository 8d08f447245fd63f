//! aws-serverless CLI
//!
//! Evaluates an application manifest against an in-memory resource graph and
//! prints the resulting plan or an API's swagger document.

mod manifest;
mod synth;

use anyhow::{Context, Result};
use aws_serverless_common::ProgramConfig;
use clap::{Parser, Subcommand};
use colored::*;
use manifest::Manifest;
use std::fs;
use std::path::{Path, PathBuf};
use synth::synthesize;

#[derive(Parser)]
#[command(name = "aws-serverless")]
#[command(version, about = "Declare API Gateway APIs and event subscriptions for AWS lambda functions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Declare every resource of a manifest and print the resolved plan
    #[command(after_help = "EXAMPLES:\n  \
        # List every declared resource\n  \
        aws-serverless synth --manifest app.yaml\n\n  \
        # Also write plan.json and <api>.swagger.json files\n  \
        aws-serverless synth --manifest app.yaml --out ./build")]
    Synth {
        /// Path to the application manifest
        #[arg(short, long)]
        manifest: PathBuf,

        /// Override the region from the manifest
        #[arg(long)]
        region: Option<String>,

        /// Directory receiving plan.json and one swagger document per API
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the swagger document generated for one API
    #[command(after_help = "EXAMPLES:\n  \
        aws-serverless swagger --manifest app.yaml --api greeter")]
    Swagger {
        /// Path to the application manifest
        #[arg(short, long)]
        manifest: PathBuf,

        /// Name of the API in the manifest
        #[arg(short, long)]
        api: String,

        /// Write the document here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Synth {
            manifest,
            region,
            out,
        } => {
            synth_command(&manifest, region.as_deref(), out.as_deref(), cli.verbose)?;
        }
        Commands::Swagger { manifest, api, out } => {
            swagger_command(&manifest, &api, out.as_deref())?;
        }
    }

    Ok(())
}

/// Logs go to stderr so plans and documents can be piped
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_manifest(path: &Path, region: Option<&str>) -> Result<Manifest> {
    eprintln!("{} Loading manifest: {}", "→".cyan(), path.display());
    let mut manifest = Manifest::load(path)?;

    if let Some(region) = region {
        let mut config = manifest
            .config
            .take()
            .unwrap_or_else(|| ProgramConfig::new(region));
        config.region = region.to_string();
        manifest.config = Some(config);
    }
    Ok(manifest)
}

fn synth_command(
    manifest_path: &Path,
    region: Option<&str>,
    out: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let manifest = load_manifest(manifest_path, region)?;

    if verbose {
        println!("  Functions: {}", manifest.functions.len());
        println!("  APIs: {}", manifest.apis.len());
        println!("  Subscriptions: {}", manifest.subscriptions.len());
    }

    println!("{} Declaring resources...", "→".cyan());
    let synthesis = synthesize(&manifest).context("Failed to synthesize manifest")?;
    let plan = synthesis.plan().context("Failed to resolve plan")?;

    println!("\n{}", "Resources:".bold());
    for resource in &plan {
        println!("  • {} {}", resource.type_token.cyan(), resource.name.yellow());
        if let Some(parent) = &resource.parent {
            println!("    Parent: {}", parent);
        }
        if !resource.depends_on.is_empty() {
            println!("    Depends on: {}", resource.depends_on.join(", "));
        }
        if verbose {
            for (key, value) in &resource.inputs {
                println!("    {} = {}", key, value);
            }
        }
    }

    if let Some(dir) = out {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        write_file(&dir.join("plan.json"), &serde_json::to_string_pretty(&plan)?)?;
        for name in synthesis.apis.keys() {
            let document = pretty_swagger(&synthesis.swagger(name)?)?;
            write_file(&dir.join(format!("{}.swagger.json", name)), &document)?;
        }
    }

    println!(
        "\n{} Declared {} resources",
        "✓".green().bold(),
        plan.len()
    );
    for (name, api) in &synthesis.apis {
        if let Some(Ok(url)) = api.url.now() {
            println!("  {} {}", name.cyan(), url.yellow());
        }
    }

    Ok(())
}

fn swagger_command(manifest_path: &Path, api: &str, out: Option<&Path>) -> Result<()> {
    let manifest = load_manifest(manifest_path, None)?;
    let synthesis = synthesize(&manifest).context("Failed to synthesize manifest")?;
    let document = pretty_swagger(&synthesis.swagger(api)?)?;

    match out {
        Some(path) => write_file(path, &document)?,
        // Only the document goes to stdout so it can be piped.
        None => println!("{}", document),
    }
    Ok(())
}

fn pretty_swagger(document: &str) -> Result<String> {
    let value: serde_json::Value =
        serde_json::from_str(document).context("Swagger document is not valid JSON")?;
    Ok(serde_json::to_string_pretty(&value)?)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{} Wrote {}", "✓".green(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_swagger_keeps_document_order() {
        let document = r#"{"swagger":"2.0","info":{"title":"t","version":"1.0"},"paths":{"/zeta":{"get":{}},"/alpha":{"post":{},"get":{}}}}"#;
        let pretty = pretty_swagger(document).unwrap();

        let position = |needle: &str| pretty.find(needle).unwrap();
        assert!(position("\"swagger\"") < position("\"info\""));
        assert!(position("\"info\"") < position("\"paths\""));
        assert!(position("\"/zeta\"") < position("\"/alpha\""));
        assert!(position("\"post\"") < pretty.rfind("\"get\"").unwrap());
    }

    #[test]
    fn test_pretty_swagger_rejects_invalid_json() {
        assert!(pretty_swagger("not json").is_err());
    }
}
