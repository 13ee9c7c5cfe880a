//! fieldmap CLI - apply YAML-declared field mappings to JSON records
//!
//! Transforms a single JSON record with a named translation, validates
//! translation files, and prints registration stubs for destination types.

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use fieldmap::{render_stub, Options, TranslationConfig, DEFAULT_STUB_NAME};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fieldmap")]
#[command(version, about = "Declarative field mapping for JSON records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a JSON record with a named translation
    Transform {
        /// Path to translation YAML
        #[arg(short, long, default_value = "fieldmap.yaml")]
        config: PathBuf,

        /// Translation name within the config file
        #[arg(short, long)]
        name: String,

        /// JSON record to transform ("-" reads stdin)
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Omit missing keys instead of failing
        #[arg(short, long)]
        lenient: bool,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Validate a translation YAML without transforming anything
    Validate {
        /// Path to translation YAML
        #[arg(short, long, default_value = "fieldmap.yaml")]
        config: PathBuf,
    },

    /// Print a registration stub linking each column to itself
    Stub {
        /// Destination type name
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Comma-separated column names
        #[arg(short, long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        /// Translation name
        #[arg(short, long, default_value = DEFAULT_STUB_NAME)]
        name: String,
    },
}

fn main() {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing; stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Transform { config, name, input, lenient, pretty } => {
            transform_record(config, name, input, lenient, pretty)
        }
        Commands::Validate { config } => {
            validate_config(config)
        }
        Commands::Stub { type_name, columns, name } => {
            println!("{}", render_stub(&type_name, &name, &columns));
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Transform one JSON record and print the result as JSON
fn transform_record(
    config: PathBuf,
    name: String,
    input: String,
    lenient: bool,
    pretty: bool,
) -> Result<(), String> {
    let translations = TranslationConfig::load_from_file(&config).map_err(|e| e.to_string())?;

    let translation = translations.translation(&name).ok_or_else(|| {
        format!("No translation named '{}' in {}", name, config.display())
    })?;

    let raw = if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        buf
    } else {
        fs::read_to_string(&input).map_err(|e| format!("Failed to read {}: {}", input, e))?
    };

    let record: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| format!("Invalid JSON input: {}", e))?;

    let options = if lenient { Options::lenient() } else { Options::new() };

    let results = translation
        .transform_with(&record, &options)
        .map_err(|e| e.to_string())?;

    let output = if pretty {
        serde_json::to_string_pretty(&results)
    } else {
        serde_json::to_string(&results)
    }
    .map_err(|e| format!("Failed to serialize output: {}", e))?;

    println!("{}", output);

    Ok(())
}

/// Load a translation YAML and report what it declares
fn validate_config(config: PathBuf) -> Result<(), String> {
    println!("🔍 Validating translations in {}...", config.display());

    let translations = TranslationConfig::load_from_file(&config).map_err(|e| e.to_string())?;

    for (name, def) in &translations.translations {
        println!(
            "  ✓ {}: {} links, {} static values, {} options",
            name,
            def.links.len(),
            def.static_values.len(),
            def.options.len()
        );
    }

    println!("✅ {} translations are valid!", translations.translations.len());

    Ok(())
}
