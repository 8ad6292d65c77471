//! schema-migrate CLI - translate relational schemas between SQL dialects.

use clap::{Parser, Subcommand};
use schema_migrate::{pipeline, Config, DialectKind, GenerationReport, MigrateError};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "schema-migrate")]
#[command(about = "Translate relational schemas and data between SQL dialects")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print the generation report as JSON to stderr
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the source schema and write a script for the target dialect
    Convert {
        /// Write the script to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the target dialect from the configuration
        #[arg(long)]
        target: Option<String>,

        /// Also export table rows as INSERT statements
        #[arg(long)]
        data: bool,
    },

    /// Parse CREATE TABLE statements from a file and print the syntax tree
    Parse {
        /// File containing one or more CREATE TABLE statements
        file: PathBuf,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported dialects and their aliases
    Dialects,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    match cli.command {
        Commands::Convert {
            output,
            target,
            data,
        } => {
            let mut config = Config::load(&cli.config)?;
            info!("Loaded configuration from {:?}", cli.config);

            // Apply overrides
            if let Some(target) = target {
                config.target.dialect = target.parse::<DialectKind>()?;
            }
            if data {
                config.export.data = true;
            }

            // Buffer the script so a failed run leaves no partial output.
            let mut script = Vec::new();
            let report = pipeline::convert(&config, &mut script).await?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &script)?;
                    info!("Wrote script to {:?}", path);
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&script)?;
                    stdout.flush()?;
                }
            }

            print_report(&report, cli.output_json)?;
        }

        Commands::Parse { file, json } => {
            let sql = std::fs::read_to_string(&file)?;
            let tables = schema_migrate::Parser::new(&sql).create_tables()?;
            info!("Parsed {} tables from {:?}", tables.len(), file);

            if json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                println!("{:#?}", tables);
            }
        }

        Commands::Dialects => {
            for kind in DialectKind::ALL {
                let port = kind
                    .default_port()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<10} port {:<6} aliases: {}",
                    kind.name(),
                    port,
                    kind.aliases().join(", ")
                );
            }
        }
    }

    Ok(())
}

fn print_report(report: &GenerationReport, as_json: bool) -> Result<(), MigrateError> {
    if as_json {
        eprintln!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    eprintln!("\nConversion completed!");
    eprintln!("  Tables: {}", report.tables);
    eprintln!("  Indexes: {}", report.indexes);
    eprintln!("  Foreign keys: {}", report.foreign_keys);
    if report.rows > 0 {
        eprintln!("  Rows: {}", report.rows);
    }
    if !report.warnings.is_empty() {
        eprintln!("  Warnings:");
        for warning in &report.warnings {
            eprintln!("    - {}", warning);
        }
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("Unknown verbosity: {}", other)),
    };

    // Logs go to stderr; stdout carries the generated script.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("Unknown log format: {}", other)),
    }

    Ok(())
}
