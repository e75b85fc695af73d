//! easyo2p CLI - Oracle to PostgreSQL schema migration.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use easyo2p::{Config, MigrateError, Orchestrator};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "easyo2p")]
#[command(about = "Easy, quick and simple Oracle to PostgreSQL schema migration")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

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
    /// Run the migration
    Run {
        /// Override the output directory
        #[arg(long)]
        target_path: Option<PathBuf>,

        /// Override the target schema
        #[arg(long)]
        schema: Option<String>,

        /// Emit script files only, without executing against the target
        #[arg(long)]
        files_only: bool,
    },

    /// Validate the configuration file and exit
    Check,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(MigrateError::Config)?;

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Run {
            target_path,
            schema,
            files_only,
        } => {
            if let Some(path) = target_path {
                config.output.path = Some(path);
            }
            if let Some(schema) = schema {
                config.target.schema = schema;
            }
            if files_only {
                config.migration.migrate = false;
            }

            let mut orchestrator = Orchestrator::new(config)?;
            orchestrator.run()?;
            let run_script = orchestrator.create_run_script()?;

            println!("\nMigration completed!");
            if let Some(plan) = orchestrator.plan() {
                println!("  Tables: {}", plan.tables.len());
                println!("  Sequences: {}", plan.sequences.len());
                println!("  Triggers: {}", plan.triggers.len());
            }
            if let Some(path) = run_script {
                println!("  Run script: {}", path.display());
            }
        }

        Commands::Check => {
            config.validate()?;
            println!("Configuration OK");
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
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
