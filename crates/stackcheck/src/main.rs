//! Stackcheck - project setup and connectivity verification

use anyhow::Result;
use clap::{Parser, Subcommand};
use stackcheck::commands::{self, verify::VerifyOptions};
use stackcheck_common::settings::SETTINGS_FILE;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stackcheck")]
#[command(about = "Verify project secrets, database and cache connectivity", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose diagnostics on stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the env file, probe PostgreSQL and Redis, apply the init script
    Verify {
        /// Settings file
        #[arg(long, default_value = SETTINGS_FILE)]
        settings: PathBuf,

        /// Env file to check (overrides settings)
        #[arg(long)]
        env_file: Option<PathBuf>,

        /// SQL script applied when the database is reachable (overrides settings)
        #[arg(long)]
        init_script: Option<PathBuf>,

        /// Audit log written by this run (overrides settings)
        #[arg(long)]
        audit_log: Option<PathBuf>,
    },

    /// Create the project directory layout
    Scaffold {
        /// Project root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Also move loose workflows, config files and logs into the layout
        #[arg(long)]
        organize: bool,
    },

    /// Create chat-trigger test copies of workflows
    TestCopy {
        /// Directory holding the workflow JSON files
        #[arg(long, default_value = "workflows")]
        dir: PathBuf,

        /// Workflow names without extension (default: orchestrator, ingestion)
        names: Vec<String>,
    },

    /// Compute accuracy and F1 for a prediction file
    Evaluate {
        /// JSON array of predicted strings
        #[arg(long)]
        predictions: PathBuf,

        /// JSON array of reference strings
        #[arg(long)]
        references: PathBuf,

        /// Write metrics JSON here
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.command {
        Commands::Verify {
            settings,
            env_file,
            init_script,
            audit_log,
        } => {
            commands::verify::run(VerifyOptions {
                settings,
                env_file,
                init_script,
                audit_log,
            })
            .await?
        }
        Commands::Scaffold { root, organize } => commands::scaffold::run(&root, organize)?,
        Commands::TestCopy { dir, names } => commands::test_copy::run(&dir, &names)?,
        Commands::Evaluate {
            predictions,
            references,
            out,
        } => commands::evaluate::run(&predictions, &references, out.as_deref())?,
    };

    std::process::exit(code);
}
