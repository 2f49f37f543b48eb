//! entistore CLI
//!
//! Command-line tools for an entity store.
//!
//! # Commands
//!
//! - `health` - Ping the database
//! - `indexes` - Set up the demo entity types and list their indexes
//! - `demo` - Write, query, update and remove a batch of demo orders
//!
//! Connection settings come from `--uri` / `--database`, falling back to the
//! `ENTISTORE_*` environment variables.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// entistore command-line tools.
#[derive(Parser)]
#[command(name = "entistore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string (falls back to ENTISTORE_DATABASE_URI)
    #[arg(global = true, short, long)]
    uri: Option<String>,

    /// Database name (falls back to ENTISTORE_DATABASE_NAME)
    #[arg(global = true, short, long)]
    database: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ping the database
    Health,

    /// Set up the demo entity types and list their indexes
    Indexes {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run a write/query round over demo orders
    Demo {
        /// Number of orders to write
        #[arg(short, long, default_value = "10")]
        count: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag.
    let default = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = commands::open_store(cli.uri, cli.database)?;

    match cli.command {
        Commands::Health => commands::health::run(store)?,
        Commands::Indexes { format } => commands::indexes::run(&store, &format)?,
        Commands::Demo { count } => commands::demo::run(&store, count)?,
    }

    Ok(())
}
