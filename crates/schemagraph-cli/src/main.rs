//! schemagraph command-line tool
//!
//! Builds catalog graph snapshots from JSON catalog dumps and inspects them.

mod commands;
mod error;
mod formatter;

use clap::{Parser, Subcommand};
use error::CliError;
use formatter::OutputFormat;
use schemagraph_core::NamingStrategy;
use std::path::PathBuf;

/// schemagraph command-line tool
#[derive(Parser, Debug)]
#[command(name = "schemagraph")]
#[command(version, about = "Build and inspect database catalog graphs")]
pub struct Args {
    /// Output format
    #[arg(long, global = true, default_value = "table", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest a JSON catalog dump and write a snapshot
    Build {
        /// JSON file with `columns`, `indexes` and `constraints` row arrays
        rows: PathBuf,

        /// Database name recorded in the snapshot
        #[arg(short, long)]
        database: String,

        /// Snapshot path; `.json` writes JSON, anything else binary
        #[arg(short, long)]
        out: PathBuf,
    },

    /// List the tables of a snapshot
    Tables {
        /// Snapshot file
        snapshot: PathBuf,

        /// Only list tables of this schema
        #[arg(short, long)]
        schema: Option<String>,
    },

    /// Show the named relations of a table
    Relations {
        /// Snapshot file
        snapshot: PathBuf,

        /// Table as `schema.table`
        table: String,

        /// Naming strategy (simple or complex)
        #[arg(long, default_value = "complex")]
        naming: NamingStrategy,
    },

    /// Resolve a dotted path such as `public.account.id`
    Get {
        /// Snapshot file
        snapshot: PathBuf,

        /// `schema`, `schema.table` or `schema.table.column`
        path: String,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("schemagraph=info,schemagraph_core=info")
            }),
        )
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<String, CliError> {
    let formatter = formatter::create_formatter(args.format);

    match args.command {
        Command::Build {
            rows,
            database,
            out,
        } => commands::build(&rows, &database, &out, &*formatter),
        Command::Tables { snapshot, schema } => {
            commands::tables(&snapshot, schema.as_deref(), &*formatter)
        }
        Command::Relations {
            snapshot,
            table,
            naming,
        } => commands::relations(&snapshot, &table, naming, &*formatter),
        Command::Get { snapshot, path } => commands::get(&snapshot, &path, &*formatter),
    }
}
