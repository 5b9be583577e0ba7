//! dbcheck - connectivity smoke test for the foot-count database.
//!
//! Opens the configured database once, without creating it, reads the
//! schema version from the file header and reports whether that worked.
//! No table is read.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use config::DbTarget;

#[derive(Parser)]
#[command(name = "dbcheck")]
#[command(about = "Check that the foot-count database can be opened")]
#[command(version)]
struct Cli {
    /// Database file to open (overrides FOOTFALL_DB)
    #[arg(long, short)]
    database: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli.database) {
        Ok(()) => {
            println!("Connection successful");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Connection check failed: {:#}", e);
            println!("Error in connection: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(database: Option<PathBuf>) -> Result<()> {
    let target = match database {
        Some(path) => DbTarget { path },
        None => DbTarget::from_env()?,
    };
    debug!("Opening {:?}", target.path);

    connect(&target.path)?;
    Ok(())
}

/// Open the database without creating it and make sure the file really is
/// a database. SQLite opens lazily, so the header has to be read.
fn connect(path: &Path) -> Result<()> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)?;
    let version: i64 = conn
        .query_row("PRAGMA schema_version", [], |row| row.get(0))
        .context("Not a readable SQLite database")?;
    debug!(version, "Schema version");
    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}
