//! SQLite storage for foot counts
//!
//! The dashboard reads the `foot_counts` table as an alternative to CSV
//! exports. The `import` command fills it from a CSV file.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::ReportError;
use crate::parser;
use crate::types::RawObservation;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS foot_counts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    store TEXT NOT NULL,
    date TEXT NOT NULL,
    foot_count INTEGER
);
CREATE INDEX IF NOT EXISTS idx_foot_counts_store_date ON foot_counts (store, date);
";

/// Columns the loader needs, with the name reported when one is missing
const REQUIRED_COLUMNS: &[(&str, &str)] = &[
    ("store", "Store"),
    ("date", "Date"),
    ("foot_count", "Foot Count"),
];

/// Open an existing database for reading
pub fn open_readonly(db_path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open database at {}", db_path.display()))
}

/// Open (or create) the database and make sure the schema exists
pub fn init_db(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    conn.execute_batch(SCHEMA)
        .context("Failed to create foot_counts schema")?;

    Ok(conn)
}

/// Load every observation, in insertion order
pub fn load_observations(conn: &Connection) -> Result<Vec<RawObservation>> {
    check_columns(conn)?;

    let mut stmt = conn.prepare("SELECT store, date, foot_count FROM foot_counts ORDER BY rowid")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut observations = Vec::with_capacity(rows.len());
    for (store, raw_date, raw_count) in rows {
        let Some(date) = parser::parse_date(&raw_date) else {
            warn!(store = %store, date = %raw_date, "Skipping row with unreadable date");
            continue;
        };
        let count = match raw_count {
            None => None,
            Some(n) => match u32::try_from(n) {
                Ok(n) => Some(n),
                Err(_) => {
                    warn!(store = %store, date = %date, count = n, "Skipping row with invalid count");
                    continue;
                }
            },
        };
        observations.push(RawObservation::new(store, date, count));
    }

    debug!(count = observations.len(), "Loaded observations from database");
    Ok(observations)
}

fn check_columns(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare("PRAGMA table_info(foot_counts)")?;
    let present: HashSet<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<_, _>>()?;

    if present.is_empty() {
        anyhow::bail!("Table foot_counts not found");
    }

    for &(column, name) in REQUIRED_COLUMNS {
        if !present.contains(column) {
            return Err(ReportError::MissingColumn(name).into());
        }
    }
    Ok(())
}

/// Append observations to the table. Returns the number of rows inserted.
pub fn import_observations(conn: &Connection, observations: &[RawObservation]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt =
            tx.prepare("INSERT INTO foot_counts (store, date, foot_count) VALUES (?1, ?2, ?3)")?;
        for obs in observations {
            stmt.execute(params![
                obs.store,
                obs.date.format("%Y-%m-%d").to_string(),
                obs.count,
            ])?;
        }
    }
    tx.commit()?;

    info!(count = observations.len(), "Imported observations");
    Ok(observations.len())
}

pub fn count_observations(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM foot_counts", [], |row| row.get(0))?;
    Ok(count as usize)
}
