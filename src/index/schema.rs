// Versioned schema for metadata.db

use rusqlite::{Connection, Result};
use tracing::{debug, info};

/// Migration batches; entry i brings the schema to version i + 1
const MIGRATIONS: &[&str] = &[
    // v1: one chunk row per vector, row_id is the position in vectors.bin;
    // index_info holds dimension, count, vectors_digest and created_at
    "CREATE TABLE IF NOT EXISTS chunks (
        row_id INTEGER PRIMARY KEY,
        path TEXT NOT NULL,
        content TEXT NOT NULL,
        start_line INTEGER NOT NULL,
        end_line INTEGER NOT NULL,
        file TEXT NOT NULL,
        language TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_chunks_path ON chunks(path);
    CREATE INDEX IF NOT EXISTS idx_chunks_language ON chunks(language);
    CREATE TABLE IF NOT EXISTS index_info (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );",
];

/// Latest schema version
pub const SCHEMA_VERSION: usize = MIGRATIONS.len();

/// Bring a metadata database up to `SCHEMA_VERSION`
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )?;

    let applied: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    let applied = applied as usize;
    debug!("Metadata schema at v{}", applied);

    for (i, migration) in MIGRATIONS.iter().enumerate().skip(applied) {
        let version = i + 1;
        info!("Migrating metadata schema to v{}", version);
        conn.execute_batch(migration)?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version as i64],
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let names = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>>>()
            .unwrap();
        names
    }

    #[test]
    fn test_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(tables(&conn), vec!["chunks", "index_info", "schema_version"]);
    }

    #[test]
    fn test_migrations_run_once() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied as usize, SCHEMA_VERSION);
    }
}
