// SQLite metadata database: chunk rows and index info

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::schema::init_schema;
use super::{Chunk, ChunkMetadata};
use crate::error::{IndexError, Result};

/// Type alias for connection pool
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Facts about the persisted index, stored next to the chunk rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub dimension: usize,
    pub count: usize,
    /// blake3 hex digest of vectors.bin
    pub vectors_digest: String,
    pub created_at: String,
}

/// Chunk metadata store, one row per vector
#[derive(Clone)]
pub struct MetadataDatabase {
    pool: ConnectionPool,
    db_path: PathBuf,
}

impl MetadataDatabase {
    /// Create or open a metadata database
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        debug!("Opening metadata database at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder().max_size(4).build(manager)?;

        {
            let conn = pool.get()?;
            init_schema(&conn)?;
        }

        Ok(Self { pool, db_path })
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Replace every chunk row and the index info in one transaction
    pub fn replace_all(&self, chunks: &[Chunk], info: &IndexInfo) -> Result<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM chunks", [])?;
        tx.execute("DELETE FROM index_info", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO chunks (row_id, path, content, start_line, end_line, file, language)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for (row_id, chunk) in chunks.iter().enumerate() {
                stmt.execute(params![
                    row_id as i64,
                    chunk.path,
                    chunk.content,
                    chunk.start_line as i64,
                    chunk.end_line as i64,
                    chunk.metadata.file,
                    chunk.metadata.language,
                ])?;
            }

            let mut stmt = tx.prepare("INSERT INTO index_info (key, value) VALUES (?1, ?2)")?;
            stmt.execute(params!["dimension", info.dimension.to_string()])?;
            stmt.execute(params!["count", info.count.to_string()])?;
            stmt.execute(params!["vectors_digest", info.vectors_digest])?;
            stmt.execute(params!["created_at", info.created_at])?;
        }

        tx.commit()?;

        info!("Stored metadata for {} chunks", chunks.len());

        Ok(())
    }

    /// Load every chunk in row-id order
    pub fn load_chunks(&self) -> Result<Vec<Chunk>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            "SELECT row_id, path, content, start_line, end_line, file, language
             FROM chunks ORDER BY row_id",
        )?;

        let rows = stmt
            .query_map([], row_to_chunk)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut chunks = Vec::with_capacity(rows.len());
        for (expected, (row_id, chunk)) in rows.into_iter().enumerate() {
            if row_id != expected as i64 {
                return Err(IndexError::Corrupt(format!(
                    "chunk rows are not contiguous: expected row {}, found {}",
                    expected, row_id
                )));
            }
            chunks.push(chunk);
        }

        Ok(chunks)
    }

    /// Read the index info, `None` when no index was ever stored
    pub fn index_info(&self) -> Result<Option<IndexInfo>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare("SELECT key, value FROM index_info")?;
        let values: HashMap<String, String> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;

        if values.is_empty() {
            return Ok(None);
        }

        let field = |key: &str| {
            values
                .get(key)
                .cloned()
                .ok_or_else(|| IndexError::Corrupt(format!("index info is missing '{}'", key)))
        };
        let number = |key: &str| -> Result<usize> {
            field(key)?
                .parse()
                .map_err(|_| IndexError::Corrupt(format!("index info '{}' is not a number", key)))
        };

        Ok(Some(IndexInfo {
            dimension: number("dimension")?,
            count: number("count")?,
            vectors_digest: field("vectors_digest")?,
            created_at: field("created_at")?,
        }))
    }

    /// Get index statistics
    pub fn get_stats(&self) -> Result<IndexStats> {
        let conn = self.get_conn()?;

        let total_chunks: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;

        let total_files: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT path) FROM chunks",
            [],
            |row| row.get(0),
        )?;

        Ok(IndexStats {
            total_chunks: total_chunks as usize,
            total_files: total_files as usize,
        })
    }

    /// Files per language, most common first
    pub fn languages_breakdown(&self) -> Result<Vec<(String, usize)>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            "SELECT language, COUNT(DISTINCT path) as count FROM chunks
             GROUP BY language ORDER BY count DESC, language",
        )?;

        let rows = stmt
            .query_map([], |row| {
                let language: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((language, count as usize))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_chunks: usize,
    pub total_files: usize,
}

/// Convert database row to (row_id, Chunk)
fn row_to_chunk(row: &Row) -> rusqlite::Result<(i64, Chunk)> {
    Ok((
        row.get(0)?,
        Chunk {
            path: row.get(1)?,
            content: row.get(2)?,
            start_line: row.get::<_, i64>(3)? as usize,
            end_line: row.get::<_, i64>(4)? as usize,
            metadata: ChunkMetadata {
                file: row.get(5)?,
                language: row.get(6)?,
            },
        },
    ))
}
