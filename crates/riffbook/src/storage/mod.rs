//! Storage layer for riffbook.
//!
//! This module provides `SQLite`-based persistent storage for user documents.
//! Each document holds one user's plans and progress as JSON arrays and is
//! keyed by `(app_id, user_id)`. Writes merge at the granularity of those
//! top-level fields.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{PartialUpdate, UserData};

/// How long a write waits on another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Metadata key holding the last revision handed out.
const REVISION_COUNTER_KEY: &str = "last_revision";

/// A user document as read from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Incremented on every write.
    pub revision: i64,
    /// The document content.
    pub data: UserData,
}

/// Storage engine for user documents.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open the database file at `path`, creating it and its directory on
    /// first use and migrating the schema.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryCreate`, `DatabaseOpen`, or `DatabaseMigration`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL lets a watcher in another process read while we write
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        migrations::initialize_schema(&conn)?;

        info!(path = %path.display(), "Opened document database");
        Ok(Self { path, conn })
    }

    /// A private database that disappears when dropped.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseOpen` if `SQLite` cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// The database file, or `:memory:`.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load a user's document, or `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored JSON is malformed.
    pub fn load_document(&self, app_id: &str, user_id: &str) -> Result<Option<StoredDocument>> {
        let row: Option<(String, String, i64)> = self
            .conn
            .query_row(
                r"
                SELECT plans, progress, revision
                FROM documents WHERE app_id = ?1 AND user_id = ?2
                ",
                params![app_id, user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((plans, progress, revision)) = row else {
            return Ok(None);
        };

        Ok(Some(StoredDocument {
            revision,
            data: UserData {
                plans: serde_json::from_str(&plans)?,
                progress: serde_json::from_str(&progress)?,
            },
        }))
    }

    /// Current revision of a user's document, or `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn revision(&self, app_id: &str, user_id: &str) -> Result<Option<i64>> {
        let revision = self
            .conn
            .query_row(
                "SELECT revision FROM documents WHERE app_id = ?1 AND user_id = ?2",
                params![app_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(revision)
    }

    /// Merge a partial update into a user's document, creating it if needed.
    ///
    /// Present fields replace the stored arrays; absent fields are untouched.
    /// Returns the new revision, which is higher than any revision this
    /// database has handed out before.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any statement fails; nothing is
    /// written in that case.
    pub fn merge_document(
        &self,
        app_id: &str,
        user_id: &str,
        update: &PartialUpdate,
    ) -> Result<i64> {
        if update.is_empty() {
            return Ok(self.revision(app_id, user_id)?.unwrap_or(0));
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO documents (app_id, user_id) VALUES (?1, ?2)",
            params![app_id, user_id],
        )?;

        if let Some(plans) = &update.plans {
            tx.execute(
                "UPDATE documents SET plans = ?3 WHERE app_id = ?1 AND user_id = ?2",
                params![app_id, user_id, serde_json::to_string(plans)?],
            )?;
        }
        if let Some(progress) = &update.progress {
            tx.execute(
                "UPDATE documents SET progress = ?3 WHERE app_id = ?1 AND user_id = ?2",
                params![app_id, user_id, serde_json::to_string(progress)?],
            )?;
        }

        // One counter per database: a recreated document never repeats a revision
        tx.execute(
            r"
            INSERT INTO metadata (key, value)
            VALUES (?1, (SELECT COALESCE(MAX(revision), 0) + 1 FROM documents))
            ON CONFLICT(key) DO UPDATE SET value = CAST(value AS INTEGER) + 1
            ",
            params![REVISION_COUNTER_KEY],
        )?;
        tx.execute(
            r"
            UPDATE documents
            SET revision = (SELECT CAST(value AS INTEGER) FROM metadata WHERE key = ?3),
                updated_at = ?4
            WHERE app_id = ?1 AND user_id = ?2
            ",
            params![app_id, user_id, REVISION_COUNTER_KEY, Utc::now().to_rfc3339()],
        )?;
        let revision: i64 = tx.query_row(
            "SELECT revision FROM documents WHERE app_id = ?1 AND user_id = ?2",
            params![app_id, user_id],
            |row| row.get(0),
        )?;
        tx.commit()?;

        debug!(app_id, user_id, revision, "Merged document update");
        Ok(revision)
    }

    /// Delete a user's document.
    ///
    /// Returns `true` if a document was deleted, `false` if not found.
    /// Subscribers see the deletion as an empty snapshot at revision 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_document(&self, app_id: &str, user_id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM documents WHERE app_id = ?1 AND user_id = ?2",
            params![app_id, user_id],
        )?;
        Ok(affected > 0)
    }

    /// Get statistics for a user's document.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self, app_id: &str, user_id: &str) -> Result<StorageStats> {
        let document_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;

        let updated_at: Option<String> = self
            .conn
            .query_row(
                "SELECT updated_at FROM documents WHERE app_id = ?1 AND user_id = ?2",
                params![app_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        let last_updated = updated_at
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let document = self.load_document(app_id, user_id)?;
        let (revision, plan_count, entry_count) = document.map_or((0, 0, 0), |doc| {
            (doc.revision, doc.data.plans.len(), doc.data.progress.len())
        });

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            document_count,
            revision,
            plan_count,
            entry_count,
            last_updated,
            db_size_bytes,
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Documents stored across all users.
    pub document_count: i64,
    /// Revision of the user's document (0 if missing).
    pub revision: i64,
    /// Plans in the user's document.
    pub plan_count: usize,
    /// Progress entries in the user's document.
    pub entry_count: usize,
    /// When the user's document was last written.
    pub last_updated: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
