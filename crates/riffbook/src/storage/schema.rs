//! `SQLite` table definitions.

/// One row per `(app_id, user_id)`.
///
/// `plans` and `progress` hold JSON arrays. Every write sets `revision` from
/// the `last_revision` counter in `metadata`, so watchers can detect changes.
pub const CREATE_DOCUMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    app_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    plans TEXT NOT NULL DEFAULT '[]',
    progress TEXT NOT NULL DEFAULT '[]',
    revision INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (app_id, user_id)
)
";

/// Key-value pairs about the database itself, such as the schema version.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";
