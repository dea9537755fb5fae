//! Schema versioning for the document database.
//!
//! Migrations are listed in order and applied one transaction at a time;
//! each transaction also records the version it brings the database to, so
//! an interrupted upgrade resumes from the last completed step.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{Error, Result};

use super::schema;

/// The schema version this build writes.
pub const CURRENT_VERSION: i32 = 1;

const VERSION_KEY: &str = "schema_version";

/// One schema step.
#[derive(Debug)]
struct Migration {
    version: i32,
    description: &'static str,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "user documents",
    statements: &[schema::CREATE_DOCUMENTS_TABLE],
}];

/// Bring the database up to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns `DatabaseMigration` if the database was written by a newer
/// build or records an unreadable version, or a query error if a step
/// fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(schema::CREATE_METADATA_TABLE)?;

    let version = schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > version) {
        apply(conn, migration)?;
    }
    Ok(())
}

/// The recorded schema version; `0` for a database never migrated.
fn schema_version(conn: &Connection) -> Result<i32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    value.map_or(Ok(0), |v| {
        v.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("unreadable schema version '{v}'"),
        })
    })
}

fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for statement in migration.statements {
        tx.execute_batch(statement)?;
    }
    tx.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, migration.version.to_string()),
    )?;
    tx.commit()?;

    info!(
        version = migration.version,
        description = migration.description,
        "Applied schema migration"
    );
    Ok(())
}
