//! SQLite connection setup shared by every database kind.
//!
//! Opens the file (or an in-memory database), applies the pragmas needed
//! for concurrent access from several handles (WAL mode), and runs the
//! migration list for that kind of database.

use crate::Error;
use crate::migrations::{self, Migrations};
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;
                 PRAGMA foreign_keys=ON;";

/// Open a database at the specified path.
///
/// Creates the file (and parent directories) if missing, applies
/// performance pragmas, and runs any pending migrations.
pub async fn open(path: impl AsRef<Path>, migrations: Migrations) -> Result<Connection, Error> {
    if let Some(parent) = path.as_ref().parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let conn = Connection::open(path).await.map_err(|e| Error::Storage(e.into()))?;
    prepare(&conn, migrations).await?;
    Ok(conn)
}

/// Open an in-memory database for testing.
pub async fn open_in_memory(migrations: Migrations) -> Result<Connection, Error> {
    let conn = Connection::open_in_memory()
        .await
        .map_err(|e| Error::Storage(e.into()))?;
    prepare(&conn, migrations).await?;
    Ok(conn)
}

async fn prepare(conn: &Connection, migrations: Migrations) -> Result<(), Error> {
    conn.call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        Ok(())
    })
    .await
    .map_err(Error::Storage)?;

    migrations::run(conn, migrations).await
}
