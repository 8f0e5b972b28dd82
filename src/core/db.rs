use crate::core::broker::DbBroker;
use crate::core::error;
use crate::core::schemas;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

/// Busy timeout applied to every connection. Longer waits are handled by the broker's
/// retry loop.
pub const BUSY_TIMEOUT_SECS: u64 = 5;

pub fn db_connect(db_path: &str) -> Result<Connection, error::ResonanceError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(BUSY_TIMEOUT_SECS))
        .map_err(error::ResonanceError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::ResonanceError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::ResonanceError::RusqliteError)?;
    Ok(conn)
}

pub fn ledger_db_path(root: &Path) -> PathBuf {
    root.join(schemas::LEDGER_DB_NAME)
}

pub fn initialize_ledger_db(root: &Path) -> Result<(), error::ResonanceError> {
    fs::create_dir_all(root).map_err(|e| {
        error::ResonanceError::DatabaseInitializationError(format!(
            "cannot create store root {}: {}",
            root.display(),
            e
        ))
    })?;

    let broker = DbBroker::new(root);
    let db_path = ledger_db_path(root);
    let version = broker.with_conn(&db_path, schema_version)?;
    if version >= schemas::LEDGER_DB_SCHEMA_VERSION {
        return Ok(());
    }

    broker.with_tx(&db_path, "resonance", "ledger.init", |tx| {
        for statement in schemas::LEDGER_DB_SCHEMA {
            tx.execute(statement, [])?;
        }
        tx.pragma_update(None, "user_version", schemas::LEDGER_DB_SCHEMA_VERSION)?;
        Ok(())
    })?;

    tracing::debug!(path = %db_path.display(), "ledger database initialized");
    Ok(())
}

/// `PRAGMA user_version` of the ledger database; 0 for a fresh file.
pub fn schema_version(conn: &Connection) -> Result<i64, error::ResonanceError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
