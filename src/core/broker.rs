use crate::core::db;
use crate::core::error::ResonanceError;
use crate::core::time;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

pub const AUDIT_LOG_NAME: &str = "broker.events.jsonl";

/// Maximum retry attempts for busy/locked errors.
const MAX_RETRIES: u32 = 5;
/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 25;
/// Maximum delay cap (milliseconds).
const MAX_DELAY_MS: u64 = 1_000;

/// The DB Broker is the single path for state access.
///
/// Writes run in a `BEGIN IMMEDIATE` transaction on a fresh connection, so SQLite's
/// write lock (not an in-process mutex) serializes them across threads and processes.
/// Every write is appended to the audit log.
pub struct DbBroker {
    audit_log_path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub db_id: String,
    pub status: String,
}

impl DbBroker {
    pub fn new(root: &Path) -> Self {
        Self {
            audit_log_path: root.join(AUDIT_LOG_NAME),
        }
    }

    /// Execute a read-only closure on a fresh connection. WAL lets readers proceed
    /// while a writer holds the lock.
    pub fn with_conn<F, R>(&self, db_path: &Path, f: F) -> Result<R, ResonanceError>
    where
        F: FnOnce(&Connection) -> Result<R, ResonanceError>,
    {
        let conn = db::db_connect(&db_path.to_string_lossy())?;
        f(&conn)
    }

    /// Execute a closure inside an immediate write transaction.
    ///
    /// The closure may run more than once: a busy/locked failure rolls the attempt back
    /// and retries with exponential backoff. Any other error rolls back and is returned.
    pub fn with_tx<F, R>(
        &self,
        db_path: &Path,
        actor: &str,
        op_name: &str,
        mut f: F,
    ) -> Result<R, ResonanceError>
    where
        F: FnMut(&Transaction<'_>) -> Result<R, ResonanceError>,
    {
        let db_id = db_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let mut attempt = 0u32;
        let result = loop {
            match run_immediate(db_path, &mut f) {
                Err(e) if e.is_busy() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    let delay_ms = (BASE_DELAY_MS * 2u64.pow(attempt - 1)).min(MAX_DELAY_MS);
                    tracing::warn!(op = op_name, attempt, delay_ms, "database busy, retrying");
                    thread::sleep(Duration::from_millis(delay_ms));
                }
                other => break other,
            }
        };

        let status = if result.is_ok() { "success" } else { "error" };
        if let Err(e) = self.log_event(actor, op_name, &db_id, status) {
            // The transaction outcome stands; a lost audit line must not turn a commit
            // into a reported failure.
            tracing::warn!(op = op_name, error = %e, "failed to append broker audit event");
        }

        result
    }

    fn log_event(
        &self,
        actor: &str,
        op: &str,
        db_id: &str,
        status: &str,
    ) -> Result<(), ResonanceError> {
        let ev = BrokerEvent {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event_id: time::new_entry_id(),
            actor: actor.to_string(),
            op: op.to_string(),
            db_id: db_id.to_string(),
            status: status.to_string(),
        };

        let mut line = serde_json::to_string(&ev)?;
        line.push('\n');

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log_path)
            .map_err(ResonanceError::IoError)?;
        // One write per line keeps concurrent appenders from interleaving.
        f.write_all(line.as_bytes())
            .map_err(ResonanceError::IoError)?;
        Ok(())
    }

    pub fn read_audit_log(&self) -> Result<Vec<BrokerEvent>, ResonanceError> {
        if !self.audit_log_path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.audit_log_path)?;
        let mut events = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            events.push(serde_json::from_str(line)?);
        }
        Ok(events)
    }
}

fn run_immediate<F, R>(db_path: &Path, f: &mut F) -> Result<R, ResonanceError>
where
    F: FnMut(&Transaction<'_>) -> Result<R, ResonanceError>,
{
    let mut conn = db::db_connect(&db_path.to_string_lossy())?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}
