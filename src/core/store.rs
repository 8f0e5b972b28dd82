//! Store handle for the resonance state directory.

use crate::core::broker::DbBroker;
use crate::core::config::{self, ResonanceConfig};
use crate::core::db;
use crate::core::error::ResonanceError;
use crate::core::time::Clock;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Store handle representing one resonance state directory.
///
/// The root holds `resonance.db`, the broker audit log and an optional
/// `resonance.toml`. A `Store` is cheap to clone; it carries no open connection, so
/// clones can be handed to worker threads freely.
#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute path to the store root directory
    pub root: PathBuf,
    pub config: ResonanceConfig,
    pub clock: Clock,
}

impl Store {
    /// Open (creating if needed) the store at `root`, loading `resonance.toml` when present.
    pub fn open(root: &Path) -> Result<Self, ResonanceError> {
        std::fs::create_dir_all(root)?;
        let config = config::load_config(root)?;
        Self::with_config(root, config)
    }

    /// Open the store with an explicit configuration, ignoring any file on disk.
    pub fn with_config(root: &Path, config: ResonanceConfig) -> Result<Self, ResonanceError> {
        config.validate()?;
        db::initialize_ledger_db(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
            clock: Clock::System,
        })
    }

    /// A copy of this handle whose clock is pinned to `ts`.
    pub fn at(&self, ts: DateTime<Utc>) -> Self {
        Self {
            clock: Clock::Fixed(ts),
            ..self.clone()
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn db_path(&self) -> PathBuf {
        db::ledger_db_path(&self.root)
    }

    pub fn broker(&self) -> DbBroker {
        DbBroker::new(&self.root)
    }
}
