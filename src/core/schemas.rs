//! Database schema definitions for the resonance store.
//!
//! Everything lives in one SQLite file so that an award can update the cap bucket,
//! the ledger, the snapshot and the pair counter inside a single transaction.

pub const LEDGER_DB_NAME: &str = "resonance.db";

/// Stored in `PRAGMA user_version` once the schema below is in place.
pub const LEDGER_DB_SCHEMA_VERSION: i64 = 1;

pub const LEDGER_DB_SCHEMA_ENTRIES: &str = "
    CREATE TABLE IF NOT EXISTS ledger_entries (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        user_id TEXT NOT NULL,
        stat TEXT NOT NULL,
        points INTEGER NOT NULL,
        source_object_id TEXT NOT NULL,
        reason_code TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE(user_id, stat, source_object_id)
    )
";
pub const LEDGER_DB_SCHEMA_INDEX_USER: &str =
    "CREATE INDEX IF NOT EXISTS idx_ledger_entries_user ON ledger_entries(user_id, seq)";

// Append-only: the storage layer refuses to rewrite history.
pub const LEDGER_DB_SCHEMA_NO_UPDATE: &str = "
    CREATE TRIGGER IF NOT EXISTS ledger_entries_no_update
    BEFORE UPDATE ON ledger_entries
    BEGIN
        SELECT RAISE(ABORT, 'ledger entries are immutable');
    END
";
pub const LEDGER_DB_SCHEMA_NO_DELETE: &str = "
    CREATE TRIGGER IF NOT EXISTS ledger_entries_no_delete
    BEFORE DELETE ON ledger_entries
    BEGIN
        SELECT RAISE(ABORT, 'ledger entries are immutable');
    END
";

pub const LEDGER_DB_SCHEMA_SNAPSHOTS: &str = "
    CREATE TABLE IF NOT EXISTS score_snapshots (
        user_id TEXT PRIMARY KEY,
        questing INTEGER NOT NULL DEFAULT 0 CHECK(questing >= 0),
        wayfinder INTEGER NOT NULL DEFAULT 0 CHECK(wayfinder >= 0),
        attunement INTEGER NOT NULL DEFAULT 0 CHECK(attunement >= 0),
        mana INTEGER NOT NULL DEFAULT 0 CHECK(mana >= 0),
        nexus INTEGER NOT NULL DEFAULT 0 CHECK(nexus >= 0),
        total INTEGER NOT NULL DEFAULT 0,
        last_calculated_at TEXT NOT NULL
    )
";

pub const LEDGER_DB_SCHEMA_CAP_BUCKETS: &str = "
    CREATE TABLE IF NOT EXISTS cap_buckets (
        user_id TEXT NOT NULL,
        stat TEXT NOT NULL,
        period_key TEXT NOT NULL,
        points_earned INTEGER NOT NULL DEFAULT 0,
        cap_limit INTEGER NOT NULL,
        last_reserved INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL,
        PRIMARY KEY(user_id, stat, period_key),
        CHECK(points_earned >= 0 AND points_earned <= cap_limit)
    )
";

pub const LEDGER_DB_SCHEMA_PAIR_INTERACTIONS: &str = "
    CREATE TABLE IF NOT EXISTS pair_interactions (
        giver_id TEXT NOT NULL,
        receiver_id TEXT NOT NULL,
        count INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL,
        PRIMARY KEY(giver_id, receiver_id)
    )
";

/// Schema statements in creation order.
pub const LEDGER_DB_SCHEMA: &[&str] = &[
    LEDGER_DB_SCHEMA_ENTRIES,
    LEDGER_DB_SCHEMA_INDEX_USER,
    LEDGER_DB_SCHEMA_NO_UPDATE,
    LEDGER_DB_SCHEMA_NO_DELETE,
    LEDGER_DB_SCHEMA_SNAPSHOTS,
    LEDGER_DB_SCHEMA_CAP_BUCKETS,
    LEDGER_DB_SCHEMA_PAIR_INTERACTIONS,
];
