/// The narrow interface the migration core consumes from a database driver.
///
/// Everything else the engine does is plain SQL text streamed over the
/// caller's connection. A driver supplies its identity (which names the
/// per-driver script directory), a timestamp expression for the migration
/// log, classification of "missing table" errors so bootstrap reads can
/// treat them as absence, and its transaction statements.
pub trait Driver {
    /// Identifier used to pick the per-driver directory under a schema root.
    fn name(&self) -> &str;

    /// SQL expression producing the current timestamp, used for the
    /// `schema_log.at` column.
    fn now_expr(&self) -> &str {
        "CURRENT_TIMESTAMP"
    }

    /// Whether `err` means a referenced table does not exist.
    fn is_missing_table(&self, err: &rusqlite::Error) -> bool;

    fn begin_sql(&self) -> &str {
        "BEGIN"
    }

    fn commit_sql(&self) -> &str {
        "COMMIT"
    }

    fn rollback_sql(&self) -> &str {
        "ROLLBACK"
    }
}

/// Driver adapter for SQLite via `rusqlite`.
pub struct SqliteDriver;

impl Driver for SqliteDriver {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn is_missing_table(&self, err: &rusqlite::Error) -> bool {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.contains("no such table"),
            _ => false,
        }
    }

    // An exclusive transaction serializes concurrent migration attempts at
    // BEGIN rather than failing at COMMIT.
    fn begin_sql(&self) -> &str {
        "BEGIN EXCLUSIVE TRANSACTION"
    }
}
