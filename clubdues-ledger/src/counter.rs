use std::fs;
use std::path::PathBuf;

use rusqlite::{params, Connection};

use crate::{LedgerError, LedgerResult};

const COUNTER_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS counters (
    key TEXT PRIMARY KEY,
    value INTEGER NOT NULL DEFAULT 0
);
"#;

/// Persistent named sequence counters.
///
/// Implementations must provide a genuinely atomic increment-and-return:
/// two racing callers each observe a distinct, strictly increasing value.
/// That single primitive is the whole correctness mechanism behind receipt
/// uniqueness, so a process-local in-memory counter is not an acceptable
/// implementation for anything but tests.
pub trait CounterStore: Send + Sync {
    /// Current value for the key, creating the counter at 0 if absent.
    fn get_or_create(&self, key: &str) -> LedgerResult<u64>;

    /// Atomically increment the counter by 1 and return the new value.
    /// Creates the counter at 0 first if it does not exist.
    fn increment(&self, key: &str) -> LedgerResult<u64>;

    /// Raise the counter to at least `floor`, returning the resulting value.
    /// Never decreases an existing counter.
    fn raise_to(&self, key: &str, floor: u64) -> LedgerResult<u64>;
}

/// SQLite-backed counter store sharing the payments database file.
#[derive(Clone, Debug)]
pub struct SqliteCounterStore {
    path: PathBuf,
}

impl SqliteCounterStore {
    pub fn new(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let store = Self { path: path.into() };
        let conn = store.connect()?;
        conn.execute_batch(COUNTER_SCHEMA)
            .map_err(|err| LedgerError::CounterUnavailable(err.to_string()))?;
        Ok(store)
    }

    fn connect(&self) -> LedgerResult<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.path)
            .map_err(|err| LedgerError::CounterUnavailable(err.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL; PRAGMA busy_timeout = 5000;",
        )
        .map_err(|err| LedgerError::CounterUnavailable(err.to_string()))?;
        Ok(conn)
    }
}

impl CounterStore for SqliteCounterStore {
    fn get_or_create(&self, key: &str) -> LedgerResult<u64> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR IGNORE INTO counters (key, value) VALUES (?1, 0)",
            params![key],
        )
        .map_err(|err| LedgerError::CounterUnavailable(err.to_string()))?;
        let value: i64 = conn
            .query_row(
                "SELECT value FROM counters WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .map_err(|err| LedgerError::CounterUnavailable(err.to_string()))?;
        Ok(value as u64)
    }

    fn increment(&self, key: &str) -> LedgerResult<u64> {
        // A single upsert statement so the read-modify-write is indivisible
        // even across connections and processes.
        let conn = self.connect()?;
        let value: i64 = conn
            .query_row(
                "INSERT INTO counters (key, value) VALUES (?1, 1)
                 ON CONFLICT(key) DO UPDATE SET value = counters.value + 1
                 RETURNING value",
                params![key],
                |row| row.get(0),
            )
            .map_err(|err| LedgerError::CounterUnavailable(err.to_string()))?;
        Ok(value as u64)
    }

    fn raise_to(&self, key: &str, floor: u64) -> LedgerResult<u64> {
        // An out-of-range floor would wrap negative and lower the counter.
        let floor = i64::try_from(floor).map_err(|_| {
            LedgerError::CounterUnavailable(format!("counter floor {floor} exceeds storage range"))
        })?;
        let conn = self.connect()?;
        let value: i64 = conn
            .query_row(
                "INSERT INTO counters (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = MAX(counters.value, excluded.value)
                 RETURNING value",
                params![key, floor],
                |row| row.get(0),
            )
            .map_err(|err| LedgerError::CounterUnavailable(err.to_string()))?;
        Ok(value as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, SqliteCounterStore) {
        let dir = tempdir().unwrap();
        let store = SqliteCounterStore::new(dir.path().join("dues.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn first_increment_yields_one() {
        let (_dir, store) = store();
        assert_eq!(store.increment("receiptNumber").unwrap(), 1);
        assert_eq!(store.increment("receiptNumber").unwrap(), 2);
    }

    #[test]
    fn get_or_create_starts_at_zero_and_reads_back() {
        let (_dir, store) = store();
        assert_eq!(store.get_or_create("receiptNumber").unwrap(), 0);
        store.increment("receiptNumber").unwrap();
        assert_eq!(store.get_or_create("receiptNumber").unwrap(), 1);
    }

    #[test]
    fn raise_to_never_decreases() {
        let (_dir, store) = store();
        assert_eq!(store.raise_to("receiptNumber", 7).unwrap(), 7);
        assert_eq!(store.raise_to("receiptNumber", 3).unwrap(), 7);
        assert_eq!(store.raise_to("receiptNumber", 7).unwrap(), 7);
        assert_eq!(store.increment("receiptNumber").unwrap(), 8);
    }

    #[test]
    fn out_of_range_floor_is_rejected_without_lowering() {
        let (_dir, store) = store();
        store.raise_to("receiptNumber", 7).unwrap();
        let err = store.raise_to("receiptNumber", u64::MAX).unwrap_err();
        assert!(matches!(err, LedgerError::CounterUnavailable(_)));
        assert_eq!(store.get_or_create("receiptNumber").unwrap(), 7);
    }

    #[test]
    fn keys_are_independent() {
        let (_dir, store) = store();
        store.increment("receiptNumber").unwrap();
        assert_eq!(store.increment("invoiceNumber").unwrap(), 1);
        assert_eq!(store.get_or_create("receiptNumber").unwrap(), 1);
    }

    #[test]
    fn concurrent_increments_never_repeat() {
        use std::sync::Arc;
        use std::thread;

        let dir = tempdir().unwrap();
        let path = dir.path().join("dues.db");
        let store = Arc::new(SqliteCounterStore::new(&path).unwrap());

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                (0..25)
                    .map(|_| store.increment("receiptNumber").unwrap())
                    .collect::<Vec<_>>()
            }));
        }

        let mut values: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        values.sort_unstable();
        let before = values.len();
        values.dedup();
        assert_eq!(values.len(), before, "duplicate sequence values issued");
        assert_eq!(values.len(), 100);
        assert_eq!(*values.last().unwrap(), 100);
    }
}
