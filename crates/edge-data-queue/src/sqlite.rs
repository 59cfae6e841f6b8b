//! SQLite-backed [`DataQueue`].

use crate::{migrations, DataEntity, DataQueue, QueueError, QueueResult};
use chrono::DateTime;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Hit store on a single SQLite file.
///
/// The connection sits behind a mutex, so the submitting side and the driver
/// never interleave statements. `None` means closed.
pub struct SqliteDataQueue {
    conn: Mutex<Option<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteDataQueue {
    /// Open a store at the given path, running migrations if needed.
    ///
    /// `synchronous = FULL` under WAL makes every committed append durable
    /// before `add` returns.
    pub fn open(path: &Path) -> QueueResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;
        migrations::run_migrations(&conn)?;

        info!(path = %path.display(), "Opened hit store");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory store for testing.
    pub fn open_in_memory() -> QueueResult<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: None,
        })
    }

    /// Backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> QueueResult<T>) -> QueueResult<T> {
        let guard = self.conn.lock();
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(QueueError::Closed),
        }
    }
}

fn row_to_entity(row: &Row<'_>) -> rusqlite::Result<(String, i64, Option<Vec<u8>>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn into_entity((unique_id, timestamp_ms, data): (String, i64, Option<Vec<u8>>)) -> QueueResult<DataEntity> {
    let timestamp = DateTime::from_timestamp_millis(timestamp_ms).ok_or_else(|| {
        QueueError::InvalidData(format!("timestamp out of range for {}: {}", unique_id, timestamp_ms))
    })?;
    Ok(DataEntity {
        unique_id,
        timestamp,
        data,
    })
}

impl DataQueue for SqliteDataQueue {
    fn add(&self, entity: &DataEntity) -> QueueResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO hits (unique_id, timestamp_ms, data) VALUES (?1, ?2, ?3)",
                params![
                    entity.unique_id,
                    entity.timestamp.timestamp_millis(),
                    entity.data
                ],
            )?;
            debug!(entity_id = %entity.unique_id, "Stored hit");
            Ok(())
        })
    }

    fn peek(&self) -> QueueResult<Option<DataEntity>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT unique_id, timestamp_ms, data FROM hits ORDER BY id ASC LIMIT 1",
                    [],
                    row_to_entity,
                )
                .optional()?;
            row.map(into_entity).transpose()
        })
    }

    fn peek_n(&self, n: usize) -> QueueResult<Vec<DataEntity>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT unique_id, timestamp_ms, data FROM hits ORDER BY id ASC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], row_to_entity)?;

            let mut entities = Vec::new();
            for row in rows {
                entities.push(into_entity(row?)?);
            }
            Ok(entities)
        })
    }

    fn remove(&self, unique_id: &str) -> QueueResult<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM hits WHERE unique_id = ?1", params![unique_id])?;
            if removed > 1 {
                warn!(entity_id = %unique_id, removed, "Removed duplicate hits");
            }
            Ok(removed > 0)
        })
    }

    fn count(&self) -> QueueResult<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM hits", [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
    }

    fn clear(&self) -> QueueResult<()> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM hits", [])?;
            info!(removed, "Cleared hit store");
            Ok(())
        })
    }

    fn close(&self) {
        let mut guard = self.conn.lock();
        if let Some(conn) = guard.take() {
            if let Err((_, e)) = conn.close() {
                warn!(error = %e, "Hit store did not close cleanly");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn entity(id: &str) -> DataEntity {
        DataEntity::new(id, Some(format!("{{\"id\":\"{}\"}}", id).into_bytes()))
    }

    #[test]
    fn add_and_peek_preserve_fifo_order() {
        let queue = SqliteDataQueue::open_in_memory().unwrap();
        for id in ["a", "b", "c"] {
            queue.add(&entity(id)).unwrap();
        }

        assert_eq!(queue.count().unwrap(), 3);
        assert_eq!(queue.peek().unwrap().unwrap().unique_id, "a");

        let ids: Vec<_> = queue
            .peek_n(10)
            .unwrap()
            .into_iter()
            .map(|e| e.unique_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn peek_does_not_remove() {
        let queue = SqliteDataQueue::open_in_memory().unwrap();
        queue.add(&entity("a")).unwrap();

        queue.peek().unwrap();
        queue.peek().unwrap();
        assert_eq!(queue.count().unwrap(), 1);
    }

    #[test]
    fn removed_entity_is_never_returned_again() {
        let queue = SqliteDataQueue::open_in_memory().unwrap();
        queue.add(&entity("a")).unwrap();
        queue.add(&entity("b")).unwrap();

        assert!(queue.remove("a").unwrap());
        assert!(!queue.remove("a").unwrap());
        assert_eq!(queue.peek().unwrap().unwrap().unique_id, "b");

        queue.add(&entity("c")).unwrap();
        let ids: Vec<_> = queue
            .peek_n(10)
            .unwrap()
            .into_iter()
            .map(|e| e.unique_id)
            .collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn null_data_round_trips_as_none() {
        let queue = SqliteDataQueue::open_in_memory().unwrap();
        queue.add(&DataEntity::new("empty", None)).unwrap();

        let head = queue.peek().unwrap().unwrap();
        assert_eq!(head.unique_id, "empty");
        assert!(head.data.is_none());
    }

    #[test]
    fn timestamp_is_kept_to_the_millisecond() {
        let queue = SqliteDataQueue::open_in_memory().unwrap();
        let ts = Utc.timestamp_millis_opt(1_768_473_000_123).unwrap();
        queue.add(&entity("a").with_timestamp(ts)).unwrap();

        assert_eq!(queue.peek().unwrap().unwrap().timestamp, ts);
    }

    #[test]
    fn peek_n_zero_and_empty_store() {
        let queue = SqliteDataQueue::open_in_memory().unwrap();
        assert!(queue.peek().unwrap().is_none());
        assert!(queue.peek_n(0).unwrap().is_empty());
        assert!(queue.peek_n(5).unwrap().is_empty());
    }

    #[test]
    fn clear_empties_the_store() {
        let queue = SqliteDataQueue::open_in_memory().unwrap();
        queue.add(&entity("a")).unwrap();
        queue.add(&entity("b")).unwrap();

        queue.clear().unwrap();
        assert_eq!(queue.count().unwrap(), 0);
        assert!(queue.peek().unwrap().is_none());
    }

    #[test]
    fn closed_store_rejects_every_call() {
        let queue = SqliteDataQueue::open_in_memory().unwrap();
        queue.add(&entity("a")).unwrap();
        queue.close();
        queue.close();

        assert!(matches!(queue.add(&entity("b")), Err(QueueError::Closed)));
        assert!(matches!(queue.peek(), Err(QueueError::Closed)));
        assert!(matches!(queue.peek_n(1), Err(QueueError::Closed)));
        assert!(matches!(queue.remove("a"), Err(QueueError::Closed)));
        assert!(matches!(queue.count(), Err(QueueError::Closed)));
        assert!(matches!(queue.clear(), Err(QueueError::Closed)));
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hits").join("edge-hits.sqlite");

        {
            let queue = SqliteDataQueue::open(&path).unwrap();
            queue.add(&entity("a")).unwrap();
            queue.add(&entity("b")).unwrap();
            queue.remove("a").unwrap();
            queue.add(&entity("c")).unwrap();
        }

        let queue = SqliteDataQueue::open(&path).unwrap();
        assert_eq!(queue.path(), Some(path.as_path()));
        let ids: Vec<_> = queue
            .peek_n(10)
            .unwrap()
            .into_iter()
            .map(|e| e.unique_id)
            .collect();
        assert_eq!(ids, vec!["b", "c"]);

        let head = queue.peek().unwrap().unwrap();
        assert_eq!(head.data, entity("b").data);
    }

    #[test]
    fn concurrent_writers_keep_every_entity() {
        let queue = Arc::new(SqliteDataQueue::open_in_memory().unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        queue.add(&entity(&format!("t{}-{}", t, i))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.count().unwrap(), 100);

        // Per-writer order is preserved.
        let entities = queue.peek_n(100).unwrap();
        for t in 0..4 {
            let prefix = format!("t{}-", t);
            let seq: Vec<usize> = entities
                .iter()
                .filter_map(|e| e.unique_id.strip_prefix(&prefix))
                .map(|n| n.parse().unwrap())
                .collect();
            assert_eq!(seq, (0..25).collect::<Vec<_>>());
        }
    }
}
