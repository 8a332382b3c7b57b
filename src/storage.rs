//! SQLite-backed ledger of launched workloads, plus the single-row token and
//! registry credential tables.
//!
//! One connection is opened per process and held for its lifetime. Each write is
//! a single statement or a single transaction; no retries happen here.

use crate::error::Result;
use crate::model::{WorkloadInstance, WorkloadStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::debug;

const SELECT_WORKLOADS: &str = "SELECT id, pid, container_id, remote_name, remote_description, \
     associated_token, status FROM container_pids";

pub struct StateStore {
    conn: Connection,
}

impl StateStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        let store = Self { conn };
        store.ensure_schema()?;
        debug!(path = %path.display(), "opened ledger");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS container_pids (
                id INTEGER PRIMARY KEY,
                pid INTEGER,
                container_id TEXT,
                remote_name TEXT,
                remote_description TEXT,
                associated_token TEXT,
                status INTEGER
            );
            CREATE TABLE IF NOT EXISTS uuid_token (
                id INTEGER PRIMARY KEY,
                token TEXT
            );
            CREATE TABLE IF NOT EXISTS docker_hub_credentials (
                id INTEGER PRIMARY KEY,
                username TEXT,
                encrypted_password TEXT
            );
            ",
        )?;
        Ok(())
    }

    /// Append a ledger row. Callers invoke this once per confirmed start; no
    /// dedup on `container_id` happens here.
    pub fn record_start(
        &self,
        pid: i64,
        container_id: &str,
        remote_name: &str,
        remote_description: &str,
        token: Option<&str>,
        status: WorkloadStatus,
    ) -> Result<WorkloadInstance> {
        self.conn.execute(
            "INSERT INTO container_pids (pid, container_id, remote_name, remote_description, associated_token, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                pid,
                container_id,
                remote_name,
                remote_description,
                token,
                status.as_i64()
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(WorkloadInstance {
            id,
            pid,
            container_id: container_id.to_string(),
            remote_name: remote_name.to_string(),
            remote_description: remote_description.to_string(),
            associated_token: token.map(str::to_string),
            status,
        })
    }

    /// Set the status of every row carrying `container_id`. Returns how many rows
    /// changed; zero is not an error.
    pub fn update_status(&self, container_id: &str, status: WorkloadStatus) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE container_pids SET status = ?1 WHERE container_id = ?2",
            params![status.as_i64(), container_id],
        )?;
        Ok(changed)
    }

    /// All rows, or only those with `status`, in insertion order.
    pub fn list_by_status(&self, status: Option<WorkloadStatus>) -> Result<Vec<WorkloadInstance>> {
        let rows = match status {
            None => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{SELECT_WORKLOADS} ORDER BY id ASC"))?;
                let mapped = stmt.query_map([], workload_from_row)?;
                mapped.collect::<rusqlite::Result<Vec<_>>>()?
            }
            Some(s) => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{SELECT_WORKLOADS} WHERE status = ?1 ORDER BY id ASC"))?;
                let mapped = stmt.query_map(params![s.as_i64()], workload_from_row)?;
                mapped.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(rows)
    }

    /// Replace the stored token; at most one row survives.
    pub fn set_token(&mut self, token: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM uuid_token", [])?;
        tx.execute("INSERT INTO uuid_token (token) VALUES (?1)", params![token])?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_token(&self) -> Result<Option<String>> {
        let token = self
            .conn
            .query_row("SELECT token FROM uuid_token LIMIT 1", [], |row| {
                row.get::<_, Option<String>>(0)
            })
            .optional()?;
        Ok(token.flatten())
    }

    /// Replace the stored registry credential. The password must already be
    /// encrypted.
    pub fn save_credential(&mut self, username: &str, encrypted_password: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM docker_hub_credentials", [])?;
        tx.execute(
            "INSERT INTO docker_hub_credentials (username, encrypted_password) VALUES (?1, ?2)",
            params![username, encrypted_password],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_credential(&self) -> Result<Option<(String, String)>> {
        let row = self
            .conn
            .query_row(
                "SELECT username, encrypted_password FROM docker_hub_credentials LIMIT 1",
                [],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(row)
    }
}

fn workload_from_row(row: &Row<'_>) -> rusqlite::Result<WorkloadInstance> {
    Ok(WorkloadInstance {
        id: row.get(0)?,
        pid: row.get::<_, Option<i64>>(1)?.unwrap_or_default(),
        container_id: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        remote_name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        remote_description: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        associated_token: row.get(5)?,
        status: WorkloadStatus::from_i64(row.get::<_, Option<i64>>(6)?.unwrap_or_default()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(store: &StateStore, id: &str) -> WorkloadInstance {
        store
            .record_start(42, id, "Hello", "demo", Some("tok"), WorkloadStatus::Running)
            .unwrap()
    }

    #[test]
    fn record_start_assigns_increasing_ids() {
        let store = StateStore::open_in_memory().unwrap();
        let a = seed(&store, "aaa");
        let b = seed(&store, "bbb");
        assert!(b.id > a.id);
        assert_eq!(a.associated_token.as_deref(), Some("tok"));
        assert_eq!(store.list_by_status(None).unwrap(), vec![a, b]);
    }

    #[test]
    fn update_status_missing_row_is_noop() {
        let store = StateStore::open_in_memory().unwrap();
        seed(&store, "aaa");
        let changed = store
            .update_status("missing-id", WorkloadStatus::Stopped)
            .unwrap();
        assert_eq!(changed, 0);
        let rows = store.list_by_status(None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, WorkloadStatus::Running);
    }

    #[test]
    fn list_by_status_filters_in_insertion_order() {
        let store = StateStore::open_in_memory().unwrap();
        for id in ["c1", "c2", "c3", "c4"] {
            seed(&store, id);
        }
        store.update_status("c2", WorkloadStatus::Stopped).unwrap();
        store.update_status("c4", WorkloadStatus::Stopped).unwrap();

        let running: Vec<String> = store
            .list_by_status(Some(WorkloadStatus::Running))
            .unwrap()
            .into_iter()
            .map(|w| w.container_id)
            .collect();
        assert_eq!(running, vec!["c1", "c3"]);

        let stopped: Vec<String> = store
            .list_by_status(Some(WorkloadStatus::Stopped))
            .unwrap()
            .into_iter()
            .map(|w| w.container_id)
            .collect();
        assert_eq!(stopped, vec!["c2", "c4"]);
    }

    #[test]
    fn running_filter_holds_across_start_stop_interleavings() {
        use rand::{rngs::StdRng, Rng, SeedableRng};

        for case in 0..25u64 {
            let mut rng = StdRng::seed_from_u64(case);
            let store = StateStore::open_in_memory().unwrap();
            // (container_id, running) in insertion order.
            let mut expected: Vec<(String, bool)> = Vec::new();

            for step in 0..40 {
                if expected.is_empty() || rng.gen_bool(0.6) {
                    let id = format!("c{case}-{step}");
                    seed(&store, &id);
                    expected.push((id, true));
                } else {
                    let pick = rng.gen_range(0..expected.len());
                    let id = expected[pick].0.clone();
                    store.update_status(&id, WorkloadStatus::Stopped).unwrap();
                    expected[pick].1 = false;
                }

                let running: Vec<String> = store
                    .list_by_status(Some(WorkloadStatus::Running))
                    .unwrap()
                    .into_iter()
                    .map(|w| {
                        assert_eq!(w.status, WorkloadStatus::Running);
                        w.container_id
                    })
                    .collect();
                let want: Vec<String> = expected
                    .iter()
                    .filter(|(_, r)| *r)
                    .map(|(id, _)| id.clone())
                    .collect();
                assert_eq!(running, want, "case {case}, step {step}");
            }
        }
    }

    #[test]
    fn token_is_replaced_wholesale() {
        let mut store = StateStore::open_in_memory().unwrap();
        assert_eq!(store.get_token().unwrap(), None);
        store.set_token("first").unwrap();
        store.set_token("second").unwrap();
        assert_eq!(store.get_token().unwrap().as_deref(), Some("second"));
        let count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM uuid_token", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn credential_is_replaced_wholesale() {
        let mut store = StateStore::open_in_memory().unwrap();
        assert_eq!(store.get_credential().unwrap(), None);
        store.save_credential("alice", "00ff").unwrap();
        store.save_credential("bob", "11ee").unwrap();
        assert_eq!(
            store.get_credential().unwrap(),
            Some(("bob".to_string(), "11ee".to_string()))
        );
    }

    #[test]
    fn schema_creation_is_idempotent_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("runes_cli.db");
        {
            let store = StateStore::open(&path).unwrap();
            seed(&store, "persisted");
        }
        let reopened = StateStore::open(&path).unwrap();
        let rows = reopened.list_by_status(None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].container_id, "persisted");
    }
}
