//! SQLite-backed document store.
//!
//! Stands in for a hosted document database: point several installs at the
//! same file and they share one remote. Documents are stored as JSON text
//! keyed by `(owner, collection, id)`.

#![allow(clippy::missing_errors_doc)]

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde_json::Value;

use super::{require_owner, RemoteError, RemoteResult, RemoteStore};
use crate::model::Collection;

const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    owner TEXT NOT NULL,
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (owner, collection, id)
);
";

const UPSERT_SQL: &str = r"
INSERT INTO documents (owner, collection, id, body, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT(owner, collection, id) DO UPDATE SET
    body = excluded.body,
    updated_at = excluded.updated_at
";

/// Remote document store in a SQLite file.
pub struct SqliteRemoteStore {
    conn: Mutex<Connection>,
}

impl SqliteRemoteStore {
    /// Open or create a store at the given path and initialize its schema.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create parent directories: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open remote store: {}", path.display()))?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize remote schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> RemoteResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RemoteError::Internal(anyhow!("remote store connection lock poisoned")))
    }
}

fn encode(doc: &Value) -> RemoteResult<String> {
    serde_json::to_string(doc)
        .context("Failed to encode document")
        .map_err(RemoteError::Internal)
}

impl RemoteStore for SqliteRemoteStore {
    fn list_all(&self, owner: &str, collection: Collection) -> RemoteResult<Vec<Value>> {
        require_owner(owner, collection)?;
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT id, body FROM documents WHERE owner = ?1 AND collection = ?2 ORDER BY id",
            )
            .context("Failed to prepare document query")?;
        let rows = stmt
            .query_map(params![owner, collection.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .context("Failed to query documents")?;

        let mut docs = Vec::new();
        for row in rows {
            let (id, body) = row.context("Failed to read document row")?;
            let doc: Value = serde_json::from_str(&body)
                .with_context(|| format!("Failed to parse stored document {collection}/{id}"))?;
            docs.push(doc);
        }
        Ok(docs)
    }

    fn put_one(
        &self,
        owner: &str,
        collection: Collection,
        id: &str,
        doc: &Value,
    ) -> RemoteResult<()> {
        require_owner(owner, collection)?;
        let body = encode(doc)?;
        let now = Utc::now().to_rfc3339();

        self.conn()?
            .execute(UPSERT_SQL, params![owner, collection.as_str(), id, body, now])
            .with_context(|| format!("Failed to write document {collection}/{id}"))?;
        Ok(())
    }

    fn delete_one(&self, owner: &str, collection: Collection, id: &str) -> RemoteResult<()> {
        require_owner(owner, collection)?;
        self.conn()?
            .execute(
                "DELETE FROM documents WHERE owner = ?1 AND collection = ?2 AND id = ?3",
                params![owner, collection.as_str(), id],
            )
            .with_context(|| format!("Failed to delete document {collection}/{id}"))?;
        Ok(())
    }

    fn put_batch(
        &self,
        owner: &str,
        collection: Collection,
        docs: &[(String, Value)],
    ) -> RemoteResult<()> {
        require_owner(owner, collection)?;
        let now = Utc::now().to_rfc3339();

        let conn = self.conn()?;
        // Whole batch in one transaction; dropping it without commit rolls back
        let tx = conn
            .unchecked_transaction()
            .context("Failed to begin batch transaction")?;
        for (id, doc) in docs {
            let body = encode(doc)?;
            tx.execute(UPSERT_SQL, params![owner, collection.as_str(), id, body, now])
                .with_context(|| format!("Failed to stage document {collection}/{id}"))?;
        }
        tx.commit().context("Failed to commit batch")?;
        Ok(())
    }
}
