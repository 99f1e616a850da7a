use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;

use crate::error::{ProductionError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Roles,
    Staff,
    Outlets,
    RawItems,
    FinishedItems,
    Orders,
    DeletedOrders,
    Tasks,
    Logs,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Roles => "roles",
            Collection::Staff => "staff",
            Collection::Outlets => "outlets",
            Collection::RawItems => "rawItems",
            Collection::FinishedItems => "finishedItems",
            Collection::Orders => "orders",
            Collection::DeletedOrders => "deletedOrders",
            Collection::Tasks => "tasks",
            Collection::Logs => "logs",
        }
    }
}

/// Whole-collection persistence. Each collection is one JSON document.
pub trait Store: Send {
    fn get(&self, collection: &str) -> Result<Option<String>>;
    fn put(&self, collection: &str, body: &str) -> Result<()>;
}

pub fn load<T: DeserializeOwned>(store: &dyn Store, collection: Collection) -> Result<Vec<T>> {
    match store.get(collection.name())? {
        Some(body) => Ok(serde_json::from_str(&body)?),
        None => Ok(Vec::new()),
    }
}

pub fn save<T: Serialize>(store: &dyn Store, collection: Collection, records: &[T]) -> Result<()> {
    let body = serde_json::to_string(records)?;
    store.put(collection.name(), &body)
}

pub struct SqliteStore {
    pub conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = SqliteStore {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteStore {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| ProductionError::LockPoisoned)?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            ",
        )?;

        Ok(())
    }
}

impl Store for SqliteStore {
    fn get(&self, collection: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().map_err(|_| ProductionError::LockPoisoned)?;

        let body = conn
            .query_row(
                "SELECT body FROM collections WHERE name = ?1",
                [collection],
                |row| row.get(0),
            )
            .optional()?;

        Ok(body)
    }

    fn put(&self, collection: &str, body: &str) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| ProductionError::LockPoisoned)?;

        conn.execute(
            "INSERT INTO collections (name, body) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET body = excluded.body, updated_at = CURRENT_TIMESTAMP",
            rusqlite::params![collection, body],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_collection_loads_empty() {
        let store = SqliteStore::open_in_memory().unwrap();
        let roles: Vec<crate::models::Role> = load(&store, Collection::Roles).unwrap();
        assert!(roles.is_empty());
    }

    #[test]
    fn test_put_replaces_whole_collection() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("logs", "[1,2,3]").unwrap();
        store.put("logs", "[4]").unwrap();

        assert_eq!(store.get("logs").unwrap().as_deref(), Some("[4]"));

        let conn = store.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM collections", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("production.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.put("staff", "[]").unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("staff").unwrap().as_deref(), Some("[]"));
    }
}
