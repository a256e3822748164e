//! Key/value storage for AutoZoom.
//!
//! [`KeyValueStore`] is the contract the rest of the system persists
//! through. [`StateStore`] implements it on top of redb, with both on-disk
//! and in-memory backends (the latter for testing).

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use redb::{Database, ReadOnlyTable, ReadableDatabase, ReadableTable, Table};
use tracing::debug;

use crate::error::StateResult;
use crate::tables::ENTRIES;

/// Boxed future alias for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StateResult<T>> + Send + 'a>>;

/// Durable byte store. Every write must be persisted before its future
/// resolves, and every failure must be reported.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored at `key`.
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Vec<u8>>>;

    /// Insert or replace the value at `key`.
    fn set<'a>(&'a self, key: &'a str, value: &'a [u8]) -> StoreFuture<'a, ()>;

    /// Remove `key`. Resolves to whether it existed.
    fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool>;

    /// All keys starting with `prefix`.
    fn keys<'a>(&'a self, prefix: &'a str) -> StoreFuture<'a, Vec<String>>;
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        self.write(|_| Ok(()))
    }

    /// Run `f` against the entries table in one committed write transaction.
    fn write<T>(
        &self,
        f: impl FnOnce(&mut Table<'_, &'static str, &'static [u8]>) -> StateResult<T>,
    ) -> StateResult<T> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let result = {
            let mut table = txn.open_table(ENTRIES).map_err(map_err!(Table))?;
            f(&mut table)?
        };
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(result)
    }

    fn read<T>(
        &self,
        f: impl FnOnce(&ReadOnlyTable<&'static str, &'static [u8]>) -> StateResult<T>,
    ) -> StateResult<T> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(ENTRIES).map_err(map_err!(Table))?;
        f(&table)
    }

    pub fn get_entry(&self, key: &str) -> StateResult<Option<Vec<u8>>> {
        self.read(|table| {
            Ok(table
                .get(key)
                .map_err(map_err!(Read))?
                .map(|value| value.value().to_vec()))
        })
    }

    pub fn put_entry(&self, key: &str, value: &[u8]) -> StateResult<()> {
        self.write(|table| {
            table.insert(key, value).map_err(map_err!(Write))?;
            Ok(())
        })?;
        debug!(%key, "entry stored");
        Ok(())
    }

    /// Returns true if the entry existed.
    pub fn delete_entry(&self, key: &str) -> StateResult<bool> {
        let existed = self.write(|table| Ok(table.remove(key).map_err(map_err!(Write))?.is_some()))?;
        debug!(%key, existed, "entry deleted");
        Ok(existed)
    }

    /// Keys starting with `prefix`, in key order.
    pub fn list_keys(&self, prefix: &str) -> StateResult<Vec<String>> {
        self.read(|table| {
            let mut keys = Vec::new();
            for entry in table.range(prefix..).map_err(map_err!(Read))? {
                let (key, _) = entry.map_err(map_err!(Read))?;
                let key = key.value();
                if !key.starts_with(prefix) {
                    break;
                }
                keys.push(key.to_string());
            }
            Ok(keys)
        })
    }
}

impl StateStore {
    /// Run a redb call on the blocking pool. Commits fsync, so they must
    /// not stall executor threads.
    fn blocking<'a, T, F>(&self, f: F) -> StoreFuture<'a, T>
    where
        T: Send + 'static,
        F: FnOnce(&StateStore) -> StateResult<T> + Send + 'static,
    {
        let store = self.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || f(&store))
                .await
                .map_err(map_err!(Backend))?
        })
    }
}

impl KeyValueStore for StateStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Vec<u8>>> {
        let key = key.to_string();
        self.blocking(move |store| store.get_entry(&key))
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a [u8]) -> StoreFuture<'a, ()> {
        let key = key.to_string();
        let value = value.to_vec();
        self.blocking(move |store| store.put_entry(&key, &value))
    }

    fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
        let key = key.to_string();
        self.blocking(move |store| store.delete_entry(&key))
    }

    fn keys<'a>(&'a self, prefix: &'a str) -> StoreFuture<'a, Vec<String>> {
        let prefix = prefix.to_string();
        self.blocking(move |store| store.list_keys(&prefix))
    }
}
