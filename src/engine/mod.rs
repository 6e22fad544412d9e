//! Embedded Storage Engine
//!
//! In-process keyspace with typed values, millisecond expiry, and optional
//! snapshot persistence. One engine backs one embedded session; the shared
//! state is lock-protected so cloned handles stay safe under concurrent use.

mod glob;
mod hashes;
mod keys;
mod lists;
mod sets;
mod snapshot;
mod strings;
mod zsets;

use bytes::Bytes;
use hashbrown::{HashMap, HashSet};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::info;

use crate::types::KeyType;

pub(crate) use glob::glob_match;

/// Number of logical databases, addressable via SELECT.
pub const DB_COUNT: usize = 16;

/// Engine-level failure, rendered in wire message form.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("ERR value is not an integer or out of range")]
    NotInteger,

    #[error("ERR value is not a valid float")]
    NotFloat,

    #[error("ERR increment or decrement would overflow")]
    Overflow,

    #[error("ERR no such key")]
    NoSuchKey,

    #[error("ERR offset is out of range")]
    OffsetOutOfRange,

    #[error("ERR invalid cursor")]
    InvalidCursor,

    #[error("ERR DB index is out of range")]
    DbIndexOutOfRange,

    #[error("ERR syntax error")]
    Syntax,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Typed value held at a key.
#[derive(Debug, Clone)]
pub(crate) enum DataValue {
    String(Bytes),
    Hash(HashMap<Bytes, Bytes>),
    List(VecDeque<Bytes>),
    Set(HashSet<Bytes>),
    ZSet(HashMap<Bytes, f64>),
}

impl DataValue {
    pub(crate) fn key_type(&self) -> KeyType {
        match self {
            DataValue::String(_) => KeyType::String,
            DataValue::Hash(_) => KeyType::Hash,
            DataValue::List(_) => KeyType::List,
            DataValue::Set(_) => KeyType::Set,
            DataValue::ZSet(_) => KeyType::ZSet,
        }
    }
}

/// Keyspace entry: value plus optional expiry (unix millis).
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub value: DataValue,
    pub expires_at: Option<i64>,
}

impl Entry {
    pub(crate) fn new(value: DataValue) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    pub(crate) fn is_expired(&self, now: i64) -> bool {
        self.expires_at.map(|t| t <= now).unwrap_or(false)
    }
}

pub(crate) type Keyspace = HashMap<Bytes, Entry>;

struct Shared {
    dbs: Vec<RwLock<Keyspace>>,
    path: Option<PathBuf>,
    /// Working-set budget hint in megabytes. Advisory only.
    cache_mb: usize,
}

/// The embedded engine: shared keyspaces plus a per-handle selected database.
pub struct Engine {
    shared: Arc<Shared>,
    selected: usize,
}

impl Clone for Engine {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            selected: self.selected,
        }
    }
}

impl Engine {
    /// Open a non-persistent in-memory engine with the default cache budget.
    pub fn open_memory() -> Self {
        Self::open_memory_with(64)
    }

    /// Open a non-persistent in-memory engine with an explicit cache budget.
    pub fn open_memory_with(cache_mb: usize) -> Self {
        Self::with_path(None, cache_mb)
    }

    /// Open a persistent engine at the given path, loading the snapshot
    /// if one exists.
    pub fn open(path: &Path, cache_mb: usize) -> EngineResult<Self> {
        let engine = Self::with_path(Some(path.to_path_buf()), cache_mb);
        if path.exists() {
            let loaded = snapshot::load(path)?;
            for (i, ks) in loaded.into_iter().enumerate() {
                *engine.shared.dbs[i].write() = ks;
            }
        }
        info!(path = %path.display(), cache_mb, "engine opened");
        Ok(engine)
    }

    fn with_path(path: Option<PathBuf>, cache_mb: usize) -> Self {
        let dbs = (0..DB_COUNT).map(|_| RwLock::new(Keyspace::new())).collect();
        Self {
            shared: Arc::new(Shared { dbs, path, cache_mb }),
            selected: 0,
        }
    }

    /// Advisory working-set budget this engine was opened with.
    pub fn cache_mb(&self) -> usize {
        self.shared.cache_mb
    }

    /// Switch the selected logical database for this handle.
    pub fn select(&mut self, db: usize) -> EngineResult<()> {
        if db >= DB_COUNT {
            return Err(EngineError::DbIndexOutOfRange);
        }
        self.selected = db;
        Ok(())
    }

    pub fn selected_db(&self) -> usize {
        self.selected
    }

    /// Write the snapshot if this engine is persistent.
    pub fn persist(&self) -> EngineResult<()> {
        if let Some(path) = &self.shared.path {
            let guards: Vec<_> = self.shared.dbs.iter().map(|db| db.read()).collect();
            let views: Vec<&Keyspace> = guards.iter().map(|g| &**g).collect();
            snapshot::save(path, &views)?;
        }
        Ok(())
    }

    /// Drop expired entries in every database, returning an estimate of the
    /// bytes reclaimed, and rewrite the snapshot if persistent.
    pub fn vacuum(&self) -> EngineResult<i64> {
        let now = Self::now_ms();
        let mut reclaimed: i64 = 0;
        for db in &self.shared.dbs {
            let mut ks = db.write();
            ks.retain(|key, entry| {
                if entry.is_expired(now) {
                    reclaimed += (key.len() + entry_weight(&entry.value)) as i64;
                    false
                } else {
                    true
                }
            });
        }
        self.persist()?;
        Ok(reclaimed)
    }

    pub(crate) fn now_ms() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Keyspace> {
        self.shared.dbs[self.selected].read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Keyspace> {
        self.shared.dbs[self.selected].write()
    }
}

/// Look up a live (non-expired) entry.
pub(crate) fn live<'a>(ks: &'a Keyspace, key: &[u8], now: i64) -> Option<&'a Entry> {
    ks.get(key).filter(|e| !e.is_expired(now))
}

/// Remove the entry if it has expired, so writers see a clean slot.
pub(crate) fn purge_if_expired(ks: &mut Keyspace, key: &[u8], now: i64) {
    let expired = ks.get(key).map(|e| e.is_expired(now)).unwrap_or(false);
    if expired {
        ks.remove(key);
    }
}

/// Remove a collection entry that has become empty.
pub(crate) fn drop_if_empty(ks: &mut Keyspace, key: &[u8]) {
    let empty = match ks.get(key).map(|e| &e.value) {
        Some(DataValue::Hash(h)) => h.is_empty(),
        Some(DataValue::List(l)) => l.is_empty(),
        Some(DataValue::Set(s)) => s.is_empty(),
        Some(DataValue::ZSet(z)) => z.is_empty(),
        _ => false,
    };
    if empty {
        ks.remove(key);
    }
}

fn entry_weight(value: &DataValue) -> usize {
    match value {
        DataValue::String(b) => b.len(),
        DataValue::Hash(h) => h.iter().map(|(f, v)| f.len() + v.len()).sum(),
        DataValue::List(l) => l.iter().map(|v| v.len()).sum(),
        DataValue::Set(s) => s.iter().map(|m| m.len()).sum(),
        DataValue::ZSet(z) => z.iter().map(|(m, _)| m.len() + 8).sum(),
    }
}

/// Offset-based scan over a sorted item snapshot. The terminal cursor is 0;
/// continuation cursors are strictly positive, so the two are never confused.
pub(crate) fn scan_page<T>(items: Vec<T>, cursor: u64, count: usize) -> (u64, Vec<T>) {
    let count = count.max(1);
    let offset = cursor as usize;
    if offset >= items.len() {
        return (0, Vec::new());
    }
    let page: Vec<T> = items.into_iter().skip(offset).take(count).collect();
    let next = offset + page.len();
    let next_cursor = if page.len() < count { 0 } else { next as u64 };
    (next_cursor, page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_engine_honors_cache_budget() {
        assert_eq!(Engine::open_memory().cache_mb(), 64);
        assert_eq!(Engine::open_memory_with(256).cache_mb(), 256);
    }

    #[test]
    fn test_select_bounds() {
        let mut engine = Engine::open_memory();
        assert!(engine.select(15).is_ok());
        assert!(matches!(
            engine.select(16),
            Err(EngineError::DbIndexOutOfRange)
        ));
    }

    #[test]
    fn test_databases_are_isolated() {
        let mut engine = Engine::open_memory();
        engine.set("k", Bytes::from_static(b"v"), &Default::default());
        engine.select(1).unwrap();
        assert_eq!(engine.get("k").unwrap(), None);
        engine.select(0).unwrap();
        assert_eq!(engine.get("k").unwrap(), Some(Bytes::from_static(b"v")));
    }

    #[test]
    fn test_scan_page_terminal_cursor() {
        let items: Vec<i32> = (0..25).collect();
        let (next, page) = scan_page(items.clone(), 0, 10);
        assert_eq!(next, 10);
        assert_eq!(page.len(), 10);
        let (next, page) = scan_page(items.clone(), next, 10);
        assert_eq!(next, 20);
        assert_eq!(page, (10..20).collect::<Vec<i32>>());
        let (next, page) = scan_page(items, next, 10);
        assert_eq!(next, 0);
        assert_eq!(page.len(), 5);
    }
}
