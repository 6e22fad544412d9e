//! Key-family operations: deletion, expiry, rename, iteration.

use bytes::Bytes;

use super::{glob_match, live, purge_if_expired, scan_page, Engine, EngineError, EngineResult};
use crate::types::KeyType;

/// TTL sentinel: key exists but carries no expiry.
pub const TTL_NO_EXPIRY: i64 = -1;
/// TTL sentinel: key does not exist.
pub const TTL_MISSING: i64 = -2;

impl Engine {
    /// Delete keys, returning how many existed.
    pub fn del(&self, keys: &[&str]) -> i64 {
        let now = Self::now_ms();
        let mut ks = self.write();
        let mut removed = 0;
        for key in keys {
            purge_if_expired(&mut ks, key.as_bytes(), now);
            if ks.remove(key.as_bytes()).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Count how many of the given keys exist; duplicates count repeatedly.
    pub fn exists(&self, keys: &[&str]) -> i64 {
        let now = Self::now_ms();
        let ks = self.read();
        keys.iter()
            .filter(|k| live(&ks, k.as_bytes(), now).is_some())
            .count() as i64
    }

    pub fn key_type(&self, key: &str) -> Option<KeyType> {
        let now = Self::now_ms();
        let ks = self.read();
        live(&ks, key.as_bytes(), now).map(|e| e.value.key_type())
    }

    /// Remaining TTL in seconds; -1 when no expiry, -2 when missing.
    pub fn ttl(&self, key: &str) -> i64 {
        match self.pttl(key) {
            ms if ms >= 0 => (ms + 999) / 1000,
            sentinel => sentinel,
        }
    }

    /// Remaining TTL in milliseconds; -1 when no expiry, -2 when missing.
    pub fn pttl(&self, key: &str) -> i64 {
        let now = Self::now_ms();
        let ks = self.read();
        match live(&ks, key.as_bytes(), now) {
            None => TTL_MISSING,
            Some(entry) => match entry.expires_at {
                None => TTL_NO_EXPIRY,
                Some(at) => at - now,
            },
        }
    }

    pub fn expire(&self, key: &str, seconds: i64) -> bool {
        self.expire_at_ms(key, Self::now_ms() + seconds.saturating_mul(1000))
    }

    pub fn pexpire(&self, key: &str, millis: i64) -> bool {
        self.expire_at_ms(key, Self::now_ms() + millis)
    }

    pub fn expireat(&self, key: &str, unix_secs: i64) -> bool {
        self.expire_at_ms(key, unix_secs.saturating_mul(1000))
    }

    pub fn pexpireat(&self, key: &str, unix_ms: i64) -> bool {
        self.expire_at_ms(key, unix_ms)
    }

    /// Set an absolute expiry; a deadline in the past deletes the key.
    /// Returns false when the key does not exist.
    fn expire_at_ms(&self, key: &str, at_ms: i64) -> bool {
        let now = Self::now_ms();
        let mut ks = self.write();
        purge_if_expired(&mut ks, key.as_bytes(), now);
        if !ks.contains_key(key.as_bytes()) {
            return false;
        }
        if at_ms <= now {
            ks.remove(key.as_bytes());
        } else if let Some(entry) = ks.get_mut(key.as_bytes()) {
            entry.expires_at = Some(at_ms);
        }
        true
    }

    /// Remove the expiry from a key. Returns false when the key is missing
    /// or had no expiry.
    pub fn persist_key(&self, key: &str) -> bool {
        let now = Self::now_ms();
        let mut ks = self.write();
        purge_if_expired(&mut ks, key.as_bytes(), now);
        match ks.get_mut(key.as_bytes()) {
            Some(entry) if entry.expires_at.is_some() => {
                entry.expires_at = None;
                true
            }
            _ => false,
        }
    }

    /// Rename src to dst, overwriting dst. Errors when src is missing.
    pub fn rename(&self, src: &str, dst: &str) -> EngineResult<()> {
        let now = Self::now_ms();
        let mut ks = self.write();
        purge_if_expired(&mut ks, src.as_bytes(), now);
        let entry = ks.remove(src.as_bytes()).ok_or(EngineError::NoSuchKey)?;
        ks.insert(Bytes::copy_from_slice(dst.as_bytes()), entry);
        Ok(())
    }

    /// Rename src to dst only when dst does not exist. When dst exists,
    /// both keys are left untouched and false is returned.
    pub fn renamenx(&self, src: &str, dst: &str) -> EngineResult<bool> {
        let now = Self::now_ms();
        let mut ks = self.write();
        purge_if_expired(&mut ks, src.as_bytes(), now);
        purge_if_expired(&mut ks, dst.as_bytes(), now);
        if !ks.contains_key(src.as_bytes()) {
            return Err(EngineError::NoSuchKey);
        }
        if ks.contains_key(dst.as_bytes()) {
            return Ok(false);
        }
        let entry = ks.remove(src.as_bytes()).ok_or(EngineError::NoSuchKey)?;
        ks.insert(Bytes::copy_from_slice(dst.as_bytes()), entry);
        Ok(true)
    }

    /// All live keys matching a glob pattern.
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        let now = Self::now_ms();
        let ks = self.read();
        let mut out: Vec<String> = ks
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .filter(|(k, _)| glob_match(pattern.as_bytes(), k.as_ref()))
            .map(|(k, _)| String::from_utf8_lossy(k.as_ref()).into_owned())
            .collect();
        out.sort();
        out
    }

    pub fn dbsize(&self) -> i64 {
        let now = Self::now_ms();
        let ks = self.read();
        ks.values().filter(|e| !e.is_expired(now)).count() as i64
    }

    pub fn flushdb(&self) {
        self.write().clear();
    }

    /// Cursor-based iteration over live keys. Terminal cursor is 0.
    pub fn scan(&self, cursor: u64, pattern: Option<&str>, count: usize) -> (u64, Vec<String>) {
        let matching = match pattern {
            Some(p) => self.keys(p),
            None => self.keys("*"),
        };
        scan_page(matching, cursor, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SetOptions;

    fn engine() -> Engine {
        Engine::open_memory()
    }

    fn set(e: &Engine, key: &str, value: &'static [u8]) {
        e.set(key, Bytes::from_static(value), &SetOptions::default());
    }

    #[test]
    fn test_ttl_sentinels_are_distinct() {
        let e = engine();
        assert_eq!(e.ttl("missing"), TTL_MISSING);
        assert_eq!(e.pttl("missing"), TTL_MISSING);

        set(&e, "k", b"v");
        assert_eq!(e.ttl("k"), TTL_NO_EXPIRY);
        assert_eq!(e.pttl("k"), TTL_NO_EXPIRY);
        assert_ne!(TTL_NO_EXPIRY, TTL_MISSING);

        assert!(e.expire("k", 100));
        let ttl = e.ttl("k");
        assert!(ttl > 0 && ttl <= 100, "ttl = {}", ttl);
    }

    #[test]
    fn test_expire_past_deadline_deletes() {
        let e = engine();
        set(&e, "k", b"v");
        assert!(e.expire("k", -1));
        assert_eq!(e.exists(&["k"]), 0);
    }

    #[test]
    fn test_persist_removes_expiry() {
        let e = engine();
        set(&e, "k", b"v");
        assert!(!e.persist_key("k"));
        e.expire("k", 100);
        assert!(e.persist_key("k"));
        assert_eq!(e.ttl("k"), TTL_NO_EXPIRY);
        assert!(!e.persist_key("missing"));
    }

    #[test]
    fn test_rename_and_renamenx() {
        let e = engine();
        set(&e, "a", b"1");
        set(&e, "b", b"2");

        assert!(matches!(e.rename("missing", "x"), Err(EngineError::NoSuchKey)));

        // Destination exists: both keys untouched, boolean failure.
        assert!(!e.renamenx("a", "b").unwrap());
        assert_eq!(e.get("a").unwrap(), Some(Bytes::from_static(b"1")));
        assert_eq!(e.get("b").unwrap(), Some(Bytes::from_static(b"2")));

        assert!(e.renamenx("a", "c").unwrap());
        assert_eq!(e.get("a").unwrap(), None);
        assert_eq!(e.get("c").unwrap(), Some(Bytes::from_static(b"1")));

        e.rename("c", "b").unwrap();
        assert_eq!(e.get("b").unwrap(), Some(Bytes::from_static(b"1")));
    }

    #[test]
    fn test_keys_pattern_and_dbsize() {
        let e = engine();
        set(&e, "user:1", b"a");
        set(&e, "user:2", b"b");
        set(&e, "session:1", b"c");

        assert_eq!(e.keys("user:*"), vec!["user:1", "user:2"]);
        assert_eq!(e.keys("*").len(), 3);
        assert_eq!(e.dbsize(), 3);

        e.flushdb();
        assert_eq!(e.dbsize(), 0);
    }

    #[test]
    fn test_scan_walks_whole_keyspace() {
        let e = engine();
        for i in 0..23 {
            set_owned(&e, format!("k{:02}", i));
        }
        let mut seen = Vec::new();
        let mut cursor = 0;
        loop {
            let (next, page) = e.scan(cursor, None, 5);
            seen.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        assert_eq!(seen.len(), 23);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 23);
    }

    fn set_owned(e: &Engine, key: String) {
        e.set(&key, Bytes::from_static(b"v"), &SetOptions::default());
    }
}
