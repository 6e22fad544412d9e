//! Hash-family operations.

use bytes::Bytes;
use hashbrown::HashMap;

use super::{
    drop_if_empty, glob_match, live, purge_if_expired, scan_page, DataValue, Engine, EngineError,
    EngineResult, Entry,
};
use crate::value::{fmt_float, parse_float, parse_int};

impl Engine {
    /// Set hash fields, returning the count of fields that were NEW.
    /// Updating an existing field contributes 0.
    pub fn hset(&self, key: &str, pairs: &[(Bytes, Bytes)]) -> EngineResult<i64> {
        if pairs.is_empty() {
            return Ok(0);
        }
        self.with_hash_mut(key, |hash| {
            let mut new_fields = 0;
            for (field, value) in pairs {
                if hash.insert(field.clone(), value.clone()).is_none() {
                    new_fields += 1;
                }
            }
            Ok(new_fields)
        })
    }

    pub fn hget(&self, key: &str, field: &[u8]) -> EngineResult<Option<Bytes>> {
        self.with_hash(key, |hash| {
            hash.and_then(|h| h.get(field).cloned())
        })
    }

    pub fn hmget(&self, key: &str, fields: &[Bytes]) -> EngineResult<Vec<Option<Bytes>>> {
        self.with_hash(key, |hash| {
            fields
                .iter()
                .map(|f| hash.and_then(|h| h.get(f).cloned()))
                .collect()
        })
    }

    pub fn hgetall(&self, key: &str) -> EngineResult<Vec<(Bytes, Bytes)>> {
        self.with_hash(key, |hash| {
            let mut out: Vec<(Bytes, Bytes)> = hash
                .map(|h| h.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
                .unwrap_or_default();
            out.sort_by(|a, b| a.0.cmp(&b.0));
            out
        })
    }

    /// Delete fields, returning how many existed. Removes the key when the
    /// hash becomes empty.
    pub fn hdel(&self, key: &str, fields: &[Bytes]) -> EngineResult<i64> {
        let now = Self::now_ms();
        let mut ks = self.write();
        purge_if_expired(&mut ks, key.as_bytes(), now);
        let removed = match ks.get_mut(key.as_bytes()).map(|e| &mut e.value) {
            None => 0,
            Some(DataValue::Hash(h)) => {
                fields.iter().filter(|f| h.remove(*f).is_some()).count() as i64
            }
            Some(_) => return Err(EngineError::WrongType),
        };
        drop_if_empty(&mut ks, key.as_bytes());
        Ok(removed)
    }

    pub fn hexists(&self, key: &str, field: &[u8]) -> EngineResult<bool> {
        self.with_hash(key, |hash| hash.map(|h| h.contains_key(field)).unwrap_or(false))
    }

    pub fn hlen(&self, key: &str) -> EngineResult<i64> {
        self.with_hash(key, |hash| hash.map(|h| h.len() as i64).unwrap_or(0))
    }

    pub fn hkeys(&self, key: &str) -> EngineResult<Vec<Bytes>> {
        self.with_hash(key, |hash| {
            let mut out: Vec<Bytes> = hash.map(|h| h.keys().cloned().collect()).unwrap_or_default();
            out.sort();
            out
        })
    }

    pub fn hvals(&self, key: &str) -> EngineResult<Vec<Bytes>> {
        // Values follow field order so hkeys/hvals stay aligned.
        Ok(self
            .hgetall(key)?
            .into_iter()
            .map(|(_, v)| v)
            .collect())
    }

    pub fn hincrby(&self, key: &str, field: &[u8], delta: i64) -> EngineResult<i64> {
        self.with_hash_mut(key, |hash| {
            let base = match hash.get(field) {
                None => 0,
                Some(raw) => parse_int(raw).ok_or(EngineError::NotInteger)?,
            };
            let next = base.checked_add(delta).ok_or(EngineError::Overflow)?;
            hash.insert(
                Bytes::copy_from_slice(field),
                Bytes::from(next.to_string()),
            );
            Ok(next)
        })
    }

    pub fn hincrbyfloat(&self, key: &str, field: &[u8], delta: f64) -> EngineResult<String> {
        self.with_hash_mut(key, |hash| {
            let base = match hash.get(field) {
                None => 0.0,
                Some(raw) => parse_float(raw).ok_or(EngineError::NotFloat)?,
            };
            let next = base + delta;
            if !next.is_finite() {
                return Err(EngineError::Overflow);
            }
            let rendered = fmt_float(next);
            hash.insert(
                Bytes::copy_from_slice(field),
                Bytes::from(rendered.clone().into_bytes()),
            );
            Ok(rendered)
        })
    }

    /// Cursor-based iteration over hash fields.
    pub fn hscan(
        &self,
        key: &str,
        cursor: u64,
        pattern: Option<&str>,
        count: usize,
    ) -> EngineResult<(u64, Vec<(Bytes, Bytes)>)> {
        let mut entries = self.hgetall(key)?;
        if let Some(p) = pattern {
            entries.retain(|(f, _)| glob_match(p.as_bytes(), f.as_ref()));
        }
        Ok(scan_page(entries, cursor, count))
    }

    fn with_hash<T>(
        &self,
        key: &str,
        f: impl FnOnce(Option<&HashMap<Bytes, Bytes>>) -> T,
    ) -> EngineResult<T> {
        let now = Self::now_ms();
        let ks = self.read();
        match live(&ks, key.as_bytes(), now).map(|e| &e.value) {
            None => Ok(f(None)),
            Some(DataValue::Hash(h)) => Ok(f(Some(h))),
            Some(_) => Err(EngineError::WrongType),
        }
    }

    fn with_hash_mut<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut HashMap<Bytes, Bytes>) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let now = Self::now_ms();
        let mut ks = self.write();
        purge_if_expired(&mut ks, key.as_bytes(), now);
        let entry = ks
            .entry(Bytes::copy_from_slice(key.as_bytes()))
            .or_insert_with(|| Entry::new(DataValue::Hash(HashMap::new())));
        let result = match &mut entry.value {
            DataValue::Hash(h) => f(h),
            _ => Err(EngineError::WrongType),
        };
        drop_if_empty(&mut ks, key.as_bytes());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::open_memory()
    }

    fn b(s: &'static [u8]) -> Bytes {
        Bytes::from_static(s)
    }

    #[test]
    fn test_hset_counts_new_fields_only() {
        let e = engine();
        assert_eq!(e.hset("h", &[(b(b"f"), b(b"v1"))]).unwrap(), 1);
        assert_eq!(e.hset("h", &[(b(b"f"), b(b"v2"))]).unwrap(), 0);
        assert_eq!(e.hget("h", b"f").unwrap(), Some(b(b"v2")));

        assert_eq!(
            e.hset("h", &[(b(b"f"), b(b"v3")), (b(b"g"), b(b"w"))]).unwrap(),
            1
        );
        assert_eq!(e.hlen("h").unwrap(), 2);
    }

    #[test]
    fn test_hdel_and_empty_cleanup() {
        let e = engine();
        e.hset("h", &[(b(b"a"), b(b"1")), (b(b"b"), b(b"2"))]).unwrap();
        assert_eq!(e.hdel("h", &[b(b"a"), b(b"missing")]).unwrap(), 1);
        assert!(e.hexists("h", b"b").unwrap());
        assert_eq!(e.hdel("h", &[b(b"b")]).unwrap(), 1);
        assert_eq!(e.exists(&["h"]), 0);
        assert_eq!(e.key_type("h"), None);
    }

    #[test]
    fn test_hmget_and_hgetall() {
        let e = engine();
        e.hset("h", &[(b(b"a"), b(b"1")), (b(b"b"), b(b"2"))]).unwrap();
        assert_eq!(
            e.hmget("h", &[b(b"a"), b(b"x"), b(b"b")]).unwrap(),
            vec![Some(b(b"1")), None, Some(b(b"2"))]
        );
        assert_eq!(
            e.hgetall("h").unwrap(),
            vec![(b(b"a"), b(b"1")), (b(b"b"), b(b"2"))]
        );
        assert_eq!(e.hkeys("h").unwrap(), vec![b(b"a"), b(b"b")]);
        assert_eq!(e.hvals("h").unwrap(), vec![b(b"1"), b(b"2")]);
        assert!(e.hgetall("missing").unwrap().is_empty());
    }

    #[test]
    fn test_hincrby() {
        let e = engine();
        assert_eq!(e.hincrby("h", b"n", 5).unwrap(), 5);
        assert_eq!(e.hincrby("h", b"n", -2).unwrap(), 3);
        e.hset("h", &[(b(b"s"), b(b"abc"))]).unwrap();
        assert!(matches!(
            e.hincrby("h", b"s", 1),
            Err(EngineError::NotInteger)
        ));
        assert_eq!(e.hincrbyfloat("h", b"f", 0.5).unwrap(), "0.5");
    }

    #[test]
    fn test_hscan_pages() {
        let e = engine();
        for i in 0..12 {
            let field = Bytes::from(format!("f{:02}", i));
            e.hset("h", &[(field, b(b"v"))]).unwrap();
        }
        let (next, page) = e.hscan("h", 0, None, 5).unwrap();
        assert_eq!(page.len(), 5);
        assert!(next > 0);
        let (_, filtered) = e.hscan("h", 0, Some("f0*"), 100).unwrap();
        assert_eq!(filtered.len(), 10);
    }

    #[test]
    fn test_wrong_type() {
        let e = engine();
        e.set("s", b(b"v"), &Default::default());
        assert!(matches!(e.hget("s", b"f"), Err(EngineError::WrongType)));
        assert!(matches!(
            e.hset("s", &[(b(b"f"), b(b"v"))]),
            Err(EngineError::WrongType)
        ));
    }
}
