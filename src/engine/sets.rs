//! Set-family operations.

use bytes::Bytes;
use hashbrown::HashSet;

use super::{
    drop_if_empty, glob_match, live, purge_if_expired, scan_page, DataValue, Engine, EngineError,
    EngineResult, Entry,
};

impl Engine {
    /// Add members, returning the count of members that were NEW.
    pub fn sadd(&self, key: &str, members: &[Bytes]) -> EngineResult<i64> {
        if members.is_empty() {
            return Ok(0);
        }
        self.with_set_mut(key, |set| {
            Ok(members.iter().filter(|m| set.insert((*m).clone())).count() as i64)
        })
    }

    /// Remove members, returning how many were present.
    pub fn srem(&self, key: &str, members: &[Bytes]) -> EngineResult<i64> {
        let now = Self::now_ms();
        let mut ks = self.write();
        purge_if_expired(&mut ks, key.as_bytes(), now);
        let removed = match ks.get_mut(key.as_bytes()).map(|e| &mut e.value) {
            None => 0,
            Some(DataValue::Set(set)) => {
                members.iter().filter(|m| set.remove(m.as_ref())).count() as i64
            }
            Some(_) => return Err(EngineError::WrongType),
        };
        drop_if_empty(&mut ks, key.as_bytes());
        Ok(removed)
    }

    pub fn smembers(&self, key: &str) -> EngineResult<Vec<Bytes>> {
        self.with_set(key, |set| {
            let mut out: Vec<Bytes> = set.map(|s| s.iter().cloned().collect()).unwrap_or_default();
            out.sort();
            out
        })
    }

    pub fn sismember(&self, key: &str, member: &[u8]) -> EngineResult<bool> {
        self.with_set(key, |set| set.map(|s| s.contains(member)).unwrap_or(false))
    }

    pub fn scard(&self, key: &str) -> EngineResult<i64> {
        self.with_set(key, |set| set.map(|s| s.len() as i64).unwrap_or(0))
    }

    /// Cursor-based iteration over set members.
    pub fn sscan(
        &self,
        key: &str,
        cursor: u64,
        pattern: Option<&str>,
        count: usize,
    ) -> EngineResult<(u64, Vec<Bytes>)> {
        let mut members = self.smembers(key)?;
        if let Some(p) = pattern {
            members.retain(|m| glob_match(p.as_bytes(), m.as_ref()));
        }
        Ok(scan_page(members, cursor, count))
    }

    fn with_set<T>(
        &self,
        key: &str,
        f: impl FnOnce(Option<&HashSet<Bytes>>) -> T,
    ) -> EngineResult<T> {
        let now = Self::now_ms();
        let ks = self.read();
        match live(&ks, key.as_bytes(), now).map(|e| &e.value) {
            None => Ok(f(None)),
            Some(DataValue::Set(s)) => Ok(f(Some(s))),
            Some(_) => Err(EngineError::WrongType),
        }
    }

    fn with_set_mut<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut HashSet<Bytes>) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let now = Self::now_ms();
        let mut ks = self.write();
        purge_if_expired(&mut ks, key.as_bytes(), now);
        let entry = ks
            .entry(Bytes::copy_from_slice(key.as_bytes()))
            .or_insert_with(|| Entry::new(DataValue::Set(HashSet::new())));
        let result = match &mut entry.value {
            DataValue::Set(s) => f(s),
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
    fn test_sadd_counts_new_members_only() {
        let e = engine();
        assert_eq!(e.sadd("s", &[b(b"a"), b(b"b")]).unwrap(), 2);
        assert_eq!(e.sadd("s", &[b(b"a"), b(b"b"), b(b"c")]).unwrap(), 1);
        assert_eq!(e.scard("s").unwrap(), 3);
    }

    #[test]
    fn test_srem_and_membership() {
        let e = engine();
        e.sadd("s", &[b(b"a"), b(b"b")]).unwrap();
        assert!(e.sismember("s", b"a").unwrap());
        assert!(!e.sismember("s", b"z").unwrap());
        assert_eq!(e.srem("s", &[b(b"a"), b(b"z")]).unwrap(), 1);
        assert_eq!(e.srem("s", &[b(b"b")]).unwrap(), 1);
        assert_eq!(e.exists(&["s"]), 0);
        assert_eq!(e.srem("s", &[b(b"a")]).unwrap(), 0);
    }

    #[test]
    fn test_smembers_sorted() {
        let e = engine();
        e.sadd("s", &[b(b"c"), b(b"a"), b(b"b")]).unwrap();
        assert_eq!(e.smembers("s").unwrap(), vec![b(b"a"), b(b"b"), b(b"c")]);
        assert!(e.smembers("missing").unwrap().is_empty());
    }

    #[test]
    fn test_sscan() {
        let e = engine();
        for i in 0..8 {
            e.sadd("s", &[Bytes::from(format!("m{}", i))]).unwrap();
        }
        let (next, page) = e.sscan("s", 0, None, 3).unwrap();
        assert_eq!(page.len(), 3);
        assert!(next > 0);
        let (_, all) = e.sscan("s", 0, Some("m*"), 100).unwrap();
        assert_eq!(all.len(), 8);
    }

    #[test]
    fn test_wrong_type() {
        let e = engine();
        e.set("k", b(b"v"), &Default::default());
        assert!(matches!(
            e.sadd("k", &[b(b"m")]),
            Err(EngineError::WrongType)
        ));
    }
}
