//! String-family operations.

use bytes::Bytes;

use super::{live, purge_if_expired, DataValue, Engine, EngineError, EngineResult, Entry};
use crate::types::SetOptions;
use crate::value::{fmt_float, parse_float, parse_int};

impl Engine {
    pub fn get(&self, key: &str) -> EngineResult<Option<Bytes>> {
        let now = Self::now_ms();
        let ks = self.read();
        match live(&ks, key.as_bytes(), now).map(|e| &e.value) {
            None => Ok(None),
            Some(DataValue::String(b)) => Ok(Some(b.clone())),
            Some(_) => Err(EngineError::WrongType),
        }
    }

    /// SET with expiry and conditional-existence options. Returns whether
    /// the key was actually set.
    pub fn set(&self, key: &str, value: Bytes, opts: &SetOptions) -> bool {
        let now = Self::now_ms();
        let mut ks = self.write();
        purge_if_expired(&mut ks, key.as_bytes(), now);

        let exists = ks.contains_key(key.as_bytes());
        if (opts.nx && exists) || (opts.xx && !exists) {
            return false;
        }

        let ttl_ms = opts
            .ex
            .map(|s| s as i64 * 1000)
            .or(opts.px.map(|ms| ms as i64));
        let mut entry = Entry::new(DataValue::String(value));
        entry.expires_at = ttl_ms.map(|ms| now + ms);
        ks.insert(Bytes::copy_from_slice(key.as_bytes()), entry);
        true
    }

    pub fn getdel(&self, key: &str) -> EngineResult<Option<Bytes>> {
        let now = Self::now_ms();
        let mut ks = self.write();
        purge_if_expired(&mut ks, key.as_bytes(), now);
        match ks.get(key.as_bytes()).map(|e| &e.value) {
            None => Ok(None),
            Some(DataValue::String(_)) => {
                let entry = ks.remove(key.as_bytes());
                match entry.map(|e| e.value) {
                    Some(DataValue::String(b)) => Ok(Some(b)),
                    _ => Ok(None),
                }
            }
            Some(_) => Err(EngineError::WrongType),
        }
    }

    /// Append to the string at key, creating it if absent. Returns the
    /// resulting length.
    pub fn append(&self, key: &str, value: &[u8]) -> EngineResult<i64> {
        self.update_string(key, |current| {
            let mut next = current.unwrap_or_default().to_vec();
            next.extend_from_slice(value);
            Ok(next)
        })
        .map(|b| b.len() as i64)
    }

    pub fn strlen(&self, key: &str) -> EngineResult<i64> {
        Ok(self.get(key)?.map(|b| b.len() as i64).unwrap_or(0))
    }

    /// GETRANGE with negative-index clamping; missing keys yield empty bytes.
    pub fn getrange(&self, key: &str, start: i64, end: i64) -> EngineResult<Bytes> {
        let Some(value) = self.get(key)? else {
            return Ok(Bytes::new());
        };
        let len = value.len() as i64;
        let start = clamp_index(start, len);
        let end = clamp_index(end, len);
        if start > end || start >= len {
            return Ok(Bytes::new());
        }
        let end = (end + 1).min(len);
        Ok(value.slice(start as usize..end as usize))
    }

    /// Overwrite part of the string starting at offset, zero-padding any
    /// gap. Returns the resulting length.
    pub fn setrange(&self, key: &str, offset: i64, value: &[u8]) -> EngineResult<i64> {
        if offset < 0 {
            return Err(EngineError::OffsetOutOfRange);
        }
        let offset = offset as usize;
        self.update_string(key, |current| {
            let mut next = current.unwrap_or_default().to_vec();
            if next.len() < offset + value.len() {
                next.resize(offset + value.len(), 0);
            }
            next[offset..offset + value.len()].copy_from_slice(value);
            Ok(next)
        })
        .map(|b| b.len() as i64)
    }

    pub fn incr(&self, key: &str) -> EngineResult<i64> {
        self.incrby(key, 1)
    }

    pub fn decr(&self, key: &str) -> EngineResult<i64> {
        self.incrby(key, -1)
    }

    /// Increment the integer value at key; a missing key counts as 0.
    pub fn incrby(&self, key: &str, delta: i64) -> EngineResult<i64> {
        let mut result = 0;
        self.update_string(key, |current| {
            let base = match current {
                None => 0,
                Some(raw) => parse_int(raw).ok_or(EngineError::NotInteger)?,
            };
            result = base.checked_add(delta).ok_or(EngineError::Overflow)?;
            Ok(result.to_string().into_bytes())
        })?;
        Ok(result)
    }

    pub fn decrby(&self, key: &str, delta: i64) -> EngineResult<i64> {
        self.incrby(key, delta.checked_neg().ok_or(EngineError::Overflow)?)
    }

    /// Increment the float value at key, returning the new value in its
    /// canonical text form.
    pub fn incrbyfloat(&self, key: &str, delta: f64) -> EngineResult<String> {
        let mut rendered = String::new();
        self.update_string(key, |current| {
            let base = match current {
                None => 0.0,
                Some(raw) => parse_float(raw).ok_or(EngineError::NotFloat)?,
            };
            let next = base + delta;
            if !next.is_finite() {
                return Err(EngineError::Overflow);
            }
            rendered = fmt_float(next);
            Ok(rendered.clone().into_bytes())
        })?;
        Ok(rendered)
    }

    /// Read-modify-write on a string key, preserving its expiry.
    fn update_string(
        &self,
        key: &str,
        f: impl FnOnce(Option<&[u8]>) -> EngineResult<Vec<u8>>,
    ) -> EngineResult<Bytes> {
        let now = Self::now_ms();
        let mut ks = self.write();
        purge_if_expired(&mut ks, key.as_bytes(), now);

        let current = match ks.get(key.as_bytes()).map(|e| &e.value) {
            None => None,
            Some(DataValue::String(b)) => Some(b.clone()),
            Some(_) => return Err(EngineError::WrongType),
        };

        let next = Bytes::from(f(current.as_deref())?);
        match ks.get_mut(key.as_bytes()) {
            Some(entry) => entry.value = DataValue::String(next.clone()),
            None => {
                ks.insert(
                    Bytes::copy_from_slice(key.as_bytes()),
                    Entry::new(DataValue::String(next.clone())),
                );
            }
        }
        Ok(next)
    }
}

fn clamp_index(i: i64, len: i64) -> i64 {
    if i < 0 {
        (len + i).max(0)
    } else {
        i
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::open_memory()
    }

    #[test]
    fn test_set_get_roundtrip() {
        let e = engine();
        assert!(e.set("k", Bytes::from_static(b"v"), &SetOptions::default()));
        assert_eq!(e.get("k").unwrap(), Some(Bytes::from_static(b"v")));
    }

    #[test]
    fn test_empty_value_is_present() {
        let e = engine();
        e.set("k", Bytes::new(), &SetOptions::default());
        assert_eq!(e.get("k").unwrap(), Some(Bytes::new()));
        assert_eq!(e.exists(&["k"]), 1);
    }

    #[test]
    fn test_set_nx_xx() {
        let e = engine();
        assert!(e.set("k", Bytes::from_static(b"a"), &SetOptions::default().nx()));
        assert!(!e.set("k", Bytes::from_static(b"b"), &SetOptions::default().nx()));
        assert_eq!(e.get("k").unwrap(), Some(Bytes::from_static(b"a")));
        assert!(e.set("k", Bytes::from_static(b"c"), &SetOptions::default().xx()));
        assert!(!e.set("other", Bytes::from_static(b"x"), &SetOptions::default().xx()));
        assert_eq!(e.get("other").unwrap(), None);
    }

    #[test]
    fn test_incr_semantics() {
        let e = engine();
        assert_eq!(e.incr("n").unwrap(), 1);
        assert_eq!(e.incrby("n", 9).unwrap(), 10);
        assert_eq!(e.decrby("n", 3).unwrap(), 7);

        e.set("s", Bytes::from_static(b"abc"), &SetOptions::default());
        assert!(matches!(e.incr("s"), Err(EngineError::NotInteger)));

        e.set("big", Bytes::from(i64::MAX.to_string()), &SetOptions::default());
        assert!(matches!(e.incr("big"), Err(EngineError::Overflow)));
    }

    #[test]
    fn test_incrbyfloat() {
        let e = engine();
        assert_eq!(e.incrbyfloat("f", 1.5).unwrap(), "1.5");
        assert_eq!(e.incrbyfloat("f", 4.5).unwrap(), "6");
    }

    #[test]
    fn test_append_and_strlen() {
        let e = engine();
        assert_eq!(e.append("k", b"foo").unwrap(), 3);
        assert_eq!(e.append("k", b"bar").unwrap(), 6);
        assert_eq!(e.strlen("k").unwrap(), 6);
        assert_eq!(e.strlen("missing").unwrap(), 0);
    }

    #[test]
    fn test_getrange_setrange() {
        let e = engine();
        e.set("k", Bytes::from_static(b"Hello World"), &SetOptions::default());
        assert_eq!(e.getrange("k", 0, 4).unwrap(), Bytes::from_static(b"Hello"));
        assert_eq!(e.getrange("k", -5, -1).unwrap(), Bytes::from_static(b"World"));
        assert_eq!(e.getrange("k", 50, 60).unwrap(), Bytes::new());
        assert_eq!(e.getrange("missing", 0, 10).unwrap(), Bytes::new());

        assert_eq!(e.setrange("k", 6, b"Redis").unwrap(), 11);
        assert_eq!(e.get("k").unwrap(), Some(Bytes::from_static(b"Hello Redis")));
        assert_eq!(e.setrange("pad", 3, b"x").unwrap(), 4);
        assert_eq!(e.get("pad").unwrap(), Some(Bytes::from_static(b"\0\0\0x")));
        assert!(matches!(
            e.setrange("k", -1, b"x"),
            Err(EngineError::OffsetOutOfRange)
        ));
    }

    #[test]
    fn test_getdel() {
        let e = engine();
        e.set("k", Bytes::from_static(b"v"), &SetOptions::default());
        assert_eq!(e.getdel("k").unwrap(), Some(Bytes::from_static(b"v")));
        assert_eq!(e.get("k").unwrap(), None);
        assert_eq!(e.getdel("k").unwrap(), None);
    }

    #[test]
    fn test_wrong_type_surfaces() {
        let e = engine();
        e.lpush("l", &[Bytes::from_static(b"x")]).unwrap();
        assert!(matches!(e.get("l"), Err(EngineError::WrongType)));
        assert!(matches!(e.append("l", b"x"), Err(EngineError::WrongType)));
    }
}
