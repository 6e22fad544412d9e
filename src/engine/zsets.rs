//! Sorted-set-family operations.
//!
//! Scores live in a member-to-score map; range reads sort on demand by
//! (score, member).

use bytes::Bytes;
use hashbrown::HashMap;

use super::{
    drop_if_empty, glob_match, live, purge_if_expired, scan_page, DataValue, Engine, EngineError,
    EngineResult, Entry,
};
use crate::types::ZMember;

impl Engine {
    /// Add members, returning the count of members that were NEW.
    /// Re-scoring an existing member contributes 0.
    pub fn zadd(&self, key: &str, members: &[ZMember]) -> EngineResult<i64> {
        if members.is_empty() {
            return Ok(0);
        }
        self.with_zset_mut(key, |zset| {
            let mut added = 0;
            for m in members {
                if zset.insert(m.member.clone(), m.score).is_none() {
                    added += 1;
                }
            }
            Ok(added)
        })
    }

    /// Remove members, returning how many were present.
    pub fn zrem(&self, key: &str, members: &[Bytes]) -> EngineResult<i64> {
        let now = Self::now_ms();
        let mut ks = self.write();
        purge_if_expired(&mut ks, key.as_bytes(), now);
        let removed = match ks.get_mut(key.as_bytes()).map(|e| &mut e.value) {
            None => 0,
            Some(DataValue::ZSet(zset)) => {
                members
                    .iter()
                    .filter(|m| zset.remove(m.as_ref()).is_some())
                    .count() as i64
            }
            Some(_) => return Err(EngineError::WrongType),
        };
        drop_if_empty(&mut ks, key.as_bytes());
        Ok(removed)
    }

    pub fn zscore(&self, key: &str, member: &[u8]) -> EngineResult<Option<f64>> {
        self.with_zset(key, |zset| zset.and_then(|z| z.get(member).copied()))
    }

    pub fn zcard(&self, key: &str) -> EngineResult<i64> {
        self.with_zset(key, |zset| zset.map(|z| z.len() as i64).unwrap_or(0))
    }

    /// Count members with scores in the inclusive [min, max] range.
    pub fn zcount(&self, key: &str, min: f64, max: f64) -> EngineResult<i64> {
        self.with_zset(key, |zset| {
            zset.map(|z| z.values().filter(|s| min <= **s && **s <= max).count() as i64)
                .unwrap_or(0)
        })
    }

    /// Increment a member's score, creating it at `delta` when absent.
    /// Returns the new score.
    pub fn zincrby(&self, key: &str, delta: f64, member: &[u8]) -> EngineResult<f64> {
        self.with_zset_mut(key, |zset| {
            let next = zset.get(member).copied().unwrap_or(0.0) + delta;
            if !next.is_finite() {
                return Err(EngineError::Overflow);
            }
            zset.insert(Bytes::copy_from_slice(member), next);
            Ok(next)
        })
    }

    /// Members ordered by (score, member), selected by rank range with
    /// negative-index support.
    pub fn zrange(&self, key: &str, start: i64, stop: i64) -> EngineResult<Vec<ZMember>> {
        self.with_zset(key, |zset| {
            let mut all = sorted_members(zset);
            let len = all.len() as i64;
            let start = if start < 0 { (len + start).max(0) } else { start };
            let stop = if stop < 0 { len + stop } else { stop };
            if start >= len || start > stop {
                return Vec::new();
            }
            let stop = stop.min(len - 1);
            all.drain(start as usize..=stop as usize).collect()
        })
    }

    /// Cursor-based iteration over members with scores.
    pub fn zscan(
        &self,
        key: &str,
        cursor: u64,
        pattern: Option<&str>,
        count: usize,
    ) -> EngineResult<(u64, Vec<ZMember>)> {
        let mut members = self.with_zset(key, sorted_members)?;
        if let Some(p) = pattern {
            members.retain(|m| glob_match(p.as_bytes(), m.member.as_ref()));
        }
        Ok(scan_page(members, cursor, count))
    }

    fn with_zset<T>(
        &self,
        key: &str,
        f: impl FnOnce(Option<&HashMap<Bytes, f64>>) -> T,
    ) -> EngineResult<T> {
        let now = Self::now_ms();
        let ks = self.read();
        match live(&ks, key.as_bytes(), now).map(|e| &e.value) {
            None => Ok(f(None)),
            Some(DataValue::ZSet(z)) => Ok(f(Some(z))),
            Some(_) => Err(EngineError::WrongType),
        }
    }

    fn with_zset_mut<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut HashMap<Bytes, f64>) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let now = Self::now_ms();
        let mut ks = self.write();
        purge_if_expired(&mut ks, key.as_bytes(), now);
        let entry = ks
            .entry(Bytes::copy_from_slice(key.as_bytes()))
            .or_insert_with(|| Entry::new(DataValue::ZSet(HashMap::new())));
        let result = match &mut entry.value {
            DataValue::ZSet(z) => f(z),
            _ => Err(EngineError::WrongType),
        };
        drop_if_empty(&mut ks, key.as_bytes());
        result
    }
}

fn sorted_members(zset: Option<&HashMap<Bytes, f64>>) -> Vec<ZMember> {
    let mut out: Vec<ZMember> = zset
        .map(|z| {
            z.iter()
                .map(|(m, s)| ZMember::new(*s, m.clone()))
                .collect()
        })
        .unwrap_or_default();
    out.sort_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.member.cmp(&b.member))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::open_memory()
    }

    fn zm(score: f64, member: &'static [u8]) -> ZMember {
        ZMember::new(score, Bytes::from_static(member))
    }

    #[test]
    fn test_zadd_counts_new_members_only() {
        let e = engine();
        assert_eq!(e.zadd("z", &[zm(1.0, b"a"), zm(2.0, b"b")]).unwrap(), 2);
        assert_eq!(e.zadd("z", &[zm(9.0, b"a")]).unwrap(), 0);
        assert_eq!(e.zscore("z", b"a").unwrap(), Some(9.0));
        assert_eq!(e.zcard("z").unwrap(), 2);
    }

    #[test]
    fn test_zincrby_and_zscore() {
        let e = engine();
        e.zadd("z", &[zm(1.0, b"a")]).unwrap();
        assert_eq!(e.zincrby("z", 5.0, b"a").unwrap(), 6.0);
        assert_eq!(e.zscore("z", b"a").unwrap(), Some(6.0));
        // Missing member starts from zero.
        assert_eq!(e.zincrby("z", 2.5, b"new").unwrap(), 2.5);
        assert_eq!(e.zscore("z", b"missing").unwrap(), None);
    }

    #[test]
    fn test_zrange_order_and_bounds() {
        let e = engine();
        e.zadd("z", &[zm(3.0, b"c"), zm(1.0, b"a"), zm(2.0, b"b")])
            .unwrap();
        let all = e.zrange("z", 0, -1).unwrap();
        let members: Vec<&[u8]> = all.iter().map(|m| m.member.as_ref()).collect();
        assert_eq!(members, vec![b"a" as &[u8], b"b", b"c"]);
        assert_eq!(all[2].score, 3.0);

        let tail = e.zrange("z", -2, -1).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].member.as_ref(), b"b");

        assert!(e.zrange("z", 5, 9).unwrap().is_empty());
        // Equal scores tie-break on member bytes.
        e.zadd("ties", &[zm(1.0, b"y"), zm(1.0, b"x")]).unwrap();
        let ties = e.zrange("ties", 0, -1).unwrap();
        assert_eq!(ties[0].member.as_ref(), b"x");
    }

    #[test]
    fn test_zcount() {
        let e = engine();
        e.zadd("z", &[zm(1.0, b"a"), zm(2.0, b"b"), zm(3.0, b"c")])
            .unwrap();
        assert_eq!(e.zcount("z", 1.5, 3.0).unwrap(), 2);
        assert_eq!(e.zcount("missing", 0.0, 10.0).unwrap(), 0);
    }

    #[test]
    fn test_zrem_and_cleanup() {
        let e = engine();
        e.zadd("z", &[zm(1.0, b"a"), zm(2.0, b"b")]).unwrap();
        assert_eq!(
            e.zrem("z", &[Bytes::from_static(b"a"), Bytes::from_static(b"x")])
                .unwrap(),
            1
        );
        assert_eq!(e.zrem("z", &[Bytes::from_static(b"b")]).unwrap(), 1);
        assert_eq!(e.exists(&["z"]), 0);
    }

    #[test]
    fn test_zscan() {
        let e = engine();
        for i in 0..9 {
            e.zadd("z", &[ZMember::new(i as f64, Bytes::from(format!("m{}", i)))])
                .unwrap();
        }
        let (next, page) = e.zscan("z", 0, None, 4).unwrap();
        assert_eq!(page.len(), 4);
        assert!(next > 0);
        assert_eq!(page[0].member.as_ref(), b"m0");
    }
}
