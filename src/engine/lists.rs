//! List-family operations.

use bytes::Bytes;
use std::collections::VecDeque;

use super::{
    drop_if_empty, live, purge_if_expired, DataValue, Engine, EngineError, EngineResult, Entry,
};

impl Engine {
    /// Push values at the head, left to right, so each successive value
    /// becomes the new head. Returns the resulting list length.
    pub fn lpush(&self, key: &str, values: &[Bytes]) -> EngineResult<i64> {
        if values.is_empty() {
            return Ok(0);
        }
        self.with_list_mut(key, |list| {
            for v in values {
                list.push_front(v.clone());
            }
            Ok(list.len() as i64)
        })
    }

    /// Append values at the tail in argument order. Returns the resulting
    /// list length.
    pub fn rpush(&self, key: &str, values: &[Bytes]) -> EngineResult<i64> {
        if values.is_empty() {
            return Ok(0);
        }
        self.with_list_mut(key, |list| {
            for v in values {
                list.push_back(v.clone());
            }
            Ok(list.len() as i64)
        })
    }

    pub fn lpop(&self, key: &str, count: Option<usize>) -> EngineResult<Vec<Bytes>> {
        self.pop(key, count, VecDeque::pop_front)
    }

    pub fn rpop(&self, key: &str, count: Option<usize>) -> EngineResult<Vec<Bytes>> {
        self.pop(key, count, VecDeque::pop_back)
    }

    pub fn llen(&self, key: &str) -> EngineResult<i64> {
        self.with_list(key, |list| list.map(|l| l.len() as i64).unwrap_or(0))
    }

    /// Range with negative-index support; (0, -1) reads the whole list.
    pub fn lrange(&self, key: &str, start: i64, stop: i64) -> EngineResult<Vec<Bytes>> {
        self.with_list(key, |list| {
            let Some(list) = list else {
                return Vec::new();
            };
            let len = list.len() as i64;
            let start = normalize_index(start, len).max(0);
            let stop = normalize_index(stop, len);
            if start >= len || start > stop {
                return Vec::new();
            }
            let stop = stop.min(len - 1);
            list.iter()
                .skip(start as usize)
                .take((stop - start + 1) as usize)
                .cloned()
                .collect()
        })
    }

    pub fn lindex(&self, key: &str, index: i64) -> EngineResult<Option<Bytes>> {
        self.with_list(key, |list| {
            let list = list?;
            let len = list.len() as i64;
            let i = normalize_index(index, len);
            if i < 0 || i >= len {
                return None;
            }
            list.get(i as usize).cloned()
        })
    }

    fn pop(
        &self,
        key: &str,
        count: Option<usize>,
        take: impl Fn(&mut VecDeque<Bytes>) -> Option<Bytes>,
    ) -> EngineResult<Vec<Bytes>> {
        let wanted = count.unwrap_or(1);
        let now = Self::now_ms();
        let mut ks = self.write();
        purge_if_expired(&mut ks, key.as_bytes(), now);
        let popped = match ks.get_mut(key.as_bytes()).map(|e| &mut e.value) {
            None => Vec::new(),
            Some(DataValue::List(list)) => {
                let mut out = Vec::with_capacity(wanted.min(list.len()));
                for _ in 0..wanted {
                    match take(list) {
                        Some(v) => out.push(v),
                        None => break,
                    }
                }
                out
            }
            Some(_) => return Err(EngineError::WrongType),
        };
        drop_if_empty(&mut ks, key.as_bytes());
        Ok(popped)
    }

    fn with_list<T>(
        &self,
        key: &str,
        f: impl FnOnce(Option<&VecDeque<Bytes>>) -> T,
    ) -> EngineResult<T> {
        let now = Self::now_ms();
        let ks = self.read();
        match live(&ks, key.as_bytes(), now).map(|e| &e.value) {
            None => Ok(f(None)),
            Some(DataValue::List(l)) => Ok(f(Some(l))),
            Some(_) => Err(EngineError::WrongType),
        }
    }

    fn with_list_mut<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut VecDeque<Bytes>) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let now = Self::now_ms();
        let mut ks = self.write();
        purge_if_expired(&mut ks, key.as_bytes(), now);
        let entry = ks
            .entry(Bytes::copy_from_slice(key.as_bytes()))
            .or_insert_with(|| Entry::new(DataValue::List(VecDeque::new())));
        let result = match &mut entry.value {
            DataValue::List(l) => f(l),
            _ => Err(EngineError::WrongType),
        };
        drop_if_empty(&mut ks, key.as_bytes());
        result
    }
}

fn normalize_index(i: i64, len: i64) -> i64 {
    if i < 0 {
        len + i
    } else {
        i
    }
}
