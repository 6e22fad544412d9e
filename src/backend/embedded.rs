//! Embedded Backend
//!
//! In-process command interpreter: parses the normalized flat argument form
//! and dispatches to the typed engine API.

use bytes::Bytes;
use tracing::debug;

use super::{Backend, Reply};
use crate::engine::{Engine, EngineError, EngineResult};
use crate::error::{Error, Result};
use crate::types::{SetOptions, ZMember};
use crate::value::fmt_float;

/// Backend bound to an in-process engine.
pub struct EmbeddedBackend {
    engine: Engine,
}

impl EmbeddedBackend {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    fn dispatch(&mut self, name: &str, args: &[Bytes]) -> Result<Reply> {
        let mut a = Args::new(name, args);
        match name {
            "PING" => {
                a.done()?;
                Ok(Reply::Simple("PONG".to_string()))
            }

            // --- strings ---
            "GET" => {
                let key = a.str()?;
                a.done()?;
                Ok(Reply::opt_bulk(eng(self.engine.get(key))?))
            }
            "SET" => {
                let key = a.str()?;
                let value = a.next()?.clone();
                let opts = parse_set_options(&mut a)?;
                if self.engine.set(key, value, &opts) {
                    Ok(Reply::ok())
                } else {
                    Ok(Reply::Nil)
                }
            }
            "SETEX" => {
                let key = a.str()?;
                let seconds = a.uint()?;
                let value = a.next()?.clone();
                a.done()?;
                self.engine.set(key, value, &SetOptions::default().ex(seconds));
                Ok(Reply::ok())
            }
            "PSETEX" => {
                let key = a.str()?;
                let millis = a.uint()?;
                let value = a.next()?.clone();
                a.done()?;
                self.engine.set(key, value, &SetOptions::default().px(millis));
                Ok(Reply::ok())
            }
            "GETDEL" => {
                let key = a.str()?;
                a.done()?;
                Ok(Reply::opt_bulk(eng(self.engine.getdel(key))?))
            }
            "APPEND" => {
                let key = a.str()?;
                let value = a.next()?.clone();
                a.done()?;
                Ok(Reply::Int(eng(self.engine.append(key, &value))?))
            }
            "STRLEN" => {
                let key = a.str()?;
                a.done()?;
                Ok(Reply::Int(eng(self.engine.strlen(key))?))
            }
            "GETRANGE" => {
                let key = a.str()?;
                let (start, end) = (a.int()?, a.int()?);
                a.done()?;
                Ok(Reply::Bulk(eng(self.engine.getrange(key, start, end))?))
            }
            "SETRANGE" => {
                let key = a.str()?;
                let offset = a.int()?;
                let value = a.next()?.clone();
                a.done()?;
                Ok(Reply::Int(eng(self.engine.setrange(key, offset, &value))?))
            }
            "INCR" => {
                let key = a.str()?;
                a.done()?;
                Ok(Reply::Int(eng(self.engine.incr(key))?))
            }
            "DECR" => {
                let key = a.str()?;
                a.done()?;
                Ok(Reply::Int(eng(self.engine.decr(key))?))
            }
            "INCRBY" => {
                let key = a.str()?;
                let delta = a.int()?;
                a.done()?;
                Ok(Reply::Int(eng(self.engine.incrby(key, delta))?))
            }
            "DECRBY" => {
                let key = a.str()?;
                let delta = a.int()?;
                a.done()?;
                Ok(Reply::Int(eng(self.engine.decrby(key, delta))?))
            }
            "INCRBYFLOAT" => {
                let key = a.str()?;
                let delta = a.float()?;
                a.done()?;
                Ok(Reply::bulk(eng(self.engine.incrbyfloat(key, delta))?))
            }

            // --- keys ---
            "DEL" => {
                let keys = a.rest_strs_nonempty()?;
                Ok(Reply::Int(self.engine.del(&keys)))
            }
            "EXISTS" => {
                let keys = a.rest_strs_nonempty()?;
                Ok(Reply::Int(self.engine.exists(&keys)))
            }
            "TYPE" => {
                let key = a.str()?;
                a.done()?;
                let name = self
                    .engine
                    .key_type(key)
                    .map(|t| t.as_str())
                    .unwrap_or("none");
                Ok(Reply::Simple(name.to_string()))
            }
            "TTL" => {
                let key = a.str()?;
                a.done()?;
                Ok(Reply::Int(self.engine.ttl(key)))
            }
            "PTTL" => {
                let key = a.str()?;
                a.done()?;
                Ok(Reply::Int(self.engine.pttl(key)))
            }
            "EXPIRE" => {
                let key = a.str()?;
                let seconds = a.int()?;
                a.done()?;
                Ok(bool_int(self.engine.expire(key, seconds)))
            }
            "PEXPIRE" => {
                let key = a.str()?;
                let millis = a.int()?;
                a.done()?;
                Ok(bool_int(self.engine.pexpire(key, millis)))
            }
            "EXPIREAT" => {
                let key = a.str()?;
                let at = a.int()?;
                a.done()?;
                Ok(bool_int(self.engine.expireat(key, at)))
            }
            "PEXPIREAT" => {
                let key = a.str()?;
                let at = a.int()?;
                a.done()?;
                Ok(bool_int(self.engine.pexpireat(key, at)))
            }
            "PERSIST" => {
                let key = a.str()?;
                a.done()?;
                Ok(bool_int(self.engine.persist_key(key)))
            }
            "RENAME" => {
                let (src, dst) = (a.str()?, a.str()?);
                a.done()?;
                eng(self.engine.rename(src, dst))?;
                Ok(Reply::ok())
            }
            "RENAMENX" => {
                let (src, dst) = (a.str()?, a.str()?);
                a.done()?;
                Ok(bool_int(eng(self.engine.renamenx(src, dst))?))
            }
            "KEYS" => {
                let pattern = a.str()?;
                a.done()?;
                Ok(Reply::array_of_bulk(
                    self.engine.keys(pattern).into_iter().map(Bytes::from),
                ))
            }
            "DBSIZE" => {
                a.done()?;
                Ok(Reply::Int(self.engine.dbsize()))
            }
            "FLUSHDB" => {
                a.done()?;
                self.engine.flushdb();
                Ok(Reply::ok())
            }
            "SELECT" => {
                let db = a.int()?;
                a.done()?;
                let db = usize::try_from(db).map_err(|_| backend(EngineError::DbIndexOutOfRange))?;
                eng(self.engine.select(db))?;
                Ok(Reply::ok())
            }
            "SCAN" => {
                let cursor = a.cursor()?;
                let (pattern, count) = parse_scan_options(&mut a)?;
                let (next, page) = self.engine.scan(cursor, pattern.as_deref(), count);
                Ok(scan_reply(
                    next,
                    page.into_iter().map(|k| Reply::bulk(Bytes::from(k))),
                ))
            }
            "VACUUM" => {
                a.done()?;
                Ok(Reply::Int(eng(self.engine.vacuum())?))
            }

            // --- multi-key ---
            "MGET" => {
                let keys = a.rest_strs_nonempty()?;
                // Wrong-typed keys read as absent here, by wire convention.
                let values = keys
                    .iter()
                    .map(|k| self.engine.get(k).unwrap_or(None))
                    .map(Reply::opt_bulk)
                    .collect();
                Ok(Reply::Array(values))
            }
            "MSET" => {
                let pairs = a.rest_pairs_nonempty()?;
                for (key, value) in pairs {
                    let key = as_str(a.name, &key)?.to_string();
                    self.engine.set(&key, value, &SetOptions::default());
                }
                Ok(Reply::ok())
            }

            // --- hashes ---
            "HSET" => {
                let key = a.str()?;
                let pairs = a.rest_pairs_nonempty()?;
                Ok(Reply::Int(eng(self.engine.hset(key, &pairs))?))
            }
            "HGET" => {
                let key = a.str()?;
                let field = a.next()?.clone();
                a.done()?;
                Ok(Reply::opt_bulk(eng(self.engine.hget(key, &field))?))
            }
            "HMGET" => {
                let key = a.str()?;
                let fields = a.rest_nonempty()?;
                let values = eng(self.engine.hmget(key, &fields))?;
                Ok(Reply::Array(values.into_iter().map(Reply::opt_bulk).collect()))
            }
            "HGETALL" => {
                let key = a.str()?;
                a.done()?;
                Ok(pairs_reply(eng(self.engine.hgetall(key))?))
            }
            "HDEL" => {
                let key = a.str()?;
                let fields = a.rest_nonempty()?;
                Ok(Reply::Int(eng(self.engine.hdel(key, &fields))?))
            }
            "HEXISTS" => {
                let key = a.str()?;
                let field = a.next()?.clone();
                a.done()?;
                Ok(bool_int(eng(self.engine.hexists(key, &field))?))
            }
            "HLEN" => {
                let key = a.str()?;
                a.done()?;
                Ok(Reply::Int(eng(self.engine.hlen(key))?))
            }
            "HKEYS" => {
                let key = a.str()?;
                a.done()?;
                Ok(Reply::array_of_bulk(eng(self.engine.hkeys(key))?))
            }
            "HVALS" => {
                let key = a.str()?;
                a.done()?;
                Ok(Reply::array_of_bulk(eng(self.engine.hvals(key))?))
            }
            "HINCRBY" => {
                let key = a.str()?;
                let field = a.next()?.clone();
                let delta = a.int()?;
                a.done()?;
                Ok(Reply::Int(eng(self.engine.hincrby(key, &field, delta))?))
            }
            "HINCRBYFLOAT" => {
                let key = a.str()?;
                let field = a.next()?.clone();
                let delta = a.float()?;
                a.done()?;
                Ok(Reply::bulk(eng(self.engine.hincrbyfloat(key, &field, delta))?))
            }
            "HSCAN" => {
                let key = a.str()?;
                let cursor = a.cursor()?;
                let (pattern, count) = parse_scan_options(&mut a)?;
                let (next, page) = eng(self.engine.hscan(key, cursor, pattern.as_deref(), count))?;
                Ok(scan_reply(
                    next,
                    page.into_iter()
                        .flat_map(|(f, v)| [Reply::Bulk(f), Reply::Bulk(v)]),
                ))
            }

            // --- lists ---
            "LPUSH" => {
                let key = a.str()?;
                let values = a.rest_nonempty()?;
                Ok(Reply::Int(eng(self.engine.lpush(key, &values))?))
            }
            "RPUSH" => {
                let key = a.str()?;
                let values = a.rest_nonempty()?;
                Ok(Reply::Int(eng(self.engine.rpush(key, &values))?))
            }
            "LPOP" => self.pop(&mut a, Engine::lpop),
            "RPOP" => self.pop(&mut a, Engine::rpop),
            "LLEN" => {
                let key = a.str()?;
                a.done()?;
                Ok(Reply::Int(eng(self.engine.llen(key))?))
            }
            "LRANGE" => {
                let key = a.str()?;
                let (start, stop) = (a.int()?, a.int()?);
                a.done()?;
                Ok(Reply::array_of_bulk(eng(self.engine.lrange(key, start, stop))?))
            }
            "LINDEX" => {
                let key = a.str()?;
                let index = a.int()?;
                a.done()?;
                Ok(Reply::opt_bulk(eng(self.engine.lindex(key, index))?))
            }

            // --- sets ---
            "SADD" => {
                let key = a.str()?;
                let members = a.rest_nonempty()?;
                Ok(Reply::Int(eng(self.engine.sadd(key, &members))?))
            }
            "SREM" => {
                let key = a.str()?;
                let members = a.rest_nonempty()?;
                Ok(Reply::Int(eng(self.engine.srem(key, &members))?))
            }
            "SMEMBERS" => {
                let key = a.str()?;
                a.done()?;
                Ok(Reply::array_of_bulk(eng(self.engine.smembers(key))?))
            }
            "SISMEMBER" => {
                let key = a.str()?;
                let member = a.next()?.clone();
                a.done()?;
                Ok(bool_int(eng(self.engine.sismember(key, &member))?))
            }
            "SCARD" => {
                let key = a.str()?;
                a.done()?;
                Ok(Reply::Int(eng(self.engine.scard(key))?))
            }
            "SSCAN" => {
                let key = a.str()?;
                let cursor = a.cursor()?;
                let (pattern, count) = parse_scan_options(&mut a)?;
                let (next, page) = eng(self.engine.sscan(key, cursor, pattern.as_deref(), count))?;
                Ok(scan_reply(next, page.into_iter().map(Reply::Bulk)))
            }

            // --- sorted sets ---
            "ZADD" => {
                let key = a.str()?;
                let mut members = Vec::new();
                while !a.is_empty() {
                    let score = a.float()?;
                    let member = a.next()?.clone();
                    members.push(ZMember { score, member });
                }
                if members.is_empty() {
                    return Err(a.wrong_arity());
                }
                Ok(Reply::Int(eng(self.engine.zadd(key, &members))?))
            }
            "ZREM" => {
                let key = a.str()?;
                let members = a.rest_nonempty()?;
                Ok(Reply::Int(eng(self.engine.zrem(key, &members))?))
            }
            "ZSCORE" => {
                let key = a.str()?;
                let member = a.next()?.clone();
                a.done()?;
                let score = eng(self.engine.zscore(key, &member))?;
                Ok(Reply::opt_bulk(score.map(|s| Bytes::from(fmt_float(s)))))
            }
            "ZCARD" => {
                let key = a.str()?;
                a.done()?;
                Ok(Reply::Int(eng(self.engine.zcard(key))?))
            }
            "ZCOUNT" => {
                let key = a.str()?;
                let (min, max) = (a.float()?, a.float()?);
                a.done()?;
                Ok(Reply::Int(eng(self.engine.zcount(key, min, max))?))
            }
            "ZINCRBY" => {
                let key = a.str()?;
                let delta = a.float()?;
                let member = a.next()?.clone();
                a.done()?;
                let score = eng(self.engine.zincrby(key, delta, &member))?;
                Ok(Reply::bulk(fmt_float(score)))
            }
            "ZRANGE" => {
                let key = a.str()?;
                let (start, stop) = (a.int()?, a.int()?);
                let with_scores = match a.rest() {
                    [] => false,
                    [flag] if flag.eq_ignore_ascii_case(b"WITHSCORES") => true,
                    _ => return Err(backend(EngineError::Syntax)),
                };
                let members = eng(self.engine.zrange(key, start, stop))?;
                if with_scores {
                    Ok(Reply::Array(
                        members
                            .into_iter()
                            .flat_map(|m| [Reply::Bulk(m.member), Reply::bulk(fmt_float(m.score))])
                            .collect(),
                    ))
                } else {
                    Ok(Reply::array_of_bulk(members.into_iter().map(|m| m.member)))
                }
            }
            "ZSCAN" => {
                let key = a.str()?;
                let cursor = a.cursor()?;
                let (pattern, count) = parse_scan_options(&mut a)?;
                let (next, page) = eng(self.engine.zscan(key, cursor, pattern.as_deref(), count))?;
                Ok(scan_reply(
                    next,
                    page.into_iter()
                        .flat_map(|m| [Reply::Bulk(m.member), Reply::bulk(fmt_float(m.score))]),
                ))
            }

            _ => Err(Error::UnknownCommand(name.to_string())),
        }
    }

    fn pop(
        &mut self,
        a: &mut Args<'_>,
        op: impl Fn(&Engine, &str, Option<usize>) -> EngineResult<Vec<Bytes>>,
    ) -> Result<Reply> {
        let key = a.str()?;
        let count = if a.is_empty() {
            None
        } else {
            let n = a.uint()?;
            a.done()?;
            Some(n as usize)
        };
        let mut popped = eng(op(&self.engine, key, count))?;
        match count {
            None => Ok(Reply::opt_bulk(popped.pop())),
            Some(_) if popped.is_empty() => Ok(Reply::Nil),
            Some(_) => Ok(Reply::array_of_bulk(popped)),
        }
    }
}

impl Backend for EmbeddedBackend {
    fn execute(&mut self, name: &str, args: &[Bytes]) -> Result<Reply> {
        self.dispatch(name, args)
    }

    fn close(&mut self) {
        if let Err(error) = self.engine.persist() {
            debug!(%error, "snapshot write on close failed");
        }
    }
}

fn eng<T>(result: EngineResult<T>) -> Result<T> {
    result.map_err(backend)
}

fn backend(error: EngineError) -> Error {
    Error::Backend(error.to_string())
}

fn bool_int(flag: bool) -> Reply {
    Reply::Int(flag as i64)
}

fn pairs_reply(pairs: Vec<(Bytes, Bytes)>) -> Reply {
    Reply::Array(
        pairs
            .into_iter()
            .flat_map(|(f, v)| [Reply::Bulk(f), Reply::Bulk(v)])
            .collect(),
    )
}

fn scan_reply(next: u64, items: impl IntoIterator<Item = Reply>) -> Reply {
    Reply::Array(vec![
        Reply::bulk(next.to_string()),
        Reply::Array(items.into_iter().collect()),
    ])
}

fn parse_set_options(a: &mut Args<'_>) -> Result<SetOptions> {
    let mut opts = SetOptions::default();
    while !a.is_empty() {
        let flag = a.next()?;
        if flag.eq_ignore_ascii_case(b"EX") {
            opts.ex = Some(a.uint()?);
        } else if flag.eq_ignore_ascii_case(b"PX") {
            opts.px = Some(a.uint()?);
        } else if flag.eq_ignore_ascii_case(b"NX") {
            opts.nx = true;
        } else if flag.eq_ignore_ascii_case(b"XX") {
            opts.xx = true;
        } else {
            return Err(backend(EngineError::Syntax));
        }
    }
    Ok(opts)
}

fn parse_scan_options(a: &mut Args<'_>) -> Result<(Option<String>, usize)> {
    let mut pattern = None;
    let mut count = 10;
    while !a.is_empty() {
        let flag = a.next()?;
        if flag.eq_ignore_ascii_case(b"MATCH") {
            pattern = Some(a.str()?.to_string());
        } else if flag.eq_ignore_ascii_case(b"COUNT") {
            count = a.uint()? as usize;
        } else {
            return Err(backend(EngineError::Syntax));
        }
    }
    Ok((pattern, count))
}

fn as_str<'a>(name: &str, raw: &'a Bytes) -> Result<&'a str> {
    std::str::from_utf8(raw)
        .map_err(|_| Error::Backend(format!("ERR invalid UTF-8 key in '{}' command", name)))
}

/// Positional argument reader with wire-style arity and parse errors.
struct Args<'a> {
    name: &'a str,
    items: &'a [Bytes],
    idx: usize,
}

impl<'a> Args<'a> {
    fn new(name: &'a str, items: &'a [Bytes]) -> Self {
        Self { name, items, idx: 0 }
    }

    fn next(&mut self) -> Result<&'a Bytes> {
        let item = self.items.get(self.idx).ok_or_else(|| self.wrong_arity())?;
        self.idx += 1;
        Ok(item)
    }

    fn str(&mut self) -> Result<&'a str> {
        let name = self.name;
        let raw = self.next()?;
        as_str(name, raw)
    }

    fn int(&mut self) -> Result<i64> {
        let raw = self.next()?;
        crate::value::parse_int(raw).ok_or_else(|| backend(EngineError::NotInteger))
    }

    fn uint(&mut self) -> Result<u64> {
        let n = self.int()?;
        u64::try_from(n).map_err(|_| backend(EngineError::NotInteger))
    }

    fn cursor(&mut self) -> Result<u64> {
        let raw = self.next()?;
        crate::value::parse_int(raw)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| backend(EngineError::InvalidCursor))
    }

    fn float(&mut self) -> Result<f64> {
        let raw = self.next()?;
        crate::value::parse_float(raw).ok_or_else(|| backend(EngineError::NotFloat))
    }

    fn rest(&mut self) -> &'a [Bytes] {
        let rest = &self.items[self.idx..];
        self.idx = self.items.len();
        rest
    }

    fn rest_nonempty(&mut self) -> Result<Vec<Bytes>> {
        let rest = self.rest();
        if rest.is_empty() {
            return Err(self.wrong_arity());
        }
        Ok(rest.to_vec())
    }

    fn rest_strs_nonempty(&mut self) -> Result<Vec<&'a str>> {
        let name = self.name;
        let rest = self.rest();
        if rest.is_empty() {
            return Err(self.wrong_arity());
        }
        rest.iter().map(|b| as_str(name, b)).collect()
    }

    fn rest_pairs_nonempty(&mut self) -> Result<Vec<(Bytes, Bytes)>> {
        let rest = self.rest();
        if rest.is_empty() || rest.len() % 2 != 0 {
            return Err(self.wrong_arity());
        }
        Ok(rest
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect())
    }

    fn is_empty(&self) -> bool {
        self.idx >= self.items.len()
    }

    fn done(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.wrong_arity())
        }
    }

    fn wrong_arity(&self) -> Error {
        Error::Backend(format!(
            "ERR wrong number of arguments for '{}' command",
            self.name.to_ascii_lowercase()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_mem() -> EmbeddedBackend {
        EmbeddedBackend::new(Engine::open_memory())
    }

    fn args(items: &[&[u8]]) -> Vec<Bytes> {
        items.iter().map(|b| Bytes::copy_from_slice(b)).collect()
    }

    #[test]
    fn test_set_get_del_roundtrip() {
        let mut b = backend_mem();
        assert_eq!(
            b.execute("SET", &args(&[b"k", b"v"])).unwrap(),
            Reply::ok()
        );
        assert_eq!(
            b.execute("GET", &args(&[b"k"])).unwrap(),
            Reply::Bulk(Bytes::from_static(b"v"))
        );
        assert_eq!(b.execute("DEL", &args(&[b"k"])).unwrap(), Reply::Int(1));
        assert_eq!(b.execute("GET", &args(&[b"k"])).unwrap(), Reply::Nil);
    }

    #[test]
    fn test_set_nx_returns_nil_when_unset() {
        let mut b = backend_mem();
        b.execute("SET", &args(&[b"k", b"v"])).unwrap();
        assert_eq!(
            b.execute("SET", &args(&[b"k", b"w", b"NX"])).unwrap(),
            Reply::Nil
        );
    }

    #[test]
    fn test_unknown_command_propagates() {
        let mut b = backend_mem();
        match b.execute("FT.CREATE", &args(&[b"idx"])) {
            Err(Error::UnknownCommand(name)) => assert_eq!(name, "FT.CREATE"),
            other => panic!("expected UnknownCommand, got {:?}", other),
        }
    }

    #[test]
    fn test_backend_error_carries_message() {
        let mut b = backend_mem();
        b.execute("SET", &args(&[b"k", b"abc"])).unwrap();
        match b.execute("INCR", &args(&[b"k"])) {
            Err(Error::Backend(msg)) => assert!(msg.contains("not an integer"), "{}", msg),
            other => panic!("expected Backend error, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_arity() {
        let mut b = backend_mem();
        match b.execute("GET", &args(&[])) {
            Err(Error::Backend(msg)) => assert!(msg.contains("wrong number of arguments")),
            other => panic!("expected arity error, got {:?}", other),
        }
        assert!(b.execute("MSET", &args(&[b"k1", b"v1", b"k2"])).is_err());
    }

    #[test]
    fn test_scan_reply_shape() {
        let mut b = backend_mem();
        b.execute("MSET", &args(&[b"a", b"1", b"b", b"2"])).unwrap();
        let reply = b.execute("SCAN", &args(&[b"0"])).unwrap();
        let Reply::Array(parts) = reply else {
            panic!("expected array");
        };
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], Reply::bulk("0"));
        assert!(matches!(&parts[1], Reply::Array(items) if items.len() == 2));
    }

    #[test]
    fn test_zadd_and_withscores() {
        let mut b = backend_mem();
        assert_eq!(
            b.execute("ZADD", &args(&[b"z", b"1", b"a", b"2", b"b"])).unwrap(),
            Reply::Int(2)
        );
        let reply = b
            .execute("ZRANGE", &args(&[b"z", b"0", b"-1", b"WITHSCORES"]))
            .unwrap();
        let Reply::Array(items) = reply else {
            panic!("expected array");
        };
        assert_eq!(items.len(), 4);
        assert_eq!(items[1], Reply::bulk("1"));
    }

    #[test]
    fn test_lpop_single_vs_count() {
        let mut b = backend_mem();
        b.execute("RPUSH", &args(&[b"l", b"a", b"b", b"c"])).unwrap();
        assert_eq!(
            b.execute("LPOP", &args(&[b"l"])).unwrap(),
            Reply::Bulk(Bytes::from_static(b"a"))
        );
        assert_eq!(
            b.execute("LPOP", &args(&[b"l", b"5"])).unwrap(),
            Reply::array_of_bulk([Bytes::from_static(b"b"), Bytes::from_static(b"c")])
        );
        assert_eq!(b.execute("LPOP", &args(&[b"l"])).unwrap(), Reply::Nil);
    }
}
