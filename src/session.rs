//! Session Lifecycle
//!
//! Binds to exactly one backend at open (embedded for `:memory:` and file
//! paths, server for `redis://`/`rediss://`) and exposes the typed command
//! surface through a single dispatch point.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::backend::{Backend, EmbeddedBackend, Reply, ServerBackend};
use crate::command::{Arg, Invocation};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::ext::{Fts, Geo, VectorSet};
use crate::router;
use crate::types::{KeyType, SetOptions, ZMember};
use crate::value::Value;

/// Which kind of backend a session is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Embedded,
    Server,
}

/// Tunables applied at open time.
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    /// Advisory working-set budget for the embedded engine, in megabytes.
    pub cache_mb: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self { cache_mb: 64 }
    }
}

enum Target {
    Memory,
    Disk(PathBuf),
    Remote {
        host: String,
        port: u16,
        tls: bool,
        db: u32,
    },
}

fn parse_target(target: &str) -> Result<Target> {
    if target == ":memory:" {
        return Ok(Target::Memory);
    }
    let (rest, tls) = if let Some(rest) = target.strip_prefix("rediss://") {
        (rest, true)
    } else if let Some(rest) = target.strip_prefix("redis://") {
        (rest, false)
    } else {
        return Ok(Target::Disk(PathBuf::from(target)));
    };

    let (addr, db) = match rest.split_once('/') {
        None => (rest, 0),
        Some((addr, db)) => {
            let db = db
                .parse::<u32>()
                .map_err(|_| Error::Open(format!("invalid database index in '{}'", target)))?;
            (addr, db)
        }
    };
    let (host, port) = match addr.rsplit_once(':') {
        None => (addr, 6379),
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| Error::Open(format!("invalid port in '{}'", target)))?;
            (host, port)
        }
    };
    if host.is_empty() {
        return Err(Error::Open(format!("missing host in '{}'", target)));
    }
    Ok(Target::Remote {
        host: host.to_string(),
        port,
        tls,
        db,
    })
}

/// A client session over one backend.
///
/// Dropping an open session closes it; `close` itself is idempotent.
pub struct Session {
    mode: Mode,
    backend: Option<Box<dyn Backend>>,
}

impl Session {
    /// Open a session with default options.
    ///
    /// `":memory:"` opens a non-persistent embedded engine, `redis://` and
    /// `rediss://` open a server connection, and anything else is treated
    /// as a filesystem path for a persistent embedded engine.
    pub fn open(target: &str) -> Result<Self> {
        Self::open_with(target, OpenOptions::default())
    }

    pub fn open_with(target: &str, opts: OpenOptions) -> Result<Self> {
        let (mode, backend): (Mode, Box<dyn Backend>) = match parse_target(target)? {
            Target::Memory => (
                Mode::Embedded,
                Box::new(EmbeddedBackend::new(Engine::open_memory_with(opts.cache_mb))),
            ),
            Target::Disk(path) => {
                let engine = Engine::open(Path::new(&path), opts.cache_mb)
                    .map_err(|e| Error::Open(e.to_string()))?;
                (Mode::Embedded, Box::new(EmbeddedBackend::new(engine)))
            }
            Target::Remote { host, port, tls, db } => (
                Mode::Server,
                Box::new(ServerBackend::connect(&host, port, tls, db)?),
            ),
        };
        debug!(uri = target, ?mode, "session opened");
        Ok(Self {
            mode,
            backend: Some(backend),
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    /// Release the backend. Further commands fail with `ConnectionClosed`;
    /// closing an already-closed session is a no-op.
    pub fn close(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            backend.close();
            debug!("session closed");
        }
    }

    /// Route one invocation through the reshape table to the backend.
    fn dispatch(&mut self, inv: Invocation) -> Result<Reply> {
        let backend = self.backend.as_mut().ok_or(Error::ConnectionClosed)?;
        let (name, args) = router::normalize(&inv)?;
        debug!(command = %name, argc = args.len(), "dispatch");
        backend.execute(&name, &args)
    }

    /// Send a command verbatim, bypassing the reshape table. This is the
    /// escape hatch the namespace extensions are built on.
    pub fn raw_command(&mut self, name: &str, args: &[Value]) -> Result<Reply> {
        let backend = self.backend.as_mut().ok_or(Error::ConnectionClosed)?;
        let name = name.to_ascii_uppercase();
        let args: Vec<Bytes> = args.iter().map(Value::encode).collect();
        debug!(command = %name, argc = args.len(), "raw dispatch");
        backend.execute(&name, &args)
    }

    // --- connection ---

    pub fn ping(&mut self) -> Result<()> {
        match self.dispatch(Invocation::new("PING"))? {
            Reply::Simple(s) if s == "PONG" => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub fn select(&mut self, db: u32) -> Result<()> {
        as_ok(self.dispatch(Invocation::new("SELECT").arg(Value::Int(db as i64)))?)
    }

    /// Reclaim expired entries, returning an estimate of the bytes freed.
    pub fn vacuum(&mut self) -> Result<i64> {
        as_int(self.dispatch(Invocation::new("VACUUM"))?)
    }

    // --- strings ---

    pub fn get(&mut self, key: &str) -> Result<Option<Bytes>> {
        as_opt_bytes(self.dispatch(Invocation::new("GET").arg(Value::from(key)))?)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        as_ok(self.dispatch(
            Invocation::new("SET")
                .arg(Value::from(key))
                .arg(value.into()),
        )?)
    }

    /// SET with options. Returns false when an NX/XX condition blocked
    /// the write.
    pub fn set_opts(
        &mut self,
        key: &str,
        value: impl Into<Value>,
        opts: SetOptions,
    ) -> Result<bool> {
        let mut inv = Invocation::new("SET")
            .arg(Value::from(key))
            .arg(value.into());
        if let Some(seconds) = opts.ex {
            inv = inv.arg(Value::from("EX")).arg(Value::Int(seconds as i64));
        }
        if let Some(millis) = opts.px {
            inv = inv.arg(Value::from("PX")).arg(Value::Int(millis as i64));
        }
        if opts.nx {
            inv = inv.arg(Value::from("NX"));
        }
        if opts.xx {
            inv = inv.arg(Value::from("XX"));
        }
        match self.dispatch(inv)? {
            Reply::Simple(s) if s == "OK" => Ok(true),
            Reply::Nil => Ok(false),
            other => Err(unexpected(&other)),
        }
    }

    pub fn setex(&mut self, key: &str, seconds: u64, value: impl Into<Value>) -> Result<()> {
        as_ok(self.dispatch(
            Invocation::new("SETEX")
                .arg(Value::from(key))
                .arg(Value::Int(seconds as i64))
                .arg(value.into()),
        )?)
    }

    pub fn psetex(&mut self, key: &str, millis: u64, value: impl Into<Value>) -> Result<()> {
        as_ok(self.dispatch(
            Invocation::new("PSETEX")
                .arg(Value::from(key))
                .arg(Value::Int(millis as i64))
                .arg(value.into()),
        )?)
    }

    pub fn getdel(&mut self, key: &str) -> Result<Option<Bytes>> {
        as_opt_bytes(self.dispatch(Invocation::new("GETDEL").arg(Value::from(key)))?)
    }

    pub fn append(&mut self, key: &str, value: impl Into<Value>) -> Result<i64> {
        as_int(self.dispatch(
            Invocation::new("APPEND")
                .arg(Value::from(key))
                .arg(value.into()),
        )?)
    }

    pub fn strlen(&mut self, key: &str) -> Result<i64> {
        as_int(self.dispatch(Invocation::new("STRLEN").arg(Value::from(key)))?)
    }

    pub fn getrange(&mut self, key: &str, start: i64, end: i64) -> Result<Bytes> {
        as_bytes(self.dispatch(
            Invocation::new("GETRANGE")
                .arg(Value::from(key))
                .arg(Value::Int(start))
                .arg(Value::Int(end)),
        )?)
    }

    pub fn setrange(&mut self, key: &str, offset: i64, value: impl Into<Value>) -> Result<i64> {
        as_int(self.dispatch(
            Invocation::new("SETRANGE")
                .arg(Value::from(key))
                .arg(Value::Int(offset))
                .arg(value.into()),
        )?)
    }

    pub fn incr(&mut self, key: &str) -> Result<i64> {
        as_int(self.dispatch(Invocation::new("INCR").arg(Value::from(key)))?)
    }

    pub fn decr(&mut self, key: &str) -> Result<i64> {
        as_int(self.dispatch(Invocation::new("DECR").arg(Value::from(key)))?)
    }

    pub fn incrby(&mut self, key: &str, delta: i64) -> Result<i64> {
        as_int(self.dispatch(
            Invocation::new("INCRBY")
                .arg(Value::from(key))
                .arg(Value::Int(delta)),
        )?)
    }

    pub fn decrby(&mut self, key: &str, delta: i64) -> Result<i64> {
        as_int(self.dispatch(
            Invocation::new("DECRBY")
                .arg(Value::from(key))
                .arg(Value::Int(delta)),
        )?)
    }

    pub fn incrbyfloat(&mut self, key: &str, delta: f64) -> Result<f64> {
        as_float(self.dispatch(
            Invocation::new("INCRBYFLOAT")
                .arg(Value::from(key))
                .arg(Value::Float(delta)),
        )?)
    }

    pub fn mget(&mut self, keys: &[&str]) -> Result<Vec<Option<Bytes>>> {
        let mut inv = Invocation::new("MGET");
        inv.args.push(key_list(keys));
        let items = as_array(self.dispatch(inv)?)?;
        items.into_iter().map(as_opt_bytes).collect()
    }

    pub fn mset(&mut self, pairs: &[(&str, Value)]) -> Result<()> {
        let mut inv = Invocation::new("MSET");
        inv.args.push(Arg::Pairs(
            pairs
                .iter()
                .map(|(k, v)| (Value::from(*k), v.clone()))
                .collect(),
        ));
        as_ok(self.dispatch(inv)?)
    }

    // --- keys ---

    pub fn del(&mut self, keys: &[&str]) -> Result<i64> {
        let mut inv = Invocation::new("DEL");
        inv.args.push(key_list(keys));
        as_int(self.dispatch(inv)?)
    }

    pub fn exists(&mut self, keys: &[&str]) -> Result<i64> {
        let mut inv = Invocation::new("EXISTS");
        inv.args.push(key_list(keys));
        as_int(self.dispatch(inv)?)
    }

    /// Type of the value at key, or `None` when the key is missing.
    pub fn key_type(&mut self, key: &str) -> Result<Option<KeyType>> {
        match self.dispatch(Invocation::new("TYPE").arg(Value::from(key)))? {
            Reply::Simple(name) => Ok(KeyType::from_str(&name)),
            other => Err(unexpected(&other)),
        }
    }

    /// Remaining TTL in seconds; -1 when the key has no expiry, -2 when
    /// the key is missing.
    pub fn ttl(&mut self, key: &str) -> Result<i64> {
        as_int(self.dispatch(Invocation::new("TTL").arg(Value::from(key)))?)
    }

    pub fn pttl(&mut self, key: &str) -> Result<i64> {
        as_int(self.dispatch(Invocation::new("PTTL").arg(Value::from(key)))?)
    }

    pub fn expire(&mut self, key: &str, seconds: i64) -> Result<bool> {
        as_bool(self.dispatch(
            Invocation::new("EXPIRE")
                .arg(Value::from(key))
                .arg(Value::Int(seconds)),
        )?)
    }

    pub fn pexpire(&mut self, key: &str, millis: i64) -> Result<bool> {
        as_bool(self.dispatch(
            Invocation::new("PEXPIRE")
                .arg(Value::from(key))
                .arg(Value::Int(millis)),
        )?)
    }

    pub fn expireat(&mut self, key: &str, unix_secs: i64) -> Result<bool> {
        as_bool(self.dispatch(
            Invocation::new("EXPIREAT")
                .arg(Value::from(key))
                .arg(Value::Int(unix_secs)),
        )?)
    }

    pub fn pexpireat(&mut self, key: &str, unix_ms: i64) -> Result<bool> {
        as_bool(self.dispatch(
            Invocation::new("PEXPIREAT")
                .arg(Value::from(key))
                .arg(Value::Int(unix_ms)),
        )?)
    }

    pub fn persist(&mut self, key: &str) -> Result<bool> {
        as_bool(self.dispatch(Invocation::new("PERSIST").arg(Value::from(key)))?)
    }

    pub fn rename(&mut self, src: &str, dst: &str) -> Result<()> {
        as_ok(self.dispatch(
            Invocation::new("RENAME")
                .arg(Value::from(src))
                .arg(Value::from(dst)),
        )?)
    }

    /// Rename only when the destination is absent; false means it existed
    /// and nothing moved.
    pub fn renamenx(&mut self, src: &str, dst: &str) -> Result<bool> {
        as_bool(self.dispatch(
            Invocation::new("RENAMENX")
                .arg(Value::from(src))
                .arg(Value::from(dst)),
        )?)
    }

    pub fn keys(&mut self, pattern: &str) -> Result<Vec<String>> {
        as_string_vec(self.dispatch(Invocation::new("KEYS").arg(Value::from(pattern)))?)
    }

    pub fn dbsize(&mut self) -> Result<i64> {
        as_int(self.dispatch(Invocation::new("DBSIZE"))?)
    }

    pub fn flushdb(&mut self) -> Result<()> {
        as_ok(self.dispatch(Invocation::new("FLUSHDB"))?)
    }

    /// One page of the keyspace. A returned cursor of 0 means iteration
    /// is complete; any other value continues it.
    pub fn scan(
        &mut self,
        cursor: u64,
        pattern: Option<&str>,
        count: Option<u64>,
    ) -> Result<(u64, Vec<String>)> {
        let inv = scan_invocation("SCAN", None, cursor, pattern, count);
        let (next, items) = as_scan(self.dispatch(inv)?)?;
        let keys = items
            .into_iter()
            .map(|r| as_bytes(r).map(lossy))
            .collect::<Result<Vec<String>>>()?;
        Ok((next, keys))
    }

    // --- hashes ---

    /// Set fields, returning how many were newly created (overwrites
    /// count 0).
    pub fn hset(&mut self, key: &str, pairs: &[(&str, Value)]) -> Result<i64> {
        let mut inv = Invocation::new("HSET").arg(Value::from(key));
        inv.args.push(Arg::Map(
            pairs
                .iter()
                .map(|(f, v)| (Value::from(*f), v.clone()))
                .collect(),
        ));
        as_int(self.dispatch(inv)?)
    }

    /// Single-field HSET in (key, field, value) form.
    pub fn hset_one(&mut self, key: &str, field: &str, value: impl Into<Value>) -> Result<i64> {
        as_int(self.dispatch(
            Invocation::new("HSET")
                .arg(Value::from(key))
                .arg(Value::from(field))
                .arg(value.into()),
        )?)
    }

    pub fn hget(&mut self, key: &str, field: &str) -> Result<Option<Bytes>> {
        as_opt_bytes(self.dispatch(
            Invocation::new("HGET")
                .arg(Value::from(key))
                .arg(Value::from(field)),
        )?)
    }

    pub fn hmget(&mut self, key: &str, fields: &[&str]) -> Result<Vec<Option<Bytes>>> {
        let mut inv = Invocation::new("HMGET").arg(Value::from(key));
        inv.args.push(key_list(fields));
        let items = as_array(self.dispatch(inv)?)?;
        items.into_iter().map(as_opt_bytes).collect()
    }

    pub fn hgetall(&mut self, key: &str) -> Result<Vec<(String, Bytes)>> {
        as_pairs(self.dispatch(Invocation::new("HGETALL").arg(Value::from(key)))?)
    }

    pub fn hdel(&mut self, key: &str, fields: &[&str]) -> Result<i64> {
        let mut inv = Invocation::new("HDEL").arg(Value::from(key));
        inv.args.push(key_list(fields));
        as_int(self.dispatch(inv)?)
    }

    pub fn hexists(&mut self, key: &str, field: &str) -> Result<bool> {
        as_bool(self.dispatch(
            Invocation::new("HEXISTS")
                .arg(Value::from(key))
                .arg(Value::from(field)),
        )?)
    }

    pub fn hlen(&mut self, key: &str) -> Result<i64> {
        as_int(self.dispatch(Invocation::new("HLEN").arg(Value::from(key)))?)
    }

    pub fn hkeys(&mut self, key: &str) -> Result<Vec<String>> {
        as_string_vec(self.dispatch(Invocation::new("HKEYS").arg(Value::from(key)))?)
    }

    pub fn hvals(&mut self, key: &str) -> Result<Vec<Bytes>> {
        as_bytes_vec(self.dispatch(Invocation::new("HVALS").arg(Value::from(key)))?)
    }

    pub fn hincrby(&mut self, key: &str, field: &str, delta: i64) -> Result<i64> {
        as_int(self.dispatch(
            Invocation::new("HINCRBY")
                .arg(Value::from(key))
                .arg(Value::from(field))
                .arg(Value::Int(delta)),
        )?)
    }

    pub fn hincrbyfloat(&mut self, key: &str, field: &str, delta: f64) -> Result<f64> {
        as_float(self.dispatch(
            Invocation::new("HINCRBYFLOAT")
                .arg(Value::from(key))
                .arg(Value::from(field))
                .arg(Value::Float(delta)),
        )?)
    }

    pub fn hscan(
        &mut self,
        key: &str,
        cursor: u64,
        pattern: Option<&str>,
        count: Option<u64>,
    ) -> Result<(u64, Vec<(String, Bytes)>)> {
        let inv = scan_invocation("HSCAN", Some(key), cursor, pattern, count);
        let (next, items) = as_scan(self.dispatch(inv)?)?;
        Ok((next, flat_pairs(items)?))
    }

    // --- lists ---

    /// Push to the head; values are pushed left to right, so the last
    /// value ends up frontmost. Returns the list length.
    pub fn lpush(&mut self, key: &str, values: &[Value]) -> Result<i64> {
        let mut inv = Invocation::new("LPUSH").arg(Value::from(key));
        inv.args.push(Arg::List(values.to_vec()));
        as_int(self.dispatch(inv)?)
    }

    /// Push to the tail, preserving argument order. Returns the list length.
    pub fn rpush(&mut self, key: &str, values: &[Value]) -> Result<i64> {
        let mut inv = Invocation::new("RPUSH").arg(Value::from(key));
        inv.args.push(Arg::List(values.to_vec()));
        as_int(self.dispatch(inv)?)
    }

    pub fn lpop(&mut self, key: &str) -> Result<Option<Bytes>> {
        as_opt_bytes(self.dispatch(Invocation::new("LPOP").arg(Value::from(key)))?)
    }

    pub fn lpop_count(&mut self, key: &str, count: u64) -> Result<Vec<Bytes>> {
        as_bytes_vec(self.dispatch(
            Invocation::new("LPOP")
                .arg(Value::from(key))
                .arg(Value::Int(count as i64)),
        )?)
    }

    pub fn rpop(&mut self, key: &str) -> Result<Option<Bytes>> {
        as_opt_bytes(self.dispatch(Invocation::new("RPOP").arg(Value::from(key)))?)
    }

    pub fn rpop_count(&mut self, key: &str, count: u64) -> Result<Vec<Bytes>> {
        as_bytes_vec(self.dispatch(
            Invocation::new("RPOP")
                .arg(Value::from(key))
                .arg(Value::Int(count as i64)),
        )?)
    }

    pub fn llen(&mut self, key: &str) -> Result<i64> {
        as_int(self.dispatch(Invocation::new("LLEN").arg(Value::from(key)))?)
    }

    pub fn lrange(&mut self, key: &str, start: i64, stop: i64) -> Result<Vec<Bytes>> {
        as_bytes_vec(self.dispatch(
            Invocation::new("LRANGE")
                .arg(Value::from(key))
                .arg(Value::Int(start))
                .arg(Value::Int(stop)),
        )?)
    }

    pub fn lindex(&mut self, key: &str, index: i64) -> Result<Option<Bytes>> {
        as_opt_bytes(self.dispatch(
            Invocation::new("LINDEX")
                .arg(Value::from(key))
                .arg(Value::Int(index)),
        )?)
    }

    // --- sets ---

    /// Add members, returning how many were not already present.
    pub fn sadd(&mut self, key: &str, members: &[Value]) -> Result<i64> {
        let mut inv = Invocation::new("SADD").arg(Value::from(key));
        inv.args.push(Arg::List(members.to_vec()));
        as_int(self.dispatch(inv)?)
    }

    pub fn srem(&mut self, key: &str, members: &[Value]) -> Result<i64> {
        let mut inv = Invocation::new("SREM").arg(Value::from(key));
        inv.args.push(Arg::List(members.to_vec()));
        as_int(self.dispatch(inv)?)
    }

    pub fn smembers(&mut self, key: &str) -> Result<Vec<Bytes>> {
        as_bytes_vec(self.dispatch(Invocation::new("SMEMBERS").arg(Value::from(key)))?)
    }

    pub fn sismember(&mut self, key: &str, member: impl Into<Value>) -> Result<bool> {
        as_bool(self.dispatch(
            Invocation::new("SISMEMBER")
                .arg(Value::from(key))
                .arg(member.into()),
        )?)
    }

    pub fn scard(&mut self, key: &str) -> Result<i64> {
        as_int(self.dispatch(Invocation::new("SCARD").arg(Value::from(key)))?)
    }

    pub fn sscan(
        &mut self,
        key: &str,
        cursor: u64,
        pattern: Option<&str>,
        count: Option<u64>,
    ) -> Result<(u64, Vec<Bytes>)> {
        let inv = scan_invocation("SSCAN", Some(key), cursor, pattern, count);
        let (next, items) = as_scan(self.dispatch(inv)?)?;
        let members = items.into_iter().map(as_bytes).collect::<Result<_>>()?;
        Ok((next, members))
    }

    // --- sorted sets ---

    /// Add members with scores, returning how many were newly created.
    /// Re-scoring an existing member counts 0; duplicate members in one
    /// call collapse to the last score given.
    pub fn zadd(&mut self, key: &str, members: &[ZMember]) -> Result<i64> {
        let mut inv = Invocation::new("ZADD").arg(Value::from(key));
        inv.args.push(Arg::Pairs(
            members
                .iter()
                .map(|m| (Value::Float(m.score), Value::Bin(m.member.clone())))
                .collect(),
        ));
        as_int(self.dispatch(inv)?)
    }

    pub fn zrem(&mut self, key: &str, members: &[Value]) -> Result<i64> {
        let mut inv = Invocation::new("ZREM").arg(Value::from(key));
        inv.args.push(Arg::List(members.to_vec()));
        as_int(self.dispatch(inv)?)
    }

    pub fn zscore(&mut self, key: &str, member: impl Into<Value>) -> Result<Option<f64>> {
        as_opt_float(self.dispatch(
            Invocation::new("ZSCORE")
                .arg(Value::from(key))
                .arg(member.into()),
        )?)
    }

    pub fn zcard(&mut self, key: &str) -> Result<i64> {
        as_int(self.dispatch(Invocation::new("ZCARD").arg(Value::from(key)))?)
    }

    /// Count members with scores in the inclusive [min, max] range.
    pub fn zcount(&mut self, key: &str, min: f64, max: f64) -> Result<i64> {
        as_int(self.dispatch(
            Invocation::new("ZCOUNT")
                .arg(Value::from(key))
                .arg(Value::Float(min))
                .arg(Value::Float(max)),
        )?)
    }

    /// Increment a member's score, creating it at `delta` when absent.
    pub fn zincrby(&mut self, key: &str, delta: f64, member: impl Into<Value>) -> Result<f64> {
        as_float(self.dispatch(
            Invocation::new("ZINCRBY")
                .arg(Value::from(key))
                .arg(Value::Float(delta))
                .arg(member.into()),
        )?)
    }

    pub fn zrange(&mut self, key: &str, start: i64, stop: i64) -> Result<Vec<Bytes>> {
        as_bytes_vec(self.dispatch(
            Invocation::new("ZRANGE")
                .arg(Value::from(key))
                .arg(Value::Int(start))
                .arg(Value::Int(stop)),
        )?)
    }

    pub fn zrange_withscores(
        &mut self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<ZMember>> {
        let reply = self.dispatch(
            Invocation::new("ZRANGE")
                .arg(Value::from(key))
                .arg(Value::Int(start))
                .arg(Value::Int(stop))
                .arg(Value::from("WITHSCORES")),
        )?;
        flat_zmembers(as_array(reply)?)
    }

    pub fn zscan(
        &mut self,
        key: &str,
        cursor: u64,
        pattern: Option<&str>,
        count: Option<u64>,
    ) -> Result<(u64, Vec<ZMember>)> {
        let inv = scan_invocation("ZSCAN", Some(key), cursor, pattern, count);
        let (next, items) = as_scan(self.dispatch(inv)?)?;
        Ok((next, flat_zmembers(items)?))
    }

    // --- namespace extensions ---

    /// Full-text search commands. Unsupported backends answer with
    /// `UnknownCommand`.
    pub fn fts(&mut self) -> Fts<'_> {
        Fts::new(self)
    }

    /// Vector-set commands.
    pub fn vector(&mut self) -> VectorSet<'_> {
        VectorSet::new(self)
    }

    /// Geospatial commands.
    pub fn geo(&mut self) -> Geo<'_> {
        Geo::new(self)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

fn key_list(keys: &[&str]) -> Arg {
    Arg::List(keys.iter().map(|k| Value::from(*k)).collect())
}

fn scan_invocation(
    name: &str,
    key: Option<&str>,
    cursor: u64,
    pattern: Option<&str>,
    count: Option<u64>,
) -> Invocation {
    let mut inv = Invocation::new(name);
    if let Some(key) = key {
        inv = inv.arg(Value::from(key));
    }
    inv = inv.arg(Value::Int(cursor as i64));
    if let Some(pattern) = pattern {
        inv = inv.arg(Value::from("MATCH")).arg(Value::from(pattern));
    }
    if let Some(count) = count {
        inv = inv.arg(Value::from("COUNT")).arg(Value::Int(count as i64));
    }
    inv
}

fn lossy(raw: Bytes) -> String {
    String::from_utf8_lossy(raw.as_ref()).into_owned()
}

fn unexpected(reply: &Reply) -> Error {
    Error::Protocol(format!("unexpected reply shape: {:?}", reply))
}

fn as_ok(reply: Reply) -> Result<()> {
    match reply {
        Reply::Simple(s) if s == "OK" => Ok(()),
        other => Err(unexpected(&other)),
    }
}

fn as_int(reply: Reply) -> Result<i64> {
    match reply {
        Reply::Int(n) => Ok(n),
        other => Err(unexpected(&other)),
    }
}

fn as_bool(reply: Reply) -> Result<bool> {
    Ok(as_int(reply)? != 0)
}

fn as_opt_bytes(reply: Reply) -> Result<Option<Bytes>> {
    match reply {
        Reply::Bulk(b) => Ok(Some(b)),
        Reply::Nil => Ok(None),
        other => Err(unexpected(&other)),
    }
}

fn as_bytes(reply: Reply) -> Result<Bytes> {
    match reply {
        Reply::Bulk(b) => Ok(b),
        other => Err(unexpected(&other)),
    }
}

fn as_float(reply: Reply) -> Result<f64> {
    let raw = as_bytes(reply)?;
    crate::value::parse_float(&raw)
        .ok_or_else(|| Error::Protocol(format!("non-numeric reply: {:?}", raw)))
}

fn as_opt_float(reply: Reply) -> Result<Option<f64>> {
    match as_opt_bytes(reply)? {
        None => Ok(None),
        Some(raw) => crate::value::parse_float(&raw)
            .map(Some)
            .ok_or_else(|| Error::Protocol(format!("non-numeric reply: {:?}", raw))),
    }
}

fn as_array(reply: Reply) -> Result<Vec<Reply>> {
    match reply {
        Reply::Array(items) => Ok(items),
        // An absent aggregate reads as empty.
        Reply::Nil => Ok(Vec::new()),
        other => Err(unexpected(&other)),
    }
}

fn as_bytes_vec(reply: Reply) -> Result<Vec<Bytes>> {
    as_array(reply)?.into_iter().map(as_bytes).collect()
}

fn as_string_vec(reply: Reply) -> Result<Vec<String>> {
    Ok(as_bytes_vec(reply)?.into_iter().map(lossy).collect())
}

fn as_pairs(reply: Reply) -> Result<Vec<(String, Bytes)>> {
    flat_pairs(as_array(reply)?)
}

/// Interpret a flat [field, value, field, value, ...] array.
fn flat_pairs(items: Vec<Reply>) -> Result<Vec<(String, Bytes)>> {
    if items.len() % 2 != 0 {
        return Err(Error::Protocol("odd-length pair array".to_string()));
    }
    let mut out = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
        out.push((lossy(as_bytes(field)?), as_bytes(value)?));
    }
    Ok(out)
}

/// Interpret a flat [member, score, member, score, ...] array.
fn flat_zmembers(items: Vec<Reply>) -> Result<Vec<ZMember>> {
    if items.len() % 2 != 0 {
        return Err(Error::Protocol("odd-length member/score array".to_string()));
    }
    let mut out = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(member), Some(score)) = (iter.next(), iter.next()) {
        let member = as_bytes(member)?;
        let score = as_float(score)?;
        out.push(ZMember { score, member });
    }
    Ok(out)
}

/// Two-element [cursor, items] scan reply.
fn as_scan(reply: Reply) -> Result<(u64, Vec<Reply>)> {
    let mut parts = as_array(reply)?;
    if parts.len() != 2 {
        return Err(Error::Protocol("malformed scan reply".to_string()));
    }
    let items = as_array(parts.pop().unwrap_or(Reply::Nil))?;
    let cursor_raw = as_bytes(parts.pop().unwrap_or(Reply::Nil))?;
    let cursor = crate::value::parse_int(&cursor_raw)
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| Error::Protocol("malformed scan cursor".to_string()))?;
    Ok((cursor, items))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem() -> Session {
        Session::open(":memory:").unwrap()
    }

    #[test]
    fn test_parse_remote_targets() {
        match parse_target("redis://cache.internal:6380/3").unwrap() {
            Target::Remote { host, port, tls, db } => {
                assert_eq!(host, "cache.internal");
                assert_eq!(port, 6380);
                assert!(!tls);
                assert_eq!(db, 3);
            }
            _ => panic!("expected remote target"),
        }
        match parse_target("rediss://cache.internal").unwrap() {
            Target::Remote { port, tls, db, .. } => {
                assert_eq!(port, 6379);
                assert!(tls);
                assert_eq!(db, 0);
            }
            _ => panic!("expected remote target"),
        }
        assert!(matches!(parse_target(":memory:").unwrap(), Target::Memory));
        assert!(matches!(
            parse_target("/var/lib/app/data.db").unwrap(),
            Target::Disk(_)
        ));
        assert!(parse_target("redis://host:notaport").is_err());
        assert!(parse_target("redis://:6379").is_err());
    }

    #[test]
    fn test_typed_roundtrip_over_embedded() {
        let mut s = mem();
        assert_eq!(s.mode(), Mode::Embedded);
        s.set("k", "v").unwrap();
        assert_eq!(s.get("k").unwrap(), Some(Bytes::from_static(b"v")));
        assert_eq!(s.del(&["k", "missing"]).unwrap(), 1);
        assert_eq!(s.get("k").unwrap(), None);
    }

    #[test]
    fn test_closed_session_rejects_commands() {
        let mut s = mem();
        s.close();
        assert!(!s.is_open());
        assert!(matches!(s.get("k"), Err(Error::ConnectionClosed)));
        // Closing again is a no-op.
        s.close();
    }

    #[test]
    fn test_set_opts_condition_report() {
        let mut s = mem();
        assert!(s.set_opts("k", "v1", SetOptions::default().nx()).unwrap());
        assert!(!s.set_opts("k", "v2", SetOptions::default().nx()).unwrap());
        assert_eq!(s.get("k").unwrap(), Some(Bytes::from_static(b"v1")));
    }

    #[test]
    fn test_hset_mapping_and_triple_forms() {
        let mut s = mem();
        assert_eq!(
            s.hset("h", &[("a", Value::from("1")), ("b", Value::from("2"))])
                .unwrap(),
            2
        );
        assert_eq!(s.hset_one("h", "a", "9").unwrap(), 0);
        assert_eq!(s.hget("h", "a").unwrap(), Some(Bytes::from_static(b"9")));
    }

    #[test]
    fn test_scan_pages_cover_keyspace() {
        let mut s = mem();
        for i in 0..25 {
            s.set(&format!("key:{:02}", i), "x").unwrap();
        }
        let mut seen = Vec::new();
        let mut cursor = 0;
        loop {
            let (next, page) = s.scan(cursor, None, Some(7)).unwrap();
            seen.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        assert_eq!(seen.len(), 25);
    }

    #[test]
    fn test_push_order_head_vs_tail() {
        let mut s = mem();
        s.lpush(
            "l",
            &[Value::from("1"), Value::from("2"), Value::from("3")],
        )
        .unwrap();
        let head_first = s.lrange("l", 0, -1).unwrap();
        assert_eq!(
            head_first,
            vec![
                Bytes::from_static(b"3"),
                Bytes::from_static(b"2"),
                Bytes::from_static(b"1")
            ]
        );

        s.rpush(
            "r",
            &[Value::from("1"), Value::from("2"), Value::from("3")],
        )
        .unwrap();
        let tail_order = s.lrange("r", 0, -1).unwrap();
        assert_eq!(
            tail_order,
            vec![
                Bytes::from_static(b"1"),
                Bytes::from_static(b"2"),
                Bytes::from_static(b"3")
            ]
        );
    }

    #[test]
    fn test_ttl_sentinels() {
        let mut s = mem();
        s.set("plain", "v").unwrap();
        assert_eq!(s.ttl("plain").unwrap(), -1);
        assert_eq!(s.ttl("missing").unwrap(), -2);
        s.setex("ephemeral", 100, "v").unwrap();
        let remaining = s.ttl("ephemeral").unwrap();
        assert!(remaining > 0 && remaining <= 100);
        assert!(s.persist("ephemeral").unwrap());
        assert_eq!(s.ttl("ephemeral").unwrap(), -1);
    }

    #[test]
    fn test_renamenx_leaves_destination_untouched() {
        let mut s = mem();
        s.set("src", "moved").unwrap();
        s.set("dst", "original").unwrap();
        assert!(!s.renamenx("src", "dst").unwrap());
        assert_eq!(s.get("dst").unwrap(), Some(Bytes::from_static(b"original")));
        assert_eq!(s.get("src").unwrap(), Some(Bytes::from_static(b"moved")));

        s.del(&["dst"]).unwrap();
        assert!(s.renamenx("src", "dst").unwrap());
        assert_eq!(s.get("src").unwrap(), None);
        assert_eq!(s.get("dst").unwrap(), Some(Bytes::from_static(b"moved")));
    }

    #[test]
    fn test_zadd_reports_new_members_and_zincrby_accumulates() {
        let mut s = mem();
        assert_eq!(
            s.zadd(
                "z",
                &[ZMember::new(1.0, &b"a"[..]), ZMember::new(2.0, &b"b"[..])]
            )
            .unwrap(),
            2
        );
        assert_eq!(s.zadd("z", &[ZMember::new(9.0, &b"a"[..])]).unwrap(), 0);
        assert_eq!(s.zincrby("z", 5.0, "b").unwrap(), 7.0);
        assert_eq!(s.zscore("z", "b").unwrap(), Some(7.0));
        assert_eq!(s.zscore("z", "missing").unwrap(), None);
        let scored = s.zrange_withscores("z", 0, -1).unwrap();
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[1].member.as_ref(), b"a");
        assert_eq!(scored[1].score, 9.0);
    }

    #[test]
    fn test_persistent_target_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.fkv");
        let target = path.to_string_lossy().into_owned();

        let mut s = Session::open(&target).unwrap();
        s.set("k", "persisted").unwrap();
        s.rpush("l", &[Value::from("x")]).unwrap();
        s.close();

        let mut s = Session::open(&target).unwrap();
        assert_eq!(s.get("k").unwrap(), Some(Bytes::from_static(b"persisted")));
        assert_eq!(s.llen("l").unwrap(), 1);
    }

    #[test]
    fn test_drop_closes_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.fkv");
        let target = path.to_string_lossy().into_owned();
        {
            let mut s = Session::open(&target).unwrap();
            s.set("k", "v").unwrap();
        }
        let mut s = Session::open(&target).unwrap();
        assert_eq!(s.get("k").unwrap(), Some(Bytes::from_static(b"v")));
    }

    #[test]
    fn test_hset_new_field_count_semantics() {
        let mut s = mem();
        assert_eq!(s.hset_one("h", "f", "v1").unwrap(), 1);
        assert_eq!(s.hset_one("h", "f", "v2").unwrap(), 0);
        assert_eq!(s.hget("h", "f").unwrap(), Some(Bytes::from_static(b"v2")));
    }

    #[test]
    fn test_counter_surface() {
        let mut s = mem();
        assert_eq!(s.incr("c").unwrap(), 1);
        assert_eq!(s.incrby("c", 10).unwrap(), 11);
        assert_eq!(s.decrby("c", 4).unwrap(), 7);
        assert_eq!(s.incrbyfloat("f", 1.25).unwrap(), 1.25);
        assert_eq!(s.incrbyfloat("f", 0.75).unwrap(), 2.0);
    }

    #[test]
    fn test_raw_command_bypasses_reshaping() {
        let mut s = mem();
        let reply = s
            .raw_command("set", &[Value::from("k"), Value::from("v")])
            .unwrap();
        assert_eq!(reply, Reply::ok());
        match s.raw_command("FT.SEARCH", &[Value::from("idx"), Value::from("q")]) {
            Err(Error::UnknownCommand(name)) => assert_eq!(name, "FT.SEARCH"),
            other => panic!("expected UnknownCommand, got {:?}", other),
        }
    }
}
