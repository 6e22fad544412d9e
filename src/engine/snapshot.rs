//! Snapshot Persistence
//!
//! Point-in-time binary snapshot of every logical database, loaded on open
//! and rewritten on close/vacuum for path-backed engines.
//!
//! File format:
//! - Magic: 4 bytes "FKVS"
//! - Version: 1 byte
//! - Entry count: 4 bytes (LE)
//! - Entries: db (1) + type tag (1) + expiry millis (8, 0 = none)
//!   + key (len-prefixed) + type-specific payload

use bytes::Bytes;
use hashbrown::{HashMap, HashSet};
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::{DataValue, Engine, Entry, Keyspace, DB_COUNT};

const SNAPSHOT_MAGIC: &[u8] = b"FKVS";
const SNAPSHOT_VERSION: u8 = 1;

const TAG_STRING: u8 = 1;
const TAG_HASH: u8 = 2;
const TAG_LIST: u8 = 3;
const TAG_SET: u8 = 4;
const TAG_ZSET: u8 = 5;

/// Write a snapshot of all databases, atomically via a temp file.
pub(crate) fn save(path: &Path, dbs: &[&Keyspace]) -> io::Result<()> {
    let now = Engine::now_ms();
    let tmp = path.with_extension("tmp");
    let file = File::create(&tmp)?;
    let mut writer = BufWriter::new(file);

    let live: Vec<(u8, &Bytes, &Entry)> = dbs
        .iter()
        .enumerate()
        .flat_map(|(db, ks)| {
            ks.iter()
                .filter(move |(_, e)| !e.is_expired(now))
                .map(move |(k, e)| (db as u8, k, e))
        })
        .collect();

    writer.write_all(SNAPSHOT_MAGIC)?;
    writer.write_all(&[SNAPSHOT_VERSION])?;
    writer.write_all(&(live.len() as u32).to_le_bytes())?;

    for (db, key, entry) in live {
        writer.write_all(&[db, tag_of(&entry.value)])?;
        writer.write_all(&entry.expires_at.unwrap_or(0).to_le_bytes())?;
        write_blob(&mut writer, key)?;
        match &entry.value {
            DataValue::String(b) => write_blob(&mut writer, b)?,
            DataValue::Hash(h) => {
                writer.write_all(&(h.len() as u32).to_le_bytes())?;
                for (f, v) in h {
                    write_blob(&mut writer, f)?;
                    write_blob(&mut writer, v)?;
                }
            }
            DataValue::List(l) => {
                writer.write_all(&(l.len() as u32).to_le_bytes())?;
                for v in l {
                    write_blob(&mut writer, v)?;
                }
            }
            DataValue::Set(s) => {
                writer.write_all(&(s.len() as u32).to_le_bytes())?;
                for m in s {
                    write_blob(&mut writer, m)?;
                }
            }
            DataValue::ZSet(z) => {
                writer.write_all(&(z.len() as u32).to_le_bytes())?;
                for (m, score) in z {
                    writer.write_all(&score.to_le_bytes())?;
                    write_blob(&mut writer, m)?;
                }
            }
        }
    }

    writer.flush()?;
    drop(writer);
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Load a snapshot into fresh keyspaces, skipping entries that expired
/// while the file sat on disk.
pub(crate) fn load(path: &Path) -> io::Result<Vec<Keyspace>> {
    let now = Engine::now_ms();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != SNAPSHOT_MAGIC {
        return Err(corrupt("bad magic"));
    }
    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;
    if version[0] != SNAPSHOT_VERSION {
        return Err(corrupt("unsupported version"));
    }

    let count = read_u32(&mut reader)? as usize;
    let mut dbs: Vec<Keyspace> = (0..DB_COUNT).map(|_| Keyspace::new()).collect();

    for _ in 0..count {
        let mut head = [0u8; 2];
        reader.read_exact(&mut head)?;
        let (db, tag) = (head[0] as usize, head[1]);
        if db >= DB_COUNT {
            return Err(corrupt("db index out of range"));
        }

        let mut expiry = [0u8; 8];
        reader.read_exact(&mut expiry)?;
        let expires_at = match i64::from_le_bytes(expiry) {
            0 => None,
            ms => Some(ms),
        };

        let key = read_blob(&mut reader)?;
        let value = match tag {
            TAG_STRING => DataValue::String(read_blob(&mut reader)?),
            TAG_HASH => {
                let n = read_u32(&mut reader)? as usize;
                let mut h = HashMap::with_capacity(n);
                for _ in 0..n {
                    let f = read_blob(&mut reader)?;
                    let v = read_blob(&mut reader)?;
                    h.insert(f, v);
                }
                DataValue::Hash(h)
            }
            TAG_LIST => {
                let n = read_u32(&mut reader)? as usize;
                let mut l = VecDeque::with_capacity(n);
                for _ in 0..n {
                    l.push_back(read_blob(&mut reader)?);
                }
                DataValue::List(l)
            }
            TAG_SET => {
                let n = read_u32(&mut reader)? as usize;
                let mut s = HashSet::with_capacity(n);
                for _ in 0..n {
                    s.insert(read_blob(&mut reader)?);
                }
                DataValue::Set(s)
            }
            TAG_ZSET => {
                let n = read_u32(&mut reader)? as usize;
                let mut z = HashMap::with_capacity(n);
                for _ in 0..n {
                    let mut score = [0u8; 8];
                    reader.read_exact(&mut score)?;
                    let m = read_blob(&mut reader)?;
                    z.insert(m, f64::from_le_bytes(score));
                }
                DataValue::ZSet(z)
            }
            _ => return Err(corrupt("unknown type tag")),
        };

        let entry = Entry { value, expires_at };
        if !entry.is_expired(now) {
            dbs[db].insert(key, entry);
        }
    }

    Ok(dbs)
}

fn tag_of(value: &DataValue) -> u8 {
    match value {
        DataValue::String(_) => TAG_STRING,
        DataValue::Hash(_) => TAG_HASH,
        DataValue::List(_) => TAG_LIST,
        DataValue::Set(_) => TAG_SET,
        DataValue::ZSet(_) => TAG_ZSET,
    }
}

fn write_blob(writer: &mut impl Write, data: &[u8]) -> io::Result<()> {
    writer.write_all(&(data.len() as u32).to_le_bytes())?;
    writer.write_all(data)
}

fn read_blob(reader: &mut impl Read) -> io::Result<Bytes> {
    let len = read_u32(reader)? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(Bytes::from(buf))
}

fn read_u32(reader: &mut impl Read) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn corrupt(detail: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("corrupt snapshot: {}", detail))
}
