//! Command Router
//!
//! Maps each logical command to a declarative shape rule and flattens any
//! accepted argument shape into the wire argument list both backends
//! consume. Reshaping preserves push order and folds duplicate mapping
//! keys last-writer-wins.

use bytes::Bytes;
use hashbrown::HashMap;

use crate::command::{Arg, Invocation};
use crate::error::{Error, Result};
use crate::value::Value;

/// Argument shape rule for one logical command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Scalar arguments only, passed through in order.
    Verbatim,
    /// A trailing list argument splats into variadic positions.
    SplatTail,
    /// A sequence of [key, value] pairs folds into a single mapping.
    FoldPairs,
    /// (key, field, value) promotes to (key, {field: value}).
    PromoteTriple,
    /// (key, [[score, member], ...]) converts to (key, {member: score}).
    ScorePairs,
}

/// The reshape table: logical command name to shape rule.
///
/// Returns `None` for command names outside the typed surface.
pub fn shape_of(name: &str) -> Option<Shape> {
    Some(match name {
        "DEL" | "EXISTS" | "MGET" | "HDEL" | "HMGET" | "ZREM" | "SADD" | "SREM" | "LPUSH"
        | "RPUSH" => Shape::SplatTail,
        "MSET" => Shape::FoldPairs,
        "HSET" => Shape::PromoteTriple,
        "ZADD" => Shape::ScorePairs,
        "GET" | "SET" | "SETEX" | "PSETEX" | "GETDEL" | "APPEND" | "STRLEN" | "GETRANGE"
        | "SETRANGE" | "INCR" | "DECR" | "INCRBY" | "DECRBY" | "INCRBYFLOAT" | "TYPE" | "TTL"
        | "PTTL" | "EXPIRE" | "PEXPIRE" | "EXPIREAT" | "PEXPIREAT" | "PERSIST" | "RENAME"
        | "RENAMENX" | "KEYS" | "DBSIZE" | "FLUSHDB" | "SELECT" | "SCAN" | "HGET" | "HGETALL"
        | "HEXISTS" | "HLEN" | "HKEYS" | "HVALS" | "HINCRBY" | "HINCRBYFLOAT" | "HSCAN"
        | "LPOP" | "RPOP" | "LLEN" | "LRANGE" | "LINDEX" | "SMEMBERS" | "SISMEMBER" | "SCARD"
        | "SSCAN" | "ZSCORE" | "ZCARD" | "ZCOUNT" | "ZINCRBY" | "ZRANGE" | "ZSCAN" | "PING"
        | "VACUUM" => Shape::Verbatim,
        _ => return None,
    })
}

/// Normalize an invocation into the uppercase command name and the flat
/// wire argument list.
pub fn normalize(inv: &Invocation) -> Result<(String, Vec<Bytes>)> {
    let name = inv.name.to_ascii_uppercase();
    let shape = shape_of(&name).ok_or_else(|| Error::UnknownCommand(inv.name.clone()))?;

    let mut out = Vec::new();
    match shape {
        Shape::Verbatim => {
            for arg in &inv.args {
                match arg {
                    Arg::Scalar(v) => out.push(v.encode()),
                    _ => return Err(shape_error(&name, "takes scalar arguments only")),
                }
            }
        }
        Shape::SplatTail => {
            for arg in &inv.args {
                match arg {
                    Arg::Scalar(v) => out.push(v.encode()),
                    Arg::List(items) => out.extend(items.iter().map(Value::encode)),
                    _ => return Err(shape_error(&name, "does not take a mapping argument")),
                }
            }
        }
        Shape::FoldPairs => {
            let [pairs] = inv.args.as_slice() else {
                return Err(shape_error(&name, "expects a pair sequence or a mapping"));
            };
            for (k, v) in fold(pair_entries(&name, pairs)?) {
                out.push(k);
                out.push(v);
            }
        }
        Shape::PromoteTriple => match inv.args.as_slice() {
            [Arg::Scalar(key), Arg::Scalar(field), Arg::Scalar(value)] => {
                out.push(key.encode());
                out.push(field.encode());
                out.push(value.encode());
            }
            [Arg::Scalar(key), mapping] => {
                out.push(key.encode());
                for (f, v) in fold(pair_entries(&name, mapping)?) {
                    out.push(f);
                    out.push(v);
                }
            }
            _ => return Err(shape_error(&name, "expects (key, field, value) or (key, mapping)")),
        },
        Shape::ScorePairs => {
            let [Arg::Scalar(key), members] = inv.args.as_slice() else {
                return Err(shape_error(&name, "expects (key, members)"));
            };
            out.push(key.encode());
            // Pairs arrive as [score, member]; mappings as member -> score.
            // Either way the fold is keyed on the member.
            let entries: Vec<(Bytes, Bytes)> = match members {
                Arg::Pairs(entries) => entries
                    .iter()
                    .map(|(score, member)| (member.encode(), score.encode()))
                    .collect(),
                Arg::Map(entries) => entries
                    .iter()
                    .map(|(member, score)| (member.encode(), score.encode()))
                    .collect(),
                _ => return Err(shape_error(&name, "expects score/member pairs")),
            };
            for (member, score) in fold(entries) {
                out.push(score);
                out.push(member);
            }
        }
    }

    Ok((name, out))
}

fn pair_entries(name: &str, arg: &Arg) -> Result<Vec<(Bytes, Bytes)>> {
    match arg {
        Arg::Pairs(entries) | Arg::Map(entries) => Ok(entries
            .iter()
            .map(|(k, v)| (k.encode(), v.encode()))
            .collect()),
        _ => Err(shape_error(name, "expects a pair sequence or a mapping")),
    }
}

/// Fold duplicate keys, keeping first-insertion order and the last value.
fn fold(entries: Vec<(Bytes, Bytes)>) -> Vec<(Bytes, Bytes)> {
    let mut index: HashMap<Bytes, usize> = HashMap::with_capacity(entries.len());
    let mut out: Vec<(Bytes, Bytes)> = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        match index.get(&k) {
            Some(&i) => out[i].1 = v,
            None => {
                index.insert(k.clone(), out.len());
                out.push((k, v));
            }
        }
    }
    out
}

fn shape_error(name: &str, detail: &str) -> Error {
    Error::Protocol(format!("{} {}", name, detail))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalars(args: &[Bytes]) -> Vec<&[u8]> {
        args.iter().map(|b| b.as_ref()).collect()
    }

    #[test]
    fn test_unknown_command_rejected() {
        let inv = Invocation::new("FROB").arg(Value::from("k"));
        match normalize(&inv) {
            Err(Error::UnknownCommand(name)) => assert_eq!(name, "FROB"),
            other => panic!("expected UnknownCommand, got {:?}", other),
        }
    }

    #[test]
    fn test_splat_list_into_variadic() {
        let mut inv = Invocation::new("del");
        inv.args.push(Arg::List(vec![
            Value::from("a"),
            Value::from("b"),
            Value::from("c"),
        ]));
        let (name, args) = normalize(&inv).unwrap();
        assert_eq!(name, "DEL");
        assert_eq!(scalars(&args), vec![b"a" as &[u8], b"b", b"c"]);
    }

    #[test]
    fn test_splat_preserves_push_order() {
        let mut inv = Invocation::new("LPUSH").arg(Value::from("k"));
        inv.args.push(Arg::List(vec![
            Value::from("1"),
            Value::from("2"),
            Value::from("3"),
        ]));
        let (_, args) = normalize(&inv).unwrap();
        assert_eq!(scalars(&args), vec![b"k" as &[u8], b"1", b"2", b"3"]);
    }

    #[test]
    fn test_mset_folds_pairs_last_writer_wins() {
        let mut inv = Invocation::new("MSET");
        inv.args.push(Arg::Pairs(vec![
            (Value::from("k1"), Value::from("v1")),
            (Value::from("k2"), Value::from("v2")),
            (Value::from("k1"), Value::from("v3")),
        ]));
        let (_, args) = normalize(&inv).unwrap();
        assert_eq!(scalars(&args), vec![b"k1" as &[u8], b"v3", b"k2", b"v2"]);
    }

    #[test]
    fn test_hset_promotes_triple() {
        let inv = Invocation::new("HSET")
            .arg(Value::from("h"))
            .arg(Value::from("f"))
            .arg(Value::from("v"));
        let (_, args) = normalize(&inv).unwrap();
        assert_eq!(scalars(&args), vec![b"h" as &[u8], b"f", b"v"]);
    }

    #[test]
    fn test_zadd_score_member_pairs_to_mapping() {
        let mut inv = Invocation::new("ZADD").arg(Value::from("z"));
        inv.args.push(Arg::Pairs(vec![
            (Value::Float(1.0), Value::from("a")),
            (Value::Float(2.5), Value::from("b")),
            (Value::Float(9.0), Value::from("a")),
        ]));
        let (_, args) = normalize(&inv).unwrap();
        // Duplicate member "a" collapses to its last score.
        assert_eq!(scalars(&args), vec![b"z" as &[u8], b"9", b"a", b"2.5", b"b"]);
    }

    #[test]
    fn test_verbatim_rejects_list() {
        let mut inv = Invocation::new("GET");
        inv.args.push(Arg::List(vec![Value::from("k")]));
        assert!(matches!(normalize(&inv), Err(Error::Protocol(_))));
    }
}
