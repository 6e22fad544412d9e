//! Shared command-surface types.

use bytes::Bytes;

/// Type of a stored key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    String,
    Hash,
    List,
    Set,
    ZSet,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::String => "string",
            KeyType::Hash => "hash",
            KeyType::List => "list",
            KeyType::Set => "set",
            KeyType::ZSet => "zset",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "string" => Some(KeyType::String),
            "hash" => Some(KeyType::Hash),
            "list" => Some(KeyType::List),
            "set" => Some(KeyType::Set),
            "zset" => Some(KeyType::ZSet),
            _ => None,
        }
    }
}

/// Options for SET: expiry plus conditional-existence flags.
///
/// `ex`/`px` and `nx`/`xx` are mutually exclusive by wire contract;
/// supplying contradictory combinations is the caller's error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions {
    /// Expire after this many seconds.
    pub ex: Option<u64>,
    /// Expire after this many milliseconds.
    pub px: Option<u64>,
    /// Only set if the key does not exist.
    pub nx: bool,
    /// Only set if the key already exists.
    pub xx: bool,
}

impl SetOptions {
    pub fn ex(mut self, seconds: u64) -> Self {
        self.ex = Some(seconds);
        self
    }

    pub fn px(mut self, millis: u64) -> Self {
        self.px = Some(millis);
        self
    }

    pub fn nx(mut self) -> Self {
        self.nx = true;
        self
    }

    pub fn xx(mut self) -> Self {
        self.xx = true;
        self
    }
}

/// A sorted-set member with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ZMember {
    pub score: f64,
    pub member: Bytes,
}

impl ZMember {
    pub fn new(score: f64, member: impl Into<Bytes>) -> Self {
        Self {
            score,
            member: member.into(),
        }
    }
}
