//! Backend Dispatch
//!
//! One trait over the in-process engine and the networked server.
//! Mode selection happens once, at session open.

pub mod embedded;
pub mod server;

use bytes::Bytes;

use crate::error::Result;

pub use embedded::EmbeddedBackend;
pub use server::ServerBackend;

/// A reply from either backend, mirroring the wire protocol's shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Status line, e.g. "OK" or "PONG".
    Simple(String),
    /// A byte-string payload.
    Bulk(Bytes),
    Int(i64),
    Array(Vec<Reply>),
    /// Absent value. Distinct from an empty `Bulk`.
    Nil,
}

impl Reply {
    pub fn ok() -> Reply {
        Reply::Simple("OK".to_string())
    }

    pub fn bulk(data: impl Into<Bytes>) -> Reply {
        Reply::Bulk(data.into())
    }

    pub fn opt_bulk(data: Option<Bytes>) -> Reply {
        match data {
            Some(b) => Reply::Bulk(b),
            None => Reply::Nil,
        }
    }

    pub fn array_of_bulk(items: impl IntoIterator<Item = Bytes>) -> Reply {
        Reply::Array(items.into_iter().map(Reply::Bulk).collect())
    }
}

/// One backend binding: executes a normalized command and owns the
/// underlying handle until closed.
pub trait Backend: Send {
    /// Execute a command given its uppercase name and flat argument list.
    fn execute(&mut self, name: &str, args: &[Bytes]) -> Result<Reply>;

    /// Release the underlying handle. Must be safe to call once; the
    /// session guarantees it is not called twice.
    fn close(&mut self);
}
