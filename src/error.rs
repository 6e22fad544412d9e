//! Client Error Taxonomy
//!
//! Every failure surfaces as a typed error; sentinel return values (-1, -2,
//! `None`) are reserved for well-defined non-error states and are never used
//! to mask a backend failure.

use thiserror::Error;

/// Top-level client error type.
#[derive(Error, Debug)]
pub enum Error {
    /// A command was issued on a session that is not open.
    #[error("connection closed")]
    ConnectionClosed,

    /// The backend failed to open (bad path, unreachable target).
    #[error("open failed: {0}")]
    Open(String),

    /// A failure reported by the underlying engine or server, with the
    /// backend's original message text.
    #[error("{0}")]
    Backend(String),

    /// A logical command name the dispatch layer does not recognize.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// A malformed wire frame or a reply of an unexpected shape.
    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, Error>;
