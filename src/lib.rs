//! FERROKV - Dual-Mode Key-Value Client
//!
//! One typed API over two interchangeable backends: an embedded in-process
//! engine (`:memory:` or a file path) and a networked server speaking the
//! standard wire protocol (`redis://` / `rediss://`). A session binds to
//! exactly one backend at open and observes identical command semantics
//! either way.

pub mod backend;
pub mod command;
pub mod engine;
pub mod error;
pub mod ext;
pub mod router;
pub mod session;
pub mod types;
pub mod value;

pub use backend::Reply;
pub use error::{Error, Result};
pub use ext::{Fts, Geo, GeoSearchOptions, SearchOptions, VectorSet};
pub use session::{Mode, OpenOptions, Session};
pub use types::{KeyType, SetOptions, ZMember};
pub use value::Value;
