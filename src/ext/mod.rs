//! Namespace Extensions
//!
//! Thin wrappers over the raw-command escape hatch for command families
//! outside the core typed surface. A backend that does not implement a
//! family answers with `UnknownCommand`.

mod fts;
mod geo;
mod vector;

pub use fts::{Fts, SearchOptions};
pub use geo::{Geo, GeoSearchOptions};
pub use vector::VectorSet;
