//! Meridian core types
//!
//! Shared vocabulary for the scoring engine:
//! - DocId / Score / SegmentId / DocAddress identifiers
//! - FieldType / FieldValue column-value type system
//! - Schema descriptor used for validation and decoder selection
//! - Error enum and Result alias
//! - Explanation tree for score debugging
//!
//! Everything here is deliberately free of index or scoring logic so the
//! segment and scoring crates can depend on it without cycles.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod explain;
pub mod schema;
pub mod types;

pub use error::{Error, Result};
pub use explain::Explanation;
pub use schema::{FieldSchema, Schema};
pub use types::{DocAddress, DocId, FieldType, FieldValue, Score, SegmentId};
