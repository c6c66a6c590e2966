//! Segment primitives consumed by the scoring engine
//!
//! This crate defines the narrow contract the engine needs from an index
//! segment and provides:
//! - `Postings` / `SegmentReader` traits (posting iteration, statistics,
//!   identity, raw column bytes)
//! - `SegmentEvents` close-notification hub
//! - `FieldValueCache` per-segment decoded column cache
//! - `MemorySegment`, an in-memory reference implementation used by tests
//!   and embedded deployments
//!
//! Segment storage itself (files, compression codecs, merges) lives outside
//! this workspace; anything that can satisfy `SegmentReader` can be scored.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod column;
pub mod events;
pub mod field_cache;
pub mod memory;

use meridian_core::{DocId, SegmentId};

pub use column::DecodedColumn;
pub use events::SegmentEvents;
pub use field_cache::FieldValueCache;
pub use memory::{DocumentDraft, MemorySegment, MemorySegmentBuilder};

/// Posting enumerator for one (field, term) pair
///
/// Iteration is forward-only and yields documents in increasing doc id
/// order. `freq` and `positions` describe the document the enumerator is
/// currently positioned on and are only meaningful after `next` returned
/// true.
pub trait Postings: Send {
    /// Advance to the next document; false at exhaustion
    fn next(&mut self) -> bool;

    /// Document the enumerator is positioned on
    fn doc(&self) -> DocId;

    /// Term frequency within the current document
    fn freq(&self) -> u32;

    /// Token positions of the term within the current document
    fn positions(&self) -> &[u32];
}

/// Read access to one immutable segment
///
/// Implementations must be shareable across concurrent search requests.
/// A reader handle held by an in-flight search stays valid until that
/// search completes; reference counting of the underlying storage is the
/// implementation's concern.
pub trait SegmentReader: Send + Sync {
    /// Stable identity of this segment
    fn segment_id(&self) -> SegmentId;

    /// Number of documents in this segment
    fn doc_count(&self) -> u32;

    /// Posting enumerator for (field, term); None if the term is absent
    fn postings(&self, field: &str, term: &str) -> Option<Box<dyn Postings>>;

    /// Number of documents containing the term in the field
    fn doc_freq(&self, field: &str, term: &str) -> u32;

    /// Total occurrences of the term in the field across all documents
    fn total_term_freq(&self, field: &str, term: &str) -> u64;

    /// Raw encoded column bytes for (field, doc); None if absent
    fn field_bytes(&self, field: &str, doc: DocId) -> Option<&[u8]>;
}
