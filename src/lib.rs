//! Meridian - relevance-scoring query engine for distributed full-text search
//!
//! Meridian is the ranking core of a distributed search engine: a
//! multi-field, multi-term secondary scoring layer over inverted-index
//! retrieval, with pluggable per-document scoring strategies, match
//! policies, global IDF, segment-scoped column caches and bounded-cost
//! early termination.
//!
//! # Quick Start
//!
//! ```
//! use meridian::{
//!     DocumentDraft, FieldSchema, FieldValueCache, MemorySegmentBuilder, RankQuery, Schema,
//!     SearchOptions, Searcher, StrategyRegistry,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> meridian::Result<()> {
//! let schema = Schema::new([FieldSchema::text("body")])?;
//! let mut builder = MemorySegmentBuilder::new(schema.clone());
//! builder.add(DocumentDraft::new().text("body", "hello world"))?;
//!
//! let mut searcher = Searcher::new(
//!     schema.clone(),
//!     Arc::new(FieldValueCache::new()),
//!     Arc::new(StrategyRegistry::new()),
//! );
//! searcher.add_segment(Arc::new(builder.build()));
//!
//! let query = RankQuery::builder()
//!     .field("body", 1.0)
//!     .term("hello")
//!     .build(&schema)?;
//! let results = searcher.search(&query, &SearchOptions::default())?;
//! assert_eq!(results.hits.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! Query compilation, shard routing, cross-shard merging, ingestion and
//! transport all live outside this crate; segments reach the engine
//! through the [`meridian_segment::SegmentReader`] trait.

// Re-export the public API of the member crates
pub use meridian_core::*;
pub use meridian_scoring::*;
pub use meridian_segment::{
    DecodedColumn, DocumentDraft, FieldValueCache, MemorySegment, MemorySegmentBuilder, Postings,
    SegmentEvents, SegmentReader,
};
