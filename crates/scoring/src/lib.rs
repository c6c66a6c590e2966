//! Meridian scoring engine
//!
//! The multi-field, multi-term relevance-scoring layer that sits above
//! plain boolean retrieval:
//! - `RankQuery` / `MatchPolicy`: validated query specification
//! - `PostingMatchIterator` + `MatchedInfoMatrix`: per-cell match state
//!   across the field×term grid
//! - `WeightBuilder`: per-cell IDF statistics, optionally global across a
//!   field set
//! - `MergeScanner`: k-way heap merge producing policy-qualified documents
//! - `ScoringStrategy` protocol, harness and registry: pluggable
//!   per-document scoring with explanations and derived caches
//! - `EarlyTerminationEstimator`: bounded-cost scans with extrapolated hit
//!   totals
//! - `Searcher`: per-request wiring across live segments

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collector;
pub mod matrix;
pub mod posting_match;
pub mod query;
pub mod scanner;
pub mod search;
pub mod strategy;
pub mod weight;

pub use collector::{EarlyTerminationEstimator, ScanControl, ScoredHit, TopKCollector, TotalHits};
pub use matrix::{MatchedCell, MatchedInfoMatrix};
pub use posting_match::PostingMatchIterator;
pub use query::{FieldSpec, MatchPolicy, RankQuery, RankQueryBuilder, TermSpec, DEFAULT_STRATEGY};
pub use scanner::MergeScanner;
pub use search::{SearchHit, SearchOptions, SearchResults, Searcher};
pub use strategy::{
    DerivedValue, DocValues, ExplainRecorder, FieldLookup, ScoringStrategy, StrategyContext,
    StrategyFactory, StrategyHarness, StrategyRegistry, StrategyState, WeightedSumStrategy,
};
pub use weight::{CellWeight, TermStats, WeightBuilder};
