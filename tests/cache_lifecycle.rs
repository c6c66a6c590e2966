//! Field-value cache lifecycle across real searches
//!
//! Exercises the decoded-column and derived caches through the searcher:
//! compute-once behavior over repeated requests, close-driven eviction
//! scoped to the closing segment, and rebuild on next access.

use meridian::{
    DerivedValue, DocumentDraft, ExplainRecorder, FieldSchema, FieldType, FieldValue,
    FieldValueCache, MemorySegment, MemorySegmentBuilder, RankQuery, Result, Schema,
    ScoringStrategy, Score, SearchOptions, Searcher, SegmentEvents, SegmentReader,
    StrategyContext, StrategyFactory, StrategyRegistry,
};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn schema() -> Schema {
    Schema::new([
        FieldSchema::text("text"),
        FieldSchema::numeric("rating", FieldType::Double),
    ])
    .unwrap()
}

fn segment(ratings: &[f64]) -> MemorySegment {
    let mut builder = MemorySegmentBuilder::new(schema());
    for rating in ratings {
        builder
            .add(
                DocumentDraft::new()
                    .text("text", "hello")
                    .value("rating", FieldValue::Double(*rating)),
            )
            .unwrap();
    }
    builder.build()
}

/// Weighted sum plus the document's stored rating.
struct RatingBoostStrategy;

impl ScoringStrategy for RatingBoostStrategy {
    fn compute_score(
        &mut self,
        ctx: &StrategyContext<'_>,
        _explain: &mut ExplainRecorder,
    ) -> Result<Score> {
        let matrix = ctx.matrix();
        let mut total = ctx.base_score();
        for field in 0..matrix.field_count() {
            for term in 0..matrix.term_count() {
                total += matrix.get(field, term).score();
            }
        }
        let rating = ctx.field_values("rating")?.scalar_f64()?.unwrap_or(0.0);
        Ok(total + rating as f32)
    }
}

struct RatingBoostFactory;

impl StrategyFactory for RatingBoostFactory {
    fn name(&self) -> &str {
        "rating_boost"
    }
    fn create(&self, _params: &Map<String, Value>) -> Result<Box<dyn ScoringStrategy>> {
        Ok(Box::new(RatingBoostStrategy))
    }
}

fn query() -> RankQuery {
    RankQuery::builder()
        .field("text", 1.0)
        .term("hello")
        .strategy("rating_boost")
        .build(&schema())
        .unwrap()
}

fn registry() -> Arc<StrategyRegistry> {
    let registry = Arc::new(StrategyRegistry::new());
    registry.register(Arc::new(RatingBoostFactory)).unwrap();
    registry
}

#[test]
fn column_decoded_once_across_repeated_searches() {
    init_tracing();
    let cache = Arc::new(FieldValueCache::new());
    let mut searcher = Searcher::new(schema(), Arc::clone(&cache), registry());
    searcher.add_segment(Arc::new(segment(&[1.0, 5.0, 3.0])));

    for _ in 0..3 {
        let results = searcher.search(&query(), &SearchOptions::default()).unwrap();
        // rating dominates equal text scores
        let ranked: Vec<u32> = results.hits.iter().map(|h| h.address.doc).collect();
        assert_eq!(ranked, vec![1, 2, 0]);
    }
    assert_eq!(cache.decode_invocations(), 1);
    assert_eq!(cache.column_entries(), 1);
}

#[test]
fn close_notification_evicts_only_the_closed_segment() {
    init_tracing();
    let cache = Arc::new(FieldValueCache::new());
    let events = SegmentEvents::new();
    cache.subscribe(&events);

    let seg_a = Arc::new(segment(&[1.0]));
    let seg_b = Arc::new(segment(&[2.0]));
    let id_a = seg_a.segment_id();

    let mut searcher = Searcher::new(schema(), Arc::clone(&cache), registry());
    searcher.add_segment(Arc::clone(&seg_a) as _);
    searcher.add_segment(Arc::clone(&seg_b) as _);

    searcher.search(&query(), &SearchOptions::default()).unwrap();
    assert_eq!(cache.decode_invocations(), 2);
    assert_eq!(cache.column_entries(), 2);

    events.notify_close(id_a);
    assert_eq!(cache.column_entries(), 1);

    // with the closed segment removed, the survivor serves from cache
    searcher.remove_segment(id_a);
    let results = searcher.search(&query(), &SearchOptions::default()).unwrap();
    assert_eq!(results.hits.len(), 1);
    assert_eq!(cache.decode_invocations(), 2);
}

#[test]
fn evicted_segment_rebuilds_on_next_scan() {
    init_tracing();
    let cache = Arc::new(FieldValueCache::new());
    let events = SegmentEvents::new();
    cache.subscribe(&events);

    let seg_a = Arc::new(segment(&[1.0]));
    let seg_b = Arc::new(segment(&[2.0]));

    let mut searcher = Searcher::new(schema(), Arc::clone(&cache), registry());
    searcher.add_segment(Arc::clone(&seg_a) as _);
    searcher.add_segment(Arc::clone(&seg_b) as _);

    searcher.search(&query(), &SearchOptions::default()).unwrap();
    assert_eq!(cache.decode_invocations(), 2);

    // close notification without removing the reader: the next scan sees
    // the segment again and must pay one fresh decode, for it alone
    events.notify_close(seg_a.segment_id());
    searcher.search(&query(), &SearchOptions::default()).unwrap();
    assert_eq!(cache.decode_invocations(), 3);
}

/// Strategy that builds a per-segment derived table, counting builds.
struct SquaredRatingStrategy {
    builds: Arc<AtomicU64>,
}

impl ScoringStrategy for SquaredRatingStrategy {
    fn compute_score(
        &mut self,
        ctx: &StrategyContext<'_>,
        _explain: &mut ExplainRecorder,
    ) -> Result<Score> {
        let builds = Arc::clone(&self.builds);
        let rating = ctx.field_values("rating")?;
        let table = ctx.derived_cache("squared_ratings", || {
            builds.fetch_add(1, Ordering::Relaxed);
            let squared: Vec<f64> = rating
                .all()
                .iter()
                .filter_map(FieldValue::as_f64)
                .map(|r| r * r)
                .collect();
            Ok(Arc::new(squared) as DerivedValue)
        })?;
        let squared = table
            .downcast_ref::<Vec<f64>>()
            .map(|v| v.iter().sum::<f64>())
            .unwrap_or(0.0);
        Ok(squared as f32)
    }
}

struct SquaredRatingFactory {
    builds: Arc<AtomicU64>,
}

impl StrategyFactory for SquaredRatingFactory {
    fn name(&self) -> &str {
        "squared_rating"
    }
    fn create(&self, _params: &Map<String, Value>) -> Result<Box<dyn ScoringStrategy>> {
        Ok(Box::new(SquaredRatingStrategy {
            builds: Arc::clone(&self.builds),
        }))
    }
}

#[test]
fn derived_cache_shares_lifecycle_with_columns() {
    init_tracing();
    let builds = Arc::new(AtomicU64::new(0));
    let registry = Arc::new(StrategyRegistry::new());
    registry
        .register(Arc::new(SquaredRatingFactory {
            builds: Arc::clone(&builds),
        }))
        .unwrap();

    let cache = Arc::new(FieldValueCache::new());
    let events = SegmentEvents::new();
    cache.subscribe(&events);

    let seg_a = Arc::new(segment(&[2.0]));
    let seg_b = Arc::new(segment(&[3.0]));
    let mut searcher = Searcher::new(schema(), Arc::clone(&cache), registry);
    searcher.add_segment(Arc::clone(&seg_a) as _);
    searcher.add_segment(Arc::clone(&seg_b) as _);

    let query = RankQuery::builder()
        .field("text", 1.0)
        .term("hello")
        .strategy("squared_rating")
        .build(&schema())
        .unwrap();

    for _ in 0..2 {
        let results = searcher.search(&query, &SearchOptions::default()).unwrap();
        assert!((results.hits[0].score - 9.0).abs() < 1e-6);
    }
    // one derived build per segment, memoized across requests
    assert_eq!(builds.load(Ordering::Relaxed), 2);

    events.notify_close(seg_b.segment_id());
    searcher.search(&query, &SearchOptions::default()).unwrap();
    assert_eq!(builds.load(Ordering::Relaxed), 3);
}
