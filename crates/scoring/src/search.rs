//! Per-request search wiring
//!
//! One request runs single-threaded: for each live segment it builds cell
//! weights, assembles the match matrix, scans, and feeds qualifying
//! documents through the scoring strategy into the shared collector.
//! Concurrent requests share only the read-only segment caches.

use crate::collector::{EarlyTerminationEstimator, ScanControl, TotalHits};
use crate::matrix::MatchedInfoMatrix;
use crate::posting_match::PostingMatchIterator;
use crate::query::RankQuery;
use crate::scanner::MergeScanner;
use crate::strategy::{FieldLookup, StrategyRegistry};
use crate::weight::WeightBuilder;
use meridian_core::{DocAddress, Explanation, Result, Schema, Score, SegmentId};
use meridian_segment::{FieldValueCache, SegmentReader};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Per-request knobs
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Number of hits to return
    pub top_k: usize,
    /// Attach an explanation tree to every returned hit
    pub explain: bool,
    /// Stop after this many matched documents (None = scan everything)
    pub scan_cap: Option<usize>,
    /// Abort the scan at this instant, flagging the result approximate
    pub deadline: Option<Instant>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            top_k: 10,
            explain: false,
            scan_cap: None,
            deadline: None,
        }
    }
}

/// One returned hit
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Where the document lives
    pub address: DocAddress,
    /// Strategy-assigned score
    pub score: Score,
    /// Explanation tree when the request asked for one
    pub explanation: Option<Explanation>,
}

/// Ranked results of one request
#[derive(Debug, Clone)]
pub struct SearchResults {
    /// Best hits, highest score first
    pub hits: Vec<SearchHit>,
    /// Exact or extrapolated number of matching documents
    pub total_hits: TotalHits,
}

/// Executes ranked queries over a set of live segments
///
/// The searcher holds reader handles for the segments a request may scan;
/// segment lifecycle (open/close, reference counting) is owned outside.
pub struct Searcher {
    schema: Schema,
    segments: Vec<Arc<dyn SegmentReader>>,
    cache: Arc<FieldValueCache>,
    registry: Arc<StrategyRegistry>,
}

impl Searcher {
    /// Create a searcher over no segments yet
    pub fn new(schema: Schema, cache: Arc<FieldValueCache>, registry: Arc<StrategyRegistry>) -> Self {
        Searcher {
            schema,
            segments: Vec::new(),
            cache,
            registry,
        }
    }

    /// Add a live segment to scan
    pub fn add_segment(&mut self, segment: Arc<dyn SegmentReader>) {
        self.segments.push(segment);
    }

    /// Drop a closed segment's reader handle
    ///
    /// Cache eviction happens separately via the close notification; this
    /// only stops future requests from scanning the segment.
    pub fn remove_segment(&mut self, id: SegmentId) {
        self.segments.retain(|s| s.segment_id() != id);
    }

    /// Schema this searcher validates against
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Run one ranked query
    ///
    /// # Errors
    /// `QueryConstruction` for an unknown strategy or bad parameters,
    /// `ScoringFailure` if the strategy fails (no partial results are
    /// returned in that case).
    pub fn search(&self, query: &RankQuery, options: &SearchOptions) -> Result<SearchResults> {
        // Strategy resolution fails fast, before any segment is touched.
        let mut harness = self.registry.create(query.strategy(), query.params())?;
        let identity = harness.identity().to_string();
        let mut estimator = EarlyTerminationEstimator::new(options.top_k, options.scan_cap);
        let mut explanations: FxHashMap<u64, Explanation> = FxHashMap::default();

        // (base ordinal, segment id) for mapping global ordinals back
        let mut bases: Vec<(u64, SegmentId)> = Vec::with_capacity(self.segments.len());
        let mut base = 0u64;
        let mut stopped = false;

        for segment in &self.segments {
            if stopped {
                break;
            }
            bases.push((base, segment.segment_id()));
            let mut weights = WeightBuilder::new(segment.as_ref(), query.global_idf_fields());
            let matrix = build_matrix(query, segment.as_ref(), &mut weights)?;
            let mut scanner = MergeScanner::new(matrix, query.policy());
            let lookup = FieldLookup::new(
                segment.as_ref(),
                &self.schema,
                &self.cache,
                &identity,
            );

            while let Some(doc) = scanner.next_matched_doc() {
                if options
                    .deadline
                    .is_some_and(|deadline| Instant::now() >= deadline)
                {
                    debug!(segment = %segment.segment_id(), "deadline hit, terminating scan");
                    estimator.terminate();
                    stopped = true;
                    break;
                }
                harness.prepare(doc, 0.0, options.explain)?;
                let score = harness.compute_score(scanner.matrix(), &lookup)?;
                let global = base + doc as u64;
                let competitive = options.explain && estimator.is_competitive(score);
                let control = estimator.collect(global, score);
                if competitive {
                    if let Some(explanation) = harness.take_explanation() {
                        explanations.insert(global, explanation);
                        // displaced hits leave stale entries behind; compact
                        // against the kept set once the side table doubles
                        // the heap
                        if explanations.len() > options.top_k.max(8) * 2 {
                            let kept: FxHashSet<u64> = estimator.kept_docs().collect();
                            explanations.retain(|doc, _| kept.contains(doc));
                        }
                    }
                }
                if control == ScanControl::Stop {
                    stopped = true;
                    break;
                }
            }
            base += segment.doc_count() as u64;
        }

        let total_hits = estimator.total_hits(scanned_docs(&bases, &self.segments));
        let hits = estimator
            .into_sorted()
            .into_iter()
            .map(|hit| SearchHit {
                address: to_address(&bases, hit.doc),
                score: hit.score,
                explanation: explanations.remove(&hit.doc),
            })
            .collect();
        Ok(SearchResults { hits, total_hits })
    }
}

/// Total documents across the segments the scan entered
fn scanned_docs(bases: &[(u64, SegmentId)], segments: &[Arc<dyn SegmentReader>]) -> u64 {
    bases
        .iter()
        .map(|(_, id)| {
            segments
                .iter()
                .find(|s| s.segment_id() == *id)
                .map_or(0, |s| s.doc_count() as u64)
        })
        .sum()
}

fn to_address(bases: &[(u64, SegmentId)], global: u64) -> DocAddress {
    let (base, id) = bases
        .iter()
        .rev()
        .find(|(base, _)| *base <= global)
        .copied()
        .expect("collected doc belongs to a scanned segment");
    DocAddress::new(id, (global - base) as u32)
}

/// Assemble the field×term matrix for one segment
fn build_matrix(
    query: &RankQuery,
    segment: &dyn SegmentReader,
    weights: &mut WeightBuilder<'_>,
) -> Result<MatchedInfoMatrix> {
    let mut cells: Vec<Option<PostingMatchIterator>> =
        Vec::with_capacity(query.fields().len() * query.terms().len());
    for (field_idx, field) in query.fields().iter().enumerate() {
        for (term_idx, term) in query.terms().iter().enumerate() {
            let weight = weights.cell_weight(&field.name, &term.text);
            let cell = segment.postings(&field.name, &term.text).map(|postings| {
                PostingMatchIterator::new(
                    postings,
                    field_idx,
                    term_idx,
                    weight.idf,
                    field.boost * term.boost,
                )
            });
            cells.push(cell);
        }
    }
    MatchedInfoMatrix::new(
        cells,
        query.fields().iter().map(|f| f.boost).collect(),
        query.terms().iter().map(|t| t.boost).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::MatchPolicy;
    use meridian_core::FieldSchema;
    use meridian_segment::{DocumentDraft, MemorySegmentBuilder};

    fn schema() -> Schema {
        Schema::new([FieldSchema::text("title"), FieldSchema::text("body")]).unwrap()
    }

    fn searcher_with(docs: &[(&str, &str)]) -> Searcher {
        let mut builder = MemorySegmentBuilder::new(schema());
        for (title, body) in docs {
            builder
                .add(DocumentDraft::new().text("title", *title).text("body", *body))
                .unwrap();
        }
        let mut searcher = Searcher::new(
            schema(),
            Arc::new(FieldValueCache::new()),
            Arc::new(StrategyRegistry::new()),
        );
        searcher.add_segment(Arc::new(builder.build()));
        searcher
    }

    #[test]
    fn test_search_ranks_by_weighted_sum() {
        let searcher = searcher_with(&[
            ("irrelevant", "nothing to see"),
            ("hello", "plain text"),
            ("hello", "hello again hello"),
        ]);
        let query = RankQuery::builder()
            .field("title", 1.0)
            .field("body", 1.0)
            .term("hello")
            .build(searcher.schema())
            .unwrap();
        let results = searcher.search(&query, &SearchOptions::default()).unwrap();
        assert_eq!(results.total_hits, TotalHits { value: 2, is_estimate: false });
        assert_eq!(results.hits[0].address.doc, 2);
        assert_eq!(results.hits[1].address.doc, 1);
        assert!(results.hits[0].score > results.hits[1].score);
    }

    #[test]
    fn test_unknown_strategy_fails_before_scan() {
        let searcher = searcher_with(&[("a", "b")]);
        let query = RankQuery::builder()
            .field("title", 1.0)
            .term("a")
            .strategy("missing_strategy")
            .build(searcher.schema())
            .unwrap();
        let err = searcher
            .search(&query, &SearchOptions::default())
            .unwrap_err();
        assert!(matches!(err, meridian_core::Error::QueryConstruction(_)));
    }

    #[test]
    fn test_explanations_attached_on_request() {
        let searcher = searcher_with(&[("hello", "world")]);
        let query = RankQuery::builder()
            .field("title", 1.0)
            .term("hello")
            .policy(MatchPolicy::Full)
            .build(searcher.schema())
            .unwrap();
        let options = SearchOptions {
            explain: true,
            ..Default::default()
        };
        let results = searcher.search(&query, &options).unwrap();
        let explanation = results.hits[0].explanation.as_ref().unwrap();
        assert!((explanation.value - results.hits[0].score).abs() < 1e-6);
        assert!(!explanation.children.is_empty());
    }

    #[test]
    fn test_explanations_survive_displacement_in_long_scans() {
        // ascending term frequency: every matched doc displaces the
        // current weakest kept hit
        let mut builder = MemorySegmentBuilder::new(schema());
        for i in 0..60 {
            let body = vec!["hello"; i + 1].join(" ");
            builder
                .add(DocumentDraft::new().text("title", "t").text("body", body))
                .unwrap();
        }
        let mut searcher = Searcher::new(
            schema(),
            Arc::new(FieldValueCache::new()),
            Arc::new(StrategyRegistry::new()),
        );
        searcher.add_segment(Arc::new(builder.build()));

        let query = RankQuery::builder()
            .field("body", 1.0)
            .term("hello")
            .build(searcher.schema())
            .unwrap();
        let options = SearchOptions {
            top_k: 3,
            explain: true,
            ..Default::default()
        };
        let results = searcher.search(&query, &options).unwrap();
        let docs: Vec<u32> = results.hits.iter().map(|h| h.address.doc).collect();
        assert_eq!(docs, vec![59, 58, 57]);
        for hit in &results.hits {
            let explanation = hit.explanation.as_ref().unwrap();
            assert!((explanation.value - hit.score).abs() < 1e-6);
        }
    }

    #[test]
    fn test_multi_segment_addresses() {
        let mut searcher = Searcher::new(
            schema(),
            Arc::new(FieldValueCache::new()),
            Arc::new(StrategyRegistry::new()),
        );
        for body in ["hello one", "hello two"] {
            let mut builder = MemorySegmentBuilder::new(schema());
            builder
                .add(DocumentDraft::new().text("title", "t").text("body", body))
                .unwrap();
            searcher.add_segment(Arc::new(builder.build()));
        }
        let query = RankQuery::builder()
            .field("body", 1.0)
            .term("hello")
            .build(searcher.schema())
            .unwrap();
        let results = searcher.search(&query, &SearchOptions::default()).unwrap();
        assert_eq!(results.hits.len(), 2);
        let segments: Vec<SegmentId> =
            results.hits.iter().map(|h| h.address.segment).collect();
        assert_ne!(segments[0], segments[1]);
        assert!(results.hits.iter().all(|h| h.address.doc == 0));
    }

    #[test]
    fn test_scan_cap_marks_estimate() {
        let docs: Vec<(&str, &str)> = (0..20).map(|_| ("x", "hello")).collect();
        let searcher = searcher_with(&docs);
        let query = RankQuery::builder()
            .field("body", 1.0)
            .term("hello")
            .build(searcher.schema())
            .unwrap();
        let options = SearchOptions {
            top_k: 3,
            scan_cap: Some(5),
            ..Default::default()
        };
        let results = searcher.search(&query, &options).unwrap();
        assert_eq!(results.hits.len(), 3);
        assert!(results.total_hits.is_estimate);
        // matched docs 0..=4, density 1.0 over the span, 20 docs total
        assert_eq!(results.total_hits.value, 20);
    }
}
