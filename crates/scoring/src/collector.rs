//! Top-K collection and early-termination estimation
//!
//! The collector keeps the best K hits in a min-heap; the estimator wraps
//! it with a scanned-document cap. Once the cap is reached the scan is
//! told to stop and the reported total becomes an extrapolation from the
//! density of matches over the docID span actually observed. Top-K
//! ordering is never affected; only the total is approximate.
//!
//! Documents are collected under a request-global ordinal (segment base +
//! local docID) so the density estimate spans every scanned segment.

use meridian_core::Score;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;

/// Request-global document ordinal
pub type GlobalDoc = u64;

/// One collected hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredHit {
    /// Request-global document ordinal
    pub doc: GlobalDoc,
    /// Strategy-assigned score
    pub score: Score,
}

impl Eq for ScoredHit {}

impl Ord for ScoredHit {
    fn cmp(&self, other: &Self) -> Ordering {
        // score ascending, ties broken toward keeping the lower doc
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.doc.cmp(&self.doc))
    }
}

impl PartialOrd for ScoredHit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Whether the scan should keep going after a collect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    /// Keep scanning
    Continue,
    /// Cap reached; stop the scan
    Stop,
}

/// Reported hit total, possibly extrapolated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalHits {
    /// Exact or estimated number of matching documents
    pub value: u64,
    /// True when the scan terminated early and `value` is extrapolated
    pub is_estimate: bool,
}

/// Bounded best-K hit collector
#[derive(Debug)]
pub struct TopKCollector {
    k: usize,
    /// Min-heap: the root is the weakest kept hit
    heap: BinaryHeap<std::cmp::Reverse<ScoredHit>>,
}

impl TopKCollector {
    /// Keep at most `k` hits
    pub fn new(k: usize) -> Self {
        TopKCollector {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    /// Offer a hit; weaker hits fall out once K is reached
    pub fn collect(&mut self, hit: ScoredHit) {
        if self.k == 0 {
            return;
        }
        if self.heap.len() < self.k {
            self.heap.push(std::cmp::Reverse(hit));
        } else if let Some(weakest) = self.heap.peek() {
            if hit > weakest.0 {
                self.heap.pop();
                self.heap.push(std::cmp::Reverse(hit));
            }
        }
    }

    /// Whether a hit with this score would enter the kept set right now
    ///
    /// Equal scores lose to already-kept hits, matching `collect` for the
    /// increasing doc ordinals a scan produces.
    pub fn is_competitive(&self, score: Score) -> bool {
        if self.k == 0 {
            return false;
        }
        if self.heap.len() < self.k {
            return true;
        }
        self.heap
            .peek()
            .map_or(true, |weakest| score > weakest.0.score)
    }

    /// Docs currently kept, in no particular order
    pub fn kept_docs(&self) -> impl Iterator<Item = GlobalDoc> + '_ {
        self.heap.iter().map(|r| r.0.doc)
    }

    /// Number of hits currently kept
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing was kept
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Hits ordered best-first
    pub fn into_sorted(self) -> Vec<ScoredHit> {
        let mut hits: Vec<ScoredHit> = self.heap.into_iter().map(|r| r.0).collect();
        hits.sort_by(|a, b| b.cmp(a));
        hits
    }
}

/// Top-K collector with a scanned-document cap and hit-total estimation
#[derive(Debug)]
pub struct EarlyTerminationEstimator {
    collector: TopKCollector,
    cap: Option<usize>,
    collected: u64,
    min_doc: GlobalDoc,
    max_doc: GlobalDoc,
    terminated: bool,
}

impl EarlyTerminationEstimator {
    /// Keep `k` hits; stop after `cap` matched documents (None = unbounded)
    pub fn new(k: usize, cap: Option<usize>) -> Self {
        EarlyTerminationEstimator {
            collector: TopKCollector::new(k),
            cap,
            collected: 0,
            min_doc: GlobalDoc::MAX,
            max_doc: 0,
            terminated: false,
        }
    }

    /// Collect one matched document and report whether to continue
    pub fn collect(&mut self, doc: GlobalDoc, score: Score) -> ScanControl {
        self.collected += 1;
        self.min_doc = self.min_doc.min(doc);
        self.max_doc = self.max_doc.max(doc);
        self.collector.collect(ScoredHit { doc, score });
        match self.cap {
            Some(cap) if self.collected >= cap as u64 => {
                if !self.terminated {
                    debug!(cap, "scan cap reached, terminating early");
                }
                self.terminated = true;
                ScanControl::Stop
            }
            _ => ScanControl::Continue,
        }
    }

    /// Flag the scan as cut short (deadline or external cancellation)
    ///
    /// Uses the same signal as the cap: collected hits stay valid, the
    /// total becomes an estimate.
    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    /// Whether the scan stopped before seeing every candidate
    pub fn terminated(&self) -> bool {
        self.terminated
    }

    /// Whether a hit with this score would enter the top-K right now
    pub fn is_competitive(&self, score: Score) -> bool {
        self.collector.is_competitive(score)
    }

    /// Docs currently kept in the top-K
    pub fn kept_docs(&self) -> impl Iterator<Item = GlobalDoc> + '_ {
        self.collector.kept_docs()
    }

    /// Exact or extrapolated total over `total_docs` scanned documents
    ///
    /// When terminated early: `round(total_docs × collected / span)` with
    /// span = maxMatchedDoc − minMatchedDoc + 1.
    pub fn total_hits(&self, total_docs: u64) -> TotalHits {
        if !self.terminated {
            return TotalHits {
                value: self.collected,
                is_estimate: false,
            };
        }
        if self.collected == 0 {
            return TotalHits {
                value: 0,
                is_estimate: true,
            };
        }
        let span = self.max_doc - self.min_doc + 1;
        let ratio = self.collected as f64 / span as f64;
        TotalHits {
            value: (total_docs as f64 * ratio).round() as u64,
            is_estimate: true,
        }
    }

    /// Finish, yielding hits best-first
    pub fn into_sorted(self) -> Vec<ScoredHit> {
        self.collector.into_sorted()
    }
}
