//! Posting iterator with a frozen matched snapshot
//!
//! One `PostingMatchIterator` wraps the posting enumerator of a single
//! (field, term) cell. Forward iteration and the "matched" view are
//! deliberately separate: the merge scanner advances the raw iterator
//! eagerly while draining a doc from the heap, but only the snapshot taken
//! by `save_matched_info` counts as a match. This lets the scanner move an
//! iterator past a document before anything has qualified it.

use meridian_core::{DocId, Score};
use meridian_segment::Postings;
use smallvec::SmallVec;

/// BM25-style term-frequency saturation constant
const K1: f32 = 1.2;

type Positions = SmallVec<[u32; 8]>;

/// One cell of the field×term grid
pub struct PostingMatchIterator {
    postings: Box<dyn Postings>,
    field: usize,
    term: usize,
    /// IDF weight resolved by the WeightBuilder
    weight: f32,
    /// fieldBoost × termBoost, fixed for the query's lifetime
    boost: f32,

    // raw iterator state, buffered on every advance
    doc: DocId,
    freq: u32,
    positions: Positions,
    exhausted: bool,

    // frozen matched snapshot
    matched: bool,
    matched_doc: DocId,
    matched_freq: u32,
    matched_positions: Positions,
}

impl PostingMatchIterator {
    /// Wrap a posting enumerator for cell (field, term)
    pub fn new(postings: Box<dyn Postings>, field: usize, term: usize, weight: f32, boost: f32) -> Self {
        PostingMatchIterator {
            postings,
            field,
            term,
            weight,
            boost,
            doc: 0,
            freq: 0,
            positions: SmallVec::new(),
            exhausted: false,
            matched: false,
            matched_doc: 0,
            matched_freq: 0,
            matched_positions: SmallVec::new(),
        }
    }

    /// Field index of this cell
    pub fn field(&self) -> usize {
        self.field
    }

    /// Term index of this cell
    pub fn term(&self) -> usize {
        self.term
    }

    /// Advance the raw iterator, buffering freq and positions
    ///
    /// Returns false at exhaustion; the matched snapshot is unaffected.
    pub fn next(&mut self) -> bool {
        if !self.postings.next() {
            self.exhausted = true;
            return false;
        }
        self.doc = self.postings.doc();
        self.freq = self.postings.freq();
        self.positions.clear();
        self.positions.extend_from_slice(self.postings.positions());
        true
    }

    /// Document the raw iterator last advanced to
    pub fn doc(&self) -> DocId {
        self.doc
    }

    /// Whether the raw iterator has run out of documents
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Freeze the current doc/freq/positions as the matched snapshot
    pub fn save_matched_info(&mut self) {
        self.matched = true;
        self.matched_doc = self.doc;
        self.matched_freq = self.freq;
        self.matched_positions.clear();
        self.matched_positions.extend_from_slice(&self.positions);
    }

    /// Drop the matched snapshot
    pub fn clear_matched_info(&mut self) {
        self.matched = false;
        self.matched_freq = 0;
        self.matched_positions.clear();
    }

    /// Whether a snapshot exists for `doc`
    ///
    /// Reflects only `save_matched_info`, never raw iterator position: a
    /// snapshot left over from an earlier document does not count.
    pub fn is_matched(&self, doc: DocId) -> bool {
        self.matched && self.matched_doc == doc
    }

    /// Snapshot term frequency, 0 if not matched for `doc`
    pub fn matched_freq(&self, doc: DocId) -> u32 {
        if self.is_matched(doc) {
            self.matched_freq
        } else {
            0
        }
    }

    /// Snapshot positions, empty if not matched for `doc`
    pub fn matched_positions(&self, doc: DocId) -> &[u32] {
        if self.is_matched(doc) {
            &self.matched_positions
        } else {
            &[]
        }
    }

    /// Per-term similarity contribution for `doc`
    ///
    /// Exactly 0 when unmatched; otherwise IDF × saturated TF × boosts.
    pub fn score(&self, doc: DocId) -> Score {
        if !self.is_matched(doc) {
            return 0.0;
        }
        let tf = self.matched_freq as f32;
        let saturated = tf * (K1 + 1.0) / (tf + K1);
        self.weight * saturated * self.boost
    }
}

impl std::fmt::Debug for PostingMatchIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostingMatchIterator")
            .field("field", &self.field)
            .field("term", &self.term)
            .field("doc", &self.doc)
            .field("exhausted", &self.exhausted)
            .field("matched", &self.matched)
            .field("matched_doc", &self.matched_doc)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed posting sequence for unit tests
    struct FixedPostings {
        entries: Vec<(DocId, u32, Vec<u32>)>,
        cursor: Option<usize>,
    }

    impl FixedPostings {
        fn new(entries: Vec<(DocId, u32, Vec<u32>)>) -> Box<dyn Postings> {
            Box::new(FixedPostings {
                entries,
                cursor: None,
            })
        }
    }

    impl Postings for FixedPostings {
        fn next(&mut self) -> bool {
            let next = self.cursor.map_or(0, |i| i + 1);
            self.cursor = Some(next);
            next < self.entries.len()
        }
        fn doc(&self) -> DocId {
            self.entries[self.cursor.unwrap()].0
        }
        fn freq(&self) -> u32 {
            self.entries[self.cursor.unwrap()].1
        }
        fn positions(&self) -> &[u32] {
            &self.entries[self.cursor.unwrap()].2
        }
    }

    fn cell(entries: Vec<(DocId, u32, Vec<u32>)>) -> PostingMatchIterator {
        PostingMatchIterator::new(FixedPostings::new(entries), 0, 0, 1.0, 1.0)
    }

    #[test]
    fn test_advance_buffers_state() {
        let mut it = cell(vec![(2, 1, vec![4]), (5, 3, vec![0, 1, 2])]);
        assert!(it.next());
        assert_eq!(it.doc(), 2);
        assert!(it.next());
        assert_eq!(it.doc(), 5);
        assert!(!it.next());
        assert!(it.is_exhausted());
    }

    #[test]
    fn test_visit_without_match_scores_zero() {
        let mut it = cell(vec![(3, 2, vec![0, 7])]);
        it.next();
        // positioned on doc 3 but nothing saved yet
        assert!(!it.is_matched(3));
        assert_eq!(it.score(3), 0.0);
    }

    #[test]
    fn test_snapshot_survives_advance() {
        let mut it = cell(vec![(1, 2, vec![0, 3]), (9, 1, vec![5])]);
        it.next();
        it.save_matched_info();
        it.next();
        assert_eq!(it.doc(), 9);
        assert!(it.is_matched(1));
        assert_eq!(it.matched_freq(1), 2);
        assert_eq!(it.matched_positions(1), &[0, 3]);
        // snapshot is for doc 1, not for the doc the iterator sits on
        assert!(!it.is_matched(9));
        assert_eq!(it.score(9), 0.0);
    }

    #[test]
    fn test_clear_matched_info() {
        let mut it = cell(vec![(1, 1, vec![0])]);
        it.next();
        it.save_matched_info();
        assert!(it.is_matched(1));
        it.clear_matched_info();
        assert!(!it.is_matched(1));
        assert_eq!(it.score(1), 0.0);
    }

    #[test]
    fn test_score_scales_with_boosts() {
        let mut plain = PostingMatchIterator::new(
            FixedPostings::new(vec![(0, 1, vec![0])]),
            0,
            0,
            0.5,
            1.0,
        );
        let mut boosted = PostingMatchIterator::new(
            FixedPostings::new(vec![(0, 1, vec![0])]),
            0,
            0,
            0.5,
            2.0,
        );
        plain.next();
        plain.save_matched_info();
        boosted.next();
        boosted.save_matched_info();
        let base = plain.score(0);
        assert!(base > 0.0);
        assert!((boosted.score(0) - base * 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_score_saturates_with_freq() {
        let mut once = cell(vec![(0, 1, vec![0])]);
        let mut many = cell(vec![(0, 100, (0..100).collect())]);
        once.next();
        once.save_matched_info();
        many.next();
        many.save_matched_info();
        assert!(many.score(0) > once.score(0));
        // saturation bounds the gain well under 100x
        assert!(many.score(0) < once.score(0) * (K1 + 1.0));
    }
}
