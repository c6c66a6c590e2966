//! K-way merge scan over the match matrix
//!
//! A binary min-heap orders every present cell by its current docID. Each
//! round drains all cells positioned on the smallest docID, snapshots them
//! into the matrix, counts the distinct term indices hit, and applies the
//! match policy. Disqualified documents are skipped by looping; nothing is
//! ever revisited and documents come out in strictly increasing docID
//! order.
//!
//! Heap cost is O(log M) per operation for M = field×term cells; a full
//! scan is O(N log M) over N total postings. Ties between co-equal-doc
//! cells drain in heap order, which is not guaranteed stable by term
//! index.

use crate::matrix::MatchedInfoMatrix;
use crate::query::MatchPolicy;
use meridian_core::DocId;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::trace;

/// Produces qualifying documents from a match matrix
pub struct MergeScanner {
    matrix: MatchedInfoMatrix,
    /// Min-heap of (current doc, cell index) for non-exhausted cells
    heap: BinaryHeap<Reverse<(DocId, usize)>>,
    policy: MatchPolicy,
    /// Round stamps per term index, replacing a per-round set allocation
    term_stamp: Vec<u64>,
    round: u64,
}

impl MergeScanner {
    /// Prime every cell and heapify
    pub fn new(mut matrix: MatchedInfoMatrix, policy: MatchPolicy) -> Self {
        let mut heap = BinaryHeap::with_capacity(matrix.field_count() * matrix.term_count());
        for (idx, slot) in matrix.cells_mut().iter_mut().enumerate() {
            if let Some(cell) = slot {
                if cell.next() {
                    heap.push(Reverse((cell.doc(), idx)));
                }
            }
        }
        let term_count = matrix.term_count();
        MergeScanner {
            matrix,
            heap,
            policy,
            term_stamp: vec![0; term_count],
            round: 0,
        }
    }

    /// Matrix holding the snapshots for the most recent matched document
    pub fn matrix(&self) -> &MatchedInfoMatrix {
        &self.matrix
    }

    /// Advance to the next document qualifying under the match policy
    ///
    /// Returns None once every cell is exhausted. Scores are not computed
    /// here; the caller reads the matrix snapshot lazily.
    pub fn next_matched_doc(&mut self) -> Option<DocId> {
        loop {
            let Reverse((doc, _)) = *self.heap.peek()?;
            self.round += 1;
            let mut hits = 0usize;
            while let Some(&Reverse((current, idx))) = self.heap.peek() {
                if current != doc {
                    break;
                }
                self.heap.pop();
                let cell = self.matrix.cell_mut(idx);
                cell.save_matched_info();
                let term = cell.term();
                if self.term_stamp[term] != self.round {
                    self.term_stamp[term] = self.round;
                    hits += 1;
                }
                if cell.next() {
                    self.heap.push(Reverse((cell.doc(), idx)));
                }
            }
            if self.policy.qualifies(hits, self.matrix.term_count()) {
                trace!(doc, hits, "document qualified");
                self.matrix.set_current_doc(doc);
                return Some(doc);
            }
            trace!(doc, hits, "document skipped by match policy");
        }
    }
}
