//! Field×term match-state grid
//!
//! The matrix holds one `PostingMatchIterator` per (field, term) cell plus
//! the per-field and per-term boost vectors. Dimensions are fixed at
//! construction for the query's lifetime. The merge scanner mutates cells
//! while draining the heap; during scoring the matrix is read-only and
//! `get` exposes each cell's matched snapshot relative to the document
//! currently under scoring.
//!
//! A cell whose (field, term) pair has no postings in this segment is
//! simply absent; its view is permanently unmatched with score 0.

use crate::posting_match::PostingMatchIterator;
use meridian_core::{DocId, Error, Result, Score};

/// Fixed grid of match state for one segment's scan
pub struct MatchedInfoMatrix {
    /// Row-major [field][term]; None where the segment lacks the term
    cells: Vec<Option<PostingMatchIterator>>,
    field_count: usize,
    term_count: usize,
    field_boosts: Vec<f32>,
    term_boosts: Vec<f32>,
    current_doc: Option<DocId>,
}

impl MatchedInfoMatrix {
    /// Build a matrix; dimensions are fixed from here on
    ///
    /// # Errors
    /// `QueryConstruction` if either dimension is zero or the cell count
    /// disagrees with the dimensions.
    pub fn new(
        cells: Vec<Option<PostingMatchIterator>>,
        field_boosts: Vec<f32>,
        term_boosts: Vec<f32>,
    ) -> Result<Self> {
        let field_count = field_boosts.len();
        let term_count = term_boosts.len();
        if field_count == 0 || term_count == 0 {
            return Err(Error::query("match matrix must have at least one field and one term"));
        }
        if cells.len() != field_count * term_count {
            return Err(Error::query(format!(
                "match matrix expects {} cells, got {}",
                field_count * term_count,
                cells.len()
            )));
        }
        Ok(MatchedInfoMatrix {
            cells,
            field_count,
            term_count,
            field_boosts,
            term_boosts,
            current_doc: None,
        })
    }

    /// Number of fields (rows)
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    /// Number of terms (columns)
    pub fn term_count(&self) -> usize {
        self.term_count
    }

    /// Boost of a field row
    pub fn field_boost(&self, field: usize) -> f32 {
        self.field_boosts[field]
    }

    /// Boost of a term column
    pub fn term_boost(&self, term: usize) -> f32 {
        self.term_boosts[term]
    }

    /// Document the scanner is currently presenting for scoring
    pub fn current_doc(&self) -> Option<DocId> {
        self.current_doc
    }

    pub(crate) fn set_current_doc(&mut self, doc: DocId) {
        self.current_doc = Some(doc);
    }

    /// Snapshot view of cell (field, term) for the current document
    ///
    /// Out-of-range indices behave like an absent cell: permanently
    /// unmatched, score 0. Strategies with bad indices mis-score rather
    /// than take the process down.
    pub fn get(&self, field: usize, term: usize) -> MatchedCell<'_> {
        let cell = if field < self.field_count && term < self.term_count {
            self.cells[field * self.term_count + term].as_ref()
        } else {
            None
        };
        MatchedCell {
            cell,
            doc: self.current_doc,
        }
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Option<PostingMatchIterator>] {
        &mut self.cells
    }

    pub(crate) fn cell_mut(&mut self, index: usize) -> &mut PostingMatchIterator {
        self.cells[index]
            .as_mut()
            .expect("heap only holds present cells")
    }
}

impl std::fmt::Debug for MatchedInfoMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchedInfoMatrix")
            .field("field_count", &self.field_count)
            .field("term_count", &self.term_count)
            .field("current_doc", &self.current_doc)
            .finish()
    }
}

/// Read-only view of one cell's matched snapshot
#[derive(Clone, Copy)]
pub struct MatchedCell<'a> {
    cell: Option<&'a PostingMatchIterator>,
    doc: Option<DocId>,
}

impl MatchedCell<'_> {
    /// Whether this cell matched the current document
    pub fn is_matched(&self) -> bool {
        match (self.cell, self.doc) {
            (Some(cell), Some(doc)) => cell.is_matched(doc),
            _ => false,
        }
    }

    /// Snapshot term frequency, 0 when unmatched
    pub fn freq(&self) -> u32 {
        match (self.cell, self.doc) {
            (Some(cell), Some(doc)) => cell.matched_freq(doc),
            _ => 0,
        }
    }

    /// Snapshot positions, empty when unmatched
    pub fn positions(&self) -> &[u32] {
        match (self.cell, self.doc) {
            (Some(cell), Some(doc)) => cell.matched_positions(doc),
            _ => &[],
        }
    }

    /// Cell score for the current document, exactly 0 when unmatched
    pub fn score(&self) -> Score {
        match (self.cell, self.doc) {
            (Some(cell), Some(doc)) => cell.score(doc),
            _ => 0.0,
        }
    }
}
