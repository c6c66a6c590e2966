//! Per-cell similarity weights and global IDF
//!
//! For every (field, term) cell the builder resolves the IDF-relevant
//! statistics from the segment: locally by default, or — when the query
//! carries a global-IDF field set — as the maximum docFreq and maximum
//! totalTermFreq of the term text across that set. The global variant
//! intentionally makes the same term's contribution comparable regardless
//! of which field matched it.
//!
//! Statistics for an identical (field, term-text) pair are memoized per
//! query; duplicate terms never hit the segment twice.

use meridian_segment::SegmentReader;
use rustc_hash::FxHashMap;

/// Raw term statistics behind a cell's weight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermStats {
    /// Number of documents containing the term
    pub doc_freq: u32,
    /// Total occurrences of the term
    pub total_term_freq: u64,
}

/// Resolved weight for one cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellWeight {
    /// Inverse document frequency
    pub idf: f32,
    /// Statistics the IDF was derived from
    pub stats: TermStats,
}

/// Builds cell weights for one segment's scan
pub struct WeightBuilder<'a> {
    reader: &'a dyn SegmentReader,
    global_fields: Option<&'a [String]>,
    memo: FxHashMap<(String, String), TermStats>,
}

impl<'a> WeightBuilder<'a> {
    /// Create a builder; `global_fields` enables global IDF over that set
    pub fn new(reader: &'a dyn SegmentReader, global_fields: Option<&'a [String]>) -> Self {
        WeightBuilder {
            reader,
            global_fields,
            memo: FxHashMap::default(),
        }
    }

    /// Weight for cell (field, term)
    pub fn cell_weight(&mut self, field: &str, term: &str) -> CellWeight {
        let stats = self.stats(field, term);
        CellWeight {
            idf: self.idf(stats.doc_freq),
            stats,
        }
    }

    fn stats(&mut self, field: &str, term: &str) -> TermStats {
        // With global IDF the field component of the memo key collapses:
        // every cell of the same term text shares one entry.
        let memo_field = if self.global_fields.is_some() { "" } else { field };
        let key = (memo_field.to_string(), term.to_string());
        if let Some(stats) = self.memo.get(&key) {
            return *stats;
        }
        let stats = match self.global_fields {
            Some(fields) => {
                let mut doc_freq = 0;
                let mut total_term_freq = 0;
                for field in fields {
                    doc_freq = doc_freq.max(self.reader.doc_freq(field, term));
                    total_term_freq = total_term_freq.max(self.reader.total_term_freq(field, term));
                }
                TermStats {
                    doc_freq,
                    total_term_freq,
                }
            }
            None => TermStats {
                doc_freq: self.reader.doc_freq(field, term),
                total_term_freq: self.reader.total_term_freq(field, term),
            },
        };
        self.memo.insert(key, stats);
        stats
    }

    /// Smoothed IDF over this segment's document count
    fn idf(&self, doc_freq: u32) -> f32 {
        let n = self.reader.doc_count() as f32;
        let df = doc_freq as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }
}
