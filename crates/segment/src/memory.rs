//! In-memory reference segment
//!
//! A schema-validated, build-once segment used by tests and embedded
//! deployments. Text fields are tokenized into positional posting lists;
//! column values are encoded to the same byte layout a persistent segment
//! would serve, so the decode path through `FieldValueCache` is exercised
//! for real.

use crate::column::encode_values;
use crate::{Postings, SegmentReader};
use meridian_core::{DocId, Error, FieldType, FieldValue, Result, Schema, SegmentId};
use std::collections::HashMap;
use std::sync::Arc;

/// Tokenize text into terms with their token positions
///
/// Lowercases and splits on non-alphanumeric characters. Every non-empty
/// token keeps its index as its position, so adjacency of positions mirrors
/// adjacency in the source text.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// One document being added to a builder
#[derive(Debug, Default)]
pub struct DocumentDraft {
    fields: Vec<(String, Vec<FieldValue>)>,
}

impl DocumentDraft {
    /// Create an empty draft
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a text field value
    pub fn text(self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.value(field, FieldValue::Str(text.into()))
    }

    /// Set a scalar field value
    pub fn value(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push((field.into(), vec![value]));
        self
    }

    /// Set a multi-valued field
    pub fn values(mut self, field: impl Into<String>, values: Vec<FieldValue>) -> Self {
        self.fields.push((field.into(), values));
        self
    }
}

#[derive(Debug, Clone)]
struct PostingEntry {
    doc: DocId,
    freq: u32,
    positions: Vec<u32>,
}

/// Builder for [`MemorySegment`]
#[derive(Debug)]
pub struct MemorySegmentBuilder {
    schema: Schema,
    doc_count: u32,
    postings: HashMap<(String, String), Vec<PostingEntry>>,
    columns: HashMap<String, HashMap<DocId, Vec<u8>>>,
}

impl MemorySegmentBuilder {
    /// Create a builder for the given schema
    pub fn new(schema: Schema) -> Self {
        MemorySegmentBuilder {
            schema,
            doc_count: 0,
            postings: HashMap::new(),
            columns: HashMap::new(),
        }
    }

    /// Add a document, validating it against the schema
    ///
    /// # Errors
    /// - `FieldNotFound` for an undeclared field
    /// - `FieldTypeMismatch` for a wrong value type, multiple values on a
    ///   single-valued field, or values exceeding the encoded layout's
    ///   limits
    pub fn add(&mut self, draft: DocumentDraft) -> Result<DocId> {
        let doc = self.doc_count;
        for (field, values) in &draft.fields {
            let spec = self.schema.require(field)?.clone();
            for value in values {
                if value.field_type() != spec.field_type {
                    return Err(Error::type_mismatch(
                        field,
                        spec.field_type.to_string(),
                        value.field_type(),
                    ));
                }
            }
            if !spec.multi_valued && values.len() > 1 {
                return Err(Error::type_mismatch(
                    field,
                    "single value",
                    spec.field_type,
                ));
            }
            // the encoded layout carries a u16 count and u32 string lengths
            if values.len() > u16::MAX as usize {
                return Err(Error::type_mismatch(
                    field,
                    format!("at most {} values", u16::MAX),
                    spec.field_type,
                ));
            }
            if values
                .iter()
                .filter_map(FieldValue::as_str)
                .any(|s| s.len() > u32::MAX as usize)
            {
                return Err(Error::type_mismatch(
                    field,
                    "string under 4 GiB",
                    spec.field_type,
                ));
            }
            if spec.indexed && spec.field_type == FieldType::Str {
                self.index_text(field, doc, values);
            }
            if spec.has_column_values {
                self.columns
                    .entry(field.clone())
                    .or_default()
                    .insert(doc, encode_values(values));
            }
        }
        self.doc_count += 1;
        Ok(doc)
    }

    fn index_text(&mut self, field: &str, doc: DocId, values: &[FieldValue]) {
        let mut term_positions: HashMap<String, Vec<u32>> = HashMap::new();
        let mut position = 0u32;
        for value in values {
            let Some(text) = value.as_str() else { continue };
            for token in tokenize(text) {
                term_positions.entry(token).or_default().push(position);
                position += 1;
            }
        }
        for (term, positions) in term_positions {
            self.postings
                .entry((field.to_string(), term))
                .or_default()
                .push(PostingEntry {
                    doc,
                    freq: positions.len() as u32,
                    positions,
                });
        }
    }

    /// Finish the segment with a fresh identity
    pub fn build(self) -> MemorySegment {
        self.build_with_id(SegmentId::next())
    }

    /// Finish the segment with an explicit identity
    pub fn build_with_id(self, id: SegmentId) -> MemorySegment {
        // Materialize one encoded row per document so readers never see
        // a gap for docs that omitted the field.
        let empty = encode_values(&[]);
        let columns = self
            .columns
            .into_iter()
            .map(|(field, mut rows)| {
                let full: Vec<Vec<u8>> = (0..self.doc_count)
                    .map(|doc| rows.remove(&doc).unwrap_or_else(|| empty.clone()))
                    .collect();
                (field, full)
            })
            .collect();
        MemorySegment {
            id,
            doc_count: self.doc_count,
            postings: self
                .postings
                .into_iter()
                .map(|(key, entries)| (key, Arc::new(entries)))
                .collect(),
            columns,
        }
    }
}

/// Immutable in-memory segment
#[derive(Debug)]
pub struct MemorySegment {
    id: SegmentId,
    doc_count: u32,
    postings: HashMap<(String, String), Arc<Vec<PostingEntry>>>,
    columns: HashMap<String, Vec<Vec<u8>>>,
}

impl SegmentReader for MemorySegment {
    fn segment_id(&self) -> SegmentId {
        self.id
    }

    fn doc_count(&self) -> u32 {
        self.doc_count
    }

    fn postings(&self, field: &str, term: &str) -> Option<Box<dyn Postings>> {
        let entries = self
            .postings
            .get(&(field.to_string(), term.to_string()))?
            .clone();
        Some(Box::new(MemoryPostings { entries, cursor: None }))
    }

    fn doc_freq(&self, field: &str, term: &str) -> u32 {
        self.postings
            .get(&(field.to_string(), term.to_string()))
            .map_or(0, |entries| entries.len() as u32)
    }

    fn total_term_freq(&self, field: &str, term: &str) -> u64 {
        self.postings
            .get(&(field.to_string(), term.to_string()))
            .map_or(0, |entries| entries.iter().map(|e| e.freq as u64).sum())
    }

    fn field_bytes(&self, field: &str, doc: DocId) -> Option<&[u8]> {
        self.columns
            .get(field)
            .and_then(|rows| rows.get(doc as usize))
            .map(Vec::as_slice)
    }
}

struct MemoryPostings {
    entries: Arc<Vec<PostingEntry>>,
    cursor: Option<usize>,
}

impl MemoryPostings {
    fn current(&self) -> Option<&PostingEntry> {
        self.cursor.and_then(|i| self.entries.get(i))
    }
}

impl Postings for MemoryPostings {
    fn next(&mut self) -> bool {
        let next = self.cursor.map_or(0, |i| i + 1);
        self.cursor = Some(next);
        next < self.entries.len()
    }

    fn doc(&self) -> DocId {
        self.current().map_or(0, |e| e.doc)
    }

    fn freq(&self) -> u32 {
        self.current().map_or(0, |e| e.freq)
    }

    fn positions(&self) -> &[u32] {
        self.current().map_or(&[], |e| e.positions.as_slice())
    }
}
