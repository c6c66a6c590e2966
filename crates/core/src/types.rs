//! Core identifier and value types for the scoring engine
//!
//! This module defines the foundational types:
//! - DocId / Score: per-segment document identifier and relevance score
//! - SegmentId: stable identity of an immutable index segment
//! - FieldType / FieldValue: the column-value type system

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Document identifier, local to a single segment
pub type DocId = u32;

/// Relevance score assigned to a matched document
pub type Score = f32;

/// Stable identity of an immutable index segment
///
/// A SegmentId is assigned once when the segment is opened and never reused,
/// even if a later segment covers the same documents after a merge. Cache
/// entries are keyed by SegmentId, which is what makes close-scoped eviction
/// safe while other segments stay live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(u64);

impl SegmentId {
    /// Create a SegmentId from a raw value
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Allocate a fresh SegmentId from a process-wide counter
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw value of this SegmentId
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seg-{}", self.0)
    }
}

/// Globally addressable document: segment identity + local doc id
///
/// Mapping a DocAddress to a stable external document id is the caller's
/// concern; the engine only reports where the hit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocAddress {
    /// Segment the document lives in
    pub segment: SegmentId,
    /// Document id within that segment
    pub doc: DocId,
}

impl DocAddress {
    /// Create a new document address
    pub fn new(segment: SegmentId, doc: DocId) -> Self {
        Self { segment, doc }
    }
}

/// Declared type of a field's column values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// UTF-8 string
    Str,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Int => "int",
            FieldType::Long => "long",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Str => "string",
        };
        write!(f, "{}", name)
    }
}

/// A single decoded column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// UTF-8 string
    Str(String),
}

impl FieldValue {
    /// The declared type this value belongs to
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Int(_) => FieldType::Int,
            FieldValue::Long(_) => FieldType::Long,
            FieldValue::Float(_) => FieldType::Float,
            FieldValue::Double(_) => FieldType::Double,
            FieldValue::Str(_) => FieldType::Str,
        }
    }

    /// Widening numeric view, None for strings
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Long(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v as f64),
            FieldValue::Double(v) => Some(*v),
            FieldValue::Str(_) => None,
        }
    }

    /// Widening integer view, None for floats and strings
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v as i64),
            FieldValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// String view, None for numeric values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_id_next_is_unique() {
        let a = SegmentId::next();
        let b = SegmentId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_segment_id_display() {
        let id = SegmentId::from_raw(7);
        assert_eq!(id.to_string(), "seg-7");
    }

    #[test]
    fn test_field_value_type() {
        assert_eq!(FieldValue::Int(1).field_type(), FieldType::Int);
        assert_eq!(FieldValue::Str("x".into()).field_type(), FieldType::Str);
    }

    #[test]
    fn test_field_value_widening() {
        assert_eq!(FieldValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(FieldValue::Long(-2).as_i64(), Some(-2));
        assert_eq!(FieldValue::Float(0.5).as_i64(), None);
        assert_eq!(FieldValue::Str("a".into()).as_f64(), None);
        assert_eq!(FieldValue::Str("a".into()).as_str(), Some("a"));
    }
}
