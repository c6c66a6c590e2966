//! Column value encoding and decoded columns
//!
//! Column values travel as opaque per-document byte blobs (`field_bytes` on
//! the segment reader). The wire layout is little-endian:
//!
//! ```text
//! u16 value_count, then value_count values:
//!   Int    -> i32
//!   Long   -> i64
//!   Float  -> f32
//!   Double -> f64
//!   Str    -> u32 byte_len + UTF-8 bytes
//! ```
//!
//! Scalar fields encode count 0 (missing) or 1. Decoding a malformed blob
//! degrades that one document to an empty value set instead of failing the
//! column build.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use meridian_core::{DocId, Error, FieldSchema, FieldType, FieldValue, Result};
use std::io::Read;

/// Encode one document's values for a field
///
/// The layout bounds a document to `u16::MAX` values and each string to
/// `u32::MAX` bytes; callers validate before encoding (the segment builder
/// rejects oversized documents at `add`).
pub fn encode_values(values: &[FieldValue]) -> Vec<u8> {
    debug_assert!(values.len() <= u16::MAX as usize);
    let mut out = Vec::with_capacity(2 + values.len() * 8);
    out.write_u16::<LittleEndian>(values.len() as u16)
        .expect("vec write is infallible");
    // writes into a Vec cannot fail
    for value in values {
        let write = match value {
            FieldValue::Int(v) => out.write_i32::<LittleEndian>(*v),
            FieldValue::Long(v) => out.write_i64::<LittleEndian>(*v),
            FieldValue::Float(v) => out.write_f32::<LittleEndian>(*v),
            FieldValue::Double(v) => out.write_f64::<LittleEndian>(*v),
            FieldValue::Str(s) => {
                let write = out.write_u32::<LittleEndian>(s.len() as u32);
                out.extend_from_slice(s.as_bytes());
                write
            }
        };
        write.expect("vec write is infallible");
    }
    out
}

/// Decode one document's values according to the declared field type
///
/// # Errors
/// Returns `Corruption` on a truncated or malformed blob. Callers building
/// whole columns catch this per document and degrade to an empty value set.
pub fn decode_values(field_type: FieldType, mut bytes: &[u8]) -> Result<Vec<FieldValue>> {
    let corrupt = |what: &str| Error::Corruption(format!("column blob: {what}"));
    let count = bytes
        .read_u16::<LittleEndian>()
        .map_err(|_| corrupt("missing value count"))?;
    let mut values = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let value = match field_type {
            FieldType::Int => FieldValue::Int(
                bytes
                    .read_i32::<LittleEndian>()
                    .map_err(|_| corrupt("truncated int"))?,
            ),
            FieldType::Long => FieldValue::Long(
                bytes
                    .read_i64::<LittleEndian>()
                    .map_err(|_| corrupt("truncated long"))?,
            ),
            FieldType::Float => FieldValue::Float(
                bytes
                    .read_f32::<LittleEndian>()
                    .map_err(|_| corrupt("truncated float"))?,
            ),
            FieldType::Double => FieldValue::Double(
                bytes
                    .read_f64::<LittleEndian>()
                    .map_err(|_| corrupt("truncated double"))?,
            ),
            FieldType::Str => {
                let len = bytes
                    .read_u32::<LittleEndian>()
                    .map_err(|_| corrupt("truncated string length"))?;
                let mut buf = vec![0u8; len as usize];
                bytes
                    .read_exact(&mut buf)
                    .map_err(|_| corrupt("truncated string body"))?;
                let s = String::from_utf8(buf).map_err(|_| corrupt("invalid utf-8"))?;
                FieldValue::Str(s)
            }
        };
        values.push(value);
    }
    Ok(values)
}

/// A fully decoded column: every document's values for one field
///
/// Immutable once built; shared read-only across concurrent requests for
/// the lifetime of the owning segment.
#[derive(Debug)]
pub struct DecodedColumn {
    field: String,
    field_type: FieldType,
    multi_valued: bool,
    /// One row per document in the segment; empty row = missing value
    rows: Vec<Vec<FieldValue>>,
}

impl DecodedColumn {
    /// Build a column from per-document rows
    pub fn new(schema: &FieldSchema, rows: Vec<Vec<FieldValue>>) -> Self {
        DecodedColumn {
            field: schema.name.clone(),
            field_type: schema.field_type,
            multi_valued: schema.multi_valued,
            rows,
        }
    }

    /// Field this column belongs to
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Declared value type
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Whether the field is declared multi-valued
    pub fn multi_valued(&self) -> bool {
        self.multi_valued
    }

    /// All values for a document; empty slice for missing or out of range
    pub fn values(&self, doc: DocId) -> &[FieldValue] {
        self.rows.get(doc as usize).map_or(&[], Vec::as_slice)
    }

    /// Scalar value for a document
    ///
    /// # Errors
    /// `FieldTypeMismatch` if the field is declared multi-valued. Missing
    /// values yield None, not an error.
    pub fn scalar(&self, doc: DocId) -> Result<Option<&FieldValue>> {
        if self.multi_valued {
            return Err(Error::type_mismatch(
                &self.field,
                "scalar value",
                self.field_type,
            ));
        }
        Ok(self.values(doc).first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::FieldSchema;

    #[test]
    fn test_roundtrip_scalar_long() {
        let bytes = encode_values(&[FieldValue::Long(42)]);
        let values = decode_values(FieldType::Long, &bytes).unwrap();
        assert_eq!(values, vec![FieldValue::Long(42)]);
    }

    #[test]
    fn test_roundtrip_multi_string() {
        let input = vec![FieldValue::Str("alpha".into()), FieldValue::Str("β".into())];
        let bytes = encode_values(&input);
        let values = decode_values(FieldType::Str, &bytes).unwrap();
        assert_eq!(values, input);
    }

    #[test]
    fn test_decode_truncated_is_corruption() {
        let mut bytes = encode_values(&[FieldValue::Double(1.5)]);
        bytes.truncate(5);
        let err = decode_values(FieldType::Double, &bytes).unwrap_err();
        assert!(matches!(err, Error::Corruption(_)));
    }

    #[test]
    fn test_decode_empty_count() {
        let bytes = encode_values(&[]);
        let values = decode_values(FieldType::Int, &bytes).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn test_column_missing_doc_is_empty() {
        let schema = FieldSchema::numeric("price", FieldType::Long);
        let column = DecodedColumn::new(&schema, vec![vec![FieldValue::Long(9)], vec![]]);
        assert_eq!(column.values(0), &[FieldValue::Long(9)]);
        assert!(column.values(1).is_empty());
        assert!(column.values(99).is_empty());
    }

    #[test]
    fn test_column_scalar_rejects_multi() {
        let schema = FieldSchema::text("tags").multi();
        let column = DecodedColumn::new(&schema, vec![vec![FieldValue::Str("a".into())]]);
        let err = column.scalar(0).unwrap_err();
        assert!(matches!(err, Error::FieldTypeMismatch { .. }));
    }
}
