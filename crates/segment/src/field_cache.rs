//! Per-segment decoded column cache
//!
//! Columns are decoded lazily, once per (segment, field), and shared
//! read-only across every concurrent request touching that segment. The
//! compute-once placeholder is a `once_cell::sync::OnceCell` stored in a
//! `DashMap`: racing first readers block on the cell, exactly one performs
//! the decode.
//!
//! Eviction is driven solely by segment close notifications and is scoped
//! to the closing segment's identity. A decode that completes after its
//! cell was evicted finishes into an orphaned cell the map no longer
//! references; the result is dropped with the last handle, never
//! re-inserted.
//!
//! The cache also hosts strategy-registered derived caches (arbitrary
//! per-segment side tables combining several fields) with the same
//! build-once / evict-on-close lifecycle.

use crate::column::{decode_values, DecodedColumn};
use crate::events::SegmentEvents;
use crate::SegmentReader;
use meridian_core::{Error, FieldSchema, Result, Schema, SegmentId};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

type ColumnKey = (SegmentId, String);
type ColumnCell = Arc<OnceCell<Arc<DecodedColumn>>>;
type DerivedValue = Arc<dyn Any + Send + Sync>;
type DerivedCell = Arc<OnceCell<DerivedValue>>;

/// Segment-scoped cache of decoded columns and derived side tables
#[derive(Default)]
pub struct FieldValueCache {
    columns: dashmap::DashMap<ColumnKey, ColumnCell>,
    derived: dashmap::DashMap<ColumnKey, DerivedCell>,
    decode_invocations: AtomicU64,
}

impl FieldValueCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire this cache to a close-notification hub
    ///
    /// The subscription holds a weak handle; dropping the cache does not
    /// keep it alive through the hub.
    pub fn subscribe(self: &Arc<Self>, events: &SegmentEvents) {
        let weak: Weak<FieldValueCache> = Arc::downgrade(self);
        events.on_close(move |segment| {
            if let Some(cache) = weak.upgrade() {
                cache.evict_segment(segment);
            }
        });
    }

    /// Decoded column for (segment, field), building it on first access
    ///
    /// # Errors
    /// `FieldNotFound` if the schema does not declare the field or the
    /// field carries no column values. Per-document decode failures never
    /// surface here; the affected documents degrade to empty values.
    pub fn column(
        &self,
        reader: &dyn SegmentReader,
        schema: &Schema,
        field: &str,
    ) -> Result<Arc<DecodedColumn>> {
        let spec = schema.require(field)?;
        if !spec.has_column_values {
            return Err(Error::FieldNotFound(format!(
                "{field} has no column values"
            )));
        }
        let key = (reader.segment_id(), field.to_string());
        // Clone the cell out so the map shard lock is not held across the
        // decode; racing readers rendezvous on the OnceCell instead.
        let cell: ColumnCell = self
            .columns
            .entry(key)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        let column = cell.get_or_init(|| {
            self.decode_invocations.fetch_add(1, Ordering::Relaxed);
            Arc::new(self.decode_column(reader, spec))
        });
        Ok(Arc::clone(column))
    }

    fn decode_column(&self, reader: &dyn SegmentReader, spec: &FieldSchema) -> DecodedColumn {
        let segment = reader.segment_id();
        debug!(%segment, field = %spec.name, docs = reader.doc_count(), "decoding column");
        let rows = (0..reader.doc_count())
            .map(|doc| match reader.field_bytes(&spec.name, doc) {
                None => Vec::new(),
                Some(bytes) => match decode_values(spec.field_type, bytes) {
                    Ok(values) => values,
                    Err(err) => {
                        warn!(%segment, field = %spec.name, doc, %err, "malformed column value, treating as missing");
                        Vec::new()
                    }
                },
            })
            .collect();
        DecodedColumn::new(spec, rows)
    }

    /// Derived side table for (segment, key), building it on first access
    ///
    /// `key` must be stable across requests (a strategy identity plus a
    /// cache name); it is what makes the memoization shared. The builder
    /// runs at most once per live (segment, key).
    pub fn derived(
        &self,
        segment: SegmentId,
        key: &str,
        build: impl FnOnce() -> Result<DerivedValue>,
    ) -> Result<DerivedValue> {
        let cell: DerivedCell = self
            .derived
            .entry((segment, key.to_string()))
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        let value = cell.get_or_try_init(build)?;
        Ok(Arc::clone(value))
    }

    /// Drop every entry owned by the closing segment
    ///
    /// Other segments' entries are untouched. Called exactly once per
    /// segment via the close notification.
    pub fn evict_segment(&self, segment: SegmentId) {
        // Count inside the retain passes; differencing map lengths would
        // race with concurrent inserts for other segments.
        let mut evicted = 0usize;
        self.columns.retain(|(owner, _), _| {
            let keep = *owner != segment;
            evicted += usize::from(!keep);
            keep
        });
        self.derived.retain(|(owner, _), _| {
            let keep = *owner != segment;
            evicted += usize::from(!keep);
            keep
        });
        debug!(%segment, evicted, "evicted segment cache entries");
    }

    /// Number of column decodes performed so far
    ///
    /// Exposed for cache-correctness verification: repeated reads of a
    /// cached column must not move this counter.
    pub fn decode_invocations(&self) -> u64 {
        self.decode_invocations.load(Ordering::Relaxed)
    }

    /// Number of live column entries (across all segments)
    pub fn column_entries(&self) -> usize {
        self.columns.len()
    }
}

impl std::fmt::Debug for FieldValueCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldValueCache")
            .field("columns", &self.columns.len())
            .field("derived", &self.derived.len())
            .field("decode_invocations", &self.decode_invocations())
            .finish()
    }
}
