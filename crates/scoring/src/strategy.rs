//! Pluggable scoring strategies
//!
//! A strategy is the implementer-supplied per-document scoring procedure.
//! The engine drives it through a harness enforcing the protocol state
//! machine {Idle, Prepared, Scored}: `prepare(doc, base_score, explain)`
//! then `compute_score()`, the latter callable repeatedly for the same
//! document (once to rank, again to explain) and required to be
//! deterministic given unchanged underlying data.
//!
//! Strategies never execute arbitrary user code inside this core: they are
//! statically registered factories keyed by name. Whatever compiles or
//! loads them lives outside; the registry only needs a factory producing a
//! fresh instance per search and a stable name usable as a memoization
//! key for derived caches.

use crate::matrix::MatchedInfoMatrix;
use meridian_core::{DocId, Error, Explanation, FieldType, FieldValue, Result, Schema, Score};
use meridian_segment::{DecodedColumn, FieldValueCache, SegmentReader};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Value stored in a strategy-registered derived cache
pub type DerivedValue = Arc<dyn Any + Send + Sync>;

// ============================================================================
// Field access
// ============================================================================

/// Per-request access to a segment's column values
///
/// Lazily resolves columns through the shared [`FieldValueCache`]; the
/// strategy identity namespaces any derived caches it installs.
pub struct FieldLookup<'a> {
    reader: &'a dyn SegmentReader,
    schema: &'a Schema,
    cache: &'a FieldValueCache,
    identity: &'a str,
}

impl<'a> FieldLookup<'a> {
    /// Create a lookup for one segment's scan
    pub fn new(
        reader: &'a dyn SegmentReader,
        schema: &'a Schema,
        cache: &'a FieldValueCache,
        identity: &'a str,
    ) -> Self {
        FieldLookup {
            reader,
            schema,
            cache,
            identity,
        }
    }

    fn column(&self, field: &str) -> Result<Arc<DecodedColumn>> {
        self.cache.column(self.reader, self.schema, field)
    }

    fn derived(&self, name: &str, build: impl FnOnce() -> Result<DerivedValue>) -> Result<DerivedValue> {
        let key = format!("{}/{}", self.identity, name);
        self.cache.derived(self.reader.segment_id(), &key, build)
    }
}

/// Lazily resolved accessor for one document's values in one field
#[derive(Debug)]
pub struct DocValues {
    column: Arc<DecodedColumn>,
    doc: DocId,
}

impl DocValues {
    /// All values, empty when missing
    pub fn all(&self) -> &[FieldValue] {
        self.column.values(self.doc)
    }

    fn want_numeric(&self, expected: &str) -> Result<()> {
        match self.column.field_type() {
            FieldType::Str => Err(Error::type_mismatch(
                self.column.field(),
                expected,
                FieldType::Str,
            )),
            _ => Ok(()),
        }
    }

    /// Scalar integer value
    ///
    /// # Errors
    /// `FieldTypeMismatch` for a multi-valued field or a non-integer type.
    pub fn scalar_i64(&self) -> Result<Option<i64>> {
        match self.column.scalar(self.doc)? {
            None => Ok(None),
            Some(value) => value.as_i64().map(Some).ok_or_else(|| {
                Error::type_mismatch(self.column.field(), "integer", value.field_type())
            }),
        }
    }

    /// Scalar numeric value, widened to f64
    ///
    /// # Errors
    /// `FieldTypeMismatch` for a multi-valued field or a string type.
    pub fn scalar_f64(&self) -> Result<Option<f64>> {
        self.want_numeric("numeric")?;
        Ok(self.column.scalar(self.doc)?.and_then(FieldValue::as_f64))
    }

    /// Scalar string value
    ///
    /// # Errors
    /// `FieldTypeMismatch` for a multi-valued field or a numeric type.
    pub fn scalar_str(&self) -> Result<Option<&str>> {
        match self.column.scalar(self.doc)? {
            None => Ok(None),
            Some(value) => value.as_str().map(Some).ok_or_else(|| {
                Error::type_mismatch(self.column.field(), "string", value.field_type())
            }),
        }
    }

    /// All values widened to f64, skipping nothing
    ///
    /// # Errors
    /// `FieldTypeMismatch` if the field holds strings.
    pub fn f64_list(&self) -> Result<Vec<f64>> {
        self.want_numeric("numeric list")?;
        Ok(self.all().iter().filter_map(FieldValue::as_f64).collect())
    }
}

// ============================================================================
// Strategy context
// ============================================================================

/// Everything a strategy may read while scoring one document
pub struct StrategyContext<'a> {
    doc: DocId,
    base_score: Score,
    matrix: &'a MatchedInfoMatrix,
    fields: &'a FieldLookup<'a>,
}

impl StrategyContext<'_> {
    /// Document under scoring
    pub fn doc(&self) -> DocId {
        self.doc
    }

    /// Score handed in by the retrieval layer below
    pub fn base_score(&self) -> Score {
        self.base_score
    }

    /// Match state for this document
    pub fn matrix(&self) -> &MatchedInfoMatrix {
        self.matrix
    }

    /// Per-document accessor for a field's column values
    ///
    /// # Errors
    /// `FieldNotFound` for an undeclared field or one without column
    /// values.
    pub fn field_values(&self, field: &str) -> Result<DocValues> {
        Ok(DocValues {
            column: self.fields.column(field)?,
            doc: self.doc,
        })
    }

    /// Fetch-or-build a derived per-segment cache
    ///
    /// The builder runs at most once per (strategy, segment) and the
    /// result lives until the segment closes. Typical use: a combined
    /// per-document table over several columns.
    pub fn derived_cache(
        &self,
        name: &str,
        build: impl FnOnce() -> Result<DerivedValue>,
    ) -> Result<DerivedValue> {
        self.fields.derived(name, build)
    }
}

// ============================================================================
// Explanation recording
// ============================================================================

/// Records score explanations while a strategy computes
///
/// Every call is a no-op unless the request asked for explanations, so
/// strategies can record unconditionally.
pub struct ExplainRecorder {
    enabled: bool,
    done: Vec<Explanation>,
    open: Option<Explanation>,
}

impl ExplainRecorder {
    fn new(enabled: bool) -> Self {
        ExplainRecorder {
            enabled,
            done: Vec::new(),
            open: None,
        }
    }

    /// Whether explanations are being collected
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Open a field-contribution group
    pub fn begin_field(&mut self, description: impl Into<String>) {
        if !self.enabled {
            return;
        }
        self.close_open();
        self.open = Some(Explanation::leaf(description, 0.0));
    }

    /// Record a term contribution inside the open group (or at top level)
    pub fn record_term(&mut self, description: impl Into<String>, value: f32) {
        if !self.enabled {
            return;
        }
        let leaf = Explanation::leaf(description, value);
        match &mut self.open {
            Some(group) => group.push(leaf),
            None => self.done.push(leaf),
        }
    }

    /// Close the open group with its total value
    pub fn end_field(&mut self, value: f32) {
        if !self.enabled {
            return;
        }
        if let Some(mut group) = self.open.take() {
            group.value = value;
            self.done.push(group);
        }
    }

    /// Record a standalone contribution
    pub fn record(&mut self, description: impl Into<String>, value: f32) {
        if !self.enabled {
            return;
        }
        self.close_open();
        self.done.push(Explanation::leaf(description, value));
    }

    fn close_open(&mut self) {
        if let Some(group) = self.open.take() {
            self.done.push(group);
        }
    }

    fn into_root(mut self, identity: &str, total: Score) -> Option<Explanation> {
        if !self.enabled {
            return None;
        }
        self.close_open();
        Some(Explanation::node(
            format!("{identity} score"),
            total,
            self.done,
        ))
    }
}

// ============================================================================
// Strategy trait and harness
// ============================================================================

/// Implementer-supplied per-document scoring procedure
pub trait ScoringStrategy: Send {
    /// Compute the score for the context's document
    ///
    /// Must be deterministic given unchanged underlying data. Errors abort
    /// the whole request as `ScoringFailure`.
    fn compute_score(
        &mut self,
        ctx: &StrategyContext<'_>,
        explain: &mut ExplainRecorder,
    ) -> Result<Score>;
}

/// Produces one fresh strategy instance per search request
pub trait StrategyFactory: Send + Sync {
    /// Registered name; doubles as the derived-cache memoization identity
    fn name(&self) -> &str;

    /// Instantiate with the query's parameter bindings
    ///
    /// # Errors
    /// `QueryConstruction` for invalid parameters.
    fn create(&self, params: &Map<String, Value>) -> Result<Box<dyn ScoringStrategy>>;
}

/// Protocol states of a strategy within one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyState {
    /// No document prepared yet
    Idle,
    /// A document is prepared but not scored
    Prepared,
    /// The prepared document has been scored at least once
    Scored,
}

/// Drives one strategy instance through the protocol state machine
pub struct StrategyHarness {
    strategy: Box<dyn ScoringStrategy>,
    identity: String,
    state: StrategyState,
    doc: DocId,
    base_score: Score,
    explain: bool,
    explanation: Option<Explanation>,
}

impl std::fmt::Debug for StrategyHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyHarness")
            .field("identity", &self.identity)
            .field("state", &self.state)
            .field("doc", &self.doc)
            .field("base_score", &self.base_score)
            .field("explain", &self.explain)
            .field("explanation", &self.explanation)
            .finish_non_exhaustive()
    }
}

impl StrategyHarness {
    /// Wrap a freshly created strategy
    pub fn new(strategy: Box<dyn ScoringStrategy>, identity: String) -> Self {
        StrategyHarness {
            strategy,
            identity,
            state: StrategyState::Idle,
            doc: 0,
            base_score: 0.0,
            explain: false,
            explanation: None,
        }
    }

    /// Stable identity of the underlying strategy
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Current protocol state
    pub fn state(&self) -> StrategyState {
        self.state
    }

    /// Transition Idle/Scored → Prepared for a document
    ///
    /// # Errors
    /// `ScoringFailure` when a prepared document was never scored.
    pub fn prepare(&mut self, doc: DocId, base_score: Score, explain: bool) -> Result<()> {
        if self.state == StrategyState::Prepared {
            return Err(Error::ScoringFailure(format!(
                "strategy {} prepared twice without scoring (doc {})",
                self.identity, self.doc
            )));
        }
        self.doc = doc;
        self.base_score = base_score;
        self.explain = explain;
        self.explanation = None;
        self.state = StrategyState::Prepared;
        Ok(())
    }

    /// Score the prepared document; repeatable while it stays current
    ///
    /// # Errors
    /// `ScoringFailure` when no document was prepared, or when the
    /// strategy itself fails.
    pub fn compute_score(
        &mut self,
        matrix: &MatchedInfoMatrix,
        fields: &FieldLookup<'_>,
    ) -> Result<Score> {
        if self.state == StrategyState::Idle {
            return Err(Error::ScoringFailure(format!(
                "strategy {} asked to score with no document prepared",
                self.identity
            )));
        }
        let ctx = StrategyContext {
            doc: self.doc,
            base_score: self.base_score,
            matrix,
            fields,
        };
        let mut recorder = ExplainRecorder::new(self.explain);
        let score = self.strategy.compute_score(&ctx, &mut recorder)?;
        self.explanation = recorder.into_root(&self.identity, score);
        self.state = StrategyState::Scored;
        Ok(score)
    }

    /// Explanation recorded by the last compute, if any
    pub fn explanation(&self) -> Option<&Explanation> {
        self.explanation.as_ref()
    }

    /// Take ownership of the recorded explanation
    pub fn take_explanation(&mut self) -> Option<Explanation> {
        self.explanation.take()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Named scoring-strategy factories
///
/// Owned explicitly by whoever owns the searcher; nothing global. The
/// built-in `weighted_sum` strategy is always registered.
pub struct StrategyRegistry {
    factories: RwLock<HashMap<String, Arc<dyn StrategyFactory>>>,
}

impl StrategyRegistry {
    /// Create a registry with the built-in strategies
    pub fn new() -> Self {
        let registry = StrategyRegistry {
            factories: RwLock::new(HashMap::new()),
        };
        registry
            .register(Arc::new(WeightedSumFactory))
            .expect("empty registry accepts builtins");
        registry
    }

    /// Register a factory under its name
    ///
    /// # Errors
    /// `QueryConstruction` if the name is already taken.
    pub fn register(&self, factory: Arc<dyn StrategyFactory>) -> Result<()> {
        let name = factory.name().to_string();
        let mut factories = self.factories.write();
        if factories.contains_key(&name) {
            return Err(Error::query(format!(
                "scoring strategy already registered: {name}"
            )));
        }
        factories.insert(name, factory);
        Ok(())
    }

    /// Instantiate a harnessed strategy for one request
    ///
    /// # Errors
    /// `QueryConstruction` for an unknown name or bad parameters.
    pub fn create(&self, name: &str, params: &Map<String, Value>) -> Result<StrategyHarness> {
        let factory = self
            .factories
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::query(format!("unknown scoring strategy: {name}")))?;
        Ok(StrategyHarness::new(
            factory.create(params)?,
            name.to_string(),
        ))
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Built-in: weighted sum
// ============================================================================

/// Sums matched-cell scores across the whole grid
///
/// The baseline strategy: base score plus Σ cell scores, where each cell
/// score already carries IDF, TF saturation and both boosts.
#[derive(Debug, Default)]
pub struct WeightedSumStrategy;

impl ScoringStrategy for WeightedSumStrategy {
    fn compute_score(
        &mut self,
        ctx: &StrategyContext<'_>,
        explain: &mut ExplainRecorder,
    ) -> Result<Score> {
        let matrix = ctx.matrix();
        let mut total = ctx.base_score();
        for field in 0..matrix.field_count() {
            explain.begin_field(format!("field {field} (boost {})", matrix.field_boost(field)));
            let mut field_total = 0.0;
            for term in 0..matrix.term_count() {
                let cell = matrix.get(field, term);
                if cell.is_matched() {
                    let score = cell.score();
                    explain.record_term(format!("term {term} (freq {})", cell.freq()), score);
                    field_total += score;
                }
            }
            explain.end_field(field_total);
            total += field_total;
        }
        Ok(total)
    }
}

struct WeightedSumFactory;

impl StrategyFactory for WeightedSumFactory {
    fn name(&self) -> &str {
        crate::query::DEFAULT_STRATEGY
    }

    fn create(&self, _params: &Map<String, Value>) -> Result<Box<dyn ScoringStrategy>> {
        Ok(Box::new(WeightedSumStrategy))
    }
}
