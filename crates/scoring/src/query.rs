//! Ranked query specification
//!
//! A `RankQuery` is what the (external) query-language compiler hands this
//! engine: an ordered field/boost list, a term sequence with per-term
//! boosts, a match policy, an optional global-IDF field set and a scoring
//! strategy binding. All configuration errors are caught here, at
//! construction, so the scan itself never trips over them.

use meridian_core::{Error, Result, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Map;

/// How many distinct query terms a document must match to qualify
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MatchPolicy {
    /// Any single matching cell qualifies (OR semantics)
    None,
    /// Every term must match
    Full,
    /// At least ceil(ratio × termCount) distinct terms must match
    Ratio(f32),
}

impl MatchPolicy {
    /// Minimum number of distinct matched terms required
    pub fn min_match(&self, term_count: usize) -> usize {
        match self {
            MatchPolicy::None => 1,
            MatchPolicy::Full => term_count,
            MatchPolicy::Ratio(ratio) => ((ratio * term_count as f32).ceil() as usize).max(1),
        }
    }

    /// Whether a document with `hits` distinct matched terms qualifies
    ///
    /// `Full` is kept as its own comparison rather than delegating to
    /// `Ratio(1.0)`; the two are distinct policies by contract.
    pub fn qualifies(&self, hits: usize, term_count: usize) -> bool {
        match self {
            MatchPolicy::None => hits >= 1,
            MatchPolicy::Full => hits == term_count,
            MatchPolicy::Ratio(_) => hits >= self.min_match(term_count),
        }
    }

    fn validate(&self) -> Result<()> {
        if let MatchPolicy::Ratio(ratio) = self {
            if !(*ratio > 0.0 && *ratio <= 1.0) {
                return Err(Error::query(format!(
                    "match ratio must be in (0, 1], got {ratio}"
                )));
            }
        }
        Ok(())
    }
}

/// One queried field with its boost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name
    pub name: String,
    /// Multiplier applied to every cell score in this field
    pub boost: f32,
}

/// One query term with its boost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermSpec {
    /// Raw term text
    pub text: String,
    /// Multiplier applied to every cell score for this term
    pub boost: f32,
}

/// Name of the built-in strategy used when a query names none
pub const DEFAULT_STRATEGY: &str = "weighted_sum";

/// A validated ranked query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankQuery {
    fields: Vec<FieldSpec>,
    terms: Vec<TermSpec>,
    policy: MatchPolicy,
    global_idf_fields: Option<Vec<String>>,
    strategy: String,
    params: Map<String, serde_json::Value>,
}

impl RankQuery {
    /// Start building a query
    pub fn builder() -> RankQueryBuilder {
        RankQueryBuilder::default()
    }

    /// Queried fields in order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Query terms in order
    pub fn terms(&self) -> &[TermSpec] {
        &self.terms
    }

    /// Match policy for this query
    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Field set for global IDF, when enabled
    pub fn global_idf_fields(&self) -> Option<&[String]> {
        self.global_idf_fields.as_deref()
    }

    /// Name of the scoring strategy
    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    /// Parameter bindings passed to the strategy factory
    pub fn params(&self) -> &Map<String, serde_json::Value> {
        &self.params
    }
}

/// Builder for [`RankQuery`]
#[derive(Debug, Default)]
pub struct RankQueryBuilder {
    fields: Vec<FieldSpec>,
    terms: Vec<TermSpec>,
    policy: Option<MatchPolicy>,
    global_idf_fields: Option<Vec<String>>,
    strategy: Option<String>,
    params: Map<String, serde_json::Value>,
}

impl RankQueryBuilder {
    /// Add a queried field with a boost
    pub fn field(mut self, name: impl Into<String>, boost: f32) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            boost,
        });
        self
    }

    /// Add a term with boost 1.0
    pub fn term(self, text: impl Into<String>) -> Self {
        self.boosted_term(text, 1.0)
    }

    /// Add a term with an explicit boost
    pub fn boosted_term(mut self, text: impl Into<String>, boost: f32) -> Self {
        self.terms.push(TermSpec {
            text: text.into(),
            boost,
        });
        self
    }

    /// Set the match policy (default: `MatchPolicy::None`)
    pub fn policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Compute term statistics globally across the given fields
    pub fn global_idf(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.global_idf_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Bind a scoring strategy by registered name
    pub fn strategy(mut self, name: impl Into<String>) -> Self {
        self.strategy = Some(name.into());
        self
    }

    /// Add a parameter binding for the strategy factory
    pub fn param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Validate against the schema and finish
    ///
    /// # Errors
    /// `QueryConstruction` for: no fields, no terms, a non-indexed or
    /// undeclared field, an unknown field in the global-IDF set, or a
    /// match ratio outside (0, 1].
    pub fn build(self, schema: &Schema) -> Result<RankQuery> {
        if self.fields.is_empty() {
            return Err(Error::query("query must reference at least one field"));
        }
        if self.terms.is_empty() {
            return Err(Error::query("query must reference at least one term"));
        }
        for field in &self.fields {
            let spec = schema
                .field(&field.name)
                .ok_or_else(|| Error::query(format!("unknown query field: {}", field.name)))?;
            if !spec.indexed {
                return Err(Error::query(format!(
                    "field {} is not indexed and cannot be queried",
                    field.name
                )));
            }
        }
        if let Some(global) = &self.global_idf_fields {
            if global.is_empty() {
                return Err(Error::query("global-IDF field set must not be empty"));
            }
            for name in global {
                let spec = schema.field(name).ok_or_else(|| {
                    Error::query(format!("unknown field in global-IDF set: {name}"))
                })?;
                if !spec.indexed {
                    return Err(Error::query(format!(
                        "field {name} in global-IDF set is not indexed"
                    )));
                }
            }
        }
        let policy = self.policy.unwrap_or(MatchPolicy::None);
        policy.validate()?;
        Ok(RankQuery {
            fields: self.fields,
            terms: self.terms,
            policy,
            global_idf_fields: self.global_idf_fields,
            strategy: self.strategy.unwrap_or_else(|| DEFAULT_STRATEGY.to_string()),
            params: self.params,
        })
    }
}
