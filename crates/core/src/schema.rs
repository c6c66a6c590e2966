//! Schema descriptor
//!
//! The schema is produced outside this core (by the cluster's metadata
//! service) and consumed here to validate queries and to pick the correct
//! column decoder. It maps a field name to its declared type, arity and
//! capabilities.

use crate::error::{Error, Result};
use crate::types::FieldType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declared properties of a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field name
    pub name: String,
    /// Value type of the field
    pub field_type: FieldType,
    /// Whether the field holds a list of values per document
    pub multi_valued: bool,
    /// Whether the field has posting lists
    pub indexed: bool,
    /// Whether the field has stored column values
    pub has_column_values: bool,
}

impl FieldSchema {
    /// An indexed, single-valued text field with column values
    pub fn text(name: impl Into<String>) -> Self {
        FieldSchema {
            name: name.into(),
            field_type: FieldType::Str,
            multi_valued: false,
            indexed: true,
            has_column_values: true,
        }
    }

    /// A non-indexed numeric column field
    pub fn numeric(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldSchema {
            name: name.into(),
            field_type,
            multi_valued: false,
            indexed: false,
            has_column_values: true,
        }
    }

    /// Builder: mark the field as multi-valued
    pub fn multi(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    /// Builder: mark the field as indexed
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }
}

/// Field name → declared properties for one index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: HashMap<String, FieldSchema>,
}

impl Schema {
    /// Build a schema from field declarations
    ///
    /// # Errors
    /// Returns `QueryConstruction` if two declarations share a name.
    pub fn new(fields: impl IntoIterator<Item = FieldSchema>) -> Result<Self> {
        let mut map = HashMap::new();
        for field in fields {
            let name = field.name.clone();
            if map.insert(name.clone(), field).is_some() {
                return Err(Error::query(format!("duplicate field declaration: {name}")));
            }
        }
        Ok(Schema { fields: map })
    }

    /// Look up a field, or None if undeclared
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.get(name)
    }

    /// Look up a field, failing with `FieldNotFound` if undeclared
    pub fn require(&self, name: &str) -> Result<&FieldSchema> {
        self.field(name)
            .ok_or_else(|| Error::FieldNotFound(name.to_string()))
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema declares no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
