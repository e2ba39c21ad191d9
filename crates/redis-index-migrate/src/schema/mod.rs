//! Index schema model.
//!
//! - [`introspect`]: decodes a raw index-info reply into an [`IndexDefinition`]
//! - [`translate`]: maps an [`IndexDefinition`] onto the index-creation
//!   vocabulary ([`IndexSchema`]) and creates it on a target
//!
//! The raw reply never leaves the introspector; everything downstream works
//! on the typed definition.

pub mod introspect;
pub mod translate;

pub use introspect::{introspect, Introspector, DEFAULT_VECTOR_DIMS};
pub use translate::{create_on_target, translate, IndexSchema, SchemaField, SchemaFieldType};

use serde::{Deserialize, Serialize};

/// Key type an index is defined over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Hash documents.
    #[default]
    Hash,
    /// JSON documents.
    Json,
}

impl StorageType {
    /// Keyword used in `FT.CREATE ... ON <kind>`.
    pub fn keyword(&self) -> &'static str {
        match self {
            StorageType::Hash => "HASH",
            StorageType::Json => "JSON",
        }
    }
}

/// Structured definition of a live index.
///
/// Invariants: `prefix` is non-empty and `fields` is non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    /// Index name.
    pub name: String,
    /// First key prefix the index covers.
    pub prefix: String,
    /// Document type.
    pub storage: StorageType,
    /// Indexed fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl IndexDefinition {
    /// Key pattern covering every document of this index.
    pub fn key_pattern(&self) -> String {
        format!("{}*", self.prefix)
    }

    /// Vector fields of this index.
    pub fn vector_fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &VectorAttrs)> {
        self.fields.iter().filter_map(|f| match &f.kind {
            FieldKind::Vector(attrs) => Some((f, attrs)),
            _ => None,
        })
    }
}

/// One indexed attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Attribute name (alias).
    pub name: String,
    /// Store-side identifier when it differs from `name` (e.g. `$.title`).
    pub path: Option<String>,
    /// Field kind, carrying vector attributes for vector fields.
    pub kind: FieldKind,
    /// Whether the field is declared `SORTABLE`.
    pub sortable: bool,
}

impl FieldDescriptor {
    /// Text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            kind: FieldKind::Text,
            sortable: false,
        }
    }

    /// Numeric field.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            kind: FieldKind::Numeric,
            sortable: false,
        }
    }

    /// Vector field.
    pub fn vector(name: impl Into<String>, attrs: VectorAttrs) -> Self {
        Self {
            name: name.into(),
            path: None,
            kind: FieldKind::Vector(attrs),
            sortable: false,
        }
    }

    /// Mark the field `SORTABLE`.
    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }
}

/// Supported field kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Numeric,
    Vector(VectorAttrs),
}

impl FieldKind {
    /// Upper-case type name as reported by the store.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text => "TEXT",
            FieldKind::Numeric => "NUMERIC",
            FieldKind::Vector(_) => "VECTOR",
        }
    }
}

/// Vector field parameters. `dims` is always positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorAttrs {
    pub algorithm: String,
    pub dims: u32,
    pub distance_metric: String,
    pub data_type: String,
}

impl VectorAttrs {
    pub fn new(
        algorithm: impl Into<String>,
        dims: u32,
        distance_metric: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            algorithm: algorithm.into(),
            dims,
            distance_metric: distance_metric.into(),
            data_type: data_type.into(),
        }
    }
}
