//! Decoding of `FT.INFO` replies.
//!
//! The reply is a flat alternating key/value list (RESP2) or a map (RESP3).
//! Two sections matter:
//!
//! ```text
//! index_definition: [key_type, HASH, prefixes, [doc:], ...]
//! attributes:       [[identifier, embedding, attribute, embedding, type, VECTOR,
//!                     algorithm, FLAT, data_type, FLOAT32, dim, 4, distance_metric, COSINE],
//!                    [identifier, title, attribute, title, type, TEXT, WEIGHT, 1, SORTABLE], ...]
//! ```
//!
//! Attribute lists mix key/value pairs with bare flags such as `SORTABLE`,
//! so they are walked token by token rather than chunked in pairs.

use std::collections::{HashMap, HashSet};

use redis::Value;
use tracing::{debug, warn};

use super::{FieldDescriptor, FieldKind, IndexDefinition, StorageType, VectorAttrs};
use crate::error::{MigrateError, Result};

/// Dimension assumed for a vector field whose reply carries none.
pub const DEFAULT_VECTOR_DIMS: u32 = 3;

const DEFAULT_ALGORITHM: &str = "FLAT";
const DEFAULT_DISTANCE_METRIC: &str = "COSINE";
const DEFAULT_DATA_TYPE: &str = "FLOAT32";

/// Attribute tokens that stand alone instead of introducing a value.
const FLAG_TOKENS: &[&str] = &[
    "SORTABLE",
    "UNF",
    "NOSTEM",
    "NOINDEX",
    "CASESENSITIVE",
    "WITHSUFFIXTRIE",
    "INDEXEMPTY",
    "INDEXMISSING",
];

/// Decode an index-info reply with default settings.
pub fn introspect(index_name: &str, info: &Value) -> Result<IndexDefinition> {
    Introspector::new().introspect(index_name, info)
}

/// Schema introspector.
#[derive(Debug, Clone, Default)]
pub struct Introspector {
    strict_vector_dims: bool,
}

impl Introspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject vector fields without a dimension instead of assuming
    /// [`DEFAULT_VECTOR_DIMS`].
    pub fn strict_vector_dims(mut self, strict: bool) -> Self {
        self.strict_vector_dims = strict;
        self
    }

    /// Decode the raw reply for `index_name` into an [`IndexDefinition`].
    pub fn introspect(&self, index_name: &str, info: &Value) -> Result<IndexDefinition> {
        let top = entries(info)
            .ok_or_else(|| MigrateError::schema(index_name, "index info is not a key/value reply"))?;

        let definition = lookup(&top, "index_definition")
            .and_then(entries)
            .ok_or_else(|| MigrateError::schema(index_name, "missing index_definition"))?;

        let storage = match lookup(&definition, "key_type").and_then(value_str) {
            None => StorageType::Hash,
            Some(kind) => match kind.to_uppercase().as_str() {
                "HASH" => StorageType::Hash,
                "JSON" => StorageType::Json,
                other => {
                    return Err(MigrateError::schema(
                        index_name,
                        format!("unsupported key type {}", other),
                    ))
                }
            },
        };

        let prefix = lookup(&definition, "prefixes")
            .and_then(list)
            .and_then(|prefixes| prefixes.first().and_then(value_str))
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                MigrateError::schema(index_name, "no prefix found in index definition")
            })?;

        let attributes = lookup(&top, "attributes")
            .and_then(list)
            .ok_or_else(|| MigrateError::schema(index_name, "missing attributes"))?;

        let mut fields = Vec::with_capacity(attributes.len());
        for (position, attribute) in attributes.iter().enumerate() {
            let parsed = AttributeEntry::parse(attribute).ok_or_else(|| {
                MigrateError::schema(
                    index_name,
                    format!("attribute #{} is not a key/value list", position + 1),
                )
            })?;
            fields.push(self.field(index_name, position, &parsed)?);
        }

        if fields.is_empty() {
            return Err(MigrateError::schema(index_name, "index declares no fields"));
        }

        debug!(
            "Introspected {}: prefix={} storage={:?} fields={}",
            index_name,
            prefix,
            storage,
            fields.len()
        );

        Ok(IndexDefinition {
            name: index_name.to_string(),
            prefix,
            storage,
            fields,
        })
    }

    fn field(
        &self,
        index_name: &str,
        position: usize,
        attr: &AttributeEntry,
    ) -> Result<FieldDescriptor> {
        let identifier = attr.get_str("identifier");
        let name = attr
            .get_str("attribute")
            .or_else(|| identifier.clone())
            .ok_or_else(|| {
                MigrateError::schema(index_name, format!("attribute #{} has no name", position + 1))
            })?;
        let path = identifier.filter(|id| *id != name);

        let field_type = attr.get_str("type").ok_or_else(|| {
            MigrateError::schema(index_name, format!("field {} has no type", name))
        })?;

        let kind = match field_type.to_uppercase().as_str() {
            "TEXT" => FieldKind::Text,
            "NUMERIC" => FieldKind::Numeric,
            "VECTOR" => FieldKind::Vector(self.vector_attrs(index_name, &name, attr)?),
            other => {
                return Err(MigrateError::schema(
                    index_name,
                    format!("field {} has unsupported type {}", name, other),
                ))
            }
        };

        Ok(FieldDescriptor {
            name,
            path,
            kind,
            sortable: attr.has_flag("SORTABLE"),
        })
    }

    fn vector_attrs(&self, index_name: &str, field: &str, attr: &AttributeEntry) -> Result<VectorAttrs> {
        let dims = match attr.values.get("dim") {
            Some(value) => parse_dims(value).ok_or_else(|| {
                MigrateError::schema(
                    index_name,
                    format!("vector field {} has invalid dim {:?}", field, value_str(value)),
                )
            })?,
            None if self.strict_vector_dims => {
                return Err(MigrateError::schema(
                    index_name,
                    format!("vector field {} has no dim", field),
                ))
            }
            None => {
                warn!(
                    "Vector field {}.{} reports no dim; assuming {}. Verify the target \
                     index before loading data.",
                    index_name, field, DEFAULT_VECTOR_DIMS
                );
                DEFAULT_VECTOR_DIMS
            }
        };

        Ok(VectorAttrs {
            algorithm: attr
                .get_str("algorithm")
                .map(|s| s.to_uppercase())
                .unwrap_or_else(|| DEFAULT_ALGORITHM.to_string()),
            dims,
            distance_metric: attr
                .get_str("distance_metric")
                .map(|s| s.to_uppercase())
                .unwrap_or_else(|| DEFAULT_DISTANCE_METRIC.to_string()),
            data_type: attr
                .get_str("data_type")
                .map(|s| s.to_uppercase())
                .unwrap_or_else(|| DEFAULT_DATA_TYPE.to_string()),
        })
    }
}

/// One decoded attribute: lower-cased keys to values, plus bare flags.
struct AttributeEntry {
    values: HashMap<String, Value>,
    flags: HashSet<String>,
}

impl AttributeEntry {
    fn parse(value: &Value) -> Option<Self> {
        let mut values = HashMap::new();
        let mut flags = HashSet::new();

        match value {
            Value::Array(tokens) => {
                let mut i = 0;
                while i < tokens.len() {
                    let Some(key) = value_str(&tokens[i]) else {
                        i += 1;
                        continue;
                    };
                    let upper = key.to_uppercase();
                    if FLAG_TOKENS.contains(&upper.as_str()) || i + 1 == tokens.len() {
                        flags.insert(upper);
                        i += 1;
                    } else {
                        values.insert(key.to_lowercase(), tokens[i + 1].clone());
                        i += 2;
                    }
                }
            }
            Value::Map(pairs) => {
                for (k, v) in pairs {
                    if let Some(key) = value_str(k) {
                        values.insert(key.to_lowercase(), v.clone());
                    }
                }
            }
            _ => return None,
        }

        // RESP3 replies group flags under their own key.
        if let Some(listed) = values.get("flags").and_then(list) {
            flags.extend(listed.iter().filter_map(value_str).map(|f| f.to_uppercase()));
        }

        Some(Self { values, flags })
    }

    fn get_str(&self, key: &str) -> Option<String> {
        self.values.get(key).and_then(value_str)
    }

    fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}

fn parse_dims(value: &Value) -> Option<u32> {
    let dims = match value {
        Value::Int(n) => u32::try_from(*n).ok()?,
        other => value_str(other)?.trim().parse::<u32>().ok()?,
    };
    (dims > 0).then_some(dims)
}

/// Key/value view of a reply section.
fn entries(value: &Value) -> Option<Vec<(&Value, &Value)>> {
    match value {
        Value::Array(items) => Some(items.chunks_exact(2).map(|kv| (&kv[0], &kv[1])).collect()),
        Value::Map(pairs) => Some(pairs.iter().map(|(k, v)| (k, v)).collect()),
        _ => None,
    }
}

fn lookup<'a>(entries: &[(&'a Value, &'a Value)], key: &str) -> Option<&'a Value> {
    entries
        .iter()
        .find(|(k, _)| value_str(k).is_some_and(|k| k.eq_ignore_ascii_case(key)))
        .map(|(_, v)| *v)
}

fn list(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(items) | Value::Set(items) => Some(items.as_slice()),
        _ => None,
    }
}

fn value_str(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Some(s.clone()),
        Value::VerbatimString { text, .. } => Some(text.clone()),
        Value::Int(n) => Some(n.to_string()),
        Value::Double(f) => Some(f.to_string()),
        Value::Okay => Some("OK".to_string()),
        _ => None,
    }
}
