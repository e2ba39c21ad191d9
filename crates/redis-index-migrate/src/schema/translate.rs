//! Mapping of an [`IndexDefinition`] onto the index-creation vocabulary.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{FieldKind, IndexDefinition, StorageType};
use crate::error::Result;
use crate::store::StoreClient;

/// Index-creation schema: an `index` section plus a list of fields.
///
/// Serializes to the YAML layout printed by `migrate --dry-run`:
///
/// ```yaml
/// index:
///   name: docIdx
///   prefix: "doc:"
///   storage_type: hash
/// fields:
///   - name: embedding
///     type: vector
///     attrs: {algorithm: FLAT, dims: 4, distance_metric: COSINE, datatype: FLOAT32}
///   - name: title
///     type: text
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub index: IndexSection,
    pub fields: Vec<SchemaField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSection {
    pub name: String,
    pub prefix: String,
    pub storage_type: StorageType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "type")]
    pub field_type: SchemaFieldType,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sortable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<VectorFieldAttrs>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaFieldType {
    Text,
    Numeric,
    Vector,
}

impl SchemaFieldType {
    fn keyword(&self) -> &'static str {
        match self {
            SchemaFieldType::Text => "TEXT",
            SchemaFieldType::Numeric => "NUMERIC",
            SchemaFieldType::Vector => "VECTOR",
        }
    }
}

/// Vector attributes in creation vocabulary (`datatype`, not `data_type`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorFieldAttrs {
    pub algorithm: String,
    pub dims: u32,
    pub distance_metric: String,
    pub datatype: String,
}

impl IndexSchema {
    /// Arguments following `FT.CREATE`.
    ///
    /// `<name> ON <HASH|JSON> PREFIX 1 <prefix> SCHEMA <field>...` where a
    /// vector field renders as
    /// `<name> VECTOR <alg> 6 TYPE <dt> DIM <n> DISTANCE_METRIC <metric>`.
    pub fn create_args(&self) -> Vec<String> {
        let mut args = vec![
            self.index.name.clone(),
            "ON".to_string(),
            self.index.storage_type.keyword().to_string(),
            "PREFIX".to_string(),
            "1".to_string(),
            self.index.prefix.clone(),
            "SCHEMA".to_string(),
        ];

        for field in &self.fields {
            if let Some(ref path) = field.path {
                args.push(path.clone());
                args.push("AS".to_string());
            }
            args.push(field.name.clone());
            args.push(field.field_type.keyword().to_string());

            if let Some(ref attrs) = field.attrs {
                args.extend([
                    attrs.algorithm.clone(),
                    "6".to_string(),
                    "TYPE".to_string(),
                    attrs.datatype.clone(),
                    "DIM".to_string(),
                    attrs.dims.to_string(),
                    "DISTANCE_METRIC".to_string(),
                    attrs.distance_metric.clone(),
                ]);
            }
            if field.sortable {
                args.push("SORTABLE".to_string());
            }
        }

        args
    }
}

/// Translate an introspected definition into a creation schema.
pub fn translate(def: &IndexDefinition) -> IndexSchema {
    let fields = def
        .fields
        .iter()
        .map(|f| {
            let (field_type, attrs) = match &f.kind {
                FieldKind::Text => (SchemaFieldType::Text, None),
                FieldKind::Numeric => (SchemaFieldType::Numeric, None),
                FieldKind::Vector(v) => (
                    SchemaFieldType::Vector,
                    Some(VectorFieldAttrs {
                        algorithm: v.algorithm.clone(),
                        dims: v.dims,
                        distance_metric: v.distance_metric.clone(),
                        datatype: v.data_type.clone(),
                    }),
                ),
            };
            SchemaField {
                name: f.name.clone(),
                path: f.path.clone(),
                field_type,
                sortable: f.sortable,
                attrs,
            }
        })
        .collect();

    IndexSchema {
        index: IndexSection {
            name: def.name.clone(),
            prefix: def.prefix.clone(),
            storage_type: def.storage,
        },
        fields,
    }
}

/// Create the translated index on `target`, replacing any index of the same
/// name. Returns the prefix the new index covers.
pub async fn create_on_target<T: StoreClient + ?Sized>(
    target: &T,
    def: &IndexDefinition,
) -> Result<String> {
    let schema = translate(def);
    target.create_index(&schema, true).await?;
    info!(
        "Created index {} on target ({} fields, prefix {})",
        def.name,
        schema.fields.len(),
        def.prefix
    );
    Ok(def.prefix.clone())
}
