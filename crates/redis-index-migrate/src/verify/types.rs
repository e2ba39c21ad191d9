//! Type definitions for inventory comparison.

use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// Which deployment an inventory was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Source,
    Target,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Source => write!(f, "source"),
            Origin::Target => write!(f, "target"),
        }
    }
}

/// What an inventory lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryKind {
    Indexes,
    Keys,
}

impl fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryKind::Indexes => write!(f, "indexes"),
            InventoryKind::Keys => write!(f, "keys"),
        }
    }
}

/// Names collected from one deployment.
///
/// Collection is best-effort: when the store fails, `names` is empty and
/// `error` holds the failure.
#[derive(Debug, Clone, Serialize)]
pub struct Inventory {
    pub origin: Origin,
    pub kind: InventoryKind,
    pub names: BTreeSet<String>,
    #[serde(rename = "scan_seconds", serialize_with = "duration_secs")]
    pub scan_duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Inventory {
    pub fn new(origin: Origin, kind: InventoryKind, names: BTreeSet<String>) -> Self {
        Self {
            origin,
            kind,
            names,
            scan_duration: Duration::ZERO,
            error: None,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn duration_secs<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Three-way split of two name sets. The sets are pairwise disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonResult {
    pub only_in_source: BTreeSet<String>,
    pub only_in_target: BTreeSet<String>,
    pub in_both: BTreeSet<String>,
}

impl ComparisonResult {
    /// True when neither side has names the other lacks.
    pub fn is_match(&self) -> bool {
        self.only_in_source.is_empty() && self.only_in_target.is_empty()
    }
}

/// Source and target inventories with their comparison.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryComparison {
    pub kind: InventoryKind,
    pub source: Inventory,
    pub target: Inventory,
    pub result: ComparisonResult,
}

/// Number of keys sharing a leading segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyPattern {
    pub pattern: String,
    pub count: usize,
}

/// A key with its store-side type (`unknown` when the lookup failed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypedKey {
    pub key: String,
    pub key_type: String,
}

/// Key comparison plus pattern analysis and optional debug detail.
#[derive(Debug, Clone, Serialize)]
pub struct KeyComparisonReport {
    pub comparison: InventoryComparison,
    pub source_patterns: Vec<KeyPattern>,
    pub target_patterns: Vec<KeyPattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<KeyDebugDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyDebugDetail {
    /// First keys (sorted) that exist only on the source, with their types.
    pub only_in_source_sample: Vec<TypedKey>,
    /// First keys (sorted) that exist only on the target, with their types.
    pub only_in_target_sample: Vec<TypedKey>,
    /// Every target key with its type.
    pub target_keys: Vec<TypedKey>,
}
