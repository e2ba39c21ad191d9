//! Inventory comparison between source and target deployments.
//!
//! Collects index names or key names from both sides and splits them into
//! only-in-source, only-in-target and in-both. Collection never aborts a
//! report: a failing store yields an empty inventory with the error attached.
//!
//! - [`compare`]: pure set algebra
//! - [`collect_indexes`] / [`collect_keys`]: best-effort inventories
//! - [`analyze_key_patterns`] / [`key_types`]: extra detail for key reports
//! - [`report`]: plain-text rendering

pub mod report;
pub mod types;

pub use types::{
    ComparisonResult, Inventory, InventoryComparison, InventoryKind, KeyComparisonReport,
    KeyDebugDetail, KeyPattern, Origin, TypedKey,
};

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::store::{scan_all, StoreClient};

/// Split two name sets into only-in-source, only-in-target and in-both.
pub fn compare(source: &BTreeSet<String>, target: &BTreeSet<String>) -> ComparisonResult {
    ComparisonResult {
        only_in_source: source.difference(target).cloned().collect(),
        only_in_target: target.difference(source).cloned().collect(),
        in_both: source.intersection(target).cloned().collect(),
    }
}

/// List the search indexes on one deployment.
pub async fn collect_indexes<S: StoreClient + ?Sized>(store: &S, origin: Origin) -> Inventory {
    let start = Instant::now();
    let mut inventory = Inventory::new(origin, InventoryKind::Indexes, BTreeSet::new());

    match store.list_indexes().await {
        Ok(names) => inventory.names = names.into_iter().collect(),
        Err(e) => {
            warn!("Could not list indexes on {}: {}", origin, e);
            inventory.error = Some(e.to_string());
        }
    }

    inventory.scan_duration = start.elapsed();
    debug!("{} has {} indexes", origin, inventory.len());
    inventory
}

/// Scan the keys matching `pattern` on one deployment.
pub async fn collect_keys<S: StoreClient + ?Sized>(
    store: &S,
    origin: Origin,
    pattern: &str,
    scan_count: usize,
) -> Inventory {
    info!("Scanning {} keys matching {}", origin, pattern);
    let start = Instant::now();
    let mut inventory = Inventory::new(origin, InventoryKind::Keys, BTreeSet::new());

    match scan_all(store, pattern, scan_count).await {
        Ok(keys) => inventory.names = keys,
        Err(e) => {
            warn!("Key scan on {} failed: {}", origin, e);
            inventory.error = Some(e.to_string());
        }
    }

    inventory.scan_duration = start.elapsed();
    info!(
        "Scanned {} {} keys in {:.2}s",
        inventory.len(),
        origin,
        inventory.scan_duration.as_secs_f64()
    );
    inventory
}

/// Count keys by their segment before the first `:` (the whole key when it
/// has none). Sorted by count descending, then by pattern.
pub fn analyze_key_patterns<'a, I>(keys: I) -> Vec<KeyPattern>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for key in keys {
        let head = key.split(':').next().unwrap_or(key.as_str());
        *counts.entry(head).or_default() += 1;
    }

    let mut patterns: Vec<KeyPattern> = counts
        .into_iter()
        .map(|(pattern, count)| KeyPattern {
            pattern: pattern.to_string(),
            count,
        })
        .collect();
    patterns.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.pattern.cmp(&b.pattern)));
    patterns
}

/// Look up the store type of each key. Failed lookups read `unknown`.
pub async fn key_types<'a, S, I>(store: &S, keys: I) -> Vec<TypedKey>
where
    S: StoreClient + ?Sized,
    I: IntoIterator<Item = &'a String>,
{
    let mut typed = Vec::new();
    for key in keys {
        let key_type = match store.key_type(key).await {
            Ok(t) => t,
            Err(e) => {
                debug!("TYPE {} failed: {}", key, e);
                "unknown".to_string()
            }
        };
        typed.push(TypedKey {
            key: key.clone(),
            key_type,
        });
    }
    typed
}

/// Compare index names on both deployments.
pub async fn compare_indexes<S, T>(source: &S, target: &T) -> InventoryComparison
where
    S: StoreClient + ?Sized,
    T: StoreClient + ?Sized,
{
    let source = collect_indexes(source, Origin::Source).await;
    let target = collect_indexes(target, Origin::Target).await;
    let result = compare(&source.names, &target.names);

    InventoryComparison {
        kind: InventoryKind::Indexes,
        source,
        target,
        result,
    }
}

/// Compare key names on both deployments.
pub async fn compare_key_sets<S, T>(
    source: &S,
    target: &T,
    pattern: &str,
    scan_count: usize,
) -> InventoryComparison
where
    S: StoreClient + ?Sized,
    T: StoreClient + ?Sized,
{
    let source = collect_keys(source, Origin::Source, pattern, scan_count).await;
    let target = collect_keys(target, Origin::Target, pattern, scan_count).await;
    let result = compare(&source.names, &target.names);

    InventoryComparison {
        kind: InventoryKind::Keys,
        source,
        target,
        result,
    }
}

/// Key comparison with pattern analysis. With `debug_sample`, also annotates
/// that many only-in-source and only-in-target keys, and every target key,
/// with their types.
pub async fn compare_keys<S, T>(
    source: &S,
    target: &T,
    pattern: &str,
    scan_count: usize,
    debug_sample: Option<usize>,
) -> KeyComparisonReport
where
    S: StoreClient + ?Sized,
    T: StoreClient + ?Sized,
{
    let comparison = compare_key_sets(source, target, pattern, scan_count).await;
    let source_patterns = analyze_key_patterns(&comparison.source.names);
    let target_patterns = analyze_key_patterns(&comparison.target.names);

    let debug = match debug_sample {
        Some(sample) => Some(KeyDebugDetail {
            only_in_source_sample: key_types(
                source,
                comparison.result.only_in_source.iter().take(sample),
            )
            .await,
            only_in_target_sample: key_types(
                target,
                comparison.result.only_in_target.iter().take(sample),
            )
            .await,
            target_keys: key_types(target, &comparison.target.names).await,
        }),
        None => None,
    };

    KeyComparisonReport {
        comparison,
        source_patterns,
        target_patterns,
        debug,
    }
}
