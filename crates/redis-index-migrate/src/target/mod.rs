//! Target preparation: removes the index being migrated and every key under
//! its prefix so the copy starts from a clean slate.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::store::{KeyScan, StoreClient};

/// What [`prepare`] removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrepareReport {
    /// An index with the migrated name existed and was dropped.
    pub index_dropped: bool,
    /// Keys deleted under the prefix.
    pub keys_deleted: u64,
    /// SCAN calls issued.
    pub pages_scanned: usize,
}

/// Drop `index_name` and delete every key matching `prefix*` on `target`.
///
/// An absent index is not an error. Running this twice leaves the same state
/// as running it once.
pub async fn prepare<T: StoreClient + ?Sized>(
    target: &T,
    index_name: &str,
    prefix: &str,
    scan_count: usize,
) -> Result<PrepareReport> {
    let mut report = PrepareReport {
        index_dropped: target.drop_index(index_name).await?,
        ..Default::default()
    };
    if report.index_dropped {
        info!("Dropped existing index {} on target", index_name);
    } else {
        info!("Index {} not present on target, nothing to drop", index_name);
    }

    let pattern = format!("{}*", prefix);
    let mut scan = KeyScan::new(target, pattern.as_str(), scan_count);
    while let Some(batch) = scan.next_page().await? {
        if batch.is_empty() {
            continue;
        }
        let deleted = target.delete_keys(&batch).await?;
        debug!("Deleted {} of {} keys matching {}", deleted, batch.len(), pattern);
        report.keys_deleted += deleted;
    }
    report.pages_scanned = scan.pages();

    info!(
        "Cleared {} keys matching {} on target ({} scan pages)",
        report.keys_deleted, pattern, report.pages_scanned
    );
    Ok(report)
}
