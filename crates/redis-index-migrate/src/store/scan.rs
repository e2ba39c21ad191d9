//! Cursor-based key iteration.

use std::collections::BTreeSet;

use tracing::debug;

use super::{StoreClient, SCAN_START};
use crate::error::Result;

/// Page-at-a-time iteration over keys matching a pattern.
///
/// Yields every page the store returns (including empty ones) and stops after
/// the page that came back with the [`SCAN_START`] cursor.
pub struct KeyScan<'a, S: StoreClient + ?Sized> {
    store: &'a S,
    pattern: String,
    count: usize,
    cursor: u64,
    finished: bool,
    pages: usize,
}

impl<'a, S: StoreClient + ?Sized> KeyScan<'a, S> {
    /// Start a scan. `count` is the per-call hint passed to the store.
    pub fn new(store: &'a S, pattern: impl Into<String>, count: usize) -> Self {
        Self {
            store,
            pattern: pattern.into(),
            count,
            cursor: SCAN_START,
            finished: false,
            pages: 0,
        }
    }

    /// Fetch the next page, or `None` once the cursor is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<String>>> {
        if self.finished {
            return Ok(None);
        }

        let (next, keys) = self.store.scan(self.cursor, &self.pattern, self.count).await?;
        self.pages += 1;
        self.cursor = next;
        if next == SCAN_START {
            self.finished = true;
        }

        Ok(Some(keys))
    }

    /// Pages fetched so far.
    pub fn pages(&self) -> usize {
        self.pages
    }
}

/// Collect every key matching `pattern` into one in-memory set.
///
/// Intended for inventories that fit in memory.
pub async fn scan_all<S: StoreClient + ?Sized>(
    store: &S,
    pattern: &str,
    count: usize,
) -> Result<BTreeSet<String>> {
    let mut scan = KeyScan::new(store, pattern, count);
    let mut keys = BTreeSet::new();

    while let Some(page) = scan.next_page().await? {
        keys.extend(page);
    }

    debug!(
        "Scanned {} keys matching {} in {} pages",
        keys.len(),
        pattern,
        scan.pages()
    );
    Ok(keys)
}
