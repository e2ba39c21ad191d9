//! In-memory [`StoreClient`] double for unit tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Bound;
use std::sync::Mutex;

use async_trait::async_trait;
use redis::Value;

use crate::error::{MigrateError, Result};
use crate::schema::IndexSchema;
use crate::store::{StoreClient, SCAN_START};

pub(crate) fn bulk(s: &str) -> Value {
    Value::BulkString(s.as_bytes().to_vec())
}

/// RESP2-shaped index-info reply over a hash prefix. Each attribute is a flat
/// token list, exactly as the server reports it.
pub(crate) fn ft_info_reply(prefix: &str, attributes: Vec<Vec<&str>>) -> Value {
    Value::Array(vec![
        bulk("index_name"),
        bulk("idx"),
        bulk("index_definition"),
        Value::Array(vec![
            bulk("key_type"),
            bulk("HASH"),
            bulk("prefixes"),
            Value::Array(vec![bulk(prefix)]),
            bulk("default_score"),
            bulk("1"),
        ]),
        bulk("attributes"),
        Value::Array(
            attributes
                .into_iter()
                .map(|tokens| Value::Array(tokens.into_iter().map(bulk).collect()))
                .collect(),
        ),
        bulk("num_docs"),
        Value::Int(0),
    ])
}

/// Index-info reply describing a schema created through [`StoreClient::create_index`].
fn info_from_schema(schema: &IndexSchema) -> Value {
    let attributes = schema
        .fields
        .iter()
        .map(|f| {
            let mut tokens = vec![
                bulk("identifier"),
                bulk(f.path.as_deref().unwrap_or(&f.name)),
                bulk("attribute"),
                bulk(&f.name),
                bulk("type"),
                bulk(&format!("{:?}", f.field_type).to_uppercase()),
            ];
            if let Some(ref attrs) = f.attrs {
                tokens.extend([
                    bulk("algorithm"),
                    bulk(&attrs.algorithm),
                    bulk("data_type"),
                    bulk(&attrs.datatype),
                    bulk("dim"),
                    Value::Int(attrs.dims as i64),
                    bulk("distance_metric"),
                    bulk(&attrs.distance_metric),
                ]);
            }
            if f.sortable {
                tokens.push(bulk("SORTABLE"));
            }
            Value::Array(tokens)
        })
        .collect();

    Value::Array(vec![
        bulk("index_definition"),
        Value::Array(vec![
            bulk("key_type"),
            bulk(&format!("{:?}", schema.index.storage_type).to_uppercase()),
            bulk("prefixes"),
            Value::Array(vec![bulk(&schema.index.prefix)]),
        ]),
        bulk("attributes"),
        Value::Array(attributes),
    ])
}

/// `*` and `?` glob matching, enough for SCAN MATCH patterns used in tests.
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    fn matches(p: &[char], t: &[char]) -> bool {
        match (p.first(), t.first()) {
            (None, None) => true,
            (Some('*'), _) => matches(&p[1..], t) || (!t.is_empty() && matches(p, &t[1..])),
            (Some('?'), Some(_)) => matches(&p[1..], &t[1..]),
            (Some(a), Some(b)) if a == b => matches(&p[1..], &t[1..]),
            _ => false,
        }
    }
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    matches(&p, &t)
}

struct IndexEntry {
    info: Value,
    schema: Option<IndexSchema>,
}

#[derive(Default)]
struct State {
    keys: BTreeMap<String, String>,
    indexes: BTreeMap<String, IndexEntry>,
    scripted: Option<VecDeque<(u64, Vec<String>)>>,
    scan_cursors: Vec<u64>,
    cursor_positions: HashMap<u64, String>,
    next_cursor: u64,
    failing: bool,
    reject_create: Option<String>,
    calls: Vec<String>,
}

pub(crate) struct MemoryStore {
    url: String,
    state: Mutex<State>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self {
            url: "redis://memory:6379".to_string(),
            state: Mutex::new(State::default()),
        }
    }

    pub(crate) fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub(crate) fn with_keys<I, K>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        for key in keys {
            self.insert_key(key);
        }
        self
    }

    /// Serve these `(next_cursor, keys)` pages in order instead of paginating
    /// the key map.
    pub(crate) fn with_scripted_pages(self, pages: Vec<(u64, Vec<String>)>) -> Self {
        self.state.lock().unwrap().scripted = Some(pages.into());
        self
    }

    /// Every operation fails with a store error.
    pub(crate) fn failing(self) -> Self {
        self.state.lock().unwrap().failing = true;
        self
    }

    /// Index creation is rejected by the "server".
    pub(crate) fn rejecting_create(self, message: &str) -> Self {
        self.state.lock().unwrap().reject_create = Some(message.to_string());
        self
    }

    pub(crate) fn insert_key(&self, key: impl Into<String>) {
        self.insert_typed_key(key, "hash");
    }

    pub(crate) fn insert_typed_key(&self, key: impl Into<String>, key_type: &str) {
        self.state
            .lock()
            .unwrap()
            .keys
            .insert(key.into(), key_type.to_string());
    }

    pub(crate) fn add_index(&self, name: &str, info: Value) {
        self.state.lock().unwrap().indexes.insert(
            name.to_string(),
            IndexEntry { info, schema: None },
        );
    }

    pub(crate) fn has_index(&self, name: &str) -> bool {
        self.state.lock().unwrap().indexes.contains_key(name)
    }

    pub(crate) fn created_schema(&self, name: &str) -> Option<IndexSchema> {
        self.state
            .lock()
            .unwrap()
            .indexes
            .get(name)
            .and_then(|e| e.schema.clone())
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.state.lock().unwrap().keys.keys().cloned().collect()
    }

    pub(crate) fn scan_calls(&self) -> usize {
        self.state.lock().unwrap().scan_cursors.len()
    }

    pub(crate) fn scan_cursors(&self) -> Vec<u64> {
        self.state.lock().unwrap().scan_cursors.clone()
    }

    /// Operations issued so far, e.g. `FT.DROPINDEX docIdx`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Whether any operation that changes data or indexes was issued.
    pub(crate) fn was_mutated(&self) -> bool {
        self.calls().iter().any(|c| {
            c.starts_with("DEL") || c.starts_with("FT.CREATE") || c.starts_with("FT.DROPINDEX")
        })
    }

    fn begin(&self, call: String) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.clone());
        if state.failing {
            return Err(MigrateError::Store(format!("{} failed: connection refused", call)));
        }
        Ok(state)
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    fn url(&self) -> &str {
        &self.url
    }

    async fn list_indexes(&self) -> Result<Vec<String>> {
        let state = self.begin("FT._LIST".to_string())?;
        Ok(state.indexes.keys().cloned().collect())
    }

    async fn index_info(&self, name: &str) -> Result<Value> {
        let state = self.begin(format!("FT.INFO {}", name))?;
        match state.indexes.get(name) {
            Some(IndexEntry {
                schema: Some(schema),
                ..
            }) => Ok(info_from_schema(schema)),
            Some(entry) => Ok(entry.info.clone()),
            None => Err(MigrateError::Store(format!(
                "FT.INFO on memory failed: Unknown Index name {}",
                name
            ))),
        }
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)> {
        let mut state = self.begin(format!("SCAN {}", cursor))?;
        state.scan_cursors.push(cursor);

        if let Some(ref mut pages) = state.scripted {
            return Ok(pages.pop_front().unwrap_or((SCAN_START, Vec::new())));
        }

        // Cursors remember the last key visited, so deletions between calls
        // never cause keys to be skipped.
        let start = if cursor == SCAN_START {
            Bound::Unbounded
        } else {
            match state.cursor_positions.get(&cursor) {
                Some(last) => Bound::Excluded(last.clone()),
                None => return Err(MigrateError::Store(format!("invalid cursor {}", cursor))),
            }
        };
        let window: Vec<String> = state
            .keys
            .range::<String, _>((start, Bound::Unbounded))
            .take(count)
            .map(|(k, _)| k.clone())
            .collect();

        let more = match window.last() {
            Some(last) => state
                .keys
                .range::<String, _>((Bound::Excluded(last.clone()), Bound::Unbounded))
                .next()
                .is_some(),
            None => false,
        };
        let next = match (more, window.last()) {
            (true, Some(last)) => {
                state.next_cursor += 1;
                let id = state.next_cursor;
                state.cursor_positions.insert(id, last.clone());
                id
            }
            _ => SCAN_START,
        };

        let page = window
            .into_iter()
            .filter(|k| glob_match(pattern, k))
            .collect();
        Ok((next, page))
    }

    async fn delete_keys(&self, keys: &[String]) -> Result<u64> {
        let mut state = self.begin(format!("DEL {}", keys.len()))?;
        let removed = keys
            .iter()
            .filter(|k| state.keys.remove(k.as_str()).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn key_type(&self, key: &str) -> Result<String> {
        let state = self.begin(format!("TYPE {}", key))?;
        Ok(state
            .keys
            .get(key)
            .cloned()
            .unwrap_or_else(|| "none".to_string()))
    }

    async fn create_index(&self, schema: &IndexSchema, overwrite: bool) -> Result<()> {
        let name = schema.index.name.clone();
        let mut state = self.begin(format!("FT.CREATE {}", name))?;
        if let Some(ref message) = state.reject_create {
            return Err(MigrateError::create(name, message.clone()));
        }
        if state.indexes.contains_key(&name) && !overwrite {
            return Err(MigrateError::create(name, "Index already exists"));
        }
        state.indexes.insert(
            name,
            IndexEntry {
                info: Value::Nil,
                schema: Some(schema.clone()),
            },
        );
        Ok(())
    }

    async fn drop_index(&self, name: &str) -> Result<bool> {
        let mut state = self.begin(format!("FT.DROPINDEX {}", name))?;
        Ok(state.indexes.remove(name).is_some())
    }

    async fn ping(&self) -> Result<()> {
        self.begin("PING".to_string())?;
        Ok(())
    }
}

#[test]
fn test_glob_match() {
    assert!(glob_match("*", "anything"));
    assert!(glob_match("doc:*", "doc:1"));
    assert!(glob_match("doc:*", "doc:"));
    assert!(!glob_match("doc:*", "docs:1"));
    assert!(glob_match("k?y", "key"));
    assert!(!glob_match("k?y", "ky"));
}
