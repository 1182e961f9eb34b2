//! Bounded analysis-result cache.
//!
//! Keys combine the document URI with a content hash, so an edit-then-undo
//! sequence hits the cache instead of re-running the compiler. Entries are
//! valid for [`CACHE_TTL`]; staleness is checked lazily on lookup and a
//! stale entry counts as a miss but stays in the map until displaced.
//! When the map outgrows [`MAX_CACHE_SIZE`], `put` removes exactly one
//! entry: the earliest-inserted key. This is insertion-order eviction, not
//! strict LRU; `get` does not refresh an entry's position.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tower_lsp::lsp_types::Diagnostic;

use crate::sha256_hex;
use crate::symbols::SymbolInfo;

pub const CACHE_TTL: Duration = Duration::from_millis(5000);
pub const MAX_CACHE_SIZE: usize = 100;

/// One full analysis pass over a document, replaced wholesale on change.
#[derive(Clone, Debug, Default)]
pub struct AnalysisResult {
    pub success: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub symbols: Vec<SymbolInfo>,
    pub raw_errors: Vec<String>,
}

struct CacheEntry {
    result: AnalysisResult,
    stored_at: Instant,
}

pub struct ParseCache {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ParseCache {
    pub fn new() -> Self {
        Self::with_limits(CACHE_TTL, MAX_CACHE_SIZE)
    }

    pub fn with_limits(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            ttl,
            max_entries,
        }
    }

    /// Cache key for a document version: URI + sha-256 of its text.
    /// Hash collisions are tolerated as a performance tradeoff.
    pub fn key(uri: &str, text: &str) -> String {
        format!("{uri}:{}", sha256_hex(text))
    }

    /// A fresh entry is returned; a stale one counts as a miss and is left
    /// in place (removal only happens through the eviction path).
    pub fn get(&self, key: &str) -> Option<AnalysisResult> {
        let entry = self.entries.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            Some(entry.result.clone())
        } else {
            None
        }
    }

    pub fn put(&mut self, key: String, result: AnalysisResult) {
        if !self.entries.contains_key(&key) {
            self.order.push_back(key.clone());
        }
        self.entries.insert(
            key,
            CacheEntry {
                result,
                stored_at: Instant::now(),
            },
        );

        if self.entries.len() > self.max_entries {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_tagged(tag: &str) -> AnalysisResult {
        AnalysisResult {
            success: true,
            raw_errors: vec![tag.to_string()],
            ..AnalysisResult::default()
        }
    }

    #[test]
    fn hit_within_ttl_returns_stored_result() {
        let mut cache = ParseCache::new();
        let key = ParseCache::key("file:///a.dr", "func main() {}");
        cache.put(key.clone(), result_tagged("first"));

        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.raw_errors, vec!["first".to_string()]);
    }

    #[test]
    fn expired_entry_is_a_miss_but_not_removed() {
        let mut cache = ParseCache::with_limits(Duration::from_millis(0), MAX_CACHE_SIZE);
        let key = ParseCache::key("file:///a.dr", "x");
        cache.put(key.clone(), result_tagged("stale"));

        assert!(cache.get(&key).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn overfilling_evicts_earliest_inserted_key() {
        let mut cache = ParseCache::new();
        for i in 0..=MAX_CACHE_SIZE {
            cache.put(format!("file:///doc{i}.dr:h"), result_tagged("r"));
        }

        assert_eq!(cache.len(), MAX_CACHE_SIZE);
        assert!(cache.get("file:///doc0.dr:h").is_none());
        assert!(cache.get("file:///doc1.dr:h").is_some());
        assert!(cache.get(&format!("file:///doc{MAX_CACHE_SIZE}.dr:h")).is_some());
    }

    #[test]
    fn overwrite_keeps_original_insertion_position() {
        let mut cache = ParseCache::with_limits(CACHE_TTL, 2);
        cache.put("a".to_string(), result_tagged("a1"));
        cache.put("b".to_string(), result_tagged("b"));
        cache.put("a".to_string(), result_tagged("a2"));

        // "a" keeps its original slot, so adding a third key evicts it.
        cache.put("c".to_string(), result_tagged("c"));
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn key_changes_with_content() {
        let k1 = ParseCache::key("file:///a.dr", "one");
        let k2 = ParseCache::key("file:///a.dr", "two");
        assert_ne!(k1, k2);
        assert!(k1.starts_with("file:///a.dr:"));
    }
}
