//! TTL caching for read-mostly lexicon data.
//!
//! An explicit component with an injected clock: entries expire on read,
//! nothing runs in the background, and invalidation is a method call.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use dialecta_core::error::StoreError;
use dialecta_core::model::Lexeme;
use dialecta_core::traits::{Clock, Lexicon};

struct Entry<V> {
    value: V,
    stored_at: DateTime<Utc>,
    ttl: Duration,
}

/// A keyed cache whose entries expire `ttl` after insertion.
pub struct TtlCache<K, V> {
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self {
            clock,
            default_ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a live entry. An expired entry is dropped and reads as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if self.clock.now() - entry.stored_at <= entry.ttl => {
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value with the default TTL.
    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    /// Store a value with an entry-specific TTL.
    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        self.entries.lock().unwrap().insert(
            key,
            Entry {
                value,
                stored_at: self.clock.now(),
                ttl,
            },
        );
    }

    /// Drop one entry.
    pub fn invalidate(&self, key: &K) {
        self.entries.lock().unwrap().remove(key);
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// Lexicon decorator that caches exact lookups and recent lists.
///
/// Fuzzy lookups and searches pass through: their query space is
/// unbounded and their results change with every lexicon edit. Call
/// [`CachedLexicon::invalidate_all`] after mutating the underlying
/// lexicon.
pub struct CachedLexicon<L> {
    inner: L,
    exact: TtlCache<(Uuid, String), Option<Lexeme>>,
    recent: TtlCache<(Option<Uuid>, usize), Vec<Lexeme>>,
}

impl<L: Lexicon> CachedLexicon<L> {
    pub fn new(inner: L, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            inner,
            exact: TtlCache::new(Arc::clone(&clock), ttl),
            recent: TtlCache::new(clock, ttl),
        }
    }

    /// Drop all cached reads, e.g. after the lexicon was edited.
    pub fn invalidate_all(&self) {
        self.exact.clear();
        self.recent.clear();
        tracing::debug!("lexicon cache invalidated");
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

#[async_trait]
impl<L: Lexicon> Lexicon for CachedLexicon<L> {
    async fn exact(&self, dialect: Uuid, lemma: &str) -> Result<Option<Lexeme>, StoreError> {
        let key = (dialect, lemma.to_string());
        if let Some(hit) = self.exact.get(&key) {
            return Ok(hit);
        }
        let fetched = self.inner.exact(dialect, lemma).await?;
        self.exact.insert(key, fetched.clone());
        Ok(fetched)
    }

    async fn best_match(
        &self,
        dialect: Uuid,
        query: &str,
    ) -> Result<Option<(Lexeme, f64)>, StoreError> {
        self.inner.best_match(dialect, query).await
    }

    async fn search(
        &self,
        dialect: Option<Uuid>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<(Lexeme, f64)>, StoreError> {
        self.inner.search(dialect, query, limit).await
    }

    async fn recent(&self, dialect: Option<Uuid>, limit: usize) -> Result<Vec<Lexeme>, StoreError> {
        let key = (dialect, limit);
        if let Some(hit) = self.recent.get(&key) {
            return Ok(hit);
        }
        let fetched = self.inner.recent(dialect, limit).await?;
        self.recent.insert(key, fetched.clone());
        Ok(fetched)
    }

    async fn by_ids(&self, ids: &[Uuid]) -> Result<Vec<Lexeme>, StoreError> {
        self.inner.by_ids(ids).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::clock::ManualClock;
    use crate::memory::MemoryStore;

    use super::*;

    #[test]
    fn expired_entry_reads_as_miss() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache: TtlCache<&str, u32> = TtlCache::new(clock.clone(), Duration::minutes(10));

        cache.insert("k", 1);
        assert_eq!(cache.get(&"k"), Some(1));

        clock.advance(Duration::minutes(10));
        assert_eq!(cache.get(&"k"), Some(1));

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get(&"k"), None);
    }

    #[test]
    fn per_entry_ttl_overrides_default() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache: TtlCache<&str, u32> = TtlCache::new(clock.clone(), Duration::minutes(10));

        cache.insert_with_ttl("short", 1, Duration::seconds(30));
        clock.advance(Duration::minutes(1));
        assert_eq!(cache.get(&"short"), None);
    }

    #[test]
    fn invalidate_drops_entry_immediately() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache: TtlCache<&str, u32> = TtlCache::new(clock, Duration::minutes(10));

        cache.insert("k", 1);
        cache.invalidate(&"k");
        assert_eq!(cache.get(&"k"), None);
    }

    /// Counts calls reaching the wrapped lexicon.
    struct CountingLexicon {
        inner: MemoryStore,
        exact_calls: AtomicU32,
    }

    #[async_trait]
    impl Lexicon for CountingLexicon {
        async fn exact(&self, dialect: Uuid, lemma: &str) -> Result<Option<Lexeme>, StoreError> {
            self.exact_calls.fetch_add(1, Ordering::Relaxed);
            self.inner.exact(dialect, lemma).await
        }

        async fn best_match(
            &self,
            dialect: Uuid,
            query: &str,
        ) -> Result<Option<(Lexeme, f64)>, StoreError> {
            self.inner.best_match(dialect, query).await
        }

        async fn search(
            &self,
            dialect: Option<Uuid>,
            query: &str,
            limit: usize,
        ) -> Result<Vec<(Lexeme, f64)>, StoreError> {
            self.inner.search(dialect, query, limit).await
        }

        async fn recent(
            &self,
            dialect: Option<Uuid>,
            limit: usize,
        ) -> Result<Vec<Lexeme>, StoreError> {
            self.inner.recent(dialect, limit).await
        }

        async fn by_ids(&self, ids: &[Uuid]) -> Result<Vec<Lexeme>, StoreError> {
            self.inner.by_ids(ids).await
        }
    }

    #[tokio::test]
    async fn cached_exact_lookup_hits_backend_once_per_ttl() {
        let store = MemoryStore::new();
        let dialect = Uuid::new_v4();
        store
            .add_lexeme(Lexeme {
                id: Uuid::new_v4(),
                dialect,
                lemma: "kako".into(),
                meaning: String::new(),
                phonetic: None,
                tags: vec![],
                created_at: Utc::now(),
            })
            .unwrap();

        let counting = CountingLexicon {
            inner: store,
            exact_calls: AtomicU32::new(0),
        };
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cached = CachedLexicon::new(counting, clock.clone(), Duration::minutes(10));

        for _ in 0..3 {
            assert!(cached.exact(dialect, "kako").await.unwrap().is_some());
        }
        assert_eq!(cached.inner().exact_calls.load(Ordering::Relaxed), 1);

        clock.advance(Duration::minutes(11));
        assert!(cached.exact(dialect, "kako").await.unwrap().is_some());
        assert_eq!(cached.inner().exact_calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn invalidate_all_forces_refetch() {
        let counting = CountingLexicon {
            inner: MemoryStore::new(),
            exact_calls: AtomicU32::new(0),
        };
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cached = CachedLexicon::new(counting, clock, Duration::minutes(10));
        let dialect = Uuid::new_v4();

        cached.exact(dialect, "kako").await.unwrap();
        cached.exact(dialect, "kako").await.unwrap();
        assert_eq!(cached.inner().exact_calls.load(Ordering::Relaxed), 1);

        cached.invalidate_all();
        cached.exact(dialect, "kako").await.unwrap();
        assert_eq!(cached.inner().exact_calls.load(Ordering::Relaxed), 2);
    }
}
