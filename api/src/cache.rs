//! Keyed query cache with prefix invalidation and in-flight de-duplication.
//!
//! Each [`QueryKey`] owns one entry: the last loaded data, a freshness flag,
//! an invalidation generation and a fetch lock. Concurrent readers of a stale
//! key queue on the fetch lock, so only the first one calls the loader and
//! the rest reuse its result. A load that started before an invalidation of
//! its key still stores its data, but leaves the entry stale so the next
//! reader fetches again.
use crate::{FestDay, Group, MatchWithSport, Settings, Sport, SportCategory, Team};
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

/// Partition prefix. Invalidating a root marks every key under it stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryRoot {
    Settings,
    Sports,
    Sport,
    Groups,
    Teams,
    Matches,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Settings,
    Sports,
    SportsByCategory(SportCategory),
    Sport(String),
    Groups,
    GroupsBySport(String),
    Teams,
    TeamsByGroup(String),
    Matches,
    MatchesByDate(FestDay),
    MatchesBySport(String),
    RunningMatches,
}

impl QueryKey {
    pub fn root(&self) -> QueryRoot {
        match self {
            QueryKey::Settings => QueryRoot::Settings,
            QueryKey::Sports | QueryKey::SportsByCategory(_) => QueryRoot::Sports,
            QueryKey::Sport(_) => QueryRoot::Sport,
            QueryKey::Groups | QueryKey::GroupsBySport(_) => QueryRoot::Groups,
            QueryKey::Teams | QueryKey::TeamsByGroup(_) => QueryRoot::Teams,
            QueryKey::Matches
            | QueryKey::MatchesByDate(_)
            | QueryKey::MatchesBySport(_)
            | QueryKey::RunningMatches => QueryRoot::Matches,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Settings => write!(f, "settings"),
            QueryKey::Sports => write!(f, "sports"),
            QueryKey::SportsByCategory(c) => write!(f, "sports/{}", c.as_str()),
            QueryKey::Sport(id) => write!(f, "sport/{id}"),
            QueryKey::Groups => write!(f, "groups"),
            QueryKey::GroupsBySport(id) => write!(f, "groups/{id}"),
            QueryKey::Teams => write!(f, "teams"),
            QueryKey::TeamsByGroup(id) => write!(f, "teams/{id}"),
            QueryKey::Matches => write!(f, "matches"),
            QueryKey::MatchesByDate(day) => write!(f, "matches/date/{}", day.code()),
            QueryKey::MatchesBySport(id) => write!(f, "matches/sport/{id}"),
            QueryKey::RunningMatches => write!(f, "matches/running"),
        }
    }
}

/// Loaded value of one query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Settings(Option<Settings>),
    Sports(Vec<Sport>),
    Sport(Option<Sport>),
    Groups(Vec<Group>),
    Teams(Vec<Team>),
    Matches(Vec<MatchWithSport>),
}

/// Typed view of a [`QueryData`] variant.
pub trait FromQueryData: Sized {
    fn from_query_data(data: &QueryData) -> Option<Self>;
}

macro_rules! from_query_data {
    ($ty:ty, $variant:ident) => {
        impl FromQueryData for $ty {
            fn from_query_data(data: &QueryData) -> Option<Self> {
                match data {
                    QueryData::$variant(inner) => Some(inner.clone()),
                    _ => None,
                }
            }
        }
    };
}

from_query_data!(Option<Settings>, Settings);
from_query_data!(Vec<Sport>, Sports);
from_query_data!(Option<Sport>, Sport);
from_query_data!(Vec<Group>, Groups);
from_query_data!(Vec<Team>, Teams);
from_query_data!(Vec<MatchWithSport>, Matches);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    Invalidated,
    Refreshed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub key: QueryKey,
    pub kind: CacheEventKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
struct Entry {
    data: Option<Arc<QueryData>>,
    fresh: bool,
    generation: u64,
    fetch_lock: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Debug)]
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    events: broadcast::Sender<CacheEvent>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            entries: Mutex::new(HashMap::new()),
            events,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fresh_data(&self, key: &QueryKey) -> Option<Arc<QueryData>> {
        self.entries()
            .get(key)
            .filter(|e| e.fresh)
            .and_then(|e| e.data.clone())
    }

    fn fetch_lock(&self, key: &QueryKey) -> Arc<tokio::sync::Mutex<()>> {
        self.entries()
            .entry(key.clone())
            .or_default()
            .fetch_lock
            .clone()
    }

    fn generation(&self, key: &QueryKey) -> u64 {
        self.entries().get(key).map_or(0, |e| e.generation)
    }

    /// Return the cached data for `key` if fresh, otherwise run `loader` once
    /// (even under concurrent callers) and cache its result. A failed load
    /// leaves the entry as it was.
    pub async fn fetch<F, Fut, E>(&self, key: &QueryKey, loader: F) -> Result<Arc<QueryData>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryData, E>>,
    {
        if let Some(data) = self.fresh_data(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("cache hit {key}");
            return Ok(data);
        }
        self.load(key, loader, false).await
    }

    /// Run `loader` for `key` even when the entry is fresh. Readers see the
    /// new data through a `Refreshed` event; no `Invalidated` is sent.
    pub async fn refetch<F, Fut, E>(&self, key: &QueryKey, loader: F) -> Result<Arc<QueryData>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryData, E>>,
    {
        self.load(key, loader, true).await
    }

    async fn load<F, Fut, E>(&self, key: &QueryKey, loader: F, force: bool) -> Result<Arc<QueryData>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryData, E>>,
    {
        let lock = self.fetch_lock(key);
        let _in_flight = lock.lock().await;

        if !force && let Some(data) = self.fresh_data(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("cache hit {key} after waiting on in-flight load");
            return Ok(data);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let started_at = self.generation(key);
        debug!("cache miss {key}, loading");

        let data = Arc::new(loader().await?);

        let fresh = {
            let mut entries = self.entries();
            let entry = entries.entry(key.clone()).or_default();
            entry.data = Some(data.clone());
            entry.fresh = entry.generation == started_at;
            entry.fresh
        };

        if fresh {
            self.emit(key.clone(), CacheEventKind::Refreshed);
        } else {
            debug!("{key} was invalidated while loading, left stale");
        }
        Ok(data)
    }

    /// Mark every key under `root` stale.
    pub fn invalidate(&self, root: QueryRoot) {
        let keys: Vec<QueryKey> = {
            let mut entries = self.entries();
            entries
                .iter_mut()
                .filter(|(key, _)| key.root() == root)
                .map(|(key, entry)| {
                    entry.fresh = false;
                    entry.generation += 1;
                    key.clone()
                })
                .collect()
        };
        debug!("invalidated {root:?} ({} key(s))", keys.len());
        for key in keys {
            self.emit(key, CacheEventKind::Invalidated);
        }
    }

    pub fn invalidate_key(&self, key: &QueryKey) {
        let touched = match self.entries().get_mut(key) {
            Some(entry) => {
                entry.fresh = false;
                entry.generation += 1;
                true
            }
            None => false,
        };
        if touched {
            debug!("invalidated {key}");
            self.emit(key.clone(), CacheEventKind::Invalidated);
        }
    }

    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.entries().get(key).is_some_and(|e| e.fresh && e.data.is_some())
    }

    /// Last loaded data for `key`, fresh or not.
    pub fn peek(&self, key: &QueryKey) -> Option<Arc<QueryData>> {
        self.entries().get(key).and_then(|e| e.data.clone())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries().values().filter(|e| e.data.is_some()).count(),
        }
    }

    pub fn subscribe(&self) -> CacheSubscription {
        CacheSubscription {
            events: self.events.subscribe(),
        }
    }

    fn emit(&self, key: QueryKey, kind: CacheEventKind) {
        // Nobody listening is fine.
        let _ = self.events.send(CacheEvent { key, kind });
    }
}

/// Receiver of cache invalidation/refresh notifications.
pub struct CacheSubscription {
    events: broadcast::Receiver<CacheEvent>,
}

impl CacheSubscription {
    /// Next event, skipping any this subscriber was too slow to see.
    /// `None` once the cache is gone.
    pub async fn recv(&mut self) -> Option<CacheEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    debug!("cache subscriber lagged, skipped {missed} event(s)");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub async fn recv_for<P>(&mut self, mut wanted: P) -> Option<CacheEvent>
    where
        P: FnMut(&CacheEvent) -> bool,
    {
        loop {
            let event = self.recv().await?;
            if wanted(&event) {
                return Some(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;
    use tokio::time::{Duration, sleep};

    fn team(name: &str) -> Team {
        Team {
            id: name.to_lowercase(),
            name: name.to_string(),
            ..Team::default()
        }
    }

    async fn load_teams(
        cache: &QueryCache,
        key: &QueryKey,
        calls: &AtomicUsize,
    ) -> Result<Arc<QueryData>, String> {
        cache
            .fetch(key, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(QueryData::Teams(vec![team("CSE")]))
            })
            .await
    }

    #[test]
    fn keys_group_under_roots() {
        assert_eq!(QueryKey::RunningMatches.root(), QueryRoot::Matches);
        assert_eq!(QueryKey::MatchesByDate(FestDay::Day1).root(), QueryRoot::Matches);
        assert_eq!(QueryKey::TeamsByGroup("g".into()).root(), QueryRoot::Teams);
        assert_eq!(QueryKey::Sport("x".into()).root(), QueryRoot::Sport);
        assert_eq!(QueryKey::SportsByCategory(SportCategory::Minor).to_string(), "sports/minor");
    }

    #[test]
    fn typed_extraction_checks_variant() {
        let data = QueryData::Teams(vec![team("A")]);
        assert_eq!(Vec::<Team>::from_query_data(&data).map(|t| t.len()), Some(1));
        assert_eq!(Vec::<Group>::from_query_data(&data), None);
    }

    #[tokio::test]
    async fn fresh_entry_is_served_without_loading() {
        let cache = QueryCache::new();
        let calls = AtomicUsize::new(0);
        let key = QueryKey::TeamsByGroup("g1".into());

        load_teams(&cache, &key, &calls).await.unwrap();
        load_teams(&cache, &key, &calls).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_fresh(&key));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_readers_share_one_load() {
        let cache = Arc::new(QueryCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let readers = (0..8).map(|_| {
            let cache = cache.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                cache
                    .fetch(&QueryKey::Teams, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        sleep(Duration::from_millis(50)).await;
                        Ok::<_, String>(QueryData::Teams(vec![team("A"), team("B")]))
                    })
                    .await
            })
        });

        for result in futures_util::future::join_all(readers).await {
            let data = result.unwrap().unwrap();
            assert_eq!(Vec::<Team>::from_query_data(&data).map(|t| t.len()), Some(2));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidating_a_root_only_touches_its_keys() {
        let cache = QueryCache::new();
        let calls = AtomicUsize::new(0);
        let by_group = QueryKey::TeamsByGroup("g1".into());

        load_teams(&cache, &QueryKey::Teams, &calls).await.unwrap();
        load_teams(&cache, &by_group, &calls).await.unwrap();
        cache
            .fetch(&QueryKey::Groups, || async { Ok::<_, String>(QueryData::Groups(vec![])) })
            .await
            .unwrap();

        cache.invalidate(QueryRoot::Teams);

        assert!(!cache.is_fresh(&QueryKey::Teams));
        assert!(!cache.is_fresh(&by_group));
        assert!(cache.is_fresh(&QueryKey::Groups));
        assert!(cache.peek(&by_group).is_some());

        load_teams(&cache, &by_group, &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_data() {
        let cache = QueryCache::new();
        let calls = AtomicUsize::new(0);
        load_teams(&cache, &QueryKey::Teams, &calls).await.unwrap();
        cache.invalidate_key(&QueryKey::Teams);

        let err = cache
            .fetch(&QueryKey::Teams, || async { Err::<QueryData, _>("offline".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err, "offline");

        let kept = cache.peek(&QueryKey::Teams).unwrap();
        assert_eq!(Vec::<Team>::from_query_data(&kept).map(|t| t[0].name.clone()), Some("CSE".into()));
        assert!(!cache.is_fresh(&QueryKey::Teams));
    }

    #[tokio::test]
    async fn load_racing_an_invalidation_stays_stale() {
        let cache = Arc::new(QueryCache::new());
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let loading = tokio::spawn({
            let cache = cache.clone();
            async move {
                cache
                    .fetch(&QueryKey::Matches, || async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok::<_, String>(QueryData::Matches(vec![]))
                    })
                    .await
            }
        });

        started_rx.await.unwrap();
        cache.invalidate(QueryRoot::Matches);
        release_tx.send(()).unwrap();
        loading.await.unwrap().unwrap();

        assert!(cache.peek(&QueryKey::Matches).is_some());
        assert!(!cache.is_fresh(&QueryKey::Matches));
    }

    #[tokio::test]
    async fn refetch_reloads_fresh_entry_without_invalidating() {
        let cache = QueryCache::new();
        let calls = AtomicUsize::new(0);
        load_teams(&cache, &QueryKey::Teams, &calls).await.unwrap();
        let mut events = cache.subscribe();

        cache
            .refetch(&QueryKey::Teams, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(QueryData::Teams(vec![team("ECE")]))
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_fresh(&QueryKey::Teams));
        assert_eq!(
            events.recv().await,
            Some(CacheEvent { key: QueryKey::Teams, kind: CacheEventKind::Refreshed })
        );
        let kept = cache.peek(&QueryKey::Teams).unwrap();
        assert_eq!(Vec::<Team>::from_query_data(&kept).map(|t| t[0].name.clone()), Some("ECE".into()));
    }

    #[tokio::test]
    async fn subscribers_hear_invalidations_and_refreshes() {
        let cache = QueryCache::new();
        let mut events = cache.subscribe();
        let calls = AtomicUsize::new(0);

        load_teams(&cache, &QueryKey::Teams, &calls).await.unwrap();
        cache.invalidate(QueryRoot::Teams);

        assert_eq!(
            events.recv().await,
            Some(CacheEvent { key: QueryKey::Teams, kind: CacheEventKind::Refreshed })
        );
        let invalidated = events
            .recv_for(|e| e.kind == CacheEventKind::Invalidated)
            .await
            .unwrap();
        assert_eq!(invalidated.key, QueryKey::Teams);
    }
}
