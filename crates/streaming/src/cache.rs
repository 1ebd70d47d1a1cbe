use std::collections::{BTreeMap, BTreeSet};

use scene::TextureHandle;

/// Cache key: one panorama file within one experience. A node's file
/// resolves through exactly one key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureKey {
    pub experience: String,
    pub file: String,
}

impl TextureKey {
    pub fn new(experience: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            experience: experience.into(),
            file: file.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// `complete`/`fail` for a key with no in-flight load (stale arrival
    /// after a purge, or a double completion).
    NotLoading { key: TextureKey },
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::NotLoading { key } => {
                write!(
                    f,
                    "no load in flight for {}/{}",
                    key.experience, key.file
                )
            }
        }
    }
}

impl std::error::Error for CacheError {}

#[derive(Debug, Clone)]
struct Entry {
    handle: TextureHandle,
    last_used_tick: u64,
}

/// Outcome of an `acquire` call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Acquire {
    /// Texture is resident; the entry was touched.
    Resident(TextureHandle),
    /// A load for this key is already in flight; the caller joins it and
    /// must not start a second fetch.
    Loading,
    /// No entry and no in-flight load; the caller must start exactly one
    /// fetch and report back via `complete` or `fail`.
    StartLoad,
}

/// A finished load, plus whatever the insert pushed out.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedLoad {
    pub handle: TextureHandle,
    /// Evicted entries; the caller owns disposing these GPU-side.
    pub evicted: Vec<(TextureKey, TextureHandle)>,
}

/// Bounded texture cache with deterministic LRU eviction.
///
/// The cache is pure bookkeeping: it never talks to the network or the GPU.
/// Determinism notes, mirrored from how it is tested:
/// - Entries live in a `BTreeMap` for stable traversal order.
/// - Eviction is LRU by `last_used_tick`, ties broken by key ordering.
/// - The current and previous keys are exempt from eviction while set.
#[derive(Debug)]
pub struct TextureCache {
    limit: usize,
    tick: u64,
    entries: BTreeMap<TextureKey, Entry>,
    in_flight: BTreeSet<TextureKey>,
    current: Option<TextureKey>,
    previous: Option<TextureKey>,
}

impl TextureCache {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            tick: 0,
            entries: BTreeMap::new(),
            in_flight: BTreeSet::new(),
            current: None,
            previous: None,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_resident(&self, key: &TextureKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_loading(&self, key: &TextureKey) -> bool {
        self.in_flight.contains(key)
    }

    pub fn handle(&self, key: &TextureKey) -> Option<TextureHandle> {
        self.entries.get(key).map(|e| e.handle)
    }

    pub fn current(&self) -> Option<&TextureKey> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&TextureKey> {
        self.previous.as_ref()
    }

    /// Marks a key as the one on the main display; the old current becomes
    /// previous. Both are protected from eviction while set.
    pub fn set_current(&mut self, key: TextureKey) {
        if self.current.as_ref() == Some(&key) {
            return;
        }
        self.previous = self.current.take();
        self.current = Some(key);
    }

    /// Idempotent acquisition. Concurrent acquires of the same in-flight key
    /// collapse onto one load: only the first caller sees `StartLoad`.
    pub fn acquire(&mut self, key: &TextureKey) -> Acquire {
        if let Some(entry) = self.entries.get_mut(key) {
            self.tick += 1;
            entry.last_used_tick = self.tick;
            return Acquire::Resident(entry.handle);
        }
        if self.in_flight.contains(key) {
            return Acquire::Loading;
        }
        self.in_flight.insert(key.clone());
        Acquire::StartLoad
    }

    /// Refreshes an entry's recency without loading.
    pub fn touch(&mut self, key: &TextureKey) {
        if let Some(entry) = self.entries.get_mut(key) {
            self.tick += 1;
            entry.last_used_tick = self.tick;
        }
    }

    /// Lands a finished load. Every caller that joined the in-flight load
    /// reads the same handle off the returned value (or via `handle`).
    pub fn complete(
        &mut self,
        key: &TextureKey,
        handle: TextureHandle,
    ) -> Result<CompletedLoad, CacheError> {
        if !self.in_flight.remove(key) {
            return Err(CacheError::NotLoading { key: key.clone() });
        }
        self.tick += 1;
        self.entries.insert(
            key.clone(),
            Entry {
                handle,
                last_used_tick: self.tick,
            },
        );
        let evicted = self.evict_as_needed(key);
        Ok(CompletedLoad { handle, evicted })
    }

    /// Drops the in-flight record for a failed load. No partial entry is
    /// ever stored; a later `acquire` starts a fresh load.
    pub fn fail(&mut self, key: &TextureKey) -> Result<(), CacheError> {
        if !self.in_flight.remove(key) {
            return Err(CacheError::NotLoading { key: key.clone() });
        }
        Ok(())
    }

    /// Disposes everything whose key is not in `keep`. In-flight loads are
    /// left alone (their completion decides their fate against the limit).
    pub fn retain_only(&mut self, keep: &BTreeSet<TextureKey>) -> Vec<(TextureKey, TextureHandle)> {
        let doomed: Vec<TextureKey> = self
            .entries
            .keys()
            .filter(|k| !keep.contains(*k))
            .cloned()
            .collect();
        let mut disposed = Vec::with_capacity(doomed.len());
        for key in doomed {
            if let Some(entry) = self.entries.remove(&key) {
                disposed.push((key, entry.handle));
            }
        }
        disposed
    }

    /// Empties the cache entirely (tab hidden, rendering context lost).
    /// Pending loads are forgotten; a straggler completion surfaces as
    /// `NotLoading` and its handle belongs to the caller to dispose.
    pub fn purge_all(&mut self) -> Vec<(TextureKey, TextureHandle)> {
        self.in_flight.clear();
        let disposed = self
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.handle))
            .collect();
        self.entries.clear();
        disposed
    }

    fn evict_as_needed(&mut self, just_inserted: &TextureKey) -> Vec<(TextureKey, TextureHandle)> {
        let mut evicted = Vec::new();
        while self.entries.len() > self.limit {
            let candidate = self
                .entries
                .iter()
                .filter(|(k, _)| {
                    *k != just_inserted
                        && Some(*k) != self.current.as_ref()
                        && Some(*k) != self.previous.as_ref()
                })
                .min_by(|(ka, ea), (kb, eb)| {
                    ea.last_used_tick
                        .cmp(&eb.last_used_tick)
                        .then_with(|| ka.cmp(kb))
                })
                .map(|(k, _)| k.clone());

            // Everything left is protected: tolerate running over the limit
            // rather than evicting what is on screen.
            let Some(key) = candidate else {
                break;
            };
            if let Some(entry) = self.entries.remove(&key) {
                evicted.push((key, entry.handle));
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::{Acquire, CacheError, TextureCache, TextureKey};
    use scene::TextureHandle;
    use std::collections::BTreeSet;

    fn key(file: &str) -> TextureKey {
        TextureKey::new("exp", file)
    }

    fn load(cache: &mut TextureCache, file: &str, handle: u64) {
        assert_eq!(cache.acquire(&key(file)), Acquire::StartLoad);
        cache.complete(&key(file), TextureHandle(handle)).unwrap();
    }

    #[test]
    fn concurrent_acquires_share_one_load() {
        let mut cache = TextureCache::new(4);
        let k = key("a");

        assert_eq!(cache.acquire(&k), Acquire::StartLoad);
        // Second caller before the load settles: joins, no second fetch.
        assert_eq!(cache.acquire(&k), Acquire::Loading);

        let done = cache.complete(&k, TextureHandle(1)).unwrap();
        assert_eq!(done.handle, TextureHandle(1));
        assert_eq!(cache.acquire(&k), Acquire::Resident(TextureHandle(1)));
    }

    #[test]
    fn size_never_exceeds_limit_after_settle() {
        let mut cache = TextureCache::new(2);
        load(&mut cache, "a", 1);
        load(&mut cache, "b", 2);
        load(&mut cache, "c", 3);

        assert_eq!(cache.len(), 2);
        // 'a' was least recently touched.
        assert!(!cache.is_resident(&key("a")));
        assert!(cache.is_resident(&key("b")));
        assert!(cache.is_resident(&key("c")));
    }

    #[test]
    fn current_and_previous_are_never_evicted() {
        let mut cache = TextureCache::new(2);
        load(&mut cache, "a", 1);
        load(&mut cache, "b", 2);
        cache.set_current(key("a"));
        cache.set_current(key("b")); // previous = a, current = b

        load(&mut cache, "c", 3);
        // a and b are protected even though a is the LRU entry.
        assert!(cache.is_resident(&key("a")));
        assert!(cache.is_resident(&key("b")));
        assert!(cache.is_resident(&key("c")));
        assert_eq!(cache.len(), 3); // over limit rather than evicting on-screen

        load(&mut cache, "d", 4);
        // c is the only unprotected entry.
        assert!(!cache.is_resident(&key("c")));
    }

    #[test]
    fn failed_load_leaves_no_partial_entry() {
        let mut cache = TextureCache::new(2);
        let k = key("a");
        assert_eq!(cache.acquire(&k), Acquire::StartLoad);
        cache.fail(&k).unwrap();

        assert!(!cache.is_resident(&k));
        assert!(!cache.is_loading(&k));
        // Re-requesting starts a fresh load.
        assert_eq!(cache.acquire(&k), Acquire::StartLoad);
    }

    #[test]
    fn retain_only_disposes_exactly_the_complement() {
        let mut cache = TextureCache::new(8);
        for (i, f) in ["a", "b", "c", "d"].iter().enumerate() {
            load(&mut cache, f, i as u64);
        }
        cache.set_current(key("a"));

        let keep: BTreeSet<_> = [key("a"), key("c")].into();
        let disposed = cache.retain_only(&keep);

        let disposed_keys: Vec<_> = disposed.iter().map(|(k, _)| k.file.clone()).collect();
        assert_eq!(disposed_keys, vec!["b", "d"]);
        assert!(cache.is_resident(&key("a")));
        assert!(cache.is_resident(&key("c")));
    }

    #[test]
    fn purge_forgets_pending_loads() {
        let mut cache = TextureCache::new(4);
        load(&mut cache, "a", 1);
        assert_eq!(cache.acquire(&key("b")), Acquire::StartLoad);

        let disposed = cache.purge_all();
        assert_eq!(disposed.len(), 1);
        assert!(cache.is_empty());

        // The straggler completion is rejected; its handle is the caller's
        // to dispose.
        let err = cache.complete(&key("b"), TextureHandle(2)).unwrap_err();
        assert_eq!(err, CacheError::NotLoading { key: key("b") });
    }
}
