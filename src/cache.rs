//! Memoized evaluation results.
//!
//! Results are stored in nested maps
//! `owner -> accessor -> desired -> filter -> acl text -> result`, all behind
//! one mutex. The lock is never held while a result is computed, so two
//! threads missing on the same key may both compute; the last insert wins
//! and a differing earlier value is logged as a consistency error.
//!
//! Accessor hrefs are tracked in least-recently-used order. A cache built
//! with [`EvaluationCache::with_accessor_capacity`] evicts every entry of the
//! least recently used accessor once more distinct accessors than the
//! capacity are cached.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use tracing::{error, trace};

use crate::error::Result;
use crate::privilege_set::PrivilegeSet;
use crate::types::CurrentAccess;

type AclMap = HashMap<String, CurrentAccess>;
type FilterMap = HashMap<Option<PrivilegeSet>, AclMap>;
type DesiredMap = HashMap<PrivilegeSet, FilterMap>;
type AccessorMap = HashMap<String, DesiredMap>;

/// The effective inputs of one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct CacheKey<'a> {
    pub owner: &'a str,
    pub accessor: &'a str,
    pub desired: &'a PrivilegeSet,
    pub filter: Option<&'a PrivilegeSet>,
    pub acl: &'a str,
}

#[derive(Debug)]
struct CacheState {
    owners: HashMap<String, AccessorMap>,
    accessors: LruCache<String, ()>,
}

impl CacheState {
    fn lookup(&self, key: &CacheKey<'_>) -> Option<&CurrentAccess> {
        self.owners
            .get(key.owner)?
            .get(key.accessor)?
            .get(key.desired)?
            .get(&key.filter.copied())?
            .get(key.acl)
    }

    /// Record use of `accessor`, dropping whichever accessor falls off the
    /// end of a bounded queue.
    fn touch(&mut self, accessor: &str) {
        if let Some((evicted, ())) = self.accessors.push(accessor.to_string(), ()) {
            if evicted != accessor {
                self.purge_accessor(&evicted);
            }
        }
    }

    fn purge_accessor(&mut self, accessor: &str) {
        trace!(event = "Cache", phase = "Evict", accessor);
        self.owners.retain(|_, accessors| {
            accessors.remove(accessor);
            !accessors.is_empty()
        });
    }
}

/// Thread-safe store of [`CurrentAccess`] results.
#[derive(Debug)]
pub struct EvaluationCache {
    state: Mutex<CacheState>,
}

impl Default for EvaluationCache {
    fn default() -> Self {
        EvaluationCache::new()
    }
}

impl EvaluationCache {
    /// An unbounded cache.
    pub fn new() -> Self {
        Self::with_queue(LruCache::unbounded())
    }

    /// A cache holding entries for at most `capacity` distinct accessors.
    pub fn with_accessor_capacity(capacity: NonZeroUsize) -> Self {
        Self::with_queue(LruCache::new(capacity))
    }

    fn with_queue(accessors: LruCache<String, ()>) -> Self {
        EvaluationCache {
            state: Mutex::new(CacheState {
                owners: HashMap::new(),
                accessors,
            }),
        }
    }

    pub fn get(&self, key: &CacheKey<'_>) -> Result<Option<CurrentAccess>> {
        let mut state = self.state.lock()?;
        let found = state.lookup(key).cloned();
        // Known accessors move to the front on a miss too; unknown ones wait for `put`.
        state.accessors.promote(key.accessor);
        trace!(
            event = "Cache",
            phase = "Get",
            owner = key.owner,
            accessor = key.accessor,
            hit = found.is_some()
        );
        Ok(found)
    }

    /// Store `value` under `key`. An existing, different value is replaced
    /// and reported.
    pub fn put(&self, key: &CacheKey<'_>, value: CurrentAccess) -> Result<()> {
        let mut state = self.state.lock()?;
        state.touch(key.accessor);

        let previous = state
            .owners
            .entry(key.owner.to_string())
            .or_default()
            .entry(key.accessor.to_string())
            .or_default()
            .entry(*key.desired)
            .or_default()
            .entry(key.filter.copied())
            .or_default()
            .insert(key.acl.to_string(), value.clone());

        if let Some(previous) = previous {
            if previous != value {
                error!(
                    event = "Cache",
                    phase = "Consistency",
                    owner = key.owner,
                    accessor = key.accessor,
                    previous = %previous,
                    current = %value,
                    "cached result differs from a fresh evaluation of the same inputs"
                );
            }
        }
        Ok(())
    }

    /// Return the cached result for `key`, or compute, store and return it.
    ///
    /// The second element is `true` on a cache hit. `compute` runs without
    /// the cache lock held.
    pub fn get_or_evaluate<F>(
        &self,
        key: &CacheKey<'_>,
        compute: F,
    ) -> Result<(CurrentAccess, bool)>
    where
        F: FnOnce() -> Result<CurrentAccess>,
    {
        if let Some(found) = self.get(key)? {
            return Ok((found, true));
        }
        let value = compute()?;
        self.put(key, value.clone())?;
        Ok((value, false))
    }

    /// Number of cached results.
    pub fn len(&self) -> Result<usize> {
        let state = self.state.lock()?;
        Ok(state
            .owners
            .values()
            .flat_map(|accessors| accessors.values())
            .flat_map(|desired| desired.values())
            .flat_map(|filters| filters.values())
            .map(|acls| acls.len())
            .sum())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of distinct accessors currently tracked.
    pub fn accessor_count(&self) -> Result<usize> {
        Ok(self.state.lock()?.accessors.len())
    }

    pub fn clear(&self) -> Result<()> {
        let mut state = self.state.lock()?;
        state.owners.clear();
        state.accessors.clear();
        Ok(())
    }
}
