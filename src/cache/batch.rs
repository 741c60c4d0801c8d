//! Fan-out batch retrieval mixing cache hits and store misses.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use futures::future::join_all;
use tracing::debug;

use super::{CachedEntity, EntityCache, Loader};
use crate::error::StoreError;

/// Drop repeated keys, keeping first occurrences in order.
pub fn dedupe_keys(keys: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(keys.len());
    keys.iter()
        .filter(|key| seen.insert(key.as_str()))
        .cloned()
        .collect()
}

impl<E: CachedEntity> EntityCache<E> {
    /// Fetch every record addressable by `keys`.
    ///
    /// Each key is looked up in the cache concurrently. The misses go to the
    /// store in a single `load_many` call and are written back into the
    /// cache. A record reachable through two of the given keys is returned
    /// once. Output order is unspecified.
    pub async fn get_many<L>(&self, keys: &[String], loader: &L) -> Result<Vec<E>, StoreError>
    where
        L: Loader<E> + ?Sized,
    {
        let found = self.lookup_many(keys, loader).await?;

        let loaded: Vec<E> = found
            .iter()
            .filter(|(_, cached)| !cached)
            .map(|(record, _)| record.clone())
            .collect();
        self.set_many(&loaded).await;

        Ok(found.into_iter().map(|(record, _)| record).collect())
    }

    /// Same fan-out as [`get_many`](Self::get_many) without the write-back.
    ///
    /// Each record is paired with `true` if it came from the cache, so the
    /// caller can decide what to cache.
    pub async fn lookup_many<L>(
        &self,
        keys: &[String],
        loader: &L,
    ) -> Result<Vec<(E, bool)>, StoreError>
    where
        L: Loader<E> + ?Sized,
    {
        let keys = dedupe_keys(keys);
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let lookups = join_all(keys.iter().map(|key| async move { (key, self.cached(key).await) })).await;

        let mut found = Vec::with_capacity(keys.len());
        let mut remaining = Vec::new();
        for (key, cached) in lookups {
            match cached {
                Some(record) => found.push((record, true)),
                None => remaining.push(key.clone()),
            }
        }

        debug!(
            namespace = %self.namespace(),
            hits = found.len(),
            misses = remaining.len(),
            "batch cache lookup"
        );

        if !remaining.is_empty() {
            let loaded = loader.load_many(&remaining).await?;
            found.extend(loaded.into_iter().map(|record| (record, false)));
        }

        let mut seen = HashSet::with_capacity(found.len());
        found.retain(|(record, _)| seen.insert(record.value_key()));

        Ok(found)
    }
}

/// Zip parents onto their joined children by foreign key.
///
/// Parents whose child is missing are dropped rather than returned
/// half-populated.
pub fn join_by_key<P, C, K, R>(
    parents: Vec<P>,
    children: Vec<C>,
    parent_fk: impl Fn(&P) -> K,
    child_key: impl Fn(&C) -> K,
    zip: impl Fn(P, C) -> R,
) -> Vec<R>
where
    C: Clone,
    K: Hash + Eq,
{
    let children: HashMap<K, C> = children.into_iter().map(|c| (child_key(&c), c)).collect();

    parents
        .into_iter()
        .filter_map(|parent| {
            let child = children.get(&parent_fk(&parent))?.clone();
            Some(zip(parent, child))
        })
        .collect()
}
