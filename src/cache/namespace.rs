//! Cache namespace registry.

use std::fmt;

/// Logical concern a cache entry belongs to.
///
/// The table is fixed at compile time; every key written by this crate is
/// prefixed with one of these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// `id -> slug` pointers and `slug -> organization` values.
    OrganizationData,
    /// `id -> team` values.
    TeamData,
    /// `id -> token hash` pointers and `token hash -> PAT` values.
    ///
    /// There is no separate `pat-id-to-hash` namespace: the resolver only
    /// follows pointers within one namespace, so both entries live here.
    /// Ids and 64-char hex hashes never collide.
    PatData,
    /// `token hash -> session` values.
    SessionData,
    /// Added/removed id queues drained by the search synchronizer.
    SearchSyncQueue,
}

impl CacheNamespace {
    /// All registered namespaces.
    pub const ALL: [CacheNamespace; 5] = [
        CacheNamespace::OrganizationData,
        CacheNamespace::TeamData,
        CacheNamespace::PatData,
        CacheNamespace::SessionData,
        CacheNamespace::SearchSyncQueue,
    ];

    /// Key prefix for this namespace.
    pub const fn as_str(self) -> &'static str {
        match self {
            CacheNamespace::OrganizationData => "organization-data",
            CacheNamespace::TeamData => "team-data",
            CacheNamespace::PatData => "pat-data",
            CacheNamespace::SessionData => "session-data",
            CacheNamespace::SearchSyncQueue => "search-sync",
        }
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_prefixes_are_unique() {
        let prefixes: HashSet<_> = CacheNamespace::ALL.iter().map(|ns| ns.as_str()).collect();
        assert_eq!(prefixes.len(), CacheNamespace::ALL.len());
    }
}
