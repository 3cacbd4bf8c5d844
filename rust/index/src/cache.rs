//! The cell cache: single-writer/multiple-reader, at-most-once materialization of
//! inverted cells, keyed by packed coarse code.

use std::sync::Arc;

use dashmap::DashMap;
use lopq_error::LopqError;
use lopq_types::Cluster;

/// Abstract collaborator the searcher delegates cell storage to. Implementations may
/// hit a blockstore, a database, or an in-memory map — the core only needs the one
/// operation below, and never assumes anything about how it's backed.
pub trait CellStore {
    type Error: LopqError + 'static;

    /// Fetches the inverted cell for `coarse`. Pure from the core's perspective: the
    /// cache may call this more than once for the same coarse code under contention,
    /// and expects equal results each time (see [`crate::cache::CellCache`]).
    fn get_cell(&self, coarse: lopq_types::CoarseCode) -> Result<Cluster, Self::Error>;
}

/// Cache of materialized cells, keyed by the packed coarse code
/// ([`lopq_types::pack_coarse_code`]). Grows monotonically for the life of the
/// Searcher — there is no eviction in the retrieval core.
#[derive(Default)]
pub struct CellCache {
    cells: DashMap<u64, Arc<Cluster>>,
}

impl CellCache {
    pub fn new() -> Self {
        Self {
            cells: DashMap::new(),
        }
    }

    /// Returns the cached cluster for `key`, fetching and inserting it on miss.
    ///
    /// On a cache hit, `fetch` is never invoked. On a miss, two concurrent callers may
    /// both invoke `fetch` before either observes the other's insert; the first value
    /// committed to the map wins and is what both callers (and all later callers) see.
    /// This is sound because the collaborator is required to be pure (§6).
    pub fn get_or_fetch<E>(
        &self,
        key: u64,
        fetch: impl FnOnce() -> Result<Cluster, E>,
    ) -> Result<Arc<Cluster>, E> {
        if let Some(existing) = self.cells.get(&key) {
            return Ok(Arc::clone(&existing));
        }
        tracing::trace!(cell_key = key, "cell cache miss, fetching from collaborator");
        let fetched = Arc::new(fetch()?);
        let committed = self.cells.entry(key).or_insert_with(|| fetched);
        tracing::trace!(cell_key = key, cell_size = committed.len(), "cell cached");
        Ok(Arc::clone(&committed))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
