//! The retrieval engine: owns a [`Model`] and a [`CellCache`], turns a query into a
//! ranked, deduplicated, quota-bounded list of [`Response`]s.
//!
//! A search moves through a fixed sequence of phases — coarse code picked, cell
//! fetched, per-split distance tables tabulated on demand, every entry scored,
//! optionally deduplicated, top-K selected — with no suspension point in between; see
//! [`Searcher::search_in`].

use lopq_types::{CoarseCode, FeatureVector, FineCode, Response, NUM_COARSE_SPLITS};
use parking_lot::RwLock;

use crate::cache::{CellCache, CellStore};
use crate::config::SearcherConfig;
use crate::error::SearchError;
use crate::model::Model;

/// Query-scoped memo of per-split asymmetric-distance tables. Never shared across
/// searches; built fresh (empty) at the start of every `search`/`search_in` call.
#[derive(Default)]
struct DistanceCache {
    tables: [Option<Vec<Vec<f32>>>; NUM_COARSE_SPLITS],
}

impl DistanceCache {
    fn get_or_compute(
        &mut self,
        split: usize,
        model: &Model,
        x: &FeatureVector,
        coarse: CoarseCode,
    ) -> &Vec<Vec<f32>> {
        self.tables[split]
            .get_or_insert_with(|| model.subquantizer_distances(x, coarse, split))
    }
}

/// The searcher: a `Model`, a cache of inverted cells, and a `CellStore` collaborator
/// that supplies cells on cache miss. `S` is whatever the host uses to back cell
/// storage — a blockstore, a database client, an in-memory map for tests.
pub struct Searcher<S: CellStore> {
    model: Model,
    store: S,
    cells: CellCache,
    config: RwLock<SearcherConfig>,
}

impl<S: CellStore> Searcher<S> {
    pub fn new(model: Model, store: S) -> Self {
        Self {
            model,
            store,
            cells: CellCache::new(),
            config: RwLock::new(SearcherConfig::default()),
        }
    }

    pub fn with_config(model: Model, store: S, config: SearcherConfig) -> Self {
        Self {
            model,
            store,
            cells: CellCache::new(),
            config: RwLock::new(config),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn config(&self) -> SearcherConfig {
        *self.config.read()
    }

    /// Replaces the searcher's configuration. Callers are responsible for not mutating
    /// configuration concurrently with an in-flight search on the same instance — the
    /// lock only protects the record itself, not the discipline around when it's held.
    pub fn set_config(&self, config: SearcherConfig) {
        *self.config.write() = config;
    }

    pub fn set_quota(&self, quota: usize) {
        self.config.write().quota = quota;
    }

    pub fn set_dedup(&self, dedup: bool) {
        self.config.write().dedup = dedup;
    }

    pub fn set_dedup_threshold(&self, dedup_threshold: f32) {
        self.config.write().dedup_threshold = dedup_threshold;
    }

    /// Predicts the coarse code for `x`, then searches that single cell. Does not
    /// probe any other cell; see [`Searcher::search_in`] for multi-probe composition.
    pub fn search(&self, x: &FeatureVector) -> Result<Vec<Response>, SearchError> {
        let coarse = self.model.predict_coarse(x);
        self.search_in(coarse, x)
    }

    /// Scores the single cell for the caller-supplied `coarse` code against `x`.
    #[tracing::instrument(skip(self, x), fields(coarse = ?coarse))]
    pub fn search_in(
        &self,
        coarse: CoarseCode,
        x: &FeatureVector,
    ) -> Result<Vec<Response>, SearchError> {
        let k_coarse = self.model.k_coarse();
        if coarse.iter().any(|&c| c as usize >= k_coarse) {
            tracing::warn!(?coarse, k_coarse, "coarse code out of range");
            return Err(SearchError::InvalidArgument(format!(
                "coarse code {coarse:?} out of range for K_coarse={k_coarse}"
            )));
        }

        let key = lopq_types::pack_coarse_code(coarse, k_coarse);
        let cell = self
            .cells
            .get_or_fetch(key, || self.store.get_cell(coarse))
            .map_err(|e| SearchError::CellFetch(e.boxed()))?;

        let config = self.config();
        let k_fine = self.model.k_fine();

        let mut dcache = DistanceCache::default();
        let mut scored: Vec<(usize, f32)> = Vec::with_capacity(cell.len());
        for (i, fine) in cell.vectors.iter().enumerate() {
            if fine.iter().any(|&code| code as usize >= k_fine) {
                return Err(SearchError::DataCorruption(format!(
                    "cell entry {i} has a subquantizer code outside [0, {k_fine})"
                )));
            }
            let distance = self.score(x, coarse, fine, &mut dcache);
            scored.push((i, distance));
        }

        let candidates: Vec<(usize, f32)> = if config.dedup {
            let mut accepted = Vec::new();
            let mut accepted_codes: Vec<&FineCode> = Vec::new();
            for (i, distance) in scored {
                let fine = &cell.vectors[i];
                let is_duplicate = accepted_codes.iter().any(|&accepted_fine| {
                    lopq_distance::squared_l2_codes(accepted_fine, fine) <= config.dedup_threshold
                });
                if is_duplicate {
                    continue;
                }
                accepted_codes.push(fine);
                accepted.push((i, distance));
            }
            accepted
        } else {
            scored
        };

        let mut ranked = candidates;
        ranked.sort_by(|(i_a, d_a), (i_b, d_b)| {
            d_a.partial_cmp(d_b)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(i_a.cmp(i_b))
        });

        let results: Vec<Response> = ranked
            .into_iter()
            .take(config.quota)
            .map(|(i, distance)| Response::new(cell.ids[i].clone(), distance))
            .collect();
        tracing::trace!(result_count = results.len(), "search complete");
        Ok(results)
    }

    /// Sum over coarse splits and fine subsplits of the per-subquantizer table lookup,
    /// per §4.2.4. The table for each split is computed at most once per search.
    fn score(
        &self,
        x: &FeatureVector,
        coarse: CoarseCode,
        fine: &FineCode,
        dcache: &mut DistanceCache,
    ) -> f32 {
        let num_fine_splits = self.model.num_fine_splits();
        let mut total = 0.0f32;
        for s in 0..NUM_COARSE_SPLITS {
            let table = dcache.get_or_compute(s, &self.model, x, coarse);
            for t in 0..num_fine_splits {
                let code = fine[s * num_fine_splits + t] as usize;
                total += table[t][code];
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopq_types::{Cluster, RawMatrix, RawModel, RawVector};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn identity_matrix(n: usize) -> RawMatrix {
        let mut values = vec![0.0f32; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
        }
        RawMatrix {
            rows: n,
            cols: n,
            values,
        }
    }

    fn zero_matrix(rows: usize, cols: usize) -> RawMatrix {
        RawMatrix {
            rows,
            cols,
            values: vec![0.0; rows * cols],
        }
    }

    fn zero_vector(len: usize) -> RawVector {
        RawVector {
            values: vec![0.0; len],
        }
    }

    /// D=16, K_coarse=1 so coarse prediction is trivial, num_fine_splits=8 (fixed),
    /// K_fine=1 so fine prediction is trivial too — scoring exercises only the
    /// arithmetic, not any quantizer selection.
    fn trivial_model() -> Model {
        let split_len = 8;
        let subsplit_len = 1;
        let raw = RawModel {
            cs: vec![zero_matrix(1, split_len), zero_matrix(1, split_len)],
            rs: vec![identity_matrix(split_len), identity_matrix(split_len)],
            mus: vec![zero_vector(split_len), zero_vector(split_len)],
            subs: (0..16).map(|_| zero_matrix(1, subsplit_len)).collect(),
        };
        Model::load(&raw).expect("trivial model loads")
    }

    struct FixedStore {
        cluster: Cluster,
        calls: AtomicUsize,
    }

    impl CellStore for FixedStore {
        type Error = std::convert::Infallible;

        fn get_cell(&self, _coarse: CoarseCode) -> Result<Cluster, Self::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.cluster.clone())
        }
    }

    impl lopq_error::LopqError for std::convert::Infallible {
        fn code(&self) -> lopq_error::ErrorCodes {
            unreachable!("Infallible is never constructed")
        }
    }

    #[test]
    fn test_s1_trivial_single_entry() {
        let model = trivial_model();
        let store = FixedStore {
            cluster: Cluster::new(vec!["a".to_string()], vec![[0u8; 16]]),
            calls: AtomicUsize::new(0),
        };
        let searcher = Searcher::new(model, store);
        // Coarse centroid, mean, and the single subquantizer codebook row are all
        // zero and rotation is identity, so the asymmetric distance reduces to the
        // query's own squared L2 norm: 1^2 + 2^2 + 3^2 + 4^2 = 30.
        let mut x: FeatureVector = vec![0.0; 16];
        x[0..4].copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        let result = searcher.search(&x).expect("search succeeds");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "a");
        assert_eq!(result[0].distance, 30.0);
    }

    #[test]
    fn test_s3_empty_cell_returns_empty_not_error() {
        let model = trivial_model();
        let store = FixedStore {
            cluster: Cluster::new(vec![], vec![]),
            calls: AtomicUsize::new(0),
        };
        let searcher = Searcher::new(model, store);
        let x: FeatureVector = vec![0.0; 16];
        let result = searcher.search(&x).expect("search succeeds");
        assert!(result.is_empty());
    }

    #[test]
    fn test_s4_quota_caps_result_size() {
        let model = trivial_model();
        let ids: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        let vectors: Vec<FineCode> = (0..100).map(|_| [0u8; 16]).collect();
        let store = FixedStore {
            cluster: Cluster::new(ids, vectors),
            calls: AtomicUsize::new(0),
        };
        let searcher = Searcher::new(model, store);
        searcher.set_quota(5);
        let x: FeatureVector = vec![0.0; 16];
        let result = searcher.search(&x).expect("search succeeds");
        assert_eq!(result.len(), 5);
        // All entries tie at distance 0, so insertion order (ascending id) decides.
        assert_eq!(result[0].id, "0");
        assert_eq!(result[4].id, "4");
    }

    #[test]
    fn test_s5_dedup_keeps_first_accepted() {
        let model = trivial_model();
        let store = FixedStore {
            cluster: Cluster::new(
                vec!["a".to_string(), "b".to_string()],
                vec![[0u8; 16], [0u8; 16]],
            ),
            calls: AtomicUsize::new(0),
        };
        let searcher = Searcher::new(model, store);
        searcher.set_dedup(true);
        searcher.set_dedup_threshold(1e-4);
        let x: FeatureVector = vec![0.0; 16];
        let result = searcher.search(&x).expect("search succeeds");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "a");
    }

    #[test]
    fn test_s6_cell_cache_invoked_once() {
        let model = trivial_model();
        let store = FixedStore {
            cluster: Cluster::new(vec!["a".to_string()], vec![[0u8; 16]]),
            calls: AtomicUsize::new(0),
        };
        let searcher = Searcher::new(model, store);
        let x: FeatureVector = vec![0.0; 16];
        for _ in 0..3 {
            searcher.search(&x).expect("search succeeds");
        }
        assert_eq!(searcher.store.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_search_in_rejects_out_of_range_coarse_code() {
        let model = trivial_model();
        let store = FixedStore {
            cluster: Cluster::new(vec![], vec![]),
            calls: AtomicUsize::new(0),
        };
        let searcher = Searcher::new(model, store);
        let x: FeatureVector = vec![0.0; 16];
        let err = searcher.search_in([5, 0], &x).unwrap_err();
        assert!(matches!(err, SearchError::InvalidArgument(_)));
    }

    #[test]
    fn test_data_corruption_on_out_of_range_fine_code() {
        let model = trivial_model();
        let store = FixedStore {
            cluster: Cluster::new(vec!["a".to_string()], vec![[9u8; 16]]),
            calls: AtomicUsize::new(0),
        };
        let searcher = Searcher::new(model, store);
        let x: FeatureVector = vec![0.0; 16];
        let err = searcher.search(&x).unwrap_err();
        assert!(matches!(err, SearchError::DataCorruption(_)));
    }
}
