//! Searcher configuration: quota, dedup, and the dedup threshold. Mutable only outside
//! an in-flight search — see [`crate::searcher::Searcher::set_config`].

/// Recognized searcher options, all with documented defaults.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearcherConfig {
    /// Maximum number of [`lopq_types::Response`]s returned by a search.
    pub quota: usize,
    /// If true, drop a candidate whose FineCode lies within `dedup_threshold` squared-L2
    /// of an already-accepted candidate's FineCode.
    pub dedup: bool,
    /// Squared-L2 radius used by deduplication, in FineCode-byte space.
    pub dedup_threshold: f32,
}

impl Default for SearcherConfig {
    fn default() -> Self {
        Self {
            quota: 12,
            dedup: false,
            dedup_threshold: 1e-4,
        }
    }
}
