//! Query-time retrieval core for a Locally Optimized Product Quantization (LOPQ)
//! approximate-nearest-neighbor index.
//!
//! Two pieces, leaves first: [`model::Model`] is the pure numeric object — coarse
//! quantizers, per-cell residual rotations and means, fine product subquantizers — and
//! [`searcher::Searcher`] is the retrieval engine built on top of it, which owns a
//! cache of inverted cells and turns a query into a ranked, deduplicated,
//! quota-bounded list of [`lopq_types::Response`]s.
//!
//! Cell storage is out of scope: the searcher delegates to whatever implements
//! [`cache::CellStore`] on the host side.

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod searcher;

pub use cache::CellStore;
pub use config::SearcherConfig;
pub use error::SearchError;
pub use model::{Model, ModelError};
pub use searcher::Searcher;
