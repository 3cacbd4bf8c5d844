/// Dense query/data vector. Always double precision — see the model crate for why the
/// mixed f32/f64 boundary sits at the centroid and rotation matrices, not here.
pub type FeatureVector = Vec<f64>;

/// Number of coarse splits. Baked in as a shape-time constant rather than a runtime
/// field so [`CoarseCode`] and [`FineCode`] can be stack-allocated arrays.
pub const NUM_COARSE_SPLITS: usize = 2;

/// Number of fine (product-quantizer) subsplits per coarse split, assuming the
/// conventional 8-subsplit LOPQ configuration (2 coarse splits * 8 fine subsplits = 16).
pub const NUM_FINE_SPLITS: usize = 8;

/// Total fine subquantizers: [`NUM_COARSE_SPLITS`] * [`NUM_FINE_SPLITS`].
pub const NUM_SUBQUANTIZERS: usize = NUM_COARSE_SPLITS * NUM_FINE_SPLITS;

/// One coarse cluster index per coarse split. `coarse[s] in [0, K_coarse)`.
pub type CoarseCode = [u8; NUM_COARSE_SPLITS];

/// One subquantizer code per (split, subsplit) pair, flattened as
/// `fine[s * NUM_FINE_SPLITS + t]`. `fine[i] in [0, K_fine)`.
pub type FineCode = [u8; NUM_SUBQUANTIZERS];

/// Packs a [`CoarseCode`] into a single injective cache key.
///
/// `key = c[0] * k_coarse + c[1]`. Injective as long as `c[1] < k_coarse`, which
/// holds for any code this crate produces (callers supplying external codes are
/// validated against `k_coarse` before this is used as a cache key).
pub fn pack_coarse_code(coarse: CoarseCode, k_coarse: usize) -> u64 {
    coarse[0] as u64 * k_coarse as u64 + coarse[1] as u64
}
