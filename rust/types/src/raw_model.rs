//! Decoded shape of a trained LOPQ model blob.
//!
//! The on-disk/proto envelope itself is out of scope for this crate (see the model
//! crate's load path) — these structs are the already-decoded numeric payload: IEEE-754
//! single-precision values in row-major order, as described in the model's external
//! interface. Whatever deserializes the real envelope (protobuf, flatbuffers, ...) is
//! expected to populate one of these and hand it to `Model::load`.

/// A row-major matrix of `f32` values.
#[derive(Clone, Debug)]
pub struct RawMatrix {
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<f32>,
}

impl RawMatrix {
    pub fn row(&self, i: usize) -> &[f32] {
        &self.values[i * self.cols..(i + 1) * self.cols]
    }
}

/// A dense `f32` vector.
#[derive(Clone, Debug)]
pub struct RawVector {
    pub values: Vec<f32>,
}

/// The decoded fields of a trained LOPQ model.
///
/// - `cs`: one coarse centroid matrix per coarse split. Length 2.
/// - `rs`: one rotation matrix per `(split, cluster)`, flattened so index `c` belongs
///   to split `c / (len/2)` and cluster `c % (len/2)`. Length `2 * k_coarse`.
/// - `mus`: residual mean vectors, same flattening convention as `rs`.
/// - `subs`: subquantizer centroid matrices, same flattening convention as `rs` but
///   with `num_fine_splits` clusters per split instead of `k_coarse`. Length
///   `2 * num_fine_splits`.
#[derive(Clone, Debug)]
pub struct RawModel {
    pub cs: Vec<RawMatrix>,
    pub rs: Vec<RawMatrix>,
    pub mus: Vec<RawVector>,
    pub subs: Vec<RawMatrix>,
}
