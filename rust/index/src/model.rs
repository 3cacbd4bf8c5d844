//! The trained LOPQ model: coarse quantizers, per-cell residual rotations and means,
//! and fine product subquantizers — and the arithmetic that turns a query vector into
//! coarse codes, rotated residual projections, and asymmetric-distance tables.
//!
//! ## Precision
//!
//! Centroid, rotation, and subquantizer values are stored as `f32` (the wire precision
//! of a trained model). The residual/mean-shift/rotate chain in [`Model::project`] is
//! computed in `f64` throughout, upcasting `f32` operands as they're read — this
//! reproduces the reference implementation's mixed-precision arithmetic rather than
//! rounding to `f32` at each step. Because of this, rotation is applied with an
//! explicit row-times-vector loop rather than `faer`'s `Mat<f32> * ColRef<f32>`
//! operator, which would compute in `f32`.

use faer::Mat;
use lopq_error::{ErrorCodes, LopqError};
use lopq_types::{
    CoarseCode, FeatureVector, FineCode, RawModel, NUM_COARSE_SPLITS, NUM_FINE_SPLITS,
    NUM_SUBQUANTIZERS,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model shape error: {0}")]
    Shape(String),
}

impl LopqError for ModelError {
    fn code(&self) -> ErrorCodes {
        ErrorCodes::FailedPrecondition
    }
}

/// Immutable, shareable LOPQ model. Read-only after [`Model::load`]; safe to share
/// across threads without synchronization.
pub struct Model {
    k_coarse: usize,
    k_fine: usize,
    split_len: usize,
    subsplit_len: usize,
    /// `cs[split][cluster]`: coarse centroid row, length `split_len`.
    cs: [Vec<Vec<f32>>; NUM_COARSE_SPLITS],
    /// `rs[split][cluster]`: `split_len x split_len` rotation matrix.
    rs: [Vec<Mat<f32>>; NUM_COARSE_SPLITS],
    /// `mus[split][cluster]`: residual mean, length `split_len`.
    mus: [Vec<Vec<f32>>; NUM_COARSE_SPLITS],
    /// `subs[split][subsplit][code]`: subquantizer centroid row, length `subsplit_len`.
    subs: [Vec<Vec<Vec<f32>>>; NUM_COARSE_SPLITS],
}

impl Model {
    pub fn k_coarse(&self) -> usize {
        self.k_coarse
    }

    pub fn k_fine(&self) -> usize {
        self.k_fine
    }

    pub fn num_fine_splits(&self) -> usize {
        NUM_FINE_SPLITS
    }

    pub fn dim(&self) -> usize {
        self.split_len * NUM_COARSE_SPLITS
    }

    /// Validates and builds a [`Model`] from the already-decoded numeric fields of a
    /// trained model blob. The envelope that produced `raw` (proto, flatbuffers, ...)
    /// is out of scope here.
    pub fn load(raw: &RawModel) -> Result<Self, ModelError> {
        if raw.cs.len() != NUM_COARSE_SPLITS {
            return Err(ModelError::Shape(format!(
                "expected {NUM_COARSE_SPLITS} coarse centroid matrices, got {}",
                raw.cs.len()
            )));
        }
        let split_len = raw.cs[0].cols;
        let k_coarse = raw.cs[0].rows;
        for (s, mat) in raw.cs.iter().enumerate() {
            if mat.cols != split_len || mat.rows != k_coarse {
                return Err(ModelError::Shape(format!(
                    "coarse centroid matrix for split {s} has shape {}x{}, expected {k_coarse}x{split_len}",
                    mat.rows, mat.cols
                )));
            }
        }
        if k_coarse == 0 || split_len == 0 {
            return Err(ModelError::Shape(
                "coarse centroid matrices must be non-empty".to_string(),
            ));
        }

        if raw.rs.len() != NUM_COARSE_SPLITS * k_coarse {
            return Err(ModelError::Shape(format!(
                "expected {} rotation matrices, got {}",
                NUM_COARSE_SPLITS * k_coarse,
                raw.rs.len()
            )));
        }
        if raw.mus.len() != NUM_COARSE_SPLITS * k_coarse {
            return Err(ModelError::Shape(format!(
                "expected {} residual means, got {}",
                NUM_COARSE_SPLITS * k_coarse,
                raw.mus.len()
            )));
        }
        if raw.subs.len() != NUM_COARSE_SPLITS * NUM_FINE_SPLITS {
            return Err(ModelError::Shape(format!(
                "expected {} subquantizers ({NUM_COARSE_SPLITS} splits x {NUM_FINE_SPLITS} subsplits), got {}",
                NUM_COARSE_SPLITS * NUM_FINE_SPLITS,
                raw.subs.len()
            )));
        }
        if split_len % NUM_FINE_SPLITS != 0 {
            return Err(ModelError::Shape(format!(
                "split length {split_len} is not evenly divisible by {NUM_FINE_SPLITS} fine subsplits"
            )));
        }
        let subsplit_len = split_len / NUM_FINE_SPLITS;

        let mut cs: [Vec<Vec<f32>>; NUM_COARSE_SPLITS] = Default::default();
        let mut rs: [Vec<Mat<f32>>; NUM_COARSE_SPLITS] = Default::default();
        let mut mus: [Vec<Vec<f32>>; NUM_COARSE_SPLITS] = Default::default();
        let mut subs: [Vec<Vec<Vec<f32>>>; NUM_COARSE_SPLITS] = Default::default();

        for s in 0..NUM_COARSE_SPLITS {
            cs[s] = (0..k_coarse).map(|r| raw.cs[s].row(r).to_vec()).collect();

            rs[s] = Vec::with_capacity(k_coarse);
            for cluster in 0..k_coarse {
                let raw_r = &raw.rs[s * k_coarse + cluster];
                if raw_r.rows != split_len || raw_r.cols != split_len {
                    return Err(ModelError::Shape(format!(
                        "rotation matrix for split {s} cluster {cluster} has shape {}x{}, expected {split_len}x{split_len}",
                        raw_r.rows, raw_r.cols
                    )));
                }
                rs[s].push(Mat::from_fn(split_len, split_len, |i, j| raw_r.row(i)[j]));
            }

            mus[s] = Vec::with_capacity(k_coarse);
            for cluster in 0..k_coarse {
                let raw_mu = &raw.mus[s * k_coarse + cluster];
                if raw_mu.values.len() != split_len {
                    return Err(ModelError::Shape(format!(
                        "residual mean for split {s} cluster {cluster} has length {}, expected {split_len}",
                        raw_mu.values.len()
                    )));
                }
                mus[s].push(raw_mu.values.clone());
            }
        }

        let k_fine = raw.subs[0].rows;
        if k_fine == 0 {
            return Err(ModelError::Shape(
                "subquantizer codebooks must be non-empty".to_string(),
            ));
        }
        for s in 0..NUM_COARSE_SPLITS {
            subs[s] = Vec::with_capacity(NUM_FINE_SPLITS);
            for t in 0..NUM_FINE_SPLITS {
                let raw_sub = &raw.subs[s * NUM_FINE_SPLITS + t];
                if raw_sub.rows != k_fine || raw_sub.cols != subsplit_len {
                    return Err(ModelError::Shape(format!(
                        "subquantizer for split {s} subsplit {t} has shape {}x{}, expected {k_fine}x{subsplit_len}",
                        raw_sub.rows, raw_sub.cols
                    )));
                }
                subs[s].push((0..k_fine).map(|r| raw_sub.row(r).to_vec()).collect());
            }
        }

        tracing::info!(
            k_coarse,
            k_fine,
            split_len,
            dim = split_len * NUM_COARSE_SPLITS,
            "loaded LOPQ model"
        );
        Ok(Model {
            k_coarse,
            k_fine,
            split_len,
            subsplit_len,
            cs,
            rs,
            mus,
            subs,
        })
    }

    /// Coarse code: for each split, the row of that split's coarse centroid matrix
    /// closest to the query in squared L2. Ties break toward the lower row index.
    pub fn predict_coarse(&self, x: &FeatureVector) -> CoarseCode {
        let mut out = [0u8; NUM_COARSE_SPLITS];
        for s in 0..NUM_COARSE_SPLITS {
            let cx = &x[s * self.split_len..(s + 1) * self.split_len];
            out[s] = self.nearest_row(cx, &self.cs[s]) as u8;
        }
        out
    }

    /// Projects `x` into the rotated residual space of the coarse cell `coarse`:
    /// subtract the coarse centroid, subtract the cell's residual mean, then rotate
    /// by the cell's rotation matrix. Returns a length-`dim()` vector, split by split.
    pub fn project(&self, x: &FeatureVector, coarse: CoarseCode) -> Vec<f64> {
        let mut out = vec![0.0f64; self.dim()];
        for s in 0..NUM_COARSE_SPLITS {
            let cluster = coarse[s] as usize;
            let cx = &x[s * self.split_len..(s + 1) * self.split_len];
            let centroid = &self.cs[s][cluster];
            let mu = &self.mus[s][cluster];

            let residual: Vec<f64> = (0..self.split_len)
                .map(|i| cx[i] - centroid[i] as f64 - mu[i] as f64)
                .collect();

            let rotation = &self.rs[s][cluster];
            let dst = &mut out[s * self.split_len..(s + 1) * self.split_len];
            for i in 0..self.split_len {
                let mut acc = 0.0f64;
                for j in 0..self.split_len {
                    acc += rotation[(i, j)] as f64 * residual[j];
                }
                dst[i] = acc;
            }
        }
        out
    }

    /// Fine (product-quantization) code: projects `x`, then for each split and
    /// fine subsplit emits the subquantizer row index closest to that segment.
    pub fn predict_fine(&self, x: &FeatureVector, coarse: CoarseCode) -> FineCode {
        let px = self.project(x, coarse);
        let mut out = [0u8; NUM_SUBQUANTIZERS];
        for s in 0..NUM_COARSE_SPLITS {
            let seg = &px[s * self.split_len..(s + 1) * self.split_len];
            for t in 0..NUM_FINE_SPLITS {
                let sub = &seg[t * self.subsplit_len..(t + 1) * self.subsplit_len];
                let code = self.nearest_row_f64(sub, &self.subs[s][t]);
                out[s * NUM_FINE_SPLITS + t] = code as u8;
            }
        }
        out
    }

    /// Asymmetric-distance table for `x` against every subquantizer of split `s` in
    /// the coarse cell `coarse`: `table[t][k]` is the squared L2 distance between the
    /// `t`-th segment of the projection and row `k` of that subsplit's codebook.
    pub fn subquantizer_distances(
        &self,
        x: &FeatureVector,
        coarse: CoarseCode,
        split: usize,
    ) -> Vec<Vec<f32>> {
        let px = self.project(x, coarse);
        let seg = &px[split * self.split_len..(split + 1) * self.split_len];
        (0..NUM_FINE_SPLITS)
            .map(|t| {
                let sub = &seg[t * self.subsplit_len..(t + 1) * self.subsplit_len];
                self.subs[split][t]
                    .iter()
                    .map(|row| lopq_distance::squared_l2_query_centroid(sub, row) as f32)
                    .collect()
            })
            .collect()
    }

    /// Row index of `rows` minimizing squared L2 distance to `query` (f64 query,
    /// f32 rows). Ties break toward the lower index.
    fn nearest_row(&self, query: &[f64], rows: &[Vec<f32>]) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, row) in rows.iter().enumerate() {
            let d = lopq_distance::squared_l2_query_centroid(query, row);
            if d < best_dist {
                best_dist = d;
                best = i;
            }
        }
        best
    }

    fn nearest_row_f64(&self, query: &[f64], rows: &[Vec<f32>]) -> usize {
        self.nearest_row(query, rows)
    }
}
