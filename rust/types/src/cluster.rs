use std::mem::size_of_val;

use crate::FineCode;

/// An inverted cell: every indexed item assigned to one coarse code, stored as two
/// parallel sequences of equal length. `ids[i]` is the identifier of the item whose
/// compressed representation is `vectors[i]`.
#[derive(Clone, Debug, Default)]
pub struct Cluster {
    pub ids: Vec<String>,
    pub vectors: Vec<FineCode>,
}

impl Cluster {
    pub fn new(ids: Vec<String>, vectors: Vec<FineCode>) -> Self {
        Self { ids, vectors }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Approximate heap footprint, for cache accounting and tracing fields.
    pub fn compute_size(&self) -> usize {
        self.ids.iter().map(|id| id.len()).sum::<usize>() + size_of_val(self.vectors.as_slice())
    }
}
