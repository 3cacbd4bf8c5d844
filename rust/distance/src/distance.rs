/// Squared Euclidean (L2) distance between two equal-length slices, accumulated in
/// `f64`. Not square-rooted — callers that need a true distance take the square root
/// themselves; the retrieval core never does, since ranking only needs the ordering.
pub fn squared_l2(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0;
    for i in 0..a.len() {
        let d = a[i] - b[i];
        sum += d * d;
    }
    sum
}

/// Squared L2 distance between an `f64` query segment and an `f32` centroid row,
/// upcasting the centroid so the subtraction happens at the query's precision.
pub fn squared_l2_query_centroid(query: &[f64], centroid: &[f32]) -> f64 {
    debug_assert_eq!(query.len(), centroid.len());
    let mut sum = 0.0;
    for i in 0..query.len() {
        let d = query[i] - centroid[i] as f64;
        sum += d * d;
    }
    sum
}

/// Squared L2 distance between two byte-code vectors, treating each byte as a scalar.
/// Used as the cheap FineCode-space proxy for deduplication — not a reconstructed-vector
/// distance.
pub fn squared_l2_codes(a: &[u8], b: &[u8]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0f32;
    for i in 0..a.len() {
        let d = a[i] as f32 - b[i] as f32;
        sum += d * d;
    }
    sum
}
