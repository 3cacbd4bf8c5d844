/// A single ranked search result. `distance` is the sum of per-subquantizer squared-L2
/// centroid distances — an asymmetric-distance estimate, not a square-rooted Euclidean
/// distance.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub id: String,
    pub distance: f32,
}

impl Response {
    pub fn new(id: impl Into<String>, distance: f32) -> Self {
        Self {
            id: id.into(),
            distance,
        }
    }
}
