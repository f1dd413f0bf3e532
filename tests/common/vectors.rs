use hiddb_client::scenario::REFERENCE_VECTORS;

/// The three vectors of the reference run, as owned values.
pub fn reference_vectors() -> Vec<(u64, Vec<f64>)> {
    REFERENCE_VECTORS
        .iter()
        .map(|(user, v)| (*user, v.to_vec()))
        .collect()
}

/// A deterministic vector of length `dims`, distinct per `seed`.
pub fn ramp_vector(dims: usize, seed: u64) -> Vec<f64> {
    (0..dims).map(|i| seed as f64 + i as f64 * 0.25).collect()
}
