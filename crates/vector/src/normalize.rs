//! Fixed-width coercion of embedding vectors
//!
//! Embedding models may change their output width between versions while the
//! stored column width stays fixed, so every vector is coerced before it is
//! written or compared.

/// Truncate or zero-pad `vector` to exactly `target_dim` elements
pub fn normalize(mut vector: Vec<f32>, target_dim: usize) -> Vec<f32> {
    vector.resize(target_dim, 0.0);
    vector
}
