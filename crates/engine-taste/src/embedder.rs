use sha2::{Digest, Sha256};

/// The "single configured encoder" of spec §4.6. Production wiring plugs in a
/// local sentence-transformer model at the process boundary; this crate only
/// depends on the trait so the store and filter logic stay model-agnostic.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Vec<f32>;
    fn dimensions(&self) -> usize;
}

/// Deterministic, model-free encoder for tests and cold environments without
/// a loaded model: hashes overlapping word shingles into a fixed-size
/// accumulator and normalizes the result. Never used for anything but test
/// doubles and the default config, same role the teacher gives `EmbedFn`
/// closures that stand in for a real embedding call in its own test suite.
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Self {
        assert!(dims > 0, "embedding dimensionality must be positive");
        Self { dims }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut acc = vec![0f32; self.dims];
        let normalized = text.to_lowercase();
        for word in normalized.split_whitespace() {
            let mut hasher = Sha256::new();
            hasher.update(word.as_bytes());
            let digest = hasher.finalize();
            for (i, byte) in digest.iter().enumerate() {
                acc[i % self.dims] += *byte as f32;
            }
        }
        let norm = acc.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in acc.iter_mut() {
                *v /= norm;
            }
        }
        acc
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Euclidean distance between two equal-length vectors.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (*x - *y) as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// `s = 1/(1+distance)`, normalizing L2 distance into `[0, 1]` (spec §4.6).
pub fn similarity(a: &[f32], b: &[f32]) -> f64 {
    1.0 / (1.0 + l2_distance(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_has_similarity_one() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("the federal funds rate");
        let b = embedder.embed("the federal funds rate");
        assert!((similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unrelated_text_has_lower_similarity() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("the federal funds rate influences mortgage pricing");
        let b = embedder.embed("bananas are a good source of potassium");
        let same = embedder.embed("the federal funds rate influences mortgage pricing");
        assert!(similarity(&a, &same) > similarity(&a, &b));
    }
}
