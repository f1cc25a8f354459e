//! The embedding adapter contract (spec §6 "Embeddings"): the storage
//! engine's vector collections store raw `f64` vectors and are
//! agnostic to how they were produced. Callers that want to embed text
//! on insert/query implement this trait and hand it to the dispatcher.

use reactive_core::errors::EngineResult;

pub trait EmbeddingAdapter: Send + Sync {
    /// Embed a single piece of text into a fixed-length vector.
    fn embed(&self, text: &str) -> EngineResult<Vec<f64>>;

    /// The vector length this adapter always produces. Collections
    /// created through this adapter are expected to hold vectors of
    /// exactly this length.
    fn dimension(&self) -> usize;

    /// Batch embedding, with a naive default that calls `embed` in a
    /// loop. Adapters backed by a batching API override this.
    fn embed_batch(&self, texts: &[String]) -> EngineResult<Vec<Vec<f64>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstantAdapter;
    impl EmbeddingAdapter for ConstantAdapter {
        fn embed(&self, _text: &str) -> EngineResult<Vec<f64>> {
            Ok(vec![1.0, 0.0, 0.0])
        }
        fn dimension(&self) -> usize {
            3
        }
    }

    #[test]
    fn default_embed_batch_calls_embed_per_item() {
        let adapter = ConstantAdapter;
        let out = adapter
            .embed_batch(&["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], vec![1.0, 0.0, 0.0]);
    }
}
