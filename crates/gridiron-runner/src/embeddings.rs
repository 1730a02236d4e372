//! Embeddings provider client.
//!
//! Called per memory write and per retrieval query. Vectors are
//! 1536-dimensional; a response with any other dimension is rejected so
//! a provider change can never silently corrupt the vector index.
//! Retrieval falls back to text similarity when an embedding is absent,
//! so embedding failures degrade quality, not availability.

use crate::config::EmbeddingsConfig;
use crate::error::RunnerError;

/// Required embedding dimension.
pub const EMBEDDING_DIM: usize = 1_536;

/// HTTP client for the embeddings provider.
pub struct EmbeddingsClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl EmbeddingsClient {
    /// Build a client from configuration.
    pub fn new(config: &EmbeddingsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// Embed one text into a 1536-dim vector.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Embeddings`] on HTTP failure, a malformed
    /// payload, or a wrong-dimension vector.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, RunnerError> {
        let url = format!("{}/embeddings", self.api_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| RunnerError::Embeddings(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RunnerError::Embeddings(format!("provider returned {status}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RunnerError::Embeddings(format!("response parse failed: {e}")))?;

        let vector = extract_embedding(&json)?;
        validate_dimension(&vector)?;
        Ok(vector)
    }
}

/// Extract `data[0].embedding` from the provider response.
fn extract_embedding(json: &serde_json::Value) -> Result<Vec<f32>, RunnerError> {
    let values = json
        .get("data")
        .and_then(|d| d.get(0))
        .and_then(|e| e.get("embedding"))
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| {
            RunnerError::Embeddings(String::from("response missing data[0].embedding"))
        })?;

    let mut vector = Vec::with_capacity(values.len());
    for v in values {
        let f = v
            .as_f64()
            .ok_or_else(|| RunnerError::Embeddings(String::from("non-numeric component")))?;
        #[allow(clippy::cast_possible_truncation)]
        vector.push(f as f32);
    }
    Ok(vector)
}

/// Reject vectors that are not exactly [`EMBEDDING_DIM`]-dimensional.
fn validate_dimension(vector: &[f32]) -> Result<(), RunnerError> {
    if vector.len() != EMBEDDING_DIM {
        return Err(RunnerError::Embeddings(format!(
            "expected {EMBEDDING_DIM} dimensions, got {}",
            vector.len()
        )));
    }
    Ok(())
}

/// Combine content and context embeddings into the retrieval vector.
///
/// Component-wise mean, renormalized to unit length so cosine distances
/// stay comparable across memories.
pub fn combine_embeddings(content: &[f32], context: &[f32]) -> Option<Vec<f32>> {
    if content.len() != context.len() || content.is_empty() {
        return None;
    }
    let mut combined: Vec<f32> = content
        .iter()
        .zip(context.iter())
        .map(|(a, b)| (a + b) / 2.0)
        .collect();

    let norm: f32 = combined.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut combined {
            *x /= norm;
        }
    }
    Some(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_embedding_happy_path() {
        let json = serde_json::json!({
            "data": [{"embedding": [0.1, 0.2, 0.3]}]
        });
        let vector = extract_embedding(&json);
        assert!(vector.is_ok_and(|v| v.len() == 3));
    }

    #[test]
    fn extract_embedding_missing_data() {
        let json = serde_json::json!({"error": "overloaded"});
        assert!(extract_embedding(&json).is_err());
    }

    #[test]
    fn wrong_dimension_rejected() {
        let short = vec![0.1_f32; 10];
        assert!(validate_dimension(&short).is_err());
        let exact = vec![0.1_f32; EMBEDDING_DIM];
        assert!(validate_dimension(&exact).is_ok());
    }

    #[test]
    fn combine_is_unit_length() {
        let a = vec![1.0_f32, 0.0];
        let b = vec![0.0_f32, 1.0];
        let combined = combine_embeddings(&a, &b);
        assert!(combined.is_some());
        if let Some(c) = combined {
            let norm: f32 = c.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn combine_rejects_mismatched_lengths() {
        let a = vec![1.0_f32, 0.0];
        let b = vec![0.0_f32];
        assert!(combine_embeddings(&a, &b).is_none());
    }
}
