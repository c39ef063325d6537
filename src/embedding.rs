//! Embedding service abstraction and implementations.
//!
//! Defines the [`EmbeddingService`] trait and concrete backends:
//! - **[`DisabledService`]** — returns errors; used when embeddings are not
//!   configured (catalog-only installs).
//! - **[`OpenAiService`]** — calls a remote embeddings API with retry and
//!   backoff.
//! - **[`HashService`]** — deterministic, offline token-bag vectors. Texts
//!   sharing vocabulary land near each other, which is enough for smoke
//!   tests and air-gapped development.
//!
//! Also provides vector utilities:
//! - [`vec_to_blob`] / [`blob_to_vec`] — little-endian f32 BLOB codec for
//!   SQLite storage
//! - [`cosine_similarity`] — similarity between two stored vectors
//!
//! # Retry Strategy
//!
//! The OpenAI backend uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::error::CatalogError;

/// An embedding backend: maps a text prompt to a fixed-dimension vector.
///
/// Implementations own their model or client state; callers hold the
/// service as a trait object and never touch backend globals. One call is
/// kept in flight at a time by the indexer, and the same query-embedding
/// path serves the search engine.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `768`).
    fn dims(&self) -> usize;
    /// Embed one text. Deterministic for a fixed model version.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CatalogError>;
}

/// Create the appropriate [`EmbeddingService`] based on configuration.
///
/// | Config value | Backend |
/// |--------------|---------|
/// | `"disabled"` | [`DisabledService`] |
/// | `"openai"`   | [`OpenAiService`] |
/// | `"hash"`     | [`HashService`] |
pub fn create_service(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingService>, CatalogError> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledService)),
        "openai" => Ok(Arc::new(OpenAiService::new(config)?)),
        "hash" => Ok(Arc::new(HashService::new(config.dims.unwrap_or(256)))),
        other => Err(CatalogError::configuration(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ Disabled service ============

/// A no-op backend that always returns errors.
///
/// Used when `embedding.provider = "disabled"`: loading catalogs works, but
/// indexing and semantic queries fail with a descriptive message.
pub struct DisabledService;

#[async_trait]
impl EmbeddingService for DisabledService {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, CatalogError> {
        Err(CatalogError::embedding(
            "Embedding provider is disabled. Set [embedding] provider in config.",
        ))
    }
}

// ============ OpenAI service ============

/// Embedding backend using the OpenAI embeddings API.
///
/// Calls `POST /v1/embeddings` with the configured model. Requires the
/// `OPENAI_API_KEY` environment variable.
pub struct OpenAiService {
    model: String,
    dims: usize,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAiService {
    /// # Errors
    ///
    /// Returns a configuration error if `model` or `dims` is not set, or if
    /// `OPENAI_API_KEY` is not in the environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, CatalogError> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| CatalogError::configuration("embedding.model required for OpenAI"))?;
        let dims = config
            .dims
            .ok_or_else(|| CatalogError::configuration("embedding.dims required for OpenAI"))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(CatalogError::configuration(
                "OPENAI_API_KEY environment variable not set",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CatalogError::embedding(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            model,
            dims,
            max_retries: config.max_retries,
            client,
        })
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, CatalogError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| CatalogError::configuration("OPENAI_API_KEY not set"))?;

        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });

        let mut last_err: Option<CatalogError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post("https://api.openai.com/v1/embeddings")
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await.map_err(|e| {
                            CatalogError::embedding(format!("Invalid embeddings response: {}", e))
                        })?;
                        return parse_embedding_response(&json);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(CatalogError::embedding(format!(
                            "Embeddings API error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(CatalogError::embedding(format!(
                        "Embeddings API error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(CatalogError::embedding(format!("Request failed: {}", e)));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| CatalogError::embedding("Embedding failed after retries")))
    }
}

#[async_trait]
impl EmbeddingService for OpenAiService {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CatalogError> {
        debug!(model = %self.model, chars = text.len(), "embedding text");
        self.request_embedding(text).await
    }
}

/// Extract the first `data[].embedding` array from an embeddings response.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<f32>, CatalogError> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| CatalogError::embedding("Invalid embeddings response: missing data"))?;

    Ok(embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

// ============ Hash service ============

/// Deterministic offline backend: a hashed bag-of-words projection.
///
/// Each lowercased alphanumeric token hashes to one of `dims` buckets and
/// the bucket counts are L2-normalized, so texts with overlapping
/// vocabulary score higher cosine similarity than unrelated texts. Not a
/// semantic model, but stable across runs and good enough to exercise the
/// full index-then-search pipeline without network access.
pub struct HashService {
    dims: usize,
}

impl HashService {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() % self.dims as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for x in &mut vector {
                *x /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl EmbeddingService for HashService {
    fn model_name(&self) -> &str {
        "hash-bag"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CatalogError> {
        Ok(self.vectorize(text))
    }
}

// ============ Vector utilities ============

/// Encode a float vector as a BLOB of little-endian f32 bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector. Reverses [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity between two vectors, in `[-1.0, 1.0]`.
///
/// Returns `None` for empty vectors or vectors of different lengths, which
/// the search engine surfaces as an unscored result rather than an error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f64::EPSILON {
        return None;
    }

    Some(dot / denom)
}
