use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub rerank: Rerank,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
	/// Sessions untouched for this long are dropped.
	#[serde(default = "default_session_idle_ttl_secs")]
	pub session_idle_ttl_secs: u64,
	/// Live session cap; the least recently used session is evicted beyond it.
	#[serde(default = "default_max_sessions")]
	pub max_sessions: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	/// Collection holding the dense named vectors and the recipe payload.
	pub dense_collection: String,
	/// Collection holding the BM25 sparse vectors.
	pub sparse_collection: String,
	pub vector_dim: u32,
	#[serde(default = "default_ingredients_vector")]
	pub ingredients_vector: String,
	#[serde(default = "default_content_vector")]
	pub content_vector: String,
	#[serde(default = "default_sparse_vector")]
	pub sparse_vector: String,
	#[serde(default = "default_qdrant_timeout_ms")]
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	#[serde(default)]
	pub sparse: SparseProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SparseProviderConfig {
	/// JSON file with fitted BM25 parameters. Without it the encoder starts empty.
	pub params_path: Option<String>,
	/// Refuse to start when the params file is missing or unreadable.
	pub strict: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	/// Matches requested from each index.
	pub top_k: u32,
	/// Fused results returned after RRF. Follows `top_k` when unset.
	pub top_n: Option<u32>,
	pub rrf_k: u32,
	pub similarity_threshold: f32,
	pub retry: Retry,
}
impl Retrieval {
	pub fn fused_limit(&self) -> u32 {
		self.top_n.unwrap_or(self.top_k)
	}
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			top_k: 50,
			top_n: None,
			rrf_k: 60,
			similarity_threshold: 0.7,
			retry: Retry::default(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Retry {
	pub max_attempts: u32,
	pub base_delay_ms: u64,
	pub max_delay_ms: u64,
	pub call_timeout_ms: u64,
}
impl Default for Retry {
	fn default() -> Self {
		Self { max_attempts: 3, base_delay_ms: 1_000, max_delay_ms: 10_000, call_timeout_ms: 15_000 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Rerank {
	pub mmr_lambda: f32,
	pub learning_rate: f32,
	/// Weight of the ingredients vector in the final ranking vector.
	pub blend_lambda: f32,
}
impl Default for Rerank {
	fn default() -> Self {
		Self { mmr_lambda: 0.7, learning_rate: 0.8, blend_lambda: 0.9 }
	}
}

fn default_session_idle_ttl_secs() -> u64 {
	1_800
}

fn default_max_sessions() -> usize {
	10_000
}

fn default_ingredients_vector() -> String {
	"ingredients".to_string()
}

fn default_content_vector() -> String {
	"content".to_string()
}

fn default_sparse_vector() -> String {
	"bm25".to_string()
}

fn default_qdrant_timeout_ms() -> u64 {
	15_000
}
