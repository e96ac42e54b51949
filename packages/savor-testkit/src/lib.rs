//! In-memory backends and a ready-made configuration for service and API tests.

use std::{
	collections::HashMap,
	sync::{
		Mutex,
		atomic::{AtomicBool, AtomicU32, Ordering},
	},
};

use savor_config::{
	Config, EmbeddingProviderConfig, Providers as ProviderSection, Qdrant, Rerank, Retrieval,
	Retry, Service, SparseProviderConfig, Storage,
};
use savor_domain::{MatchResult, RecipeMeta, SparseEmbedding, vector::cosine_similarity};
use savor_service::{
	BoxFuture, EmbeddingProvider, Error, RecipeCatalog, Result, SparseEncoder, VectorIndex,
	VectorNamespace,
};

/// Configuration with fast retries and the given vector dimensionality.
pub fn test_config(vector_dim: u32) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
			session_idle_ttl_secs: 60,
			max_sessions: 64,
		},
		storage: Storage {
			qdrant: Qdrant {
				url: "http://127.0.0.1:6334".to_string(),
				dense_collection: "recipes_dense".to_string(),
				sparse_collection: "recipes_sparse".to_string(),
				vector_dim,
				ingredients_vector: "ingredients".to_string(),
				content_vector: "content".to_string(),
				sparse_vector: "bm25".to_string(),
				timeout_ms: 1_000,
			},
		},
		providers: ProviderSection {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1".to_string(),
				api_key: "test-key".to_string(),
				path: "/embeddings".to_string(),
				model: "test-embedding".to_string(),
				dimensions: vector_dim,
				timeout_ms: 1_000,
				default_headers: serde_json::Map::new(),
			},
			sparse: SparseProviderConfig::default(),
		},
		retrieval: Retrieval {
			retry: Retry { max_attempts: 3, base_delay_ms: 1, max_delay_ms: 4, call_timeout_ms: 1_000 },
			..Retrieval::default()
		},
		rerank: Rerank::default(),
	}
}

/// Returns the same vector for every text. The first `failures` calls fail.
pub struct StubEmbedding {
	vector: Vec<f32>,
	failures: AtomicU32,
	calls: AtomicU32,
}
impl StubEmbedding {
	pub fn new(vector: Vec<f32>) -> Self {
		Self::failing(vector, 0)
	}

	pub fn failing(vector: Vec<f32>, failures: u32) -> Self {
		Self { vector, failures: AtomicU32::new(failures), calls: AtomicU32::new(0) }
	}

	pub fn calls(&self) -> u32 {
		self.calls.load(Ordering::SeqCst)
	}
}
impl EmbeddingProvider for StubEmbedding {
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let failing = self
			.failures
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
			.is_ok();
		let vectors = vec![self.vector.clone(); texts.len()];

		Box::pin(async move {
			if failing {
				return Err(Error::Provider { message: "Embedding backend unavailable.".to_string() });
			}

			Ok(vectors)
		})
	}
}

/// Encodes every query to one fixed sparse vector.
pub struct StubSparse {
	embedding: SparseEmbedding,
}
impl StubSparse {
	pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Self {
		Self { embedding: SparseEmbedding { indices, values } }
	}

	pub fn empty() -> Self {
		Self { embedding: SparseEmbedding::default() }
	}
}
impl SparseEncoder for StubSparse {
	fn encode_query(&self, _text: &str) -> SparseEmbedding {
		self.embedding.clone()
	}
}

/// One stored recipe. `lexical_score` places it in sparse results when set.
#[derive(Debug, Clone)]
pub struct StoredRecipe {
	pub id: String,
	pub ingredients: Vec<f32>,
	pub content: Vec<f32>,
	pub lexical_score: Option<f32>,
	pub category: Option<String>,
	pub meta: Option<RecipeMeta>,
}
impl StoredRecipe {
	pub fn new(id: &str, ingredients: Vec<f32>, content: Vec<f32>) -> Self {
		Self {
			id: id.to_string(),
			ingredients,
			content,
			lexical_score: None,
			category: None,
			meta: Some(RecipeMeta { title: Some(format!("Recipe {id}")), ..RecipeMeta::default() }),
		}
	}

	pub fn lexical(mut self, score: f32) -> Self {
		self.lexical_score = Some(score);

		self
	}

	pub fn without_meta(mut self) -> Self {
		self.meta = None;

		self
	}
}

/// Brute-force index and catalog over a fixed recipe list.
#[derive(Default)]
pub struct InMemoryIndex {
	recipes: Vec<StoredRecipe>,
	pub fail_dense: AtomicBool,
	pub fail_sparse: AtomicBool,
	pub fail_fetch: AtomicBool,
	pub fail_catalog: AtomicBool,
	dense_calls: AtomicU32,
	sparse_calls: AtomicU32,
	fetches: Mutex<Vec<(VectorNamespace, Vec<String>)>>,
}
impl InMemoryIndex {
	pub fn new(recipes: Vec<StoredRecipe>) -> Self {
		Self { recipes, ..Self::default() }
	}

	pub fn dense_calls(&self) -> u32 {
		self.dense_calls.load(Ordering::SeqCst)
	}

	pub fn sparse_calls(&self) -> u32 {
		self.sparse_calls.load(Ordering::SeqCst)
	}

	/// Every `fetch_by_ids` request seen so far.
	pub fn fetches(&self) -> Vec<(VectorNamespace, Vec<String>)> {
		self.fetches.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	fn unavailable(what: &str) -> Error {
		Error::Storage { message: format!("{what} unavailable.") }
	}
}
impl VectorIndex for InMemoryIndex {
	fn query_dense<'a>(
		&'a self,
		vector: &'a [f32],
		top_k: u32,
	) -> BoxFuture<'a, Result<Vec<MatchResult>>> {
		self.dense_calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			if self.fail_dense.load(Ordering::SeqCst) {
				return Err(Self::unavailable("Dense index"));
			}

			let mut scored: Vec<(f32, &StoredRecipe)> = self
				.recipes
				.iter()
				.map(|recipe| (cosine_similarity(vector, &recipe.ingredients).unwrap_or(0.0), recipe))
				.collect();

			scored.sort_by(|a, b| b.0.total_cmp(&a.0));

			Ok(scored
				.into_iter()
				.take(top_k as usize)
				.map(|(score, recipe)| MatchResult {
					id: recipe.id.clone(),
					score,
					similarity: Some(score),
					category: recipe.category.clone(),
					values: Some(recipe.ingredients.clone()),
				})
				.collect())
		})
	}

	fn query_sparse<'a>(
		&'a self,
		_sparse: &'a SparseEmbedding,
		top_k: u32,
	) -> BoxFuture<'a, Result<Vec<MatchResult>>> {
		self.sparse_calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			if self.fail_sparse.load(Ordering::SeqCst) {
				return Err(Self::unavailable("Sparse index"));
			}

			let mut scored: Vec<(f32, &StoredRecipe)> = self
				.recipes
				.iter()
				.filter_map(|recipe| Some((recipe.lexical_score?, recipe)))
				.collect();

			scored.sort_by(|a, b| b.0.total_cmp(&a.0));

			Ok(scored
				.into_iter()
				.take(top_k as usize)
				.map(|(score, recipe)| MatchResult {
					id: recipe.id.clone(),
					score,
					similarity: None,
					category: recipe.category.clone(),
					values: None,
				})
				.collect())
		})
	}

	fn fetch_by_ids<'a>(
		&'a self,
		ids: &'a [String],
		namespace: VectorNamespace,
	) -> BoxFuture<'a, Result<HashMap<String, Vec<f32>>>> {
		self.fetches.lock().unwrap_or_else(|err| err.into_inner()).push((namespace, ids.to_vec()));

		Box::pin(async move {
			if self.fail_fetch.load(Ordering::SeqCst) {
				return Err(Self::unavailable("Vector lookup"));
			}

			Ok(self
				.recipes
				.iter()
				.filter(|recipe| ids.contains(&recipe.id))
				.map(|recipe| {
					let values = match namespace {
						VectorNamespace::Ingredients => recipe.ingredients.clone(),
						VectorNamespace::FullContent => recipe.content.clone(),
					};

					(recipe.id.clone(), values)
				})
				.collect())
		})
	}
}
impl RecipeCatalog for InMemoryIndex {
	fn lookup_metadata<'a>(
		&'a self,
		ids: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, RecipeMeta>>> {
		Box::pin(async move {
			if self.fail_catalog.load(Ordering::SeqCst) {
				return Err(Self::unavailable("Catalog"));
			}

			Ok(self
				.recipes
				.iter()
				.filter(|recipe| ids.contains(&recipe.id))
				.filter_map(|recipe| Some((recipe.id.clone(), recipe.meta.clone()?)))
				.collect())
		})
	}
}
