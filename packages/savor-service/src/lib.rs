//! Recipe retrieval and recommendation sessions over injected backends.
//!
//! [`SavorService`] runs the dual-channel retrieval, enriches fused matches into ranked
//! candidates and drives [`RecommendationSession`]s. Every backend is reached through the
//! collaborator traits below so tests and alternative deployments can swap them.

pub mod enrich;
pub mod retrieval;
pub mod retry;
pub mod session;

mod error;

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

pub use error::{Error, Result};
pub use retrieval::Retrieval;
pub use retry::RetryPolicy;
pub use savor_storage::VectorNamespace;

use savor_config::Config;
use savor_domain::{
	MatchResult, RecipeMeta, RecommendationSession, SessionSettings, SparseEmbedding,
};
use savor_providers::{embedding::HttpEmbedder, sparse::Bm25Encoder};
use savor_storage::QdrantStore;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

pub trait SparseEncoder
where
	Self: Send + Sync,
{
	fn encode_query(&self, text: &str) -> SparseEmbedding;
}

pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn query_dense<'a>(
		&'a self,
		vector: &'a [f32],
		top_k: u32,
	) -> BoxFuture<'a, Result<Vec<MatchResult>>>;

	fn query_sparse<'a>(
		&'a self,
		sparse: &'a SparseEmbedding,
		top_k: u32,
	) -> BoxFuture<'a, Result<Vec<MatchResult>>>;

	fn fetch_by_ids<'a>(
		&'a self,
		ids: &'a [String],
		namespace: VectorNamespace,
	) -> BoxFuture<'a, Result<HashMap<String, Vec<f32>>>>;
}

pub trait RecipeCatalog
where
	Self: Send + Sync,
{
	fn lookup_metadata<'a>(
		&'a self,
		ids: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, RecipeMeta>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub sparse: Arc<dyn SparseEncoder>,
	pub index: Arc<dyn VectorIndex>,
	pub catalog: Arc<dyn RecipeCatalog>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		sparse: Arc<dyn SparseEncoder>,
		index: Arc<dyn VectorIndex>,
		catalog: Arc<dyn RecipeCatalog>,
	) -> Self {
		Self { embedding, sparse, index, catalog }
	}

	/// HTTP embeddings, the local BM25 encoder and Qdrant for both index and catalog.
	pub fn from_config(cfg: &Config) -> Result<Self> {
		let embedding = Arc::new(HttpEmbedder::new(cfg.providers.embedding.clone())?);
		let sparse = Arc::new(Bm25Encoder::load(&cfg.providers.sparse)?);
		let store = Arc::new(QdrantStore::new(&cfg.storage.qdrant)?);

		Ok(Self { embedding, sparse, index: store.clone(), catalog: store })
	}
}

pub struct SavorService {
	pub cfg: Config,
	pub providers: Providers,
	pub retry: RetryPolicy,
}
impl SavorService {
	pub fn new(cfg: Config) -> Result<Self> {
		let providers = Providers::from_config(&cfg)?;

		Ok(Self::with_providers(cfg, providers))
	}

	pub fn with_providers(cfg: Config, providers: Providers) -> Self {
		let retry = RetryPolicy::from_config(&cfg.retrieval.retry);

		Self { cfg, providers, retry }
	}

	pub fn session_settings(&self) -> Result<SessionSettings> {
		Ok(SessionSettings::new(self.cfg.rerank.mmr_lambda, self.cfg.rerank.learning_rate)?)
	}

	/// A fresh `Idle` session using the configured re-ranking settings.
	pub fn new_session(&self) -> Result<RecommendationSession> {
		Ok(RecommendationSession::new(self.session_settings()?))
	}
}

impl EmbeddingProvider for HttpEmbedder {
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(HttpEmbedder::embed(self, texts).await?) })
	}
}

impl SparseEncoder for Bm25Encoder {
	fn encode_query(&self, text: &str) -> SparseEmbedding {
		Bm25Encoder::encode_query(self, text)
	}
}

impl VectorIndex for QdrantStore {
	fn query_dense<'a>(
		&'a self,
		vector: &'a [f32],
		top_k: u32,
	) -> BoxFuture<'a, Result<Vec<MatchResult>>> {
		Box::pin(async move { Ok(QdrantStore::query_dense(self, vector, top_k).await?) })
	}

	fn query_sparse<'a>(
		&'a self,
		sparse: &'a SparseEmbedding,
		top_k: u32,
	) -> BoxFuture<'a, Result<Vec<MatchResult>>> {
		Box::pin(async move { Ok(QdrantStore::query_sparse(self, sparse, top_k).await?) })
	}

	fn fetch_by_ids<'a>(
		&'a self,
		ids: &'a [String],
		namespace: VectorNamespace,
	) -> BoxFuture<'a, Result<HashMap<String, Vec<f32>>>> {
		Box::pin(async move { Ok(self.fetch_vectors(ids, namespace).await?) })
	}
}

impl RecipeCatalog for QdrantStore {
	fn lookup_metadata<'a>(
		&'a self,
		ids: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, RecipeMeta>>> {
		Box::pin(async move { Ok(self.fetch_metadata(ids).await?) })
	}
}
