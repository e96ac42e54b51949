use std::collections::HashMap;

use crate::{Error, Result, SavorService, VectorNamespace};
use savor_domain::{
	FusedMatch, FusionSource, MatchResult,
	fusion::{apply_adaptive_threshold, rrf_fuse},
	vector::cosine_similarity,
};

/// Fused matches for one query together with the query's dense embedding.
#[derive(Debug, Clone)]
pub struct Retrieval {
	pub query_vector: Vec<f32>,
	pub matches: Vec<FusedMatch>,
}

impl SavorService {
	/// Dense and sparse retrieval fused with RRF, sparse list first.
	///
	/// Feeding the sparse list first means a recipe ranked only lexically wins an equal-score tie
	/// against one ranked only densely. Dense-first ordering is deliberately not used.
	///
	/// A failed channel contributes an empty list. Only when both channels fail does the call
	/// fail with `TransientBackendFailure`.
	pub async fn retrieve_matches(&self, query: &str) -> Result<Retrieval> {
		let query = query.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "Query must not be empty.".to_string() });
		}

		let query_vector = self.embed_query(query).await?;
		let sparse_query = self.providers.sparse.encode_query(query);
		let top_k = self.cfg.retrieval.top_k;
		let dense_branch = self.retry.run("dense query", || {
			self.providers.index.query_dense(&query_vector, top_k)
		});
		let sparse_branch = async {
			if sparse_query.is_empty() {
				tracing::debug!("Query has no sparse terms. Skipping sparse channel.");

				return Ok(Vec::new());
			}

			self.retry
				.run("sparse query", || self.providers.index.query_sparse(&sparse_query, top_k))
				.await
		};
		let (dense, sparse) = tokio::join!(dense_branch, sparse_branch);
		let (dense, mut sparse) = match (dense, sparse) {
			(Ok(dense), Ok(sparse)) => (dense, sparse),
			(Ok(dense), Err(err)) => {
				tracing::warn!(error = %err, "Sparse channel failed. Using dense matches only.");

				(dense, Vec::new())
			},
			(Err(err), Ok(sparse)) => {
				tracing::warn!(error = %err, "Dense channel failed. Using sparse matches only.");

				(Vec::new(), sparse)
			},
			(Err(dense_err), Err(sparse_err)) =>
				return Err(Error::TransientBackendFailure {
					message: format!(
						"Dense and sparse retrieval both failed. Dense: {dense_err}. Sparse: {sparse_err}."
					),
				}),
		};
		let sparse_scored = self.attach_sparse_similarity(&query_vector, &dense, &mut sparse).await;
		let threshold = self.cfg.retrieval.similarity_threshold;
		let dense_count = dense.len();
		let sparse_count = sparse.len();
		let dense = apply_adaptive_threshold(dense, threshold);
		let sparse = if sparse_scored { apply_adaptive_threshold(sparse, threshold) } else { sparse };
		let matches = rrf_fuse(
			&[(FusionSource::Sparse, sparse.as_slice()), (FusionSource::Dense, dense.as_slice())],
			self.cfg.retrieval.rrf_k,
			self.cfg.retrieval.fused_limit(),
		);

		tracing::info!(
			dense = dense_count,
			dense_kept = dense.len(),
			sparse = sparse_count,
			sparse_kept = sparse.len(),
			fused = matches.len(),
			"Retrieval completed."
		);

		Ok(Retrieval { query_vector, matches })
	}

	pub(crate) async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
		let texts = vec![query.to_string()];
		let vectors =
			self.retry.run("embed query", || self.providers.embedding.embed(&texts)).await?;
		let Some(vector) = vectors.into_iter().next() else {
			return Err(Error::TransientBackendFailure {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};
		let expected = self.cfg.storage.qdrant.vector_dim as usize;

		if vector.len() != expected {
			return Err(Error::DimensionMismatch { expected, actual: vector.len() });
		}

		Ok(vector)
	}

	/// Fills in dense similarity for sparse matches from their ingredients vectors.
	///
	/// Vectors already returned by the dense channel are reused; the rest are fetched in one
	/// batch. Returns `false` when that fetch fails and the batch stays unscored.
	async fn attach_sparse_similarity(
		&self,
		query_vector: &[f32],
		dense: &[MatchResult],
		sparse: &mut [MatchResult],
	) -> bool {
		if sparse.is_empty() {
			return true;
		}

		let mut known: HashMap<String, Vec<f32>> = dense
			.iter()
			.filter_map(|item| Some((item.id.clone(), item.values.clone()?)))
			.collect();
		let missing: Vec<String> = sparse
			.iter()
			.filter(|item| item.values.is_none() && !known.contains_key(&item.id))
			.map(|item| item.id.clone())
			.collect();

		if !missing.is_empty() {
			let fetched = self
				.retry
				.run("sparse vector lookup", || {
					self.providers.index.fetch_by_ids(&missing, VectorNamespace::Ingredients)
				})
				.await;

			match fetched {
				Ok(vectors) => known.extend(vectors),
				Err(err) => {
					tracing::warn!(
						error = %err,
						count = missing.len(),
						"Dense vector lookup for sparse matches failed. Sparse matches stay unscored."
					);

					return false;
				},
			}
		}

		for item in sparse.iter_mut() {
			if item.values.is_none() {
				item.values = known.get(&item.id).cloned();
			}

			item.similarity =
				item.values.as_deref().and_then(|values| cosine_similarity(query_vector, values));
		}

		true
	}
}
