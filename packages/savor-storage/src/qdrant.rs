use std::{collections::HashMap, time::Duration};

use qdrant_client::{
	Qdrant,
	qdrant::{
		GetPointsBuilder, PointId, Query, QueryPointsBuilder, RetrievedPoint, ScoredPoint,
		VectorInput, VectorOutput, VectorsOutput, point_id::PointIdOptions, vector_output,
		vectors_output::VectorsOptions,
	},
};
use uuid::Uuid;

use crate::{
	Error, Result,
	payload::{self, CATEGORY_KEY, RECIPE_ID_KEY},
};
use savor_domain::{MatchResult, RecipeMeta, SparseEmbedding};

/// Which named dense vector of a recipe point to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VectorNamespace {
	/// Ingredients-only embedding. Dense queries run against it.
	Ingredients,
	/// Embedding of the full recipe text.
	FullContent,
}

/// Deterministic point id for a recipe id.
pub fn point_id_for(recipe_id: &str) -> Uuid {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, recipe_id.as_bytes())
}

pub struct QdrantStore {
	pub client: Qdrant,
	pub dense_collection: String,
	pub sparse_collection: String,
	pub vector_dim: u32,
	ingredients_vector: String,
	content_vector: String,
	sparse_vector: String,
}
impl QdrantStore {
	pub fn new(cfg: &savor_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url)
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.build()?;

		Ok(Self {
			client,
			dense_collection: cfg.dense_collection.clone(),
			sparse_collection: cfg.sparse_collection.clone(),
			vector_dim: cfg.vector_dim,
			ingredients_vector: cfg.ingredients_vector.clone(),
			content_vector: cfg.content_vector.clone(),
			sparse_vector: cfg.sparse_vector.clone(),
		})
	}

	pub fn vector_name(&self, namespace: VectorNamespace) -> &str {
		match namespace {
			VectorNamespace::Ingredients => &self.ingredients_vector,
			VectorNamespace::FullContent => &self.content_vector,
		}
	}

	/// Nearest neighbours of `vector` in the ingredients namespace.
	///
	/// Scores are cosine similarities and each match carries its ingredients vector.
	pub async fn query_dense(&self, vector: &[f32], top_k: u32) -> Result<Vec<MatchResult>> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Dense query has {} dimensions, expected {}.",
				vector.len(),
				self.vector_dim
			)));
		}

		let search = QueryPointsBuilder::new(self.dense_collection.clone())
			.query(Query::new_nearest(vector.to_vec()))
			.using(self.ingredients_vector.as_str())
			.with_payload(true)
			.with_vectors(true)
			.limit(top_k as u64);
		let response = self.client.query(search).await?;
		let matches = matches_from_points(&response.result, Some(&self.ingredients_vector));

		tracing::debug!(
			collection = %self.dense_collection,
			requested = top_k,
			returned = matches.len(),
			"Dense query completed."
		);

		Ok(matches)
	}

	/// BM25 matches from the sparse collection. Similarity is left for the caller to fill in.
	pub async fn query_sparse(
		&self,
		sparse: &SparseEmbedding,
		top_k: u32,
	) -> Result<Vec<MatchResult>> {
		if sparse.is_empty() {
			return Ok(Vec::new());
		}

		let search = QueryPointsBuilder::new(self.sparse_collection.clone())
			.query(Query::new_nearest(VectorInput::new_sparse(
				sparse.indices.clone(),
				sparse.values.clone(),
			)))
			.using(self.sparse_vector.as_str())
			.with_payload(true)
			.limit(top_k as u64);
		let response = self.client.query(search).await?;
		let matches = matches_from_points(&response.result, None);

		tracing::debug!(
			collection = %self.sparse_collection,
			requested = top_k,
			returned = matches.len(),
			"Sparse query completed."
		);

		Ok(matches)
	}

	/// Dense vectors of one namespace keyed by recipe id. Unknown ids are absent.
	pub async fn fetch_vectors(
		&self,
		ids: &[String],
		namespace: VectorNamespace,
	) -> Result<HashMap<String, Vec<f32>>> {
		let name = self.vector_name(namespace);
		let (point_ids, by_point) = point_ids_for(ids);

		if point_ids.is_empty() {
			return Ok(HashMap::new());
		}

		let request = GetPointsBuilder::new(self.dense_collection.clone(), point_ids)
			.with_payload(false)
			.with_vectors(true);
		let points = self.client.get_points(request).await?.result;
		let mut out = HashMap::with_capacity(points.len());

		for point in &points {
			let Some(recipe_id) = recipe_id_for_point(point, &by_point) else {
				continue;
			};
			let Some(values) = named_dense_vector(point.vectors.as_ref(), name) else {
				tracing::debug!(recipe_id = %recipe_id, vector = name, "Point has no such vector.");

				continue;
			};

			out.insert(recipe_id, values);
		}

		Ok(out)
	}

	/// Recipe metadata keyed by recipe id. Unknown ids are absent.
	pub async fn fetch_metadata(&self, ids: &[String]) -> Result<HashMap<String, RecipeMeta>> {
		let (point_ids, by_point) = point_ids_for(ids);

		if point_ids.is_empty() {
			return Ok(HashMap::new());
		}

		let request = GetPointsBuilder::new(self.dense_collection.clone(), point_ids)
			.with_payload(true)
			.with_vectors(false);
		let points = self.client.get_points(request).await?.result;

		Ok(points
			.iter()
			.filter_map(|point| {
				let recipe_id = recipe_id_for_point(point, &by_point)?;

				Some((recipe_id, payload::recipe_meta(&point.payload)))
			})
			.collect())
	}
}

fn point_ids_for(ids: &[String]) -> (Vec<PointId>, HashMap<String, String>) {
	let mut point_ids = Vec::with_capacity(ids.len());
	let mut by_point = HashMap::with_capacity(ids.len());

	for id in ids {
		let uuid = point_id_for(id).to_string();

		if by_point.insert(uuid.clone(), id.clone()).is_none() {
			point_ids.push(PointId { point_id_options: Some(PointIdOptions::Uuid(uuid)) });
		}
	}

	(point_ids, by_point)
}

fn recipe_id_for_point(point: &RetrievedPoint, by_point: &HashMap<String, String>) -> Option<String> {
	match point.id.as_ref().and_then(|id| id.point_id_options.as_ref()) {
		Some(PointIdOptions::Uuid(uuid)) => by_point.get(uuid).cloned(),
		_ => None,
	}
}

fn matches_from_points(points: &[ScoredPoint], vector_name: Option<&str>) -> Vec<MatchResult> {
	let mut out = Vec::with_capacity(points.len());

	for point in points {
		let Some(id) = payload::payload_string(&point.payload, RECIPE_ID_KEY) else {
			tracing::debug!(point_id = ?point.id, "Scored point has no recipe id.");

			continue;
		};
		let values =
			vector_name.and_then(|name| named_dense_vector(point.vectors.as_ref(), name));

		out.push(MatchResult {
			id,
			score: point.score,
			similarity: vector_name.map(|_| point.score),
			category: payload::payload_string(&point.payload, CATEGORY_KEY),
			values,
		});
	}

	out
}

pub(crate) fn named_dense_vector(vectors: Option<&VectorsOutput>, name: &str) -> Option<Vec<f32>> {
	let output = match vectors?.vectors_options.as_ref()? {
		VectorsOptions::Vectors(named) => named.vectors.get(name)?,
		VectorsOptions::Vector(output) => output,
	};

	dense_values(output)
}

#[allow(deprecated)]
fn dense_values(output: &VectorOutput) -> Option<Vec<f32>> {
	match &output.vector {
		Some(vector_output::Vector::Dense(dense)) => Some(dense.data.clone()),
		Some(_) => None,
		None if output.indices.is_none() && !output.data.is_empty() => Some(output.data.clone()),
		None => None,
	}
}
