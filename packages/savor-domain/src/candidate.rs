use serde::{Deserialize, Serialize};

use crate::{FusedMatch, Result, vector};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeStep {
	pub text: String,
	#[serde(default)]
	pub images: Vec<String>,
}

/// Static catalog fields for one recipe. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeMeta {
	pub title: Option<String>,
	pub image: Option<String>,
	pub ingredients: Option<Vec<String>>,
	pub steps: Option<Vec<RecipeStep>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
	pub id: String,
	/// 1-based position in the fused retrieval list; breaks score ties during selection.
	pub rank: u32,
	pub rrf_score: f64,
	pub similarity: Option<f32>,
	pub category: Option<String>,
	pub title: Option<String>,
	pub image: Option<String>,
	pub ingredients: Option<Vec<String>>,
	pub steps: Option<Vec<RecipeStep>>,
	#[serde(skip_serializing)]
	pub ingredients_vector: Vec<f32>,
	#[serde(skip_serializing)]
	pub all_vector: Vec<f32>,
	#[serde(skip_serializing)]
	pub final_vector: Vec<f32>,
}
impl Candidate {
	/// Builds a candidate whose final vector is `blend_lambda * ingredients + (1 - blend_lambda)
	/// * all`.
	pub fn new(
		fused: &FusedMatch,
		meta: Option<RecipeMeta>,
		ingredients_vector: Vec<f32>,
		all_vector: Vec<f32>,
		blend_lambda: f32,
	) -> Result<Self> {
		let final_vector =
			vector::blend_ingredients(&all_vector, &ingredients_vector, blend_lambda)?;
		let RecipeMeta { title, image, ingredients, steps } = meta.unwrap_or_default();

		Ok(Self {
			id: fused.id.clone(),
			rank: fused.rank,
			rrf_score: fused.rrf_score,
			similarity: fused.similarity,
			category: fused.category.clone(),
			title,
			image,
			ingredients,
			steps,
			ingredients_vector,
			all_vector,
			final_vector,
		})
	}

	pub fn dim(&self) -> usize {
		self.final_vector.len()
	}
}
