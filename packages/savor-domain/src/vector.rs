use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Term-index to weight mapping. Indices are unique and ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseEmbedding {
	pub indices: Vec<u32>,
	pub values: Vec<f32>,
}
impl SparseEmbedding {
	pub fn is_empty(&self) -> bool {
		self.indices.is_empty()
	}

	pub fn len(&self) -> usize {
		self.indices.len()
	}
}

/// Cosine similarity clamped to `[-1, 1]`.
///
/// Returns `None` for empty or differently sized inputs and for zero-norm vectors.
pub fn cosine_similarity(lhs: &[f32], rhs: &[f32]) -> Option<f32> {
	if lhs.is_empty() || lhs.len() != rhs.len() {
		return None;
	}

	let mut dot = 0.0_f32;
	let mut lhs_norm = 0.0_f32;
	let mut rhs_norm = 0.0_f32;

	for (l, r) in lhs.iter().zip(rhs.iter()) {
		dot += l * r;
		lhs_norm += l * l;
		rhs_norm += r * r;
	}

	if lhs_norm <= f32::EPSILON || rhs_norm <= f32::EPSILON {
		return None;
	}

	Some((dot / (lhs_norm.sqrt() * rhs_norm.sqrt())).clamp(-1.0, 1.0))
}

/// Cosine similarity for vectors that must share a shape. A zero-norm side scores 0.
pub fn checked_cosine(lhs: &[f32], rhs: &[f32]) -> Result<f32> {
	ensure_same_dim(lhs, rhs)?;

	Ok(cosine_similarity(lhs, rhs).unwrap_or(0.0))
}

pub fn ensure_same_dim(lhs: &[f32], rhs: &[f32]) -> Result<()> {
	if lhs.len() != rhs.len() {
		return Err(Error::DimensionMismatch { expected: lhs.len(), actual: rhs.len() });
	}

	Ok(())
}

/// Weighted blend `lambda * ingredients + (1 - lambda) * all`, elementwise.
pub fn blend_ingredients(all: &[f32], ingredients: &[f32], lambda: f32) -> Result<Vec<f32>> {
	crate::ensure_unit_interval("Blend weight", lambda)?;
	ensure_same_dim(ingredients, all)?;

	if lambda == 1.0 {
		return Ok(ingredients.to_vec());
	}
	if lambda == 0.0 {
		return Ok(all.to_vec());
	}

	Ok(ingredients.iter().zip(all.iter()).map(|(i, a)| i * lambda + a * (1.0 - lambda)).collect())
}

/// Moves `preference` toward `item` by `learning_rate * rating` of their difference.
pub fn step_toward(
	preference: &[f32],
	item: &[f32],
	learning_rate: f32,
	rating: f32,
) -> Result<Vec<f32>> {
	ensure_same_dim(preference, item)?;

	let step = learning_rate * rating;

	if step == 0.0 {
		return Ok(preference.to_vec());
	}
	if step == 1.0 {
		return Ok(item.to_vec());
	}

	Ok(preference.iter().zip(item.iter()).map(|(p, i)| p + step * (i - p)).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cosine_of_orthogonal_vectors_is_zero() {
		assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), Some(0.0));
		assert_eq!(cosine_similarity(&[2.0, 0.0], &[1.0, 0.0]), Some(1.0));
	}

	#[test]
	fn cosine_rejects_zero_norm_and_shape_mismatch() {
		assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
		assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
		assert_eq!(checked_cosine(&[0.0, 0.0], &[1.0, 0.0]), Ok(0.0));
		assert_eq!(
			checked_cosine(&[1.0], &[1.0, 0.0]),
			Err(Error::DimensionMismatch { expected: 1, actual: 2 })
		);
	}

	#[test]
	fn blend_endpoints_return_inputs() {
		let all = [0.2, 0.4];
		let ingredients = [1.0, -1.0];

		assert_eq!(blend_ingredients(&all, &ingredients, 1.0).unwrap(), ingredients.to_vec());
		assert_eq!(blend_ingredients(&all, &ingredients, 0.0).unwrap(), all.to_vec());

		let mixed = blend_ingredients(&all, &ingredients, 0.5).unwrap();

		assert!((mixed[0] - 0.6).abs() < 1e-6);
		assert!((mixed[1] + 0.3).abs() < 1e-6);
	}

	#[test]
	fn blend_rejects_bad_weight_and_shapes() {
		assert!(matches!(
			blend_ingredients(&[1.0], &[1.0], 1.1),
			Err(Error::InvalidState { .. })
		));
		assert!(matches!(
			blend_ingredients(&[1.0], &[1.0], f32::NAN),
			Err(Error::InvalidState { .. })
		));
		assert_eq!(
			blend_ingredients(&[1.0, 2.0], &[1.0], 0.9),
			Err(Error::DimensionMismatch { expected: 1, actual: 2 })
		);
	}

	#[test]
	fn step_toward_scales_by_rating() {
		assert_eq!(step_toward(&[1.0, 0.0], &[0.0, 1.0], 0.8, 0.0).unwrap(), vec![1.0, 0.0]);
		assert_eq!(step_toward(&[1.0, 0.0], &[0.0, 1.0], 1.0, 1.0).unwrap(), vec![0.0, 1.0]);

		let away = step_toward(&[1.0, 0.0], &[0.0, 1.0], 0.5, -1.0).unwrap();

		assert_eq!(away, vec![1.5, -0.5]);
	}
}
