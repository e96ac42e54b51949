use std::{
	cmp::Ordering,
	collections::{HashMap, HashSet},
};

use serde::{Deserialize, Serialize};

/// One hit from a single index query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
	pub id: String,
	/// Raw index score (cosine for dense, dot product for sparse).
	pub score: f32,
	/// Dense similarity to the query, when known.
	pub similarity: Option<f32>,
	pub category: Option<String>,
	/// Ingredients-namespace dense vector, when the index returned it.
	pub values: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionSource {
	Sparse,
	Dense,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedMatch {
	pub id: String,
	/// 1-based position in the fused list.
	pub rank: u32,
	pub rrf_score: f64,
	pub sparse_rank: Option<u32>,
	pub dense_rank: Option<u32>,
	pub similarity: Option<f32>,
	pub category: Option<String>,
	#[serde(skip)]
	pub values: Option<Vec<f32>>,
}
impl FusedMatch {
	fn seed(source: FusionSource, rank: u32, item: &MatchResult) -> Self {
		let mut fused = Self {
			id: item.id.clone(),
			rank: 0,
			rrf_score: 0.0,
			sparse_rank: None,
			dense_rank: None,
			similarity: item.similarity,
			category: item.category.clone(),
			values: item.values.clone(),
		};

		fused.set_source_rank(source, rank);

		fused
	}

	fn set_source_rank(&mut self, source: FusionSource, rank: u32) {
		let slot = match source {
			FusionSource::Sparse => &mut self.sparse_rank,
			FusionSource::Dense => &mut self.dense_rank,
		};

		*slot = Some(slot.map(|existing| existing.min(rank)).unwrap_or(rank));
	}

	fn absorb(&mut self, item: &MatchResult) {
		if self.similarity.is_none() {
			self.similarity = item.similarity;
		}
		if self.category.is_none() {
			self.category = item.category.clone();
		}
		if self.values.is_none() {
			self.values = item.values.clone();
		}
	}
}

/// Drops matches below `threshold`, but only when at least one match exceeds it.
///
/// A batch with no match above the threshold is returned unchanged. Matches with an absent
/// similarity are dropped once the filter engages.
pub fn apply_adaptive_threshold(matches: Vec<MatchResult>, threshold: f32) -> Vec<MatchResult> {
	let engaged = matches.iter().any(|item| item.similarity.is_some_and(|sim| sim > threshold));

	if !engaged {
		return matches;
	}

	let before = matches.len();
	let kept = retain_at_least(matches, threshold);

	tracing::debug!(threshold, before, after = kept.len(), "Adaptive threshold applied.");

	kept
}

/// Keeps matches whose similarity is at least `threshold`.
pub fn retain_at_least(matches: Vec<MatchResult>, threshold: f32) -> Vec<MatchResult> {
	matches.into_iter().filter(|item| item.similarity.is_some_and(|sim| sim >= threshold)).collect()
}

/// Reciprocal Rank Fusion over ranked lists.
///
/// Each document at 1-based rank `r` of a list contributes `1 / (k + r)`. Documents are sorted by
/// summed score, ties keep the order in which they were first seen across `lists` (earlier lists
/// first). Repeated ids within one list count once, at their best rank.
pub fn rrf_fuse(lists: &[(FusionSource, &[MatchResult])], k: u32, top_n: u32) -> Vec<FusedMatch> {
	if top_n == 0 {
		return Vec::new();
	}

	let rrf_base = f64::from(k);
	let mut order: Vec<String> = Vec::new();
	let mut by_id: HashMap<String, FusedMatch> = HashMap::new();

	for (source, items) in lists {
		let mut seen_for_source = HashSet::new();

		for (idx, item) in items.iter().enumerate() {
			if !seen_for_source.insert(item.id.as_str()) {
				continue;
			}

			let rank = idx as u32 + 1;
			let contribution = 1.0 / (rrf_base + f64::from(rank));

			match by_id.get_mut(&item.id) {
				Some(existing) => {
					existing.rrf_score += contribution;
					existing.set_source_rank(*source, rank);
					existing.absorb(item);
				},
				None => {
					let mut fused = FusedMatch::seed(*source, rank, item);

					fused.rrf_score = contribution;
					order.push(item.id.clone());
					by_id.insert(item.id.clone(), fused);
				},
			}
		}
	}

	let mut fused: Vec<FusedMatch> =
		order.into_iter().filter_map(|id| by_id.remove(&id)).collect();

	// `sort_by` is stable, so equal scores keep first-seen order.
	fused.sort_by(|left, right| cmp_f64_desc(left.rrf_score, right.rrf_score));
	fused.truncate(top_n as usize);

	for (idx, item) in fused.iter_mut().enumerate() {
		item.rank = idx as u32 + 1;
	}

	fused
}

fn cmp_f64_desc(a: f64, b: f64) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
