use serde::Serialize;

use crate::{Candidate, CandidatePool, Error, Result, vector};

/// One item chosen by [`select_next`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
	pub candidate: Candidate,
	pub mmr_score: f32,
	pub sim_user: f32,
	pub sim_selected: f32,
	/// Pool cycle the item was drawn from, 0 on the first pass.
	pub cycle: u32,
	/// Whether the item was already shown in an earlier cycle.
	pub repeat: bool,
}

#[derive(Clone, Copy)]
struct MmrPick {
	position: usize,
	mmr_score: f32,
	sim_user: f32,
	sim_selected: f32,
	rank: u32,
}
impl MmrPick {
	fn better_than(self, other: &Self) -> bool {
		self.mmr_score > other.mmr_score
			|| (self.mmr_score == other.mmr_score && self.rank < other.rank)
	}
}

/// Maximal Marginal Relevance selection of up to `top_k` items.
///
/// Each pick maximises `lambda * cos(preference, c) - (1 - lambda) * max_s cos(c, s)` over the
/// unshown candidates, with `s` ranging over the shown items. When the unshown side runs dry the
/// pool is recycled and selection continues. Returns fewer than `top_k` items only when the pool
/// is empty.
pub fn select_next(
	pool: &mut CandidatePool,
	preference: &[f32],
	lambda: f32,
	top_k: u32,
) -> Result<Vec<Recommendation>> {
	crate::ensure_unit_interval("MMR lambda", lambda)?;

	let mut bests = Vec::new();

	while bests.len() < top_k as usize {
		if pool.candidates().is_empty() && !pool.recycle() {
			break;
		}

		let Some(pick) = pick_best(pool, preference, lambda)? else { break };
		let cycle = pool.cycle();
		let candidate = pool.promote(pick.position);

		tracing::debug!(
			id = %candidate.id,
			mmr_score = pick.mmr_score,
			sim_user = pick.sim_user,
			sim_selected = pick.sim_selected,
			cycle,
			"MMR selected candidate."
		);

		bests.push(Recommendation {
			candidate,
			mmr_score: pick.mmr_score,
			sim_user: pick.sim_user,
			sim_selected: pick.sim_selected,
			cycle,
			repeat: cycle > 0,
		});
	}

	Ok(bests)
}

/// `preference + learning_rate * rating * (item - preference)`.
pub fn update_preference(
	preference: &[f32],
	item: &[f32],
	learning_rate: f32,
	rating: i32,
) -> Result<Vec<f32>> {
	if !learning_rate.is_finite() {
		return Err(Error::InvalidState {
			message: "Learning rate must be a finite number.".to_string(),
		});
	}

	vector::step_toward(preference, item, learning_rate, rating as f32)
}

fn pick_best(
	pool: &CandidatePool,
	preference: &[f32],
	lambda: f32,
) -> Result<Option<MmrPick>> {
	let mut best: Option<MmrPick> = None;

	for (position, candidate) in pool.candidates().iter().enumerate() {
		let sim_user = vector::checked_cosine(preference, &candidate.final_vector)?;
		let mut sim_selected: Option<f32> = None;

		for shown in pool.selected() {
			let similarity = vector::checked_cosine(&candidate.final_vector, &shown.final_vector)?;

			if sim_selected.map(|value| similarity > value).unwrap_or(true) {
				sim_selected = Some(similarity);
			}
		}

		let sim_selected = sim_selected.unwrap_or(0.0);
		let mmr_score = lambda * sim_user - (1.0 - lambda) * sim_selected;
		let pick = MmrPick { position, mmr_score, sim_user, sim_selected, rank: candidate.rank };

		if best.as_ref().map(|current| pick.better_than(current)).unwrap_or(true) {
			best = Some(pick);
		}
	}

	Ok(best)
}
