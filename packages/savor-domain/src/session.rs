use serde::Serialize;

use crate::{
	Candidate, CandidatePool, Error, MAX_RATING, MIN_RATING, Result,
	mmr::{self, Recommendation},
	vector,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
	Idle,
	Seeded,
	Presenting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
	mmr_lambda: f32,
	learning_rate: f32,
}
impl SessionSettings {
	pub fn new(mmr_lambda: f32, learning_rate: f32) -> Result<Self> {
		crate::ensure_unit_interval("MMR lambda", mmr_lambda)?;

		if !learning_rate.is_finite() || learning_rate <= 0.0 {
			return Err(Error::InvalidState {
				message: format!("Learning rate must be finite and positive, got {learning_rate}."),
			});
		}

		Ok(Self { mmr_lambda, learning_rate })
	}

	pub fn mmr_lambda(&self) -> f32 {
		self.mmr_lambda
	}

	pub fn learning_rate(&self) -> f32 {
		self.learning_rate
	}
}
impl Default for SessionSettings {
	fn default() -> Self {
		Self { mmr_lambda: 0.7, learning_rate: 0.8 }
	}
}

#[derive(Debug, Default)]
enum SessionState {
	#[default]
	Idle,
	Seeded {
		pool: CandidatePool,
		preference: Vec<f32>,
	},
	Presenting {
		pool: CandidatePool,
		preference: Vec<f32>,
		current: Candidate,
		rated: bool,
	},
}

/// Turn-based re-ranking over one candidate pool and one preference vector.
///
/// `Idle -> seed -> Seeded -> select -> Presenting -> (feedback, select)* -> reset -> Idle`.
/// Feedback is accepted once per presented item. The session is single-writer; callers
/// serialise turns.
#[derive(Debug, Default)]
pub struct RecommendationSession {
	settings: SessionSettings,
	state: SessionState,
}
impl RecommendationSession {
	pub fn new(settings: SessionSettings) -> Self {
		Self { settings, state: SessionState::Idle }
	}

	pub fn settings(&self) -> SessionSettings {
		self.settings
	}

	pub fn phase(&self) -> SessionPhase {
		match self.state {
			SessionState::Idle => SessionPhase::Idle,
			SessionState::Seeded { .. } => SessionPhase::Seeded,
			SessionState::Presenting { .. } => SessionPhase::Presenting,
		}
	}

	pub fn preference(&self) -> Option<&[f32]> {
		match &self.state {
			SessionState::Idle => None,
			SessionState::Seeded { preference, .. }
			| SessionState::Presenting { preference, .. } => Some(preference),
		}
	}

	pub fn pool(&self) -> Option<&CandidatePool> {
		match &self.state {
			SessionState::Idle => None,
			SessionState::Seeded { pool, .. } | SessionState::Presenting { pool, .. } => Some(pool),
		}
	}

	/// The item most recently presented, the target of the next feedback.
	pub fn current(&self) -> Option<&Candidate> {
		match &self.state {
			SessionState::Presenting { current, .. } => Some(current),
			_ => None,
		}
	}

	/// Whether the current item has already received its feedback.
	pub fn is_current_rated(&self) -> bool {
		matches!(self.state, SessionState::Presenting { rated: true, .. })
	}

	/// Installs the initial preference and candidate set, replacing any previous state.
	///
	/// Every candidate's final vector must match the preference dimension. On error the session
	/// is left untouched.
	pub fn seed(&mut self, preference: Vec<f32>, candidates: Vec<Candidate>) -> Result<()> {
		if preference.is_empty() {
			return Err(Error::InvalidState {
				message: "Preference vector must be non-empty.".to_string(),
			});
		}

		for candidate in &candidates {
			vector::ensure_same_dim(&preference, &candidate.final_vector)?;
		}

		tracing::debug!(candidates = candidates.len(), dim = preference.len(), "Session seeded.");

		self.state = SessionState::Seeded { pool: CandidatePool::new(candidates), preference };

		Ok(())
	}

	/// Selects the next item by MMR and makes it the current item.
	///
	/// Returns `None` when the pool holds no candidates at all; the session state is unchanged
	/// in that case.
	pub fn select_next(&mut self) -> Result<Option<Recommendation>> {
		Ok(self.select(1)?.pop())
	}

	/// Selects up to `top_k` items; the last one becomes the current item.
	pub fn select(&mut self, top_k: u32) -> Result<Vec<Recommendation>> {
		let lambda = self.settings.mmr_lambda;
		let picks = match &mut self.state {
			SessionState::Idle => {
				return Err(Error::InvalidState {
					message: "Session must be seeded before selecting.".to_string(),
				});
			},
			SessionState::Seeded { pool, preference }
			| SessionState::Presenting { pool, preference, .. } =>
				mmr::select_next(pool, preference, lambda, top_k)?,
		};
		let Some(last) = picks.last() else { return Ok(picks) };
		let current = last.candidate.clone();

		self.state = match std::mem::take(&mut self.state) {
			SessionState::Seeded { pool, preference }
			| SessionState::Presenting { pool, preference, .. } =>
				SessionState::Presenting { pool, preference, current, rated: false },
			SessionState::Idle => SessionState::Idle,
		};

		Ok(picks)
	}

	/// Folds a rating for the current item into the preference vector.
	///
	/// Each presented item takes one rating; a second one is `InvalidState` until the next
	/// selection.
	pub fn feedback(&mut self, rating: i32) -> Result<()> {
		if !(MIN_RATING..=MAX_RATING).contains(&rating) {
			return Err(Error::InvalidState {
				message: format!("Rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}."),
			});
		}

		let SessionState::Presenting { preference, current, rated, .. } = &mut self.state else {
			return Err(Error::InvalidState {
				message: "Feedback requires a presented item.".to_string(),
			});
		};

		if *rated {
			return Err(Error::InvalidState {
				message: format!("Item {} has already been rated.", current.id),
			});
		}

		*preference = mmr::update_preference(
			preference,
			&current.final_vector,
			self.settings.learning_rate,
			rating,
		)?;
		*rated = true;

		tracing::debug!(id = %current.id, rating, "Preference updated from feedback.");

		Ok(())
	}

	pub fn reset(&mut self) {
		self.state = SessionState::Idle;
	}
}
