//! Pure ranking core: vector math, rank fusion, the candidate pool and the turn-based
//! recommendation session. Nothing in here performs I/O.

pub mod candidate;
pub mod fusion;
pub mod mmr;
pub mod pool;
pub mod session;
pub mod vector;

mod error;

pub use candidate::{Candidate, RecipeMeta, RecipeStep};
pub use error::{Error, Result};
pub use fusion::{FusedMatch, FusionSource, MatchResult};
pub use mmr::Recommendation;
pub use pool::CandidatePool;
pub use session::{RecommendationSession, SessionPhase, SessionSettings};
pub use vector::SparseEmbedding;

pub const MIN_RATING: i32 = -5;
pub const MAX_RATING: i32 = 5;

pub(crate) fn ensure_unit_interval(label: &str, value: f32) -> Result<()> {
	if !value.is_finite() || !(0.0..=1.0).contains(&value) {
		return Err(Error::InvalidState {
			message: format!("{label} must be in the range 0.0-1.0, got {value}."),
		});
	}

	Ok(())
}
