use crate::{Error, Result, SavorService};
use savor_domain::{Candidate, MAX_RATING, MIN_RATING, Recommendation, RecommendationSession};

impl SavorService {
	/// Retrieval plus enrichment: ranked candidates for `query`.
	pub async fn retrieve(&self, query: &str) -> Result<Vec<Candidate>> {
		let retrieval = self.retrieve_matches(query).await?;

		self.enrich(&retrieval.matches).await
	}

	/// Seeds `session` from `query` and presents the first recommendation.
	///
	/// The query embedding becomes the initial preference. `feedback` rates the first item
	/// (0 leaves the preference untouched). On error `session` is left as it was.
	pub async fn start_session(
		&self,
		session: &mut RecommendationSession,
		query: &str,
		feedback: i32,
	) -> Result<Option<Recommendation>> {
		ensure_rating(feedback)?;

		let retrieval = self.retrieve_matches(query).await?;
		let candidates = self.enrich(&retrieval.matches).await?;
		let mut next = RecommendationSession::new(session.settings());

		next.seed(retrieval.query_vector, candidates)?;

		let recommendation = next.select_next()?;

		if recommendation.is_some() && feedback != 0 {
			next.feedback(feedback)?;
		}

		tracing::info!(
			pool = next.pool().map(|pool| pool.len()).unwrap_or_default(),
			recommended = recommendation.as_ref().map(|rec| rec.candidate.id.as_str()),
			"Recommendation session started."
		);

		*session = next;

		Ok(recommendation)
	}

	/// Applies `rating` to the presented item and presents the next one.
	///
	/// An item already rated when the session started is not rated again; `rating` is only
	/// range-checked in that case.
	pub fn advance(
		&self,
		session: &mut RecommendationSession,
		rating: i32,
	) -> Result<Option<Recommendation>> {
		ensure_rating(rating)?;

		if session.is_current_rated() {
			tracing::debug!(rating, "Presented item already rated. Skipping feedback.");
		} else {
			session.feedback(rating)?;
		}

		let recommendation = session.select_next()?;

		tracing::debug!(
			rating,
			recommended = recommendation.as_ref().map(|rec| rec.candidate.id.as_str()),
			repeat = recommendation.as_ref().is_some_and(|rec| rec.repeat),
			"Recommendation session advanced."
		);

		Ok(recommendation)
	}

	pub fn reset_session(&self, session: &mut RecommendationSession) {
		session.reset();

		tracing::debug!("Recommendation session reset.");
	}
}

fn ensure_rating(rating: i32) -> Result<()> {
	if !(MIN_RATING..=MAX_RATING).contains(&rating) {
		return Err(Error::InvalidState {
			message: format!("Rating must be in {MIN_RATING}..={MAX_RATING}, got {rating}."),
		});
	}

	Ok(())
}
