use crate::Candidate;

/// Session working set, split into items not yet shown and items already shown.
///
/// A candidate lives in exactly one partition. Items only leave `selected` through
/// [`CandidatePool::recycle`].
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
	candidates: Vec<Candidate>,
	selected: Vec<Candidate>,
	cycle: u32,
}
impl CandidatePool {
	pub fn new(candidates: Vec<Candidate>) -> Self {
		Self { candidates, selected: Vec::new(), cycle: 0 }
	}

	pub fn candidates(&self) -> &[Candidate] {
		&self.candidates
	}

	/// Shown items, in presentation order.
	pub fn selected(&self) -> &[Candidate] {
		&self.selected
	}

	/// Number of times the pool has been recycled.
	pub fn cycle(&self) -> u32 {
		self.cycle
	}

	pub fn len(&self) -> usize {
		self.candidates.len() + self.selected.len()
	}

	pub fn is_empty(&self) -> bool {
		self.candidates.is_empty() && self.selected.is_empty()
	}

	/// Moves the candidate at `index` into `selected` and returns a copy of it.
	pub(crate) fn promote(&mut self, index: usize) -> Candidate {
		let picked = self.candidates.remove(index);

		self.selected.push(picked.clone());

		picked
	}

	/// Refills `candidates` from `selected` once every candidate has been shown.
	///
	/// Returns `false` when there is nothing to recycle.
	pub(crate) fn recycle(&mut self) -> bool {
		if !self.candidates.is_empty() || self.selected.is_empty() {
			return false;
		}

		self.candidates = std::mem::take(&mut self.selected);
		self.cycle += 1;

		tracing::info!(
			cycle = self.cycle,
			candidates = self.candidates.len(),
			"Candidate pool exhausted, recycling shown items."
		);

		true
	}
}
