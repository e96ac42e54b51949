use std::collections::HashMap;

use crate::{Result, SavorService, VectorNamespace};
use savor_domain::{Candidate, FusedMatch, RecipeMeta};

impl SavorService {
	/// Turns fused matches into ranked candidates, keeping fused order.
	///
	/// All-content vectors, missing ingredients vectors and catalog metadata are fetched in one
	/// batch each. A match without both vectors is skipped. A catalog failure leaves metadata
	/// absent instead of failing the request.
	pub async fn enrich(&self, matches: &[FusedMatch]) -> Result<Vec<Candidate>> {
		if matches.is_empty() {
			return Ok(Vec::new());
		}

		let ids: Vec<String> = matches.iter().map(|item| item.id.clone()).collect();
		let missing_ingredients: Vec<String> = matches
			.iter()
			.filter(|item| item.values.is_none())
			.map(|item| item.id.clone())
			.collect();
		let content = self.retry.run("content vector lookup", || {
			self.providers.index.fetch_by_ids(&ids, VectorNamespace::FullContent)
		});
		let ingredients = async {
			if missing_ingredients.is_empty() {
				return Ok(HashMap::new());
			}

			self.retry
				.run("ingredients vector lookup", || {
					self.providers
						.index
						.fetch_by_ids(&missing_ingredients, VectorNamespace::Ingredients)
				})
				.await
		};
		let metadata =
			self.retry.run("catalog lookup", || self.providers.catalog.lookup_metadata(&ids));
		let (content, ingredients, metadata) = tokio::join!(content, ingredients, metadata);
		let content = content?;
		let mut ingredients = ingredients?;
		let mut metadata: HashMap<String, RecipeMeta> = metadata.unwrap_or_else(|err| {
			tracing::warn!(error = %err, "Catalog lookup failed. Candidates keep absent metadata.");

			HashMap::new()
		});
		let blend_lambda = self.cfg.rerank.blend_lambda;
		let mut out = Vec::with_capacity(matches.len());

		for item in matches {
			let ingredients_vector = match &item.values {
				Some(values) => Some(values.clone()),
				None => ingredients.remove(&item.id),
			};
			let (Some(ingredients_vector), Some(all_vector)) =
				(ingredients_vector, content.get(&item.id).cloned())
			else {
				tracing::warn!(recipe_id = %item.id, "Candidate has no stored vectors. Skipping.");

				continue;
			};

			out.push(Candidate::new(
				item,
				metadata.remove(&item.id),
				ingredients_vector,
				all_vector,
				blend_lambda,
			)?);
		}

		tracing::debug!(fused = matches.len(), enriched = out.len(), "Enrichment completed.");

		Ok(out)
	}
}
