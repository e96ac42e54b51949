use std::{
	collections::{BTreeMap, HashMap},
	fs,
	path::Path,
};

use serde::Deserialize;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::{Error, Result};
use savor_config::SparseProviderConfig;
use savor_domain::SparseEmbedding;

const STOP_WORDS: &[&str] = &[
	"a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
	"or", "that", "the", "to", "with", "ada", "dan", "dari", "di", "dengan", "ini", "itu", "ke",
	"untuk", "yang",
];

#[derive(Debug, Clone, Default, Deserialize)]
struct TermFrequencies {
	indices: Vec<u32>,
	values: Vec<f32>,
}

/// Fitted corpus statistics in the layout written by the indexing pipeline.
///
/// Index-side fields of the file (`avgdl`, `k1`, `b`) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Bm25Params {
	pub n_docs: u64,
	#[serde(default)]
	doc_freq: TermFrequencies,
}

/// BM25 query encoder. Loaded once and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Bm25Encoder {
	n_docs: u64,
	doc_freq: HashMap<u32, f32>,
}
impl Bm25Encoder {
	/// An unfitted encoder. Query terms are weighted uniformly.
	pub fn empty() -> Self {
		Self::default()
	}

	pub fn from_params(params: Bm25Params) -> Result<Self> {
		let TermFrequencies { indices, values } = params.doc_freq;

		if indices.len() != values.len() {
			return Err(Error::InvalidConfig {
				message: "BM25 doc_freq indices and values must have equal length.".to_string(),
			});
		}

		Ok(Self { n_docs: params.n_docs, doc_freq: indices.into_iter().zip(values).collect() })
	}

	/// Loads the encoder described by `cfg`.
	///
	/// A missing or unreadable params file yields an unfitted encoder unless `cfg.strict` is set.
	pub fn load(cfg: &SparseProviderConfig) -> Result<Self> {
		let Some(path) = cfg.params_path.as_deref() else {
			tracing::warn!("No BM25 params configured. Using an unfitted sparse encoder.");

			return Ok(Self::empty());
		};

		match Self::read_params(Path::new(path)) {
			Ok(params) => {
				let encoder = Self::from_params(params)?;

				tracing::info!(
					path,
					n_docs = encoder.n_docs,
					terms = encoder.doc_freq.len(),
					"BM25 params loaded."
				);

				Ok(encoder)
			},
			Err(err) if !cfg.strict => {
				tracing::warn!(path, error = %err, "Failed to load BM25 params. Using an unfitted sparse encoder.");

				Ok(Self::empty())
			},
			Err(err) => Err(err),
		}
	}

	fn read_params(path: &Path) -> Result<Bm25Params> {
		let raw = fs::read_to_string(path).map_err(|err| Error::ReadParams {
			path: path.display().to_string(),
			source: err,
		})?;

		Ok(serde_json::from_str(&raw)?)
	}

	pub fn is_fitted(&self) -> bool {
		self.n_docs > 0
	}

	/// Query-side weights: normalised inverse document frequency per distinct term.
	pub fn encode_query(&self, text: &str) -> SparseEmbedding {
		let counts = term_counts(text);

		if counts.is_empty() {
			return SparseEmbedding::default();
		}

		let weights: BTreeMap<u32, f32> = counts
			.keys()
			.map(|index| {
				let weight = if self.is_fitted() { self.idf(*index) } else { 1.0 };

				(*index, weight.max(0.0))
			})
			.collect();
		let total: f32 = weights.values().sum();

		if total <= f32::EPSILON {
			return SparseEmbedding::default();
		}

		let (indices, values) =
			weights.into_iter().map(|(index, weight)| (index, weight / total)).unzip();

		SparseEmbedding { indices, values }
	}

	fn idf(&self, index: u32) -> f32 {
		let df = self.doc_freq.get(&index).copied().unwrap_or(1.0);
		let n = self.n_docs as f32;

		((n + 1.0) / (df + 0.5)).ln()
	}
}

/// Lower-cased NFKC words with stop words and pure punctuation removed.
pub fn tokenize(text: &str) -> Vec<String> {
	let normalized: String = text.nfkc().collect::<String>().to_lowercase();

	normalized
		.unicode_words()
		.filter(|word| word.chars().any(char::is_alphanumeric))
		.filter(|word| !STOP_WORDS.contains(word))
		.map(str::to_string)
		.collect()
}

pub fn term_index(token: &str) -> u32 {
	let hash = blake3::hash(token.as_bytes());
	let bytes = hash.as_bytes();

	u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn term_counts(text: &str) -> BTreeMap<u32, f32> {
	let mut counts = BTreeMap::new();

	for token in tokenize(text) {
		*counts.entry(term_index(&token)).or_insert(0.0) += 1.0;
	}

	counts
}

#[cfg(test)]
mod tests {
	use super::*;

	fn fitted() -> Bm25Encoder {
		let params = Bm25Params {
			n_docs: 10,
			doc_freq: TermFrequencies {
				indices: vec![term_index("ayam"), term_index("kecap")],
				values: vec![9.0, 1.0],
			},
		};

		Bm25Encoder::from_params(params).expect("valid params")
	}

	#[test]
	fn tokenizer_drops_stop_words_and_punctuation() {
		assert_eq!(tokenize("Ayam dan KECAP, manis!"), vec!["ayam", "kecap", "manis"]);
		assert!(tokenize(" ... ").is_empty());
	}

	#[test]
	fn rare_terms_outweigh_common_terms() {
		let encoded = fitted().encode_query("ayam kecap");
		let weight = |token: &str| {
			let index = term_index(token);
			let pos = encoded.indices.iter().position(|i| *i == index).expect("term present");

			encoded.values[pos]
		};

		assert!(weight("kecap") > weight("ayam"));
		assert!((encoded.values.iter().sum::<f32>() - 1.0).abs() < 1e-5);
	}

	#[test]
	fn query_indices_are_unique_and_sorted() {
		let encoded = fitted().encode_query("kecap kecap ayam bawang kecap");

		assert_eq!(encoded.len(), 3);
		assert!(encoded.indices.windows(2).all(|pair| pair[0] < pair[1]));
	}

	#[test]
	fn unfitted_encoder_weights_terms_uniformly() {
		let encoded = Bm25Encoder::empty().encode_query("ayam goreng");

		assert_eq!(encoded.values, vec![0.5, 0.5]);
	}

	#[test]
	fn stop_word_only_query_is_empty() {
		assert!(fitted().encode_query("dan yang di").is_empty());
	}

	#[test]
	fn mismatched_doc_freq_is_rejected() {
		let params = Bm25Params {
			n_docs: 1,
			doc_freq: TermFrequencies { indices: vec![1, 2], values: vec![1.0] },
		};

		assert!(matches!(
			Bm25Encoder::from_params(params),
			Err(Error::InvalidConfig { .. })
		));
	}
}
