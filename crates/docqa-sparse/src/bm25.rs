//! Okapi BM25 over pre-tokenized documents.
//!
//! `idf(t) = ln(N - n_t + 0.5) - ln(n_t + 0.5)`. Terms that occur in more than
//! half the corpus get a negative idf; those are floored to
//! `epsilon * mean_idf` so very common terms cannot dominate a score.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use docqa_core::config::SparseSettings;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
	/// Term-frequency saturation.
	pub k1: f64,
	/// Document length normalization.
	pub b: f64,
	/// Idf floor, as a fraction of the mean idf.
	pub epsilon: f64,
}

impl Default for Bm25Params {
	fn default() -> Self { Self { k1: 1.5, b: 0.75, epsilon: 0.25 } }
}

impl From<SparseSettings> for Bm25Params {
	fn from(s: SparseSettings) -> Self { Self { k1: s.k1, b: s.b, epsilon: s.epsilon } }
}

#[derive(Debug, Clone)]
pub struct Bm25Okapi {
	params: Bm25Params,
	/// term -> [(doc position, term frequency)]
	postings: HashMap<String, Vec<(usize, u32)>>,
	doc_len: Vec<usize>,
	avgdl: f64,
	idf: HashMap<String, f64>,
}

impl Bm25Okapi {
	pub fn new(corpus: &[Vec<String>], params: Bm25Params) -> Self {
		let mut postings: HashMap<String, Vec<(usize, u32)>> = HashMap::new();
		// first-occurrence order keeps the idf mean reproducible across builds
		let mut terms: Vec<String> = Vec::new();
		let mut doc_len = Vec::with_capacity(corpus.len());
		let mut total_len = 0usize;
		for (pos, doc) in corpus.iter().enumerate() {
			doc_len.push(doc.len());
			total_len += doc.len();
			let mut tf: HashMap<&str, u32> = HashMap::new();
			let mut seen: Vec<&str> = Vec::new();
			for token in doc {
				let count = tf.entry(token.as_str()).or_insert(0);
				if *count == 0 { seen.push(token.as_str()); }
				*count += 1;
			}
			for term in seen {
				let freq = tf[term];
				match postings.get_mut(term) {
					Some(list) => list.push((pos, freq)),
					None => {
						terms.push(term.to_string());
						postings.insert(term.to_string(), vec![(pos, freq)]);
					}
				}
			}
		}
		let avgdl = if corpus.is_empty() { 0.0 } else { total_len as f64 / corpus.len() as f64 };
		let idf = compute_idf(&terms, &postings, corpus.len(), params.epsilon);
		Self { params, postings, doc_len, avgdl, idf }
	}

	pub fn params(&self) -> Bm25Params { self.params }

	pub fn corpus_size(&self) -> usize { self.doc_len.len() }

	pub fn idf(&self, term: &str) -> Option<f64> { self.idf.get(term).copied() }

	/// One score per document, in position order. Query tokens are counted
	/// with repetition.
	pub fn get_scores(&self, query: &[String]) -> Vec<f64> {
		let mut scores = vec![0.0f64; self.doc_len.len()];
		if self.avgdl <= 0.0 { return scores; }
		let Bm25Params { k1, b, .. } = self.params;
		for term in query {
			let Some(postings) = self.postings.get(term) else { continue };
			let idf = self.idf.get(term).copied().unwrap_or(0.0);
			for &(pos, tf) in postings {
				let tf = f64::from(tf);
				let norm = k1 * (1.0 - b + b * self.doc_len[pos] as f64 / self.avgdl);
				scores[pos] += idf * (tf * (k1 + 1.0) / (tf + norm));
			}
		}
		scores
	}

	/// Positive-scoring documents only, best first; ties by ascending position.
	pub fn top_k(&self, query: &[String], k: usize) -> Vec<(usize, f64)> {
		if k == 0 { return Vec::new(); }
		let mut ranked: Vec<(usize, f64)> = self
			.get_scores(query)
			.into_iter()
			.enumerate()
			.filter(|(_, s)| *s > 0.0)
			.collect();
		ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
		ranked.truncate(k);
		ranked
	}
}

fn compute_idf(terms: &[String], postings: &HashMap<String, Vec<(usize, u32)>>, corpus_size: usize, epsilon: f64) -> HashMap<String, f64> {
	let n = corpus_size as f64;
	let mut idf = HashMap::with_capacity(terms.len());
	let mut idf_sum = 0.0;
	let mut negative = Vec::new();
	for term in terms {
		let df = postings.get(term).map_or(0, Vec::len) as f64;
		let value = (n - df + 0.5).ln() - (df + 0.5).ln();
		idf_sum += value;
		if value < 0.0 { negative.push(term.clone()); }
		idf.insert(term.clone(), value);
	}
	if idf.is_empty() { return idf; }
	let floor = epsilon * (idf_sum / idf.len() as f64);
	for term in negative { idf.insert(term, floor); }
	idf
}
