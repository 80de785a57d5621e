//! Reciprocal Rank Fusion of the dense and sparse candidate lists.

use std::collections::HashMap;

use docqa_core::types::{Candidate, RetrievalMethod};

pub const RRF_K: f32 = 60.0;

/// Number of leading characters (Unicode scalar values) that identify a
/// candidate across the two lists.
pub const FUSION_KEY_CHARS: usize = 100;

/// Case-sensitive, unnormalized prefix of `text`. Distinct chunks sharing the
/// first 100 characters collapse into one record.
pub fn fusion_key(text: &str) -> String { text.chars().take(FUSION_KEY_CHARS).collect() }

struct Fused {
    candidate: Candidate,
    score: f32,
    dense: bool,
    sparse: bool,
}

/// Dense item at 0-based rank `r` contributes `alpha / (K + r + 1)`, sparse
/// `(1 - alpha) / (K + r + 1)`. A zero-weight list still lends its score
/// fields to records it shares with the other list; records whose fused
/// score stays zero are omitted.
///
/// The first record seen for a key keeps its id, text and metadata; the
/// highest similarity (with its distance) and highest bm25 score seen are
/// kept. Output is sorted
/// by fused score, descending, ties in first-seen order. Not truncated.
pub fn reciprocal_rank_fusion(dense: Vec<Candidate>, sparse: Vec<Candidate>, alpha: f32) -> Vec<Candidate> {
    let mut fused: Vec<Fused> = Vec::with_capacity(dense.len() + sparse.len());
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for (weight, list, from_dense) in [(alpha, dense, true), (1.0 - alpha, sparse, false)] {
        for (rank, candidate) in list.into_iter().enumerate() {
            let contribution = if weight > 0.0 { weight / (RRF_K + rank as f32 + 1.0) } else { 0.0 };
            let key = fusion_key(&candidate.text);
            match by_key.get(&key) {
                Some(&slot) => {
                    let entry = &mut fused[slot];
                    entry.score += contribution;
                    if candidate.similarity.is_some() && candidate.similarity > entry.candidate.similarity {
                        entry.candidate.similarity = candidate.similarity;
                        entry.candidate.distance = candidate.distance;
                    }
                    entry.candidate.bm25_score = max_opt(entry.candidate.bm25_score, candidate.bm25_score);
                    if from_dense { entry.dense = true } else { entry.sparse = true }
                }
                None => {
                    by_key.insert(key, fused.len());
                    fused.push(Fused { candidate, score: contribution, dense: from_dense, sparse: !from_dense });
                }
            }
        }
    }

    let mut out: Vec<Candidate> = fused
        .into_iter()
        .filter(|f| f.score > 0.0)
        .map(|f| {
            let mut c = f.candidate;
            c.fusion_score = Some(f.score);
            c.retrieval_method = match (f.dense, f.sparse) {
                (true, true) => RetrievalMethod::Hybrid,
                (true, false) => RetrievalMethod::Dense,
                _ => RetrievalMethod::Sparse,
            };
            c
        })
        .collect();
    out.sort_by(|a, b| b.fusion_score.unwrap_or(0.0).total_cmp(&a.fusion_score.unwrap_or(0.0)));
    out
}

fn max_opt(a: Option<f32>, b: Option<f32>) -> Option<f32> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::{DenseHit, Meta, SparseDocument};

    fn dense(id: &str, text: &str, distance: f32) -> Candidate {
        Candidate::from_dense(DenseHit { id: id.into(), text: text.into(), metadata: Meta::new(), distance })
    }

    fn sparse(pos: usize, text: &str, score: f32) -> Candidate {
        Candidate::from_sparse(SparseDocument { position: pos, doc_id: pos.to_string(), text: text.into(), metadata: Meta::new() }, score)
    }

    #[test]
    fn shared_key_sums_contributions_and_becomes_hybrid() {
        let out = reciprocal_rank_fusion(vec![dense("d0", "castle gate", 0.25)], vec![sparse(0, "castle gate", 3.0)], 0.5);
        assert_eq!(out.len(), 1);
        let c = &out[0];
        assert_eq!(c.id, "d0", "first seen record wins");
        assert_eq!(c.retrieval_method, RetrievalMethod::Hybrid);
        assert!((c.fusion_score.unwrap() - 1.0 / 61.0).abs() < 1e-7);
        assert_eq!(c.similarity, Some(0.75));
        assert_eq!(c.bm25_score, Some(3.0));
    }

    #[test]
    fn single_source_keeps_its_tag() {
        let out = reciprocal_rank_fusion(vec![dense("d0", "moat", 0.1)], vec![sparse(4, "tower", 2.0)], 0.5);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].retrieval_method, RetrievalMethod::Dense, "equal scores keep dense first");
        assert_eq!(out[1].retrieval_method, RetrievalMethod::Sparse);
        assert_eq!(out[1].similarity, None);
    }

    #[test]
    fn keeps_max_similarity_for_duplicate_prefix() {
        let prefix = "x".repeat(100);
        let out = reciprocal_rank_fusion(vec![dense("a", &format!("{prefix}A"), 0.6), dense("b", &format!("{prefix}B"), 0.1)], vec![], 1.0);
        assert_eq!(out.len(), 1, "prefix collision collapses distinct chunks");
        assert_eq!(out[0].id, "a");
        assert!((out[0].similarity.unwrap() - 0.9).abs() < 1e-6);
        assert!((out[0].fusion_score.unwrap() - (1.0 / 61.0 + 1.0 / 62.0)).abs() < 1e-7);
    }

    #[test]
    fn key_counts_characters_not_bytes() {
        let s: String = "é".repeat(150);
        assert_eq!(fusion_key(&s).chars().count(), 100);
        assert_eq!(fusion_key("short"), "short");
    }

    #[test]
    fn keeps_distance_of_the_best_similarity() {
        let prefix = "y".repeat(100);
        let out = reciprocal_rank_fusion(vec![dense("a", &format!("{prefix}A"), 0.5), dense("b", &format!("{prefix}B"), 0.25)], vec![], 1.0);
        assert_eq!(out[0].id, "a");
        assert_eq!(out[0].similarity, Some(0.75));
        assert_eq!(out[0].distance, Some(0.25));
    }

    #[test]
    fn zero_weight_list_only_lends_score_fields() {
        let d = || vec![dense("d0", "alpha", 0.25), dense("d1", "beta", 0.5)];
        let s = || vec![sparse(7, "gamma", 5.0), sparse(0, "alpha", 1.0)];

        let only_dense = reciprocal_rank_fusion(d(), s(), 1.0);
        assert_eq!(only_dense.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec!["d0", "d1"]);
        assert_eq!(only_dense[0].bm25_score, Some(1.0));
        assert_eq!(only_dense[0].retrieval_method, RetrievalMethod::Hybrid);
        assert_eq!(only_dense[1].retrieval_method, RetrievalMethod::Dense);
        assert!((only_dense[0].fusion_score.unwrap() - 1.0 / 61.0).abs() < 1e-7);

        let only_sparse = reciprocal_rank_fusion(d(), s(), 0.0);
        assert_eq!(only_sparse.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec!["7", "d0"]);
        assert_eq!(only_sparse[0].retrieval_method, RetrievalMethod::Sparse);
        assert_eq!(only_sparse[1].similarity, Some(0.75), "shared record keeps its dense similarity");
        assert_eq!(only_sparse[1].bm25_score, Some(1.0));
        assert!(only_sparse.iter().all(|c| c.fusion_score.unwrap() > 0.0));
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let out = reciprocal_rank_fusion(
            vec![dense("d0", "one", 0.1), dense("d1", "two", 0.2)],
            vec![sparse(0, "three", 2.0), sparse(1, "two", 1.0)],
            0.5,
        );
        let ids: Vec<&str> = out.iter().map(|c| c.id.as_str()).collect();
        // "two" is dense rank 1 + sparse rank 1; "one" and "three" tie at 0.5/61
        assert_eq!(ids, vec!["d1", "d0", "0"]);
    }
}
