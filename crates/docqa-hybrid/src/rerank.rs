use docqa_core::error::{Error, Result};
use docqa_core::traits::Reranker;
use docqa_core::types::Candidate;

/// Score every candidate against `query` in one batched call, attach
/// `rerank_score` and sort descending. Ties keep their incoming order.
pub fn rerank(reranker: &dyn Reranker, query: &str, mut candidates: Vec<Candidate>) -> Result<Vec<Candidate>> {
    if candidates.is_empty() { return Ok(candidates); }
    let pairs: Vec<(&str, &str)> = candidates.iter().map(|c| (query, c.text.as_str())).collect();
    let scores = reranker.score_pairs(&pairs)?;
    if scores.len() != candidates.len() {
        return Err(Error::Scoring(format!("reranker returned {} scores for {} candidates", scores.len(), candidates.len())));
    }
    for (candidate, score) in candidates.iter_mut().zip(scores) {
        candidate.rerank_score = Some(score);
    }
    candidates.sort_by(|a, b| b.rerank_score.unwrap_or(f32::NEG_INFINITY).total_cmp(&a.rerank_score.unwrap_or(f32::NEG_INFINITY)));
    tracing::debug!(candidates = candidates.len(), "reranked");
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::{DenseHit, Meta};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed { scores: Vec<f32>, calls: AtomicUsize }

    impl Reranker for Fixed {
        fn score_pairs(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.scores.iter().copied().take(pairs.len()).collect())
        }
    }

    fn cands(n: usize) -> Vec<Candidate> {
        (0..n).map(|i| Candidate::from_dense(DenseHit { id: i.to_string(), text: format!("t{i}"), metadata: Meta::new(), distance: 0.1 })).collect()
    }

    #[test]
    fn one_call_and_stable_ties() {
        let r = Fixed { scores: vec![0.2, 0.9, 0.2, 0.9], calls: AtomicUsize::new(0) };
        let out = rerank(&r, "q", cands(4)).unwrap();
        assert_eq!(r.calls.load(Ordering::SeqCst), 1);
        let ids: Vec<&str> = out.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "0", "2"]);
        assert_eq!(out[0].rerank_score, Some(0.9));
    }

    #[test]
    fn short_score_vector_is_a_scoring_error() {
        let r = Fixed { scores: vec![0.5], calls: AtomicUsize::new(0) };
        assert!(matches!(rerank(&r, "q", cands(2)), Err(Error::Scoring(_))));
    }

    #[test]
    fn empty_input_skips_the_model() {
        let r = Fixed { scores: vec![], calls: AtomicUsize::new(0) };
        assert!(rerank(&r, "q", Vec::new()).unwrap().is_empty());
        assert_eq!(r.calls.load(Ordering::SeqCst), 0);
    }
}
