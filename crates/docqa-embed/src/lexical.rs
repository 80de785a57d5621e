use docqa_core::traits::Reranker;

/// Fraction of the query's words that occur (as substrings, case-insensitive)
/// in the passage. Deterministic, no model files; used in offline mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalOverlapReranker;

impl LexicalOverlapReranker {
    pub fn score(query: &str, passage: &str) -> f32 {
        let query_lower = query.to_lowercase();
        let query_words: Vec<&str> = query_lower.split_whitespace().collect();
        if query_words.is_empty() { return 0.0; }
        let content_lower = passage.to_lowercase();
        let hits = query_words.iter().filter(|w| content_lower.contains(*w)).count();
        hits as f32 / query_words.len() as f32
    }
}

impl Reranker for LexicalOverlapReranker {
    fn score_pairs(&self, pairs: &[(&str, &str)]) -> docqa_core::Result<Vec<f32>> {
        Ok(pairs.iter().map(|(q, p)| Self::score(q, p)).collect())
    }
}
