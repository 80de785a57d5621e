use tantivy::tokenizer::{LowerCaser, TextAnalyzer, Token, TokenStream, WhitespaceTokenizer};

/// Lowercase + whitespace split. No stemming and no stopword removal, so
/// documents and queries always see the exact same token stream.
pub fn build_analyzer() -> TextAnalyzer {
	TextAnalyzer::builder(WhitespaceTokenizer::default()).filter(LowerCaser).build()
}

#[derive(Clone)]
pub struct Tokenizer {
	analyzer: TextAnalyzer,
}

impl Default for Tokenizer {
	fn default() -> Self { Self { analyzer: build_analyzer() } }
}

impl Tokenizer {
	pub fn tokenize(&self, text: &str) -> Vec<String> {
		// token_stream needs &mut; a clone keeps Tokenizer shareable across readers
		let mut analyzer = self.analyzer.clone();
		let mut stream = analyzer.token_stream(text);
		let mut tokens = Vec::new();
		stream.process(&mut |token: &Token| tokens.push(token.text.clone()));
		tokens
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lowercases_and_splits_on_whitespace_only() {
		let t = Tokenizer::default();
		assert_eq!(t.tokenize("Harry  Potter\tlives in\nLondon."), vec!["harry", "potter", "lives", "in", "london."]);
	}

	#[test]
	fn keeps_stopwords() {
		let t = Tokenizer::default();
		assert_eq!(t.tokenize("The Tour of the Stage"), vec!["the", "tour", "of", "the", "stage"]);
	}

	#[test]
	fn empty_text_has_no_tokens() {
		assert!(Tokenizer::default().tokenize("   ").is_empty());
	}
}
