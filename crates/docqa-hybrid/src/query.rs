//! Domain query rewriting: abbreviation substitution and term expansion.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("ss", "silverlight studios"),
    ("studio", "silverlight studios"),
    ("faq", "frequently asked questions"),
    ("t&a", "tours and attractions"),
];

const EXPANSIONS: &[(&str, &[&str])] = &[
    ("tour", &["studio tour", "backlot tour", "production tour"]),
    ("production", &["film production", "movie production", "filming"]),
    ("backlot", &["backlot sets", "outdoor sets", "permanent sets"]),
    ("stage", &["sound stage", "soundstage", "production stage"]),
];

const STUDIO_TERMS: &[&str] = &[
    "silverlight studios", "studio tour", "backlot", "sound stage",
    "production", "filming", "mystwood academy", "maximum velocity",
];

const TOUR_TERMS: &[&str] = &["tour", "visitor", "backlot", "stage", "production", "facilities"];

/// At most this many `" OR "`-joined segments, the rewritten query included.
pub const MAX_SEGMENTS: usize = 3;

fn word_pattern(term: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term))).expect("escaped literal is a valid pattern")
}

static ABBREVIATION_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> =
    LazyLock::new(|| ABBREVIATIONS.iter().map(|(abbr, full)| (word_pattern(abbr), *full)).collect());

static EXPANSION_PATTERNS: LazyLock<Vec<(Regex, &'static [&'static str])>> =
    LazyLock::new(|| EXPANSIONS.iter().map(|(term, phrases)| (word_pattern(term), *phrases)).collect());

#[derive(Debug, Default, Clone, Copy)]
pub struct QueryEnhancer;

impl QueryEnhancer {
    pub fn new() -> Self { Self }

    /// Substitute abbreviations (whole word, any case) with their full form,
    /// then append one unseen expansion per matched term, joined by `" OR "`.
    pub fn enhance(&self, query: &str) -> String {
        let mut rewritten = query.to_string();
        for (pattern, full) in ABBREVIATION_PATTERNS.iter() {
            if pattern.is_match(&rewritten) {
                rewritten = pattern.replace_all(&rewritten, NoExpand(full)).into_owned();
            }
        }
        let lower = rewritten.to_lowercase();

        let mut parts = vec![rewritten.clone()];
        for (pattern, phrases) in EXPANSION_PATTERNS.iter() {
            if !pattern.is_match(&lower) { continue; }
            if let Some(phrase) = phrases.iter().find(|p| !lower.contains(&p.to_lowercase())) {
                parts.push((*phrase).to_string());
            }
        }
        parts.truncate(MAX_SEGMENTS);
        parts.join(" OR ")
    }

    /// Studio terms first, then tour terms not already listed; substring
    /// match on the lowercased query.
    pub fn keywords(&self, query: &str) -> Vec<String> {
        let lower = query.to_lowercase();
        let mut keywords: Vec<String> = Vec::new();
        for term in STUDIO_TERMS.iter().chain(TOUR_TERMS) {
            if lower.contains(term) && !keywords.iter().any(|k| k == term) {
                keywords.push((*term).to_string());
            }
        }
        keywords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_whole_word_abbreviations() {
        let q = QueryEnhancer::new();
        assert_eq!(q.enhance("Where is the SS FAQ?"), "Where is the silverlight studios frequently asked questions?");
        assert_eq!(q.enhance("class schedule"), "class schedule", "ss inside a word is untouched");
        assert_eq!(q.enhance("T&A hours"), "tours and attractions hours");
    }

    #[test]
    fn studio_is_not_rewritten_inside_studios() {
        let q = QueryEnhancer::new();
        assert_eq!(q.enhance("ss parking"), "silverlight studios parking");
    }

    #[test]
    fn appends_first_unseen_expansion() {
        let q = QueryEnhancer::new();
        assert_eq!(q.enhance("Book a tour"), "Book a tour OR studio tour");
        assert_eq!(q.enhance("studio tour"), "silverlight studios tour OR studio tour");
        assert_eq!(q.enhance("the Stage"), "the Stage OR sound stage");
        assert_eq!(q.enhance("sound stage"), "sound stage OR soundstage");
    }

    #[test]
    fn caps_segments_at_three() {
        let q = QueryEnhancer::new();
        let out = q.enhance("tour production backlot stage");
        assert_eq!(out, "tour production backlot stage OR studio tour OR film production");
        assert_eq!(out.split(" OR ").count(), MAX_SEGMENTS);
    }

    #[test]
    fn unchanged_query_without_matches() {
        assert_eq!(QueryEnhancer::new().enhance("when does the park open"), "when does the park open");
        assert_eq!(QueryEnhancer::new().enhance(""), "");
    }

    #[test]
    fn keywords_follow_list_order_without_duplicates() {
        let q = QueryEnhancer::new();
        assert_eq!(q.keywords("Backlot tour for a visitor"), vec!["backlot", "tour", "visitor"]);
        assert_eq!(q.keywords("Sound Stage production"), vec!["sound stage", "production", "stage"]);
        assert!(q.keywords("lunch menu").is_empty());
    }
}
