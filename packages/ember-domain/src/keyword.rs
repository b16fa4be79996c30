use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

const STOP_WORDS: &[&str] = &[
	"a", "about", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be",
	"because", "been", "before", "being", "but", "by", "can", "could", "did", "do", "does",
	"doing", "for", "from", "had", "has", "have", "having", "he", "her", "here", "him", "his",
	"how", "i", "if", "in", "into", "is", "it", "its", "just", "me", "more", "most", "my", "no",
	"not", "now", "of", "on", "or", "our", "out", "over", "she", "should", "so", "some", "such",
	"than", "that", "the", "their", "them", "then", "there", "these", "they", "this", "those",
	"to", "too", "under", "until", "up", "very", "was", "we", "were", "what", "when", "where",
	"which", "while", "who", "why", "will", "with", "would", "you", "your",
];

/// Lowercased word tokens with stop words removed.
pub fn tokens(text: &str) -> HashSet<String> {
	text.unicode_words()
		.map(str::to_lowercase)
		.filter(|word| !STOP_WORDS.contains(&word.as_str()))
		.collect()
}

/// Jaccard overlap of the two token sets, in `[0, 1]`.
pub fn keyword_similarity(lhs: &str, rhs: &str) -> f32 {
	let lhs = tokens(lhs);
	let rhs = tokens(rhs);

	jaccard(&lhs, &rhs)
}

pub fn jaccard(lhs: &HashSet<String>, rhs: &HashSet<String>) -> f32 {
	if lhs.is_empty() || rhs.is_empty() {
		return 0.0;
	}

	let intersection = lhs.intersection(rhs).count();
	let union = lhs.union(rhs).count();

	intersection as f32 / union as f32
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stop_words_do_not_count_as_overlap() {
		assert_eq!(keyword_similarity("the and of", "the and of"), 0.0);
	}

	#[test]
	fn case_and_punctuation_are_ignored() {
		let score = keyword_similarity("User prefers DARK mode.", "user prefers dark mode");

		assert!((score - 1.0).abs() < f32::EPSILON);
	}
}
