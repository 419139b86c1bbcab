//! Locate mentions of a name in manuscript text

use regex::RegexBuilder;
use storybible_domain::Mention;

/// Find up to `max` case-insensitive, word-bounded occurrences of `needle`
///
/// Positions are character offsets. Each context is the match plus up to
/// `context_chars` characters on each side, trimmed.
pub fn find_mentions(text: &str, needle: &str, max: usize, context_chars: usize) -> Vec<Mention> {
    let needle = needle.trim();
    if needle.is_empty() || max == 0 {
        return Vec::new();
    }
    let pattern = format!(r"\b{}\b", regex::escape(needle));
    let Ok(re) = RegexBuilder::new(&pattern).case_insensitive(true).build() else {
        return Vec::new();
    };

    re.find_iter(text)
        .take(max)
        .map(|m| {
            let position = text[..m.start()].chars().count();
            let before = text[..m.start()]
                .char_indices()
                .rev()
                .nth(context_chars.saturating_sub(1))
                .map_or(0, |(i, _)| i);
            let before = if context_chars == 0 { m.start() } else { before };
            let after = text[m.end()..]
                .char_indices()
                .nth(context_chars)
                .map_or(text.len(), |(i, _)| m.end() + i);
            let context = text[before..after].trim().to_string();
            Mention {
                position,
                sentence: context.clone(),
                context,
            }
        })
        .collect()
}
