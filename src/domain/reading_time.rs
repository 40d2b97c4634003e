//! Reading-time estimate for an article.

use crate::domain::{
    entities::ContentBlock,
    rich_text::{self, RichText},
};

pub const WORDS_PER_MINUTE: usize = 200;

/// Words in a heading: whitespace-separated tokens, punctuation included.
pub fn heading_words(heading: &str) -> usize {
    heading.split_whitespace().count()
}

/// Words in a rich text body. Everything outside `[A-Za-z0-9 ]` is removed
/// before splitting, so accented words collapse into their ASCII remainder
/// and punctuation-only tokens vanish.
pub fn body_words(body: &RichText) -> usize {
    let stripped: String = rich_text::as_text(body)
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == ' ')
        .collect();
    stripped.split_whitespace().count()
}

pub fn count_words(blocks: &[ContentBlock]) -> usize {
    blocks
        .iter()
        .map(|block| {
            block.heading.as_deref().map(heading_words).unwrap_or(0)
                + block.body.as_ref().map(body_words).unwrap_or(0)
        })
        .sum()
}

/// Whole minutes, rounded up. Zero words read in zero minutes.
pub fn minutes_for(words: usize) -> u32 {
    let minutes = words.div_ceil(WORDS_PER_MINUTE);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

pub fn estimate(blocks: &[ContentBlock]) -> u32 {
    minutes_for(count_words(blocks))
}
