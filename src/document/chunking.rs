//! Character-budgeted semantic chunking with a sliding overlap.
//!
//! Pages are segmented with `semchunk-rs`, which prefers paragraph, sentence and word
//! boundaries, using a character counter. The segmentation budget is the chunk size minus the
//! overlap, so prefixing each chunk with the tail of its predecessor never pushes it past
//! `TEXT_SPLITTER_CHUNK_SIZE`. Segments are only ever extended at the front, never cut.

use super::{ChunkingError, DocumentChunk, Page};
use crate::config::ChunkingSettings;
use semchunk_rs::Chunker;

fn char_count(segment: &str) -> usize {
    segment.chars().count()
}

/// Split every page into overlapping chunks, preserving page order.
pub fn chunk_pages(
    pages: &[Page],
    settings: ChunkingSettings,
) -> Result<Vec<DocumentChunk>, ChunkingError> {
    if settings.chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }

    let mut chunks = Vec::new();
    for page in pages {
        let texts = chunk_text(&page.text, settings.chunk_size, settings.chunk_overlap);
        chunks.extend(
            texts
                .into_iter()
                .enumerate()
                .map(|(chunk_index, text)| DocumentChunk {
                    text,
                    page: page.number,
                    chunk_index,
                }),
        );
    }
    Ok(chunks)
}

fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let overlap = effective_overlap(chunk_size, overlap);
    let segment_budget = chunk_size - overlap;
    let chunker = Chunker::new(segment_budget, Box::new(char_count));
    let segments: Vec<String> = chunker
        .chunk(text)
        .iter()
        .flat_map(|segment| split_to_budget(segment, segment_budget))
        .collect();
    apply_overlap(segments, chunk_size, overlap)
}

/// Overlap is capped so at least one character of new text fits in every chunk.
fn effective_overlap(chunk_size: usize, overlap: usize) -> usize {
    overlap.min(chunk_size.saturating_sub(1))
}

/// Re-split `text` so no piece exceeds `budget` characters, cutting at whitespace when possible.
fn split_to_budget(text: &str, budget: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = text.trim();
    while !rest.is_empty() {
        if char_count(rest) <= budget {
            pieces.push(rest.to_string());
            break;
        }

        let limit = rest
            .char_indices()
            .nth(budget)
            .map_or(rest.len(), |(offset, _)| offset);
        let boundary = if rest[limit..].starts_with(char::is_whitespace) {
            Some(limit)
        } else {
            rest[..limit].rfind(char::is_whitespace)
        };
        let cut = boundary
            .filter(|&offset| !rest[..offset].trim_end().is_empty())
            .unwrap_or(limit);

        pieces.push(rest[..cut].trim_end().to_string());
        rest = rest[cut..].trim_start();
    }
    pieces
}

fn apply_overlap(chunks: Vec<String>, chunk_size: usize, overlap: usize) -> Vec<String> {
    let overlap = effective_overlap(chunk_size, overlap);
    if overlap == 0 || chunks.len() < 2 {
        return chunks;
    }

    let mut overlapped: Vec<String> = Vec::with_capacity(chunks.len());
    for current in chunks {
        let next = match overlapped.last() {
            Some(previous) => build_overlapped_chunk(previous, &current, overlap, chunk_size),
            None => current,
        };
        overlapped.push(next);
    }
    overlapped
}

fn build_overlapped_chunk(
    previous: &str,
    current: &str,
    overlap: usize,
    chunk_size: usize,
) -> String {
    // One character of the remaining room is kept for the separator.
    let room = chunk_size.saturating_sub(char_count(current));
    let tail = tail_within_budget(previous, overlap.min(room.saturating_sub(1)));
    if tail.is_empty() {
        return current.to_string();
    }

    let mut combined = String::with_capacity(tail.len() + current.len() + 1);
    combined.push_str(tail);
    if !ends_with_whitespace(tail) && !starts_with_whitespace(current) {
        combined.push(' ');
    }
    combined.push_str(current);
    combined
}

/// Longest suffix of `text` within `budget` characters, preferring one that starts on a word.
fn tail_within_budget(text: &str, budget: usize) -> &str {
    if budget == 0 {
        return "";
    }

    let total = char_count(text);
    let mut mid_word = None;
    let mut after_whitespace = true;
    for (index, (offset, ch)) in text.char_indices().enumerate() {
        if ch.is_whitespace() {
            after_whitespace = true;
            continue;
        }
        if total - index <= budget {
            if after_whitespace {
                return &text[offset..];
            }
            mid_word.get_or_insert(&text[offset..]);
        }
        after_whitespace = false;
    }

    mid_word.unwrap_or("")
}

fn starts_with_whitespace(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_whitespace)
}

fn ends_with_whitespace(text: &str) -> bool {
    text.chars().next_back().is_some_and(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(chunk_size: usize, chunk_overlap: usize) -> ChunkingSettings {
        ChunkingSettings {
            chunk_size,
            chunk_overlap,
        }
    }

    #[test]
    fn short_page_is_a_single_chunk() {
        let pages = vec![Page {
            number: 3,
            text: "A short page.".into(),
        }];

        let chunks = chunk_pages(&pages, ChunkingSettings::default()).expect("chunks");

        assert_eq!(
            chunks,
            vec![DocumentChunk {
                text: "A short page.".into(),
                page: 3,
                chunk_index: 0,
            }]
        );
    }

    #[test]
    fn chunks_respect_character_budget() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu";
        let chunks = chunk_text(text, 20, 0);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(char_count(chunk) <= 20, "chunk too long: {chunk:?}");
        }
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn overlap_carries_tail_of_previous_chunk() {
        let chunks = apply_overlap(vec!["one two three".into(), "four five".into()], 20, 5);

        assert_eq!(chunks[0], "one two three");
        assert_eq!(chunks[1], "three four five");
    }

    #[test]
    fn overlap_shrinks_to_fit_without_cutting_the_chunk() {
        let chunks = apply_overlap(vec!["aa bbbb".into(), "cccc dddd".into()], 14, 9);

        assert_eq!(chunks[1], "bbbb cccc dddd");
    }

    #[test]
    fn oversized_segments_are_split_on_whitespace() {
        assert_eq!(
            split_to_budget("alpha beta gamma", 10),
            vec!["alpha beta".to_string(), "gamma".to_string()]
        );
        assert_eq!(
            split_to_budget("abcdefghij", 4),
            vec!["abcd".to_string(), "efgh".to_string(), "ij".to_string()]
        );
    }

    #[test]
    fn tail_starts_on_a_word_when_one_fits() {
        assert_eq!(tail_within_budget("word0001 word0002 word0003", 12), "word0003");
        assert_eq!(tail_within_budget("abcdefgh", 3), "fgh");
        assert_eq!(tail_within_budget("anything", 0), "");
    }

    fn leading_overlap(previous: &[&str], current: &[&str]) -> usize {
        (1..=previous.len().min(current.len()))
            .rev()
            .find(|&n| previous.ends_with(&current[..n]))
            .unwrap_or(0)
    }

    #[test]
    fn default_settings_keep_overlap_budget_and_every_word() {
        let words: Vec<String> = (0..2000).map(|i| format!("word{i:04}")).collect();
        let pages = vec![Page {
            number: 0,
            text: words.join(" "),
        }];
        let settings = ChunkingSettings::default();

        let chunks = chunk_pages(&pages, settings).expect("chunks");

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                char_count(&chunk.text) <= settings.chunk_size,
                "chunk {} has {} chars",
                chunk.chunk_index,
                char_count(&chunk.text)
            );
        }

        let mut rebuilt: Vec<&str> = chunks[0].text.split_whitespace().collect();
        for pair in chunks.windows(2) {
            let previous: Vec<&str> = pair[0].text.split_whitespace().collect();
            let current: Vec<&str> = pair[1].text.split_whitespace().collect();
            let shared = leading_overlap(&previous, &current);
            assert!(
                shared > 0,
                "chunk {} does not start with the tail of its predecessor",
                pair[1].chunk_index
            );
            assert!(
                shared * "word0000 ".len() >= settings.chunk_overlap / 2,
                "chunk {} carries only {shared} words of overlap",
                pair[1].chunk_index
            );
            rebuilt.extend_from_slice(&current[shared..]);
        }

        let original: Vec<&str> = words.iter().map(String::as_str).collect();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn chunks_never_span_pages() {
        let pages = vec![
            Page {
                number: 0,
                text: "first page words that go on for a while".into(),
            },
            Page {
                number: 1,
                text: "second page".into(),
            },
        ];

        let chunks = chunk_pages(&pages, settings(16, 4)).expect("chunks");

        let second: Vec<_> = chunks.iter().filter(|chunk| chunk.page == 1).collect();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].text, "second page");
        assert_eq!(second[0].chunk_index, 0);
        assert!(chunks.iter().filter(|chunk| chunk.page == 0).count() > 1);
    }

    #[test]
    fn whitespace_page_yields_nothing() {
        let pages = vec![Page {
            number: 0,
            text: "  \n\t ".into(),
        }];
        assert!(chunk_pages(&pages, settings(10, 2)).expect("chunks").is_empty());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let error = chunk_pages(&[], settings(0, 0)).unwrap_err();
        assert!(matches!(error, ChunkingError::InvalidChunkSize));
    }
}
