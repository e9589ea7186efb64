//! Recursive character splitter.
//!
//! Text is split on the first separator (paragraph, line, word, character)
//! that occurs in it. Pieces that are still too long are split again with the
//! remaining separators; short pieces are greedily merged back into chunks of
//! at most `chunk_size` characters, with roughly `chunk_overlap` characters
//! carried over between consecutive chunks. Separators stay attached to the
//! start of the piece that follows them, so chunks are substrings of the
//! source. Lengths are counted in `char`s.

use std::collections::VecDeque;

use crate::errors::RagError;

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Tried in order; `""` means "split into characters".
    pub separators: Vec<String>,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Preset for prose knowledge files.
    pub fn knowledge() -> Self {
        Self::new(500, 50)
    }

    /// Preset for source code.
    pub fn code() -> Self {
        Self::new(2000, 200)
    }

    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be > 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.separators.is_empty() {
            return Err(RagError::Config("separators must not be empty".into()));
        }
        Ok(())
    }

    /// Splits `text` into ordered chunks. Empty or whitespace-only input
    /// yields no chunks.
    pub fn split_text(&self, text: &str) -> Result<Vec<String>, RagError> {
        self.validate()?;
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        Ok(self.split_recursive(text, &separators))
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut remaining: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = sep;
                break;
            }
            if text.contains(sep) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut short: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                short.push(piece);
                continue;
            }
            if !short.is_empty() {
                chunks.extend(self.merge_splits(&short));
                short.clear();
            }
            if remaining.is_empty() {
                if !piece.trim().is_empty() {
                    chunks.push(piece.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }
        if !short.is_empty() {
            chunks.extend(self.merge_splits(&short));
        }
        chunks
    }

    fn merge_splits(&self, splits: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in splits {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(doc) = join_window(&window) {
                    docs.push(doc);
                }
                // Drop from the front until only the overlap remains and the
                // next piece fits.
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(first) => total -= char_len(first),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }
        if let Some(doc) = join_window(&window) {
            docs.push(doc);
        }
        docs
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::knowledge()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn join_window(window: &VecDeque<&str>) -> Option<String> {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Splits before every occurrence of `separator`, keeping it at the start of
/// the following piece. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(&text[start..pos]);
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text() -> String {
        let mut out = String::new();
        for p in 0..12 {
            for s in 0..6 {
                out.push_str(&format!("Paragraph {p} sentence {s} talks about topic{p}x{s} in detail. "));
            }
            out.push_str("\n\n");
        }
        out
    }

    #[test]
    fn presets_are_valid() {
        assert!(ChunkingConfig::knowledge().validate().is_ok());
        assert!(ChunkingConfig::code().validate().is_ok());
    }

    #[test]
    fn overlap_not_smaller_than_size_is_rejected() {
        let cfg = ChunkingConfig::new(100, 100);
        assert!(matches!(cfg.split_text("abc"), Err(RagError::Config(_))));
        assert!(ChunkingConfig::new(0, 0).validate().is_err());
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let cfg = ChunkingConfig::knowledge();
        assert!(cfg.split_text("").unwrap().is_empty());
        assert!(cfg.split_text("  \n\n \n").unwrap().is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let cfg = ChunkingConfig::knowledge();
        let chunks = cfg.split_text("  Scrimba is a coding school.\n").unwrap();
        assert_eq!(chunks, vec!["Scrimba is a coding school.".to_string()]);
    }

    #[test]
    fn chunks_respect_the_size_bound() {
        let text = sample_text();
        for cfg in [ChunkingConfig::new(120, 20), ChunkingConfig::knowledge()] {
            let chunks = cfg.split_text(&text).unwrap();
            assert!(chunks.len() > 1);
            for c in &chunks {
                assert!(c.chars().count() <= cfg.chunk_size, "chunk too long: {}", c.len());
                assert!(!c.trim().is_empty());
            }
        }
    }

    #[test]
    fn chunks_are_ordered_substrings_covering_the_source() {
        let text = sample_text();
        let cfg = ChunkingConfig::new(150, 30);
        let chunks = cfg.split_text(&text).unwrap();

        let mut covered = vec![false; text.len()];
        let mut cursor = 0;
        for c in &chunks {
            let pos = cursor + text[cursor..].find(c.as_str()).expect("chunk must be a substring in order");
            covered[pos..pos + c.len()].iter_mut().for_each(|b| *b = true);
            cursor = pos + 1;
        }
        for (i, ch) in text.char_indices() {
            if !ch.is_whitespace() {
                assert!(covered[i], "byte {i} ({ch:?}) not covered by any chunk");
            }
        }
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let text = sample_text();
        let cfg = ChunkingConfig::new(200, 50);
        let chunks = cfg.split_text(&text).unwrap();
        let overlapping = chunks
            .windows(2)
            .filter(|w| {
                let tail_word = w[0].split_whitespace().last().unwrap_or_default();
                w[1].contains(tail_word)
            })
            .count();
        assert!(overlapping > 0);
    }

    #[test]
    fn long_words_fall_back_to_characters() {
        let cfg = ChunkingConfig::new(10, 2);
        let chunks = cfg.split_text(&"x".repeat(35)).unwrap();
        assert!(chunks.len() >= 4);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn splitting_is_deterministic() {
        let text = sample_text();
        let cfg = ChunkingConfig::new(180, 40);
        assert_eq!(cfg.split_text(&text).unwrap(), cfg.split_text(&text).unwrap());
    }

    #[test]
    fn separator_stays_with_following_piece() {
        assert_eq!(split_keeping_separator("a b c", " "), vec!["a", " b", " c"]);
        assert_eq!(split_keeping_separator("héllo", ""), vec!["h", "é", "l", "l", "o"]);
    }
}
