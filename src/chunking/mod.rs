//! Chunking strategies: a word-based sliding window for Q&A-style content
//! and a recursive character splitter for prose, plus the Q&A-format
//! heuristic that selects between them.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ingestion::cleaner::CleanedPage;

/// Separators tried in order by the recursive splitter: paragraphs, lines,
/// sentence punctuation, clause punctuation, words, characters.
const SEPARATORS: &[&str] = &[
    "\n\n",
    "\n",
    r"\.\s+",
    r"\?\s+",
    r"!\s+",
    r";\s+",
    r",\s+",
    r"\s+",
    "",
];

static SEPARATOR_PATTERNS: LazyLock<HashMap<&'static str, Regex>> = LazyLock::new(|| {
    SEPARATORS
        .iter()
        .copied()
        .filter(|&s| !s.is_empty() && s != "\n\n" && s != "\n")
        .map(|s| (s, Regex::new(s).expect("static separator pattern")))
        .collect()
});

static QNA_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?im)Q\.\d+",
        r"(?im)Question\s*\d+",
        r"(?im)^What\s+",
        r"(?im)^How\s+",
        r"(?im)^Why\s+",
        r"(?im)^Where\s+",
        r"(?im)^When\s+",
        r"(?im)^Who\s+",
        r"(?m)\?$",
        r"(?im)Answer:",
        r"(?im)Solution:",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static Q&A pattern"))
    .collect()
});

/// Chunking parameters for both strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Sliding window size in whitespace-delimited tokens
    pub window_size: usize,
    /// Sliding window overlap in tokens
    pub window_overlap: usize,
    /// Recursive splitter chunk size in characters
    pub chunk_size: usize,
    /// Recursive splitter overlap in characters
    pub chunk_overlap: usize,
    /// Chunks shorter than this are merged or dropped
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            window_size: 600,
            window_overlap: 200,
            chunk_size: 1000,
            chunk_overlap: 200,
            min_chunk_size: 100,
        }
    }
}

/// Does this text look like Q&A-formatted content (numbered questions,
/// question-word line starts, explicit answer markers)?
#[inline]
pub fn is_qna_format(text: &str) -> bool {
    !text.is_empty() && QNA_PATTERNS.iter().any(|p| p.is_match(text))
}

/// True when at least 3 of the first 10 pages look Q&A-formatted; documents
/// with fewer than 3 pages never qualify.
#[inline]
pub fn detect_qna_in_pages(pages: &[CleanedPage]) -> bool {
    if pages.len() < 3 {
        return false;
    }
    pages.iter().take(10).filter(|p| is_qna_format(&p.text)).count() >= 3
}

/// Overlapping fixed-size windows over whitespace-delimited tokens. Suited
/// to Q&A content where question/answer pairs straddle arbitrary distances.
#[derive(Debug, Clone, Copy)]
pub struct SlidingWindowChunker {
    chunk_size: usize,
    overlap: usize,
}

impl SlidingWindowChunker {
    #[inline]
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self { chunk_size, overlap }
    }

    #[inline]
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let tokens: Vec<&str> = text.split_whitespace().collect();
        let step = self.chunk_size.saturating_sub(self.overlap).max(1);

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < tokens.len() {
            let end = (start + self.chunk_size).min(tokens.len());
            chunks.push(tokens[start..end].join(" "));
            start += step;
        }
        chunks
    }
}

impl Default for SlidingWindowChunker {
    #[inline]
    fn default() -> Self {
        Self::new(600, 200)
    }
}

impl From<&ChunkingConfig> for SlidingWindowChunker {
    #[inline]
    fn from(config: &ChunkingConfig) -> Self {
        Self::new(config.window_size, config.window_overlap)
    }
}

/// Recursive character splitter: tries coarse separators first and recurses
/// into finer ones for pieces that still exceed the chunk size.
#[derive(Debug, Clone, Copy)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    min_chunk_size: usize,
}

impl RecursiveChunker {
    #[inline]
    pub fn new(chunk_size: usize, chunk_overlap: usize, min_chunk_size: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            min_chunk_size,
        }
    }

    #[inline]
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        if text.chars().count() <= self.chunk_size {
            return vec![text.to_string()];
        }
        self.recursive_split(text, SEPARATORS)
    }

    fn recursive_split(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let Some((separator, remaining)) = separators.split_first() else {
            return self.split_at_boundaries(text);
        };

        let splits = split_by_separator(text, separator);

        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();

        for split in splits {
            let split_len = split.chars().count();
            let current_len = current.chars().count();

            if current_len + split_len > self.chunk_size && current_len >= self.min_chunk_size {
                chunks.push(current.trim().to_string());

                if self.chunk_overlap > 0 {
                    let overlap = self.overlap_text(&current);
                    current = format!("{} {}", overlap, split);
                } else {
                    current = split;
                }
            } else if current.is_empty() {
                current = split;
            } else {
                if !separator.is_empty() {
                    current.push(' ');
                }
                current.push_str(&split);
            }
        }

        if !current.is_empty() && current.chars().count() >= self.min_chunk_size {
            chunks.push(current.trim().to_string());
        }

        // Recurse into chunks that are still too large
        let mut final_chunks = Vec::new();
        for chunk in chunks {
            if chunk.chars().count() > self.chunk_size && !remaining.is_empty() {
                final_chunks.extend(self.recursive_split(&chunk, remaining));
            } else {
                final_chunks.push(chunk);
            }
        }
        final_chunks
    }

    /// Tail of a chunk reused as the head of the next one, sized by the
    /// overlap-to-chunk ratio in words.
    fn overlap_text(&self, text: &str) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();
        let ratio = self.chunk_overlap as f64 / self.chunk_size as f64;
        let overlap_words = ((words.len() as f64 * ratio) as usize).max(1);
        words[words.len().saturating_sub(overlap_words)..].join(" ")
    }

    /// Hard fallback when no separator matched: fixed-size character
    /// windows, backed off to the nearest word boundary.
    fn split_at_boundaries(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let mut end = (start + self.chunk_size).min(chars.len());
            if end < chars.len() {
                while end > start && !matches!(chars[end], ' ' | '\t' | '\n') {
                    end -= 1;
                }
                if end == start {
                    end = (start + self.chunk_size).min(chars.len());
                }
            }

            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim().to_string();
            if !chunk.is_empty() {
                chunks.push(chunk);
            }

            start = if self.chunk_overlap > 0 && end > start + self.chunk_overlap {
                end - self.chunk_overlap
            } else {
                end
            };
        }
        chunks
    }
}

impl Default for RecursiveChunker {
    #[inline]
    fn default() -> Self {
        Self::new(1000, 200, 100)
    }
}

impl From<&ChunkingConfig> for RecursiveChunker {
    #[inline]
    fn from(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap, config.min_chunk_size)
    }
}

/// Split on a separator. Newline separators stay attached to the preceding
/// piece; regex separators are consumed; the empty separator splits into
/// single characters.
fn split_by_separator(text: &str, separator: &str) -> Vec<String> {
    match separator {
        "" => text.chars().map(String::from).collect(),
        "\n\n" | "\n" => text
            .split_inclusive(separator)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        pattern => {
            let regex = &SEPARATOR_PATTERNS[pattern];
            regex
                .split(text)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        }
    }
}
