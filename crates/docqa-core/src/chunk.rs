//! Line-boundary sliding-window text splitter.
//!
//! Splits extracted document text into [`Chunk`]s of at most
//! `chunk_size` characters, with consecutive chunks overlapping by up to
//! `chunk_overlap` characters.
//!
//! # Algorithm
//!
//! 1. Split the text on `separator` (a newline by default), dropping empty
//!    pieces.
//! 2. Cut any piece longer than `chunk_size` into fixed windows of
//!    `chunk_size` characters advancing by `chunk_size - chunk_overlap`.
//! 3. Merge pieces greedily, rejoined with the separator, until the next
//!    piece would exceed `chunk_size`.
//! 4. On flush, keep trailing pieces totalling at most `chunk_overlap`
//!    characters as the start of the next chunk.
//! 5. Trim each chunk and drop chunks that are empty after trimming.
//!
//! Lengths are measured in characters, never bytes, so multi-byte text is
//! never cut inside a code point.
//!
//! # Example
//!
//! ```rust
//! use docqa_core::chunk::TextSplitter;
//!
//! let splitter = TextSplitter::default();
//! let chunks = splitter.chunk_text("abc123", "The sky is blue.\nGrass is green.");
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].index, 0);
//! ```

use std::collections::VecDeque;

use sha2::{Digest, Sha256};

use crate::models::Chunk;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_SEPARATOR: &str = "\n";

/// Splitter settings. Construct once per configuration and reuse.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separator: String,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP, DEFAULT_SEPARATOR)
    }
}

impl TextSplitter {
    /// `chunk_overlap` is clamped below `chunk_size`; config validation
    /// rejects the invalid combinations before this point.
    pub fn new(chunk_size: usize, chunk_overlap: usize, separator: &str) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separator: separator.to_string(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into chunk strings.
    ///
    /// Returns an empty vector when the text holds only whitespace.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let pieces: Vec<String> = if self.separator.is_empty() {
            vec![text.to_string()]
        } else {
            text.split(self.separator.as_str())
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut windows = Vec::with_capacity(pieces.len());
        for piece in pieces {
            if char_len(&piece) > self.chunk_size {
                windows.extend(self.window(&piece));
            } else {
                windows.push(piece);
            }
        }

        self.merge(windows)
    }

    /// Split `text` and wrap each piece as a [`Chunk`] of `collection`.
    ///
    /// Indices are contiguous from 0 and ids are derived from the
    /// collection key and index, so repeated runs produce identical chunks.
    pub fn chunk_text(&self, collection: &str, text: &str) -> Vec<Chunk> {
        self.split_text(text)
            .into_iter()
            .enumerate()
            .map(|(i, t)| make_chunk(collection, i as i64, t))
            .collect()
    }

    fn window(&self, piece: &str) -> Vec<String> {
        let chars: Vec<char> = piece.chars().collect();
        let stride = self.chunk_size - self.chunk_overlap;
        let mut out = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(chars.len());
            out.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += stride;
        }
        out
    }

    fn merge(&self, pieces: Vec<String>) -> Vec<String> {
        let sep_len = char_len(&self.separator);
        let mut out = Vec::new();
        let mut current: VecDeque<String> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(&piece);
            let joined_sep = if current.is_empty() { 0 } else { sep_len };

            if total + len + joined_sep > self.chunk_size && !current.is_empty() {
                if let Some(chunk) = self.join(&current) {
                    out.push(chunk);
                }
                // Carry the tail forward as overlap, but never so much that
                // the incoming piece no longer fits.
                while total > self.chunk_overlap
                    || (total > 0
                        && total + len + if current.is_empty() { 0 } else { sep_len }
                            > self.chunk_size)
                {
                    let Some(front) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(&front) + if current.is_empty() { 0 } else { sep_len };
                }
            }

            total += len + if current.is_empty() { 0 } else { sep_len };
            current.push_back(piece);
        }

        if let Some(chunk) = self.join(&current) {
            out.push(chunk);
        }
        out
    }

    fn join(&self, pieces: &VecDeque<String>) -> Option<String> {
        let joined = pieces
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(&self.separator);
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn make_chunk(collection: &str, index: i64, text: String) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: format!("{}-{:06}", collection, index),
        collection: collection.to_string(),
        index,
        text,
        hash,
    }
}
