// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Character-window text splitter
//!
//! Windows are measured in characters, not bytes, so multi-byte text never
//! splits inside a code point. Within each window the split prefers a
//! paragraph break, then a sentence end, then a line break, then a space.

use thiserror::Error;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplitterError {
    #[error("Chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("Overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge { overlap: usize, chunk_size: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, SplitterError> {
        if chunk_size == 0 {
            return Err(SplitterError::ZeroChunkSize);
        }
        if overlap >= chunk_size {
            return Err(SplitterError::OverlapTooLarge {
                overlap,
                chunk_size,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into trimmed, non-empty chunks of at most `chunk_size` chars
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.trim().chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }
        if chars.len() <= self.chunk_size {
            return vec![chars.iter().collect()];
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let chunk_end = if end < chars.len() {
                let window: String = chars[start..end].iter().collect();
                find_break_point(&window, end - start)
                    .map(|offset| start + offset)
                    .unwrap_or(end)
            } else {
                end
            };

            let chunk: String = chars[start..chunk_end].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }

            if chunk_end >= chars.len() {
                break;
            }

            let step = chunk_end - start;
            start = if step > self.overlap {
                chunk_end - self.overlap
            } else {
                chunk_end
            };
        }

        chunks
    }
}

/// Char offset just past the best break in `window`, if one lies far enough in
fn find_break_point(window: &str, window_chars: usize) -> Option<usize> {
    let char_offset = |byte_pos: usize| window[..byte_pos].chars().count();
    let min_offset = window_chars / 3;

    if let Some(pos) = window.rfind("\n\n") {
        let offset = char_offset(pos);
        if offset > min_offset {
            return Some(offset + 2);
        }
    }

    for pattern in [". ", "! ", "? ", ".\n", "!\n", "?\n"] {
        if let Some(pos) = window.rfind(pattern) {
            let offset = char_offset(pos);
            if offset > min_offset {
                return Some(offset + 2);
            }
        }
    }

    if let Some(pos) = window.rfind('\n') {
        let offset = char_offset(pos);
        if offset > min_offset {
            return Some(offset + 1);
        }
    }

    window
        .rfind(char::is_whitespace)
        .map(|pos| char_offset(pos) + 1)
}
