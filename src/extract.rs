//! Block extraction: paragraphs in, blank-line-delimited blocks out.
//!
//! A *block* is a maximal run of non-blank paragraph text bounded by blank
//! paragraphs or document edges. [`BlockExtractor`] walks a paragraph
//! sequence once, accumulating non-blank paragraphs into a buffer and
//! flushing it whenever a blank paragraph (or the end of the document)
//! closes the run. Consecutive blank paragraphs coalesce — flushing an
//! already-empty buffer is a no-op — so a document of only blank
//! paragraphs yields zero blocks.
//!
//! ## Failure semantics
//!
//! If the source cannot be opened, or a read fails mid-document, the
//! iterator yields a single `Err` sentinel and then fuses. Callers must
//! treat the sentinel as terminal; it is how "read failure" is kept
//! distinguishable from "zero blocks" without panicking inside iteration.

use crate::document::ParagraphSource;
use std::io;
use thiserror::Error;

/// An ordered, 0-indexed unit of source content: one or more lines joined
/// by newlines, trimmed of surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub index: usize,
    pub text: String,
}

/// Terminal sentinel yielded when the source cannot be opened or read.
#[derive(Debug, Clone, Error)]
#[error("extraction failed: {detail}")]
pub struct ExtractError {
    pub detail: String,
}

/// Lazily turns a paragraph sequence into a block sequence.
///
/// Finite and not restartable: the source handle is consumed, so
/// re-extracting requires a fresh [`BlockExtractor`].
pub struct BlockExtractor {
    paragraphs: Option<Box<dyn Iterator<Item = io::Result<String>> + Send>>,
    open_error: Option<ExtractError>,
    buffer: String,
    next_index: usize,
    fused: bool,
}

impl BlockExtractor {
    /// Open the source and prepare to extract.
    ///
    /// An open failure is not reported here — it becomes the sentinel on
    /// the first `next()` call, keeping all failure reporting in-band.
    pub fn new(source: &dyn ParagraphSource) -> Self {
        let (paragraphs, open_error) = match source.open() {
            Ok(iter) => (Some(iter), None),
            Err(e) => (
                None,
                Some(ExtractError {
                    detail: e.to_string(),
                }),
            ),
        };
        Self {
            paragraphs,
            open_error,
            buffer: String::new(),
            next_index: 0,
            fused: false,
        }
    }

    fn flush(&mut self) -> TextBlock {
        let text = self.buffer.trim().to_string();
        self.buffer.clear();
        let block = TextBlock {
            index: self.next_index,
            text,
        };
        self.next_index += 1;
        block
    }
}

impl Iterator for BlockExtractor {
    type Item = Result<TextBlock, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        if let Some(err) = self.open_error.take() {
            self.fused = true;
            return Some(Err(err));
        }

        let paragraphs = self.paragraphs.as_mut()?;
        loop {
            match paragraphs.next() {
                Some(Ok(text)) => {
                    if text.trim().is_empty() {
                        if !self.buffer.is_empty() {
                            return Some(Ok(self.flush()));
                        }
                        // Blank paragraph on an empty buffer: coalesce.
                    } else {
                        self.buffer.push_str(&text);
                        self.buffer.push('\n');
                    }
                }
                Some(Err(e)) => {
                    self.fused = true;
                    return Some(Err(ExtractError {
                        detail: e.to_string(),
                    }));
                }
                None => {
                    self.fused = true;
                    if !self.buffer.is_empty() {
                        return Some(Ok(self.flush()));
                    }
                    return None;
                }
            }
        }
    }
}
