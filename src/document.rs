//! Document collaborators: paragraph sources and block sinks.
//!
//! The pipeline is deliberately agnostic about document formats. It sees
//! the input as an ordered sequence of paragraph texts behind
//! [`ParagraphSource`], and the output as an append-only paragraph sequence
//! behind [`BlockSink`]. The concrete implementations here read and write
//! plain-text documents (one line per paragraph); richer formats plug in
//! by implementing the same two traits.

use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Error from a [`BlockSink`] append.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The accumulated sequence could not be written or synced to disk.
    #[error("failed to persist output: {0}")]
    Io(#[from] io::Error),
}

/// An ordered sequence of paragraph texts.
///
/// `open` hands out a fresh read handle; extraction consumes it, so
/// re-extracting requires another `open` call.
pub trait ParagraphSource {
    /// Open the document and return its paragraphs in order.
    fn open(&self) -> io::Result<Box<dyn Iterator<Item = io::Result<String>> + Send>>;
}

/// Append-only destination for transformed blocks.
///
/// Implementations must insert the configured separator paragraph before
/// the new block unless the sink is currently empty, and must durably
/// persist the entire accumulated sequence synchronously before returning.
/// Duplicate appends of identical content produce duplicate visible blocks.
pub trait BlockSink {
    fn append_block(&mut self, text: &str) -> Result<(), SinkError>;
}

// ── Plain-text implementations ───────────────────────────────────────────

/// A plain-text document whose lines are its paragraphs.
#[derive(Debug, Clone)]
pub struct TextFileSource {
    path: PathBuf,
}

impl TextFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ParagraphSource for TextFileSource {
    fn open(&self) -> io::Result<Box<dyn Iterator<Item = io::Result<String>> + Send>> {
        let file = File::open(&self.path)?;
        Ok(Box::new(BufReader::new(file).lines()))
    }
}

/// A plain-text sink that rewrites and syncs the output file on every
/// append.
///
/// The whole accumulated sequence is rewritten each time rather than the
/// file being opened in append mode: the separator layout depends on block
/// position, and rewriting keeps the on-disk state equal to the in-memory
/// sequence after every single append, whatever happened on earlier runs.
pub struct TextFileSink {
    path: PathBuf,
    separator: String,
    blocks: Vec<String>,
}

impl TextFileSink {
    pub fn new(path: impl Into<PathBuf>, separator: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            separator: separator.into(),
            blocks: Vec::new(),
        }
    }

    /// Number of blocks appended so far.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn persist(&self) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut contents = String::new();
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                contents.push_str(&self.separator);
                contents.push('\n');
            }
            contents.push_str(block);
            contents.push('\n');
        }

        let mut file = File::create(&self.path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        debug!(path = %self.path.display(), blocks = self.blocks.len(), "output persisted");
        Ok(())
    }
}

impl BlockSink for TextFileSink {
    fn append_block(&mut self, text: &str) -> Result<(), SinkError> {
        self.blocks.push(text.to_string());
        self.persist()
    }
}

// ── Document inspection ──────────────────────────────────────────────────

/// Basic information about a document, gathered without a model call.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub paragraph_count: usize,
    pub file_size: u64,
}

impl TextFileSource {
    /// Count paragraphs and report the file size.
    pub fn info(&self) -> io::Result<DocumentInfo> {
        let paragraph_count = self.open()?.count();
        let file_size = fs::metadata(&self.path)?.len();
        Ok(DocumentInfo {
            paragraph_count,
            file_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_file(path: &Path) -> String {
        let mut s = String::new();
        File::open(path).unwrap().read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn source_yields_lines_as_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.txt");
        fs::write(&path, "one\n\ntwo\n").unwrap();

        let source = TextFileSource::new(&path);
        let paragraphs: Vec<String> = source.open().unwrap().map(|l| l.unwrap()).collect();
        assert_eq!(paragraphs, vec!["one", "", "two"]);
    }

    #[test]
    fn source_open_missing_file_fails() {
        let source = TextFileSource::new("/no/such/document.txt");
        assert!(source.open().is_err());
    }

    #[test]
    fn sink_first_block_has_no_separator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut sink = TextFileSink::new(&path, "***");

        sink.append_block("HELLO").unwrap();
        assert_eq!(read_file(&path), "HELLO\n");
    }

    #[test]
    fn sink_inserts_separator_between_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut sink = TextFileSink::new(&path, "***");

        sink.append_block("HELLO").unwrap();
        sink.append_block("WORLD").unwrap();
        assert_eq!(read_file(&path), "HELLO\n***\nWORLD\n");
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn sink_persists_after_every_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut sink = TextFileSink::new(&path, "***");

        sink.append_block("first").unwrap();
        // On-disk state already reflects the first append.
        assert_eq!(read_file(&path), "first\n");

        sink.append_block("second").unwrap();
        assert_eq!(read_file(&path), "first\n***\nsecond\n");
    }

    #[test]
    fn sink_duplicate_appends_are_visible_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut sink = TextFileSink::new(&path, "-");

        sink.append_block("same").unwrap();
        sink.append_block("same").unwrap();
        assert_eq!(read_file(&path), "same\n-\nsame\n");
    }

    #[test]
    fn sink_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.txt");
        let mut sink = TextFileSink::new(&path, "-");

        sink.append_block("content").unwrap();
        assert_eq!(read_file(&path), "content\n");
    }

    #[test]
    fn info_counts_paragraphs_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.txt");
        fs::write(&path, "a\nb\nc\n").unwrap();

        let info = TextFileSource::new(&path).info().unwrap();
        assert_eq!(info.paragraph_count, 3);
        assert_eq!(info.file_size, 6);
    }
}
