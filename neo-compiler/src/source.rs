//! Loading source text into the normalized, borrow-friendly shape
//! [`neo_lexer::SourceFile`] expects.
//!
//! Grounded on spec §6's "read a UTF-8 buffer" external interface.
//! `neo_lexer::SourceFile<'src>` is a zero-copy borrow over `&'src str` by
//! design (see its own doc comment: "loading from disk is the caller's
//! concern") and so cannot itself own the buffer a path load would
//! allocate. [`LoadedSource`] is that owning buffer; call
//! [`LoadedSource::as_source_file`] to borrow a `SourceFile` from it for
//! exactly as long as it's needed.

use std::path::Path;

use neo_lexer::SourceFile;

/// Why loading a source file failed.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The underlying file could not be read.
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),
    /// The file's bytes are not valid UTF-8.
    #[error("source is not valid UTF-8 (first invalid byte at offset {valid_up_to})")]
    InvalidUtf8 {
        /// Byte offset of the first invalid sequence.
        valid_up_to: usize,
    },
}

/// An owned, normalized source buffer: a name (for diagnostics) and text
/// that has had any UTF-8 BOM stripped, `\r\n` collapsed to `\n`, and a
/// trailing newline appended if one was missing.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    name: String,
    text: String,
}

impl LoadedSource {
    /// Reads `path` from disk and normalizes it.
    pub fn load(path: impl AsRef<Path>) -> Result<LoadedSource, SourceError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let text = match std::str::from_utf8(&bytes) {
            Ok(s) => s.to_string(),
            Err(e) => return Err(SourceError::InvalidUtf8 { valid_up_to: e.valid_up_to() }),
        };
        let name = path.display().to_string();
        Ok(LoadedSource::normalized(name, text))
    }

    /// Wraps an in-memory buffer, applying the same normalization
    /// `load` does so both entry points hand the lexer an identically
    /// shaped buffer.
    pub fn borrowed(name: impl Into<String>, text: impl Into<String>) -> LoadedSource {
        LoadedSource::normalized(name.into(), text.into())
    }

    fn normalized(name: String, text: String) -> LoadedSource {
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text).to_string();
        let mut text = text.replace("\r\n", "\n");
        if !text.ends_with('\n') {
            text.push('\n');
        }
        LoadedSource { name, text }
    }

    /// Borrows a [`SourceFile`] over this buffer's name and text.
    pub fn as_source_file(&self) -> SourceFile<'_> {
        SourceFile::new(&self.name, &self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bom_and_normalizes_line_endings() {
        let src = LoadedSource::borrowed("t.neo", "\u{feff}let x\r\nlet y");
        assert_eq!(src.as_source_file().text, "let x\nlet y\n");
    }

    #[test]
    fn already_normalized_text_is_left_alone() {
        let src = LoadedSource::borrowed("t.neo", "let x\n");
        assert_eq!(src.as_source_file().text, "let x\n");
    }

    #[test]
    fn loading_a_missing_path_reports_io_error() {
        let err = LoadedSource::load("/nonexistent/path/does/not/exist.neo").unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }
}
