//! Source buffer: validated UTF-8 text with a line index for diagnostics.
//!
//! The buffer is built once per parse. It strips an optional BOM,
//! normalizes CRLF line endings to LF, and precomputes line start
//! offsets so that errors can be rendered with line/column positions and
//! caret snippets.

use crate::error::{ParseError, Result};
use crate::span::Span;

/// The full document text, validated and normalized.
#[derive(Debug)]
pub struct SourceBuffer {
    text: String,
    /// Byte offset of the start of each line.
    line_starts: Vec<usize>,
}

impl SourceBuffer {
    /// Build a buffer from raw bytes, validating UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match std::str::from_utf8(bytes) {
            Ok(text) => Ok(Self::from_text(text)),
            Err(e) => {
                let offset = e.valid_up_to();
                // Safe: the prefix up to `valid_up_to` is valid UTF-8.
                let prefix = std::str::from_utf8(&bytes[..offset]).unwrap();
                let line = prefix.matches('\n').count() + 1;
                let col = prefix
                    .rsplit('\n')
                    .next()
                    .map(|tail| tail.chars().count())
                    .unwrap_or(0)
                    + 1;
                Err(ParseError::encoding(
                    format!("invalid UTF-8 at byte offset {offset}"),
                    Span::point(line, col, offset),
                ))
            }
        }
    }

    /// Build a buffer from already-validated text.
    pub fn from_text(input: &str) -> Self {
        let stripped = input.strip_prefix('\u{FEFF}').unwrap_or(input);
        let text = if stripped.contains("\r\n") {
            stripped.replace("\r\n", "\n")
        } else {
            stripped.to_string()
        };

        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }

        Self { text, line_starts }
    }

    /// The normalized document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The character starting at `offset`, if the offset is in bounds and
    /// on a character boundary.
    pub fn at(&self, offset: usize) -> Option<char> {
        self.text.get(offset..).and_then(|rest| rest.chars().next())
    }

    /// Translate a byte offset into a 1-indexed (line, column) pair.
    /// Columns count code points.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let start = self.line_starts[line_idx];
        let col = self.text[start..offset].chars().count() + 1;
        (line_idx + 1, col)
    }

    /// The text of a 1-indexed line, without its trailing newline.
    pub fn line_text(&self, line: usize) -> &str {
        if line == 0 || line > self.line_starts.len() {
            return "";
        }
        let start = self.line_starts[line - 1];
        let end = self
            .line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        &self.text[start..end]
    }

    /// Render the line containing `span` with a caret run under the
    /// offending columns.
    pub fn snippet(&self, span: &Span) -> String {
        let line_text = self.line_text(span.line);
        let line_len = line_text.chars().count();
        let gutter = format!("{:>4} | ", span.line);
        let pad = " ".repeat(gutter.len() + span.col.saturating_sub(1));
        let width = span.len.max(1).min(line_len.saturating_sub(span.col - 1).max(1));
        format!("{gutter}{line_text}\n{pad}{carets}", carets = "^".repeat(width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_line_col() {
        let src = SourceBuffer::from_text("ab\ncd\nef");
        assert_eq!(src.line_col(0), (1, 1));
        assert_eq!(src.line_col(1), (1, 2));
        assert_eq!(src.line_col(3), (2, 1));
        assert_eq!(src.line_col(7), (3, 2));
    }

    #[test]
    fn test_line_col_counts_code_points() {
        let src = SourceBuffer::from_text("é: 1");
        // The é occupies two bytes but one column.
        assert_eq!(src.line_col(2), (1, 2));
    }

    #[test]
    fn test_at() {
        let src = SourceBuffer::from_text("a\nb");
        assert_eq!(src.at(0), Some('a'));
        assert_eq!(src.at(2), Some('b'));
        assert_eq!(src.at(3), None);
    }

    #[test]
    fn test_bom_stripped() {
        let src = SourceBuffer::from_text("\u{FEFF}a: 1");
        assert_eq!(src.text(), "a: 1");
    }

    #[test]
    fn test_crlf_normalized() {
        let src = SourceBuffer::from_text("a: 1\r\nb: 2\r\n");
        assert_eq!(src.text(), "a: 1\nb: 2\n");
    }

    #[test]
    fn test_invalid_utf8() {
        let err = SourceBuffer::from_bytes(b"a: 1\n\xFF").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Encoding);
        assert_eq!(err.span.line, 2);
        assert_eq!(err.span.col, 1);
    }

    #[test]
    fn test_snippet_caret_position() {
        let src = SourceBuffer::from_text("a: 1\nbb: oops");
        let rendered = src.snippet(&Span::new(2, 5, 9, 4));
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("   2 | bb: oops"));
        assert_eq!(lines.next(), Some("           ^^^^"));
    }

    #[test]
    fn test_line_text_last_line_without_newline() {
        let src = SourceBuffer::from_text("a\nbc");
        assert_eq!(src.line_text(1), "a");
        assert_eq!(src.line_text(2), "bc");
    }
}
