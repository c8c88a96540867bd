//! Error types for FlexConf parsing.

use thiserror::Error;

use crate::source::SourceBuffer;
use crate::span::Span;

/// Result type for FlexConf parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Diagnostic category of a [`ParseError`].
///
/// The first seven kinds are stable; `Io` only covers reader failures in
/// [`parse_stream`](crate::parse_stream) and never occurs while parsing
/// in-memory text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid UTF-8 in the input bytes.
    Encoding,
    /// Grammar violation not covered by a more specific kind.
    Syntax,
    /// Tabs in indentation, non-multiple indent widths, or an unindent
    /// that matches no outer level.
    Indentation,
    /// Bracket syntax inside an indentation-mode document.
    ModeMismatch,
    /// Duplicate key within one map level.
    Key,
    /// Malformed numeric literal.
    Number,
    /// Unknown directive, malformed pragma, or delimiter collision.
    Pragma,
    /// Failure reading from a stream before parsing started.
    Io,
}

impl ErrorKind {
    /// Stable diagnostic name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Encoding => "EncodingError",
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Indentation => "IndentationError",
            ErrorKind::ModeMismatch => "ModeMismatchError",
            ErrorKind::Key => "KeyError",
            ErrorKind::Number => "NumberError",
            ErrorKind::Pragma => "PragmaError",
            ErrorKind::Io => "IoError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error produced while parsing a FlexConf document.
///
/// Carries the diagnostic kind, a message, the source span of the
/// offending text, and (when the source is available) a rendered snippet
/// with a caret under the offending column.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", render(.kind, .message, .span, .snippet))]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    snippet: Option<String>,
}

fn render(kind: &ErrorKind, message: &str, span: &Span, snippet: &Option<String>) -> String {
    let mut out = if span.line > 0 {
        format!("{kind}: {message} at {span}")
    } else {
        format!("{kind}: {message}")
    };
    if let Some(snippet) = snippet {
        out.push('\n');
        out.push_str(snippet);
    }
    out
}

impl ParseError {
    /// Create an error without a snippet.
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            snippet: None,
        }
    }

    pub(crate) fn encoding(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Encoding, message, span)
    }

    pub(crate) fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Syntax, message, span)
    }

    pub(crate) fn indentation(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Indentation, message, span)
    }

    pub(crate) fn mode_mismatch(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::ModeMismatch, message, span)
    }

    pub(crate) fn key(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Key, message, span)
    }

    pub(crate) fn number(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Number, message, span)
    }

    pub(crate) fn pragma(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Pragma, message, span)
    }

    pub(crate) fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message, Span::default())
    }

    /// Attach a rendered source snippet, unless one is already present.
    pub(crate) fn with_snippet(mut self, src: &SourceBuffer) -> Self {
        if self.snippet.is_none() && self.span.line > 0 {
            self.snippet = Some(src.snippet(&self.span));
        }
        self
    }

    /// The rendered source snippet, if the source was available.
    pub fn snippet(&self) -> Option<&str> {
        self.snippet.as_deref()
    }
}
