//! Token stream produced by the lexer.

use num_bigint::BigInt;

use crate::span::Span;

/// Token kind. Literal kinds carry their decoded payloads.
///
/// `Int` and `BigInt` are one logical integer kind; the split records
/// whether the literal fit the `i64` range or widened to arbitrary
/// precision.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Bare or backtick-quoted identifier (key position only).
    Ident(String),
    /// Decoded string literal.
    Str(String),
    /// Integer within `i64` range.
    Int(i64),
    /// Integer outside `i64` range.
    BigInt(BigInt),
    /// Float literal, including `+inf`, `-inf`, and `nan`.
    Float(f64),
    /// `true` or `false`.
    Bool(bool),
    /// `null`.
    Null,
    /// The configured key-value separator.
    KvSep,
    /// The configured block opener (bracket mode).
    BlockOpen,
    /// The configured block closer (bracket mode).
    BlockClose,
    /// The configured item separator (bracket mode).
    ItemSep,
    /// End of a data line, or a blank-line boundary (indentation mode).
    Newline,
    /// Indentation increased (indentation mode).
    Indent,
    /// Indentation decreased one stack level (indentation mode).
    Dedent,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Human-readable kind name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Ident(_) => "identifier",
            TokenKind::Str(_) => "string",
            TokenKind::Int(_) | TokenKind::BigInt(_) => "integer",
            TokenKind::Float(_) => "float",
            TokenKind::Bool(_) => "boolean",
            TokenKind::Null => "null",
            TokenKind::KvSep => "key separator",
            TokenKind::BlockOpen => "block open",
            TokenKind::BlockClose => "block close",
            TokenKind::ItemSep => "item separator",
            TokenKind::Newline => "newline",
            TokenKind::Indent => "indent",
            TokenKind::Dedent => "dedent",
            TokenKind::Eof => "end of input",
        }
    }

    /// Whether this token can start a primitive value.
    pub(crate) fn is_primitive(&self) -> bool {
        matches!(
            self,
            TokenKind::Str(_)
                | TokenKind::Int(_)
                | TokenKind::BigInt(_)
                | TokenKind::Float(_)
                | TokenKind::Bool(_)
                | TokenKind::Null
        )
    }

    /// Whether this token can appear in key position.
    pub(crate) fn is_key(&self) -> bool {
        matches!(self, TokenKind::Ident(_) | TokenKind::Str(_))
    }
}

/// A single token with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}
