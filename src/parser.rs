//! Recursive-descent parser over the token stream.
//!
//! Both modes share the unified container model: a block's shape is
//! decided by looking at its first item (two tokens of look-ahead, a key
//! followed by the key separator means Keyed) and frozen. The bracket
//! parser walks delimiter-separated items; the indentation parser walks
//! newline-terminated items grouped into blank-line paragraphs, which is
//! how anonymous-map elements of a list are delimited.

use crate::builder::{ContainerBuilder, Shape};
use crate::error::{ParseError, Result};
use crate::lexer::Mode;
use crate::source::SourceBuffer;
use crate::span::Span;
use crate::token::{Token, TokenKind};
use crate::value::Value;

/// Parse a token stream into the document's root value.
pub fn parse_tokens(src: &SourceBuffer, mode: Mode, tokens: &[Token]) -> Result<Value> {
    let mut parser = Parser {
        tokens,
        pos: 0,
    };
    let result = match mode {
        Mode::Bracket => parser.parse_bracket_document(),
        Mode::Indentation => parser.parse_indentation_document(),
    };
    result.map_err(|e| e.with_snippet(src))
}

/// What terminates an indentation-mode block.
#[derive(Clone, Copy, PartialEq, Eq)]
enum BlockEnd {
    /// The implicit root block, terminated by end of input.
    Document,
    /// A nested block, terminated by its matching dedent.
    Dedent,
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    /// The stream always ends with `Eof`, so peeking saturates there.
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, n: usize) -> &Token {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Whether the next item starts `key KV_SEP`, the look-ahead that
    /// decides block shape.
    fn at_keyed_item(&self) -> bool {
        self.peek().kind.is_key() && matches!(self.peek_at(1).kind, TokenKind::KvSep)
    }

    /// Consume a key token. Callers check `is_key` first.
    fn take_key(&mut self) -> (String, Span) {
        let token = self.bump();
        match token.kind {
            TokenKind::Ident(s) | TokenKind::Str(s) => (s, token.span),
            other => unreachable!("not a key token: {other:?}"),
        }
    }

    // ------------------------------------------------------------------
    // Bracket mode
    // ------------------------------------------------------------------

    fn parse_bracket_document(&mut self) -> Result<Value> {
        let value = self.parse_bracket_block()?;
        let t = self.peek();
        match t.kind {
            TokenKind::Eof => Ok(value),
            TokenKind::BlockClose => Err(ParseError::syntax("unmatched brace", t.span)),
            _ => Err(ParseError::syntax(
                format!("unexpected {} after top-level block", t.kind.name()),
                t.span,
            )),
        }
    }

    fn parse_bracket_block(&mut self) -> Result<Value> {
        let open = self.bump();
        debug_assert!(matches!(open.kind, TokenKind::BlockOpen));

        let mut builder = ContainerBuilder::new();
        if matches!(self.peek().kind, TokenKind::BlockClose) {
            self.bump();
            return Ok(builder.finish());
        }

        let keyed = self.at_keyed_item();
        loop {
            if keyed {
                if !self.at_keyed_item() {
                    let t = self.peek();
                    if t.kind.is_primitive() || matches!(t.kind, TokenKind::BlockOpen) {
                        return Err(ParseError::syntax(
                            "mixed keyed and positional items",
                            t.span,
                        ));
                    }
                    if matches!(t.kind, TokenKind::Eof) {
                        return Err(unmatched_brace(open.span));
                    }
                    return Err(ParseError::syntax(
                        format!("expected key, found {}", t.kind.name()),
                        t.span,
                    ));
                }
                let (key, key_span) = self.take_key();
                self.bump(); // key separator
                let value = self.parse_bracket_value(open.span)?;
                builder.insert_keyed(key, key_span, value)?;
            } else {
                if self.at_keyed_item() {
                    return Err(ParseError::syntax(
                        "mixed keyed and positional items",
                        self.peek().span,
                    ));
                }
                let value = self.parse_bracket_value(open.span)?;
                builder.push_positional(value);
            }

            match self.peek().kind {
                TokenKind::ItemSep => {
                    self.bump();
                    // A trailing separator before the close is dropped.
                    if matches!(self.peek().kind, TokenKind::BlockClose) {
                        self.bump();
                        return Ok(builder.finish());
                    }
                }
                TokenKind::BlockClose => {
                    self.bump();
                    return Ok(builder.finish());
                }
                TokenKind::Eof => return Err(unmatched_brace(open.span)),
                _ => {
                    let t = self.peek();
                    return Err(ParseError::syntax(
                        format!(
                            "expected item separator or block close, found {}",
                            t.kind.name()
                        ),
                        t.span,
                    ));
                }
            }
        }
    }

    fn parse_bracket_value(&mut self, open_span: Span) -> Result<Value> {
        if matches!(self.peek().kind, TokenKind::BlockOpen) {
            return self.parse_bracket_block();
        }
        if self.peek().kind.is_primitive() {
            let token = self.bump();
            return Ok(primitive_value(token.kind));
        }
        let t = self.peek();
        match t.kind {
            TokenKind::Ident(_) => Err(ParseError::syntax(
                "unquoted identifier cannot be used as a value",
                t.span,
            )),
            TokenKind::Eof => Err(unmatched_brace(open_span)),
            _ => Err(ParseError::syntax(
                format!("expected value, found {}", t.kind.name()),
                t.span,
            )),
        }
    }

    // ------------------------------------------------------------------
    // Indentation mode
    // ------------------------------------------------------------------

    fn parse_indentation_document(&mut self) -> Result<Value> {
        let value = self.parse_indent_block(BlockEnd::Document)?;
        let t = self.peek();
        match t.kind {
            TokenKind::Eof => Ok(value),
            _ => Err(ParseError::syntax(
                format!("unexpected {} after document root", t.kind.name()),
                t.span,
            )),
        }
    }

    /// Parse one block: a run of blank-line-separated paragraphs at one
    /// indent level. A multi-paragraph Keyed block is a sequence of
    /// anonymous maps; paragraphs of a Positional block flatten into one
    /// sequence.
    fn parse_indent_block(&mut self, end: BlockEnd) -> Result<Value> {
        let mut paragraphs: Vec<ContainerBuilder> = Vec::new();
        let mut current = ContainerBuilder::new();
        let mut shape = Shape::Undecided;

        loop {
            match self.peek().kind {
                TokenKind::Newline => {
                    // Blank-line boundary between paragraphs.
                    self.bump();
                    if current.shape() != Shape::Undecided {
                        paragraphs.push(std::mem::replace(&mut current, ContainerBuilder::new()));
                    }
                }
                TokenKind::Dedent => {
                    if end == BlockEnd::Dedent {
                        self.bump();
                        break;
                    }
                    let t = self.peek();
                    return Err(ParseError::syntax("unexpected dedent", t.span));
                }
                TokenKind::Eof => {
                    if end == BlockEnd::Document {
                        break;
                    }
                    let t = self.peek();
                    return Err(ParseError::syntax(
                        "unexpected end of input in nested block",
                        t.span,
                    ));
                }
                TokenKind::Indent => {
                    let t = self.peek();
                    return Err(ParseError::indentation("unexpected indent", t.span));
                }
                _ => {
                    if self.at_keyed_item() {
                        if shape == Shape::Positional {
                            return Err(ParseError::syntax(
                                "mixed keyed and positional items",
                                self.peek().span,
                            ));
                        }
                        shape = Shape::Keyed;
                        let (key, key_span) = self.take_key();
                        self.bump(); // key separator
                        let value = self.parse_entry_value()?;
                        current.insert_keyed(key, key_span, value)?;
                    } else {
                        if shape == Shape::Keyed {
                            return Err(ParseError::syntax(
                                "mixed keyed and positional items",
                                self.peek().span,
                            ));
                        }
                        shape = Shape::Positional;
                        let value = self.parse_primitive()?;
                        self.expect_newline()?;
                        current.push_positional(value);
                    }
                }
            }
        }

        if current.shape() != Shape::Undecided {
            paragraphs.push(current);
        }
        Ok(finish_block(shape, paragraphs))
    }

    /// The value of a keyed entry: either a primitive on the same line,
    /// or a nested block on the following indented lines.
    fn parse_entry_value(&mut self) -> Result<Value> {
        if matches!(self.peek().kind, TokenKind::Newline) {
            self.bump();
            if matches!(self.peek().kind, TokenKind::Indent) {
                self.bump();
                return self.parse_indent_block(BlockEnd::Dedent);
            }
            let t = self.peek();
            return Err(ParseError::syntax(
                "expected a value or an indented block after key",
                t.span,
            ));
        }
        let value = self.parse_primitive()?;
        self.expect_newline()?;
        Ok(value)
    }

    fn parse_primitive(&mut self) -> Result<Value> {
        if self.peek().kind.is_primitive() {
            let token = self.bump();
            return Ok(primitive_value(token.kind));
        }
        let t = self.peek();
        match t.kind {
            TokenKind::Ident(_) => Err(ParseError::syntax(
                "unquoted identifier cannot be used as a value",
                t.span,
            )),
            _ => Err(ParseError::syntax(
                format!("expected value, found {}", t.kind.name()),
                t.span,
            )),
        }
    }

    fn expect_newline(&mut self) -> Result<()> {
        if matches!(self.peek().kind, TokenKind::Newline) {
            self.bump();
            return Ok(());
        }
        let t = self.peek();
        Err(ParseError::syntax(
            format!("expected end of line, found {}", t.kind.name()),
            t.span,
        ))
    }
}

fn unmatched_brace(open_span: Span) -> ParseError {
    ParseError::syntax("unmatched brace", open_span)
}

/// Convert a literal token into its value.
fn primitive_value(kind: TokenKind) -> Value {
    match kind {
        TokenKind::Str(s) => Value::Str(s),
        TokenKind::Int(n) => Value::Int(n),
        TokenKind::BigInt(n) => Value::BigInt(n),
        TokenKind::Float(f) => Value::Float(f),
        TokenKind::Bool(b) => Value::Bool(b),
        TokenKind::Null => Value::Null,
        other => unreachable!("not a primitive token: {other:?}"),
    }
}

/// Assemble an indentation-mode block from its paragraphs.
fn finish_block(shape: Shape, mut paragraphs: Vec<ContainerBuilder>) -> Value {
    if paragraphs.len() <= 1 {
        return paragraphs
            .pop()
            .unwrap_or_else(ContainerBuilder::new)
            .finish();
    }
    match shape {
        Shape::Keyed => Value::Seq(
            paragraphs
                .into_iter()
                .map(ContainerBuilder::finish)
                .collect(),
        ),
        Shape::Positional => {
            let mut all = Vec::new();
            for paragraph in paragraphs {
                if let Value::Seq(items) = paragraph.finish() {
                    all.extend(items);
                }
            }
            Value::Seq(all)
        }
        Shape::Undecided => unreachable!("paragraphs only collect decided builders"),
    }
}
