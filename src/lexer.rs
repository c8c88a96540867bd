//! Mode detection and tokenization.
//!
//! The lexer decides the document mode once: bracket if the first
//! significant code point is the configured block opener, indentation
//! otherwise. The indentation tokenizer owns the indent stack and the
//! blank-line rules; the bracket tokenizer treats all whitespace outside
//! strings as insignificant. Delimiters are read from the [`LexerConfig`]
//! at every classification site, never hardcoded.

use num_bigint::BigInt;

use crate::config::LexerConfig;
use crate::error::{ParseError, Result};
use crate::source::SourceBuffer;
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Document mode, decided once per document and frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Indentation,
    Bracket,
}

/// Tokenize `src` under `config`, returning the detected mode and the
/// token stream. The stream always ends with `Eof`.
pub fn tokenize(src: &SourceBuffer, config: &LexerConfig) -> Result<(Mode, Vec<Token>)> {
    let mode = detect_mode(src, config);
    let mut lexer = Lexer::new(src, config, mode);
    lexer.run().map_err(|e| e.with_snippet(src))?;
    Ok((mode, lexer.tokens))
}

/// Inspect the first significant code point to pick the document mode.
/// Comment lines (including pragma lines) are skipped; an empty document
/// defaults to indentation mode.
pub(crate) fn detect_mode(src: &SourceBuffer, config: &LexerConfig) -> Mode {
    let mut rest = src.text();
    loop {
        rest = rest.trim_start();
        match rest.chars().next() {
            Some(c) if c == config.line_comment => match rest.find('\n') {
                Some(i) => rest = &rest[i + 1..],
                None => return Mode::Indentation,
            },
            Some(c) if c == config.block_open => return Mode::Bracket,
            _ => return Mode::Indentation,
        }
    }
}

/// A saved cursor position.
#[derive(Clone, Copy)]
struct Mark {
    pos: usize,
    line: usize,
    col: usize,
}

struct Lexer<'a> {
    config: &'a LexerConfig,
    mode: Mode,
    text: &'a str,
    pos: usize,
    line: usize,
    col: usize,
    tokens: Vec<Token>,
    indent_stack: Vec<usize>,
    base_indent: Option<usize>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a SourceBuffer, config: &'a LexerConfig, mode: Mode) -> Self {
        Self {
            config,
            mode,
            text: src.text(),
            pos: 0,
            line: 1,
            col: 1,
            tokens: Vec::new(),
            indent_stack: vec![0],
            base_indent: None,
        }
    }

    fn run(&mut self) -> Result<()> {
        match self.mode {
            Mode::Bracket => self.run_bracket(),
            Mode::Indentation => self.run_indentation(),
        }
    }

    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            col: self.col,
        }
    }

    fn span_from(&self, m: Mark) -> Span {
        let len = self.text[m.pos..self.pos].chars().count();
        Span::new(m.line, m.col, m.pos, len)
    }

    fn span_at(&self, m: Mark, len: usize) -> Span {
        Span::new(m.line, m.col, m.pos, len)
    }

    fn push(&mut self, kind: TokenKind, span: Span) {
        self.tokens.push(Token::new(kind, span));
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    // ------------------------------------------------------------------
    // Bracket mode
    // ------------------------------------------------------------------

    fn run_bracket(&mut self) -> Result<()> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            if c == self.config.line_comment {
                self.skip_comment();
                continue;
            }
            let m = self.mark();
            if c == self.config.block_open {
                self.bump();
                let span = self.span_from(m);
                self.push(TokenKind::BlockOpen, span);
            } else if c == self.config.block_close {
                self.bump();
                let span = self.span_from(m);
                self.push(TokenKind::BlockClose, span);
            } else if c == self.config.kv_sep {
                self.bump();
                let span = self.span_from(m);
                self.push(TokenKind::KvSep, span);
            } else if c == self.config.item_sep {
                self.bump();
                let span = self.span_from(m);
                self.push(TokenKind::ItemSep, span);
            } else if c == '"' || c == '\'' {
                self.scan_string()?;
            } else if c == '`' {
                self.scan_backtick_key()?;
            } else {
                self.scan_word()?;
            }
        }
        let m = self.mark();
        let span = self.span_at(m, 0);
        self.push(TokenKind::Eof, span);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Indentation mode
    // ------------------------------------------------------------------

    fn run_indentation(&mut self) -> Result<()> {
        self.line_start(true)?;
        while let Some(c) = self.peek() {
            if c == '\n' {
                let m = self.mark();
                self.bump();
                let span = self.span_at(m, 1);
                self.push(TokenKind::Newline, span);
                self.line_start(false)?;
                continue;
            }
            if c == ' ' || c == '\t' || c == '\r' {
                self.bump();
                continue;
            }
            if c == self.config.line_comment {
                self.skip_comment();
                continue;
            }
            let m = self.mark();
            if c == self.config.block_open || c == self.config.block_close {
                return Err(ParseError::mode_mismatch(
                    format!("unexpected `{c}` in indentation mode"),
                    self.span_at(m, 1),
                ));
            }
            if c == self.config.item_sep {
                return Err(ParseError::mode_mismatch(
                    format!("unexpected `{c}` in indentation mode"),
                    self.span_at(m, 1),
                ));
            }
            if c == self.config.kv_sep {
                self.bump();
                let span = self.span_from(m);
                self.push(TokenKind::KvSep, span);
            } else if c == '"' || c == '\'' {
                self.scan_string()?;
            } else if c == '`' {
                self.scan_backtick_key()?;
            } else {
                self.scan_word()?;
            }
        }

        // A final line without a trailing newline still ends in Newline.
        if matches!(
            self.tokens.last().map(|t| &t.kind),
            Some(
                TokenKind::Ident(_)
                    | TokenKind::Str(_)
                    | TokenKind::Int(_)
                    | TokenKind::BigInt(_)
                    | TokenKind::Float(_)
                    | TokenKind::Bool(_)
                    | TokenKind::Null
                    | TokenKind::KvSep
            )
        ) {
            let m = self.mark();
            let span = self.span_at(m, 0);
            self.push(TokenKind::Newline, span);
        }

        // Unwind the indent stack.
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            let m = self.mark();
            let span = self.span_at(m, 0);
            self.push(TokenKind::Dedent, span);
        }
        let m = self.mark();
        let span = self.span_at(m, 0);
        self.push(TokenKind::Eof, span);
        Ok(())
    }

    /// At the start of a physical line: skip blank lines (pure
    /// whitespace, or whitespace plus a comment — both count the same),
    /// then process the indentation of the next data line, emitting
    /// `Indent`/`Dedent` and the blank-line boundary `Newline`.
    fn line_start(&mut self, at_document_start: bool) -> Result<()> {
        let mut blank_lines = 0usize;
        let mut first_blank: Option<Mark> = None;

        loop {
            let line_mark = self.mark();
            let mut width = 0usize;
            loop {
                match self.peek() {
                    Some(' ') => {
                        self.bump();
                        width += 1;
                    }
                    Some('\t') => {
                        let m = self.mark();
                        return Err(ParseError::indentation(
                            "tab not allowed in indentation (use spaces)",
                            self.span_at(m, 1),
                        ));
                    }
                    _ => break,
                }
            }

            match self.peek() {
                None => {
                    return self.end_of_input(blank_lines, at_document_start, first_blank, line_mark);
                }
                Some('\n') => {
                    if first_blank.is_none() {
                        first_blank = Some(line_mark);
                    }
                    self.bump();
                    blank_lines += 1;
                }
                Some(c) if c == self.config.line_comment => {
                    self.skip_comment();
                    if self.peek() == Some('\n') {
                        if first_blank.is_none() {
                            first_blank = Some(line_mark);
                        }
                        self.bump();
                        blank_lines += 1;
                    } else {
                        // Comment at end of input.
                        return self.end_of_input(
                            blank_lines,
                            at_document_start,
                            first_blank,
                            line_mark,
                        );
                    }
                }
                Some(_) => {
                    return self.apply_indent(
                        width,
                        blank_lines,
                        at_document_start,
                        line_mark,
                        first_blank,
                    );
                }
            }
        }
    }

    /// Trailing run before end of input. A single final newline is
    /// fine; blank lines after the last data line are not.
    fn end_of_input(
        &self,
        blank_lines: usize,
        at_document_start: bool,
        first_blank: Option<Mark>,
        line_mark: Mark,
    ) -> Result<()> {
        if blank_lines > 0 && !at_document_start && !self.tokens.is_empty() {
            let m = first_blank.unwrap_or(line_mark);
            return Err(ParseError::syntax(
                "multiple trailing newlines at end of document",
                self.span_at(m, 1),
            ));
        }
        Ok(())
    }

    /// Emit indentation tokens for a data line of the given width.
    fn apply_indent(
        &mut self,
        width: usize,
        blank_lines: usize,
        at_document_start: bool,
        line_mark: Mark,
        first_blank: Option<Mark>,
    ) -> Result<()> {
        // The stack always holds at least the root level 0.
        let top = *self.indent_stack.last().unwrap();

        if at_document_start {
            if width > 0 {
                return Err(ParseError::indentation(
                    "unexpected indent at document start",
                    self.span_at(line_mark, width),
                ));
            }
            return Ok(());
        }

        if width > top {
            if let Some(base) = self.base_indent {
                if (width - top) % base != 0 {
                    return Err(ParseError::indentation(
                        format!("indent of {width} is not a multiple of the base unit {base}"),
                        self.span_at(line_mark, width),
                    ));
                }
            } else {
                self.base_indent = Some(width);
            }
            self.indent_stack.push(width);
            let span = self.span_at(line_mark, width);
            self.push(TokenKind::Indent, span);
            // Blank lines before an indent carry no boundary.
            return Ok(());
        }

        while width < *self.indent_stack.last().unwrap() {
            self.indent_stack.pop();
            let span = self.span_at(line_mark, width.max(1));
            self.push(TokenKind::Dedent, span);
        }
        if width != *self.indent_stack.last().unwrap() {
            return Err(ParseError::indentation(
                "unindent does not match any outer indentation level",
                self.span_at(line_mark, width.max(1)),
            ));
        }

        // Blank lines before a dedent carry no boundary either; only a
        // run between two lines at the same level does.
        if blank_lines > 0 && width == top {
            let m = first_blank.unwrap_or(line_mark);
            let span = self.span_at(m, 1);
            self.push(TokenKind::Newline, span);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // String literals
    // ------------------------------------------------------------------

    fn scan_string(&mut self) -> Result<()> {
        let m = self.mark();
        // Safe: the caller peeked a quote.
        let quote = self.peek().unwrap();
        let triple: String = std::iter::repeat(quote).take(3).collect();
        if self.text[self.pos..].starts_with(&triple) {
            self.scan_multiline_string(quote, m)
        } else {
            self.scan_single_line_string(quote, m)
        }
    }

    fn scan_single_line_string(&mut self, quote: char, m: Mark) -> Result<()> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(ParseError::syntax(
                        "unterminated string literal",
                        self.span_from(m),
                    ));
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some('\\') if quote == '"' => {
                    let esc = self.scan_escape()?;
                    out.push(esc);
                }
                Some(c) if quote == '"' && (c as u32) < 0x20 => {
                    let here = self.mark();
                    return Err(ParseError::syntax(
                        "control character in string literal",
                        self.span_at(here, 1),
                    ));
                }
                Some(c) => {
                    self.bump();
                    out.push(c);
                }
            }
        }
        let span = self.span_from(m);
        self.push(TokenKind::Str(out), span);
        Ok(())
    }

    fn scan_multiline_string(&mut self, quote: char, m: Mark) -> Result<()> {
        let closer: String = std::iter::repeat(quote).take(3).collect();
        for _ in 0..3 {
            self.bump();
        }
        // The first newline after the opening triple quote is discarded.
        if self.peek() == Some('\n') {
            self.bump();
        }
        let mut out = String::new();
        loop {
            if self.text[self.pos..].starts_with(&closer) {
                for _ in 0..3 {
                    self.bump();
                }
                break;
            }
            match self.peek() {
                None => {
                    return Err(ParseError::syntax(
                        "unterminated multiline string literal",
                        self.span_at(m, 3),
                    ));
                }
                Some('\\') if quote == '"' => {
                    let esc = self.scan_escape()?;
                    out.push(esc);
                }
                Some(c) => {
                    self.bump();
                    out.push(c);
                }
            }
        }
        let span = self.span_from(m);
        self.push(TokenKind::Str(out), span);
        Ok(())
    }

    /// Decode one backslash escape in a basic string. The cursor sits on
    /// the backslash.
    fn scan_escape(&mut self) -> Result<char> {
        let m = self.mark();
        self.bump();
        let c = match self.bump() {
            Some('"') => '"',
            Some('\\') => '\\',
            Some('b') => '\u{0008}',
            Some('f') => '\u{000C}',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('u') => self.scan_unicode_escape(4, m)?,
            Some('U') => self.scan_unicode_escape(8, m)?,
            Some(other) => {
                return Err(ParseError::syntax(
                    format!("invalid escape sequence `\\{other}`"),
                    self.span_from(m),
                ));
            }
            None => {
                return Err(ParseError::syntax(
                    "unterminated string literal",
                    self.span_from(m),
                ));
            }
        };
        Ok(c)
    }

    /// Decode a fixed-width `\uXXXX` or `\UXXXXXXXX` escape.
    fn scan_unicode_escape(&mut self, digits: usize, m: Mark) -> Result<char> {
        let mut code: u32 = 0;
        for _ in 0..digits {
            let d = match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    self.bump();
                    c.to_digit(16).unwrap()
                }
                _ => {
                    return Err(ParseError::syntax(
                        format!("unicode escape requires {digits} hex digits"),
                        self.span_from(m),
                    ));
                }
            };
            code = code * 16 + d;
        }
        char::from_u32(code).ok_or_else(|| {
            ParseError::syntax(
                format!("unicode escape U+{code:04X} is not a valid code point"),
                self.span_from(m),
            )
        })
    }

    /// Decode a backtick-quoted key. `\\` and ``\` `` are the only
    /// recognized escapes; other backslashes are verbatim.
    fn scan_backtick_key(&mut self) -> Result<()> {
        let m = self.mark();
        self.bump();
        let mut out = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::syntax(
                        "unterminated backtick key",
                        self.span_from(m),
                    ));
                }
                Some('`') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    match self.peek() {
                        Some('`') => {
                            self.bump();
                            out.push('`');
                        }
                        Some('\\') => {
                            self.bump();
                            out.push('\\');
                        }
                        _ => out.push('\\'),
                    }
                }
                Some(c) => {
                    self.bump();
                    out.push(c);
                }
            }
        }
        let span = self.span_from(m);
        self.push(TokenKind::Ident(out), span);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Bare words: keywords, numbers, identifiers
    // ------------------------------------------------------------------

    fn scan_word(&mut self) -> Result<()> {
        let m = self.mark();
        let first = match self.peek() {
            Some(c) => c,
            None => return Ok(()),
        };
        if !is_word_char(first, self.config) {
            return Err(ParseError::syntax(
                format!("unexpected character `{first}`"),
                self.span_at(m, 1),
            ));
        }
        while let Some(c) = self.peek() {
            if is_word_char(c, self.config) {
                self.bump();
            } else {
                break;
            }
        }
        let raw = &self.text[m.pos..self.pos];
        let span = self.span_from(m);
        let kind = classify_word(raw, span)?;
        self.push(kind, span);
        Ok(())
    }
}

/// Whether `c` can be part of a bare word. The configured delimiters are
/// consulted so a remapped delimiter is never swallowed into a word.
fn is_word_char(c: char, config: &LexerConfig) -> bool {
    if config.is_delimiter(c) {
        return false;
    }
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-')
}

/// Classify a bare word: keyword, then number, then identifier.
fn classify_word(raw: &str, span: Span) -> Result<TokenKind> {
    match raw {
        "true" => return Ok(TokenKind::Bool(true)),
        "false" => return Ok(TokenKind::Bool(false)),
        "null" => return Ok(TokenKind::Null),
        "nan" => return Ok(TokenKind::Float(f64::NAN)),
        "+inf" => return Ok(TokenKind::Float(f64::INFINITY)),
        "-inf" => return Ok(TokenKind::Float(f64::NEG_INFINITY)),
        _ => {}
    }
    let first = raw.chars().next().unwrap_or('\0');
    if first.is_ascii_digit() || matches!(first, '+' | '-' | '.') {
        return classify_number(raw, span);
    }
    if is_bare_ident(raw) {
        return Ok(TokenKind::Ident(raw.to_string()));
    }
    Err(ParseError::syntax(
        format!("invalid bare identifier `{raw}`"),
        span,
    ))
}

/// Bare keys satisfy `[A-Za-z_][A-Za-z0-9_.-]*`.
fn is_bare_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

// ----------------------------------------------------------------------
// Numeric literals
// ----------------------------------------------------------------------

/// Parse a numeric word into `Int`, `BigInt`, or `Float`.
///
/// Decimal integers out of `i64` range widen to `BigInt`; malformed
/// literals fail with `NumberError`.
fn classify_number(raw: &str, span: Span) -> Result<TokenKind> {
    let malformed = || ParseError::number(format!("malformed numeric literal `{raw}`"), span);

    let (negative, body, signed) = match raw.as_bytes().first() {
        Some(b'+') => (false, &raw[1..], true),
        Some(b'-') => (true, &raw[1..], true),
        _ => (false, raw, false),
    };
    if body.is_empty() {
        return Err(malformed());
    }

    for (prefix_upper, prefix_lower, radix) in [("0X", "0x", 16), ("0O", "0o", 8), ("0B", "0b", 2)]
    {
        if let Some(digits) = body
            .strip_prefix(prefix_lower)
            .or_else(|| body.strip_prefix(prefix_upper))
        {
            if signed {
                return Err(ParseError::number(
                    format!("sign is not allowed on based integer literal `{raw}`"),
                    span,
                ));
            }
            return based_int(digits, radix, &malformed);
        }
    }

    if body.contains('.') || body.contains('e') || body.contains('E') {
        decimal_float(negative, body, &malformed)
    } else {
        decimal_int(negative, body, &malformed)
    }
}

fn based_int(digits: &str, radix: u32, malformed: &dyn Fn() -> ParseError) -> Result<TokenKind> {
    if !valid_digit_run(digits, |c| c.is_digit(radix)) {
        return Err(malformed());
    }
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    match i64::from_str_radix(&cleaned, radix) {
        Ok(n) => Ok(TokenKind::Int(n)),
        Err(_) => BigInt::parse_bytes(cleaned.as_bytes(), radix)
            .map(TokenKind::BigInt)
            .ok_or_else(malformed),
    }
}

fn decimal_int(negative: bool, body: &str, malformed: &dyn Fn() -> ParseError) -> Result<TokenKind> {
    if !valid_digit_run(body, |c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    let cleaned: String = body.chars().filter(|c| *c != '_').collect();
    if cleaned.len() > 1 && cleaned.starts_with('0') {
        return Err(malformed());
    }
    let text = if negative {
        format!("-{cleaned}")
    } else {
        cleaned
    };
    match text.parse::<i64>() {
        Ok(n) => Ok(TokenKind::Int(n)),
        Err(_) => BigInt::parse_bytes(text.as_bytes(), 10)
            .map(TokenKind::BigInt)
            .ok_or_else(malformed),
    }
}

fn decimal_float(
    negative: bool,
    body: &str,
    malformed: &dyn Fn() -> ParseError,
) -> Result<TokenKind> {
    let (mantissa, exponent) = match body.find(|c| c == 'e' || c == 'E') {
        Some(i) => (&body[..i], Some(&body[i + 1..])),
        None => (body, None),
    };
    let (int_part, fraction) = match mantissa.find('.') {
        Some(i) => (&mantissa[..i], Some(&mantissa[i + 1..])),
        None => (mantissa, None),
    };

    if !valid_digit_run(int_part, |c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    let cleaned_int: String = int_part.chars().filter(|c| *c != '_').collect();
    if cleaned_int.len() > 1 && cleaned_int.starts_with('0') {
        return Err(malformed());
    }
    if let Some(fraction) = fraction {
        if !valid_digit_run(fraction, |c| c.is_ascii_digit()) {
            return Err(malformed());
        }
    }
    if let Some(exponent) = exponent {
        let digits = match exponent.as_bytes().first() {
            Some(b'+') | Some(b'-') => &exponent[1..],
            _ => exponent,
        };
        if !valid_digit_run(digits, |c| c.is_ascii_digit()) {
            return Err(malformed());
        }
    }

    let cleaned: String = body.chars().filter(|c| *c != '_').collect();
    let text = if negative {
        format!("-{cleaned}")
    } else {
        cleaned
    };
    text.parse::<f64>()
        .map(TokenKind::Float)
        .map_err(|_| malformed())
}

/// Digits with optional `_` separators: underscores must sit between two
/// digits, never leading, trailing, or doubled.
fn valid_digit_run(s: &str, is_digit: impl Fn(char) -> bool) -> bool {
    if s.is_empty() {
        return false;
    }
    let chars: Vec<char> = s.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' {
            let prev_ok = i > 0 && is_digit(chars[i - 1]);
            let next_ok = i + 1 < chars.len() && is_digit(chars[i + 1]);
            if !prev_ok || !next_ok {
                return false;
            }
        } else if !is_digit(c) {
            return false;
        }
    }
    true
}
