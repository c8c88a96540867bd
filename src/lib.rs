//! FlexConf parser implementation.
//!
//! FlexConf is a configuration language with two semantically equivalent
//! surface syntaxes: an indentation-sensitive mode (whitespace
//! significant, blank lines separate list elements) and a bracket mode
//! (brace delimited, comma separated). A document commits to one mode
//! and never mixes them.
//!
//! # Parsing Pipeline
//!
//! The parser operates in three phases:
//!
//! 1. **Pragma preprocessor**: Scans the leading comment lines for `#?>`
//!    directives and freezes the delimiter configuration.
//!
//! 2. **Lexer**: Detects the document mode from the first significant
//!    code point, then tokenizes. The indentation tokenizer owns the
//!    indent stack and emits `Indent`/`Dedent`/`Newline` structure; the
//!    bracket tokenizer treats whitespace as insignificant.
//!
//! 3. **Parser**: Recursive descent over the token stream into values,
//!    deciding each block's map/list shape with two tokens of look-ahead.
//!
//! Documents are UTF-8 with an optional BOM. The conventional file
//! extension is `.fc` and the MIME type is `application/flexconf`.
//!
//! Integers that overflow `i64` widen to arbitrary precision rather than
//! failing; see [`Value::BigInt`].

mod builder;
mod config;
mod error;
mod lexer;
mod parser;
mod source;
mod span;
mod token;
mod value;

pub use error::{ErrorKind, ParseError, Result};
pub use lexer::Mode;
pub use source::SourceBuffer;
pub use span::Span;
pub use value::Value;

/// Report which syntax mode a document commits to.
///
/// Pragmas are processed first, so a remapped block opener is honored.
pub fn document_mode(input: &str) -> Result<Mode> {
    let src = SourceBuffer::from_text(input);
    let config = config::scan_pragmas(&src)?;
    Ok(lexer::detect_mode(&src, &config))
}

/// Parse a FlexConf document from a string.
///
/// # Example
///
/// ```
/// use flexconf::parse_str;
///
/// let value = parse_str("port: 8080").unwrap();
/// assert_eq!(value.get("port").and_then(|v| v.as_int()), Some(8080));
/// ```
pub fn parse_str(input: &str) -> Result<Value> {
    let src = SourceBuffer::from_text(input);
    parse_buffer(&src)
}

/// Parse a FlexConf document from bytes, validating UTF-8 first.
pub fn parse_text(bytes: &[u8]) -> Result<Value> {
    let src = SourceBuffer::from_bytes(bytes)?;
    parse_buffer(&src)
}

/// Read `reader` to completion and parse the result. There is no
/// incremental output; reader failures surface as [`ErrorKind::Io`].
pub fn parse_stream<R: std::io::Read>(mut reader: R) -> Result<Value> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| ParseError::io(format!("failed to read input: {e}")))?;
    parse_text(&bytes)
}

fn parse_buffer(src: &SourceBuffer) -> Result<Value> {
    // Phase 1: pragma directives freeze the lexer configuration.
    let config = config::scan_pragmas(src)?;

    // Phase 2: mode detection and tokenization.
    let (mode, tokens) = lexer::tokenize(src, &config)?;

    // Phase 3: recursive descent into values.
    parser::parse_tokens(src, mode, &tokens)
}
