//! Lexer configuration and the `#?>` pragma preprocessor.
//!
//! Pragma directives may only appear in the leading run of comment and
//! blank lines; processing stops at the first data line, after which
//! `#?>` lines are ordinary comments. The resulting [`LexerConfig`] is
//! frozen before the first data token is produced and is consulted by
//! the lexer at every character-classification site.

use crate::error::{ParseError, Result};
use crate::source::SourceBuffer;
use crate::span::Span;

/// Prefix marking a pragma directive line.
pub const PRAGMA_PREFIX: &str = "#?>";

/// Characters that can never be assigned as delimiters: the comment
/// leader and the three string-literal delimiters.
const RESERVED: [char; 4] = ['#', '"', '\'', '`'];

/// Delimiter configuration for a single document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerConfig {
    /// Opens a bracket-mode block. Default `{`.
    pub block_open: char,
    /// Closes a bracket-mode block. Default `}`.
    pub block_close: char,
    /// Separates a key from its value. Default `:`.
    pub kv_sep: char,
    /// Separates items in bracket mode. Default `,`. Indentation mode
    /// separates items by newline.
    pub item_sep: char,
    /// Starts a comment running to end of line. Default `#`.
    pub line_comment: char,
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            block_open: '{',
            block_close: '}',
            kv_sep: ':',
            item_sep: ',',
            line_comment: '#',
        }
    }
}

impl LexerConfig {
    /// Whether `c` is one of the configured structural delimiters.
    pub(crate) fn is_delimiter(&self, c: char) -> bool {
        c == self.block_open
            || c == self.block_close
            || c == self.kv_sep
            || c == self.item_sep
            || c == self.line_comment
    }
}

/// Scan the leading comment-and-whitespace lines of `src` for pragma
/// directives and produce the document's lexer configuration.
pub fn scan_pragmas(src: &SourceBuffer) -> Result<LexerConfig> {
    let mut config = LexerConfig::default();
    let mut offset = 0;

    for (idx, raw_line) in src.text().split('\n').enumerate() {
        let line = idx + 1;
        let trimmed = raw_line.trim_start();
        if let Some(rest) = trimmed.strip_prefix(PRAGMA_PREFIX) {
            let indent_cols = raw_line.chars().count() - trimmed.chars().count();
            let prefix_end_col = indent_cols + PRAGMA_PREFIX.len() + 1;
            let prefix_end_offset = offset + (raw_line.len() - trimmed.len()) + PRAGMA_PREFIX.len();
            apply_directive(rest, line, prefix_end_col, prefix_end_offset, &mut config)
                .map_err(|e| e.with_snippet(src))?;
        } else if !trimmed.is_empty() && !trimmed.starts_with(config.line_comment) {
            break;
        }
        offset += raw_line.len() + 1;
    }

    Ok(config)
}

/// A whitespace-delimited word of a directive line, with its position
/// relative to the end of the pragma prefix.
struct Word<'a> {
    text: &'a str,
    col: usize,
    offset: usize,
}

fn split_words(s: &str) -> Vec<Word<'_>> {
    let mut words = Vec::new();
    let mut start: Option<(usize, usize)> = None;
    let mut col = 0;
    for (byte, c) in s.char_indices() {
        if c.is_whitespace() {
            if let Some((word_col, word_byte)) = start.take() {
                words.push(Word {
                    text: &s[word_byte..byte],
                    col: word_col,
                    offset: word_byte,
                });
            }
        } else if start.is_none() {
            start = Some((col, byte));
        }
        col += 1;
    }
    if let Some((word_col, word_byte)) = start {
        words.push(Word {
            text: &s[word_byte..],
            col: word_col,
            offset: word_byte,
        });
    }
    words
}

/// Apply one directive (the text after `#?>`) to the configuration.
fn apply_directive(
    rest: &str,
    line: usize,
    base_col: usize,
    base_offset: usize,
    config: &mut LexerConfig,
) -> Result<()> {
    let span_of = |w: &Word<'_>| {
        Span::new(
            line,
            base_col + w.col,
            base_offset + w.offset,
            w.text.chars().count(),
        )
    };
    let line_span = Span::new(line, base_col, base_offset, rest.chars().count().max(1));

    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return Err(ParseError::pragma(
            "malformed pragma: expected whitespace after `#?>`",
            line_span,
        ));
    }

    let words = split_words(rest);
    let verb = words
        .first()
        .ok_or_else(|| ParseError::pragma("malformed pragma: missing verb", line_span))?;
    if verb.text != "SET" {
        return Err(ParseError::pragma(
            format!("unknown pragma verb `{}`", verb.text),
            span_of(verb),
        ));
    }
    let name = words.get(1).ok_or_else(|| {
        ParseError::pragma("malformed pragma: missing directive name", line_span)
    })?;
    let args = &words[2..];

    match name.text {
        // Both spellings of this directive are in the wild.
        "BLOCKIDENTIFIER" | "BLOCKIDENTIFER" => {
            check_arity(args, 2, name, line_span)?;
            let (open, close) = (&args[0], &args[1]);
            let open_char = quoted_char(open, span_of(open))?;
            let close_char = quoted_char(close, span_of(close))?;
            check_collision(open_char, &[config.kv_sep, config.item_sep], span_of(open))?;
            check_collision(
                close_char,
                &[config.kv_sep, config.item_sep, open_char],
                span_of(close),
            )?;
            config.block_open = open_char;
            config.block_close = close_char;
        }
        "KVSEP" => {
            check_arity(args, 1, name, line_span)?;
            let arg = &args[0];
            let c = quoted_char(arg, span_of(arg))?;
            check_collision(
                c,
                &[config.block_open, config.block_close, config.item_sep],
                span_of(arg),
            )?;
            config.kv_sep = c;
        }
        "SPLITER" => {
            check_arity(args, 1, name, line_span)?;
            let arg = &args[0];
            let c = quoted_char(arg, span_of(arg))?;
            check_collision(
                c,
                &[config.block_open, config.block_close, config.kv_sep],
                span_of(arg),
            )?;
            config.item_sep = c;
        }
        other => {
            return Err(ParseError::pragma(
                format!("unknown pragma directive `{other}`"),
                span_of(name),
            ));
        }
    }

    Ok(())
}

fn check_arity(args: &[Word<'_>], expected: usize, name: &Word<'_>, line_span: Span) -> Result<()> {
    if args.len() != expected {
        return Err(ParseError::pragma(
            format!(
                "`{}` expects {} argument{}, found {}",
                name.text,
                expected,
                if expected == 1 { "" } else { "s" },
                args.len()
            ),
            line_span,
        ));
    }
    Ok(())
}

/// Decode a single-quoted single-code-point argument like `'{'`.
fn quoted_char(word: &Word<'_>, span: Span) -> Result<char> {
    let chars: Vec<char> = word.text.chars().collect();
    match chars.as_slice() {
        ['\'', c, '\''] => Ok(*c),
        _ => Err(ParseError::pragma(
            format!(
                "malformed pragma argument `{}`: expected a single-quoted single character",
                word.text
            ),
            span,
        )),
    }
}

/// Reject a candidate delimiter that collides with a reserved character
/// or with another currently configured delimiter.
fn check_collision(c: char, configured: &[char], span: Span) -> Result<()> {
    if RESERVED.contains(&c) {
        return Err(ParseError::pragma(
            format!("delimiter `{c}` collides with a reserved character"),
            span,
        ));
    }
    if configured.contains(&c) {
        return Err(ParseError::pragma(
            format!("delimiter `{c}` collides with another configured delimiter"),
            span,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn scan(input: &str) -> Result<LexerConfig> {
        scan_pragmas(&SourceBuffer::from_text(input))
    }

    #[test]
    fn test_defaults_without_pragmas() {
        let config = scan("a: 1").unwrap();
        assert_eq!(config, LexerConfig::default());
    }

    #[test]
    fn test_set_block_identifier() {
        let config = scan("#?> SET BLOCKIDENTIFIER '[' ']'\n[ a: 1 ]").unwrap();
        assert_eq!(config.block_open, '[');
        assert_eq!(config.block_close, ']');
    }

    #[test]
    fn test_misspelled_alias_accepted() {
        let config = scan("#?> SET BLOCKIDENTIFER '[' ']'\n[ a: 1 ]").unwrap();
        assert_eq!(config.block_open, '[');
    }

    #[test]
    fn test_set_kv_sep_and_spliter() {
        let config = scan("#?> SET KVSEP '='\n#?> SET SPLITER ';'\na = 1").unwrap();
        assert_eq!(config.kv_sep, '=');
        assert_eq!(config.item_sep, ';');
    }

    #[test]
    fn test_unknown_directive() {
        let err = scan("#?> SET COLOR 'x'").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Pragma);
    }

    #[test]
    fn test_unknown_verb() {
        let err = scan("#?> UNSET KVSEP ':'").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Pragma);
    }

    #[test]
    fn test_collision_with_reserved() {
        let err = scan("#?> SET KVSEP '#'").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Pragma);
        assert!(err.message.contains("reserved"));
    }

    #[test]
    fn test_collision_with_configured() {
        let err = scan("#?> SET KVSEP ','").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Pragma);
        assert!(err.message.contains("configured"));
    }

    #[test]
    fn test_block_open_close_must_differ() {
        let err = scan("#?> SET BLOCKIDENTIFIER '[' '['").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Pragma);
    }

    #[test]
    fn test_malformed_argument() {
        let err = scan("#?> SET KVSEP =").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Pragma);
        let err = scan("#?> SET KVSEP '=='").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Pragma);
    }

    #[test]
    fn test_wrong_arity() {
        let err = scan("#?> SET BLOCKIDENTIFIER '['").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Pragma);
        assert!(err.message.contains("2 arguments"));
    }

    #[test]
    fn test_stops_at_first_data_line() {
        // A pragma after data is an ordinary comment.
        let config = scan("a: 1\n#?> SET KVSEP '='").unwrap();
        assert_eq!(config.kv_sep, ':');
    }

    #[test]
    fn test_comments_and_blanks_before_pragma() {
        let config = scan("# header\n\n#?> SET KVSEP '='\na = 1").unwrap();
        assert_eq!(config.kv_sep, '=');
    }

    #[test]
    fn test_pragma_error_span() {
        let err = scan("#?> SET KVSEP ','").unwrap_err();
        assert_eq!(err.span.line, 1);
        assert_eq!(err.span.col, 15);
    }
}
