//! Token types for the CSS tokenizer.

use std::borrow::Cow;

use crate::{Span, unescape};

/// The kind of a token.
///
/// Kinds carry no payload; the value of a token is recovered from its text
/// through the accessors on [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Names
    /// `color`, `-webkit-box`, `--custom`
    Ident,
    /// `rgb(` (the name and the opening paren)
    Function,
    /// `@media`
    AtKeyword,
    /// `#fff` where the name does not form an identifier
    Hash,
    /// `#main` where the name forms a valid identifier
    IdHash,

    // Literals
    /// `"text"` or `'text'`
    String,
    /// A string interrupted by an unescaped newline
    BadString,
    /// Unquoted `url(foo.png)`
    Url,
    /// A malformed unquoted url
    BadUrl,
    /// `12`, `-0.5`, `1e3`
    Number,
    /// `50%`
    Percentage,
    /// `10px`, `2.5em`
    Dimension,

    // Punctuation
    /// Any other single code point
    Delim,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `<!--`
    Cdo,
    /// `-->`
    Cdc,

    // Trivia
    /// Runs of spaces, tabs and newlines
    Whitespace,
    /// `/* ... */`
    Comment,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Whether this token is trivia (whitespace or comments).
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }

    /// Whether this token is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TokenKind::Number | TokenKind::Percentage | TokenKind::Dimension
        )
    }

    /// The closing token that matches an opening block token.
    pub fn closing(&self) -> Option<TokenKind> {
        match self {
            TokenKind::LParen | TokenKind::Function => Some(TokenKind::RParen),
            TokenKind::LBracket => Some(TokenKind::RBracket),
            TokenKind::LBrace => Some(TokenKind::RBrace),
            _ => None,
        }
    }
}

/// A token with its kind, span, and source text slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    /// The kind of token.
    pub kind: TokenKind,
    /// The span in the source text.
    pub span: Span,
    /// The source text of this token.
    pub text: &'src str,
}

impl<'src> Token<'src> {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span, text: &'src str) -> Self {
        Self { kind, span, text }
    }

    /// The unescaped name of an ident, function, at-keyword or hash token.
    ///
    /// Returns the raw text for any other kind.
    pub fn name(&self) -> Cow<'src, str> {
        let raw = match self.kind {
            TokenKind::Ident => self.text,
            TokenKind::Function => self.text.strip_suffix('(').unwrap_or(self.text),
            TokenKind::AtKeyword | TokenKind::Hash | TokenKind::IdHash => &self.text[1..],
            _ => self.text,
        };
        unescape(raw)
    }

    /// The delimiter character of a `Delim` token.
    pub fn delim(&self) -> Option<char> {
        match self.kind {
            TokenKind::Delim => self.text.chars().next(),
            _ => None,
        }
    }

    /// Whether this is the `Delim` token for `c`.
    pub fn is_delim(&self, c: char) -> bool {
        self.delim() == Some(c)
    }

    /// Whether this is an ident matching `name`, ASCII case-insensitively.
    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.name().eq_ignore_ascii_case(name)
    }

    /// The unescaped contents of a string token, without quotes.
    pub fn string_value(&self) -> Cow<'src, str> {
        let Some(quote) = self.text.chars().next() else {
            return Cow::Borrowed("");
        };
        let body = &self.text[quote.len_utf8()..];
        let mut end = body.len();
        let mut chars = body.char_indices();
        while let Some((i, c)) = chars.next() {
            if c == '\\' {
                chars.next();
            } else if c == quote {
                end = i;
                break;
            }
        }
        unescape(&body[..end])
    }

    /// The unescaped target of an unquoted `url(...)` token.
    pub fn url_value(&self) -> Cow<'src, str> {
        let open = self.text.find('(').map(|i| i + 1).unwrap_or(0);
        let body = self.text[open..].strip_suffix(')').unwrap_or(&self.text[open..]);
        unescape(body.trim_matches(|c: char| c.is_ascii_whitespace()))
    }

    /// The numeric value of a number, percentage or dimension token.
    pub fn numeric_value(&self) -> f32 {
        let len = numeric_prefix_len(self.text);
        self.text[..len].parse::<f32>().unwrap_or(0.0)
    }

    /// Whether the numeric part was written without a fraction or exponent.
    pub fn is_integer(&self) -> bool {
        let len = numeric_prefix_len(self.text);
        !self.text[..len].contains(['.', 'e', 'E'])
    }

    /// The unescaped unit of a dimension token (`px`, `em`, ...).
    pub fn unit(&self) -> Cow<'src, str> {
        match self.kind {
            TokenKind::Dimension => unescape(&self.text[numeric_prefix_len(self.text)..]),
            TokenKind::Percentage => Cow::Borrowed("%"),
            _ => Cow::Borrowed(""),
        }
    }
}

/// Length in bytes of the leading `<number>` in `text`.
pub(crate) fn numeric_prefix_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    if bytes.get(i) == Some(&b'.') && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
        i += 1;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        if bytes.get(j).is_some_and(u8::is_ascii_digit) {
            while bytes.get(j).is_some_and(u8::is_ascii_digit) {
                j += 1;
            }
            i = j;
        }
    }
    i
}
