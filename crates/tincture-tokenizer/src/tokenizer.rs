//! Tokenizer for CSS source text.

use crate::escape::{is_name_char, is_name_start, is_valid_escape, is_whitespace};
use crate::{Span, Token, TokenKind};
use tracing::trace;

/// A tokenizer that produces tokens from CSS source text.
///
/// Tokenization never fails: malformed input becomes `BadString`, `BadUrl`
/// or `Delim` tokens and the parser decides what to do with them.
#[derive(Clone)]
pub struct Tokenizer<'src> {
    /// The source text being tokenized.
    source: &'src str,
    /// The remaining source text (suffix of `source`).
    remaining: &'src str,
    /// Current byte position in `source`.
    pos: u32,
}

impl<'src> Tokenizer<'src> {
    /// Create a new tokenizer for the given source text.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            remaining: source,
            pos: 0,
        }
    }

    /// Get the current byte position.
    #[inline]
    pub fn position(&self) -> u32 {
        self.pos
    }

    /// Check if we're at the end of input.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Peek at the next character without consuming it.
    #[inline]
    fn peek(&self) -> Option<char> {
        self.remaining.chars().next()
    }

    /// Peek at the nth character (0-indexed) without consuming.
    #[inline]
    fn peek_nth(&self, n: usize) -> Option<char> {
        self.remaining.chars().nth(n)
    }

    /// Advance by one character and return it.
    #[inline]
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8() as u32;
        self.remaining = &self.remaining[c.len_utf8()..];
        Some(c)
    }

    /// Check if the remaining text starts with the given prefix.
    #[inline]
    fn starts_with(&self, prefix: &str) -> bool {
        self.remaining.starts_with(prefix)
    }

    /// Create a token from the given start position to current position.
    fn token(&self, kind: TokenKind, start: u32) -> Token<'src> {
        let span = Span::new(start, self.pos);
        let text = &self.source[start as usize..self.pos as usize];
        trace!("Token {:?} at {:?}: {:?}", kind, span, text);
        Token::new(kind, span, text)
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Token<'src> {
        let start = self.pos;
        let Some(c) = self.peek() else {
            return self.token(TokenKind::Eof, start);
        };

        match c {
            c if is_whitespace(c) => {
                while self.peek().is_some_and(is_whitespace) {
                    self.advance();
                }
                self.token(TokenKind::Whitespace, start)
            }
            '"' | '\'' => self.tokenize_string(c),
            '#' => {
                self.advance();
                if self.peek().is_some_and(is_name_char)
                    || is_valid_escape(self.peek(), self.peek_nth(1))
                {
                    let kind = if self.would_start_ident(0) {
                        TokenKind::IdHash
                    } else {
                        TokenKind::Hash
                    };
                    self.consume_name();
                    self.token(kind, start)
                } else {
                    self.token(TokenKind::Delim, start)
                }
            }
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            ',' => self.single(TokenKind::Comma),
            ':' => self.single(TokenKind::Colon),
            ';' => self.single(TokenKind::Semicolon),
            '+' | '.' if self.would_start_number() => self.tokenize_numeric(),
            '-' if self.would_start_number() => self.tokenize_numeric(),
            '-' if self.starts_with("-->") => {
                for _ in 0..3 {
                    self.advance();
                }
                self.token(TokenKind::Cdc, start)
            }
            '-' if self.would_start_ident(0) => self.tokenize_ident_like(),
            '<' if self.starts_with("<!--") => {
                for _ in 0..4 {
                    self.advance();
                }
                self.token(TokenKind::Cdo, start)
            }
            '@' => {
                self.advance();
                if self.would_start_ident(0) {
                    self.consume_name();
                    self.token(TokenKind::AtKeyword, start)
                } else {
                    self.token(TokenKind::Delim, start)
                }
            }
            '\\' if is_valid_escape(Some(c), self.peek_nth(1)) => self.tokenize_ident_like(),
            '/' if self.starts_with("/*") => self.tokenize_comment(),
            c if c.is_ascii_digit() => self.tokenize_numeric(),
            c if is_name_start(c) => self.tokenize_ident_like(),
            _ => self.single(TokenKind::Delim),
        }
    }

    /// Consume a single code point as a token of `kind`.
    fn single(&mut self, kind: TokenKind) -> Token<'src> {
        let start = self.pos;
        self.advance();
        self.token(kind, start)
    }

    /// Whether the input at `offset` would start an identifier.
    fn would_start_ident(&self, offset: usize) -> bool {
        let first = self.peek_nth(offset);
        let second = self.peek_nth(offset + 1);
        match first {
            Some('-') => {
                second.is_some_and(|c| is_name_start(c) || c == '-')
                    || is_valid_escape(second, self.peek_nth(offset + 2))
            }
            Some('\\') => is_valid_escape(first, second),
            Some(c) => is_name_start(c),
            None => false,
        }
    }

    /// Whether the input would start a number.
    fn would_start_number(&self) -> bool {
        let digit = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());
        match self.peek() {
            Some('+' | '-') => {
                digit(self.peek_nth(1)) || (self.peek_nth(1) == Some('.') && digit(self.peek_nth(2)))
            }
            Some('.') => digit(self.peek_nth(1)),
            c => digit(c),
        }
    }

    /// Consume a name, including escapes.
    fn consume_name(&mut self) {
        loop {
            match self.peek() {
                Some(c) if is_name_char(c) => {
                    self.advance();
                }
                Some('\\') if is_valid_escape(Some('\\'), self.peek_nth(1)) => {
                    self.consume_escape();
                }
                _ => break,
            }
        }
    }

    /// Consume a `\` escape sequence.
    fn consume_escape(&mut self) {
        self.advance(); // `\`
        match self.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                let mut digits = 0;
                while digits < 6 && self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                    self.advance();
                    digits += 1;
                }
                if self.starts_with("\r\n") {
                    self.advance();
                    self.advance();
                } else if self.peek().is_some_and(is_whitespace) {
                    self.advance();
                }
            }
            Some(_) => {
                self.advance();
            }
            None => {}
        }
    }

    /// Tokenize an ident, function or url token.
    fn tokenize_ident_like(&mut self) -> Token<'src> {
        let start = self.pos;
        self.consume_name();
        let name = &self.source[start as usize..self.pos as usize];

        if self.peek() != Some('(') {
            return self.token(TokenKind::Ident, start);
        }

        if name.eq_ignore_ascii_case("url") {
            // `url(` followed by a quote stays a function with a string argument.
            let quoted = self.remaining[1..]
                .chars()
                .find(|c| !is_whitespace(*c))
                .is_some_and(|c| c == '"' || c == '\'');
            if !quoted {
                self.advance(); // `(`
                return self.tokenize_url(start);
            }
        }

        self.advance(); // `(`
        self.token(TokenKind::Function, start)
    }

    /// Tokenize the remainder of an unquoted url after `url(`.
    fn tokenize_url(&mut self, start: u32) -> Token<'src> {
        while self.peek().is_some_and(is_whitespace) {
            self.advance();
        }
        loop {
            match self.peek() {
                None => return self.token(TokenKind::Url, start),
                Some(')') => {
                    self.advance();
                    return self.token(TokenKind::Url, start);
                }
                Some(c) if is_whitespace(c) => {
                    while self.peek().is_some_and(is_whitespace) {
                        self.advance();
                    }
                    match self.peek() {
                        None => return self.token(TokenKind::Url, start),
                        Some(')') => {
                            self.advance();
                            return self.token(TokenKind::Url, start);
                        }
                        Some(_) => return self.consume_bad_url(start),
                    }
                }
                Some('"' | '\'' | '(') => return self.consume_bad_url(start),
                Some(c) if is_non_printable(c) => return self.consume_bad_url(start),
                Some('\\') => {
                    if is_valid_escape(Some('\\'), self.peek_nth(1)) {
                        self.consume_escape();
                    } else {
                        return self.consume_bad_url(start);
                    }
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    /// Consume the remnants of a bad url up to and including `)`.
    fn consume_bad_url(&mut self, start: u32) -> Token<'src> {
        loop {
            match self.peek() {
                None => break,
                Some(')') => {
                    self.advance();
                    break;
                }
                Some('\\') if is_valid_escape(Some('\\'), self.peek_nth(1)) => {
                    self.consume_escape();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        self.token(TokenKind::BadUrl, start)
    }

    /// Tokenize a number, percentage or dimension.
    fn tokenize_numeric(&mut self) -> Token<'src> {
        let start = self.pos;
        if matches!(self.peek(), Some('+' | '-')) {
            self.advance();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let digit_at = match self.peek_nth(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    self.advance();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        if self.would_start_ident(0) {
            self.consume_name();
            self.token(TokenKind::Dimension, start)
        } else if self.peek() == Some('%') {
            self.advance();
            self.token(TokenKind::Percentage, start)
        } else {
            self.token(TokenKind::Number, start)
        }
    }

    /// Tokenize a quoted string.
    fn tokenize_string(&mut self, quote: char) -> Token<'src> {
        let start = self.pos;
        self.advance(); // opening quote
        loop {
            match self.peek() {
                None => return self.token(TokenKind::String, start),
                Some(c) if c == quote => {
                    self.advance();
                    return self.token(TokenKind::String, start);
                }
                Some('\n' | '\r' | '\x0C') => return self.token(TokenKind::BadString, start),
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        None => {}
                        Some('\r') if self.peek_nth(1) == Some('\n') => {
                            self.advance();
                            self.advance();
                        }
                        Some(_) => {
                            self.advance();
                        }
                    }
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    /// Tokenize a `/* ... */` comment. An unterminated comment runs to EOF.
    fn tokenize_comment(&mut self) -> Token<'src> {
        let start = self.pos;
        self.advance();
        self.advance();
        while !self.is_eof() && !self.starts_with("*/") {
            self.advance();
        }
        if self.starts_with("*/") {
            self.advance();
            self.advance();
        }
        self.token(TokenKind::Comment, start)
    }
}

impl<'src> Iterator for Tokenizer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

fn is_non_printable(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{E}'..='\u{1F}' | '\u{7F}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tokenize(source: &str) -> Vec<(TokenKind, &str)> {
        Tokenizer::new(source).map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn test_structural_tokens() {
        assert_eq!(tokenize("{"), vec![(TokenKind::LBrace, "{")]);
        assert_eq!(tokenize("}"), vec![(TokenKind::RBrace, "}")]);
        assert_eq!(tokenize("("), vec![(TokenKind::LParen, "(")]);
        assert_eq!(tokenize("]"), vec![(TokenKind::RBracket, "]")]);
        assert_eq!(tokenize(";"), vec![(TokenKind::Semicolon, ";")]);
        assert_eq!(tokenize(":"), vec![(TokenKind::Colon, ":")]);
        assert_eq!(tokenize(","), vec![(TokenKind::Comma, ",")]);
    }

    #[test]
    fn test_simple_rule() {
        let tokens = tokenize(".foo { color: red }");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Delim, "."),
                (TokenKind::Ident, "foo"),
                (TokenKind::Whitespace, " "),
                (TokenKind::LBrace, "{"),
                (TokenKind::Whitespace, " "),
                (TokenKind::Ident, "color"),
                (TokenKind::Colon, ":"),
                (TokenKind::Whitespace, " "),
                (TokenKind::Ident, "red"),
                (TokenKind::Whitespace, " "),
                (TokenKind::RBrace, "}"),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokenize("12"), vec![(TokenKind::Number, "12")]);
        assert_eq!(tokenize("-.5"), vec![(TokenKind::Number, "-.5")]);
        assert_eq!(tokenize("50%"), vec![(TokenKind::Percentage, "50%")]);
        assert_eq!(tokenize("1.5em"), vec![(TokenKind::Dimension, "1.5em")]);
        assert_eq!(tokenize("1e3"), vec![(TokenKind::Number, "1e3")]);
        assert_eq!(tokenize("2em"), vec![(TokenKind::Dimension, "2em")]);
    }

    #[test]
    fn test_numeric_accessors() {
        let token = Tokenizer::new("-2.5rem").next_token();
        assert_eq!(token.numeric_value(), -2.5);
        assert_eq!(token.unit(), "rem");
        assert!(!token.is_integer());
    }

    #[test]
    fn test_hash_kinds() {
        assert_eq!(tokenize("#main"), vec![(TokenKind::IdHash, "#main")]);
        assert_eq!(tokenize("#123"), vec![(TokenKind::Hash, "#123")]);
        assert_eq!(tokenize("#"), vec![(TokenKind::Delim, "#")]);
    }

    #[test]
    fn test_custom_property_ident() {
        assert_eq!(tokenize("--main-color"), vec![(TokenKind::Ident, "--main-color")]);
    }

    #[test]
    fn test_at_keyword() {
        assert_eq!(tokenize("@media"), vec![(TokenKind::AtKeyword, "@media")]);
        assert_eq!(tokenize("@-webkit-keyframes")[0].0, TokenKind::AtKeyword);
    }

    #[test]
    fn test_functions_and_urls() {
        assert_eq!(tokenize("rgb(")[0], (TokenKind::Function, "rgb("));
        assert_eq!(tokenize("url(a.png)"), vec![(TokenKind::Url, "url(a.png)")]);
        assert_eq!(tokenize("url( a.png )"), vec![(TokenKind::Url, "url( a.png )")]);
        assert_eq!(tokenize("url(\"a.png\")")[0], (TokenKind::Function, "url("));
        assert_eq!(tokenize("url(a b)"), vec![(TokenKind::BadUrl, "url(a b)")]);
    }

    #[test]
    fn test_url_value() {
        let token = Tokenizer::new("url( img/a.png )").next_token();
        assert_eq!(token.url_value(), "img/a.png");
    }

    #[test]
    fn test_strings() {
        assert_eq!(tokenize("'a'"), vec![(TokenKind::String, "'a'")]);
        let token = Tokenizer::new(r#""say \"hi\"""#).next_token();
        assert_eq!(token.string_value(), "say \"hi\"");
        assert_eq!(tokenize("\"a\nb\"")[0].0, TokenKind::BadString);
    }

    #[test]
    fn test_comments() {
        assert_eq!(tokenize("/* x */"), vec![(TokenKind::Comment, "/* x */")]);
        assert_eq!(tokenize("/* open"), vec![(TokenKind::Comment, "/* open")]);
    }

    #[test]
    fn test_cdo_cdc() {
        assert_eq!(
            tokenize("<!---->"),
            vec![(TokenKind::Cdo, "<!--"), (TokenKind::Cdc, "-->")]
        );
    }

    #[test]
    fn test_escaped_ident() {
        let token = Tokenizer::new(r"\31 0px").next_token();
        assert_eq!(token.kind, TokenKind::Ident);
        assert_eq!(token.name(), "10px");
    }

    #[test]
    fn test_nesting_selector_is_delim() {
        assert_eq!(tokenize("&")[0], (TokenKind::Delim, "&"));
    }

    proptest! {
        #[test]
        fn tokens_cover_source_exactly(source in "[ -~\n]{0,64}") {
            let mut end = 0;
            for token in Tokenizer::new(&source) {
                prop_assert_eq!(token.span.start, end);
                prop_assert!(token.span.end > token.span.start);
                end = token.span.end;
            }
            prop_assert_eq!(end as usize, source.len());
        }
    }
}
