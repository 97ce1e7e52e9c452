//! Code point classes and escape handling shared by the tokenizer and parser.

use std::borrow::Cow;

/// Whether `c` can start a CSS name (an identifier without the leading `-`).
#[inline]
pub fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

/// Whether `c` can continue a CSS name.
#[inline]
pub fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-'
}

/// Whether `c` is CSS whitespace.
#[inline]
pub(crate) fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

/// Whether the two code points form a valid escape.
#[inline]
pub(crate) fn is_valid_escape(first: Option<char>, second: Option<char>) -> bool {
    first == Some('\\') && !matches!(second, Some('\n' | '\r' | '\x0C'))
}

/// Resolve CSS escapes in an identifier or string body.
///
/// `\` followed by up to six hex digits (and one optional whitespace) becomes
/// that code point; zero, surrogates and out-of-range values become U+FFFD.
/// `\` followed by a newline is dropped, which is only legal inside strings.
pub fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('\\') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            None => out.push('\u{FFFD}'),
            Some('\n' | '\x0C') => {
                chars.next();
            }
            Some('\r') => {
                chars.next();
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some(h) if h.is_ascii_hexdigit() => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 6 {
                    match chars.peek().and_then(|c| c.to_digit(16)) {
                        Some(d) => {
                            value = value * 16 + d;
                            digits += 1;
                            chars.next();
                        }
                        None => break,
                    }
                }
                if chars.peek().is_some_and(|&c| is_whitespace(c)) {
                    chars.next();
                }
                let decoded = match value {
                    0 => None,
                    v => char::from_u32(v),
                };
                out.push(decoded.unwrap_or('\u{FFFD}'));
            }
            Some(other) => {
                out.push(other);
                chars.next();
            }
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_passthrough() {
        assert!(matches!(unescape("color"), Cow::Borrowed("color")));
    }

    #[test]
    fn test_unescape_hex() {
        assert_eq!(unescape(r"\31 23"), "123");
        assert_eq!(unescape(r"\000041"), "A");
        assert_eq!(unescape(r"\0"), "\u{FFFD}");
    }

    #[test]
    fn test_unescape_literal() {
        assert_eq!(unescape(r"a\:b"), "a:b");
        assert_eq!(unescape("a\\\nb"), "ab");
    }
}
