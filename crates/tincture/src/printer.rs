//! Low-level CSS output writer.
//!
//! Tracks the generated line and column so source map mappings can be recorded
//! as rules and declarations are written.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use tincture_sourcemap::{OriginalLocation, SourceMap};
use tincture_tokenizer::{Location, is_name_char, is_name_start};

use crate::values::number::format_number;

/// Something that can serialize itself as CSS.
pub trait ToCss {
    /// Write `self` to `dest`.
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result;

    /// Serialize `self` with default pretty options.
    fn to_css_string(&self) -> String {
        let pseudo_classes = BTreeMap::new();
        let mut printer = Printer::new(false, None, &pseudo_classes);
        // Writing into a String cannot fail.
        let _ = self.to_css(&mut printer);
        printer.finish()
    }
}

impl<T: ToCss + ?Sized> ToCss for &T {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        (**self).to_css(dest)
    }
}

/// The output buffer plus formatting state.
pub struct Printer<'a> {
    dest: String,
    source_map: Option<&'a mut SourceMap>,
    source_index: u32,
    indent: usize,
    line: u32,
    col: u32,
    /// Whether optional whitespace is omitted.
    pub minify: bool,
    /// Pseudo-class name to class name replacements.
    pub pseudo_classes: &'a BTreeMap<String, String>,
}

impl<'a> Printer<'a> {
    /// Create a printer. Mappings go to `source_map` when one is given.
    pub fn new(
        minify: bool,
        source_map: Option<&'a mut SourceMap>,
        pseudo_classes: &'a BTreeMap<String, String>,
    ) -> Self {
        Self {
            dest: String::new(),
            source_map,
            source_index: 0,
            indent: 0,
            line: 0,
            col: 0,
            minify,
            pseudo_classes,
        }
    }

    /// Set the source index mappings refer to.
    pub fn set_source_index(&mut self, index: u32) {
        self.source_index = index;
    }

    /// Consume the printer and return the output.
    pub fn finish(self) -> String {
        self.dest
    }

    /// Current generated line, zero-based.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Write raw text.
    pub fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            self.advance(c);
        }
        self.dest.write_str(s)
    }

    /// Write a single character.
    pub fn write_char(&mut self, c: char) -> fmt::Result {
        self.advance(c);
        self.dest.write_char(c)
    }

    fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += c.len_utf16() as u32;
        }
    }

    /// A space, except when minifying.
    pub fn whitespace(&mut self) -> fmt::Result {
        if self.minify {
            return Ok(());
        }
        self.write_char(' ')
    }

    /// A delimiter followed by optional whitespace, optionally preceded by it too.
    pub fn delim(&mut self, delim: char, ws_before: bool) -> fmt::Result {
        if ws_before {
            self.whitespace()?;
        }
        self.write_char(delim)?;
        self.whitespace()
    }

    /// A newline at the current indentation, except when minifying.
    pub fn newline(&mut self) -> fmt::Result {
        if self.minify {
            return Ok(());
        }
        self.write_char('\n')?;
        for _ in 0..self.indent {
            self.write_char(' ')?;
        }
        Ok(())
    }

    /// An empty line followed by a newline at the current indentation.
    pub fn blank_line(&mut self) -> fmt::Result {
        if self.minify {
            return Ok(());
        }
        self.write_char('\n')?;
        self.newline()
    }

    pub fn indent(&mut self) {
        self.indent += 2;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(2);
    }

    /// Record that the text written next came from `loc`.
    pub fn add_mapping(&mut self, loc: Location) {
        if let Some(map) = &mut self.source_map {
            map.add_mapping(
                self.line,
                self.col,
                Some(OriginalLocation::new(self.source_index, loc.line, loc.column)),
            );
        }
    }

    /// Write a number in its shortest form for the current mode.
    pub fn write_number(&mut self, value: f32) -> fmt::Result {
        let text = format_number(value, self.minify);
        self.write_str(&text)
    }

    /// Write an identifier, escaping as needed.
    pub fn write_ident(&mut self, ident: &str) -> fmt::Result {
        let text = serialize_identifier(ident);
        self.write_str(&text)
    }

    /// Write the name part of a hash or a dimension unit.
    pub fn write_name(&mut self, name: &str) -> fmt::Result {
        let text = serialize_name(name);
        self.write_str(&text)
    }

    /// Write a double-quoted string.
    pub fn write_string(&mut self, value: &str) -> fmt::Result {
        let text = serialize_string(value);
        self.write_str(&text)
    }
}

fn push_hex_escape(out: &mut String, c: char) {
    let _ = write!(out, "\\{:x} ", c as u32);
}

/// Serialize an identifier so it tokenizes back to the same ident.
pub fn serialize_identifier(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    if ident == "-" {
        return "\\-".to_string();
    }
    let mut chars = ident.chars().peekable();
    if ident.starts_with("--") {
        out.push_str("--");
        chars.next();
        chars.next();
    } else if let Some(&'-') = chars.peek() {
        out.push('-');
        chars.next();
        if let Some(&c) = chars.peek()
            && c.is_ascii_digit()
        {
            push_hex_escape(&mut out, c);
            chars.next();
        }
    } else if let Some(&c) = chars.peek()
        && c.is_ascii_digit()
    {
        push_hex_escape(&mut out, c);
        chars.next();
    }
    for c in chars {
        push_name_char(&mut out, c);
    }
    out
}

/// Serialize a name (hash or unit) where any name character may lead.
pub fn serialize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        push_name_char(&mut out, c);
    }
    out
}

fn push_name_char(out: &mut String, c: char) {
    match c {
        '\0' => out.push('\u{FFFD}'),
        '\u{1}'..='\u{1F}' | '\u{7F}' => push_hex_escape(out, c),
        c if is_name_char(c) || is_name_start(c) => out.push(c),
        c => {
            out.push('\\');
            out.push(c);
        }
    }
}

/// Serialize a string as a double-quoted CSS string.
pub fn serialize_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\0' => out.push('\u{FFFD}'),
            '\u{1}'..='\u{1F}' | '\u{7F}' => push_hex_escape(&mut out, c),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Whether `value` tokenizes as a single identifier without escapes.
pub fn is_plain_identifier(value: &str) -> bool {
    !value.is_empty() && serialize_identifier(value) == value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_identifier() {
        assert_eq!(serialize_identifier("foo"), "foo");
        assert_eq!(serialize_identifier("--main-color"), "--main-color");
        assert_eq!(serialize_identifier("1a"), "\\31 a");
        assert_eq!(serialize_identifier("-1a"), "-\\31 a");
        assert_eq!(serialize_identifier("a.b"), "a\\.b");
        assert_eq!(serialize_identifier("-"), "\\-");
        assert_eq!(serialize_identifier("café"), "café");
    }

    #[test]
    fn test_serialize_string() {
        assert_eq!(serialize_string("a\"b"), "\"a\\\"b\"");
        assert_eq!(serialize_string("a\nb"), "\"a\\a b\"");
        assert_eq!(serialize_string("back\\slash"), "\"back\\\\slash\"");
    }

    #[test]
    fn test_is_plain_identifier() {
        assert!(is_plain_identifier("text"));
        assert!(!is_plain_identifier("two words"));
        assert!(!is_plain_identifier("9lives"));
        assert!(!is_plain_identifier(""));
    }

    #[test]
    fn test_line_and_column_tracking() {
        let pseudo_classes = BTreeMap::new();
        let mut map = SourceMap::new();
        map.add_source("a.css");
        let mut printer = Printer::new(false, Some(&mut map), &pseudo_classes);
        printer.write_str(".a {").unwrap();
        printer.indent();
        printer.newline().unwrap();
        printer.add_mapping(Location::new(0, 3));
        printer.write_str("color: red;").unwrap();
        printer.dedent();
        printer.newline().unwrap();
        printer.write_char('}').unwrap();
        assert_eq!(printer.line(), 2);
        assert_eq!(printer.finish(), ".a {\n  color: red;\n}");
        assert_eq!(map.mappings()[0].generated_line, 1);
        assert_eq!(map.mappings()[0].generated_column, 2);
    }

    #[test]
    fn test_minify_skips_optional_whitespace() {
        let pseudo_classes = BTreeMap::new();
        let mut printer = Printer::new(true, None, &pseudo_classes);
        printer.write_str("a").unwrap();
        printer.delim(',', false).unwrap();
        printer.newline().unwrap();
        printer.write_str("b").unwrap();
        assert_eq!(printer.finish(), "a,b");
    }
}
