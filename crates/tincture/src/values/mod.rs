//! Declaration values.
//!
//! A value is a list of component values: typed leaves (numbers, colors,
//! urls, `var()` references) plus functions and blocks that nest further
//! lists. Anything without a more specific type keeps its token shape.

use std::fmt;

use serde::Serialize;
use tincture_tokenizer::Location;

use crate::printer::{Printer, ToCss};

pub mod color;
pub mod number;

pub use color::{CssColor, Lab, Lch, Rgba};
use number::serialize_unit;

/// A sequence of component values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TokenList(pub Vec<ComponentValue>);

/// One component of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentValue {
    /// `auto`, `--custom-name`
    Ident(String),
    Number(f32),
    /// `50%` is stored as `50.0`.
    Percentage(f32),
    Dimension {
        value: f32,
        unit: String,
    },
    Color(CssColor),
    String(String),
    Url(Url),
    /// A hash that is not a color.
    Hash(String),
    Var(Variable),
    Function(Function),
    Block(Block),
    Comma,
    Colon,
    Semicolon,
    Delim(char),
    AtKeyword(String),
    /// `U+0025-00FF`, `u+4??`, as written.
    UnicodeRange(String),
    Whitespace,
}

/// A `url()` value.
#[derive(Debug, Clone)]
pub struct Url {
    pub url: String,
    pub loc: Location,
}

impl PartialEq for Url {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

/// A `var()` reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// The dashed ident, including the leading `--`.
    pub name: String,
    /// `from global` or `from "file"`, with CSS Modules dashed idents.
    pub from: Option<Specifier>,
    pub fallback: Option<TokenList>,
}

/// Where a referenced name is defined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Specifier {
    /// Not scoped to any file.
    Global,
    /// Defined in another file.
    File(String),
}

/// A function other than `var()` and the color functions.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Lowercase function name.
    pub name: String,
    pub arguments: TokenList,
}

/// A simple block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub contents: TokenList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paren,
    Bracket,
    Brace,
}

impl BlockKind {
    fn delimiters(self) -> (char, char) {
        match self {
            BlockKind::Paren => ('(', ')'),
            BlockKind::Bracket => ('[', ']'),
            BlockKind::Brace => ('{', '}'),
        }
    }
}

impl TokenList {
    pub fn new(values: Vec<ComponentValue>) -> Self {
        Self(values)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ComponentValue> {
        self.0.iter()
    }

    /// The single identifier this list consists of, if any.
    pub fn as_ident(&self) -> Option<&str> {
        match self.0.as_slice() {
            [ComponentValue::Ident(ident)] => Some(ident),
            _ => None,
        }
    }

    /// Split on top-level whitespace. `None` if the list contains commas.
    pub fn space_separated(&self) -> Option<Vec<TokenList>> {
        let mut parts = Vec::new();
        let mut current = Vec::new();
        for value in &self.0 {
            match value {
                ComponentValue::Comma => return None,
                ComponentValue::Whitespace => {
                    if !current.is_empty() {
                        parts.push(TokenList(std::mem::take(&mut current)));
                    }
                }
                value => current.push(value.clone()),
            }
        }
        if !current.is_empty() {
            parts.push(TokenList(current));
        }
        Some(parts)
    }

    /// Whether any component, at any depth, satisfies `predicate`.
    pub fn any(&self, predicate: &mut impl FnMut(&ComponentValue) -> bool) -> bool {
        self.0.iter().any(|value| {
            if predicate(value) {
                return true;
            }
            match value {
                ComponentValue::Function(f) => f.arguments.any(predicate),
                ComponentValue::Block(b) => b.contents.any(predicate),
                ComponentValue::Var(v) => v.fallback.as_ref().is_some_and(|f| f.any(predicate)),
                _ => false,
            }
        })
    }

    /// Apply `f` to every component, at any depth.
    pub fn for_each_mut(&mut self, f: &mut impl FnMut(&mut ComponentValue)) {
        for value in &mut self.0 {
            f(value);
            match value {
                ComponentValue::Function(func) => func.arguments.for_each_mut(f),
                ComponentValue::Block(block) => block.contents.for_each_mut(f),
                ComponentValue::Var(var) => {
                    if let Some(fallback) = &mut var.fallback {
                        fallback.for_each_mut(f);
                    }
                }
                _ => {}
            }
        }
    }
}

impl ComponentValue {
    fn is_separator(&self, minify: bool) -> bool {
        match self {
            ComponentValue::Comma => true,
            ComponentValue::Colon | ComponentValue::Semicolon | ComponentValue::Delim('/') => {
                minify
            }
            _ => false,
        }
    }
}

impl ToCss for TokenList {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        let items = &self.0;
        for (i, item) in items.iter().enumerate() {
            match item {
                ComponentValue::Whitespace => {
                    let (Some(prev), Some(next)) = (
                        i.checked_sub(1).and_then(|j| items.get(j)),
                        items.get(i + 1),
                    ) else {
                        continue;
                    };
                    if prev.is_separator(dest.minify) || next.is_separator(dest.minify) {
                        continue;
                    }
                    if matches!(prev, ComponentValue::Whitespace) {
                        continue;
                    }
                    dest.write_char(' ')?;
                }
                ComponentValue::Comma => {
                    if i + 1 == items.len() {
                        dest.write_char(',')?;
                    } else {
                        dest.delim(',', false)?;
                    }
                }
                item => item.to_css(dest)?,
            }
        }
        Ok(())
    }
}

impl ToCss for ComponentValue {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        match self {
            ComponentValue::Ident(ident) => dest.write_ident(ident),
            ComponentValue::Number(value) => dest.write_number(*value),
            ComponentValue::Percentage(value) => {
                dest.write_number(*value)?;
                dest.write_char('%')
            }
            ComponentValue::Dimension { value, unit } => {
                dest.write_number(*value)?;
                dest.write_str(&serialize_unit(unit))
            }
            ComponentValue::Color(color) => color.to_css(dest),
            ComponentValue::String(value) => dest.write_string(value),
            ComponentValue::Url(url) => url.to_css(dest),
            ComponentValue::Hash(name) => {
                dest.write_char('#')?;
                dest.write_name(name)
            }
            ComponentValue::Var(var) => var.to_css(dest),
            ComponentValue::Function(function) => {
                dest.write_ident(&function.name)?;
                dest.write_char('(')?;
                function.arguments.to_css(dest)?;
                dest.write_char(')')
            }
            ComponentValue::Block(block) => {
                let (open, close) = block.kind.delimiters();
                dest.write_char(open)?;
                block.contents.to_css(dest)?;
                dest.write_char(close)
            }
            ComponentValue::Comma => dest.write_char(','),
            ComponentValue::Colon => dest.write_char(':'),
            ComponentValue::Semicolon => dest.write_char(';'),
            ComponentValue::Delim(c) => dest.write_char(*c),
            ComponentValue::AtKeyword(name) => {
                dest.write_char('@')?;
                dest.write_ident(name)
            }
            ComponentValue::UnicodeRange(range) => dest.write_str(range),
            ComponentValue::Whitespace => dest.write_char(' '),
        }
    }
}

impl ToCss for Url {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.write_str("url(")?;
        let needs_quotes = self.url.is_empty()
            || self.url.chars().any(|c| {
                c.is_whitespace() || matches!(c, '"' | '\'' | '(' | ')' | '\\') || c.is_control()
            });
        if needs_quotes {
            dest.write_string(&self.url)?;
        } else {
            dest.write_str(&self.url)?;
        }
        dest.write_char(')')
    }
}

impl ToCss for Variable {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.write_str("var(")?;
        dest.write_ident(&self.name)?;
        match &self.from {
            Some(Specifier::Global) => dest.write_str(" from global")?,
            Some(Specifier::File(file)) => {
                dest.write_str(" from ")?;
                dest.write_string(file)?;
            }
            None => {}
        }
        if let Some(fallback) = &self.fallback {
            dest.delim(',', false)?;
            fallback.to_css(dest)?;
        }
        dest.write_char(')')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn minified(list: &TokenList) -> String {
        let pseudo_classes = BTreeMap::new();
        let mut printer = Printer::new(true, None, &pseudo_classes);
        list.to_css(&mut printer).unwrap();
        printer.finish()
    }

    #[test]
    fn test_whitespace_around_separators() {
        use ComponentValue::*;
        let list = TokenList(vec![
            Ident("a".into()),
            Whitespace,
            Comma,
            Whitespace,
            Ident("b".into()),
            Whitespace,
            Delim('/'),
            Whitespace,
            Number(1.5),
        ]);
        assert_eq!(list.to_css_string(), "a, b / 1.5");
        assert_eq!(minified(&list), "a,b/1.5");
    }

    #[test]
    fn test_url_quoting() {
        let plain = Url {
            url: "a.png".into(),
            loc: Location::default(),
        };
        let spaced = Url {
            url: "a b.png".into(),
            loc: Location::default(),
        };
        assert_eq!(plain.to_css_string(), "url(a.png)");
        assert_eq!(spaced.to_css_string(), "url(\"a b.png\")");
    }

    #[test]
    fn test_var_with_fallback() {
        let var = Variable {
            name: "--gap".into(),
            from: None,
            fallback: Some(TokenList(vec![ComponentValue::Dimension {
                value: 4.0,
                unit: "px".into(),
            }])),
        };
        assert_eq!(var.to_css_string(), "var(--gap, 4px)");
    }

    #[test]
    fn test_space_separated() {
        use ComponentValue::*;
        let list = TokenList(vec![
            Number(0.0),
            Whitespace,
            Ident("auto".into()),
        ]);
        let parts = list.space_separated().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].as_ident(), Some("auto"));
        assert!(TokenList(vec![Ident("a".into()), Comma]).space_separated().is_none());
    }
}
