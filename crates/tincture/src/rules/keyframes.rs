use std::fmt;

use tincture_tokenizer::Location;

use crate::declaration::DeclarationBlock;
use crate::printer::{Printer, ToCss};
use crate::vendor_prefix::VendorPrefix;

/// `@keyframes <name> { ... }`, possibly vendor prefixed.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframesRule {
    pub name: KeyframesName,
    pub prefix: VendorPrefix,
    pub keyframes: Vec<Keyframe>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyframesName {
    Ident(String),
    /// `@keyframes "name"`; never scoped by CSS Modules.
    String(String),
}

impl KeyframesName {
    pub fn as_str(&self) -> &str {
        match self {
            KeyframesName::Ident(name) | KeyframesName::String(name) => name,
        }
    }
}

/// One `from`/`to`/percentage block.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    pub selectors: Vec<KeyframeSelector>,
    pub declarations: DeclarationBlock,
    pub loc: Location,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyframeSelector {
    From,
    To,
    /// `50%` is stored as `50.0`.
    Percentage(f32),
}

impl ToCss for KeyframeSelector {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        match self {
            // `0%` is shorter than `from`, `to` shorter than `100%`.
            KeyframeSelector::From if dest.minify => dest.write_str("0%"),
            KeyframeSelector::From => dest.write_str("from"),
            KeyframeSelector::To => dest.write_str("to"),
            KeyframeSelector::Percentage(p) if dest.minify && *p == 100.0 => dest.write_str("to"),
            KeyframeSelector::Percentage(p) => {
                dest.write_number(*p)?;
                dest.write_char('%')
            }
        }
    }
}

impl ToCss for Keyframe {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.add_mapping(self.loc);
        for (i, selector) in self.selectors.iter().enumerate() {
            if i > 0 {
                dest.delim(',', false)?;
            }
            selector.to_css(dest)?;
        }
        dest.whitespace()?;
        dest.write_char('{')?;
        dest.indent();
        self.declarations.write_body(dest, false)?;
        dest.dedent();
        dest.newline()?;
        dest.write_char('}')
    }
}

impl ToCss for KeyframesRule {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.add_mapping(self.loc);
        dest.write_char('@')?;
        dest.write_str(self.prefix.as_str())?;
        dest.write_str("keyframes ")?;
        match &self.name {
            KeyframesName::Ident(name) => dest.write_ident(name)?,
            KeyframesName::String(name) => dest.write_string(name)?,
        }
        dest.whitespace()?;
        dest.write_char('{')?;
        if !self.keyframes.is_empty() {
            dest.indent();
            for (i, keyframe) in self.keyframes.iter().enumerate() {
                if i > 0 {
                    dest.blank_line()?;
                } else {
                    dest.newline()?;
                }
                keyframe.to_css(dest)?;
            }
            dest.dedent();
        }
        dest.newline()?;
        dest.write_char('}')
    }
}
