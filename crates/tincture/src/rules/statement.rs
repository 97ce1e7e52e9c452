use std::fmt;

use tincture_tokenizer::Location;

use crate::declaration::DeclarationBlock;
use crate::media_query::MediaList;
use crate::printer::{Printer, ToCss};
use crate::values::TokenList;

fn write_declaration_block(declarations: &DeclarationBlock, dest: &mut Printer<'_>) -> fmt::Result {
    dest.whitespace()?;
    dest.write_char('{')?;
    dest.indent();
    declarations.write_body(dest, false)?;
    dest.dedent();
    dest.newline()?;
    dest.write_char('}')
}

/// `@property --name { syntax: ...; inherits: ...; initial-value: ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRule {
    pub name: String,
    pub declarations: DeclarationBlock,
    pub loc: Location,
}

impl ToCss for PropertyRule {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.add_mapping(self.loc);
        dest.write_str("@property ")?;
        dest.write_ident(&self.name)?;
        write_declaration_block(&self.declarations, dest)
    }
}

/// `@font-face { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct FontFaceRule {
    pub declarations: DeclarationBlock,
    pub loc: Location,
}

impl ToCss for FontFaceRule {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.add_mapping(self.loc);
        dest.write_str("@font-face")?;
        write_declaration_block(&self.declarations, dest)
    }
}

/// `@page [selectors] { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct PageRule {
    /// Page selectors such as `:first`, as normalized text.
    pub selectors: String,
    pub declarations: DeclarationBlock,
    pub loc: Location,
}

impl ToCss for PageRule {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.add_mapping(self.loc);
        dest.write_str("@page")?;
        if !self.selectors.is_empty() {
            dest.write_char(' ')?;
            dest.write_str(&self.selectors)?;
        }
        write_declaration_block(&self.declarations, dest)
    }
}

/// `@import "url" [layer[(name)]] [supports(...)] [media];`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRule {
    pub url: String,
    /// `Some(None)` for an anonymous `layer`.
    pub layer: Option<Option<String>>,
    pub supports: Option<TokenList>,
    pub media: MediaList,
    pub loc: Location,
}

impl ToCss for ImportRule {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.add_mapping(self.loc);
        dest.write_str("@import ")?;
        dest.write_string(&self.url)?;
        match &self.layer {
            Some(Some(name)) => {
                dest.write_str(" layer(")?;
                dest.write_str(name)?;
                dest.write_char(')')?;
            }
            Some(None) => dest.write_str(" layer")?,
            None => {}
        }
        if let Some(supports) = &self.supports {
            dest.write_str(" supports(")?;
            supports.to_css(dest)?;
            dest.write_char(')')?;
        }
        if !self.media.is_empty() {
            dest.write_char(' ')?;
            self.media.to_css(dest)?;
        }
        dest.write_char(';')
    }
}

/// `@custom-media --name query;`
#[derive(Debug, Clone, PartialEq)]
pub struct CustomMediaRule {
    /// The dashed name, including `--`.
    pub name: String,
    pub query: MediaList,
    pub loc: Location,
}

impl ToCss for CustomMediaRule {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.add_mapping(self.loc);
        dest.write_str("@custom-media ")?;
        dest.write_ident(&self.name)?;
        dest.write_char(' ')?;
        self.query.to_css(dest)?;
        dest.write_char(';')
    }
}

/// `@namespace [prefix] "url";`
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceRule {
    pub prefix: Option<String>,
    pub url: String,
    pub loc: Location,
}

impl ToCss for NamespaceRule {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.add_mapping(self.loc);
        dest.write_str("@namespace ")?;
        if let Some(prefix) = &self.prefix {
            dest.write_ident(prefix)?;
            dest.write_char(' ')?;
        }
        dest.write_string(&self.url)?;
        dest.write_char(';')
    }
}

/// An at-rule this crate does not model, kept as tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownAtRule {
    pub name: String,
    pub prelude: TokenList,
    /// Block contents, or `None` for a statement at-rule.
    pub block: Option<TokenList>,
    pub loc: Location,
}

impl ToCss for UnknownAtRule {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.add_mapping(self.loc);
        dest.write_char('@')?;
        dest.write_ident(&self.name)?;
        if !self.prelude.is_empty() {
            dest.write_char(' ')?;
            self.prelude.to_css(dest)?;
        }
        match &self.block {
            Some(block) => {
                dest.whitespace()?;
                dest.write_char('{')?;
                block.to_css(dest)?;
                dest.write_char('}')
            }
            None => dest.write_char(';'),
        }
    }
}
