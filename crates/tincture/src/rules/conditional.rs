use std::fmt;

use tincture_tokenizer::Location;

use crate::media_query::MediaList;
use crate::printer::{Printer, ToCss};
use crate::rules::{CssRuleList, write_rule_block};
use crate::values::TokenList;

/// `@media <query> { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRule {
    pub query: MediaList,
    pub rules: CssRuleList,
    pub loc: Location,
}

impl ToCss for MediaRule {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.add_mapping(self.loc);
        dest.write_str("@media")?;
        if !self.query.is_empty() {
            dest.write_char(' ')?;
            self.query.to_css(dest)?;
        }
        write_rule_block(&self.rules, dest)
    }
}

/// `@supports <condition> { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct SupportsRule {
    /// The condition as written.
    pub condition: TokenList,
    pub rules: CssRuleList,
    pub loc: Location,
}

impl ToCss for SupportsRule {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.add_mapping(self.loc);
        dest.write_str("@supports ")?;
        self.condition.to_css(dest)?;
        write_rule_block(&self.rules, dest)
    }
}

/// `@layer a, b.c;`
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStatementRule {
    /// Dotted layer names.
    pub names: Vec<String>,
    pub loc: Location,
}

impl ToCss for LayerStatementRule {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.add_mapping(self.loc);
        dest.write_str("@layer ")?;
        for (i, name) in self.names.iter().enumerate() {
            if i > 0 {
                dest.delim(',', false)?;
            }
            dest.write_str(name)?;
        }
        dest.write_char(';')
    }
}

/// `@layer [name] { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct LayerBlockRule {
    /// `None` for an anonymous layer.
    pub name: Option<String>,
    pub rules: CssRuleList,
    pub loc: Location,
}

impl ToCss for LayerBlockRule {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.add_mapping(self.loc);
        dest.write_str("@layer")?;
        if let Some(name) = &self.name {
            dest.write_char(' ')?;
            dest.write_str(name)?;
        }
        write_rule_block(&self.rules, dest)
    }
}
