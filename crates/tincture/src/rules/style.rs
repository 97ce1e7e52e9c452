use std::fmt;

use tincture_tokenizer::Location;

use crate::css_modules::Composes;
use crate::declaration::DeclarationBlock;
use crate::printer::{Printer, ToCss};
use crate::rules::{CssRuleList, write_rules};
use crate::selector::SelectorList;

/// A style rule, with any rules nested inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub selectors: SelectorList,
    pub declarations: DeclarationBlock,
    pub rules: CssRuleList,
    /// `composes` declarations, collected when CSS Modules are enabled.
    /// They are never printed.
    pub composes: Vec<Composes>,
    pub loc: Location,
}

impl StyleRule {
    pub(crate) fn is_empty(&self) -> bool {
        self.declarations.is_empty() && self.rules.is_empty_deep()
    }

    pub(crate) fn is_mergeable(&self) -> bool {
        self.rules.is_empty()
            && !self
                .selectors
                .iter()
                .any(|selector| selector.has_vendor_prefixed_pseudo())
    }
}

impl ToCss for StyleRule {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.add_mapping(self.loc);
        self.selectors.to_css(dest)?;
        dest.whitespace()?;
        dest.write_char('{')?;
        dest.indent();

        let nested = self.rules.printable(dest.minify);
        self.declarations.write_body(dest, !nested.is_empty())?;
        if !nested.is_empty() {
            if self.declarations.is_empty() {
                dest.newline()?;
            } else {
                dest.blank_line()?;
            }
            write_rules(&nested, dest)?;
        }

        dest.dedent();
        dest.newline()?;
        dest.write_char('}')
    }
}

/// `@nest <selector> { ... }`
///
/// Printed as a plain nested style rule, which is how engines with native
/// nesting understand it.
#[derive(Debug, Clone, PartialEq)]
pub struct NestingRule {
    pub style: StyleRule,
    pub loc: Location,
}

impl ToCss for NestingRule {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.add_mapping(self.loc);
        self.style.to_css(dest)
    }
}
