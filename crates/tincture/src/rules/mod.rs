//! The rule tree.
//!
//! Rules own their children; there are no parent links. Nested style rules
//! keep their `&` selectors until the transform flattens them.

use std::borrow::Cow;
use std::fmt;

use tincture_tokenizer::Location;

use crate::declaration::DeclarationBlock;
use crate::printer::{Printer, ToCss};
use crate::properties::minify_declarations;
use crate::selector::Selector;

mod conditional;
mod keyframes;
mod statement;
mod style;

pub use conditional::{LayerBlockRule, LayerStatementRule, MediaRule, SupportsRule};
pub use keyframes::{Keyframe, KeyframeSelector, KeyframesName, KeyframesRule};
pub use statement::{
    CustomMediaRule, FontFaceRule, ImportRule, NamespaceRule, PageRule, PropertyRule,
    UnknownAtRule,
};
pub use style::{NestingRule, StyleRule};

/// Any rule.
#[derive(Debug, Clone, PartialEq)]
pub enum CssRule {
    Style(StyleRule),
    Media(MediaRule),
    Supports(SupportsRule),
    /// `@nest`
    Nesting(NestingRule),
    Keyframes(KeyframesRule),
    /// `@property`
    Property(PropertyRule),
    FontFace(FontFaceRule),
    Page(PageRule),
    Import(ImportRule),
    Namespace(NamespaceRule),
    LayerStatement(LayerStatementRule),
    LayerBlock(LayerBlockRule),
    /// `@custom-media`, until the transform substitutes it.
    CustomMedia(CustomMediaRule),
    Unknown(UnknownAtRule),
}

/// An ordered list of rules.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CssRuleList(pub Vec<CssRule>);

impl CssRule {
    /// Where the rule starts in the source.
    pub fn loc(&self) -> Location {
        match self {
            CssRule::Style(rule) => rule.loc,
            CssRule::Media(rule) => rule.loc,
            CssRule::Supports(rule) => rule.loc,
            CssRule::Nesting(rule) => rule.loc,
            CssRule::Keyframes(rule) => rule.loc,
            CssRule::Property(rule) => rule.loc,
            CssRule::FontFace(rule) => rule.loc,
            CssRule::Page(rule) => rule.loc,
            CssRule::Import(rule) => rule.loc,
            CssRule::Namespace(rule) => rule.loc,
            CssRule::LayerStatement(rule) => rule.loc,
            CssRule::LayerBlock(rule) => rule.loc,
            CssRule::CustomMedia(rule) => rule.loc,
            CssRule::Unknown(rule) => rule.loc,
        }
    }

    /// Whether minified output can leave this rule out.
    fn is_empty(&self) -> bool {
        match self {
            CssRule::Style(rule) => rule.is_empty(),
            CssRule::Nesting(rule) => rule.style.is_empty(),
            CssRule::Media(rule) => rule.rules.is_empty_deep(),
            CssRule::Supports(rule) => rule.rules.is_empty_deep(),
            CssRule::LayerBlock(rule) => rule.rules.is_empty_deep(),
            CssRule::Keyframes(_)
            | CssRule::Property(_)
            | CssRule::FontFace(_)
            | CssRule::Page(_)
            | CssRule::Import(_)
            | CssRule::Namespace(_)
            | CssRule::LayerStatement(_)
            | CssRule::CustomMedia(_)
            | CssRule::Unknown(_) => false,
        }
    }
}

impl CssRuleList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CssRule> {
        self.0.iter()
    }

    /// Whether nothing in this list would print in minified output.
    pub(crate) fn is_empty_deep(&self) -> bool {
        self.0.iter().all(CssRule::is_empty)
    }

    /// The rules to print. Minified output drops empty rules and merges
    /// adjacent style rules until nothing else can merge.
    pub(crate) fn printable(&self, minify: bool) -> Vec<Cow<'_, CssRule>> {
        if !minify {
            return self.0.iter().map(Cow::Borrowed).collect();
        }
        let mut rules: Vec<Cow<'_, CssRule>> = self
            .0
            .iter()
            .filter(|rule| !rule.is_empty())
            .map(|rule| match rule {
                // Minified first so equal bodies compare equal when merging.
                CssRule::Style(style) => {
                    let declarations = DeclarationBlock {
                        declarations: minify_declarations(&style.declarations.declarations),
                    };
                    if declarations.same_content(&style.declarations) {
                        return Cow::Borrowed(rule);
                    }
                    let mut style = style.clone();
                    style.declarations = declarations;
                    Cow::Owned(CssRule::Style(style))
                }
                _ => Cow::Borrowed(rule),
            })
            .collect();
        while merge_adjacent(&mut rules) {}
        rules
    }
}

/// Merge one pair of adjacent style rules. Returns whether anything merged.
fn merge_adjacent(rules: &mut Vec<Cow<'_, CssRule>>) -> bool {
    for i in 1..rules.len() {
        let (CssRule::Style(previous), CssRule::Style(current)) =
            (rules[i - 1].as_ref(), rules[i].as_ref())
        else {
            continue;
        };
        if !previous.is_mergeable() || !current.is_mergeable() {
            continue;
        }

        let merged = if previous.selectors == current.selectors {
            let mut merged = previous.clone();
            merged
                .declarations
                .declarations
                .extend(current.declarations.declarations.iter().cloned());
            merged.declarations.declarations = minify_declarations(&merged.declarations.declarations);
            merged
        } else if previous.declarations.same_content(&current.declarations)
            && previous.selectors.iter().all(Selector::is_widely_supported)
            && current.selectors.iter().all(Selector::is_widely_supported)
        {
            let mut merged = previous.clone();
            for selector in current.selectors.iter() {
                if !merged.selectors.0.contains(selector) {
                    merged.selectors.0.push(selector.clone());
                }
            }
            merged
        } else {
            continue;
        };

        tracing::trace!(index = i, "merged adjacent style rules");
        rules[i - 1] = Cow::Owned(CssRule::Style(merged));
        rules.remove(i);
        return true;
    }
    false
}

/// Write rules separated by blank lines.
pub(crate) fn write_rules(rules: &[Cow<'_, CssRule>], dest: &mut Printer<'_>) -> fmt::Result {
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            dest.blank_line()?;
        }
        rule.to_css(dest)?;
    }
    Ok(())
}

/// Write `{ rules }` after a prelude.
pub(crate) fn write_rule_block(rules: &CssRuleList, dest: &mut Printer<'_>) -> fmt::Result {
    dest.whitespace()?;
    dest.write_char('{')?;
    let printable = rules.printable(dest.minify);
    if !printable.is_empty() {
        dest.indent();
        dest.newline()?;
        write_rules(&printable, dest)?;
        dest.dedent();
    }
    dest.newline()?;
    dest.write_char('}')
}

impl ToCss for CssRuleList {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        let printable = self.printable(dest.minify);
        write_rules(&printable, dest)
    }
}

impl ToCss for CssRule {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        match self {
            CssRule::Style(rule) => rule.to_css(dest),
            CssRule::Media(rule) => rule.to_css(dest),
            CssRule::Supports(rule) => rule.to_css(dest),
            CssRule::Nesting(rule) => rule.to_css(dest),
            CssRule::Keyframes(rule) => rule.to_css(dest),
            CssRule::Property(rule) => rule.to_css(dest),
            CssRule::FontFace(rule) => rule.to_css(dest),
            CssRule::Page(rule) => rule.to_css(dest),
            CssRule::Import(rule) => rule.to_css(dest),
            CssRule::Namespace(rule) => rule.to_css(dest),
            CssRule::LayerStatement(rule) => rule.to_css(dest),
            CssRule::LayerBlock(rule) => rule.to_css(dest),
            CssRule::CustomMedia(rule) => rule.to_css(dest),
            CssRule::Unknown(rule) => rule.to_css(dest),
        }
    }
}
