//! Mutable traversal over the rule tree.
//!
//! Passes implement [`VisitMut`] and override the hooks they care about. The
//! default hooks call the matching `walk_*` function, so an override can do
//! its work and then keep descending with `walk_*`, or stop.

use crate::declaration::{Declaration, DeclarationBlock};
use crate::rules::{CssRule, CssRuleList, KeyframesRule, StyleRule};
use crate::selector::SelectorList;
use crate::values::TokenList;

/// A pre-order, mutating visitor.
pub trait VisitMut {
    type Error;

    fn visit_rule_list(&mut self, rules: &mut CssRuleList) -> Result<(), Self::Error> {
        walk_rule_list(self, rules)
    }

    fn visit_rule(&mut self, rule: &mut CssRule) -> Result<(), Self::Error> {
        walk_rule(self, rule)
    }

    fn visit_style_rule(&mut self, rule: &mut StyleRule) -> Result<(), Self::Error> {
        walk_style_rule(self, rule)
    }

    fn visit_selectors(&mut self, _selectors: &mut SelectorList) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_keyframes(&mut self, rule: &mut KeyframesRule) -> Result<(), Self::Error> {
        walk_keyframes(self, rule)
    }

    fn visit_declaration_block(&mut self, block: &mut DeclarationBlock) -> Result<(), Self::Error> {
        walk_declaration_block(self, block)
    }

    fn visit_declaration(&mut self, declaration: &mut Declaration) -> Result<(), Self::Error> {
        self.visit_value(&mut declaration.value)
    }

    fn visit_value(&mut self, _value: &mut TokenList) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub fn walk_rule_list<V: VisitMut + ?Sized>(
    visitor: &mut V,
    rules: &mut CssRuleList,
) -> Result<(), V::Error> {
    for rule in &mut rules.0 {
        visitor.visit_rule(rule)?;
    }
    Ok(())
}

pub fn walk_rule<V: VisitMut + ?Sized>(visitor: &mut V, rule: &mut CssRule) -> Result<(), V::Error> {
    match rule {
        CssRule::Style(rule) => visitor.visit_style_rule(rule),
        CssRule::Nesting(rule) => visitor.visit_style_rule(&mut rule.style),
        CssRule::Media(rule) => visitor.visit_rule_list(&mut rule.rules),
        CssRule::Supports(rule) => visitor.visit_rule_list(&mut rule.rules),
        CssRule::LayerBlock(rule) => visitor.visit_rule_list(&mut rule.rules),
        CssRule::Keyframes(rule) => visitor.visit_keyframes(rule),
        CssRule::FontFace(rule) => visitor.visit_declaration_block(&mut rule.declarations),
        CssRule::Page(rule) => visitor.visit_declaration_block(&mut rule.declarations),
        CssRule::Property(rule) => visitor.visit_declaration_block(&mut rule.declarations),
        CssRule::Import(_)
        | CssRule::Namespace(_)
        | CssRule::LayerStatement(_)
        | CssRule::CustomMedia(_)
        | CssRule::Unknown(_) => Ok(()),
    }
}

pub fn walk_style_rule<V: VisitMut + ?Sized>(
    visitor: &mut V,
    rule: &mut StyleRule,
) -> Result<(), V::Error> {
    visitor.visit_selectors(&mut rule.selectors)?;
    visitor.visit_declaration_block(&mut rule.declarations)?;
    visitor.visit_rule_list(&mut rule.rules)
}

pub fn walk_keyframes<V: VisitMut + ?Sized>(
    visitor: &mut V,
    rule: &mut KeyframesRule,
) -> Result<(), V::Error> {
    for keyframe in &mut rule.keyframes {
        visitor.visit_declaration_block(&mut keyframe.declarations)?;
    }
    Ok(())
}

pub fn walk_declaration_block<V: VisitMut + ?Sized>(
    visitor: &mut V,
    block: &mut DeclarationBlock,
) -> Result<(), V::Error> {
    for declaration in &mut block.declarations {
        visitor.visit_declaration(declaration)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Locator, ParserFlags, parse_stylesheet};
    use std::convert::Infallible;

    #[derive(Default)]
    struct Counter {
        style_rules: usize,
        declarations: usize,
    }

    impl VisitMut for Counter {
        type Error = Infallible;

        fn visit_style_rule(&mut self, rule: &mut StyleRule) -> Result<(), Infallible> {
            self.style_rules += 1;
            walk_style_rule(self, rule)
        }

        fn visit_declaration(&mut self, _: &mut Declaration) -> Result<(), Infallible> {
            self.declarations += 1;
            Ok(())
        }
    }

    #[test]
    fn test_walks_every_container() {
        let source = "
            .a { color: red; .b { color: blue } }
            @media print { .c { margin: 0 } }
            @keyframes k { from { opacity: 0 } to { opacity: 1 } }
            @font-face { font-family: x }
        ";
        let locator = Locator::new("test.css", source);
        let (mut rules, _) = parse_stylesheet(&locator, ParserFlags::default()).unwrap();
        let mut counter = Counter::default();
        counter.visit_rule_list(&mut rules).unwrap();
        assert_eq!(counter.style_rules, 3);
        assert_eq!(counter.declarations, 6);
    }
}
