//! Resolving nested style rules.
//!
//! Flattening walks the tree with the enclosing rule's resolved selectors in
//! hand. Every `&` is replaced by one of those selectors, producing the
//! cartesian product of parent and child selector lists, and nested
//! conditional rules are hoisted with their contents rewritten the same way.

use tincture_tokenizer::Span;
use tracing::debug;

use crate::error::{CssError, TransformErrorKind};
use crate::rules::{CssRule, CssRuleList, LayerBlockRule, MediaRule, StyleRule, SupportsRule};
use crate::selector::{Combinator, Component, PseudoClass, Selector, SelectorList};

/// Replace nested style rules with equivalent top-level ones.
pub(crate) fn flatten(rules: &mut CssRuleList, filename: &str) -> Result<(), CssError> {
    let mut out = Vec::with_capacity(rules.len());
    for rule in std::mem::take(&mut rules.0) {
        flatten_rule(rule, None, &mut out, filename)?;
    }
    rules.0 = out;
    Ok(())
}

/// Check that no `&` is left without an enclosing style rule, for targets
/// that keep nesting as written.
pub(crate) fn validate(rules: &CssRuleList, filename: &str) -> Result<(), CssError> {
    for rule in rules.iter() {
        match rule {
            CssRule::Style(style) => {
                if style.selectors.iter().any(Selector::has_nesting) {
                    return Err(unresolved(style, filename));
                }
            }
            CssRule::Nesting(nesting) => return Err(unresolved(&nesting.style, filename)),
            CssRule::Media(media) => validate(&media.rules, filename)?,
            CssRule::Supports(supports) => validate(&supports.rules, filename)?,
            CssRule::LayerBlock(layer) => validate(&layer.rules, filename)?,
            CssRule::Keyframes(_)
            | CssRule::Property(_)
            | CssRule::FontFace(_)
            | CssRule::Page(_)
            | CssRule::Import(_)
            | CssRule::Namespace(_)
            | CssRule::LayerStatement(_)
            | CssRule::CustomMedia(_)
            | CssRule::Unknown(_) => {}
        }
    }
    Ok(())
}

fn unresolved(rule: &StyleRule, filename: &str) -> CssError {
    CssError::transform(TransformErrorKind::UnresolvedNesting).with_location(
        filename,
        rule.loc,
        Span::default(),
    )
}

fn flatten_rule(
    rule: CssRule,
    parent: Option<&SelectorList>,
    out: &mut Vec<CssRule>,
    filename: &str,
) -> Result<(), CssError> {
    match rule {
        CssRule::Style(style) => flatten_style(style, parent, out, filename),
        CssRule::Nesting(nesting) => match parent {
            Some(_) => flatten_style(nesting.style, parent, out, filename),
            None => Err(unresolved(&nesting.style, filename)),
        },
        CssRule::Media(media) => {
            let rules = flatten_children(media.rules, parent, filename)?;
            out.push(CssRule::Media(MediaRule { rules, ..media }));
            Ok(())
        }
        CssRule::Supports(supports) => {
            let rules = flatten_children(supports.rules, parent, filename)?;
            out.push(CssRule::Supports(SupportsRule { rules, ..supports }));
            Ok(())
        }
        CssRule::LayerBlock(layer) => {
            let rules = flatten_children(layer.rules, parent, filename)?;
            out.push(CssRule::LayerBlock(LayerBlockRule { rules, ..layer }));
            Ok(())
        }
        other => {
            out.push(other);
            Ok(())
        }
    }
}

fn flatten_children(
    rules: CssRuleList,
    parent: Option<&SelectorList>,
    filename: &str,
) -> Result<CssRuleList, CssError> {
    let mut out = Vec::with_capacity(rules.len());
    for rule in rules.0 {
        flatten_rule(rule, parent, &mut out, filename)?;
    }
    Ok(CssRuleList(out))
}

fn flatten_style(
    rule: StyleRule,
    parent: Option<&SelectorList>,
    out: &mut Vec<CssRule>,
    filename: &str,
) -> Result<(), CssError> {
    let selectors = match parent {
        Some(parent) => resolve_list(&rule.selectors, parent),
        None if rule.selectors.iter().any(Selector::has_nesting) => {
            return Err(unresolved(&rule, filename));
        }
        None => rule.selectors.clone(),
    };
    if parent.is_some() {
        debug!(loc = ?rule.loc, "flattened nested style rule");
    }

    if !rule.declarations.is_empty() || !rule.composes.is_empty() {
        out.push(CssRule::Style(StyleRule {
            selectors: selectors.clone(),
            declarations: rule.declarations,
            rules: CssRuleList::default(),
            composes: rule.composes,
            loc: rule.loc,
        }));
    }
    for child in rule.rules.0 {
        flatten_rule(child, Some(&selectors), out, filename)?;
    }
    Ok(())
}

/// Every combination of a parent selector and a child selector.
fn resolve_list(children: &SelectorList, parents: &SelectorList) -> SelectorList {
    let mut resolved: Vec<Selector> = Vec::new();
    for parent in parents.iter() {
        for child in children.iter() {
            let selector = resolve(child, parent);
            if !resolved.contains(&selector) {
                resolved.push(selector);
            }
        }
    }
    SelectorList(resolved)
}

/// Substitute `parent` for each `&` in `child`.
fn resolve(child: &Selector, parent: &Selector) -> Selector {
    if !child.has_nesting() {
        let mut components = parent.0.clone();
        components.push(Component::Combinator(Combinator::Descendant));
        components.extend(child.0.iter().cloned());
        return Selector(components);
    }

    let compound = !parent
        .0
        .iter()
        .any(|c| matches!(c, Component::Combinator(_)));
    let starts_with_type = matches!(
        parent.0.first(),
        Some(Component::Type(_) | Component::Universal)
    );

    let mut out = Vec::with_capacity(child.0.len() + parent.0.len());
    for (i, component) in child.0.iter().enumerate() {
        match component {
            Component::Nesting => {
                let at_compound_start =
                    i == 0 || matches!(child.0[i - 1], Component::Combinator(_));
                if i == 0 || (compound && (at_compound_start || !starts_with_type)) {
                    out.extend(parent.0.iter().cloned());
                } else {
                    // `.x &` with `.a > .b` as the parent cannot be spliced.
                    out.push(Component::PseudoClass(PseudoClass::Selectors {
                        name: "is".to_string(),
                        selectors: SelectorList(vec![parent.clone()]),
                    }));
                }
            }
            Component::PseudoClass(PseudoClass::Selectors { name, selectors })
                if selectors.iter().any(Selector::has_nesting) =>
            {
                out.push(Component::PseudoClass(PseudoClass::Selectors {
                    name: name.clone(),
                    selectors: SelectorList(
                        selectors
                            .iter()
                            .map(|s| if s.has_nesting() { resolve(s, parent) } else { s.clone() })
                            .collect(),
                    ),
                }));
            }
            other => out.push(other.clone()),
        }
    }
    Selector(out)
}
