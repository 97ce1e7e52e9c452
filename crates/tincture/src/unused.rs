//! Unused-symbol elimination.

use std::collections::HashSet;

use tracing::debug;

use crate::rules::{CssRule, CssRuleList};

/// Remove everything that only exists for `unused`: selectors naming an
/// unused class or id, `@keyframes` with an unused name, and rules left
/// empty by those removals.
pub(crate) fn remove_unused(rules: &mut CssRuleList, unused: &HashSet<String>) {
    if unused.is_empty() {
        return;
    }
    prune(rules, unused);
}

/// Returns whether `rules` lost every rule it had.
fn prune(rules: &mut CssRuleList, unused: &HashSet<String>) -> bool {
    let before = rules.len();
    rules.0.retain_mut(|rule| keep(rule, unused));
    before > 0 && rules.is_empty()
}

fn keep(rule: &mut CssRule, unused: &HashSet<String>) -> bool {
    match rule {
        CssRule::Style(style) => {
            let before = style.selectors.0.len();
            style
                .selectors
                .0
                .retain(|selector| !selector.references_any(unused));
            if style.selectors.0.len() != before {
                debug!(
                    removed = before - style.selectors.0.len(),
                    loc = ?style.loc,
                    "removed selectors with unused symbols"
                );
            }
            if style.selectors.is_empty() {
                return false;
            }
            let emptied = prune(&mut style.rules, unused);
            !(emptied && style.declarations.is_empty() && style.composes.is_empty())
        }
        CssRule::Nesting(nesting) => {
            let style = &mut nesting.style;
            style
                .selectors
                .0
                .retain(|selector| !selector.references_any(unused));
            !style.selectors.is_empty() && {
                let emptied = prune(&mut style.rules, unused);
                !(emptied && style.declarations.is_empty())
            }
        }
        CssRule::Keyframes(keyframes) => {
            let used = !unused.contains(keyframes.name.as_str());
            if !used {
                debug!(name = keyframes.name.as_str(), "removed unused keyframes");
            }
            used
        }
        CssRule::Media(media) => !prune(&mut media.rules, unused),
        CssRule::Supports(supports) => !prune(&mut supports.rules, unused),
        CssRule::LayerBlock(layer) => !prune(&mut layer.rules, unused),
        CssRule::Property(_)
        | CssRule::FontFace(_)
        | CssRule::Page(_)
        | CssRule::Import(_)
        | CssRule::Namespace(_)
        | CssRule::LayerStatement(_)
        | CssRule::CustomMedia(_)
        | CssRule::Unknown(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Locator, ParserFlags, parse_stylesheet};
    use crate::printer::ToCss;

    fn eliminate(source: &str, unused: &[&str]) -> String {
        let locator = Locator::new("test.css", source);
        let (mut rules, _) = parse_stylesheet(&locator, ParserFlags::default()).unwrap();
        let unused = unused.iter().map(|s| s.to_string()).collect();
        remove_unused(&mut rules, &unused);
        rules.to_css_string()
    }

    #[test]
    fn test_selectors_and_rules_are_removed() {
        insta::assert_snapshot!(eliminate(".a, .b { color: red } .a { margin: 0 } #a { top: 0 } .c { color: blue }", &["a"]), @r"
        .b {
          color: red;
        }

        .c {
          color: blue;
        }
        ");
    }

    #[test]
    fn test_keyframes_and_emptied_containers() {
        let source = "@keyframes spin { to { opacity: 1 } } @media print { .a { color: red } } @media screen { }";
        assert_eq!(
            eliminate(source, &["spin", "a"]),
            "@media screen {\n}"
        );
    }

    #[test]
    fn test_nothing_unused_is_identity() {
        let source = ".a {\n  color: red;\n}";
        assert_eq!(eliminate(source, &[]), source);
        assert_eq!(eliminate(source, &["zzz"]), source);
    }

    #[test]
    fn test_selectors_inside_is_and_where() {
        let source = ":is(.a > .b) .c { color: red } :where(.a, .d) { color: blue } :is(.a) { top: 0 }";
        assert_eq!(
            eliminate(source, &["a"]),
            ":where(.a, .d) {\n  color: blue;\n}"
        );
    }

    #[test]
    fn test_pseudo_class_arguments_are_not_matched() {
        assert_eq!(
            eliminate(":not(.a) { color: red }", &["a"]),
            ":not(.a) {\n  color: red;\n}"
        );
    }
}
