//! Per-declaration compatibility rewrites.
//!
//! Each declaration either passes through, is rewritten losslessly, or gets
//! a legacy declaration stacked in front of it. Nothing the author wrote is
//! removed.

use std::convert::Infallible;

use tracing::debug;

use crate::compat::{Feature, Prefixed};
use crate::declaration::{Declaration, DeclarationBlock, PropertyId};
use crate::targets::Browsers;
use crate::values::{ComponentValue, CssColor, TokenList};
use crate::vendor_prefix::VendorPrefix;
use crate::visitor::VisitMut;

const LOGICAL_PROPERTIES: &[&str] = &[
    "block-size",
    "inline-size",
    "min-block-size",
    "min-inline-size",
    "max-block-size",
    "max-inline-size",
    "margin-block",
    "margin-block-start",
    "margin-block-end",
    "margin-inline",
    "margin-inline-start",
    "margin-inline-end",
    "padding-block",
    "padding-block-start",
    "padding-block-end",
    "padding-inline",
    "padding-inline-start",
    "padding-inline-end",
    "inset-block",
    "inset-block-start",
    "inset-block-end",
    "inset-inline",
    "inset-inline-start",
    "inset-inline-end",
];

pub(crate) struct Fallbacks<'a> {
    targets: &'a Browsers,
}

impl<'a> Fallbacks<'a> {
    pub(crate) fn new(targets: &'a Browsers) -> Self {
        Self { targets }
    }

    fn rewrite_block(&self, declarations: Vec<Declaration>) -> Vec<Declaration> {
        let mut out = Vec::with_capacity(declarations.len());
        for (index, declaration) in declarations.iter().enumerate() {
            let PropertyId::Standard { name, prefix } = &declaration.property else {
                debug!(property = declaration.property.name(), "custom property untouched");
                out.push(declaration.clone());
                continue;
            };

            if prefix.is_empty() {
                self.prefixed_copies(declaration, name, &declarations, &mut out);
                self.sticky_fallback(declaration, name, &declarations, &mut out);
                if let Some(longhands) = self.expand_inset(declaration, name) {
                    out.extend(longhands);
                    continue;
                }
            }

            let mut declaration = declaration.clone();
            self.lower_hex_alpha(&mut declaration.value);

            let earlier = &declarations[..index];
            if let Some(fallback) = self.color_fallback(&declaration, earlier) {
                out.push(fallback);
            }

            if LOGICAL_PROPERTIES.contains(&name.as_str()) {
                debug!(property = %name, "logical property untouched");
            }
            if declaration
                .value
                .any(&mut |v| matches!(v, ComponentValue::Function(f) if f.name == "clamp"))
            {
                debug!(property = %name, "clamp() untouched");
            }
            out.push(declaration);
        }
        out
    }

    /// Prefixed copies of `declaration` for the engines that need them,
    /// skipping prefixes the author already wrote.
    fn prefixed_copies(
        &self,
        declaration: &Declaration,
        name: &str,
        block: &[Declaration],
        out: &mut Vec<Declaration>,
    ) {
        let Some(prefixed) = Prefixed::from_property(name) else {
            return;
        };
        for prefix in prefixed.prefixes_for(self.targets).each() {
            let written = block
                .iter()
                .any(|d| d.property.name() == name && d.property.prefix() == prefix);
            if written {
                debug!(property = name, prefix = prefix.as_str(), "prefixed copy already present");
                continue;
            }
            debug!(property = name, prefix = prefix.as_str(), "adding prefixed declaration");
            out.push(Declaration {
                property: declaration.property.with_prefix(prefix),
                ..declaration.clone()
            });
        }
    }

    /// `position: -webkit-sticky` ahead of `position: sticky`.
    fn sticky_fallback(
        &self,
        declaration: &Declaration,
        name: &str,
        block: &[Declaration],
        out: &mut Vec<Declaration>,
    ) {
        if name != "position"
            || !declaration
                .value
                .as_ident()
                .is_some_and(|v| v.eq_ignore_ascii_case("sticky"))
            || !Prefixed::Sticky
                .prefixes_for(self.targets)
                .contains(VendorPrefix::WEBKIT)
        {
            return;
        }
        let written = block.iter().any(|d| {
            d.property.name() == "position"
                && d.value
                    .as_ident()
                    .is_some_and(|v| v.eq_ignore_ascii_case("-webkit-sticky"))
        });
        if written {
            return;
        }
        debug!("adding -webkit-sticky fallback");
        out.push(Declaration {
            value: TokenList(vec![ComponentValue::Ident("-webkit-sticky".to_string())]),
            ..declaration.clone()
        });
    }

    /// `inset` as its four longhands, when the shorthand is unsupported.
    fn expand_inset(&self, declaration: &Declaration, name: &str) -> Option<Vec<Declaration>> {
        if name != "inset" || Feature::InsetShorthand.is_compatible(self.targets) {
            return None;
        }
        if declaration
            .value
            .any(&mut |v| matches!(v, ComponentValue::Var(_)))
        {
            debug!("inset with var() untouched");
            return None;
        }
        let parts = declaration.value.space_separated()?;
        let order: [usize; 4] = match parts.len() {
            1 => [0, 0, 0, 0],
            2 => [0, 1, 0, 1],
            3 => [0, 1, 2, 1],
            4 => [0, 1, 2, 3],
            _ => return None,
        };
        debug!(count = parts.len(), "expanding inset shorthand");
        let longhands = ["top", "right", "bottom", "left"]
            .iter()
            .zip(order)
            .map(|(side, i)| Declaration {
                property: PropertyId::standard(side),
                value: parts[i].clone(),
                important: declaration.important,
                loc: declaration.loc,
            })
            .collect();
        Some(longhands)
    }

    /// Rewrite `#rrggbbaa` colors as `rgba()`.
    fn lower_hex_alpha(&self, value: &mut TokenList) {
        if Feature::HexAlphaColors.is_compatible(self.targets) {
            return;
        }
        value.for_each_mut(&mut |v| {
            if let ComponentValue::Color(CssColor::Rgba(rgba)) = v
                && rgba.alpha != 255
            {
                let rgba = *rgba;
                debug!("rewriting hex alpha color");
                *v = ComponentValue::Color(CssColor::LegacyRgba(rgba));
            }
        });
    }

    /// An sRGB copy of a declaration using lab-family colors the targets do
    /// not support. An earlier declaration of the same property counts as
    /// the author's own fallback.
    fn color_fallback(&self, declaration: &Declaration, earlier: &[Declaration]) -> Option<Declaration> {
        let needs_fallback = declaration.value.any(&mut |v| {
            matches!(v, ComponentValue::Color(color)
                if color.is_lab_family()
                    && color.feature().is_some_and(|f| !f.is_compatible(self.targets)))
        });
        if !needs_fallback {
            return None;
        }
        if earlier.iter().any(|d| d.property == declaration.property) {
            debug!(
                property = declaration.property.name(),
                "author fallback present, not generating one"
            );
            return None;
        }

        let legacy_alpha = !Feature::HexAlphaColors.is_compatible(self.targets);
        let mut fallback = declaration.clone();
        fallback.value.for_each_mut(&mut |v| {
            if let ComponentValue::Color(color) = v
                && color.is_lab_family()
            {
                let rgba = color.to_rgba();
                *color = if rgba.alpha != 255 && legacy_alpha {
                    CssColor::LegacyRgba(rgba)
                } else {
                    CssColor::Rgba(rgba)
                };
            }
        });
        debug!(property = declaration.property.name(), "adding sRGB color fallback");
        Some(fallback)
    }
}

impl VisitMut for Fallbacks<'_> {
    type Error = Infallible;

    fn visit_declaration_block(&mut self, block: &mut DeclarationBlock) -> Result<(), Infallible> {
        let declarations = std::mem::take(&mut block.declarations);
        block.declarations = self.rewrite_block(declarations);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Locator, ParserFlags, parse_stylesheet};
    use crate::printer::ToCss;
    use crate::rules::CssRule;
    use crate::targets::{Browser, version};

    fn rewrite(source: &str, targets: Browsers) -> String {
        let locator = Locator::new("test.css", source);
        let (mut rules, _) = parse_stylesheet(&locator, ParserFlags::default()).unwrap();
        Fallbacks::new(&targets).visit_rule_list(&mut rules).unwrap();
        rules.to_css_string()
    }

    fn safari(major: u8) -> Browsers {
        Browsers::default().with(Browser::Safari, version(major, 0, 0))
    }

    #[test]
    fn test_no_targets_no_changes() {
        let source = ".a {\n  user-select: none;\n  color: lch(50 30 120);\n  inset: 0;\n}";
        assert_eq!(rewrite(source, Browsers::default()), source);
    }

    #[test]
    fn test_lab_fallback_precedes_modern_color() {
        let locator = Locator::new("test.css", ".a { color: lch(50% 30 120) }");
        let (mut rules, _) = parse_stylesheet(&locator, ParserFlags::default()).unwrap();
        Fallbacks::new(&safari(4)).visit_rule_list(&mut rules).unwrap();
        let CssRule::Style(rule) = &rules.0[0] else {
            panic!("expected a style rule");
        };
        let values: Vec<_> = rule
            .declarations
            .declarations
            .iter()
            .map(|d| d.value.0[0].clone())
            .collect();
        assert_eq!(values.len(), 2);
        assert!(matches!(values[0], ComponentValue::Color(CssColor::Rgba(_))));
        assert!(matches!(values[1], ComponentValue::Color(CssColor::Lch(_))));
    }

    #[test]
    fn test_lab_fallback_follows_support_boundary() {
        let source = ".a { color: lab(50 0 0) }";
        assert_eq!(rewrite(source, safari(15)), ".a {\n  color: lab(50 0 0);\n}");
        assert!(rewrite(source, safari(14)).starts_with(".a {\n  color: #"));
    }

    #[test]
    fn test_author_fallback_wins() {
        let source = ".a { color: red; color: lch(50 30 120) }";
        assert_eq!(
            rewrite(source, safari(4)),
            ".a {\n  color: red;\n  color: lch(50 30 120);\n}"
        );
    }

    #[test]
    fn test_prefixed_properties() {
        insta::assert_snapshot!(rewrite(".a { user-select: none }", safari(14)), @r"
        .a {
          -webkit-user-select: none;
          user-select: none;
        }
        ");
        assert_eq!(
            rewrite(".a { -webkit-user-select: none; user-select: none }", safari(14)),
            ".a {\n  -webkit-user-select: none;\n  user-select: none;\n}"
        );
    }

    #[test]
    fn test_sticky() {
        assert_eq!(
            rewrite(".a { position: sticky }", safari(12)),
            ".a {\n  position: -webkit-sticky;\n  position: sticky;\n}"
        );
        assert_eq!(
            rewrite(".a { position: sticky }", safari(13)),
            ".a {\n  position: sticky;\n}"
        );
    }

    #[test]
    fn test_inset_expansion() {
        insta::assert_snapshot!(rewrite(".a { inset: 1px 2px !important }", safari(12)), @r"
        .a {
          top: 1px !important;
          right: 2px !important;
          bottom: 1px !important;
          left: 2px !important;
        }
        ");
        assert_eq!(
            rewrite(".a { inset: var(--i) }", safari(12)),
            ".a {\n  inset: var(--i);\n}"
        );
    }

    #[test]
    fn test_hex_alpha_is_lowered() {
        assert_eq!(
            rewrite(".a { color: #ff000080 }", safari(9)),
            ".a {\n  color: rgba(255, 0, 0, 0.5);\n}"
        );
        assert_eq!(
            rewrite(".a { color: #ff000080 }", safari(10)),
            ".a {\n  color: #ff000080;\n}"
        );
    }

    #[test]
    fn test_custom_properties_untouched() {
        assert_eq!(
            rewrite(".a { --c: lch(50 30 120) }", safari(4)),
            ".a {\n  --c: lch(50 30 120);\n}"
        );
    }
}
