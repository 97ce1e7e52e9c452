//! Declaration minification.
//!
//! Overridden declarations are dropped, box shorthands are shortened to
//! their fewest sides, and a complete set of `margin-*` or `padding-*`
//! longhands becomes the shorthand.

use crate::declaration::{Declaration, PropertyId};
use crate::values::{ComponentValue, CssColor, TokenList};

const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

/// Minify a declaration list. Minifying the result again changes nothing.
pub(crate) fn minify_declarations(declarations: &[Declaration]) -> Vec<Declaration> {
    let mut out = drop_overridden(declarations);
    collapse_longhands(&mut out, "margin");
    collapse_longhands(&mut out, "padding");
    let mut out = drop_overridden(&out);
    for declaration in &mut out {
        shorten_box_value(declaration);
    }
    out
}

/// Drop declarations a later one of the same property replaces.
///
/// A later value only replaces an earlier one when every engine accepts
/// it; otherwise the earlier declaration is a fallback and stays.
fn drop_overridden(declarations: &[Declaration]) -> Vec<Declaration> {
    declarations
        .iter()
        .enumerate()
        .filter(|(i, earlier)| {
            !declarations[i + 1..].iter().any(|later| {
                later.property == earlier.property
                    && (later.important || !earlier.important)
                    && (later.property.is_custom() || is_universal(&later.value))
            })
        })
        .map(|(_, declaration)| declaration.clone())
        .collect()
}

/// Whether every engine parses `value` the same way.
fn is_universal(value: &TokenList) -> bool {
    value.iter().all(|component| match component {
        ComponentValue::Number(_)
        | ComponentValue::Percentage(_)
        | ComponentValue::String(_)
        | ComponentValue::Whitespace
        | ComponentValue::Comma
        | ComponentValue::Delim('/') => true,
        ComponentValue::Dimension { unit, .. } => matches!(
            unit.to_ascii_lowercase().as_str(),
            "px" | "em" | "ex" | "pt" | "pc" | "in" | "cm" | "mm" | "deg" | "s" | "ms"
        ),
        ComponentValue::Color(CssColor::Rgba(rgba)) => rgba.alpha == 255,
        ComponentValue::Ident(ident) => is_universal_keyword(&ident.to_ascii_lowercase()),
        _ => false,
    })
}

fn is_universal_keyword(ident: &str) -> bool {
    matches!(
        ident,
        "inherit"
            | "auto"
            | "none"
            | "normal"
            | "transparent"
            | "black"
            | "silver"
            | "gray"
            | "white"
            | "maroon"
            | "red"
            | "purple"
            | "fuchsia"
            | "green"
            | "lime"
            | "olive"
            | "yellow"
            | "navy"
            | "blue"
            | "teal"
            | "aqua"
            | "orange"
            | "block"
            | "inline"
            | "bold"
            | "italic"
            | "hidden"
            | "visible"
            | "solid"
            | "dashed"
            | "dotted"
            | "left"
            | "right"
            | "center"
            | "top"
            | "bottom"
            | "absolute"
            | "relative"
            | "fixed"
            | "static"
    )
}

fn box_property(property: &PropertyId) -> bool {
    matches!(
        property,
        PropertyId::Standard { name, prefix }
            if prefix.is_empty() && matches!(name.as_str(), "margin" | "padding" | "inset")
    )
}

fn has_var(value: &TokenList) -> bool {
    value.any(&mut |component| matches!(component, ComponentValue::Var(_)))
}

/// `margin: 0 0 0 0` becomes `margin: 0`.
fn shorten_box_value(declaration: &mut Declaration) {
    if !box_property(&declaration.property) || has_var(&declaration.value) {
        return;
    }
    let Some(parts) = declaration.value.space_separated() else {
        return;
    };
    let [top, right, bottom, left] = match parts.as_slice() {
        [all] => [all, all, all, all],
        [vertical, horizontal] => [vertical, horizontal, vertical, horizontal],
        [top, horizontal, bottom] => [top, horizontal, bottom, horizontal],
        [top, right, bottom, left] => [top, right, bottom, left],
        _ => return,
    };
    let sides = if left != right {
        vec![top, right, bottom, left]
    } else if bottom != top {
        vec![top, right, bottom]
    } else if right != top {
        vec![top, right]
    } else {
        vec![top]
    };
    if sides.len() < parts.len() {
        declaration.value = join_parts(sides);
    }
}

fn join_parts<'a>(parts: impl IntoIterator<Item = &'a TokenList>) -> TokenList {
    let mut values = Vec::new();
    for part in parts {
        if !values.is_empty() {
            values.push(ComponentValue::Whitespace);
        }
        values.extend(part.0.iter().cloned());
    }
    TokenList(values)
}

/// Replace `{shorthand}-top`, `-right`, `-bottom` and `-left` with the
/// shorthand when each appears once with a single plain value.
fn collapse_longhands(declarations: &mut Vec<Declaration>, shorthand: &str) {
    let mut indices = [0usize; 4];
    for (side, index) in SIDES.iter().zip(indices.iter_mut()) {
        let longhand = PropertyId::standard(&format!("{shorthand}-{side}"));
        let mut found = declarations
            .iter()
            .enumerate()
            .filter(|(_, declaration)| declaration.property == longhand);
        match (found.next(), found.next()) {
            (Some((i, _)), None) => *index = i,
            _ => return,
        }
    }

    let longhands: Vec<&Declaration> = indices.iter().map(|&i| &declarations[i]).collect();
    let important = longhands[0].important;
    if longhands.iter().any(|declaration| {
        declaration.important != important
            || has_var(&declaration.value)
            || declaration
                .value
                .space_separated()
                .is_none_or(|parts| parts.len() != 1)
    }) {
        return;
    }

    // Another property of the same family in between may depend on order.
    let (first, last) = (
        indices.iter().copied().min().unwrap_or_default(),
        indices.iter().copied().max().unwrap_or_default(),
    );
    if declarations[first..=last]
        .iter()
        .enumerate()
        .any(|(offset, declaration)| {
            !indices.contains(&(first + offset))
                && declaration.property.name().starts_with(shorthand)
        })
    {
        return;
    }

    let collapsed = Declaration {
        property: PropertyId::standard(shorthand),
        value: join_parts(longhands.iter().map(|declaration| &declaration.value)),
        important,
        loc: declarations[first].loc,
    };
    tracing::trace!(shorthand, "collapsed longhands");

    let mut collapsed = Some(collapsed);
    let old = std::mem::take(declarations);
    for (i, declaration) in old.into_iter().enumerate() {
        if i == last {
            declarations.extend(collapsed.take());
        } else if !indices.contains(&i) {
            declarations.push(declaration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParseOptions;
    use crate::printer::ToCss;
    use crate::rules::CssRule;
    use crate::stylesheet::StyleSheet;

    fn minified(body: &str) -> String {
        let source = format!(".a {{ {body} }}");
        let sheet = StyleSheet::parse(&source, ParseOptions::default()).unwrap();
        let Some(CssRule::Style(style)) = sheet.rules.0.first() else {
            panic!("expected a style rule");
        };
        minify_declarations(&style.declarations.declarations)
            .iter()
            .map(|declaration| declaration.to_css_string())
            .collect::<Vec<_>>()
            .join("; ")
    }

    #[test]
    fn test_later_declaration_wins() {
        assert_eq!(minified("color: red; color: blue"), "color: blue");
        assert_eq!(minified("--x: 1; --x: var(--y)"), "--x: var(--y)");
        assert_eq!(
            minified("color: red !important; color: blue"),
            "color: red !important; color: blue"
        );
    }

    #[test]
    fn test_fallbacks_are_kept() {
        assert_eq!(
            minified("position: -webkit-sticky; position: sticky"),
            "position: -webkit-sticky; position: sticky"
        );
        assert_eq!(minified("color: #f00; color: lab(50% 20 30)").matches("color:").count(), 2);
        assert_eq!(minified("color: #f00; color: #ff000080").matches("color:").count(), 2);
        assert_eq!(
            minified("display: block; display: flex"),
            "display: block; display: flex"
        );
    }

    #[test]
    fn test_box_values_are_shortened() {
        assert_eq!(minified("margin: 0 0 0 0"), "margin: 0");
        assert_eq!(minified("padding: 1px 2px 1px 2px"), "padding: 1px 2px");
        assert_eq!(minified("margin: 1px 2px 3px 2px"), "margin: 1px 2px 3px");
        assert_eq!(minified("inset: 0 auto 0"), "inset: 0 auto");
        assert_eq!(minified("margin: var(--a) 0 var(--a) 0"), "margin: var(--a) 0 var(--a) 0");
    }

    #[test]
    fn test_longhands_collapse() {
        assert_eq!(
            minified("margin-top: 1px; margin-right: 1px; margin-bottom: 1px; margin-left: 1px"),
            "margin: 1px"
        );
        assert_eq!(
            minified("color: red; padding-left: 4px; padding-top: 1px; padding-right: 2px; padding-bottom: 3px"),
            "color: red; padding: 1px 2px 3px 4px"
        );
        // Mixed importance and a shorthand in between stay as written.
        assert_eq!(
            minified("margin-top: 1px !important; margin-right: 1px; margin-bottom: 1px; margin-left: 1px"),
            "margin-top: 1px !important; margin-right: 1px; margin-bottom: 1px; margin-left: 1px"
        );
        assert_eq!(
            minified("margin-top: 1px; margin: 0 auto; margin-right: 1px; margin-bottom: 1px; margin-left: 1px"),
            "margin-top: 1px; margin: 0 auto; margin-right: 1px; margin-bottom: 1px; margin-left: 1px"
        );
    }

    #[test]
    fn test_minify_is_stable() {
        let once = minified("margin: 0; margin-top: 2px; margin-right: 2px; margin-bottom: 2px; margin-left: 2px");
        assert_eq!(once, "margin: 2px");
        assert_eq!(minified(&once), once);
    }
}
