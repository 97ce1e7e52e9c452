//! Number formatting.

use crate::printer::{serialize_identifier, serialize_name};

/// Format `value` in its shortest round-tripping form.
///
/// Minified output drops the leading zero of fractions (`.5`, `-.25`).
pub fn format_number(value: f32, minify: bool) -> String {
    let value = if value == 0.0 {
        0.0
    } else if value.is_infinite() {
        f32::MAX.copysign(value)
    } else {
        value
    };
    let text = value.to_string();
    if !minify {
        return text;
    }
    if let Some(rest) = text.strip_prefix("0.") {
        format!(".{rest}")
    } else if let Some(rest) = text.strip_prefix("-0.") {
        format!("-.{rest}")
    } else {
        text
    }
}

/// Serialize a dimension unit so it does not merge into the number.
///
/// A unit like `e3` would read back as an exponent, so its first letter is
/// escaped.
pub fn serialize_unit(unit: &str) -> String {
    let mut chars = unit.chars();
    let first = chars.next();
    let rest = chars.as_str();
    let looks_like_exponent = matches!(first, Some('e' | 'E'))
        && (rest.starts_with(|c: char| c.is_ascii_digit())
            || ((rest.starts_with('-') || rest.starts_with('+'))
                && rest[1..].starts_with(|c: char| c.is_ascii_digit())));
    if looks_like_exponent {
        let first = first.map(|c| c as u32).unwrap_or_default();
        return format!("\\{first:x} {}", serialize_name(rest));
    }
    serialize_identifier(unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0, false), "1");
        assert_eq!(format_number(0.5, false), "0.5");
        assert_eq!(format_number(0.5, true), ".5");
        assert_eq!(format_number(-0.25, true), "-.25");
        assert_eq!(format_number(-0.0, true), "0");
        assert_eq!(format_number(0.1, true), ".1");
        assert_eq!(format_number(100.0, true), "100");
        assert_eq!(format_number(1.5, true), "1.5");
    }

    #[test]
    fn test_serialize_unit() {
        assert_eq!(serialize_unit("px"), "px");
        assert_eq!(serialize_unit("em"), "em");
        assert_eq!(serialize_unit("e3"), "\\65 3");
        assert_eq!(serialize_unit("e-x"), "e-x");
    }
}
