//! Declarations and declaration blocks.

use std::fmt;

use tincture_tokenizer::Location;

use crate::printer::{Printer, ToCss};
use crate::properties::minify_declarations;
use crate::values::TokenList;
use crate::vendor_prefix::VendorPrefix;

/// The property a declaration sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyId {
    /// A standard property: lowercase name without its prefix.
    Standard { name: String, prefix: VendorPrefix },
    /// `--name`, case-sensitive.
    Custom(String),
}

impl PropertyId {
    /// Classify a property name as written.
    pub fn parse(name: &str) -> PropertyId {
        if name.starts_with("--") {
            return PropertyId::Custom(name.to_string());
        }
        let lower = name.to_ascii_lowercase();
        let (prefix, unprefixed) = VendorPrefix::strip(&lower);
        PropertyId::Standard {
            name: unprefixed.to_string(),
            prefix,
        }
    }

    /// A standard, unprefixed property.
    pub fn standard(name: &str) -> PropertyId {
        PropertyId::Standard {
            name: name.to_string(),
            prefix: VendorPrefix::empty(),
        }
    }

    /// The unprefixed name.
    pub fn name(&self) -> &str {
        match self {
            PropertyId::Standard { name, .. } | PropertyId::Custom(name) => name,
        }
    }

    pub fn prefix(&self) -> VendorPrefix {
        match self {
            PropertyId::Standard { prefix, .. } => *prefix,
            PropertyId::Custom(_) => VendorPrefix::empty(),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, PropertyId::Custom(_))
    }

    /// The same property with a different prefix.
    pub fn with_prefix(&self, prefix: VendorPrefix) -> PropertyId {
        match self {
            PropertyId::Standard { name, .. } => PropertyId::Standard {
                name: name.clone(),
                prefix,
            },
            PropertyId::Custom(name) => PropertyId::Custom(name.clone()),
        }
    }
}

/// `property: value [!important]`
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: PropertyId,
    pub value: TokenList,
    pub important: bool,
    pub loc: Location,
}

impl Declaration {
    /// Equal apart from source location.
    pub fn same_content(&self, other: &Declaration) -> bool {
        self.property == other.property
            && self.important == other.important
            && self.value == other.value
    }
}

/// An ordered list of declarations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeclarationBlock {
    pub declarations: Vec<Declaration>,
}

impl DeclarationBlock {
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Equal apart from source locations.
    pub fn same_content(&self, other: &DeclarationBlock) -> bool {
        self.declarations.len() == other.declarations.len()
            && self
                .declarations
                .iter()
                .zip(&other.declarations)
                .all(|(a, b)| a.same_content(b))
    }

    /// Write each declaration on its own line. The trailing `;` is omitted
    /// when minifying unless `more_follows`.
    ///
    /// Minified output drops overridden declarations and shortens box
    /// shorthands first.
    pub(crate) fn write_body(&self, dest: &mut Printer<'_>, more_follows: bool) -> fmt::Result {
        let minified;
        let declarations = if dest.minify {
            minified = minify_declarations(&self.declarations);
            &minified
        } else {
            &self.declarations
        };
        let count = declarations.len();
        for (i, declaration) in declarations.iter().enumerate() {
            dest.newline()?;
            declaration.to_css(dest)?;
            if !dest.minify || i + 1 < count || more_follows {
                dest.write_char(';')?;
            }
        }
        Ok(())
    }
}

impl ToCss for PropertyId {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        match self {
            PropertyId::Standard { name, prefix } => {
                dest.write_str(prefix.as_str())?;
                dest.write_ident(name)
            }
            PropertyId::Custom(name) => dest.write_ident(name),
        }
    }
}

impl ToCss for Declaration {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.add_mapping(self.loc);
        self.property.to_css(dest)?;
        dest.write_char(':')?;
        if !self.value.is_empty() {
            dest.whitespace()?;
            self.value.to_css(dest)?;
        }
        if self.important {
            dest.whitespace()?;
            dest.write_str("!important")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::ComponentValue;

    #[test]
    fn test_property_id() {
        assert_eq!(
            PropertyId::parse("-WebKit-User-Select"),
            PropertyId::Standard {
                name: "user-select".to_string(),
                prefix: VendorPrefix::WEBKIT
            }
        );
        assert_eq!(
            PropertyId::parse("--Main"),
            PropertyId::Custom("--Main".to_string())
        );
        assert_eq!(PropertyId::parse("color").name(), "color");
    }

    #[test]
    fn test_declaration_printing() {
        let declaration = Declaration {
            property: PropertyId::standard("user-select").with_prefix(VendorPrefix::MOZ),
            value: TokenList(vec![ComponentValue::Ident("none".to_string())]),
            important: true,
            loc: Location::default(),
        };
        assert_eq!(
            declaration.to_css_string(),
            "-moz-user-select: none !important"
        );
    }

    #[test]
    fn test_same_content_ignores_location() {
        let a = Declaration {
            property: PropertyId::standard("color"),
            value: TokenList(vec![ComponentValue::Ident("red".to_string())]),
            important: false,
            loc: Location::new(0, 0),
        };
        let b = Declaration {
            loc: Location::new(3, 4),
            ..a.clone()
        };
        assert!(a.same_content(&b));
        assert_ne!(a, b);
    }
}
