#![doc = include_str!("../README.md")]

mod compat;
mod custom_media;
mod declaration;
mod dependencies;
mod error;
mod fallbacks;
mod media_query;
mod nesting;
mod options;
mod parser;
mod printer;
mod properties;
mod selector;
mod stylesheet;
mod transform;
mod unused;
mod vendor_prefix;

pub mod css_modules;
pub mod rules;
pub mod targets;
pub mod values;
pub mod visitor;

pub use compat::{Feature, Prefixed};
pub use css_modules::{
    CssModuleExport, CssModuleExports, CssModuleReference, CssModuleReferences, CssModulesConfig,
};
pub use declaration::{Declaration, DeclarationBlock, PropertyId};
pub use dependencies::{Dependency, DependencyLocation};
pub use error::{
    CssError, ErrorKind, ErrorLocation, ModuleErrorKind, ParseErrorKind, TransformErrorKind,
};
pub use media_query::{MediaCondition, MediaFeature, MediaList, MediaQuery};
pub use options::{ParseOptions, PrintOptions, PrintResult, TransformOptions};
pub use printer::{Printer, ToCss};
pub use selector::{Combinator, Component, PseudoClass, PseudoElement, Selector, SelectorList};
pub use stylesheet::StyleSheet;
pub use targets::{Browser, Browsers};
pub use tincture_tokenizer::Location;
pub use vendor_prefix::VendorPrefix;

/// Parse `source` into a stylesheet.
pub fn parse(source: &str, options: ParseOptions) -> Result<StyleSheet, CssError> {
    StyleSheet::parse(source, options)
}

/// Rewrite `sheet` in place for `options.targets` and run the elimination,
/// CSS Modules and dependency passes. On error `sheet` is left unchanged.
pub fn transform(sheet: &mut StyleSheet, options: &TransformOptions) -> Result<(), CssError> {
    transform::transform(sheet, options)
}

/// Serialize `sheet`.
pub fn print(sheet: &StyleSheet, options: &PrintOptions) -> Result<PrintResult, CssError> {
    sheet.to_css(options)
}

/// Resolve a target query such as `chrome 90, safari >= 13.1`.
pub fn targets_from_query(query: &str) -> Result<Browsers, CssError> {
    Browsers::from_query(query)
}
