//! The stylesheet: parsed rules plus what the transform learns about them.

use tincture_sourcemap::SourceMap;
use tracing::debug;

use crate::css_modules::{CssModuleExports, CssModuleReferences, CssModulesConfig, Pattern};
use crate::dependencies::Dependency;
use crate::error::CssError;
use crate::options::{ParseOptions, PrintOptions, PrintResult, TransformOptions};
use crate::parser::{Locator, ParserFlags, parse_stylesheet};
use crate::printer::{Printer, ToCss};
use crate::rules::CssRuleList;

/// A parsed stylesheet.
#[derive(Debug, Clone)]
pub struct StyleSheet {
    pub filename: String,
    pub rules: CssRuleList,
    /// CSS Modules settings from parse time. `None` when modules are off.
    pub css_modules: Option<CssModulesConfig>,
    /// Errors skipped in lenient mode, in source order.
    pub warnings: Vec<CssError>,
    /// Filled in by the CSS Modules pass.
    pub exports: Option<CssModuleExports>,
    pub references: CssModuleReferences,
    /// Filled in when dependency analysis is on.
    pub dependencies: Vec<Dependency>,
    /// `@custom-media` was enabled at parse time.
    pub(crate) custom_media: bool,
    source: String,
}

impl StyleSheet {
    /// Parse `source`. Fails on the first syntax error unless
    /// `options.error_recovery` is set.
    pub fn parse(source: &str, options: ParseOptions) -> Result<StyleSheet, CssError> {
        if let Some(config) = &options.css_modules {
            Pattern::parse(&config.pattern)?;
        }
        let flags = ParserFlags {
            css_modules: options.css_modules.is_some(),
            dashed_idents: options
                .css_modules
                .as_ref()
                .is_some_and(|config| config.dashed_idents),
            error_recovery: options.error_recovery,
            custom_media: options.custom_media,
        };

        let locator = Locator::new(&options.filename, source);
        let (rules, warnings) = parse_stylesheet(&locator, flags)?;
        debug!(
            filename = %options.filename,
            rules = rules.len(),
            warnings = warnings.len(),
            "parsed stylesheet"
        );

        Ok(StyleSheet {
            filename: options.filename,
            rules,
            css_modules: options.css_modules,
            warnings,
            exports: None,
            references: CssModuleReferences::new(),
            dependencies: Vec::new(),
            custom_media: options.custom_media,
            source: source.to_string(),
        })
    }

    /// See [`crate::transform`].
    pub fn transform(&mut self, options: &TransformOptions) -> Result<(), CssError> {
        crate::transform::transform(self, options)
    }

    /// The source text this stylesheet was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Serialize the stylesheet. The tree is left as it is.
    pub fn to_css(&self, options: &PrintOptions) -> Result<PrintResult, CssError> {
        let mut source_map = options.source_map.then(SourceMap::new);
        let source_index = source_map.as_mut().map(|map| {
            let index = map.add_source(&self.filename);
            map.set_source_content(index, &self.source);
            index
        });

        let mut code = {
            let mut printer =
                Printer::new(options.minify, source_map.as_mut(), &options.pseudo_classes);
            if let Some(index) = source_index {
                printer.set_source_index(index);
            }
            self.rules.to_css(&mut printer)?;
            printer.finish()
        };
        if !options.minify && !code.is_empty() {
            code.push('\n');
        }

        let map = source_map
            .map(|map| map.to_json())
            .transpose()
            .map_err(|err| CssError::printer(err.to_string()))?;
        debug!(bytes = code.len(), minify = options.minify, "printed stylesheet");

        Ok(PrintResult {
            code,
            map,
            exports: self.exports.clone(),
            references: self.references.clone(),
            dependencies: self.dependencies.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ModuleErrorKind, ParseErrorKind};

    #[test]
    fn test_pretty_and_minified() {
        let sheet = StyleSheet::parse(
            ".a { color: red; margin: 0 }\n.b { color: blue }",
            ParseOptions::default(),
        )
        .unwrap();
        insta::assert_snapshot!(sheet.to_css(&PrintOptions::default()).unwrap().code, @r"
        .a {
          color: red;
          margin: 0;
        }

        .b {
          color: blue;
        }
        ");
        assert_eq!(
            sheet.to_css(&PrintOptions::new().minify(true)).unwrap().code,
            ".a{color:red;margin:0}.b{color:blue}"
        );
    }

    #[test]
    fn test_source_map() {
        let sheet = StyleSheet::parse(
            ".a {\n  color: red;\n}",
            ParseOptions::new().filename("in.css"),
        )
        .unwrap();
        let result = sheet.to_css(&PrintOptions::new().source_map(true)).unwrap();
        let map: serde_json::Value = serde_json::from_str(&result.map.unwrap()).unwrap();
        assert_eq!(map["version"], 3);
        assert_eq!(map["sources"][0], "in.css");
        assert_eq!(map["sourcesContent"][0], ".a {\n  color: red;\n}");
        assert!(!map["mappings"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pattern_fails_at_parse() {
        let options = ParseOptions::new().css_modules(CssModulesConfig::new().pattern("[nope]"));
        let err = StyleSheet::parse(".a {}", options).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::Module(ModuleErrorKind::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_lenient_mode_collects_warnings() {
        let source = ".a { color: ; margin: 0 }";
        let err = StyleSheet::parse(source, ParseOptions::default()).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::Parse(ParseErrorKind::MissingValue { .. })
        ));

        let sheet = StyleSheet::parse(source, ParseOptions::new().error_recovery(true)).unwrap();
        assert_eq!(sheet.warnings.len(), 1);
        assert_eq!(
            sheet.to_css(&PrintOptions::default()).unwrap().code,
            ".a {\n  margin: 0;\n}\n"
        );
    }

    #[test]
    fn test_empty_stylesheet() {
        let sheet = StyleSheet::parse("  /* nothing */ ", ParseOptions::default()).unwrap();
        assert_eq!(sheet.to_css(&PrintOptions::default()).unwrap().code, "");
    }
}
