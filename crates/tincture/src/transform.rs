//! The transform pipeline.
//!
//! Passes run in a fixed order over the whole tree: custom media, nesting,
//! declaration fallbacks, media range lowering, keyframes prefixing, unused-symbol
//! elimination, CSS Modules scoping and dependency collection. Every pass is a
//! no-op on input that is already compatible with the targets.

use std::convert::Infallible;

use tracing::debug;

use crate::compat::{Feature, Prefixed};
use crate::css_modules::scope_stylesheet;
use crate::custom_media::resolve_custom_media;
use crate::dependencies::collect_dependencies;
use crate::error::CssError;
use crate::fallbacks::Fallbacks;
use crate::nesting;
use crate::options::TransformOptions;
use crate::rules::{CssRule, CssRuleList, KeyframesRule};
use crate::stylesheet::StyleSheet;
use crate::unused::remove_unused;
use crate::vendor_prefix::VendorPrefix;
use crate::visitor::{VisitMut, walk_rule};

/// Rewrite `sheet` in place for `options.targets`, then apply the
/// elimination, scoping and dependency passes the options ask for.
///
/// The passes run on a copy of the rules; `sheet` is only updated once all
/// of them succeed.
pub fn transform(sheet: &mut StyleSheet, options: &TransformOptions) -> Result<(), CssError> {
    let targets = &options.targets;
    let mut rules = sheet.rules.clone();

    if sheet.custom_media {
        resolve_custom_media(&mut rules, &sheet.filename)?;
    }

    if Feature::Nesting.is_compatible(targets) {
        nesting::validate(&rules, &sheet.filename)?;
    } else {
        debug!("targets lack nesting support, flattening");
        nesting::flatten(&mut rules, &sheet.filename)?;
    }

    if let Err(never) = Fallbacks::new(targets).visit_rule_list(&mut rules) {
        match never {}
    }

    if !Feature::MediaRangeSyntax.is_compatible(targets)
        && let Err(never) = MediaRanges.visit_rule_list(&mut rules)
    {
        match never {}
    }

    if Prefixed::Keyframes
        .prefixes_for(targets)
        .contains(VendorPrefix::WEBKIT)
    {
        prefix_keyframes(&mut rules);
    }

    remove_unused(&mut rules, &options.unused_symbols);

    let scoped = match &sheet.css_modules {
        Some(_) if sheet.exports.is_some() => {
            debug!("stylesheet already scoped");
            None
        }
        Some(config) => {
            let (exports, references) = scope_stylesheet(&mut rules, &sheet.filename, config)?;
            debug!(exports = exports.len(), references = references.len(), "scoped stylesheet");
            Some((exports, references))
        }
        None => None,
    };

    let dependencies = if options.analyze_dependencies {
        collect_dependencies(&mut rules, &sheet.filename)
    } else {
        Vec::new()
    };

    sheet.rules = rules;
    if let Some((exports, references)) = scoped {
        sheet.exports = Some(exports);
        sheet.references.extend(references);
    }
    sheet.dependencies.extend(dependencies);
    Ok(())
}

/// Lowers range syntax in `@media` and `@import` media queries.
struct MediaRanges;

impl VisitMut for MediaRanges {
    type Error = Infallible;

    fn visit_rule(&mut self, rule: &mut CssRule) -> Result<(), Infallible> {
        let media = match rule {
            CssRule::Media(rule) => Some(&mut rule.query),
            CssRule::Import(rule) => Some(&mut rule.media),
            _ => None,
        };
        if let Some(media) = media
            && media.has_range_syntax()
        {
            debug!("lowering media range syntax");
            for query in &mut media.0 {
                if let Some(condition) = &mut query.condition {
                    condition.lower_ranges();
                }
            }
        }
        walk_rule(self, rule)
    }
}

/// Put an `@-webkit-keyframes` copy in front of each unprefixed
/// `@keyframes` that does not have one yet.
fn prefix_keyframes(rules: &mut CssRuleList) {
    let mut out = Vec::with_capacity(rules.len());
    let existing: Vec<(VendorPrefix, String)> = rules
        .iter()
        .filter_map(|rule| match rule {
            CssRule::Keyframes(k) => Some((k.prefix, k.name.as_str().to_string())),
            _ => None,
        })
        .collect();

    for mut rule in std::mem::take(&mut rules.0) {
        match &mut rule {
            CssRule::Keyframes(keyframes) if keyframes.prefix.is_empty() => {
                let name = keyframes.name.as_str();
                let present = existing
                    .iter()
                    .any(|(prefix, n)| *prefix == VendorPrefix::WEBKIT && n == name);
                if !present {
                    debug!(name, "adding @-webkit-keyframes");
                    out.push(CssRule::Keyframes(KeyframesRule {
                        prefix: VendorPrefix::WEBKIT,
                        ..keyframes.clone()
                    }));
                }
            }
            CssRule::Media(media) => prefix_keyframes(&mut media.rules),
            CssRule::Supports(supports) => prefix_keyframes(&mut supports.rules),
            CssRule::LayerBlock(layer) => prefix_keyframes(&mut layer.rules),
            _ => {}
        }
        out.push(rule);
    }
    rules.0 = out;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css_modules::CssModulesConfig;
    use crate::error::{ErrorKind, ModuleErrorKind, TransformErrorKind};
    use crate::options::{ParseOptions, PrintOptions};
    use crate::targets::{Browser, Browsers, version};

    fn run(source: &str, options: &TransformOptions) -> String {
        let mut sheet = StyleSheet::parse(source, ParseOptions::default()).unwrap();
        transform(&mut sheet, options).unwrap();
        sheet.to_css(&PrintOptions::default()).unwrap().code
    }

    fn targets(browser: Browser, major: u8) -> TransformOptions {
        TransformOptions::new().targets(Browsers::default().with(browser, version(major, 0, 0)))
    }

    #[test]
    fn test_no_targets_is_identity() {
        let source = ".a {\n  color: red;\n\n  &:hover {\n    color: blue;\n  }\n}\n";
        assert_eq!(run(source, &TransformOptions::default()), source);
    }

    #[test]
    fn test_nesting_kept_for_modern_targets() {
        let source = ".a {\n  & .b {\n    color: red;\n  }\n}\n";
        assert_eq!(run(source, &targets(Browser::Chrome, 120)), source);
        assert_eq!(
            run(source, &targets(Browser::Chrome, 100)),
            ".a .b {\n  color: red;\n}\n"
        );
    }

    #[test]
    fn test_media_ranges() {
        insta::assert_snapshot!(run("@media (width >= 600px) { .a { color: red } }", &targets(Browser::Chrome, 90)), @r"
        @media (min-width: 600px) {
          .a {
            color: red;
          }
        }
        ");
    }

    #[test]
    fn test_webkit_keyframes() {
        let out = run(
            "@keyframes fade { from { opacity: 0 } to { opacity: 1 } }",
            &targets(Browser::Safari, 8),
        );
        assert!(out.starts_with("@-webkit-keyframes fade {"));
        assert!(out.contains("\n\n@keyframes fade {"));
        assert_eq!(run(&out, &targets(Browser::Safari, 8)), out);
    }

    #[test]
    fn test_transform_is_idempotent() {
        let options = targets(Browser::Safari, 8);
        let once = run(
            ".a { user-select: none; color: lab(50 10 10); position: sticky; .b { inset: 0 } }",
            &options,
        );
        assert_eq!(run(&once, &options), once);
    }

    #[test]
    fn test_unresolved_nesting_fails() {
        let mut sheet = StyleSheet::parse(".a { color: red }", ParseOptions::default()).unwrap();
        if let CssRule::Style(rule) = &mut sheet.rules.0[0] {
            rule.selectors.0[0].0.insert(0, crate::selector::Component::Nesting);
        }
        let err = transform(&mut sheet, &TransformOptions::default()).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::Transform(TransformErrorKind::UnresolvedNesting)
        );
    }

    #[test]
    fn test_failed_transform_leaves_sheet_unchanged() {
        let options = ParseOptions::new()
            .filename("a.css")
            .css_modules(CssModulesConfig::new().pattern("fixed"));
        let mut sheet = StyleSheet::parse(".a { .b { user-select: none } }", options).unwrap();
        let before = sheet.to_css(&PrintOptions::default()).unwrap().code;
        let targets = Browsers::default()
            .with(Browser::Chrome, version(100, 0, 0))
            .with(Browser::Safari, version(10, 0, 0));

        let err = transform(&mut sheet, &TransformOptions::new().targets(targets)).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::Module(ModuleErrorKind::NameCollision { .. })
        ));
        assert_eq!(sheet.to_css(&PrintOptions::default()).unwrap().code, before);
        assert!(sheet.exports.is_none());
        assert!(sheet.references.is_empty());
    }

    #[test]
    fn test_custom_media_runs_before_range_lowering() {
        let options = ParseOptions::new().custom_media(true);
        let mut sheet = StyleSheet::parse(
            "@custom-media --wide (width >= 600px); @media (--wide) { .a { color: red } }",
            options,
        )
        .unwrap();
        transform(&mut sheet, &targets(Browser::Chrome, 90)).unwrap();
        let code = sheet.to_css(&PrintOptions::default()).unwrap().code;
        assert!(code.starts_with("@media (min-width: 600px) {"), "{code}");
    }

    #[test]
    fn test_modules_are_scoped_once() {
        let options = ParseOptions::new()
            .filename("a.css")
            .css_modules(CssModulesConfig::new().pattern("[name]_[local]"));
        let mut sheet = StyleSheet::parse(".x { color: red }", options).unwrap();
        transform(&mut sheet, &TransformOptions::default()).unwrap();
        transform(&mut sheet, &TransformOptions::default()).unwrap();
        let result = sheet.to_css(&PrintOptions::default()).unwrap();
        assert_eq!(result.code, ".a_x {\n  color: red;\n}\n");
        assert_eq!(result.exports.unwrap()["x"].name, "a_x");
    }
}
