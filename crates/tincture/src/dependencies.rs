//! Dependency analysis: `url()` values and `@import` rules.
//!
//! Each dependency is replaced in the output by a placeholder so a bundler
//! can substitute the final URL after resolving it.

use std::convert::Infallible;

use serde::Serialize;
use tincture_tokenizer::Location;
use tracing::debug;

use crate::rules::{CssRule, CssRuleList};
use crate::values::{ComponentValue, TokenList};
use crate::visitor::{VisitMut, walk_rule};

/// A file the stylesheet depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Dependency {
    /// A `url()` value.
    Url {
        url: String,
        placeholder: String,
        loc: DependencyLocation,
    },
    /// An `@import` rule.
    Import {
        url: String,
        placeholder: String,
        loc: DependencyLocation,
    },
}

/// One-based source position of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DependencyLocation {
    pub line: u32,
    pub column: u32,
}

impl From<Location> for DependencyLocation {
    fn from(loc: Location) -> Self {
        Self {
            line: loc.line + 1,
            column: loc.column + 1,
        }
    }
}

impl Dependency {
    pub fn url(&self) -> &str {
        match self {
            Dependency::Url { url, .. } | Dependency::Import { url, .. } => url,
        }
    }

    pub fn placeholder(&self) -> &str {
        match self {
            Dependency::Url { placeholder, .. } | Dependency::Import { placeholder, .. } => {
                placeholder
            }
        }
    }
}

/// The placeholder standing in for `url` in `filename`.
fn placeholder(filename: &str, url: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(filename.as_bytes());
    hasher.update(b"\0");
    hasher.update(url.as_bytes());
    hasher.finalize().to_hex()[..8].to_string()
}

/// Inline data and same-document fragments are not files.
fn is_dependency(url: &str) -> bool {
    !(url.is_empty() || url.starts_with('#') || url.get(..5).is_some_and(|s| s.eq_ignore_ascii_case("data:")))
}

/// Replace every dependency URL in `rules` with a placeholder.
pub(crate) fn collect_dependencies(rules: &mut CssRuleList, filename: &str) -> Vec<Dependency> {
    let mut collector = Collector {
        filename,
        dependencies: Vec::new(),
    };
    if let Err(never) = collector.visit_rule_list(rules) {
        match never {}
    }
    collector.dependencies
}

struct Collector<'a> {
    filename: &'a str,
    dependencies: Vec<Dependency>,
}

impl VisitMut for Collector<'_> {
    type Error = Infallible;

    fn visit_rule(&mut self, rule: &mut CssRule) -> Result<(), Infallible> {
        if let CssRule::Import(import) = rule {
            let placeholder = placeholder(self.filename, &import.url);
            debug!(url = %import.url, %placeholder, "import dependency");
            self.dependencies.push(Dependency::Import {
                url: std::mem::replace(&mut import.url, placeholder.clone()),
                placeholder,
                loc: import.loc.into(),
            });
            return Ok(());
        }
        walk_rule(self, rule)
    }

    fn visit_value(&mut self, value: &mut TokenList) -> Result<(), Infallible> {
        value.for_each_mut(&mut |component| {
            if let ComponentValue::Url(url) = component
                && is_dependency(&url.url)
            {
                let placeholder = placeholder(self.filename, &url.url);
                debug!(url = %url.url, %placeholder, "url dependency");
                self.dependencies.push(Dependency::Url {
                    url: std::mem::replace(&mut url.url, placeholder.clone()),
                    placeholder,
                    loc: url.loc.into(),
                });
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Locator, ParserFlags, parse_stylesheet};
    use crate::printer::ToCss;

    fn collect(source: &str) -> (String, Vec<Dependency>) {
        let locator = Locator::new("app.css", source);
        let (mut rules, _) = parse_stylesheet(&locator, ParserFlags::default()).unwrap();
        let dependencies = collect_dependencies(&mut rules, "app.css");
        (rules.to_css_string(), dependencies)
    }

    #[test]
    fn test_urls_and_imports() {
        let (code, dependencies) =
            collect("@import \"base.css\";\n.a { background: url(img.png) }");
        assert_eq!(dependencies.len(), 2);
        assert!(matches!(&dependencies[0], Dependency::Import { url, .. } if url == "base.css"));
        assert!(matches!(&dependencies[1], Dependency::Url { url, .. } if url == "img.png"));
        assert_eq!(
            dependencies[1].clone(),
            Dependency::Url {
                url: "img.png".to_string(),
                placeholder: dependencies[1].placeholder().to_string(),
                loc: DependencyLocation { line: 2, column: 18 },
            }
        );
        for dependency in &dependencies {
            assert!(code.contains(dependency.placeholder()));
            assert!(!code.contains(dependency.url()));
        }
    }

    #[test]
    fn test_placeholders_are_stable() {
        let (_, first) = collect(".a { background: url(a.png) } .b { background: url(a.png) }");
        let (_, second) = collect(".c { background: url(a.png) }");
        assert_eq!(first[0].placeholder(), first[1].placeholder());
        assert_eq!(first[0].placeholder(), second[0].placeholder());
        assert_eq!(first[0].placeholder().len(), 8);
    }

    #[test]
    fn test_data_urls_are_skipped() {
        let (code, dependencies) = collect(".a { background: url(\"data:image/png;base64,AAAA\") }");
        assert!(dependencies.is_empty());
        assert!(code.contains("data:image/png"));
    }

    #[test]
    fn test_serialization() {
        let dependency = Dependency::Import {
            url: "x.css".to_string(),
            placeholder: "abc".to_string(),
            loc: DependencyLocation { line: 1, column: 1 },
        };
        assert_eq!(
            serde_json::to_string(&dependency).unwrap(),
            r#"{"type":"import","url":"x.css","placeholder":"abc","loc":{"line":1,"column":1}}"#
        );
    }
}
