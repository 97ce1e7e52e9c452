//! CSS Modules: locally scoped class, id, keyframes and custom property names.
//!
//! Scoping runs after parsing and rewrites names in place. Each original name
//! becomes an entry in the export manifest, keyed by the name the author
//! wrote, so a bundler can map `styles.foo` to the generated class.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tincture_tokenizer::{Location, Span, is_name_char};
use tracing::debug;

use crate::declaration::{Declaration, PropertyId};
use crate::error::{CssError, ModuleErrorKind};
use crate::rules::{CssRule, CssRuleList, KeyframesName, KeyframesRule, StyleRule};
use crate::selector::{Component, PseudoClass, Selector, SelectorList};
use crate::values::{ComponentValue, Specifier, TokenList};
use crate::visitor::{VisitMut, walk_keyframes, walk_rule, walk_style_rule};

/// CSS Modules settings, captured when the stylesheet is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CssModulesConfig {
    /// Template for generated names. `[name]` is the file stem, `[local]` the
    /// original name and `[hash]` a hash of the filename.
    pub pattern: String,
    /// Scope custom property names as well.
    pub dashed_idents: bool,
}

impl Default for CssModulesConfig {
    fn default() -> Self {
        Self {
            pattern: "[hash]_[local]".to_string(),
            dashed_idents: false,
        }
    }
}

impl CssModulesConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the naming pattern.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Scope `--custom` properties and their `var()` references.
    pub fn dashed_idents(mut self, enabled: bool) -> Self {
        self.dashed_idents = enabled;
        self
    }
}

/// One `composes` group: `a b from "./x.css"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Composes {
    pub names: Vec<String>,
    pub from: Option<Specifier>,
    pub loc: Location,
    pub(crate) span: Span,
}

/// An exported name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CssModuleExport {
    /// The generated name.
    pub name: String,
    /// What this class composes, in source order.
    pub composes: Vec<CssModuleReference>,
    /// Whether another part of the stylesheet refers to this name, as
    /// `animation-name` does to keyframes.
    pub is_referenced: bool,
}

/// A name defined somewhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CssModuleReference {
    /// A class in the same file, by its generated name.
    Local { name: String },
    /// An unscoped class.
    Global { name: String },
    /// A name exported by another file.
    Dependency { name: String, specifier: String },
}

/// Original name to export.
pub type CssModuleExports = BTreeMap<String, CssModuleExport>;

/// Placeholder to the cross-file reference it stands for.
pub type CssModuleReferences = BTreeMap<String, CssModuleReference>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Name,
    Local,
    Hash,
}

/// A parsed naming pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Pattern {
    segments: Vec<Segment>,
}

impl Pattern {
    pub(crate) fn parse(input: &str) -> Result<Pattern, CssError> {
        let invalid = |detail: String| CssError::module(ModuleErrorKind::InvalidPattern(detail));
        if input.is_empty() {
            return Err(invalid("the pattern is empty".to_string()));
        }

        let mut segments = Vec::new();
        let mut rest = input;
        while !rest.is_empty() {
            match rest.find('[') {
                Some(0) => {
                    let end = rest
                        .find(']')
                        .ok_or_else(|| invalid(format!("unclosed `[` in `{input}`")))?;
                    segments.push(match &rest[1..end] {
                        "name" => Segment::Name,
                        "local" => Segment::Local,
                        "hash" => Segment::Hash,
                        other => return Err(invalid(format!("unknown placeholder `[{other}]`"))),
                    });
                    rest = &rest[end + 1..];
                }
                Some(start) => {
                    segments.push(Segment::Literal(rest[..start].to_string()));
                    rest = &rest[start..];
                }
                None => {
                    segments.push(Segment::Literal(rest.to_string()));
                    rest = "";
                }
            }
        }
        Ok(Pattern { segments })
    }

    fn write(&self, hash: &str, stem: &str, local: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Name => out.push_str(stem),
                Segment::Local => out.push_str(local),
                Segment::Hash => out.push_str(hash),
            }
        }
        out
    }
}

/// Hash of the filename used by `[hash]`.
fn file_hash(filename: &str) -> String {
    blake3::hash(filename.as_bytes()).to_hex()[..6].to_string()
}

/// The file name without extension, with characters an identifier cannot
/// hold unescaped replaced by `_`.
fn file_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|stem| {
            stem.to_string_lossy()
                .chars()
                .map(|c| if is_name_char(c) { c } else { '_' })
                .collect()
        })
        .unwrap_or_default()
}

/// Names that start like numbers are not identifiers.
fn make_identifier(mut name: String) -> String {
    let mut chars = name.chars();
    let invalid_start = match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('-') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        None => true,
        _ => false,
    };
    if invalid_start {
        name.insert(0, '_');
    }
    name
}

/// The scoped name `pattern` generates for `name` in `filename`.
///
/// Custom property names keep their `--` prefix.
pub fn generate_local_name(filename: &str, name: &str, pattern: &str) -> Result<String, CssError> {
    let pattern = Pattern::parse(pattern)?;
    Ok(Namer::new(filename, pattern).local(name))
}

struct Namer {
    pattern: Pattern,
    hash: String,
    stem: String,
}

impl Namer {
    fn new(filename: &str, pattern: Pattern) -> Self {
        Self {
            pattern,
            hash: file_hash(filename),
            stem: file_stem(filename),
        }
    }

    fn local(&self, name: &str) -> String {
        match name.strip_prefix("--") {
            Some(dashed) => format!("--{}", self.pattern.write(&self.hash, &self.stem, dashed)),
            None => make_identifier(self.pattern.write(&self.hash, &self.stem, name)),
        }
    }
}

/// Parse the value of a `composes` declaration into its groups.
pub(crate) fn parse_composes(
    value: &TokenList,
    loc: Location,
    span: Span,
) -> Result<Vec<Composes>, ModuleErrorKind> {
    let mut groups = Vec::new();
    for group in value.0.split(|v| *v == ComponentValue::Comma) {
        let items: Vec<&ComponentValue> = group
            .iter()
            .filter(|v| !matches!(v, ComponentValue::Whitespace))
            .collect();
        let from_index = items
            .iter()
            .position(|v| matches!(v, ComponentValue::Ident(i) if i.eq_ignore_ascii_case("from")));
        let (names, from) = match from_index {
            Some(index) => {
                let from = match &items[index + 1..] {
                    [ComponentValue::Ident(global)] if global.eq_ignore_ascii_case("global") => {
                        Specifier::Global
                    }
                    [ComponentValue::String(file)] => Specifier::File(file.clone()),
                    _ => {
                        return Err(ModuleErrorKind::InvalidComposes(
                            "expected `global` or a string after `from`".to_string(),
                        ));
                    }
                };
                (&items[..index], Some(from))
            }
            None => (&items[..], None),
        };
        if names.is_empty() {
            return Err(ModuleErrorKind::InvalidComposes(
                "expected a class name".to_string(),
            ));
        }
        let names = names
            .iter()
            .map(|v| match v {
                ComponentValue::Ident(name) => Ok(name.clone()),
                other => Err(ModuleErrorKind::InvalidComposes(format!(
                    "expected a class name, found `{}`",
                    crate::printer::ToCss::to_css_string(*other)
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        groups.push(Composes {
            names,
            from,
            loc,
            span,
        });
    }
    Ok(groups)
}

/// Scope every local name in `rules`.
pub(crate) fn scope_stylesheet(
    rules: &mut CssRuleList,
    filename: &str,
    config: &CssModulesConfig,
) -> Result<(CssModuleExports, CssModuleReferences), CssError> {
    let mut scoper = Scoper {
        namer: Namer::new(filename, Pattern::parse(&config.pattern)?),
        filename,
        dashed_idents: config.dashed_idents,
        exports: CssModuleExports::new(),
        references: CssModuleReferences::new(),
        generated: BTreeMap::new(),
        classes: HashSet::new(),
        local_composes: Vec::new(),
    };
    scoper.visit_rule_list(rules)?;

    for (name, loc, span) in std::mem::take(&mut scoper.local_composes) {
        if !scoper.classes.contains(&name) {
            return Err(
                CssError::module(ModuleErrorKind::UnknownComposesTarget(name))
                    .with_location(filename, loc, span),
            );
        }
    }
    Ok((scoper.exports, scoper.references))
}

struct Scoper<'a> {
    namer: Namer,
    filename: &'a str,
    dashed_idents: bool,
    exports: CssModuleExports,
    references: CssModuleReferences,
    /// Generated name to the original that produced it.
    generated: BTreeMap<String, String>,
    /// Original class names defined by selectors.
    classes: HashSet<String>,
    /// Same-file `composes` targets, checked once every class is known.
    local_composes: Vec<(String, Location, Span)>,
}

impl Scoper<'_> {
    /// Scope `name`, registering it in the export manifest.
    fn scope(&mut self, name: &str) -> Result<String, CssError> {
        if let Some(export) = self.exports.get(name) {
            return Ok(export.name.clone());
        }
        let local = self.namer.local(name);
        if let Some(first) = self.generated.get(&local) {
            return Err(CssError::module(ModuleErrorKind::NameCollision {
                first: first.clone(),
                second: name.to_string(),
                local,
            }));
        }
        debug!(original = name, local = %local, "scoped name");
        self.generated.insert(local.clone(), name.to_string());
        self.exports.insert(
            name.to_string(),
            CssModuleExport {
                name: local.clone(),
                composes: Vec::new(),
                is_referenced: false,
            },
        );
        Ok(local)
    }

    fn scope_referenced(&mut self, name: &str) -> Result<String, CssError> {
        let local = self.scope(name)?;
        if let Some(export) = self.exports.get_mut(name) {
            export.is_referenced = true;
        }
        Ok(local)
    }

    fn scope_selector(&mut self, selector: &mut Selector) -> Result<(), CssError> {
        for component in &mut selector.0 {
            match component {
                Component::Class(name) => {
                    self.classes.insert(name.clone());
                    *name = self.scope(name)?;
                }
                Component::Id(name) => *name = self.scope(name)?,
                Component::PseudoClass(PseudoClass::Selectors { selectors, .. }) => {
                    for inner in &mut selectors.0 {
                        self.scope_selector(inner)?;
                    }
                }
                Component::Global(_) => {}
                Component::Combinator(_)
                | Component::Universal
                | Component::Type(_)
                | Component::Attribute(_)
                | Component::PseudoClass(_)
                | Component::PseudoElement(_)
                | Component::Nesting => {}
            }
        }
        Ok(())
    }

    /// Attach `rule.composes` to each class the rule defines.
    fn compose(&mut self, rule: &StyleRule) -> Result<(), CssError> {
        let Some(first) = rule.composes.first() else {
            return Ok(());
        };
        let classes = rule
            .selectors
            .iter()
            .map(|selector| selector.as_single_class().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                CssError::module(ModuleErrorKind::ComposesNotAllowed).with_location(
                    self.filename,
                    first.loc,
                    first.span,
                )
            })?;

        let mut references = Vec::new();
        for composes in &rule.composes {
            for name in &composes.names {
                references.push(match &composes.from {
                    None => {
                        self.local_composes
                            .push((name.clone(), composes.loc, composes.span));
                        CssModuleReference::Local {
                            name: self.namer.local(name),
                        }
                    }
                    Some(Specifier::Global) => CssModuleReference::Global { name: name.clone() },
                    Some(Specifier::File(file)) => CssModuleReference::Dependency {
                        name: name.clone(),
                        specifier: file.clone(),
                    },
                });
            }
        }

        for class in classes {
            self.scope(&class)?;
            if let Some(export) = self.exports.get_mut(&class) {
                export.composes.extend(references.iter().cloned());
            }
        }
        Ok(())
    }

    /// Rename keyframes references in `animation` and `animation-name`.
    fn scope_animation_names(&mut self, declaration: &mut Declaration) -> Result<(), CssError> {
        let PropertyId::Standard { name, .. } = &declaration.property else {
            return Ok(());
        };
        let shorthand = match name.as_str() {
            "animation" => true,
            "animation-name" => false,
            _ => return Ok(()),
        };
        for value in &mut declaration.value.0 {
            if let ComponentValue::Ident(ident) = value
                && !is_animation_keyword(ident, shorthand)
            {
                *ident = self.scope_referenced(ident)?;
            }
        }
        Ok(())
    }
}

fn is_animation_keyword(ident: &str, shorthand: bool) -> bool {
    const NAME_KEYWORDS: &[&str] = &["none", "initial", "inherit", "unset", "revert", "revert-layer"];
    const SHORTHAND_KEYWORDS: &[&str] = &[
        "infinite",
        "normal",
        "reverse",
        "alternate",
        "alternate-reverse",
        "forwards",
        "backwards",
        "both",
        "running",
        "paused",
        "linear",
        "ease",
        "ease-in",
        "ease-out",
        "ease-in-out",
        "step-start",
        "step-end",
    ];
    let lower = ident.to_ascii_lowercase();
    NAME_KEYWORDS.contains(&lower.as_str())
        || (shorthand && SHORTHAND_KEYWORDS.contains(&lower.as_str()))
}

impl VisitMut for Scoper<'_> {
    type Error = CssError;

    fn visit_rule(&mut self, rule: &mut CssRule) -> Result<(), CssError> {
        if self.dashed_idents
            && let CssRule::Property(property) = rule
        {
            property.name = self.scope(&property.name)?;
        }
        walk_rule(self, rule)
    }

    fn visit_style_rule(&mut self, rule: &mut StyleRule) -> Result<(), CssError> {
        self.compose(rule)?;
        walk_style_rule(self, rule)
    }

    fn visit_selectors(&mut self, selectors: &mut SelectorList) -> Result<(), CssError> {
        for selector in &mut selectors.0 {
            self.scope_selector(selector)?;
        }
        Ok(())
    }

    fn visit_keyframes(&mut self, rule: &mut KeyframesRule) -> Result<(), CssError> {
        if let KeyframesName::Ident(name) = &mut rule.name {
            *name = self.scope(name)?;
        }
        walk_keyframes(self, rule)
    }

    fn visit_declaration(&mut self, declaration: &mut Declaration) -> Result<(), CssError> {
        if self.dashed_idents
            && let PropertyId::Custom(name) = &mut declaration.property
        {
            *name = self.scope(name)?;
        }
        self.scope_animation_names(declaration)?;
        self.visit_value(&mut declaration.value)
    }

    fn visit_value(&mut self, value: &mut TokenList) -> Result<(), CssError> {
        if !self.dashed_idents {
            return Ok(());
        }
        let mut result = Ok(());
        value.for_each_mut(&mut |component| {
            let ComponentValue::Var(var) = component else {
                return;
            };
            if result.is_err() {
                return;
            }
            match var.from.take() {
                None => match self.scope_referenced(&var.name) {
                    Ok(local) => var.name = local,
                    Err(error) => result = Err(error),
                },
                Some(Specifier::Global) => {}
                Some(Specifier::File(specifier)) => {
                    let key = format!("{}:{specifier}:{}", self.filename, var.name);
                    let placeholder = format!("--{}", &blake3::hash(key.as_bytes()).to_hex()[..8]);
                    debug!(name = %var.name, %specifier, %placeholder, "cross-file reference");
                    self.references.insert(
                        placeholder.clone(),
                        CssModuleReference::Dependency {
                            name: var.name.clone(),
                            specifier,
                        },
                    );
                    var.name = placeholder;
                }
            }
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::parser::{Locator, ParserFlags, parse_stylesheet};
    use crate::printer::ToCss;

    fn scoped(
        source: &str,
        config: &CssModulesConfig,
    ) -> Result<(String, CssModuleExports, CssModuleReferences), CssError> {
        let locator = Locator::new("/src/app.css", source);
        let flags = ParserFlags {
            css_modules: true,
            dashed_idents: config.dashed_idents,
            ..ParserFlags::default()
        };
        let (mut rules, _) = parse_stylesheet(&locator, flags)?;
        let (exports, references) = scope_stylesheet(&mut rules, "/src/app.css", config)?;
        Ok((rules.to_css_string(), exports, references))
    }

    #[test]
    fn test_pattern_parsing() {
        assert!(Pattern::parse("[name]__[local]--[hash]").is_ok());
        let err = Pattern::parse("[local]_[bogus]").unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::Module(ModuleErrorKind::InvalidPattern(
                "unknown placeholder `[bogus]`".into()
            ))
        );
        assert!(Pattern::parse("[local").is_err());
        assert!(Pattern::parse("").is_err());
    }

    #[test]
    fn test_local_names_are_deterministic() {
        let a = generate_local_name("/src/app.css", "foo", "[name]_[local]_[hash]").unwrap();
        let b = generate_local_name("/src/app.css", "foo", "[name]_[local]_[hash]").unwrap();
        let c = generate_local_name("/src/other.css", "foo", "[name]_[local]_[hash]").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("app_foo_"));
        assert_eq!(
            generate_local_name("x.css", "--color", "[local]-x").unwrap(),
            "--color-x"
        );
        assert_eq!(generate_local_name("x.css", "1", "[local]").unwrap(), "_1");
    }

    #[test]
    fn test_file_stem_is_a_valid_identifier() {
        assert_eq!(
            generate_local_name("/src/my file.css", "foo", "[name]_[local]").unwrap(),
            "my_file_foo"
        );
        assert_eq!(
            generate_local_name("a+b.module.css", "foo", "[name]_[local]").unwrap(),
            "a_b_module_foo"
        );
        assert_eq!(
            generate_local_name("9lives.css", "foo", "[name]_[local]").unwrap(),
            "_9lives_foo"
        );

        let config = CssModulesConfig::new().pattern("[name]_[local]");
        let locator = Locator::new("my file.css", ".foo { color: red }");
        let flags = ParserFlags {
            css_modules: true,
            ..ParserFlags::default()
        };
        let (mut rules, _) = parse_stylesheet(&locator, flags).unwrap();
        let (exports, _) = scope_stylesheet(&mut rules, "my file.css", &config).unwrap();
        assert_eq!(exports["foo"].name, "my_file_foo");
        assert_eq!(rules.to_css_string(), ".my_file_foo {
  color: red;
}");
    }

    #[test]
    fn test_global_mode_switch_is_not_scoped() {
        let config = CssModulesConfig::new().pattern("[name]_[local]");
        let (css, exports, _) = scoped(".x :global .a .b :local .c { color: red }", &config).unwrap();
        assert_eq!(css, ".app_x .a .b .app_c {
  color: red;
}");
        assert!(exports.contains_key("x"));
        assert!(exports.contains_key("c"));
        assert!(!exports.contains_key("a"));
        assert!(!exports.contains_key("b"));
    }

    #[test]
    fn test_classes_ids_and_keyframes_are_scoped() {
        let config = CssModulesConfig::new().pattern("[name]_[local]");
        let (css, exports, _) = scoped(
            ".foo #bar :global(.baz) { animation: fade 1s ease-in }
             :local(.qux) :not(.foo) { color: red }
             @keyframes fade { from { opacity: 0 } }",
            &config,
        )
        .unwrap();
        assert!(css.contains(".app_foo #app_bar .baz {"), "{css}");
        assert!(css.contains("animation: app_fade 1s ease-in"), "{css}");
        assert!(css.contains(".app_qux :not(.app_foo)"), "{css}");
        assert!(css.contains("@keyframes app_fade"), "{css}");
        assert_eq!(exports["foo"].name, "app_foo");
        assert!(exports["fade"].is_referenced);
        assert!(!exports["foo"].is_referenced);
        assert!(!exports.contains_key("baz"));
    }

    #[test]
    fn test_composes_references() {
        let config = CssModulesConfig::new().pattern("[local]_x");
        let (css, exports, _) = scoped(
            ".a { color: red }
             .b { composes: a; composes: c from global, d e from \"./d.css\"; color: blue }",
            &config,
        )
        .unwrap();
        assert!(!css.contains("composes"), "{css}");
        assert_eq!(
            exports["b"].composes,
            vec![
                CssModuleReference::Local { name: "a_x".into() },
                CssModuleReference::Global { name: "c".into() },
                CssModuleReference::Dependency {
                    name: "d".into(),
                    specifier: "./d.css".into()
                },
                CssModuleReference::Dependency {
                    name: "e".into(),
                    specifier: "./d.css".into()
                },
            ]
        );
    }

    #[test]
    fn test_composes_errors() {
        let config = CssModulesConfig::default();
        let err = scoped(".a .b { composes: c from global }", &config).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Module(ModuleErrorKind::ComposesNotAllowed));

        let err = scoped(".a { composes: missing }", &config).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::Module(ModuleErrorKind::UnknownComposesTarget("missing".into()))
        );

        let err = scoped(".a { composes: 12px }", &config).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::Module(ModuleErrorKind::InvalidComposes(_))
        ));
    }

    #[test]
    fn test_name_collision() {
        let config = CssModulesConfig::new().pattern("fixed");
        let err = scoped(".a { color: red } .b { color: blue }", &config).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::Module(ModuleErrorKind::NameCollision {
                first: "a".into(),
                second: "b".into(),
                local: "fixed".into(),
            })
        );
    }

    #[test]
    fn test_dashed_idents() {
        let config = CssModulesConfig::new()
            .pattern("[local]_m")
            .dashed_idents(true);
        let (css, exports, references) = scoped(
            ".a {
                --accent: red;
                color: var(--accent);
                background: var(--page from global);
                border-color: var(--line from \"./vars.css\");
            }",
            &config,
        )
        .unwrap();
        assert!(css.contains("--accent_m: red"), "{css}");
        assert!(css.contains("color: var(--accent_m)"), "{css}");
        assert!(css.contains("background: var(--page)"), "{css}");
        assert!(exports["--accent"].is_referenced);

        assert_eq!(references.len(), 1);
        let (placeholder, reference) = references.iter().next().unwrap();
        assert!(css.contains(&format!("border-color: var({placeholder})")), "{css}");
        assert_eq!(
            reference,
            &CssModuleReference::Dependency {
                name: "--line".into(),
                specifier: "./vars.css".into()
            }
        );
    }

    #[test]
    fn test_export_serialization() {
        let export = CssModuleExport {
            name: "x_a".into(),
            composes: vec![CssModuleReference::Global { name: "g".into() }],
            is_referenced: false,
        };
        insta::assert_snapshot!(
            serde_json::to_string(&export).unwrap(),
            @r#"{"name":"x_a","composes":[{"type":"global","name":"g"}],"isReferenced":false}"#
        );
    }
}
