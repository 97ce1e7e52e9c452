//! Options for each pipeline stage, and the printed result.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::css_modules::{CssModuleExports, CssModuleReferences, CssModulesConfig};
use crate::dependencies::Dependency;
use crate::targets::Browsers;

/// Options for [`parse`](crate::parse).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParseOptions {
    /// Name used in diagnostics, source maps and CSS Modules hashes
    /// (default: "style.css")
    pub filename: String,

    /// Enable CSS Modules scoping (default: off)
    pub css_modules: Option<CssModulesConfig>,

    /// Skip malformed declarations and rules instead of failing (default: false)
    pub error_recovery: bool,

    /// Parse `@custom-media` definitions; the transform substitutes them
    /// into `@media` queries (default: false)
    pub custom_media: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            filename: "style.css".to_string(),
            css_modules: None,
            error_recovery: false,
            custom_media: false,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Enable CSS Modules with `config`.
    pub fn css_modules(mut self, config: CssModulesConfig) -> Self {
        self.css_modules = Some(config);
        self
    }

    /// Recover from malformed input, collecting warnings on the stylesheet.
    pub fn error_recovery(mut self, enabled: bool) -> Self {
        self.error_recovery = enabled;
        self
    }

    /// Recognize `@custom-media` rules.
    pub fn custom_media(mut self, enabled: bool) -> Self {
        self.custom_media = enabled;
        self
    }
}

/// Options for [`transform`](crate::transform).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformOptions {
    /// Engines to stay compatible with. Empty means no rewriting.
    pub targets: Browsers,

    /// Class, id and keyframes names to remove.
    pub unused_symbols: HashSet<String>,

    /// Replace `url()` and `@import` URLs with placeholders and report them.
    pub analyze_dependencies: bool,
}

impl TransformOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn targets(mut self, targets: Browsers) -> Self {
        self.targets = targets;
        self
    }

    /// Add names to remove.
    pub fn unused_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unused_symbols.extend(symbols.into_iter().map(Into::into));
        self
    }

    pub fn analyze_dependencies(mut self, enabled: bool) -> Self {
        self.analyze_dependencies = enabled;
        self
    }
}

/// Options for [`print`](crate::print).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrintOptions {
    /// Omit optional whitespace and merge rules (default: false)
    pub minify: bool,

    /// Produce a source map (default: false)
    pub source_map: bool,

    /// Pseudo-class names to print as classes, `hover` to `is-hovered`.
    pub pseudo_classes: BTreeMap<String, String>,
}

impl PrintOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn minify(mut self, enabled: bool) -> Self {
        self.minify = enabled;
        self
    }

    pub fn source_map(mut self, enabled: bool) -> Self {
        self.source_map = enabled;
        self
    }

    /// Print `:pseudo` as `.class`.
    pub fn pseudo_class(mut self, pseudo: impl Into<String>, class: impl Into<String>) -> Self {
        self.pseudo_classes.insert(pseudo.into(), class.into());
        self
    }
}

/// Printed CSS plus everything the transform collected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintResult {
    pub code: String,
    /// Source map v3 JSON.
    pub map: Option<String>,
    /// Present when CSS Modules are enabled.
    pub exports: Option<CssModuleExports>,
    /// Placeholder to cross-file reference.
    pub references: CssModuleReferences,
    pub dependencies: Vec<Dependency>,
}
