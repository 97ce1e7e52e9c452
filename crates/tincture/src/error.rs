//! Error types for every pipeline stage, with ariadne rendering.

use ariadne::{Color, Label, Report, ReportKind, Source};
use serde::Serialize;
use tincture_tokenizer::{Location, Span};

/// An error produced by parsing, transforming, printing or target resolution.
///
/// Every stage either succeeds completely or returns exactly one `CssError`.
#[derive(Debug, Clone, PartialEq)]
pub struct CssError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Where it went wrong, when the error is tied to source text.
    pub loc: Option<ErrorLocation>,
}

/// Source position of an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorLocation {
    /// File the error occurred in.
    pub filename: String,
    /// Zero-based line.
    pub line: u32,
    /// Zero-based column.
    pub column: u32,
    /// Byte range of the offending text.
    #[serde(skip)]
    pub span: Span,
}

/// The error taxonomy, one variant per stage.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Malformed syntax.
    Parse(ParseErrorKind),
    /// CSS Modules configuration or reference errors.
    Module(ModuleErrorKind),
    /// Structural invariant violated during transformation.
    Transform(TransformErrorKind),
    /// A compatibility query could not be resolved.
    TargetResolution(String),
    /// Output could not be produced.
    Printer(String),
}

/// Parse error kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// A token that does not fit the grammar at this point.
    UnexpectedToken(String),
    /// Input ended inside a construct.
    UnexpectedEof,
    /// A block was never closed.
    UnclosedBlock,
    /// A declaration without a value.
    MissingValue {
        /// The property that has no value.
        property: String,
    },
    /// A declaration that is not `name: value`.
    InvalidDeclaration,
    /// A rule with an empty selector.
    ExpectedSelector,
    /// A selector that could not be parsed.
    InvalidSelector(String),
    /// `&` or `@nest` used where there is no enclosing style rule.
    InvalidNesting,
    /// An `@nest` selector that does not contain `&`.
    MissingNestingSelector,
    /// A media query that could not be parsed.
    InvalidMediaQuery,
    /// An at-rule prelude that does not fit the at-rule.
    InvalidAtRulePrelude(String),
    /// An at-rule that is not allowed in this context.
    AtRuleNotAllowed(String),
    /// A `@keyframes` block entry that is not a keyframe.
    InvalidKeyframe,
    /// A string interrupted by a newline.
    BadString,
    /// A malformed unquoted url.
    BadUrl,
}

/// CSS Modules error kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleErrorKind {
    /// The naming pattern contains an unknown placeholder.
    InvalidPattern(String),
    /// A `composes` value that could not be parsed.
    InvalidComposes(String),
    /// `composes` used in a rule whose selectors are not all single classes.
    ComposesNotAllowed,
    /// A local `composes` target that is not defined in the stylesheet.
    UnknownComposesTarget(String),
    /// A `var(... from ...)` reference that could not be parsed.
    InvalidReference(String),
    /// Two exported names that generate the same local name.
    NameCollision {
        /// The first exported name.
        first: String,
        /// The exported name that collided with it.
        second: String,
        /// The generated local name both map to.
        local: String,
    },
}

/// Transform error kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformErrorKind {
    /// A `&` selector with no enclosing style rule.
    UnresolvedNesting,
    /// `(--name)` with no `@custom-media --name`.
    UndefinedCustomMedia(String),
    /// A `@custom-media` definition that refers back to itself.
    CircularCustomMedia(String),
    /// A custom media query with a media type or several queries, used
    /// inside a larger condition.
    InvalidCustomMedia(String),
}

impl CssError {
    /// An error without a source location.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, loc: None }
    }

    /// Attach a source location.
    pub fn with_location(mut self, filename: &str, loc: Location, span: Span) -> Self {
        self.loc = Some(ErrorLocation {
            filename: filename.to_string(),
            line: loc.line,
            column: loc.column,
            span,
        });
        self
    }

    pub(crate) fn parse(kind: ParseErrorKind) -> Self {
        Self::new(ErrorKind::Parse(kind))
    }

    pub(crate) fn module(kind: ModuleErrorKind) -> Self {
        Self::new(ErrorKind::Module(kind))
    }

    pub(crate) fn transform(kind: TransformErrorKind) -> Self {
        Self::new(ErrorKind::Transform(kind))
    }

    pub(crate) fn target(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TargetResolution(message.into()))
    }

    pub(crate) fn printer(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Printer(message.into()))
    }

    /// The stage-level category name: `ParseError`, `ModuleError`, ...
    pub fn category(&self) -> &'static str {
        match self.kind {
            ErrorKind::Parse(_) => "ParseError",
            ErrorKind::Module(_) => "ModuleError",
            ErrorKind::Transform(_) => "TransformError",
            ErrorKind::TargetResolution(_) => "TargetResolutionError",
            ErrorKind::Printer(_) => "PrinterError",
        }
    }

    /// The human-readable reason, without location.
    pub fn message(&self) -> String {
        match &self.kind {
            ErrorKind::Parse(kind) => match kind {
                ParseErrorKind::UnexpectedToken(token) => format!("unexpected token {token}"),
                ParseErrorKind::UnexpectedEof => "unexpected end of input".to_string(),
                ParseErrorKind::UnclosedBlock => "unclosed block".to_string(),
                ParseErrorKind::MissingValue { property } => {
                    format!("missing value for property `{property}`")
                }
                ParseErrorKind::InvalidDeclaration => "invalid declaration".to_string(),
                ParseErrorKind::ExpectedSelector => "expected a selector".to_string(),
                ParseErrorKind::InvalidSelector(detail) => format!("invalid selector: {detail}"),
                ParseErrorKind::InvalidNesting => {
                    "nesting selector used outside of a style rule".to_string()
                }
                ParseErrorKind::MissingNestingSelector => {
                    "@nest selectors must contain `&`".to_string()
                }
                ParseErrorKind::InvalidMediaQuery => "invalid media query".to_string(),
                ParseErrorKind::InvalidAtRulePrelude(name) => {
                    format!("invalid prelude for @{name}")
                }
                ParseErrorKind::AtRuleNotAllowed(name) => {
                    format!("@{name} is not allowed here")
                }
                ParseErrorKind::InvalidKeyframe => "invalid keyframe selector".to_string(),
                ParseErrorKind::BadString => "unterminated string".to_string(),
                ParseErrorKind::BadUrl => "malformed url".to_string(),
            },
            ErrorKind::Module(kind) => match kind {
                ModuleErrorKind::InvalidPattern(detail) => {
                    format!("invalid CSS modules pattern: {detail}")
                }
                ModuleErrorKind::InvalidComposes(detail) => {
                    format!("invalid composes value: {detail}")
                }
                ModuleErrorKind::ComposesNotAllowed => {
                    "composes is only allowed in rules whose selectors are single classes"
                        .to_string()
                }
                ModuleErrorKind::UnknownComposesTarget(name) => {
                    format!("composes references undefined class `{name}`")
                }
                ModuleErrorKind::InvalidReference(detail) => {
                    format!("invalid cross-file reference: {detail}")
                }
                ModuleErrorKind::NameCollision {
                    first,
                    second,
                    local,
                } => format!("`{first}` and `{second}` both generate the local name `{local}`"),
            },
            ErrorKind::Transform(kind) => match kind {
                TransformErrorKind::UnresolvedNesting => {
                    "nesting selector `&` has no enclosing style rule".to_string()
                }
                TransformErrorKind::UndefinedCustomMedia(name) => {
                    format!("custom media query `{name}` is not defined")
                }
                TransformErrorKind::CircularCustomMedia(name) => {
                    format!("custom media query `{name}` refers to itself")
                }
                TransformErrorKind::InvalidCustomMedia(name) => {
                    format!("custom media query `{name}` cannot be used inside a condition")
                }
            },
            ErrorKind::TargetResolution(detail) => format!("invalid target query: {detail}"),
            ErrorKind::Printer(detail) => format!("could not print stylesheet: {detail}"),
        }
    }

    /// Render this error with ariadne against the source it came from.
    ///
    /// Errors without a location render as a single-line report.
    pub fn render(&self, source: &str) -> String {
        let mut output = Vec::new();
        self.write_report(source, &mut output);
        String::from_utf8(output).unwrap_or_else(|_| format!("{}", self))
    }

    /// Write the error report to a writer.
    pub fn write_report<W: std::io::Write>(&self, source: &str, writer: W) {
        let filename = self
            .loc
            .as_ref()
            .map(|loc| loc.filename.as_str())
            .unwrap_or("<input>");
        let range = self
            .loc
            .as_ref()
            .map(|loc| std::ops::Range::<usize>::from(loc.span))
            .unwrap_or(0..0);
        let range = range.start.min(source.len())..range.end.min(source.len());

        let mut report = Report::build(ReportKind::Error, (filename, range.clone()))
            .with_message(format!("{}: {}", self.category(), self.message()))
            .with_label(
                Label::new((filename, range))
                    .with_message(self.label())
                    .with_color(Color::Red),
            );
        if let Some(help) = self.help() {
            report = report.with_help(help);
        }
        let _ = report
            .finish()
            .write((filename, Source::from(source)), writer);
    }

    fn label(&self) -> &'static str {
        match &self.kind {
            ErrorKind::Parse(ParseErrorKind::MissingValue { .. }) => "value expected here",
            ErrorKind::Parse(ParseErrorKind::UnclosedBlock) => "block opened here",
            ErrorKind::Parse(ParseErrorKind::InvalidNesting) => "no enclosing style rule",
            ErrorKind::Parse(_) => "unexpected",
            ErrorKind::Module(_) => "in this rule",
            ErrorKind::Transform(_) => "cannot be resolved",
            ErrorKind::TargetResolution(_) | ErrorKind::Printer(_) => "here",
        }
    }

    fn help(&self) -> Option<&'static str> {
        match &self.kind {
            ErrorKind::Parse(ParseErrorKind::UnclosedBlock) => Some("add a closing '}'"),
            ErrorKind::Parse(ParseErrorKind::InvalidNesting) => {
                Some("`&` refers to the parent rule's selector; move this rule inside one")
            }
            ErrorKind::Module(ModuleErrorKind::InvalidPattern(_)) => {
                Some("patterns may only use [name], [local] and [hash]")
            }
            ErrorKind::Module(ModuleErrorKind::ComposesNotAllowed) => {
                Some("move composes into a rule like `.name { ... }`")
            }
            ErrorKind::Module(ModuleErrorKind::NameCollision { .. }) => {
                Some("include [local] in the naming pattern")
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for CssError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())?;
        if let Some(loc) = &self.loc {
            write!(f, " at {}:{}:{}", loc.filename, loc.line + 1, loc.column + 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for CssError {}

impl From<std::fmt::Error> for CssError {
    fn from(_: std::fmt::Error) -> Self {
        CssError::printer("formatter error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(rendered: &str) -> String {
        String::from_utf8(strip_ansi_escapes::strip(rendered)).unwrap()
    }

    #[test]
    fn test_display_with_location() {
        let err = CssError::parse(ParseErrorKind::MissingValue {
            property: "color".to_string(),
        })
        .with_location("a.css", Location::new(0, 11), Span::new(11, 12));
        assert_eq!(
            err.to_string(),
            "missing value for property `color` at a.css:1:12"
        );
        assert_eq!(err.category(), "ParseError");
    }

    #[test]
    fn test_display_without_location() {
        let err = CssError::target("unknown browser `netscape`");
        assert_eq!(
            err.to_string(),
            "invalid target query: unknown browser `netscape`"
        );
    }

    #[test]
    fn test_render_contains_message_and_source() {
        let source = ".foo{color:}";
        let err = CssError::parse(ParseErrorKind::MissingValue {
            property: "color".to_string(),
        })
        .with_location("test.css", Location::new(0, 11), Span::new(11, 12));
        let rendered = strip(&err.render(source));
        assert!(rendered.contains("ParseError: missing value for property `color`"));
        assert!(rendered.contains("test.css"));
        assert!(rendered.contains(".foo{color:}"));
    }

    #[test]
    fn test_render_without_location() {
        let err = CssError::transform(TransformErrorKind::UnresolvedNesting);
        let rendered = strip(&err.render(""));
        assert!(rendered.contains("TransformError"));
    }
}
