//! Selectors.

use std::fmt;

use tincture_tokenizer::{Span, Token, TokenKind};

use crate::error::{CssError, ParseErrorKind};
use crate::parser::Locator;
use crate::printer::{Printer, ToCss, is_plain_identifier};

/// A comma-separated list of complex selectors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectorList(pub Vec<Selector>);

/// A complex selector: compounds joined by combinators, in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selector(pub Vec<Component>);

/// One simple selector or combinator.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Combinator(Combinator),
    /// `*`
    Universal,
    /// `div`
    Type(String),
    /// `.name`
    Class(String),
    /// `#name`
    Id(String),
    Attribute(AttributeSelector),
    PseudoClass(PseudoClass),
    PseudoElement(PseudoElement),
    /// `&`
    Nesting,
    /// `:global(...)` with CSS Modules; its names are never scoped.
    Global(Selector),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// whitespace
    Descendant,
    /// `>`
    Child,
    /// `+`
    NextSibling,
    /// `~`
    LaterSibling,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSelector {
    pub name: String,
    pub operation: Option<AttributeOperation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeOperation {
    pub operator: AttributeOperator,
    pub value: String,
    /// `i` or `s`
    pub case: Option<char>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeOperator {
    /// `=`
    Equal,
    /// `~=`
    Includes,
    /// `|=`
    DashMatch,
    /// `^=`
    Prefix,
    /// `$=`
    Suffix,
    /// `*=`
    Substring,
}

impl AttributeOperator {
    fn as_str(self) -> &'static str {
        match self {
            AttributeOperator::Equal => "=",
            AttributeOperator::Includes => "~=",
            AttributeOperator::DashMatch => "|=",
            AttributeOperator::Prefix => "^=",
            AttributeOperator::Suffix => "$=",
            AttributeOperator::Substring => "*=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PseudoClass {
    /// `:hover`
    Simple(String),
    /// `:not(.a, .b)`, `:is(...)`, `:where(...)`, `:has(...)`
    Selectors {
        name: String,
        selectors: SelectorList,
    },
    /// `:nth-child(2n+1)`, kept as normalized text.
    Arguments { name: String, arguments: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PseudoElement {
    /// `::before`
    Simple(String),
    /// `::part(label)`
    Arguments { name: String, arguments: String },
}

impl SelectorList {
    pub fn iter(&self) -> std::slice::Iter<'_, Selector> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Selector {
    /// Whether `&` appears anywhere, including inside pseudo-class arguments.
    pub fn has_nesting(&self) -> bool {
        self.0.iter().any(|component| match component {
            Component::Nesting => true,
            Component::PseudoClass(PseudoClass::Selectors { selectors, .. }) => {
                selectors.iter().any(Selector::has_nesting)
            }
            Component::Global(inner) => inner.has_nesting(),
            _ => false,
        })
    }

    /// Whether a vendor-prefixed pseudo-class or pseudo-element appears.
    ///
    /// Rules with such selectors must not be merged: an engine that does not
    /// know the prefix drops the whole rule.
    pub fn has_vendor_prefixed_pseudo(&self) -> bool {
        self.0.iter().any(|component| match component {
            Component::PseudoClass(PseudoClass::Simple(name))
            | Component::PseudoClass(PseudoClass::Arguments { name, .. })
            | Component::PseudoElement(PseudoElement::Simple(name))
            | Component::PseudoElement(PseudoElement::Arguments { name, .. }) => {
                name.starts_with('-')
            }
            Component::PseudoClass(PseudoClass::Selectors { name, selectors }) => {
                name.starts_with('-') || selectors.iter().any(Selector::has_vendor_prefixed_pseudo)
            }
            Component::Global(inner) => inner.has_vendor_prefixed_pseudo(),
            _ => false,
        })
    }

    /// The class name if this selector is exactly one class.
    pub fn as_single_class(&self) -> Option<&str> {
        match self.0.as_slice() {
            [Component::Class(name)] => Some(name),
            _ => None,
        }
    }

    /// Whether this selector can only match elements carrying one of
    /// `symbols` as a class or id.
    ///
    /// `:is(...)` and `:where(...)` count when every alternative does.
    /// Names inside `:global(...)`, `:not(...)` and other pseudo-class
    /// arguments do not.
    pub fn references_any(&self, symbols: &std::collections::HashSet<String>) -> bool {
        self.0.iter().any(|component| match component {
            Component::Class(name) | Component::Id(name) => symbols.contains(name),
            Component::PseudoClass(PseudoClass::Selectors { name, selectors })
                if matches!(
                    name.as_str(),
                    "is" | "where" | "matches" | "any" | "-webkit-any" | "-moz-any"
                ) =>
            {
                !selectors.is_empty() && selectors.iter().all(|s| s.references_any(symbols))
            }
            _ => false,
        })
    }

    /// Whether every engine in use understands this selector.
    ///
    /// Merging a rule into a list with a selector an engine rejects makes
    /// that engine drop the merged rule, so only these are merged.
    pub fn is_widely_supported(&self) -> bool {
        self.0.iter().all(|component| match component {
            Component::Combinator(_)
            | Component::Universal
            | Component::Type(_)
            | Component::Class(_)
            | Component::Id(_) => true,
            Component::Attribute(attribute) => attribute
                .operation
                .as_ref()
                .is_none_or(|operation| operation.case.is_none()),
            Component::PseudoClass(PseudoClass::Simple(name)) => matches!(
                name.as_str(),
                "active"
                    | "checked"
                    | "disabled"
                    | "empty"
                    | "enabled"
                    | "first-child"
                    | "first-of-type"
                    | "focus"
                    | "hover"
                    | "last-child"
                    | "last-of-type"
                    | "link"
                    | "only-child"
                    | "only-of-type"
                    | "root"
                    | "target"
                    | "visited"
                    | "before"
                    | "after"
                    | "first-line"
                    | "first-letter"
            ),
            Component::PseudoClass(PseudoClass::Arguments { name, .. }) => matches!(
                name.as_str(),
                "nth-child" | "nth-last-child" | "nth-of-type" | "nth-last-of-type" | "lang"
            ),
            Component::PseudoClass(PseudoClass::Selectors { name, selectors }) => {
                name == "not"
                    && selectors.iter().all(|inner| {
                        !inner.0.iter().any(|c| matches!(c, Component::Combinator(_)))
                            && inner.is_widely_supported()
                    })
            }
            Component::PseudoElement(PseudoElement::Simple(name)) => {
                matches!(name.as_str(), "before" | "after" | "first-line" | "first-letter")
            }
            Component::PseudoElement(PseudoElement::Arguments { .. }) => false,
            Component::Nesting => false,
            Component::Global(inner) => inner.is_widely_supported(),
        })
    }
}

/// What the selector parser accepts at the current position.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SelectorContext {
    /// `&` is legal.
    pub allow_nesting: bool,
    /// Selectors without `&` get an implicit leading `& `.
    pub implicit_nesting: bool,
    /// Every selector must contain `&` (`@nest`).
    pub require_nesting: bool,
    /// A leading combinator is allowed (`:has(> img)`).
    pub relative: bool,
    /// `:global(...)` and `:local(...)` are recognized.
    pub css_modules: bool,
}

impl SelectorContext {
    fn for_arguments(self, relative: bool) -> Self {
        Self {
            allow_nesting: self.allow_nesting,
            implicit_nesting: false,
            require_nesting: false,
            relative,
            css_modules: self.css_modules,
        }
    }
}

/// Parse a selector list from prelude tokens (comments removed).
pub(crate) fn parse_selector_list(
    tokens: &[Token<'_>],
    ctx: SelectorContext,
    locator: &Locator<'_>,
) -> Result<SelectorList, CssError> {
    let mut selectors = Vec::new();
    for part in split_top_level_commas(tokens) {
        let part = trim_whitespace(part);
        if part.is_empty() {
            let span = tokens.first().map(|t| t.span).unwrap_or_default();
            return Err(locator.error(ParseErrorKind::ExpectedSelector, span));
        }
        selectors.push(parse_selector(part, ctx, locator)?);
    }
    if selectors.is_empty() {
        let span = tokens.first().map(|t| t.span).unwrap_or_default();
        return Err(locator.error(ParseErrorKind::ExpectedSelector, span));
    }
    Ok(SelectorList(selectors))
}

pub(crate) fn split_top_level_commas<'a, 'src>(tokens: &'a [Token<'src>]) -> Vec<&'a [Token<'src>]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Function | TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                depth += 1
            }
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                depth = depth.saturating_sub(1)
            }
            TokenKind::Comma if depth == 0 => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if !tokens.is_empty() {
        parts.push(&tokens[start..]);
    }
    parts
}

pub(crate) fn trim_whitespace<'a, 'src>(mut tokens: &'a [Token<'src>]) -> &'a [Token<'src>] {
    while let [first, rest @ ..] = tokens
        && first.kind == TokenKind::Whitespace
    {
        tokens = rest;
    }
    while let [rest @ .., last] = tokens
        && last.kind == TokenKind::Whitespace
    {
        tokens = rest;
    }
    tokens
}

fn combinator_of(token: &Token<'_>) -> Option<Combinator> {
    match token.delim()? {
        '>' => Some(Combinator::Child),
        '+' => Some(Combinator::NextSibling),
        '~' => Some(Combinator::LaterSibling),
        _ => None,
    }
}

struct SelectorParser<'a, 'src> {
    tokens: &'a [Token<'src>],
    pos: usize,
    ctx: SelectorContext,
    locator: &'a Locator<'a>,
}

fn parse_selector(
    tokens: &[Token<'_>],
    ctx: SelectorContext,
    locator: &Locator<'_>,
) -> Result<Selector, CssError> {
    let mut parser = SelectorParser {
        tokens,
        pos: 0,
        ctx,
        locator,
    };
    let mut selector = parser.parse_complex()?;
    if ctx.css_modules {
        selector = resolve_scope_switches(selector, ctx, tokens, locator)?;
    }

    if selector.has_nesting() {
        if !ctx.allow_nesting {
            let span = tokens
                .iter()
                .find(|t| t.is_delim('&'))
                .map(|t| t.span)
                .unwrap_or_else(|| span_of(tokens));
            return Err(locator.error(ParseErrorKind::InvalidNesting, span));
        }
    } else if ctx.require_nesting {
        return Err(locator.error(ParseErrorKind::MissingNestingSelector, span_of(tokens)));
    } else if ctx.implicit_nesting {
        let mut components = vec![Component::Nesting];
        if !matches!(selector.0.first(), Some(Component::Combinator(_))) {
            components.push(Component::Combinator(Combinator::Descendant));
        }
        components.append(&mut selector.0);
        selector = Selector(components);
    }
    Ok(selector)
}

fn is_scope_switch(component: &Component) -> Option<bool> {
    match component {
        Component::PseudoClass(PseudoClass::Simple(name)) if name == "global" => Some(true),
        Component::PseudoClass(PseudoClass::Simple(name)) if name == "local" => Some(false),
        _ => None,
    }
}

/// Apply bare `:global` and `:local`: every simple selector after `:global`
/// and before the next `:local` is left unscoped.
fn resolve_scope_switches(
    selector: Selector,
    ctx: SelectorContext,
    tokens: &[Token<'_>],
    locator: &Locator<'_>,
) -> Result<Selector, CssError> {
    if !selector.0.iter().any(|c| is_scope_switch(c).is_some()) {
        return Ok(selector);
    }
    let invalid = |detail: &str| {
        locator.error(
            ParseErrorKind::InvalidSelector(detail.to_string()),
            span_of(tokens),
        )
    };

    let mut global = false;
    let mut out: Vec<Component> = Vec::with_capacity(selector.0.len());
    let mut components = selector.0.into_iter().peekable();
    while let Some(component) = components.next() {
        if let Some(switch) = is_scope_switch(&component) {
            global = switch;
            let standalone = matches!(out.last(), None | Some(Component::Combinator(_)));
            match components.peek() {
                None => return Err(invalid("expected a selector after :global or :local")),
                Some(Component::Combinator(Combinator::Descendant)) if standalone => {
                    components.next();
                }
                Some(Component::Combinator(_)) if standalone => {
                    if out.is_empty() && !ctx.relative {
                        return Err(invalid("selector cannot start with a combinator"));
                    }
                    if matches!(out.last(), Some(Component::Combinator(Combinator::Descendant))) {
                        out.pop();
                    }
                }
                _ => {}
            }
            continue;
        }
        match component {
            Component::Combinator(_) | Component::Global(_) => out.push(component),
            other if global => out.push(Component::Global(Selector(vec![other]))),
            other => out.push(other),
        }
    }
    Ok(Selector(out))
}

fn span_of(tokens: &[Token<'_>]) -> Span {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => first.span.extend(last.span),
        _ => Span::default(),
    }
}

impl<'a, 'src> SelectorParser<'a, 'src> {
    fn peek(&self) -> Option<&'a Token<'src>> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token<'src>> {
        self.tokens.get(self.pos + offset)
    }

    fn bump(&mut self) -> Option<&'a Token<'src>> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.peek().is_some_and(|t| t.kind == TokenKind::Whitespace) {
            self.pos += 1;
            skipped = true;
        }
        skipped
    }

    fn error(&self, detail: &str) -> CssError {
        let span = self
            .peek()
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_default();
        self.locator
            .error(ParseErrorKind::InvalidSelector(detail.to_string()), span)
    }

    fn parse_complex(&mut self) -> Result<Selector, CssError> {
        let mut components = Vec::new();
        self.skip_whitespace();

        if let Some(combinator) = self.peek().and_then(combinator_of) {
            if !(self.ctx.relative || self.ctx.implicit_nesting) {
                return Err(self.error("selector cannot start with a combinator"));
            }
            self.pos += 1;
            components.push(Component::Combinator(combinator));
            self.skip_whitespace();
        }

        loop {
            let before = components.len();
            self.parse_compound(&mut components)?;
            if components.len() == before {
                return Err(self.error("expected a simple selector"));
            }

            let had_whitespace = self.skip_whitespace();
            let Some(token) = self.peek() else {
                break;
            };
            if let Some(combinator) = combinator_of(token) {
                self.pos += 1;
                self.skip_whitespace();
                components.push(Component::Combinator(combinator));
            } else if had_whitespace {
                components.push(Component::Combinator(Combinator::Descendant));
            } else {
                return Err(self.error("unexpected token in selector"));
            }
        }
        Ok(Selector(components))
    }

    fn parse_compound(&mut self, components: &mut Vec<Component>) -> Result<(), CssError> {
        let start = components.len();
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Ident => {
                    if components.len() != start {
                        return Err(self.error("type selectors must come first"));
                    }
                    self.pos += 1;
                    components.push(Component::Type(token.name().into_owned()));
                }
                TokenKind::IdHash => {
                    self.pos += 1;
                    components.push(Component::Id(token.name().into_owned()));
                }
                TokenKind::Hash => return Err(self.error("invalid id selector")),
                TokenKind::LBracket => {
                    self.pos += 1;
                    let attribute = self.parse_attribute()?;
                    components.push(Component::Attribute(attribute));
                }
                TokenKind::Colon => {
                    self.pos += 1;
                    self.parse_pseudo(components)?;
                }
                TokenKind::Delim => match token.delim() {
                    Some('*') => {
                        if components.len() != start {
                            return Err(self.error("universal selectors must come first"));
                        }
                        self.pos += 1;
                        components.push(Component::Universal);
                    }
                    Some('&') => {
                        self.pos += 1;
                        components.push(Component::Nesting);
                    }
                    Some('.') => {
                        self.pos += 1;
                        match self.bump() {
                            Some(ident) if ident.kind == TokenKind::Ident => {
                                components.push(Component::Class(ident.name().into_owned()));
                            }
                            _ => return Err(self.error("expected a class name after '.'")),
                        }
                    }
                    _ => break,
                },
                _ => break,
            }
        }
        Ok(())
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector, CssError> {
        self.skip_whitespace();
        let name = match self.bump() {
            Some(token) if token.kind == TokenKind::Ident => token.name().into_owned(),
            _ => return Err(self.error("expected an attribute name")),
        };
        self.skip_whitespace();

        let operator = match self.peek() {
            Some(token) if token.kind == TokenKind::RBracket => {
                self.pos += 1;
                return Ok(AttributeSelector {
                    name,
                    operation: None,
                });
            }
            Some(token) if token.is_delim('=') => {
                self.pos += 1;
                AttributeOperator::Equal
            }
            Some(token)
                if self.peek_at(1).is_some_and(|next| next.is_delim('=')) =>
            {
                let operator = match token.delim() {
                    Some('~') => AttributeOperator::Includes,
                    Some('|') => AttributeOperator::DashMatch,
                    Some('^') => AttributeOperator::Prefix,
                    Some('$') => AttributeOperator::Suffix,
                    Some('*') => AttributeOperator::Substring,
                    _ => return Err(self.error("invalid attribute operator")),
                };
                self.pos += 2;
                operator
            }
            _ => return Err(self.error("invalid attribute selector")),
        };
        self.skip_whitespace();

        let value = match self.bump() {
            Some(token) if token.kind == TokenKind::Ident => token.name().into_owned(),
            Some(token) if token.kind == TokenKind::String => token.string_value().into_owned(),
            _ => return Err(self.error("expected an attribute value")),
        };
        self.skip_whitespace();

        let mut case = None;
        if let Some(token) = self.peek()
            && token.kind == TokenKind::Ident
        {
            let flag = token.name().to_ascii_lowercase();
            if flag != "i" && flag != "s" {
                return Err(self.error("invalid attribute case flag"));
            }
            case = flag.chars().next();
            self.pos += 1;
            self.skip_whitespace();
        }

        match self.bump() {
            Some(token) if token.kind == TokenKind::RBracket => Ok(AttributeSelector {
                name,
                operation: Some(AttributeOperation {
                    operator,
                    value,
                    case,
                }),
            }),
            _ => Err(self.error("expected ']'")),
        }
    }

    /// Tokens between a function token at `self.pos - 1` and its `)`.
    fn function_arguments(&mut self) -> Result<&'a [Token<'src>], CssError> {
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(token) = self.bump() {
            match token.kind {
                TokenKind::Function | TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(&self.tokens[start..self.pos - 1]);
                    }
                }
                _ => {}
            }
        }
        Err(self.error("unclosed parenthesis"))
    }

    fn parse_pseudo(&mut self, components: &mut Vec<Component>) -> Result<(), CssError> {
        let element = self.peek().is_some_and(|t| t.kind == TokenKind::Colon);
        if element {
            self.pos += 1;
        }
        let Some(token) = self.bump() else {
            return Err(self.error("expected a pseudo-class name"));
        };
        let name = token.name().to_ascii_lowercase();

        match token.kind {
            TokenKind::Ident if element => {
                components.push(Component::PseudoElement(PseudoElement::Simple(name)));
            }
            TokenKind::Ident => {
                components.push(Component::PseudoClass(PseudoClass::Simple(name)));
            }
            TokenKind::Function if element => {
                let arguments = normalized_text(self.function_arguments()?);
                components.push(Component::PseudoElement(PseudoElement::Arguments {
                    name,
                    arguments,
                }));
            }
            TokenKind::Function => {
                let arguments = self.function_arguments()?;
                let inner_ctx = self.ctx.for_arguments(false);
                match name.as_str() {
                    "global" if self.ctx.css_modules => {
                        let inner = parse_selector(trim_whitespace(arguments), inner_ctx, self.locator)?;
                        components.push(Component::Global(inner));
                    }
                    "local" if self.ctx.css_modules => {
                        let inner = parse_selector(trim_whitespace(arguments), inner_ctx, self.locator)?;
                        components.extend(inner.0);
                    }
                    "is" | "not" | "where" | "has" | "matches" | "any" | "-webkit-any"
                    | "-moz-any" | "host" | "host-context" => {
                        let ctx = self.ctx.for_arguments(name == "has");
                        let selectors = parse_selector_list(arguments, ctx, self.locator)?;
                        components.push(Component::PseudoClass(PseudoClass::Selectors {
                            name,
                            selectors,
                        }));
                    }
                    _ => {
                        components.push(Component::PseudoClass(PseudoClass::Arguments {
                            name,
                            arguments: normalized_text(arguments),
                        }));
                    }
                }
            }
            _ => return Err(self.error("expected a pseudo-class name")),
        }
        Ok(())
    }
}

/// Source text of `tokens` with whitespace runs collapsed and trimmed.
pub(crate) fn normalized_text(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    for token in trim_whitespace(tokens) {
        if token.kind == TokenKind::Whitespace {
            out.push(' ');
        } else {
            out.push_str(token.text);
        }
    }
    out
}

impl ToCss for SelectorList {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        for (i, selector) in self.0.iter().enumerate() {
            if i > 0 {
                dest.delim(',', false)?;
            }
            selector.to_css(dest)?;
        }
        Ok(())
    }
}

impl ToCss for Selector {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        let mut components = self.0.iter();
        // Relative selectors start with their combinator.
        if let Some(Component::Combinator(combinator)) = self.0.first()
            && *combinator != Combinator::Descendant
        {
            components.next();
            let c = match combinator {
                Combinator::Child => '>',
                Combinator::NextSibling => '+',
                _ => '~',
            };
            dest.write_char(c)?;
            dest.whitespace()?;
        }
        for component in components {
            component.to_css(dest)?;
        }
        Ok(())
    }
}

impl ToCss for Combinator {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        match self {
            Combinator::Descendant => dest.write_char(' '),
            Combinator::Child => dest.delim('>', true),
            Combinator::NextSibling => dest.delim('+', true),
            Combinator::LaterSibling => dest.delim('~', true),
        }
    }
}

impl ToCss for Component {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        match self {
            Component::Combinator(combinator) => combinator.to_css(dest),
            Component::Universal => dest.write_char('*'),
            Component::Type(name) => dest.write_ident(name),
            Component::Class(name) => {
                dest.write_char('.')?;
                dest.write_ident(name)
            }
            Component::Id(name) => {
                dest.write_char('#')?;
                dest.write_ident(name)
            }
            Component::Attribute(attribute) => {
                dest.write_char('[')?;
                dest.write_ident(&attribute.name)?;
                if let Some(operation) = &attribute.operation {
                    dest.write_str(operation.operator.as_str())?;
                    if is_plain_identifier(&operation.value) {
                        dest.write_str(&operation.value)?;
                    } else {
                        dest.write_string(&operation.value)?;
                    }
                    if let Some(case) = operation.case {
                        dest.write_char(' ')?;
                        dest.write_char(case)?;
                    }
                }
                dest.write_char(']')
            }
            Component::PseudoClass(pseudo) => pseudo.to_css(dest),
            Component::PseudoElement(PseudoElement::Simple(name)) => {
                dest.write_str("::")?;
                dest.write_ident(name)
            }
            Component::PseudoElement(PseudoElement::Arguments { name, arguments }) => {
                dest.write_str("::")?;
                dest.write_ident(name)?;
                dest.write_char('(')?;
                dest.write_str(arguments)?;
                dest.write_char(')')
            }
            Component::Nesting => dest.write_char('&'),
            Component::Global(selector) => selector.to_css(dest),
        }
    }
}

impl ToCss for PseudoClass {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        match self {
            PseudoClass::Simple(name) => {
                if let Some(class) = dest.pseudo_classes.get(name).cloned() {
                    dest.write_char('.')?;
                    return dest.write_ident(&class);
                }
                dest.write_char(':')?;
                dest.write_ident(name)
            }
            PseudoClass::Selectors { name, selectors } => {
                dest.write_char(':')?;
                dest.write_ident(name)?;
                dest.write_char('(')?;
                selectors.to_css(dest)?;
                dest.write_char(')')
            }
            PseudoClass::Arguments { name, arguments } => {
                dest.write_char(':')?;
                dest.write_ident(name)?;
                dest.write_char('(')?;
                dest.write_str(arguments)?;
                dest.write_char(')')
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Locator;
    use tincture_tokenizer::Tokenizer;

    fn tokens(source: &str) -> Vec<Token<'_>> {
        Tokenizer::new(source)
            .filter(|t| t.kind != TokenKind::Comment)
            .collect()
    }

    fn parse(source: &str, ctx: SelectorContext) -> Result<SelectorList, CssError> {
        let locator = Locator::new("test.css", source);
        parse_selector_list(&tokens(source), ctx, &locator)
    }

    fn roundtrip(source: &str) -> String {
        parse(source, SelectorContext::default())
            .unwrap()
            .to_css_string()
    }

    #[test]
    fn test_compound_and_combinators() {
        assert_eq!(roundtrip("div.a#b > p + span ~ em  i"), "div.a#b > p + span ~ em i");
        assert_eq!(roundtrip("a,b , c"), "a, b, c");
        assert_eq!(roundtrip("*.x"), "*.x");
    }

    #[test]
    fn test_attributes() {
        assert_eq!(roundtrip("[href]"), "[href]");
        assert_eq!(roundtrip("a[href^='http']"), "a[href^=http]");
        assert_eq!(roundtrip("[lang|=\"en us\" i]"), "[lang|=\"en us\" i]");
    }

    #[test]
    fn test_pseudo() {
        assert_eq!(roundtrip("a:hover::before"), "a:hover::before");
        assert_eq!(roundtrip("li:nth-child( 2n+1 )"), "li:nth-child(2n+1)");
        assert_eq!(roundtrip(":not(.a,.b)"), ":not(.a, .b)");
        assert_eq!(roundtrip("a:has(> img)"), "a:has(> img)");
    }

    #[test]
    fn test_top_level_nesting_rejected() {
        let err = parse("& .a", SelectorContext::default()).unwrap_err();
        assert!(err.message().contains("nesting selector"));
    }

    #[test]
    fn test_implicit_nesting() {
        let ctx = SelectorContext {
            allow_nesting: true,
            implicit_nesting: true,
            ..Default::default()
        };
        let list = parse("h1, > p, &:hover, :not(&) span", ctx).unwrap();
        assert_eq!(list.to_css_string(), "& h1, & > p, &:hover, :not(&) span");
    }

    #[test]
    fn test_nest_requires_ampersand() {
        let ctx = SelectorContext {
            allow_nesting: true,
            require_nesting: true,
            ..Default::default()
        };
        assert!(parse(".a &", ctx).is_ok());
        assert!(parse(".a", ctx).is_err());
    }

    #[test]
    fn test_css_modules_global_and_local() {
        let ctx = SelectorContext {
            css_modules: true,
            ..Default::default()
        };
        let list = parse(":global(.foo) :local(.bar)", ctx).unwrap();
        let components = &list.0[0].0;
        assert!(matches!(&components[0], Component::Global(inner) if inner.as_single_class() == Some("foo")));
        assert_eq!(components[2], Component::Class("bar".to_string()));
        assert_eq!(list.to_css_string(), ".foo .bar");
    }

    #[test]
    fn test_css_modules_global_mode_switch() {
        let ctx = SelectorContext {
            css_modules: true,
            ..Default::default()
        };
        let list = parse(":global .a .b", ctx).unwrap();
        assert!(list.0[0].0.iter().all(|c| !matches!(c, Component::Class(_))));
        assert_eq!(list.to_css_string(), ".a .b");

        let list = parse(".x :global .a :local .b", ctx).unwrap();
        let components = &list.0[0].0;
        assert_eq!(components[0], Component::Class("x".to_string()));
        assert!(matches!(&components[2], Component::Global(inner) if inner.as_single_class() == Some("a")));
        assert_eq!(components[4], Component::Class("b".to_string()));
        assert_eq!(list.to_css_string(), ".x .a .b");

        let list = parse(".x:global .a", ctx).unwrap();
        assert_eq!(list.to_css_string(), ".x .a");

        let list = parse(".x :global > .a", ctx).unwrap();
        assert_eq!(list.to_css_string(), ".x > .a");

        assert!(parse(".a :global", ctx).is_err());
        assert!(parse(":global > .a", ctx).is_err());
        // Without CSS Modules it is an ordinary pseudo-class.
        assert_eq!(roundtrip(":global .a"), ":global .a");
    }

    #[test]
    fn test_references_inside_is_and_where() {
        let unused: std::collections::HashSet<String> = ["a".to_string()].into();
        let list = parse(":is(.a > .b), :where(.a, .c), :is(.a, .b) .c, :not(.a)", SelectorContext::default())
            .unwrap();
        assert!(list.0[0].references_any(&unused));
        assert!(!list.0[1].references_any(&unused));
        assert!(!list.0[2].references_any(&unused));
        assert!(!list.0[3].references_any(&unused));
    }

    #[test]
    fn test_widely_supported() {
        let list = parse(
            "a.b > #c[href]:hover, li:nth-child(2n):not(.x)::before, .b:has(.c), a:focus-visible, ::selection, [a=b i], :not(.a .b), :is(.a)",
            SelectorContext::default(),
        )
        .unwrap();
        let supported: Vec<bool> = list.iter().map(Selector::is_widely_supported).collect();
        assert_eq!(supported, [true, true, false, false, false, false, false, false]);
    }

    #[test]
    fn test_invalid_selectors() {
        for source in ["", "a >", ".", "#1a", "a,,b", "> a", "div[=x]"] {
            assert!(
                parse(source, SelectorContext::default()).is_err(),
                "{source:?} should fail"
            );
        }
    }

    #[test]
    fn test_vendor_prefixed_pseudo() {
        let list = parse("input::-webkit-input-placeholder, a:hover", SelectorContext::default())
            .unwrap();
        assert!(list.0[0].has_vendor_prefixed_pseudo());
        assert!(!list.0[1].has_vendor_prefixed_pseudo());
    }
}
