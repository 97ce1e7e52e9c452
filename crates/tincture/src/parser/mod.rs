//! Rule-level parser.
//!
//! Works over the token vector produced by `tincture-tokenizer` with comments
//! removed. Blocks are found by bracket matching first, then their contents
//! are parsed, so lenient mode can skip a malformed rule or declaration
//! without losing its place.

use tincture_tokenizer::{LineIndex, Location, Span, Token, TokenKind, Tokenizer};
use tracing::{trace, warn};

use crate::css_modules::{Composes, parse_composes};
use crate::declaration::{Declaration, DeclarationBlock, PropertyId};
use crate::error::{CssError, ParseErrorKind};
use crate::media_query::parse_media_list;
use crate::rules::{
    CssRule, CssRuleList, CustomMediaRule, FontFaceRule, ImportRule, Keyframe, KeyframeSelector,
    KeyframesName, KeyframesRule, LayerBlockRule, LayerStatementRule, MediaRule, NamespaceRule,
    NestingRule, PageRule, PropertyRule, StyleRule, SupportsRule, UnknownAtRule,
};
use crate::selector::{
    Component, Selector, SelectorContext, SelectorList, normalized_text, parse_selector_list,
    split_top_level_commas, trim_whitespace,
};
use crate::vendor_prefix::VendorPrefix;

mod value;

pub(crate) use value::parse_value_tokens;


/// Converts spans to locations and builds located parse errors.
pub(crate) struct Locator<'a> {
    filename: &'a str,
    source: &'a str,
    lines: LineIndex,
}

impl<'a> Locator<'a> {
    pub(crate) fn new(filename: &'a str, source: &'a str) -> Self {
        Self {
            filename,
            source,
            lines: LineIndex::new(source),
        }
    }

    pub(crate) fn filename(&self) -> &str {
        self.filename
    }

    pub(crate) fn location(&self, span: Span) -> Location {
        self.lines.location(self.source, span.start)
    }

    pub(crate) fn error(&self, kind: ParseErrorKind, span: Span) -> CssError {
        CssError::parse(kind).with_location(self.filename, self.location(span), span)
    }
}

/// Parser switches taken from the parse options.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ParserFlags {
    pub css_modules: bool,
    pub dashed_idents: bool,
    pub error_recovery: bool,
    pub custom_media: bool,
}

/// Parse a whole stylesheet into its top-level rules plus the errors lenient
/// mode recovered from.
pub(crate) fn parse_stylesheet(
    locator: &Locator<'_>,
    flags: ParserFlags,
) -> Result<(CssRuleList, Vec<CssError>), CssError> {
    let tokens: Vec<Token<'_>> = Tokenizer::new(locator.source)
        .filter(|t| t.kind != TokenKind::Comment)
        .collect();
    trace!(count = tokens.len(), "tokenized stylesheet");

    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        locator,
        flags,
        warnings: Vec::new(),
    };
    let rules = parser.parse_rule_list(Scope::TopLevel, None)?;
    Ok((rules, parser.warnings))
}

/// Where a rule list or rule appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// The stylesheet itself.
    TopLevel,
    /// Inside a top-level conditional group rule.
    RuleList,
    /// Inside a style rule, directly or through nested conditional rules.
    StyleBlock,
}

/// Declarations, nested rules and `composes` of a style block.
#[derive(Default)]
struct StyleBody {
    declarations: Vec<Declaration>,
    rules: Vec<CssRule>,
    composes: Vec<Composes>,
}

struct Parser<'a, 'src> {
    tokens: &'a [Token<'src>],
    pos: usize,
    locator: &'a Locator<'a>,
    flags: ParserFlags,
    warnings: Vec<CssError>,
}

impl<'a, 'src> Parser<'a, 'src> {
    fn peek(&self) -> Option<&'a Token<'src>> {
        self.tokens.get(self.pos)
    }

    fn eof_span(&self) -> Span {
        let end = self.locator.source.len() as u32;
        Span::new(end, end)
    }

    /// Keep going after `error` in lenient mode, fail otherwise.
    fn recover(&mut self, error: CssError) -> Result<(), CssError> {
        if !self.flags.error_recovery {
            return Err(error);
        }
        warn!(error = %error, "skipping invalid css");
        self.warnings.push(error);
        Ok(())
    }

    /// Index just past the component value starting at `index`.
    fn skip_component(&self, index: usize) -> usize {
        match self.tokens.get(index) {
            None => index,
            Some(token) if !is_block_open(token.kind) => index + 1,
            Some(_) => matching_close(self.tokens, index).map_or(self.tokens.len(), |i| i + 1),
        }
    }

    /// Index of the first top-level token at or after `index` matching `stop`.
    fn find_top_level(&self, mut index: usize, stop: impl Fn(TokenKind) -> bool) -> usize {
        while let Some(token) = self.tokens.get(index) {
            if stop(token.kind) {
                return index;
            }
            index = self.skip_component(index);
        }
        index
    }

    /// Parse rules until the end of input, or until the `}` closing the
    /// block opened at `open`.
    fn parse_rule_list(&mut self, scope: Scope, open: Option<Span>) -> Result<CssRuleList, CssError> {
        let mut rules = Vec::new();
        loop {
            let Some(token) = self.peek() else {
                return match open {
                    Some(open) => Err(self.locator.error(ParseErrorKind::UnclosedBlock, open)),
                    None => Ok(CssRuleList(rules)),
                };
            };
            match token.kind {
                TokenKind::Whitespace | TokenKind::Semicolon => self.pos += 1,
                TokenKind::Cdo | TokenKind::Cdc if scope == Scope::TopLevel => self.pos += 1,
                TokenKind::RBrace if open.is_some() => {
                    self.pos += 1;
                    return Ok(CssRuleList(rules));
                }
                TokenKind::RBrace => {
                    self.pos += 1;
                    let error = self
                        .locator
                        .error(ParseErrorKind::UnexpectedToken("}".to_string()), token.span);
                    self.recover(error)?;
                }
                TokenKind::AtKeyword => {
                    if let Some(rule) = self.parse_at_rule(scope)? {
                        rules.push(rule);
                    }
                }
                _ => {
                    let ctx = self.selector_context(scope);
                    if let Some(rule) = self.parse_qualified_rule(ctx, scope)? {
                        rules.push(CssRule::Style(rule));
                    }
                }
            }
        }
    }

    fn selector_context(&self, scope: Scope) -> SelectorContext {
        let nested = scope == Scope::StyleBlock;
        SelectorContext {
            allow_nesting: nested,
            implicit_nesting: nested,
            css_modules: self.flags.css_modules,
            ..SelectorContext::default()
        }
    }

    /// A style rule. `None` when lenient mode skipped it.
    fn parse_qualified_rule(
        &mut self,
        ctx: SelectorContext,
        scope: Scope,
    ) -> Result<Option<StyleRule>, CssError> {
        let tokens = self.tokens;
        let start = self.pos;
        let first = &tokens[start];
        let loc = self.locator.location(first.span);

        let brace = self.find_top_level(start, |kind| {
            kind == TokenKind::LBrace
                || kind == TokenKind::RBrace
                || (kind == TokenKind::Semicolon && scope == Scope::StyleBlock)
        });
        let Some(open) = tokens.get(brace) else {
            return Err(self.locator.error(ParseErrorKind::UnexpectedEof, self.eof_span()));
        };
        if open.kind != TokenKind::LBrace {
            // Something like `color red;` inside a block.
            self.pos = if open.kind == TokenKind::Semicolon {
                brace + 1
            } else {
                brace
            };
            let span = first.span.extend(tokens[brace - 1].span);
            let error = if scope == Scope::StyleBlock {
                self.locator.error(ParseErrorKind::InvalidDeclaration, span)
            } else {
                self.locator
                    .error(ParseErrorKind::UnexpectedToken(open.text.to_string()), open.span)
            };
            self.recover(error)?;
            return Ok(None);
        }

        let prelude = &tokens[start..brace];
        self.pos = brace + 1;
        let selectors = match parse_selector_list(prelude, ctx, self.locator) {
            Ok(selectors) => selectors,
            Err(error) => {
                self.pos = self.skip_component(brace);
                self.recover(error)?;
                return Ok(None);
            }
        };

        let body = self.parse_style_body(open.span)?;
        Ok(Some(StyleRule {
            selectors,
            declarations: DeclarationBlock {
                declarations: body.declarations,
            },
            rules: CssRuleList(body.rules),
            composes: body.composes,
            loc,
        }))
    }

    /// The contents of a style block, after its `{`.
    fn parse_style_body(&mut self, open: Span) -> Result<StyleBody, CssError> {
        let mut body = StyleBody::default();
        loop {
            let Some(token) = self.peek() else {
                return Err(self.locator.error(ParseErrorKind::UnclosedBlock, open));
            };
            match token.kind {
                TokenKind::Whitespace | TokenKind::Semicolon => self.pos += 1,
                TokenKind::RBrace => {
                    self.pos += 1;
                    return Ok(body);
                }
                TokenKind::AtKeyword => {
                    if let Some(rule) = self.parse_at_rule(Scope::StyleBlock)? {
                        body.rules.push(rule);
                    }
                }
                TokenKind::Ident if self.at_declaration() => self.parse_declaration(&mut body)?,
                _ => {
                    let ctx = self.selector_context(Scope::StyleBlock);
                    if let Some(rule) = self.parse_qualified_rule(ctx, Scope::StyleBlock)? {
                        body.rules.push(CssRule::Style(rule));
                    }
                }
            }
        }
    }

    /// Whether the ident at the cursor starts a declaration rather than a
    /// nested rule such as `a:hover { ... }`.
    fn at_declaration(&self) -> bool {
        let Some(name) = self.peek() else {
            return false;
        };
        let mut index = self.pos + 1;
        while self
            .tokens
            .get(index)
            .is_some_and(|t| t.kind == TokenKind::Whitespace)
        {
            index += 1;
        }
        if self.tokens.get(index).map(|t| t.kind) != Some(TokenKind::Colon) {
            return false;
        }
        if name.text.starts_with("--") {
            return true;
        }
        let end = self.find_top_level(index, |kind| {
            matches!(
                kind,
                TokenKind::LBrace | TokenKind::RBrace | TokenKind::Semicolon
            )
        });
        self.tokens.get(end).map(|t| t.kind) != Some(TokenKind::LBrace)
    }

    /// Parse `name: value` at the cursor into `body`, stopping before the
    /// terminating `;` or `}`.
    fn parse_declaration(&mut self, body: &mut StyleBody) -> Result<(), CssError> {
        let all = self.tokens;
        let end = self.find_top_level(self.pos, |kind| {
            matches!(kind, TokenKind::Semicolon | TokenKind::RBrace)
        });
        let name_token = &all[self.pos];
        let tokens = &all[self.pos..end];
        self.pos = end;

        match self.declaration(tokens) {
            Ok(declaration) => {
                if self.flags.css_modules
                    && let PropertyId::Standard { name, prefix } = &declaration.property
                    && name == "composes"
                    && prefix.is_empty()
                {
                    match parse_composes(&declaration.value, declaration.loc, name_token.span) {
                        Ok(composes) => body.composes.extend(composes),
                        Err(kind) => {
                            let error = CssError::module(kind).with_location(
                                self.locator.filename(),
                                declaration.loc,
                                name_token.span,
                            );
                            self.recover(error)?;
                        }
                    }
                } else {
                    body.declarations.push(declaration);
                }
                Ok(())
            }
            Err(error) => self.recover(error),
        }
    }

    /// Build a declaration from its tokens, `name` through the end of the value.
    fn declaration(&self, tokens: &[Token<'src>]) -> Result<Declaration, CssError> {
        let name_token = &tokens[0];
        let loc = self.locator.location(name_token.span);
        let colon = tokens
            .iter()
            .position(|t| t.kind == TokenKind::Colon)
            .ok_or_else(|| self.locator.error(ParseErrorKind::InvalidDeclaration, name_token.span))?;
        if name_token.kind != TokenKind::Ident
            || tokens[1..colon]
                .iter()
                .any(|t| t.kind != TokenKind::Whitespace)
        {
            return Err(self
                .locator
                .error(ParseErrorKind::InvalidDeclaration, name_token.span));
        }

        let name = name_token.name();
        let property = PropertyId::parse(&name);
        let (value_tokens, important) = strip_important(trim_whitespace(&tokens[colon + 1..]))
            .map_err(|bang| {
                self.locator
                    .error(ParseErrorKind::UnexpectedToken("!".to_string()), bang)
            })?;
        if value_tokens.is_empty() && !property.is_custom() {
            return Err(self.locator.error(
                ParseErrorKind::MissingValue {
                    property: name.into_owned(),
                },
                name_token.span,
            ));
        }

        let dashed_refs = self.flags.css_modules && self.flags.dashed_idents;
        let value = parse_value_tokens(value_tokens, self.locator, dashed_refs)?;
        Ok(Declaration {
            property,
            value,
            important,
            loc,
        })
    }

    /// The contents of a declaration-only block (`@font-face`, keyframes, ...).
    fn parse_declaration_list(&mut self, open: Span) -> Result<DeclarationBlock, CssError> {
        let mut body = StyleBody::default();
        loop {
            let Some(token) = self.peek() else {
                return Err(self.locator.error(ParseErrorKind::UnclosedBlock, open));
            };
            match token.kind {
                TokenKind::Whitespace | TokenKind::Semicolon => self.pos += 1,
                TokenKind::RBrace => {
                    self.pos += 1;
                    break;
                }
                TokenKind::AtKeyword => {
                    self.pos = self.find_top_level(self.pos + 1, |kind| {
                        matches!(kind, TokenKind::Semicolon | TokenKind::RBrace | TokenKind::LBrace)
                    });
                    if self.peek().is_some_and(|t| t.kind == TokenKind::LBrace) {
                        self.pos = self.skip_component(self.pos);
                    }
                    let error = self
                        .locator
                        .error(ParseErrorKind::AtRuleNotAllowed(token.name().into_owned()), token.span);
                    self.recover(error)?;
                }
                _ => self.parse_declaration(&mut body)?,
            }
        }
        Ok(DeclarationBlock {
            declarations: body.declarations,
        })
    }

    /// An at-rule at the cursor. `None` for rules that are dropped
    /// (`@charset`) or skipped in lenient mode.
    fn parse_at_rule(&mut self, scope: Scope) -> Result<Option<CssRule>, CssError> {
        let tokens = self.tokens;
        let keyword = &tokens[self.pos];
        let name = keyword.name().to_ascii_lowercase();
        let loc = self.locator.location(keyword.span);
        let prelude_start = self.pos + 1;
        let prelude_end = self.find_top_level(prelude_start, |kind| {
            matches!(kind, TokenKind::LBrace | TokenKind::Semicolon | TokenKind::RBrace)
        });
        let prelude = trim_whitespace(&tokens[prelude_start..prelude_end]);
        let block = tokens
            .get(prelude_end)
            .filter(|t| t.kind == TokenKind::LBrace)
            .map(|t| t.span);

        // Position after the whole rule, used when it is skipped.
        let rule_end = match tokens.get(prelude_end).map(|t| t.kind) {
            Some(TokenKind::LBrace) => self.skip_component(prelude_end),
            Some(TokenKind::Semicolon) => prelude_end + 1,
            _ => prelude_end,
        };
        self.pos = match block {
            Some(_) => prelude_end + 1,
            None => rule_end,
        };

        match self.at_rule(&name, scope, keyword.span, prelude, block, loc) {
            Ok(rule) => Ok(rule),
            Err(error) if error.is_unclosed_block() => Err(error),
            Err(error) => {
                self.pos = rule_end;
                self.recover(error)?;
                Ok(None)
            }
        }
    }

    fn at_rule(
        &mut self,
        name: &str,
        scope: Scope,
        keyword_span: Span,
        prelude: &'a [Token<'src>],
        block: Option<Span>,
        loc: Location,
    ) -> Result<Option<CssRule>, CssError> {
        let not_allowed = |this: &Self| {
            this.locator
                .error(ParseErrorKind::AtRuleNotAllowed(name.to_string()), keyword_span)
        };
        let bad_prelude = |this: &Self| {
            this.locator
                .error(ParseErrorKind::InvalidAtRulePrelude(name.to_string()), keyword_span)
        };
        let require_block = |this: &Self| block.ok_or_else(|| bad_prelude(this));

        trace!(name, ?scope, "at-rule");
        let (prefix, unprefixed) = VendorPrefix::strip(name);
        match (name, unprefixed) {
            ("media", _) => {
                let open = require_block(self)?;
                let query = parse_media_list(prelude, self.locator)?;
                let rules = self.parse_group_body(scope, open)?;
                Ok(Some(CssRule::Media(MediaRule { query, rules, loc })))
            }
            ("supports", _) => {
                let open = require_block(self)?;
                let condition = parse_value_tokens(prelude, self.locator, false)?;
                if condition.is_empty() {
                    return Err(bad_prelude(self));
                }
                let rules = self.parse_group_body(scope, open)?;
                Ok(Some(CssRule::Supports(SupportsRule {
                    condition,
                    rules,
                    loc,
                })))
            }
            ("layer", _) => match block {
                Some(open) => {
                    let name = if prelude.is_empty() {
                        None
                    } else {
                        Some(layer_name(prelude).ok_or_else(|| bad_prelude(self))?)
                    };
                    let rules = self.parse_group_body(scope, open)?;
                    Ok(Some(CssRule::LayerBlock(LayerBlockRule { name, rules, loc })))
                }
                None => {
                    let names = split_top_level_commas(prelude)
                        .into_iter()
                        .map(|part| layer_name(trim_whitespace(part)))
                        .collect::<Option<Vec<_>>>()
                        .filter(|names| !names.is_empty())
                        .ok_or_else(|| bad_prelude(self))?;
                    Ok(Some(CssRule::LayerStatement(LayerStatementRule { names, loc })))
                }
            },
            ("nest", _) => {
                if scope != Scope::StyleBlock {
                    return Err(not_allowed(self));
                }
                let open = require_block(self)?;
                let ctx = SelectorContext {
                    allow_nesting: true,
                    require_nesting: true,
                    css_modules: self.flags.css_modules,
                    ..SelectorContext::default()
                };
                let selectors = parse_selector_list(prelude, ctx, self.locator)?;
                let body = self.parse_style_body(open)?;
                Ok(Some(CssRule::Nesting(NestingRule {
                    style: StyleRule {
                        selectors,
                        declarations: DeclarationBlock {
                            declarations: body.declarations,
                        },
                        rules: CssRuleList(body.rules),
                        composes: body.composes,
                        loc,
                    },
                    loc,
                })))
            }
            (_, "keyframes") => {
                if scope == Scope::StyleBlock {
                    return Err(not_allowed(self));
                }
                let open = require_block(self)?;
                let name = match prelude {
                    [token] if token.kind == TokenKind::Ident => {
                        KeyframesName::Ident(token.name().into_owned())
                    }
                    [token] if token.kind == TokenKind::String => {
                        KeyframesName::String(token.string_value().into_owned())
                    }
                    _ => return Err(bad_prelude(self)),
                };
                let keyframes = self.parse_keyframes(open)?;
                Ok(Some(CssRule::Keyframes(KeyframesRule {
                    name,
                    prefix,
                    keyframes,
                    loc,
                })))
            }
            ("font-face", _) => {
                if scope == Scope::StyleBlock {
                    return Err(not_allowed(self));
                }
                let open = require_block(self)?;
                if !prelude.is_empty() {
                    return Err(bad_prelude(self));
                }
                let declarations = self.parse_declaration_list(open)?;
                Ok(Some(CssRule::FontFace(FontFaceRule { declarations, loc })))
            }
            ("page", _) => {
                if scope == Scope::StyleBlock {
                    return Err(not_allowed(self));
                }
                let open = require_block(self)?;
                let selectors = normalized_text(prelude);
                let declarations = self.parse_declaration_list(open)?;
                Ok(Some(CssRule::Page(PageRule {
                    selectors,
                    declarations,
                    loc,
                })))
            }
            ("property", _) => {
                if scope == Scope::StyleBlock {
                    return Err(not_allowed(self));
                }
                let open = require_block(self)?;
                let name = match prelude {
                    [token] if token.kind == TokenKind::Ident && token.text.starts_with("--") => {
                        token.name().into_owned()
                    }
                    _ => return Err(bad_prelude(self)),
                };
                let declarations = self.parse_declaration_list(open)?;
                Ok(Some(CssRule::Property(PropertyRule {
                    name,
                    declarations,
                    loc,
                })))
            }
            ("import", _) => {
                if scope != Scope::TopLevel {
                    return Err(not_allowed(self));
                }
                if block.is_some() {
                    return Err(bad_prelude(self));
                }
                let rule = self
                    .parse_import(prelude, loc)
                    .ok_or_else(|| bad_prelude(self))??;
                Ok(Some(CssRule::Import(rule)))
            }
            ("namespace", _) => {
                if scope != Scope::TopLevel {
                    return Err(not_allowed(self));
                }
                if block.is_some() {
                    return Err(bad_prelude(self));
                }
                let (prefix, rest) = match prelude {
                    [token, rest @ ..] if token.kind == TokenKind::Ident => {
                        (Some(token.name().into_owned()), trim_whitespace(rest))
                    }
                    _ => (None, prelude),
                };
                let (url, rest) = url_prefix(rest).ok_or_else(|| bad_prelude(self))?;
                if !trim_whitespace(rest).is_empty() {
                    return Err(bad_prelude(self));
                }
                Ok(Some(CssRule::Namespace(NamespaceRule { prefix, url, loc })))
            }
            ("custom-media", _) if self.flags.custom_media => {
                if scope != Scope::TopLevel {
                    return Err(not_allowed(self));
                }
                if block.is_some() {
                    return Err(bad_prelude(self));
                }
                let (name, query) = match prelude {
                    [token, rest @ ..]
                        if token.kind == TokenKind::Ident && token.text.starts_with("--") =>
                    {
                        (token.name().into_owned(), trim_whitespace(rest))
                    }
                    _ => return Err(bad_prelude(self)),
                };
                if query.is_empty() {
                    return Err(bad_prelude(self));
                }
                let query = parse_media_list(query, self.locator)?;
                Ok(Some(CssRule::CustomMedia(CustomMediaRule { name, query, loc })))
            }
            ("charset", _) => {
                trace!("dropping @charset");
                Ok(None)
            }
            _ => {
                let prelude = parse_value_tokens(prelude, self.locator, false)?;
                let block = match block {
                    Some(open) => {
                        let tokens = self.tokens;
                        let close = matching_close(tokens, self.pos - 1)
                            .ok_or_else(|| self.locator.error(ParseErrorKind::UnclosedBlock, open))?;
                        let contents = &tokens[self.pos..close];
                        self.pos = close + 1;
                        Some(parse_value_tokens(contents, self.locator, false)?)
                    }
                    None => None,
                };
                Ok(Some(CssRule::Unknown(UnknownAtRule {
                    name: name.to_string(),
                    prelude,
                    block,
                    loc,
                })))
            }
        }
    }

    /// The body of `@media`, `@supports` or `@layer`. Inside a style rule,
    /// declarations directly in the body become an implicit `&` rule.
    fn parse_group_body(&mut self, scope: Scope, open: Span) -> Result<CssRuleList, CssError> {
        match scope {
            Scope::TopLevel | Scope::RuleList => self.parse_rule_list(Scope::RuleList, Some(open)),
            Scope::StyleBlock => {
                let loc = self.locator.location(open);
                let body = self.parse_style_body(open)?;
                let mut rules = body.rules;
                if !body.declarations.is_empty() || !body.composes.is_empty() {
                    rules.insert(
                        0,
                        CssRule::Style(StyleRule {
                            selectors: SelectorList(vec![Selector(vec![Component::Nesting])]),
                            declarations: DeclarationBlock {
                                declarations: body.declarations,
                            },
                            rules: CssRuleList::default(),
                            composes: body.composes,
                            loc,
                        }),
                    );
                }
                Ok(CssRuleList(rules))
            }
        }
    }

    fn parse_keyframes(&mut self, open: Span) -> Result<Vec<Keyframe>, CssError> {
        let mut keyframes = Vec::new();
        loop {
            let Some(token) = self.peek() else {
                return Err(self.locator.error(ParseErrorKind::UnclosedBlock, open));
            };
            match token.kind {
                TokenKind::Whitespace | TokenKind::Semicolon => self.pos += 1,
                TokenKind::RBrace => {
                    self.pos += 1;
                    return Ok(keyframes);
                }
                _ => {
                    let tokens = self.tokens;
                    let start = self.pos;
                    let brace = self.find_top_level(start, |kind| {
                        matches!(kind, TokenKind::LBrace | TokenKind::RBrace)
                    });
                    let Some(block) = tokens
                        .get(brace)
                        .filter(|t| t.kind == TokenKind::LBrace)
                    else {
                        self.pos = brace;
                        let error = self.locator.error(ParseErrorKind::InvalidKeyframe, token.span);
                        self.recover(error)?;
                        continue;
                    };
                    let selectors = split_top_level_commas(&tokens[start..brace])
                        .into_iter()
                        .map(|part| keyframe_selector(trim_whitespace(part)))
                        .collect::<Option<Vec<_>>>();
                    let Some(selectors) = selectors else {
                        self.pos = self.skip_component(brace);
                        let error = self.locator.error(ParseErrorKind::InvalidKeyframe, token.span);
                        self.recover(error)?;
                        continue;
                    };
                    self.pos = brace + 1;
                    let declarations = self.parse_declaration_list(block.span)?;
                    keyframes.push(Keyframe {
                        selectors,
                        declarations,
                        loc: self.locator.location(token.span),
                    });
                }
            }
        }
    }

    /// `@import` prelude: url, then optional `layer`, `supports()` and media.
    fn parse_import(&self, prelude: &[Token<'src>], loc: Location) -> Option<Result<ImportRule, CssError>> {
        let (url, mut rest) = url_prefix(prelude)?;
        rest = trim_whitespace(rest);

        let mut layer = None;
        match rest.first() {
            Some(token) if token.is_ident("layer") => {
                layer = Some(None);
                rest = trim_whitespace(&rest[1..]);
            }
            Some(token)
                if token.kind == TokenKind::Function && token.name().eq_ignore_ascii_case("layer") =>
            {
                let end = skip_function(rest);
                let name = layer_name(trim_whitespace(rest.get(1..end.saturating_sub(1))?))?;
                layer = Some(Some(name));
                rest = trim_whitespace(&rest[end..]);
            }
            _ => {}
        }

        let mut supports = None;
        if let Some(token) = rest.first()
            && token.kind == TokenKind::Function
            && token.name().eq_ignore_ascii_case("supports")
        {
            let end = skip_function(rest);
            let inner = rest.get(1..end.saturating_sub(1))?;
            match parse_value_tokens(inner, self.locator, false) {
                Ok(condition) => supports = Some(condition),
                Err(error) => return Some(Err(error)),
            }
            rest = trim_whitespace(&rest[end..]);
        }

        Some(parse_media_list(rest, self.locator).map(|media| ImportRule {
            url,
            layer,
            supports,
            media,
            loc,
        }))
    }
}

impl CssError {
    fn is_unclosed_block(&self) -> bool {
        matches!(
            self.kind,
            crate::error::ErrorKind::Parse(ParseErrorKind::UnclosedBlock)
        )
    }
}

/// Index of the token closing the block opened at `open`.
fn matching_close(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if is_block_open(token.kind) {
            depth += 1;
        } else if is_block_close(token.kind) {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Index just past the function starting `tokens`.
fn skip_function(tokens: &[Token<'_>]) -> usize {
    matching_close(tokens, 0).map_or(tokens.len(), |i| i + 1)
}

fn is_block_open(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Function | TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace
    )
}

fn is_block_close(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace
    )
}

/// Split a trailing `!important` off a trimmed value.
///
/// A top-level `!` anywhere else is an error; its span is returned.
fn strip_important<'a, 'src>(tokens: &'a [Token<'src>]) -> Result<(&'a [Token<'src>], bool), Span> {
    let mut depth = 0usize;
    let mut bang = None;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Function | TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                depth += 1
            }
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                depth = depth.saturating_sub(1)
            }
            TokenKind::Delim if depth == 0 && token.is_delim('!') => {
                if bang.is_some() {
                    return Err(token.span);
                }
                bang = Some(i);
            }
            _ => {}
        }
    }
    let Some(i) = bang else {
        return Ok((tokens, false));
    };
    match trim_whitespace(&tokens[i + 1..]) {
        [word] if word.is_ident("important") => Ok((trim_whitespace(&tokens[..i]), true)),
        _ => Err(tokens[i].span),
    }
}

/// A dotted layer name such as `framework.base`.
fn layer_name(tokens: &[Token<'_>]) -> Option<String> {
    if tokens.is_empty() || tokens.len() % 2 == 0 {
        return None;
    }
    let mut name = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i % 2 == 0 {
            if token.kind != TokenKind::Ident {
                return None;
            }
            name.push_str(&token.name());
        } else if token.is_delim('.') {
            name.push('.');
        } else {
            return None;
        }
    }
    Some(name)
}

fn keyframe_selector(tokens: &[Token<'_>]) -> Option<KeyframeSelector> {
    match tokens {
        [token] if token.is_ident("from") => Some(KeyframeSelector::From),
        [token] if token.is_ident("to") => Some(KeyframeSelector::To),
        [token] if token.kind == TokenKind::Percentage => {
            let value = token.numeric_value();
            (0.0..=100.0)
                .contains(&value)
                .then_some(KeyframeSelector::Percentage(value))
        }
        _ => None,
    }
}

/// A leading string, `url(...)` or `url("...")`, and the tokens after it.
fn url_prefix<'a, 'src>(tokens: &'a [Token<'src>]) -> Option<(String, &'a [Token<'src>])> {
    let (first, rest) = tokens.split_first()?;
    match first.kind {
        TokenKind::String => Some((first.string_value().into_owned(), rest)),
        TokenKind::Url => Some((first.url_value().into_owned(), rest)),
        TokenKind::Function if first.name().eq_ignore_ascii_case("url") => {
            let close = rest.iter().position(|t| t.kind == TokenKind::RParen)?;
            match trim_whitespace(&rest[..close]) {
                [string] if string.kind == TokenKind::String => {
                    Some((string.string_value().into_owned(), &rest[close + 1..]))
                }
                _ => None,
            }
        }
        _ => None,
    }
}
