//! Component value parsing.

use tincture_tokenizer::{Span, Token, TokenKind};

use crate::error::{CssError, ModuleErrorKind, ParseErrorKind};
use crate::parser::Locator;
use crate::values::{
    Block, BlockKind, ComponentValue, CssColor, Function, Specifier, TokenList, Url, Variable,
};

/// Parse declaration or prelude tokens (comments removed) into a value.
///
/// With `dashed_refs`, `var(--x from ...)` references are recognized and a
/// malformed `from` clause is an error.
pub(crate) fn parse_value_tokens(
    tokens: &[Token<'_>],
    locator: &Locator<'_>,
    dashed_refs: bool,
) -> Result<TokenList, CssError> {
    let mut parser = ValueParser {
        tokens,
        pos: 0,
        locator,
        dashed_refs,
    };
    let values = parser.parse_list(None)?;
    Ok(TokenList(trim(values)))
}

fn trim(mut values: Vec<ComponentValue>) -> Vec<ComponentValue> {
    while matches!(values.last(), Some(ComponentValue::Whitespace)) {
        values.pop();
    }
    let leading = values
        .iter()
        .take_while(|v| matches!(v, ComponentValue::Whitespace))
        .count();
    values.drain(..leading);
    values
}

struct ValueParser<'a, 'src> {
    tokens: &'a [Token<'src>],
    pos: usize,
    locator: &'a Locator<'a>,
    dashed_refs: bool,
}

impl<'a, 'src> ValueParser<'a, 'src> {
    /// Parse until `close` (consumed) or the end of input.
    fn parse_list(&mut self, close: Option<(TokenKind, Span)>) -> Result<Vec<ComponentValue>, CssError> {
        let mut values = Vec::new();
        let mut previous_end: Option<u32> = None;

        while let Some(token) = self.tokens.get(self.pos) {
            // A removed comment still separates its neighbours.
            if previous_end.is_some_and(|end| end < token.span.start)
                && !matches!(values.last(), Some(ComponentValue::Whitespace) | None)
            {
                values.push(ComponentValue::Whitespace);
            }
            let adjacent = previous_end == Some(token.span.start);
            previous_end = Some(token.span.end);
            self.pos += 1;

            let value = match token.kind {
                TokenKind::Whitespace => {
                    if matches!(values.last(), Some(ComponentValue::Whitespace)) {
                        continue;
                    }
                    ComponentValue::Whitespace
                }
                TokenKind::Comment => continue,
                TokenKind::Ident => match self.unicode_range(token) {
                    Some(range) => ComponentValue::UnicodeRange(range),
                    None => ComponentValue::Ident(token.name().into_owned()),
                },
                TokenKind::AtKeyword => ComponentValue::AtKeyword(token.name().into_owned()),
                TokenKind::Hash | TokenKind::IdHash => {
                    let name = token.name();
                    match CssColor::from_hex(&name) {
                        Some(color) => ComponentValue::Color(color),
                        None => ComponentValue::Hash(name.into_owned()),
                    }
                }
                TokenKind::String => ComponentValue::String(token.string_value().into_owned()),
                TokenKind::BadString => {
                    return Err(self.locator.error(ParseErrorKind::BadString, token.span));
                }
                TokenKind::Url => ComponentValue::Url(Url {
                    url: token.url_value().into_owned(),
                    loc: self.locator.location(token.span),
                }),
                TokenKind::BadUrl => {
                    return Err(self.locator.error(ParseErrorKind::BadUrl, token.span));
                }
                TokenKind::Number => ComponentValue::Number(token.numeric_value()),
                TokenKind::Percentage => ComponentValue::Percentage(token.numeric_value()),
                TokenKind::Dimension => ComponentValue::Dimension {
                    value: token.numeric_value(),
                    unit: token.unit().into_owned(),
                },
                TokenKind::Delim => match token.delim() {
                    Some(c) => ComponentValue::Delim(c),
                    None => continue,
                },
                TokenKind::Colon => ComponentValue::Colon,
                TokenKind::Semicolon => ComponentValue::Semicolon,
                TokenKind::Comma => ComponentValue::Comma,
                TokenKind::Function => self.parse_function(token)?,
                TokenKind::LParen => self.parse_block(BlockKind::Paren, TokenKind::RParen, token.span)?,
                TokenKind::LBracket => {
                    self.parse_block(BlockKind::Bracket, TokenKind::RBracket, token.span)?
                }
                TokenKind::LBrace => self.parse_block(BlockKind::Brace, TokenKind::RBrace, token.span)?,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    if close.is_some_and(|(kind, _)| kind == token.kind) {
                        return Ok(trim(values));
                    }
                    return Err(self.locator.error(
                        ParseErrorKind::UnexpectedToken(token.text.to_string()),
                        token.span,
                    ));
                }
                TokenKind::Cdo | TokenKind::Cdc | TokenKind::Eof => {
                    return Err(self.locator.error(
                        ParseErrorKind::UnexpectedToken(token.text.to_string()),
                        token.span,
                    ));
                }
            };
            // `a+1` keeps its sign; without it the two would print as one ident.
            if adjacent
                && token.text.starts_with('+')
                && matches!(
                    token.kind,
                    TokenKind::Number | TokenKind::Percentage | TokenKind::Dimension
                )
                && matches!(
                    values.last(),
                    Some(
                        ComponentValue::Ident(_)
                            | ComponentValue::Number(_)
                            | ComponentValue::Percentage(_)
                            | ComponentValue::Dimension { .. }
                    )
                )
            {
                values.push(ComponentValue::Delim('+'));
            }
            // Nested lists end at their closing token.
            previous_end = self.tokens.get(self.pos - 1).map(|t| t.span.end);
            values.push(value);
        }

        match close {
            Some((_, open)) => Err(self.locator.error(ParseErrorKind::UnclosedBlock, open)),
            None => Ok(values),
        }
    }

    /// Join `u` and the adjacent tokens after it into a unicode range.
    ///
    /// The tokenizer splits `U+0025-00FF` into an ident, a number and a
    /// dimension; nothing is consumed unless the joined text is a valid range.
    fn unicode_range(&mut self, start: &Token<'_>) -> Option<String> {
        if !start.text.eq_ignore_ascii_case("u") {
            return None;
        }
        let mut text = String::new();
        let mut end = start.span.end;
        let mut next = self.pos;
        while let Some(token) = self.tokens.get(next)
            && token.span.start == end
            && matches!(
                token.kind,
                TokenKind::Number | TokenKind::Dimension | TokenKind::Ident | TokenKind::Delim
            )
            && token
                .text
                .chars()
                .all(|c| c.is_ascii_hexdigit() || matches!(c, '+' | '-' | '?'))
        {
            text.push_str(token.text);
            end = token.span.end;
            next += 1;
        }
        if !is_unicode_range(&text) {
            return None;
        }
        self.pos = next;
        Some(format!("{}{text}", start.text))
    }

    fn parse_block(
        &mut self,
        kind: BlockKind,
        close: TokenKind,
        open: Span,
    ) -> Result<ComponentValue, CssError> {
        let contents = self.parse_list(Some((close, open)))?;
        Ok(ComponentValue::Block(Block {
            kind,
            contents: TokenList(contents),
        }))
    }

    fn parse_function(&mut self, token: &Token<'src>) -> Result<ComponentValue, CssError> {
        let name = token.name().to_ascii_lowercase();
        let arguments = self.parse_list(Some((TokenKind::RParen, token.span)))?;

        match name.as_str() {
            "url" => {
                if let [ComponentValue::String(url)] = arguments.as_slice() {
                    return Ok(ComponentValue::Url(Url {
                        url: url.clone(),
                        loc: self.locator.location(token.span),
                    }));
                }
            }
            "var" => {
                if let Some(variable) = self.variable(&arguments, token.span)? {
                    return Ok(ComponentValue::Var(variable));
                }
            }
            _ => {
                if let Some(color) = CssColor::from_function(&name, &arguments) {
                    return Ok(ComponentValue::Color(color));
                }
            }
        }

        Ok(ComponentValue::Function(Function {
            name,
            arguments: TokenList(arguments),
        }))
    }

    /// Interpret `var()` arguments. `None` keeps the function as written.
    fn variable(
        &self,
        arguments: &[ComponentValue],
        span: Span,
    ) -> Result<Option<Variable>, CssError> {
        let (head, fallback) = match arguments.iter().position(|v| *v == ComponentValue::Comma) {
            Some(comma) => (
                &arguments[..comma],
                Some(TokenList(trim(arguments[comma + 1..].to_vec()))),
            ),
            None => (arguments, None),
        };
        let head: Vec<&ComponentValue> = head
            .iter()
            .filter(|v| !matches!(v, ComponentValue::Whitespace))
            .collect();

        let (name, rest) = match head.as_slice() {
            [ComponentValue::Ident(name), rest @ ..] if name.starts_with("--") => (name, rest),
            _ => return Ok(None),
        };

        let from = match rest {
            [] => None,
            [ComponentValue::Ident(from), specifier @ ..]
                if self.dashed_refs && from.eq_ignore_ascii_case("from") =>
            {
                match specifier {
                    [ComponentValue::Ident(global)] if global.eq_ignore_ascii_case("global") => {
                        Some(Specifier::Global)
                    }
                    [ComponentValue::String(file)] => Some(Specifier::File(file.clone())),
                    _ => {
                        let location = self.locator.location(span);
                        return Err(CssError::module(ModuleErrorKind::InvalidReference(
                            format!("expected `global` or a string after `from` in var({name})"),
                        ))
                        .with_location(self.locator.filename(), location, span));
                    }
                }
            }
            _ => return Ok(None),
        };

        Ok(Some(Variable {
            name: name.clone(),
            from,
            fallback,
        }))
    }
}

/// `+` followed by one to six hex digits with optional trailing `?`
/// wildcards, or two hex ranges joined by `-`.
fn is_unicode_range(text: &str) -> bool {
    let Some(rest) = text.strip_prefix('+') else {
        return false;
    };
    let (start, end) = match rest.split_once('-') {
        Some((start, end)) => (start, Some(end)),
        None => (rest, None),
    };
    let digits = start.trim_end_matches('?');
    if start.is_empty() || start.len() > 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return false;
    }
    match end {
        None => true,
        Some(end) => {
            digits.len() == start.len()
                && (1..=6).contains(&end.len())
                && end.bytes().all(|b| b.is_ascii_hexdigit())
        }
    }
}
