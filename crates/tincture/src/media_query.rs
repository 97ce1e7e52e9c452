//! Media queries.

use std::fmt;

use tincture_tokenizer::{Token, TokenKind};

use crate::error::{CssError, ParseErrorKind};
use crate::parser::{Locator, parse_value_tokens};
use crate::printer::{Printer, ToCss};
use crate::selector::{normalized_text, split_top_level_commas, trim_whitespace};
use crate::values::{ComponentValue, TokenList};

/// A comma-separated list of media queries. Empty matches everything.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaList(pub Vec<MediaQuery>);

#[derive(Debug, Clone, PartialEq)]
pub struct MediaQuery {
    pub qualifier: Option<Qualifier>,
    /// `screen`, `print`, `all`
    pub media_type: Option<String>,
    pub condition: Option<MediaCondition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    Only,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaCondition {
    Feature(MediaFeature),
    Not(Box<MediaCondition>),
    Operation {
        operator: Operator,
        conditions: Vec<MediaCondition>,
    },
    /// A parenthesized or functional expression this parser does not model.
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaFeature {
    /// `(min-width: 600px)`
    Plain { name: String, value: TokenList },
    /// `(color)`
    Boolean(String),
    /// `(width >= 600px)`; `(600px <= width)` is stored in this form too.
    Range {
        name: String,
        operator: RangeOperator,
        value: TokenList,
    },
    /// `(400px < width <= 700px)`
    Interval {
        name: String,
        start: TokenList,
        start_operator: RangeOperator,
        end: TokenList,
        end_operator: RangeOperator,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOperator {
    Equal,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
}

impl RangeOperator {
    fn as_str(self) -> &'static str {
        match self {
            RangeOperator::Equal => "=",
            RangeOperator::GreaterThan => ">",
            RangeOperator::GreaterThanEqual => ">=",
            RangeOperator::LessThan => "<",
            RangeOperator::LessThanEqual => "<=",
        }
    }

    /// The operator with its operands swapped: `a < b` is `b > a`.
    fn flip(self) -> Self {
        match self {
            RangeOperator::Equal => RangeOperator::Equal,
            RangeOperator::GreaterThan => RangeOperator::LessThan,
            RangeOperator::GreaterThanEqual => RangeOperator::LessThanEqual,
            RangeOperator::LessThan => RangeOperator::GreaterThan,
            RangeOperator::LessThanEqual => RangeOperator::GreaterThanEqual,
        }
    }
}

/// Features that accept `min-` and `max-` prefixes.
const RANGE_FEATURES: &[&str] = &[
    "width",
    "height",
    "aspect-ratio",
    "resolution",
    "device-width",
    "device-height",
    "device-aspect-ratio",
    "color",
    "color-index",
    "monochrome",
];

impl MediaList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any query uses range syntax.
    pub fn has_range_syntax(&self) -> bool {
        self.0
            .iter()
            .filter_map(|query| query.condition.as_ref())
            .any(MediaCondition::has_range_syntax)
    }
}

impl MediaCondition {
    fn has_range_syntax(&self) -> bool {
        match self {
            MediaCondition::Feature(feature) => matches!(
                feature,
                MediaFeature::Range { .. } | MediaFeature::Interval { .. }
            ),
            MediaCondition::Not(inner) => inner.has_range_syntax(),
            MediaCondition::Operation { conditions, .. } => {
                conditions.iter().any(MediaCondition::has_range_syntax)
            }
            MediaCondition::Unknown(_) => false,
        }
    }

    /// Rewrite range features as `min-`/`max-` features where that is exact.
    ///
    /// Features that cannot be expressed that way are left as they are.
    pub(crate) fn lower_ranges(&mut self) {
        match self {
            MediaCondition::Feature(feature) => {
                if let Some(lowered) = lower_feature(feature) {
                    *self = lowered;
                }
            }
            MediaCondition::Not(inner) => inner.lower_ranges(),
            MediaCondition::Operation {
                operator,
                conditions,
            } => {
                let operator = *operator;
                let mut flattened = Vec::with_capacity(conditions.len());
                for mut condition in conditions.drain(..) {
                    condition.lower_ranges();
                    match condition {
                        MediaCondition::Operation {
                            operator: inner,
                            conditions: inner_conditions,
                        } if inner == operator => flattened.extend(inner_conditions),
                        condition => flattened.push(condition),
                    }
                }
                *conditions = flattened;
            }
            MediaCondition::Unknown(_) => {}
        }
    }
}

/// `name op value` as a plain feature, if it can be written exactly.
fn lower_comparison(name: &str, operator: RangeOperator, value: &TokenList) -> Option<MediaFeature> {
    let lower = name.to_ascii_lowercase();
    if !RANGE_FEATURES.contains(&lower.as_str()) {
        return None;
    }
    let (prefix, value) = match operator {
        RangeOperator::Equal => ("", value.clone()),
        RangeOperator::GreaterThanEqual => ("min-", value.clone()),
        RangeOperator::LessThanEqual => ("max-", value.clone()),
        RangeOperator::GreaterThan => ("min-", adjust(value, 0.001)?),
        RangeOperator::LessThan => ("max-", adjust(value, -0.001)?),
    };
    Some(MediaFeature::Plain {
        name: format!("{prefix}{lower}"),
        value,
    })
}

/// Nudge a single number or dimension to turn a strict bound into an inclusive one.
fn adjust(value: &TokenList, delta: f32) -> Option<TokenList> {
    let adjusted = match value.0.as_slice() {
        [ComponentValue::Number(n)] => ComponentValue::Number(n + delta),
        [ComponentValue::Dimension { value, unit }] => ComponentValue::Dimension {
            value: value + delta,
            unit: unit.clone(),
        },
        _ => return None,
    };
    Some(TokenList(vec![adjusted]))
}

fn lower_feature(feature: &MediaFeature) -> Option<MediaCondition> {
    match feature {
        MediaFeature::Range {
            name,
            operator,
            value,
        } => {
            let lowered = lower_comparison(name, *operator, value);
            if lowered.is_none() {
                tracing::debug!(feature = %name, "media range left as written");
            }
            lowered.map(MediaCondition::Feature)
        }
        MediaFeature::Interval {
            name,
            start,
            start_operator,
            end,
            end_operator,
        } => {
            // `start op name` reads as `name flip(op) start`.
            let first = lower_comparison(name, start_operator.flip(), start);
            let second = lower_comparison(name, *end_operator, end);
            match (first, second) {
                (Some(first), Some(second)) => Some(MediaCondition::Operation {
                    operator: Operator::And,
                    conditions: vec![
                        MediaCondition::Feature(first),
                        MediaCondition::Feature(second),
                    ],
                }),
                _ => {
                    tracing::debug!(feature = %name, "media interval left as written");
                    None
                }
            }
        }
        MediaFeature::Plain { .. } | MediaFeature::Boolean(_) => None,
    }
}

/// Parse a media query list from prelude tokens.
pub(crate) fn parse_media_list(
    tokens: &[Token<'_>],
    locator: &Locator<'_>,
) -> Result<MediaList, CssError> {
    let tokens = trim_whitespace(tokens);
    if tokens.is_empty() {
        return Ok(MediaList::default());
    }
    let mut queries = Vec::new();
    for part in split_top_level_commas(tokens) {
        let significant: Vec<Token<'_>> = part
            .iter()
            .filter(|t| t.kind != TokenKind::Whitespace)
            .cloned()
            .collect();
        let mut parser = MediaParser {
            tokens: part,
            significant: &significant,
            pos: 0,
            locator,
        };
        queries.push(parser.parse_query()?);
    }
    Ok(MediaList(queries))
}

struct MediaParser<'a, 'src> {
    /// The query's tokens, whitespace included, for error spans.
    tokens: &'a [Token<'src>],
    significant: &'a [Token<'src>],
    pos: usize,
    locator: &'a Locator<'a>,
}

impl<'a, 'src> MediaParser<'a, 'src> {
    fn error(&self) -> CssError {
        let span = self
            .significant
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_default();
        self.locator.error(ParseErrorKind::InvalidMediaQuery, span)
    }

    fn peek(&self) -> Option<&'a Token<'src>> {
        self.significant.get(self.pos)
    }

    fn peek_keyword(&self) -> Option<String> {
        self.peek()
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| t.name().to_ascii_lowercase())
    }

    fn parse_query(&mut self) -> Result<MediaQuery, CssError> {
        let mut query = MediaQuery {
            qualifier: None,
            media_type: None,
            condition: None,
        };

        match self.peek_keyword().as_deref() {
            Some("not") if self.significant.get(self.pos + 1).is_some_and(|t| t.kind == TokenKind::Ident) => {
                query.qualifier = Some(Qualifier::Not);
                self.pos += 1;
            }
            Some("only") => {
                query.qualifier = Some(Qualifier::Only);
                self.pos += 1;
            }
            _ => {}
        }

        match self.peek_keyword().as_deref() {
            Some("not") => {
                query.condition = Some(self.parse_condition(true)?);
            }
            Some("and" | "or" | "only" | "layer") => return Err(self.error()),
            Some(media_type) => {
                query.media_type = Some(media_type.to_string());
                self.pos += 1;
                if self.peek().is_some() {
                    if self.peek_keyword().as_deref() != Some("and") {
                        return Err(self.error());
                    }
                    self.pos += 1;
                    query.condition = Some(self.parse_condition(false)?);
                }
            }
            None => {
                if query.qualifier.is_some() {
                    return Err(self.error());
                }
                query.condition = Some(self.parse_condition(true)?);
            }
        }

        if self.peek().is_some() {
            return Err(self.error());
        }
        Ok(query)
    }

    fn parse_condition(&mut self, allow_or: bool) -> Result<MediaCondition, CssError> {
        if self.peek_keyword().as_deref() == Some("not") {
            self.pos += 1;
            let inner = self.parse_in_parens()?;
            return Ok(MediaCondition::Not(Box::new(inner)));
        }

        let first = self.parse_in_parens()?;
        let mut operator = None;
        let mut conditions = vec![first];
        while let Some(keyword) = self.peek_keyword() {
            let next = match keyword.as_str() {
                "and" => Operator::And,
                "or" if allow_or => Operator::Or,
                _ => return Err(self.error()),
            };
            if operator.is_some_and(|op| op != next) {
                return Err(self.error());
            }
            operator = Some(next);
            self.pos += 1;
            conditions.push(self.parse_in_parens()?);
        }

        match operator {
            Some(operator) => Ok(MediaCondition::Operation {
                operator,
                conditions,
            }),
            None => Ok(conditions.remove(0)),
        }
    }

    fn parse_in_parens(&mut self) -> Result<MediaCondition, CssError> {
        let Some(open) = self.peek() else {
            return Err(self.error());
        };
        let is_function = match open.kind {
            TokenKind::LParen => false,
            TokenKind::Function => true,
            _ => return Err(self.error()),
        };
        let start = self.pos;
        let mut depth = 0usize;
        let mut end = None;
        for (i, token) in self.significant.iter().enumerate().skip(self.pos) {
            match token.kind {
                TokenKind::LParen | TokenKind::Function | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(end) = end else {
            return Err(self.error());
        };
        self.pos = end + 1;

        // Re-slice the original tokens so whitespace survives in values.
        let inner = self.original_range(start, end);
        if is_function {
            return Ok(MediaCondition::Unknown(normalized_text(
                self.original_range_inclusive(start, end),
            )));
        }

        let inner_significant: Vec<Token<'src>> = inner
            .iter()
            .filter(|t| t.kind != TokenKind::Whitespace)
            .cloned()
            .collect();
        let starts_condition = match inner_significant.first() {
            Some(t) if t.kind == TokenKind::LParen => true,
            Some(t) if t.kind == TokenKind::Ident => t.name().eq_ignore_ascii_case("not"),
            _ => false,
        };
        if starts_condition {
            let mut nested = MediaParser {
                tokens: inner,
                significant: &inner_significant,
                pos: 0,
                locator: self.locator,
            };
            let condition = nested.parse_condition(true)?;
            if nested.peek().is_some() {
                return Err(nested.error());
            }
            return Ok(condition);
        }

        match self.parse_feature(inner)? {
            Some(feature) => Ok(MediaCondition::Feature(feature)),
            None => Ok(MediaCondition::Unknown(normalized_text(
                self.original_range_inclusive(start, end),
            ))),
        }
    }

    /// Original tokens strictly between significant tokens `start` and `end`.
    fn original_range(&self, start: usize, end: usize) -> &'a [Token<'src>] {
        let (from, to) = self.original_bounds(start, end);
        &self.tokens[from + 1..to]
    }

    fn original_range_inclusive(&self, start: usize, end: usize) -> &'a [Token<'src>] {
        let (from, to) = self.original_bounds(start, end);
        &self.tokens[from..=to]
    }

    fn original_bounds(&self, start: usize, end: usize) -> (usize, usize) {
        let find = |index: usize| {
            let span = self.significant[index].span;
            self.tokens
                .iter()
                .position(|t| t.span == span)
                .unwrap_or_default()
        };
        (find(start), find(end))
    }

    fn parse_feature(&self, inner: &[Token<'src>]) -> Result<Option<MediaFeature>, CssError> {
        let inner = trim_whitespace(inner);
        let significant: Vec<&Token<'src>> = inner
            .iter()
            .filter(|t| t.kind != TokenKind::Whitespace)
            .collect();

        if let [name] = significant.as_slice()
            && name.kind == TokenKind::Ident
        {
            let name = name.name();
            // `(--name)` refers to a custom media query and keeps its case.
            let name = if name.starts_with("--") {
                name.into_owned()
            } else {
                name.to_ascii_lowercase()
            };
            return Ok(Some(MediaFeature::Boolean(name)));
        }

        if significant.len() >= 2
            && significant[0].kind == TokenKind::Ident
            && significant[1].kind == TokenKind::Colon
        {
            let colon = inner
                .iter()
                .position(|t| t.kind == TokenKind::Colon)
                .unwrap_or_default();
            let value_tokens = trim_whitespace(&inner[colon + 1..]);
            if value_tokens.is_empty() {
                return Err(self.error());
            }
            let value = parse_value_tokens(value_tokens, self.locator, false)?;
            return Ok(Some(MediaFeature::Plain {
                name: significant[0].name().to_ascii_lowercase(),
                value,
            }));
        }

        // Range forms: split on comparison operators.
        let mut segments: Vec<&[Token<'src>]> = Vec::new();
        let mut operators = Vec::new();
        let mut start = 0;
        let mut i = 0;
        while i < inner.len() {
            let token = &inner[i];
            let operator = match token.delim() {
                Some('<') | Some('>') => {
                    let or_equal = inner.get(i + 1).is_some_and(|t| t.is_delim('='));
                    let op = match (token.delim(), or_equal) {
                        (Some('<'), false) => RangeOperator::LessThan,
                        (Some('<'), true) => RangeOperator::LessThanEqual,
                        (_, false) => RangeOperator::GreaterThan,
                        (_, true) => RangeOperator::GreaterThanEqual,
                    };
                    Some((op, if or_equal { 2 } else { 1 }))
                }
                Some('=') => Some((RangeOperator::Equal, 1)),
                _ => None,
            };
            if let Some((op, width)) = operator {
                segments.push(trim_whitespace(&inner[start..i]));
                operators.push(op);
                i += width;
                start = i;
            } else {
                i += 1;
            }
        }
        segments.push(trim_whitespace(&inner[start..]));

        if segments.iter().any(|s| s.is_empty()) {
            return Ok(None);
        }
        let ident = |segment: &[Token<'src>]| match segment {
            [token] if token.kind == TokenKind::Ident => Some(token.name().to_ascii_lowercase()),
            _ => None,
        };

        match (segments.as_slice(), operators.as_slice()) {
            ([left, right], [operator]) => {
                if let Some(name) = ident(left) {
                    let value = parse_value_tokens(right, self.locator, false)?;
                    Ok(Some(MediaFeature::Range {
                        name,
                        operator: *operator,
                        value,
                    }))
                } else if let Some(name) = ident(right) {
                    let value = parse_value_tokens(left, self.locator, false)?;
                    Ok(Some(MediaFeature::Range {
                        name,
                        operator: operator.flip(),
                        value,
                    }))
                } else {
                    Err(self.error())
                }
            }
            ([start, middle, end], [start_operator, end_operator]) => {
                let Some(name) = ident(middle) else {
                    return Err(self.error());
                };
                let ascending = |op: RangeOperator| {
                    matches!(op, RangeOperator::LessThan | RangeOperator::LessThanEqual)
                };
                if ascending(*start_operator) != ascending(*end_operator)
                    || *start_operator == RangeOperator::Equal
                    || *end_operator == RangeOperator::Equal
                {
                    return Err(self.error());
                }
                Ok(Some(MediaFeature::Interval {
                    name,
                    start: parse_value_tokens(start, self.locator, false)?,
                    start_operator: *start_operator,
                    end: parse_value_tokens(end, self.locator, false)?,
                    end_operator: *end_operator,
                }))
            }
            _ => Ok(None),
        }
    }
}

impl ToCss for MediaList {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        for (i, query) in self.0.iter().enumerate() {
            if i > 0 {
                dest.delim(',', false)?;
            }
            query.to_css(dest)?;
        }
        Ok(())
    }
}

impl ToCss for MediaQuery {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        match self.qualifier {
            Some(Qualifier::Only) => dest.write_str("only ")?,
            Some(Qualifier::Not) => dest.write_str("not ")?,
            None => {}
        }
        if let Some(media_type) = &self.media_type {
            dest.write_ident(media_type)?;
            if self.condition.is_some() {
                dest.write_str(" and ")?;
            }
        }
        match &self.condition {
            // `screen and (a) or (b)` does not parse.
            Some(
                condition @ MediaCondition::Operation {
                    operator: Operator::Or,
                    ..
                },
            ) if self.media_type.is_some() => condition.write_nested(dest)?,
            Some(condition) => condition.to_css(dest)?,
            None => {}
        }
        Ok(())
    }
}

impl MediaCondition {
    fn write_nested(&self, dest: &mut Printer<'_>) -> fmt::Result {
        match self {
            MediaCondition::Operation { .. } | MediaCondition::Not(_) => {
                dest.write_char('(')?;
                self.to_css(dest)?;
                dest.write_char(')')
            }
            _ => self.to_css(dest),
        }
    }
}

impl ToCss for MediaCondition {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        match self {
            MediaCondition::Feature(feature) => feature.to_css(dest),
            MediaCondition::Not(inner) => {
                dest.write_str("not ")?;
                inner.write_nested(dest)
            }
            MediaCondition::Operation {
                operator,
                conditions,
            } => {
                let keyword = match operator {
                    Operator::And => " and ",
                    Operator::Or => " or ",
                };
                for (i, condition) in conditions.iter().enumerate() {
                    if i > 0 {
                        dest.write_str(keyword)?;
                    }
                    condition.write_nested(dest)?;
                }
                Ok(())
            }
            MediaCondition::Unknown(text) => dest.write_str(text),
        }
    }
}

impl ToCss for MediaFeature {
    fn to_css(&self, dest: &mut Printer<'_>) -> fmt::Result {
        dest.write_char('(')?;
        match self {
            MediaFeature::Plain { name, value } => {
                dest.write_ident(name)?;
                dest.write_char(':')?;
                dest.whitespace()?;
                value.to_css(dest)?;
            }
            MediaFeature::Boolean(name) => dest.write_ident(name)?,
            MediaFeature::Range {
                name,
                operator,
                value,
            } => {
                dest.write_ident(name)?;
                dest.whitespace()?;
                dest.write_str(operator.as_str())?;
                dest.whitespace()?;
                value.to_css(dest)?;
            }
            MediaFeature::Interval {
                name,
                start,
                start_operator,
                end,
                end_operator,
            } => {
                start.to_css(dest)?;
                dest.whitespace()?;
                dest.write_str(start_operator.as_str())?;
                dest.whitespace()?;
                dest.write_ident(name)?;
                dest.whitespace()?;
                dest.write_str(end_operator.as_str())?;
                dest.whitespace()?;
                end.to_css(dest)?;
            }
        }
        dest.write_char(')')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tincture_tokenizer::Tokenizer;

    fn parse(source: &str) -> Result<MediaList, CssError> {
        let tokens: Vec<_> = Tokenizer::new(source).collect();
        let locator = Locator::new("test.css", source);
        parse_media_list(&tokens, &locator)
    }

    fn roundtrip(source: &str) -> String {
        parse(source).unwrap().to_css_string()
    }

    #[test]
    fn test_media_types_and_features() {
        assert_eq!(roundtrip("screen"), "screen");
        assert_eq!(roundtrip("screen , print"), "screen, print");
        assert_eq!(
            roundtrip("only screen and (min-width:600px)"),
            "only screen and (min-width: 600px)"
        );
        assert_eq!(
            roundtrip("not print and (color)"),
            "not print and (color)"
        );
        assert_eq!(
            roundtrip("(min-width: 600px) and (max-width: 900px)"),
            "(min-width: 600px) and (max-width: 900px)"
        );
        assert_eq!(
            roundtrip("(aspect-ratio: 16/9)"),
            "(aspect-ratio: 16/9)"
        );
    }

    #[test]
    fn test_nested_conditions() {
        assert_eq!(
            roundtrip("not ((color) or (hover))"),
            "not ((color) or (hover))"
        );
        assert_eq!(
            roundtrip("(color) and ((hover) or (pointer: fine))"),
            "(color) and ((hover) or (pointer: fine))"
        );
    }

    #[test]
    fn test_range_forms() {
        assert_eq!(roundtrip("(width >= 600px)"), "(width >= 600px)");
        assert_eq!(roundtrip("(600px <= width)"), "(width >= 600px)");
        assert_eq!(
            roundtrip("(400px < width <= 700px)"),
            "(400px < width <= 700px)"
        );
    }

    #[test]
    fn test_lower_ranges() {
        let mut list = parse("(width >= 600px), (400px < width <= 700px), (width < 10em)").unwrap();
        assert!(list.has_range_syntax());
        for query in &mut list.0 {
            if let Some(condition) = &mut query.condition {
                condition.lower_ranges();
            }
        }
        assert!(!list.has_range_syntax());
        assert_eq!(
            list.to_css_string(),
            "(min-width: 600px), (min-width: 400.001px) and (max-width: 700px), (max-width: 9.999em)"
        );
    }

    #[test]
    fn test_unlowerable_range_kept() {
        let mut list = parse("(hover = hover)").unwrap();
        if let Some(condition) = &mut list.0[0].condition {
            condition.lower_ranges();
        }
        assert!(list.has_range_syntax());
    }

    #[test]
    fn test_invalid_queries() {
        for source in ["screen and", "and (color)", "(color) and (hover) or (pointer)", "screen print"] {
            assert!(parse(source).is_err(), "{source:?} should fail");
        }
    }
}
