//! `@custom-media` substitution.
//!
//! Top-level definitions are collected, every `(--name)` reference in an
//! `@media` or `@import` query is replaced with the definition's query, and
//! the definitions are removed.

use std::collections::HashMap;

use tincture_tokenizer::Span;
use tracing::debug;

use crate::error::{CssError, TransformErrorKind};
use crate::media_query::{MediaCondition, MediaFeature, MediaList, MediaQuery};
use crate::rules::{CssRule, CssRuleList};
use crate::visitor::{VisitMut, walk_rule};

/// Substitute and drop the `@custom-media` rules in `rules`.
///
/// A later definition of the same name replaces an earlier one.
pub(crate) fn resolve_custom_media(rules: &mut CssRuleList, filename: &str) -> Result<(), CssError> {
    let mut definitions = HashMap::new();
    rules.0.retain(|rule| match rule {
        CssRule::CustomMedia(rule) => {
            definitions.insert(rule.name.clone(), rule.query.clone());
            false
        }
        _ => true,
    });
    debug!(count = definitions.len(), "collected custom media");

    Substitute {
        definitions: &definitions,
        filename,
    }
    .visit_rule_list(rules)
}

struct Substitute<'a> {
    definitions: &'a HashMap<String, MediaList>,
    filename: &'a str,
}

fn reference(query: &MediaQuery) -> Option<&str> {
    match query {
        MediaQuery {
            qualifier: None,
            media_type: None,
            condition: Some(MediaCondition::Feature(MediaFeature::Boolean(name))),
        } if name.starts_with("--") => Some(name),
        _ => None,
    }
}

impl Substitute<'_> {
    /// The fully substituted query `name` stands for. `stack` holds the
    /// names being expanded.
    fn lookup(&self, name: &str, stack: &mut Vec<String>) -> Result<MediaList, TransformErrorKind> {
        if stack.iter().any(|entered| entered == name) {
            return Err(TransformErrorKind::CircularCustomMedia(name.to_string()));
        }
        let definition = self
            .definitions
            .get(name)
            .ok_or_else(|| TransformErrorKind::UndefinedCustomMedia(name.to_string()))?;
        stack.push(name.to_string());
        let resolved = self.list(definition, stack);
        stack.pop();
        resolved
    }

    fn list(&self, list: &MediaList, stack: &mut Vec<String>) -> Result<MediaList, TransformErrorKind> {
        let mut queries = Vec::with_capacity(list.0.len());
        for query in &list.0 {
            // A query that is only a reference takes every query of the definition.
            if let Some(name) = reference(query) {
                queries.extend(self.lookup(name, stack)?.0);
                continue;
            }
            let mut query = query.clone();
            if let Some(condition) = &mut query.condition {
                self.condition(condition, stack)?;
            }
            queries.push(query);
        }
        Ok(MediaList(queries))
    }

    fn condition(
        &self,
        condition: &mut MediaCondition,
        stack: &mut Vec<String>,
    ) -> Result<(), TransformErrorKind> {
        match condition {
            MediaCondition::Feature(MediaFeature::Boolean(name)) if name.starts_with("--") => {
                let name = name.clone();
                let resolved = self.lookup(&name, stack)?;
                // Inside a condition only a bare condition can stand in.
                match resolved.0.as_slice() {
                    [
                        MediaQuery {
                            qualifier: None,
                            media_type: None,
                            condition: Some(inner),
                        },
                    ] => *condition = inner.clone(),
                    _ => return Err(TransformErrorKind::InvalidCustomMedia(name)),
                }
            }
            MediaCondition::Not(inner) => self.condition(inner, stack)?,
            MediaCondition::Operation { conditions, .. } => {
                for condition in conditions {
                    self.condition(condition, stack)?;
                }
            }
            MediaCondition::Feature(_) | MediaCondition::Unknown(_) => {}
        }
        Ok(())
    }
}

impl VisitMut for Substitute<'_> {
    type Error = CssError;

    fn visit_rule(&mut self, rule: &mut CssRule) -> Result<(), CssError> {
        let loc = rule.loc();
        let media = match rule {
            CssRule::Media(rule) => Some(&mut rule.query),
            CssRule::Import(rule) => Some(&mut rule.media),
            _ => None,
        };
        if let Some(media) = media {
            *media = self.list(media, &mut Vec::new()).map_err(|kind| {
                CssError::transform(kind).with_location(self.filename, loc, Span::default())
            })?;
        }
        walk_rule(self, rule)
    }
}
