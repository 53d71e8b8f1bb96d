//! Search string parser.
//!
//! Parses searches like `title:dragon author:"Jane Doe"` with the pest
//! grammar in `search.pest`, then turns every term into a predicate through
//! the resource's [`SearchRegistry`].

use std::collections::BTreeMap;
use std::fmt;

use pest::Parser;
use pest_derive::Parser;

use super::error::{ConversionError, QueryError, RegistryError};
use super::expr::Predicate;

#[derive(Parser)]
#[grammar = "query/search.pest"]
struct SearchGrammar;

/// One `field:value` term of a search string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchToken {
    pub field: String,
    /// Value with quotes and escapes removed; empty for `field:`
    pub raw_value: String,
}

/// Split a search string into its terms, in input order.
///
/// # Examples
///
/// ```
/// use henhouse::query::search::tokenize;
///
/// let tokens = tokenize(r#"title:"red dragon" isPublished:true"#).unwrap();
/// assert_eq!(tokens.len(), 2);
/// assert_eq!(tokens[0].raw_value, "red dragon");
/// ```
pub fn tokenize(input: &str) -> Result<Vec<SearchToken>, QueryError> {
    let mut pairs = SearchGrammar::parse(Rule::search, input).map_err(malformed)?;
    let Some(search) = pairs.next() else {
        return Ok(Vec::new());
    };

    let mut tokens = Vec::new();
    for term in search.into_inner() {
        if term.as_rule() != Rule::term {
            continue;
        }

        let mut field = String::new();
        let mut raw_value = String::new();
        for part in term.into_inner() {
            match part.as_rule() {
                Rule::field => field = part.as_str().to_string(),
                Rule::bare => raw_value = unescape(part.as_str()),
                Rule::quoted => {
                    raw_value = part
                        .into_inner()
                        .next()
                        .map(|inner| unescape(inner.as_str()))
                        .unwrap_or_default();
                }
                _ => {}
            }
        }

        tokens.push(SearchToken { field, raw_value });
    }

    Ok(tokens)
}

fn malformed(error: pest::error::Error<Rule>) -> QueryError {
    let position = match error.location {
        pest::error::InputLocation::Pos(pos) => pos,
        pest::error::InputLocation::Span((start, _)) => start,
    };

    let error = error.renamed_rules(|rule| match rule {
        Rule::field => "field name".to_string(),
        Rule::search | Rule::term => "field:value term".to_string(),
        Rule::quoted | Rule::quoted_inner => "quoted value".to_string(),
        Rule::bare => "value".to_string(),
        Rule::EOI => "end of search".to_string(),
        other => format!("{:?}", other),
    });

    QueryError::MalformedSearch {
        position,
        message: error.variant.message().into_owned(),
    }
}

/// `\x` becomes `x`.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Builds the predicate for one search field from its raw value.
pub type SearchFn<C> = Box<dyn Fn(&C, &str) -> Result<Predicate, ConversionError> + Send + Sync>;

/// Search fields of one resource type.
///
/// `C` is the per-request context handed through to every function.
pub struct SearchRegistry<C> {
    resource: &'static str,
    fields: BTreeMap<&'static str, SearchFn<C>>,
}

impl<C> SearchRegistry<C> {
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            fields: BTreeMap::new(),
        }
    }

    /// Register a field. Names must be non-empty and unique.
    pub fn register<F>(&mut self, field: &'static str, f: F) -> Result<&mut Self, RegistryError>
    where
        F: Fn(&C, &str) -> Result<Predicate, ConversionError> + Send + Sync + 'static,
    {
        if field.is_empty() {
            return Err(RegistryError::EmptyName {
                registry: format!("{} search", self.resource),
            });
        }
        if self.fields.contains_key(field) {
            return Err(RegistryError::Duplicate {
                registry: format!("{} search", self.resource),
                name: field.to_string(),
            });
        }

        self.fields.insert(field, Box::new(f));
        Ok(self)
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }

    pub fn get(&self, field: &str) -> Option<&SearchFn<C>> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<C> fmt::Debug for SearchRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchRegistry")
            .field("resource", &self.resource)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Parse `search` into predicates to be ANDed by the caller.
///
/// `None` means no filtering. Repeated fields each contribute a predicate.
pub fn get_filter_args<C>(
    registry: &SearchRegistry<C>,
    search: Option<&str>,
    ctx: &C,
) -> Result<Vec<Predicate>, QueryError> {
    let Some(search) = search else {
        return Ok(Vec::new());
    };

    let tokens = tokenize(search)?;
    tracing::debug!(
        "Search for {}: {} term(s) from '{}'",
        registry.resource(),
        tokens.len(),
        search
    );

    tokens
        .into_iter()
        .map(|token| {
            let f = registry
                .get(&token.field)
                .ok_or_else(|| QueryError::UnknownSearchField {
                    resource: registry.resource().to_string(),
                    field: token.field.clone(),
                })?;

            f(ctx, &token.raw_value).map_err(|source| QueryError::Conversion {
                field: token.field,
                source,
            })
        })
        .collect()
}
