//! Error types for the search/sort DSL.

use thiserror::Error;

/// A raw value could not be coerced to the requested type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert '{raw}': expected {expected}")]
pub struct ConversionError {
    /// The offending raw input
    pub raw: String,
    /// Human readable description of the accepted shape
    pub expected: &'static str,
}

impl ConversionError {
    pub fn new(raw: impl Into<String>, expected: &'static str) -> Self {
        Self {
            raw: raw.into(),
            expected,
        }
    }
}

/// Errors raised while turning `search`/`sort` strings into predicates and
/// orderings. Every variant is the caller's fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A search value failed type conversion
    #[error("invalid value for search field '{field}': {source}")]
    Conversion {
        field: String,
        #[source]
        source: ConversionError,
    },

    /// The search string does not follow the `field:value` grammar
    #[error("malformed search at position {position}: {message}")]
    MalformedSearch { position: usize, message: String },

    /// A sort segment is not `field` or `field:ASC|DESC`
    #[error("malformed sort '{segment}': {message}")]
    MalformedSort { segment: String, message: String },

    /// Search field not registered for the resource
    #[error("unknown search field '{field}' for {resource}")]
    UnknownSearchField { resource: String, field: String },

    /// Sort field not registered for the resource
    #[error("unknown sort field '{field}' for {resource}")]
    UnknownSortField { resource: String, field: String },

    /// Resource type name that has no registries
    #[error("unknown resource '{0}'")]
    UnknownResource(String),
}

impl QueryError {
    /// HTTP status the surrounding API layer should answer with.
    pub fn status_code(&self) -> u16 {
        422
    }
}

/// Errors raised while building registries at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("empty name registered in {registry} registry")]
    EmptyName { registry: String },

    #[error("'{name}' registered twice in {registry} registry")]
    Duplicate { registry: String, name: String },
}
