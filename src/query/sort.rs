//! Sort string parser and ordering compiler.
//!
//! Parses sorts like `title:DESC,createdAt` against a resource's
//! [`SortRegistry`], appends the registry's default tiebreakers and flattens
//! everything into ordering terms.

use std::collections::BTreeMap;
use std::str::FromStr;

use super::error::{QueryError, RegistryError};
use super::expr::{Direction, OrderExpr, OrderTerm, Ordering};

impl FromStr for Direction {
    type Err = ();

    /// `ASC` or `DESC`, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Direction::Desc)
        } else {
            Err(())
        }
    }
}

/// One `field[:DIR]` segment of a sort string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortToken {
    pub field: String,
    pub direction: Direction,
}

/// Marks a field that is appended automatically to keep pagination stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultDescriptor {
    /// Lower priorities are appended first
    pub priority: i32,
    pub direction: Direction,
}

impl DefaultDescriptor {
    pub fn new(priority: i32, direction: Direction) -> Self {
        Self {
            priority,
            direction,
        }
    }
}

/// How one sort field orders rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortConfig {
    /// Expanded in order, all with the direction requested for the field
    pub expressions: Vec<OrderExpr>,
    pub default: Option<DefaultDescriptor>,
}

impl SortConfig {
    pub fn new(expressions: Vec<OrderExpr>, default: Option<DefaultDescriptor>) -> Self {
        Self {
            expressions,
            default,
        }
    }
}

/// Sort fields of one resource type.
#[derive(Debug, Clone)]
pub struct SortRegistry {
    resource: &'static str,
    configs: BTreeMap<&'static str, SortConfig>,
}

impl SortRegistry {
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            configs: BTreeMap::new(),
        }
    }

    /// Register a field. Names must be non-empty and unique.
    pub fn register(
        &mut self,
        field: &'static str,
        config: SortConfig,
    ) -> Result<&mut Self, RegistryError> {
        if field.is_empty() {
            return Err(RegistryError::EmptyName {
                registry: format!("{} sort", self.resource),
            });
        }
        if self.configs.contains_key(field) {
            return Err(RegistryError::Duplicate {
                registry: format!("{} sort", self.resource),
                name: field.to_string(),
            });
        }

        self.configs.insert(field, config);
        Ok(self)
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }

    pub fn get(&self, field: &str) -> Option<&SortConfig> {
        self.configs.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.configs.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Default-bearing fields by ascending priority, then name.
    pub fn defaults(&self) -> Vec<(&'static str, DefaultDescriptor)> {
        let mut defaults: Vec<_> = self
            .configs
            .iter()
            .filter_map(|(field, config)| config.default.map(|d| (*field, d)))
            .collect();
        defaults.sort_by_key(|(_, d)| d.priority);
        defaults
    }
}

/// Split a sort string into tokens. `None` or blank yields no tokens.
pub fn parse_sort(sort: Option<&str>) -> Result<Vec<SortToken>, QueryError> {
    let Some(sort) = sort.filter(|s| !s.trim().is_empty()) else {
        return Ok(Vec::new());
    };

    sort.split(',').map(parse_segment).collect()
}

fn parse_segment(segment: &str) -> Result<SortToken, QueryError> {
    let malformed = |message: &str| QueryError::MalformedSort {
        segment: segment.to_string(),
        message: message.to_string(),
    };

    let trimmed = segment.trim();
    let (field, direction) = match trimmed.split_once(':') {
        Some((field, dir)) => {
            let direction = dir
                .trim()
                .parse::<Direction>()
                .map_err(|_| malformed("direction must be ASC or DESC"))?;
            (field.trim(), direction)
        }
        None => (trimmed, Direction::Asc),
    };

    if field.is_empty() {
        return Err(malformed("missing field name"));
    }

    Ok(SortToken {
        field: field.to_string(),
        direction,
    })
}

/// Compile `sort` into ordering terms for `registry`.
///
/// With `default_sort_enabled`, every default-bearing field not named
/// explicitly is appended, so the result ends in a total order.
pub fn get_order_by_args(
    registry: &SortRegistry,
    sort: Option<&str>,
    default_sort_enabled: bool,
) -> Result<Ordering, QueryError> {
    let mut fields: Vec<(&SortConfig, Direction, &str)> = Vec::new();

    let tokens = parse_sort(sort)?;
    for token in &tokens {
        let config = registry
            .get(&token.field)
            .ok_or_else(|| QueryError::UnknownSortField {
                resource: registry.resource().to_string(),
                field: token.field.clone(),
            })?;
        fields.push((config, token.direction, token.field.as_str()));
    }

    if default_sort_enabled {
        for (field, descriptor) in registry.defaults() {
            if tokens.iter().any(|t| t.field == field) {
                continue;
            }
            if let Some(config) = registry.get(field) {
                fields.push((config, descriptor.direction, field));
            }
        }
    }

    tracing::debug!(
        "Sort for {}: {:?}",
        registry.resource(),
        fields.iter().map(|(_, dir, field)| (*field, *dir)).collect::<Vec<_>>()
    );

    Ok(fields
        .into_iter()
        .flat_map(|(config, direction, _)| {
            config.expressions.iter().map(move |expr| OrderTerm {
                expr: expr.clone(),
                direction,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::expr::{nocase_sort, related_sort, standard_sort};

    fn story_registry() -> SortRegistry {
        let mut registry = SortRegistry::new("story");
        registry
            .register(
                "uuid",
                SortConfig::new(
                    vec![standard_sort("stories.uuid")],
                    Some(DefaultDescriptor::new(0, Direction::Asc)),
                ),
            )
            .unwrap()
            .register("title", SortConfig::new(vec![standard_sort("stories.title")], None))
            .unwrap();
        registry
    }

    fn term(column: &'static str, direction: Direction) -> OrderTerm {
        OrderTerm {
            expr: standard_sort(column),
            direction,
        }
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("ASC".parse::<Direction>(), Ok(Direction::Asc));
        assert_eq!("desc".parse::<Direction>(), Ok(Direction::Desc));
        assert_eq!("Desc".parse::<Direction>(), Ok(Direction::Desc));
        assert!("down".parse::<Direction>().is_err());
    }

    #[test]
    fn test_parse_sort() {
        assert!(parse_sort(None).unwrap().is_empty());
        assert!(parse_sort(Some("")).unwrap().is_empty());
        assert!(parse_sort(Some("  ")).unwrap().is_empty());

        assert_eq!(
            parse_sort(Some("title:desc, createdAt,uuid:ASC")).unwrap(),
            vec![
                SortToken {
                    field: "title".to_string(),
                    direction: Direction::Desc
                },
                SortToken {
                    field: "createdAt".to_string(),
                    direction: Direction::Asc
                },
                SortToken {
                    field: "uuid".to_string(),
                    direction: Direction::Asc
                },
            ]
        );
    }

    #[test]
    fn test_parse_sort_malformed() {
        for bad in ["title:UP", "title:", ":ASC", "title,,uuid", "title:DESC,"] {
            let err = parse_sort(Some(bad)).unwrap_err();
            assert!(
                matches!(err, QueryError::MalformedSort { .. }),
                "{bad} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_default_only() {
        let registry = story_registry();
        assert_eq!(
            get_order_by_args(&registry, None, true).unwrap(),
            vec![term("stories.uuid", Direction::Asc)]
        );
        assert_eq!(
            get_order_by_args(&registry, Some(""), true).unwrap(),
            vec![term("stories.uuid", Direction::Asc)]
        );
    }

    #[test]
    fn test_explicit_then_default_tiebreak() {
        let registry = story_registry();
        assert_eq!(
            get_order_by_args(&registry, Some("title:DESC"), true).unwrap(),
            vec![
                term("stories.title", Direction::Desc),
                term("stories.uuid", Direction::Asc),
            ]
        );
    }

    #[test]
    fn test_default_disabled() {
        let registry = story_registry();
        assert!(get_order_by_args(&registry, None, false).unwrap().is_empty());
        assert_eq!(
            get_order_by_args(&registry, Some("title:DESC"), false).unwrap(),
            vec![term("stories.title", Direction::Desc)]
        );
    }

    #[test]
    fn test_explicit_default_field_not_repeated() {
        let registry = story_registry();
        assert_eq!(
            get_order_by_args(&registry, Some("uuid:DESC,title"), true).unwrap(),
            vec![
                term("stories.uuid", Direction::Desc),
                term("stories.title", Direction::Asc),
            ]
        );
    }

    #[test]
    fn test_defaults_follow_priority() {
        let mut registry = SortRegistry::new("chapter");
        registry
            .register(
                "uuid",
                SortConfig::new(
                    vec![standard_sort("chapters.uuid")],
                    Some(DefaultDescriptor::new(1, Direction::Asc)),
                ),
            )
            .unwrap()
            .register(
                "index",
                SortConfig::new(
                    vec![standard_sort("chapters.idx")],
                    Some(DefaultDescriptor::new(0, Direction::Desc)),
                ),
            )
            .unwrap();

        assert_eq!(
            get_order_by_args(&registry, None, true).unwrap(),
            vec![
                term("chapters.idx", Direction::Desc),
                term("chapters.uuid", Direction::Asc),
            ]
        );
    }

    #[test]
    fn test_multi_expression_field() {
        let mut registry = story_registry();
        registry
            .register(
                "category",
                SortConfig::new(
                    vec![
                        related_sort(
                            "categories",
                            "sort_key",
                            "name",
                            "stories.category_name",
                        ),
                        nocase_sort("stories.category_name"),
                    ],
                    None,
                ),
            )
            .unwrap();

        let ordering = get_order_by_args(&registry, Some("category:DESC"), true).unwrap();
        assert_eq!(ordering.len(), 3);
        assert!(ordering[..2].iter().all(|t| t.direction == Direction::Desc));
        assert_eq!(ordering[2], term("stories.uuid", Direction::Asc));
    }

    #[test]
    fn test_unknown_field() {
        let registry = story_registry();
        let err = get_order_by_args(&registry, Some("bogus"), true).unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownSortField {
                resource: "story".to_string(),
                field: "bogus".to_string(),
            }
        );
    }

    #[test]
    fn test_idempotent() {
        let registry = story_registry();
        assert_eq!(
            get_order_by_args(&registry, Some("title:desc"), true).unwrap(),
            get_order_by_args(&registry, Some("title:desc"), true).unwrap()
        );
    }
}
