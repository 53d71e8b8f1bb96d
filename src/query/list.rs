//! Parameters of a list request.

use serde::Deserialize;

use super::error::QueryError;
use super::expr::{Ordering, Predicate};
use super::search::{self, SearchRegistry};
use super::sort::{self, SortRegistry};
use super::sql::Page;
use crate::config::HenhouseConfig;

fn default_true() -> bool {
    true
}

/// `search`, `sort` and paging of one list call.
///
/// Deserializes from query strings or JSON. Only the camelCase
/// `defaultSortEnabled` key is recognized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(rename = "defaultSortEnabled", default = "default_true")]
    pub default_sort_enabled: bool,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            search: None,
            sort: None,
            default_sort_enabled: true,
            limit: None,
            offset: None,
        }
    }
}

impl ListParams {
    pub fn get_filter_args<C>(
        &self,
        registry: &SearchRegistry<C>,
        ctx: &C,
    ) -> Result<Vec<Predicate>, QueryError> {
        search::get_filter_args(registry, self.search.as_deref(), ctx)
    }

    pub fn get_order_by_args(&self, registry: &SortRegistry) -> Result<Ordering, QueryError> {
        sort::get_order_by_args(registry, self.sort.as_deref(), self.default_sort_enabled)
    }

    /// Requested page, limit clamped to `1..=max_page_size`.
    pub fn page(&self, config: &HenhouseConfig) -> Page {
        let limit = self
            .limit
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size.max(1));
        Page {
            limit,
            offset: self.offset.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::expr::{standard_sort, Direction, OrderTerm};
    use crate::query::sort::{DefaultDescriptor, SortConfig};

    fn story_sorts() -> SortRegistry {
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

    fn story_searches() -> SearchRegistry<()> {
        let mut registry: SearchRegistry<()> = SearchRegistry::new("story");
        registry
            .register("title_exact", |_, raw| {
                Ok(Predicate::iexact("stories.title", raw))
            })
            .unwrap();
        registry
    }

    #[test]
    fn test_default_sort_enabled_key() {
        let params: ListParams = serde_json::from_str("{}").unwrap();
        assert!(params.default_sort_enabled);

        let params: ListParams = serde_json::from_str(r#"{"defaultSortEnabled": false}"#).unwrap();
        assert!(!params.default_sort_enabled);

        // snake_case is not the wire name
        let params: ListParams = serde_json::from_str(r#"{"default_sort_enabled": false}"#).unwrap();
        assert!(params.default_sort_enabled);
    }

    #[test]
    fn test_get_filter_args() {
        let registry = story_searches();
        assert!(ListParams::default()
            .get_filter_args(&registry, &())
            .unwrap()
            .is_empty());

        let params = ListParams {
            search: Some(r#"title_exact:"test""#.to_string()),
            ..Default::default()
        };
        assert_eq!(
            params.get_filter_args(&registry, &()).unwrap(),
            vec![Predicate::iexact("stories.title", "test")]
        );
    }

    #[test]
    fn test_get_order_by_args() {
        let registry = story_sorts();
        assert_eq!(
            ListParams::default().get_order_by_args(&registry).unwrap(),
            vec![OrderTerm {
                expr: standard_sort("stories.uuid"),
                direction: Direction::Asc
            }]
        );

        let params = ListParams {
            sort: Some("title:DESC".to_string()),
            ..Default::default()
        };
        assert_eq!(
            params.get_order_by_args(&registry).unwrap(),
            vec![
                OrderTerm {
                    expr: standard_sort("stories.title"),
                    direction: Direction::Desc
                },
                OrderTerm {
                    expr: standard_sort("stories.uuid"),
                    direction: Direction::Asc
                },
            ]
        );
    }

    #[test]
    fn test_page_clamps_limit() {
        let config = HenhouseConfig::default();

        let page = ListParams::default().page(&config);
        assert_eq!(page.limit, config.default_page_size);
        assert_eq!(page.offset, 0);

        let params = ListParams {
            limit: Some(1_000_000),
            offset: Some(20),
            ..Default::default()
        };
        let page = params.page(&config);
        assert_eq!(page.limit, config.max_page_size);
        assert_eq!(page.offset, 20);

        let params = ListParams {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(params.page(&config).limit, 1);
    }
}
