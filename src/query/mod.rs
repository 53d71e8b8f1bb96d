//! Query module - search/sort parsing, type conversion, and SQL generation.
//!
//! This module provides the compact query DSL used by every list endpoint,
//! enabling requests like `search=title:"red dragon" isPublished:true` and
//! `sort=title:DESC,createdAt`.

pub mod convert;
pub mod error;
pub mod expr;
pub mod list;
pub mod search;
pub mod sort;
pub mod sql;

pub use error::{ConversionError, QueryError, RegistryError};
pub use expr::{Direction, OrderExpr, OrderTerm, Ordering, Predicate, Subquery, TimeRange, Timestamp, Value};
pub use list::ListParams;
pub use search::{get_filter_args, SearchRegistry, SearchToken};
pub use sort::{get_order_by_args, DefaultDescriptor, SortConfig, SortRegistry, SortToken};
pub use sql::{build_count, build_select, Page, SqlParam};
