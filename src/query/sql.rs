//! SQL builder for predicate and ordering trees.
//!
//! Converts predicates into parameterized SQL WHERE clauses and orderings into
//! ORDER BY clauses for SQLite. Uses prepared statement parameters to prevent
//! SQL injection; only the static column names from the registries are
//! inlined.

use rusqlite::types::ToSqlOutput;
use rusqlite::ToSql;

use super::expr::{OrderExpr, OrderTerm, Predicate, Subquery, TimeRange, Value};

/// SQL parameter value for prepared statements.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Text parameter (strings, patterns, UUIDs)
    Text(String),
    /// Integer parameter (timestamps, booleans, limits)
    Integer(i64),
}

impl From<&Value> for SqlParam {
    fn from(value: &Value) -> Self {
        match value {
            Value::Text(s) => SqlParam::Text(s.clone()),
            Value::Integer(i) => SqlParam::Integer(*i),
            Value::Bool(b) => SqlParam::Integer(*b as i64),
            Value::Uuid(u) => SqlParam::Text(u.hyphenated().to_string()),
            Value::Timestamp(t) => SqlParam::Integer(t.timestamp()),
        }
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlParam::Text(s) => s.to_sql(),
            SqlParam::Integer(i) => i.to_sql(),
        }
    }
}

/// Limit and offset of one page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

/// Accumulates parameters in placeholder order while rendering SQL.
#[derive(Debug, Default)]
struct SqlWriter {
    params: Vec<SqlParam>,
}

impl SqlWriter {
    fn bind(&mut self, param: SqlParam) -> &'static str {
        self.params.push(param);
        "?"
    }

    fn conjunction(&mut self, predicates: &[Predicate]) -> String {
        if predicates.is_empty() {
            return "1 = 1".to_string();
        }
        predicates
            .iter()
            .map(|p| self.predicate(p))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn predicate(&mut self, predicate: &Predicate) -> String {
        match predicate {
            Predicate::Compare { column, op, value } => {
                format!("{} {} {}", column, op.to_sql(), self.bind(value.into()))
            }
            Predicate::Contains { column, needle } => {
                let pattern = format!("%{}%", escape_like(needle));
                format!("{} LIKE {} ESCAPE '\\'", column, self.bind(SqlParam::Text(pattern)))
            }
            Predicate::IExact { column, value } => {
                format!(
                    "{} = {} COLLATE NOCASE",
                    column,
                    self.bind(SqlParam::Text(value.clone()))
                )
            }
            Predicate::In { column, values } => {
                if values.is_empty() {
                    return "0 = 1".to_string();
                }
                let placeholders = values
                    .iter()
                    .map(|v| self.bind(v.into()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} IN ({})", column, placeholders)
            }
            Predicate::Within { column, range } => self.within(column, range),
            Predicate::IsNull { column } => format!("{} IS NULL", column),
            Predicate::ColumnEq { left, right } => format!("{} = {}", left, right),
            Predicate::InSubquery { column, subquery } => {
                format!("{} IN ({})", column, self.subquery(subquery))
            }
            Predicate::Exists(subquery) => format!("EXISTS ({})", self.subquery(subquery)),
            Predicate::And(predicates) => format!("({})", self.conjunction(predicates)),
            Predicate::Or(predicates) => {
                if predicates.is_empty() {
                    return "0 = 1".to_string();
                }
                let parts = predicates
                    .iter()
                    .map(|p| self.predicate(p))
                    .collect::<Vec<_>>();
                format!("({})", parts.join(" OR "))
            }
            Predicate::Not(inner) => format!("NOT ({})", self.predicate(inner)),
        }
    }

    fn within(&mut self, column: &str, range: &TimeRange) -> String {
        match (range.start, range.end) {
            (Some(start), Some(end)) => format!(
                "{} BETWEEN {} AND {}",
                column,
                self.bind(SqlParam::Integer(start.timestamp())),
                self.bind(SqlParam::Integer(end.timestamp()))
            ),
            (Some(start), None) => format!(
                "{} >= {}",
                column,
                self.bind(SqlParam::Integer(start.timestamp()))
            ),
            (None, Some(end)) => format!(
                "{} <= {}",
                column,
                self.bind(SqlParam::Integer(end.timestamp()))
            ),
            (None, None) => format!("{} IS NOT NULL", column),
        }
    }

    fn subquery(&mut self, subquery: &Subquery) -> String {
        format!(
            "SELECT {} FROM {} WHERE {}",
            subquery.select,
            subquery.from,
            self.conjunction(&subquery.filter)
        )
    }
}

/// Build a WHERE clause (without the keyword) from ANDed predicates.
///
/// Returns `None` when there is nothing to filter on.
pub fn build_where(predicates: &[Predicate]) -> Option<(String, Vec<SqlParam>)> {
    if predicates.is_empty() {
        return None;
    }
    let mut writer = SqlWriter::default();
    let sql = writer.conjunction(predicates);
    Some((sql, writer.params))
}

/// Build an ORDER BY clause (without the keywords).
pub fn build_order_by(ordering: &[OrderTerm]) -> Option<String> {
    if ordering.is_empty() {
        return None;
    }
    Some(
        ordering
            .iter()
            .map(|term| format!("{} {}", order_expr(&term.expr), term.direction.to_sql()))
            .collect::<Vec<_>>()
            .join(", "),
    )
}

fn order_expr(expr: &OrderExpr) -> String {
    match expr {
        OrderExpr::Column {
            column,
            case_insensitive: false,
        } => column.to_string(),
        OrderExpr::Column {
            column,
            case_insensitive: true,
        } => format!("{} COLLATE NOCASE", column),
        OrderExpr::Related {
            table,
            column,
            key,
            foreign_key,
        } => format!(
            "(SELECT {table}.{column} FROM {table} WHERE {table}.{key} = {foreign_key})"
        ),
    }
}

/// Build a complete paginated SELECT.
///
/// Returns a tuple of (SQL SELECT statement, parameters).
/// The statement uses `?` placeholders for prepared statement binding.
///
/// # Examples
///
/// ```
/// use henhouse::query::expr::{standard_sort, Direction, OrderTerm, Predicate};
/// use henhouse::query::sql::{build_select, Page, SqlParam};
///
/// let filters = vec![Predicate::contains("tags.name", "disney")];
/// let ordering = vec![OrderTerm { expr: standard_sort("tags.name"), direction: Direction::Asc }];
/// let (sql, params) = build_select("tags", &["tags.name"], &filters, &ordering, Page { limit: 10, offset: 0 });
/// assert!(sql.contains("WHERE tags.name LIKE ?"));
/// assert!(sql.contains("ORDER BY tags.name ASC"));
/// assert_eq!(params[0], SqlParam::Text("%disney%".to_string()));
/// ```
pub fn build_select(
    table: &str,
    columns: &[&str],
    predicates: &[Predicate],
    ordering: &[OrderTerm],
    page: Page,
) -> (String, Vec<SqlParam>) {
    let (where_clause, mut params) = match build_where(predicates) {
        Some((sql, params)) => (format!(" WHERE {}", sql), params),
        None => (String::new(), Vec::new()),
    };
    let order_clause = build_order_by(ordering)
        .map(|sql| format!(" ORDER BY {}", sql))
        .unwrap_or_default();

    let sql = format!(
        "SELECT {} FROM {}{}{} LIMIT ? OFFSET ?",
        columns.join(", "),
        table,
        where_clause,
        order_clause
    );

    params.push(SqlParam::Integer(page.limit as i64));
    params.push(SqlParam::Integer(page.offset as i64));

    tracing::debug!("Compiled list query: {} ({} params)", sql, params.len());
    (sql, params)
}

/// Build a `SELECT COUNT(*)` over the filtered rows.
pub fn build_count(table: &str, predicates: &[Predicate]) -> (String, Vec<SqlParam>) {
    match build_where(predicates) {
        Some((sql, params)) => (format!("SELECT COUNT(*) FROM {} WHERE {}", table, sql), params),
        None => (format!("SELECT COUNT(*) FROM {}", table), Vec::new()),
    }
}

/// Escape `%`, `_` and `\` for a LIKE pattern with `ESCAPE '\'`.
fn escape_like(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        match c {
            '%' | '_' | '\\' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::expr::{nocase_sort, related_sort, standard_sort, Direction};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn page() -> Page {
        Page {
            limit: 100,
            offset: 0,
        }
    }

    #[test]
    fn test_contains() {
        let (sql, params) = build_where(&[Predicate::contains("stories.title", "dragon")]).unwrap();
        assert_eq!(sql, "stories.title LIKE ? ESCAPE '\\'");
        assert_eq!(params, vec![SqlParam::Text("%dragon%".to_string())]);
    }

    #[test]
    fn test_iexact() {
        let (sql, params) = build_where(&[Predicate::iexact("tags.name", "Disney")]).unwrap();
        assert_eq!(sql, "tags.name = ? COLLATE NOCASE");
        assert_eq!(params, vec![SqlParam::Text("Disney".to_string())]);
    }

    #[test]
    fn test_in_binds_each_value() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (sql, params) = build_where(&[Predicate::is_in("stories.uuid", [a, b])]).unwrap();
        assert_eq!(sql, "stories.uuid IN (?, ?)");
        assert_eq!(
            params,
            vec![
                SqlParam::Text(a.hyphenated().to_string()),
                SqlParam::Text(b.hyphenated().to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_in_is_false() {
        let values: Vec<Value> = Vec::new();
        let (sql, params) = build_where(&[Predicate::is_in("tags.name", values)]).unwrap();
        assert_eq!(sql, "0 = 1");
        assert!(params.is_empty());
    }

    #[test]
    fn test_within() {
        let start = chrono::Utc.with_ymd_and_hms(2018, 11, 23, 0, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2018, 11, 26, 0, 0, 0).unwrap();

        let both = TimeRange {
            start: Some(start),
            end: Some(end),
        };
        let (sql, params) = build_where(&[Predicate::within("stories.created_at", both)]).unwrap();
        assert_eq!(sql, "stories.created_at BETWEEN ? AND ?");
        assert_eq!(
            params,
            vec![
                SqlParam::Integer(start.timestamp()),
                SqlParam::Integer(end.timestamp())
            ]
        );

        let open_start = TimeRange {
            start: None,
            end: Some(end),
        };
        let (sql, _) = build_where(&[Predicate::within("stories.created_at", open_start)]).unwrap();
        assert_eq!(sql, "stories.created_at <= ?");

        let open_end = TimeRange {
            start: Some(start),
            end: None,
        };
        let (sql, _) = build_where(&[Predicate::within("stories.created_at", open_end)]).unwrap();
        assert_eq!(sql, "stories.created_at >= ?");
    }

    #[test]
    fn test_subqueries_keep_param_order() {
        let predicates = vec![
            Predicate::contains("stories.title", "a"),
            Predicate::exists(Subquery::new(
                "1",
                "chapters",
                vec![
                    Predicate::column_eq("chapters.story_uuid", "stories.uuid"),
                    Predicate::contains("chapters.markdown", "b"),
                ],
            ))
            .negate(),
            Predicate::eq("stories.is_nsfw", false),
        ];

        let (sql, params) = build_where(&predicates).unwrap();
        assert_eq!(
            sql,
            "stories.title LIKE ? ESCAPE '\\' AND NOT (EXISTS (SELECT 1 FROM chapters \
             WHERE chapters.story_uuid = stories.uuid AND chapters.markdown LIKE ? ESCAPE '\\')) \
             AND stories.is_nsfw = ?"
        );
        assert_eq!(
            params,
            vec![
                SqlParam::Text("%a%".to_string()),
                SqlParam::Text("%b%".to_string()),
                SqlParam::Integer(0),
            ]
        );
    }

    #[test]
    fn test_or_and_grouping() {
        let p = Predicate::Or(vec![
            Predicate::is_null("chapters.published_at"),
            Predicate::And(vec![
                Predicate::eq("chapters.idx", 1i64),
                Predicate::iexact("chapters.name", "x"),
            ]),
        ]);
        let (sql, _) = build_where(&[p]).unwrap();
        assert_eq!(
            sql,
            "(chapters.published_at IS NULL OR (chapters.idx = ? AND chapters.name = ? COLLATE NOCASE))"
        );
    }

    #[test]
    fn test_order_by() {
        let ordering = vec![
            OrderTerm {
                expr: nocase_sort("stories.title"),
                direction: Direction::Desc,
            },
            OrderTerm {
                expr: related_sort("users", "username", "uuid", "stories.creator_uuid"),
                direction: Direction::Asc,
            },
            OrderTerm {
                expr: standard_sort("stories.uuid"),
                direction: Direction::Asc,
            },
        ];
        assert_eq!(
            build_order_by(&ordering).unwrap(),
            "stories.title COLLATE NOCASE DESC, \
             (SELECT users.username FROM users WHERE users.uuid = stories.creator_uuid) ASC, \
             stories.uuid ASC"
        );
        assert!(build_order_by(&[]).is_none());
    }

    #[test]
    fn test_select_without_filters() {
        let (sql, params) = build_select("tags", &["tags.name", "tags.pretty_name"], &[], &[], page());
        assert_eq!(sql, "SELECT tags.name, tags.pretty_name FROM tags LIMIT ? OFFSET ?");
        assert_eq!(params, vec![SqlParam::Integer(100), SqlParam::Integer(0)]);
    }

    #[test]
    fn test_select_with_filters_and_page() {
        let ordering = vec![OrderTerm {
            expr: standard_sort("tags.name"),
            direction: Direction::Asc,
        }];
        let (sql, params) = build_select(
            "tags",
            &["tags.name"],
            &[Predicate::contains("tags.name", "x")],
            &ordering,
            Page {
                limit: 5,
                offset: 10,
            },
        );
        assert_eq!(
            sql,
            "SELECT tags.name FROM tags WHERE tags.name LIKE ? ESCAPE '\\' \
             ORDER BY tags.name ASC LIMIT ? OFFSET ?"
        );
        assert_eq!(params.last(), Some(&SqlParam::Integer(10)));
        assert_eq!(params[1], SqlParam::Integer(5));
    }

    #[test]
    fn test_count() {
        let (sql, params) = build_count("tags", &[]);
        assert_eq!(sql, "SELECT COUNT(*) FROM tags");
        assert!(params.is_empty());

        let (sql, params) = build_count("tags", &[Predicate::iexact("tags.name", "x")]);
        assert_eq!(sql, "SELECT COUNT(*) FROM tags WHERE tags.name = ? COLLATE NOCASE");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_sql_injection_prevention() {
        let (sql, params) =
            build_where(&[Predicate::contains("stories.title", "'; DROP TABLE stories; --")])
                .unwrap();
        assert!(!sql.contains("DROP TABLE"));
        if let SqlParam::Text(text) = &params[0] {
            assert!(text.contains("DROP TABLE"));
        }
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("file_name"), "file\\_name");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }
}
