//! Predicate and ordering trees.
//!
//! Registries build these; the search and sort parsers only collect them and
//! the SQL adapter in [`super::sql`] is the only code that looks inside.
//! Columns are table-qualified names such as `stories.title`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Instant in UTC.
pub type Timestamp = DateTime<Utc>;

/// A literal operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Bool(bool),
    Uuid(Uuid),
    Timestamp(Timestamp),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<Timestamp> for Value {
    fn from(t: Timestamp) -> Self {
        Value::Timestamp(t)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Convert to SQL comparison operator.
    pub fn to_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Inclusive time window; `None` leaves that side unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

/// `SELECT <select> FROM <from> WHERE <filter...>` used inside a predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Subquery {
    pub select: &'static str,
    pub from: &'static str,
    /// Conjunction; may reference the outer table for correlation.
    pub filter: Vec<Predicate>,
}

impl Subquery {
    pub fn new(select: &'static str, from: &'static str, filter: Vec<Predicate>) -> Self {
        Self {
            select,
            from,
            filter,
        }
    }
}

/// A boolean condition over a resource's columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// column <op> value
    Compare {
        column: &'static str,
        op: CompareOp,
        value: Value,
    },
    /// Case-insensitive substring match
    Contains { column: &'static str, needle: String },
    /// Case-insensitive equality
    IExact { column: &'static str, value: String },
    /// column IN (values...)
    In {
        column: &'static str,
        values: Vec<Value>,
    },
    /// Inclusive range over a timestamp column
    Within {
        column: &'static str,
        range: TimeRange,
    },
    /// column IS NULL
    IsNull { column: &'static str },
    /// Two columns are equal (used to correlate subqueries)
    ColumnEq {
        left: &'static str,
        right: &'static str,
    },
    /// column IN (SELECT ...)
    InSubquery {
        column: &'static str,
        subquery: Subquery,
    },
    /// EXISTS (SELECT ...)
    Exists(Subquery),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            column,
            op: CompareOp::Eq,
            value: value.into(),
        }
    }

    pub fn contains(column: &'static str, needle: impl Into<String>) -> Self {
        Predicate::Contains {
            column,
            needle: needle.into(),
        }
    }

    pub fn iexact(column: &'static str, value: impl Into<String>) -> Self {
        Predicate::IExact {
            column,
            value: value.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(column: &'static str, values: impl IntoIterator<Item = V>) -> Self {
        Predicate::In {
            column,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn within(column: &'static str, range: TimeRange) -> Self {
        Predicate::Within { column, range }
    }

    pub fn is_null(column: &'static str) -> Self {
        Predicate::IsNull { column }
    }

    pub fn is_not_null(column: &'static str) -> Self {
        Predicate::IsNull { column }.negate()
    }

    pub fn column_eq(left: &'static str, right: &'static str) -> Self {
        Predicate::ColumnEq { left, right }
    }

    pub fn in_subquery(column: &'static str, subquery: Subquery) -> Self {
        Predicate::InSubquery { column, subquery }
    }

    pub fn exists(subquery: Subquery) -> Self {
        Predicate::Exists(subquery)
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Something a result set can be ordered by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderExpr {
    /// A column of the listed table
    Column {
        column: &'static str,
        case_insensitive: bool,
    },
    /// A column of a row referenced through a foreign key:
    /// `(SELECT table.column FROM table WHERE table.key = foreign_key)`
    Related {
        table: &'static str,
        column: &'static str,
        key: &'static str,
        foreign_key: &'static str,
    },
}

/// Plain column ordering.
pub fn standard_sort(column: &'static str) -> OrderExpr {
    OrderExpr::Column {
        column,
        case_insensitive: false,
    }
}

/// Case-insensitive column ordering for human readable text.
pub fn nocase_sort(column: &'static str) -> OrderExpr {
    OrderExpr::Column {
        column,
        case_insensitive: true,
    }
}

/// Ordering by a column of a related table.
pub fn related_sort(
    table: &'static str,
    column: &'static str,
    key: &'static str,
    foreign_key: &'static str,
) -> OrderExpr {
    OrderExpr::Related {
        table,
        column,
        key,
        foreign_key,
    }
}

/// One term of an ORDER BY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub expr: OrderExpr,
    pub direction: Direction,
}

/// Ordered list of terms, primary first.
pub type Ordering = Vec<OrderTerm>;
