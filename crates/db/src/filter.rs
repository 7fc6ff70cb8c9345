use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

/// A typed bind value for equality filters and field assignments.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Uuid(Uuid),
    Int(i64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    TextArray(Vec<String>),
    Null,
}

impl Value {
    pub(crate) fn push_bind(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Value::Uuid(v) => qb.push_bind(*v),
            Value::Int(v) => qb.push_bind(*v),
            Value::Text(v) => qb.push_bind(v.clone()),
            Value::Bool(v) => qb.push_bind(*v),
            Value::Timestamp(v) => qb.push_bind(*v),
            Value::TextArray(v) => qb.push_bind(v.clone()),
            Value::Null => qb.push_bind(Option::<String>::None),
        };
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::TextArray(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

/// An ordered set of (column, value) pairs.
///
/// Column names are trusted identifiers supplied by repository code, never
/// request input; they are interpolated into SQL as-is while values are
/// always bound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnValues {
    items: Vec<(String, Value)>,
}

/// Equality filters (`WHERE col = $n AND ...`).
pub type Filters = ColumnValues;

/// Field assignments for inserts and updates.
pub type Fields = ColumnValues;

impl ColumnValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        debug_assert!(is_identifier(column), "untrusted column name: {column}");
        self.items.push((column.to_string(), value.into()));
        self
    }

    /// Alias of [`eq`] that reads naturally for field assignments.
    pub fn set(self, column: &str, value: impl Into<Value>) -> Self {
        self.eq(column, value)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[(String, Value)] {
        &self.items
    }

    /// Rewrite the synthetic `pk` key to the entity's identity column.
    pub(crate) fn rewrite_pk(&mut self, identity: &str) {
        for (column, _) in &mut self.items {
            if column == "pk" {
                *column = identity.to_string();
            }
        }
    }

    /// Drop identity keys; used when turning retrieve filters into create fields.
    pub(crate) fn without_identity(&self, identity: &str) -> Self {
        Self {
            items: self
                .items
                .iter()
                .filter(|(column, _)| column != "pk" && column != identity)
                .cloned()
                .collect(),
        }
    }

    /// Append `WHERE a = $1 AND b = $2 ...` (or nothing when empty).
    pub(crate) fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        for (i, (column, value)) in self.items.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            qb.push(column.as_str());
            match value {
                Value::Null => {
                    qb.push(" IS NULL");
                }
                _ => {
                    qb.push(" = ");
                    value.push_bind(qb);
                }
            }
        }
    }
}

/// One parsed ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub column: String,
    pub descending: bool,
}

impl OrderClause {
    /// Parse a column spec: a `-` prefix means descending, a dotted name
    /// qualifies a column of a joined relation.
    pub fn parse(spec: &str) -> Self {
        let (descending, column) = match spec.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, spec),
        };
        debug_assert!(is_identifier(column), "untrusted order column: {column}");
        Self {
            column: column.to_string(),
            descending,
        }
    }
}

/// Parse an ordered column list into clauses.
pub fn parse_order_by(specs: &[&str]) -> Vec<OrderClause> {
    specs.iter().map(|spec| OrderClause::parse(spec)).collect()
}

/// Append `ORDER BY col [DESC], ...` for the given specs.
pub(crate) fn push_order_by(qb: &mut QueryBuilder<'_, Postgres>, specs: &[&str]) {
    for (i, clause) in parse_order_by(specs).into_iter().enumerate() {
        qb.push(if i == 0 { " ORDER BY " } else { ", " });
        qb.push(clause.column.as_str());
        if clause.descending {
            qb.push(" DESC");
        }
    }
}

fn is_identifier(column: &str) -> bool {
    !column.is_empty()
        && column
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_clause_descending_prefix() {
        let clause = OrderClause::parse("-updated_at");
        assert_eq!(clause.column, "updated_at");
        assert!(clause.descending);

        let clause = OrderClause::parse("created_at");
        assert_eq!(clause.column, "created_at");
        assert!(!clause.descending);
    }

    #[test]
    fn test_order_clause_dotted_relation() {
        let clause = OrderClause::parse("-exchange_accounts.name");
        assert_eq!(clause.column, "exchange_accounts.name");
        assert!(clause.descending);
    }

    #[test]
    fn test_push_order_by_renders_clauses() {
        let mut qb = QueryBuilder::new("SELECT * FROM threads");
        push_order_by(&mut qb, &["-updated_at", "id"]);
        assert_eq!(qb.sql(), "SELECT * FROM threads ORDER BY updated_at DESC, id");
    }

    #[test]
    fn test_push_where_renders_placeholders() {
        let filters = Filters::new()
            .eq("user_id", Uuid::nil())
            .eq("is_active", true);
        let mut qb = QueryBuilder::new("SELECT * FROM threads");
        filters.push_where(&mut qb);
        assert_eq!(qb.sql(), "SELECT * FROM threads WHERE user_id = $1 AND is_active = $2");
    }

    #[test]
    fn test_push_where_null_uses_is_null() {
        let filters = Filters::new().eq("title", Value::Null);
        let mut qb = QueryBuilder::new("SELECT * FROM threads");
        filters.push_where(&mut qb);
        assert_eq!(qb.sql(), "SELECT * FROM threads WHERE title IS NULL");
    }

    #[test]
    fn test_rewrite_pk() {
        let mut filters = Filters::new().eq("pk", Uuid::nil());
        filters.rewrite_pk("id");
        assert_eq!(filters.items()[0].0, "id");
    }

    #[test]
    fn test_without_identity_drops_pk_and_id() {
        let filters = Filters::new()
            .eq("pk", Uuid::nil())
            .eq("id", Uuid::nil())
            .eq("email", "test@example.com");
        let fields = filters.without_identity("id");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.items()[0].0, "email");
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
        assert_eq!(Value::from(Option::<String>::None), Value::Null);
    }
}
