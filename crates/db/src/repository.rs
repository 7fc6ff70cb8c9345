use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use std::marker::PhantomData;

use crate::filter::{push_order_by, Fields, Filters};
use crate::DbError;

/// Binds a domain type to its table and per-entity defaults.
pub trait Entity: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin {
    /// Table name in the schema.
    const TABLE: &'static str;
    /// Display name used in error messages.
    const NAME: &'static str;
    /// Identity column the synthetic `pk` filter key rewrites to.
    const IDENTITY: &'static str = "id";
    /// Columns covered by uniqueness constraints, reported on duplicates.
    const UNIQUE_COLUMNS: &'static [&'static str] = &[];
    /// Ordering applied when the caller does not specify one.
    const DEFAULT_ORDER_BY: &'static [&'static str] = &["id"];
}

/// Produces the field assignments that persist an instance.
pub trait InsertFields {
    fn insert_fields(&self) -> Fields;
}

/// Options for [`Repo::list`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Column specs; `-` prefix means descending.
    pub order_by: Option<Vec<String>>,
}

/// Generic CRUD over one entity type, bound to a live transaction.
///
/// A `Repo` borrows its unit of work's connection, so it can never outlive
/// the scope it was acquired from. Repository operations never commit; the
/// unit of work is the only commit boundary.
pub struct Repo<'t, E: Entity> {
    conn: &'t mut PgConnection,
    _entity: PhantomData<E>,
}

impl<'t, E: Entity> Repo<'t, E> {
    pub fn new(conn: &'t mut PgConnection) -> Self {
        Self {
            conn,
            _entity: PhantomData,
        }
    }

    /// Escape hatch for entity-specific queries in extension traits.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut *self.conn
    }

    /// Insert a new row and return the persisted entity.
    pub async fn create(&mut self, fields: Fields) -> Result<E, DbError> {
        tracing::debug!(entity = E::NAME, "creating");
        let mut qb = build_insert::<E>(&fields, true);
        qb.build_query_as::<E>()
            .fetch_one(&mut *self.conn)
            .await
            .map_err(map_err::<E>)
    }

    /// List entities matching all equality filters.
    pub async fn list(&mut self, options: ListOptions, filters: Filters) -> Result<Vec<E>, DbError> {
        let mut filters = filters;
        filters.rewrite_pk(E::IDENTITY);
        let mut qb = build_select::<E>(&filters, &options);
        qb.build_query_as::<E>()
            .fetch_all(&mut *self.conn)
            .await
            .map_err(map_err::<E>)
    }

    /// Exactly one entity matching all filters.
    ///
    /// Zero rows is a not-found; more than one is a storage-level error,
    /// since retrieve assumes the filters identify a unique row.
    pub async fn retrieve(&mut self, filters: Filters) -> Result<E, DbError> {
        let mut filters = filters;
        filters.rewrite_pk(E::IDENTITY);
        let options = ListOptions {
            limit: Some(2),
            ..Default::default()
        };
        let mut qb = build_select::<E>(&filters, &options);
        let mut rows = qb
            .build_query_as::<E>()
            .fetch_all(&mut *self.conn)
            .await
            .map_err(map_err::<E>)?;
        match rows.len() {
            0 => Err(DbError::NotFound { entity: E::NAME }),
            1 => Ok(rows.pop().expect("len checked")),
            n => Err(DbError::MultipleRows {
                entity: E::NAME,
                count: n,
            }),
        }
    }

    /// Update the single matching entity and return it.
    pub async fn update(&mut self, filters: Filters, fields: Fields) -> Result<E, DbError> {
        let mut filters = filters;
        filters.rewrite_pk(E::IDENTITY);
        tracing::debug!(entity = E::NAME, "updating");
        let mut qb = build_update::<E>(&filters, &fields);
        let mut rows = qb
            .build_query_as::<E>()
            .fetch_all(&mut *self.conn)
            .await
            .map_err(map_err::<E>)?;
        match rows.len() {
            0 => Err(DbError::NotFound { entity: E::NAME }),
            1 => Ok(rows.pop().expect("len checked")),
            n => Err(DbError::MultipleRows {
                entity: E::NAME,
                count: n,
            }),
        }
    }

    /// Delete all matching rows; zero matches is not an error.
    pub async fn delete(&mut self, filters: Filters) -> Result<u64, DbError> {
        let mut filters = filters;
        filters.rewrite_pk(E::IDENTITY);
        tracing::debug!(entity = E::NAME, "deleting");
        let mut qb = build_delete::<E>(&filters);
        let result = qb
            .build()
            .execute(&mut *self.conn)
            .await
            .map_err(map_err::<E>)?;
        Ok(result.rows_affected())
    }

    /// Whether any row matches all filters.
    pub async fn exists(&mut self, filters: Filters) -> Result<bool, DbError> {
        let mut filters = filters;
        filters.rewrite_pk(E::IDENTITY);
        let mut qb = build_exists::<E>(&filters);
        let found: bool = qb
            .build_query_scalar()
            .fetch_one(&mut *self.conn)
            .await
            .map_err(map_err::<E>)?;
        Ok(found)
    }

    /// Return the existing match, or create one from the same values minus
    /// identity keys.
    pub async fn get_or_create(&mut self, filters: Filters) -> Result<E, DbError> {
        match self.retrieve(filters.clone()).await {
            Ok(entity) => Ok(entity),
            Err(DbError::NotFound { .. }) => {
                let fields = filters.without_identity(E::IDENTITY);
                self.create(fields).await
            }
            Err(other) => Err(other),
        }
    }

    /// Stage an instance for insertion without reading it back.
    pub async fn add(&mut self, instance: &E) -> Result<(), DbError>
    where
        E: InsertFields,
    {
        let mut qb = build_insert::<E>(&instance.insert_fields(), false);
        qb.build()
            .execute(&mut *self.conn)
            .await
            .map_err(map_err::<E>)?;
        Ok(())
    }
}

/// Translate unique-constraint violations into the domain taxonomy; every
/// other storage failure re-raises untouched.
fn map_err<E: Entity>(err: sqlx::Error) -> DbError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            tracing::debug!(entity = E::NAME, error = %db_err, "unique violation");
            return DbError::Duplicate {
                entity: E::NAME,
                fields: E::UNIQUE_COLUMNS.join(" or "),
            };
        }
    }
    if matches!(err, sqlx::Error::RowNotFound) {
        return DbError::NotFound { entity: E::NAME };
    }
    DbError::Sqlx(err)
}

pub(crate) fn build_insert<E: Entity>(
    fields: &Fields,
    returning: bool,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("INSERT INTO {} (", E::TABLE));
    for (i, (column, _)) in fields.items().iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(column.as_str());
    }
    qb.push(") VALUES (");
    for (i, (_, value)) in fields.items().iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        match value {
            crate::filter::Value::Null => {
                qb.push("NULL");
            }
            _ => value.push_bind(&mut qb),
        }
    }
    qb.push(")");
    if returning {
        qb.push(" RETURNING *");
    }
    qb
}

pub(crate) fn build_select<E: Entity>(
    filters: &Filters,
    options: &ListOptions,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT * FROM {}", E::TABLE));
    filters.push_where(&mut qb);
    match &options.order_by {
        Some(columns) => {
            let specs: Vec<&str> = columns.iter().map(String::as_str).collect();
            push_order_by(&mut qb, &specs);
        }
        None => push_order_by(&mut qb, E::DEFAULT_ORDER_BY),
    }
    if let Some(limit) = options.limit {
        qb.push(" LIMIT ");
        qb.push_bind(limit);
    }
    if let Some(offset) = options.offset {
        qb.push(" OFFSET ");
        qb.push_bind(offset);
    }
    qb
}

pub(crate) fn build_update<E: Entity>(
    filters: &Filters,
    fields: &Fields,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", E::TABLE));
    for (i, (column, value)) in fields.items().iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(column.as_str());
        qb.push(" = ");
        value.push_bind(&mut qb);
    }
    filters.push_where(&mut qb);
    qb.push(" RETURNING *");
    qb
}

pub(crate) fn build_delete<E: Entity>(filters: &Filters) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("DELETE FROM {}", E::TABLE));
    filters.push_where(&mut qb);
    qb
}

pub(crate) fn build_exists<E: Entity>(filters: &Filters) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT EXISTS (SELECT 1 FROM {}", E::TABLE));
    filters.push_where(&mut qb);
    qb.push(")");
    qb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Value;
    use tradechat_core::Thread;
    use uuid::Uuid;

    #[test]
    fn test_build_insert_sql() {
        let fields = Fields::new()
            .set("id", Uuid::nil())
            .set("title", "Test Thread")
            .set("user_id", Uuid::nil());
        let mut qb = build_insert::<Thread>(&fields, true);
        assert_eq!(
            qb.sql(),
            "INSERT INTO threads (id, title, user_id) VALUES ($1, $2, $3) RETURNING *"
        );
    }

    #[test]
    fn test_build_insert_null_literal() {
        let fields = Fields::new().set("id", Uuid::nil()).set("title", Value::Null);
        let mut qb = build_insert::<Thread>(&fields, false);
        assert_eq!(qb.sql(), "INSERT INTO threads (id, title) VALUES ($1, NULL)");
    }

    #[test]
    fn test_build_select_defaults_to_entity_order() {
        let filters = Filters::new().eq("user_id", Uuid::nil());
        let mut qb = build_select::<Thread>(&filters, &ListOptions::default());
        assert_eq!(
            qb.sql(),
            "SELECT * FROM threads WHERE user_id = $1 ORDER BY updated_at DESC"
        );
    }

    #[test]
    fn test_build_select_with_window() {
        let options = ListOptions {
            limit: Some(10),
            offset: Some(20),
            order_by: Some(vec!["created_at".to_string()]),
        };
        let mut qb = build_select::<Thread>(&Filters::new(), &options);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM threads ORDER BY created_at LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn test_build_update_sql() {
        let filters = Filters::new().eq("id", Uuid::nil());
        let fields = Fields::new().set("title", "renamed");
        let mut qb = build_update::<Thread>(&filters, &fields);
        assert_eq!(
            qb.sql(),
            "UPDATE threads SET title = $1 WHERE id = $2 RETURNING *"
        );
    }

    #[test]
    fn test_build_delete_without_filters_targets_all_rows() {
        let mut qb = build_delete::<Thread>(&Filters::new());
        assert_eq!(qb.sql(), "DELETE FROM threads");
    }

    #[test]
    fn test_build_exists_sql() {
        let filters = Filters::new().eq("id", Uuid::nil());
        let mut qb = build_exists::<Thread>(&filters);
        assert_eq!(qb.sql(), "SELECT EXISTS (SELECT 1 FROM threads WHERE id = $1)");
    }

    #[test]
    fn test_map_err_row_not_found() {
        let err = map_err::<Thread>(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::NotFound { entity: "Thread" }));
    }
}
