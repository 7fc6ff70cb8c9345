//! Data-access layer: a generic repository over sqlx, a pagination engine,
//! and a unit of work binding repository operations to one transaction.

pub mod filter;
pub mod paginator;
pub mod pool;
pub mod repos;
pub mod repository;
pub mod uow;

pub use filter::{Fields, Filters, OrderClause, Value};
pub use paginator::{paginate, Page, PageWindow, PaginateOptions};
pub use repository::{Entity, InsertFields, Repo};
pub use uow::UnitOfWork;

/// Errors raised by the data-access layer.
///
/// Not-found and duplicate-entry are the only storage failures translated
/// into domain terms; everything else re-raises untouched.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("{entity} with this {fields} already exists")]
    Duplicate { entity: &'static str, fields: String },
    #[error("expected one {entity} row, query matched {count}")]
    MultipleRows { entity: &'static str, count: usize },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}
