use async_trait::async_trait;
use tradechat_core::User;

use crate::filter::{Fields, Filters};
use crate::repository::{Entity, InsertFields, Repo};
use crate::DbError;

impl Entity for User {
    const TABLE: &'static str = "users";
    const NAME: &'static str = "User";
    const UNIQUE_COLUMNS: &'static [&'static str] = &["email"];
    const DEFAULT_ORDER_BY: &'static [&'static str] = &["id"];
}

impl InsertFields for User {
    fn insert_fields(&self) -> Fields {
        Fields::new()
            .set("id", self.id)
            .set("email", self.email.as_str())
            .set("hashed_password", self.hashed_password.as_str())
            .set("full_name", self.full_name.clone())
            .set("is_active", self.is_active)
            .set("is_superuser", self.is_superuser)
            .set("is_verified", self.is_verified)
            .set("created_at", self.created_at)
            .set("updated_at", self.updated_at)
    }
}

#[async_trait]
pub trait UserRepoExt {
    /// Look a user up by email without raising on absence.
    async fn get_by_email(&mut self, email: &str) -> Result<Option<User>, DbError>;

    /// Soft-delete: deactivate instead of destroying.
    async fn deactivate(&mut self, pk: uuid::Uuid) -> Result<User, DbError>;
}

#[async_trait]
impl UserRepoExt for Repo<'_, User> {
    async fn get_by_email(&mut self, email: &str) -> Result<Option<User>, DbError> {
        match self.retrieve(Filters::new().eq("email", email)).await {
            Ok(user) => Ok(Some(user)),
            Err(DbError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn deactivate(&mut self, pk: uuid::Uuid) -> Result<User, DbError> {
        self.update(
            Filters::new().eq("pk", pk),
            Fields::new().set("is_active", false),
        )
        .await
    }
}
