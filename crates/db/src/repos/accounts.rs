use async_trait::async_trait;
use tradechat_core::ExchangeAccount;
use uuid::Uuid;

use crate::filter::{Fields, Filters};
use crate::repository::{Entity, InsertFields, ListOptions, Repo};
use crate::DbError;

impl Entity for ExchangeAccount {
    const TABLE: &'static str = "exchange_accounts";
    const NAME: &'static str = "ExchangeAccount";
    const UNIQUE_COLUMNS: &'static [&'static str] = &["id"];
    const DEFAULT_ORDER_BY: &'static [&'static str] = &["-created_at"];
}

impl InsertFields for ExchangeAccount {
    fn insert_fields(&self) -> Fields {
        Fields::new()
            .set("id", self.id)
            .set("user_id", self.user_id)
            .set("name", self.name.as_str())
            .set("api_key", self.api_key.as_str())
            .set("api_secret", self.api_secret.as_str())
            .set("testnet", self.testnet)
            .set("is_active", self.is_active)
            .set("created_at", self.created_at)
    }
}

#[async_trait]
pub trait AccountRepoExt {
    /// All accounts linked by one user.
    async fn list_for_user(&mut self, user_id: Uuid) -> Result<Vec<ExchangeAccount>, DbError>;
}

#[async_trait]
impl AccountRepoExt for Repo<'_, ExchangeAccount> {
    async fn list_for_user(&mut self, user_id: Uuid) -> Result<Vec<ExchangeAccount>, DbError> {
        self.list(ListOptions::default(), Filters::new().eq("user_id", user_id))
            .await
    }
}
