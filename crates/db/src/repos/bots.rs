use async_trait::async_trait;
use tradechat_core::{BotActivity, TradingBot};
use uuid::Uuid;

use crate::filter::{Fields, Filters};
use crate::paginator::{paginate, Page, PaginateOptions};
use crate::repository::{Entity, InsertFields, Repo};
use crate::DbError;

impl Entity for TradingBot {
    const TABLE: &'static str = "trading_bots";
    const NAME: &'static str = "TradingBot";
    const DEFAULT_ORDER_BY: &'static [&'static str] = &["-updated_at"];
}

impl InsertFields for TradingBot {
    fn insert_fields(&self) -> Fields {
        Fields::new()
            .set("id", self.id)
            .set("user_id", self.user_id)
            .set("exchange_account_id", self.exchange_account_id)
            .set("name", self.name.as_str())
            .set("is_active", self.is_active)
            .set("tickers", self.tickers.clone())
            .set("base_prompt", self.base_prompt.clone())
            .set("additional_notes", self.additional_notes.clone())
            .set("risk_tolerance", self.risk_tolerance)
            .set("target_profit", self.target_profit)
            .set("created_at", self.created_at)
            .set("updated_at", self.updated_at)
    }
}

impl Entity for BotActivity {
    const TABLE: &'static str = "bot_activities";
    const NAME: &'static str = "BotActivity";
    const DEFAULT_ORDER_BY: &'static [&'static str] = &["-created_at"];
}

#[async_trait]
pub trait BotRepoExt {
    /// One page of a user's bots, most recently updated first.
    async fn list_page(
        &mut self,
        user_id: Uuid,
        page: u32,
        per_page: u32,
    ) -> Result<Page<TradingBot>, DbError>;
}

#[async_trait]
impl BotRepoExt for Repo<'_, TradingBot> {
    async fn list_page(
        &mut self,
        user_id: Uuid,
        page: u32,
        per_page: u32,
    ) -> Result<Page<TradingBot>, DbError> {
        paginate::<TradingBot>(
            self.conn(),
            Filters::new().eq("user_id", user_id),
            TradingBot::DEFAULT_ORDER_BY,
            page,
            per_page,
            PaginateOptions::default(),
        )
        .await
    }
}

#[async_trait]
pub trait BotActivityRepoExt {
    /// Record one activity entry for a bot.
    async fn record(
        &mut self,
        bot_id: Uuid,
        activity_type: &str,
        details: Option<String>,
    ) -> Result<BotActivity, DbError>;

    /// One page of a bot's activity log, newest first.
    async fn list_page(
        &mut self,
        bot_id: Uuid,
        page: u32,
        per_page: u32,
    ) -> Result<Page<BotActivity>, DbError>;
}

#[async_trait]
impl BotActivityRepoExt for Repo<'_, BotActivity> {
    async fn record(
        &mut self,
        bot_id: Uuid,
        activity_type: &str,
        details: Option<String>,
    ) -> Result<BotActivity, DbError> {
        self.create(
            Fields::new()
                .set("bot_id", bot_id)
                .set("activity_type", activity_type)
                .set("details", details),
        )
        .await
    }

    async fn list_page(
        &mut self,
        bot_id: Uuid,
        page: u32,
        per_page: u32,
    ) -> Result<Page<BotActivity>, DbError> {
        paginate::<BotActivity>(
            self.conn(),
            Filters::new().eq("bot_id", bot_id),
            BotActivity::DEFAULT_ORDER_BY,
            page,
            per_page,
            PaginateOptions::default(),
        )
        .await
    }
}
