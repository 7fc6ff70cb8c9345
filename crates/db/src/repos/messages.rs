use async_trait::async_trait;
use tradechat_core::Message;
use uuid::Uuid;

use crate::filter::{Fields, Filters};
use crate::paginator::{paginate, Page, PaginateOptions};
use crate::repository::{Entity, InsertFields, Repo};
use crate::DbError;

impl Entity for Message {
    const TABLE: &'static str = "messages";
    const NAME: &'static str = "Message";
    const DEFAULT_ORDER_BY: &'static [&'static str] = &["-created_at"];
}

impl InsertFields for Message {
    fn insert_fields(&self) -> Fields {
        Fields::new()
            .set("id", self.id)
            .set("thread_id", self.thread_id)
            .set("role", self.role.as_str())
            .set("content", self.content.as_str())
            .set("created_at", self.created_at)
    }
}

#[async_trait]
pub trait MessageRepoExt {
    /// One page of a thread's messages in reversed pagination: page 1 holds
    /// the oldest remaining rows, the highest page the most recent, each
    /// page ordered oldest-first.
    async fn list_page(
        &mut self,
        thread_id: Uuid,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Message>, DbError>;
}

#[async_trait]
impl MessageRepoExt for Repo<'_, Message> {
    async fn list_page(
        &mut self,
        thread_id: Uuid,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Message>, DbError> {
        paginate::<Message>(
            self.conn(),
            Filters::new().eq("thread_id", thread_id),
            &["created_at"],
            page,
            per_page,
            PaginateOptions {
                reversed: true,
                extra_page: false,
            },
        )
        .await
    }
}
