use async_trait::async_trait;
use tradechat_core::{Message, Thread};
use uuid::Uuid;

use crate::filter::{Fields, Filters};
use crate::paginator::{paginate, Page, PaginateOptions};
use crate::repository::{Entity, InsertFields, ListOptions, Repo};
use crate::DbError;

impl Entity for Thread {
    const TABLE: &'static str = "threads";
    const NAME: &'static str = "Thread";
    const DEFAULT_ORDER_BY: &'static [&'static str] = &["-updated_at"];
}

impl InsertFields for Thread {
    fn insert_fields(&self) -> Fields {
        Fields::new()
            .set("id", self.id)
            .set("title", self.title.clone())
            .set("user_id", self.user_id)
            .set("created_at", self.created_at)
            .set("updated_at", self.updated_at)
    }
}

#[async_trait]
pub trait ThreadRepoExt {
    /// One page of a user's threads, most recently active first.
    async fn list_page(
        &mut self,
        user_id: Uuid,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Thread>, DbError>;

    /// The thread plus its messages in creation order.
    async fn retrieve_with_messages(
        &mut self,
        filters: Filters,
    ) -> Result<(Thread, Vec<Message>), DbError>;

    /// Bump `updated_at` so the thread surfaces first in listings. Called
    /// explicitly from the message-append path.
    async fn touch(&mut self, pk: Uuid) -> Result<(), DbError>;
}

#[async_trait]
impl ThreadRepoExt for Repo<'_, Thread> {
    async fn list_page(
        &mut self,
        user_id: Uuid,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Thread>, DbError> {
        paginate::<Thread>(
            self.conn(),
            Filters::new().eq("user_id", user_id),
            Thread::DEFAULT_ORDER_BY,
            page,
            per_page,
            PaginateOptions::default(),
        )
        .await
    }

    async fn retrieve_with_messages(
        &mut self,
        filters: Filters,
    ) -> Result<(Thread, Vec<Message>), DbError> {
        let thread = self.retrieve(filters).await?;
        let messages = Repo::<Message>::new(self.conn())
            .list(
                ListOptions {
                    order_by: Some(vec!["created_at".to_string()]),
                    ..Default::default()
                },
                Filters::new().eq("thread_id", thread.id),
            )
            .await?;
        Ok((thread, messages))
    }

    async fn touch(&mut self, pk: Uuid) -> Result<(), DbError> {
        sqlx::query("UPDATE threads SET updated_at = now() WHERE id = $1")
            .bind(pk)
            .execute(self.conn())
            .await?;
        Ok(())
    }
}
