use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tradechat_agent::{ChatAgent, ChatMessage, TradingToolkit};
use tradechat_core::{ChatRole, Message, Thread, User};
use tradechat_db::paginator::Page;
use tradechat_db::repos::{AccountRepoExt, MessageRepoExt, ThreadRepoExt};
use tradechat_db::repository::ListOptions;
use tradechat_db::{Filters, UnitOfWork};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::pagination::PageQuery;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/threads/", post(create_thread).get(list_threads))
        .route("/threads/{thread_id}/", get(get_thread).delete(delete_thread))
        .route(
            "/threads/{thread_id}/messages/",
            get(list_messages).post(send_message),
        )
}

#[derive(Debug, Deserialize)]
struct ThreadCreateRequest {
    title: String,
    /// First message of the thread; the assistant replies to it.
    first_message: String,
}

#[derive(Debug, Serialize)]
struct ThreadCreateResponse {
    thread_id: Uuid,
}

async fn create_thread(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Json(req): Json<ThreadCreateRequest>,
) -> ApiResult<(StatusCode, Json<ThreadCreateResponse>)> {
    let thread = Thread::new(current.id, Some(req.title.clone()));
    let user_message = Message::new(thread.id, ChatRole::User, &req.first_message);

    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    uow.add(&thread).await.map_err(ApiError::Db)?;
    uow.add(&user_message).await.map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;

    // The session is released while the model thinks; the reply lands in a
    // second scope.
    let reply = run_agent(&state, &current, vec![ChatMessage::from(&user_message)]).await?;
    append_assistant_reply(&state, thread.id, &reply).await?;

    Ok((
        StatusCode::CREATED,
        Json(ThreadCreateResponse { thread_id: thread.id }),
    ))
}

async fn list_threads(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<Thread>>> {
    let query = query.validate()?;
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    let page = uow
        .threads()
        .list_page(current.id, query.page, query.per_page)
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;
    Ok(Json(page))
}

#[derive(Debug, Serialize)]
struct ThreadWithMessages {
    id: Uuid,
    title: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    messages: Vec<Message>,
}

async fn get_thread(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Path(thread_id): Path<Uuid>,
) -> ApiResult<Json<ThreadWithMessages>> {
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    let (thread, messages) = uow
        .threads()
        .retrieve_with_messages(Filters::new().eq("pk", thread_id).eq("user_id", current.id))
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;

    Ok(Json(ThreadWithMessages {
        id: thread.id,
        title: thread.title,
        created_at: thread.created_at,
        updated_at: thread.updated_at,
        messages,
    }))
}

async fn delete_thread(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Path(thread_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    // Hard delete; messages go with the thread. Scoped to the owner, and
    // deleting nothing is not an error.
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    uow.threads()
        .delete(Filters::new().eq("pk", thread_id).eq("user_id", current.id))
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Path(thread_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<Message>>> {
    let query = query.validate()?;
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    // Ownership gate before touching messages.
    uow.threads()
        .retrieve(Filters::new().eq("pk", thread_id).eq("user_id", current.id))
        .await
        .map_err(ApiError::Db)?;
    let page = uow
        .messages()
        .list_page(thread_id, query.page, query.per_page)
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    content: String,
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Path(thread_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    uow.threads()
        .retrieve(Filters::new().eq("pk", thread_id).eq("user_id", current.id))
        .await
        .map_err(ApiError::Db)?;

    let user_message = Message::new(thread_id, ChatRole::User, &req.content);
    uow.add(&user_message).await.map_err(ApiError::Db)?;

    let history = uow
        .messages()
        .list(
            ListOptions {
                order_by: Some(vec!["created_at".to_string()]),
                ..Default::default()
            },
            Filters::new().eq("thread_id", thread_id),
        )
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;

    let wire_history: Vec<ChatMessage> = history.iter().map(ChatMessage::from).collect();
    let reply = run_agent(&state, &current, wire_history).await?;
    let assistant_message = append_assistant_reply(&state, thread_id, &reply).await?;

    Ok((StatusCode::CREATED, Json(assistant_message)))
}

/// Run the agent with the caller's exchange credentials.
async fn run_agent(
    state: &Arc<AppState>,
    user: &User,
    history: Vec<ChatMessage>,
) -> Result<String, ApiError> {
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    let accounts = uow
        .exchange_accounts()
        .list_for_user(user.id)
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;

    let account = accounts.iter().find(|account| account.is_active);
    let client = state.exchange_client(account);
    let toolkit = Arc::new(TradingToolkit::new(client));
    let agent = ChatAgent::new(state.llm.clone(), toolkit);
    let reply = agent.run(history).await.map_err(ApiError::Agent)?;
    Ok(reply)
}

/// Persist the assistant's reply and surface the thread in listings.
async fn append_assistant_reply(
    state: &Arc<AppState>,
    thread_id: Uuid,
    reply: &str,
) -> Result<Message, ApiError> {
    let assistant_message = Message::new(thread_id, ChatRole::Assistant, reply);
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    uow.add(&assistant_message).await.map_err(ApiError::Db)?;
    uow.threads().touch(thread_id).await.map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;
    Ok(assistant_message)
}
