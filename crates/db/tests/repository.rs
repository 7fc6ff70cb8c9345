//! End-to-end data-access tests against a live PostgreSQL instance.
//!
//! Run with `DATABASE_URL` pointing at a scratch database:
//! `cargo test -p tradechat-db -- --ignored`

use futures::FutureExt;
use tradechat_core::{ChatRole, Message, Thread, User};
use tradechat_db::repos::{BotActivityRepoExt, MessageRepoExt, ThreadRepoExt, UserRepoExt};
use tradechat_db::{pool, DbError, Fields, Filters, UnitOfWork};
use uuid::Uuid;

async fn test_pool() -> sqlx::PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = pool::connect(&url, 5).await.expect("connect");
    pool::run_migrations(&pool).await.expect("migrate");
    pool
}

async fn seed_user(uow: &mut UnitOfWork) -> User {
    let email = format!("{}@example.com", Uuid::new_v4());
    uow.users()
        .create(
            Fields::new()
                .set("id", Uuid::new_v4())
                .set("email", email.as_str())
                .set("hashed_password", "$2b$12$test")
                .set("is_active", true),
        )
        .await
        .expect("create user")
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_then_retrieve_roundtrip() {
    let pool = test_pool().await;
    let mut uow = UnitOfWork::begin(&pool).await.unwrap();
    let user = seed_user(&mut uow).await;

    let thread = uow
        .threads()
        .create(
            Fields::new()
                .set("id", Uuid::new_v4())
                .set("title", "Test Thread")
                .set("user_id", user.id),
        )
        .await
        .unwrap();

    let fetched = uow
        .threads()
        .retrieve(Filters::new().eq("pk", thread.id))
        .await
        .unwrap();
    assert_eq!(fetched.title.as_deref(), Some("Test Thread"));
    assert_eq!(fetched.user_id, user.id);

    uow.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_retrieve_missing_is_not_found() {
    let pool = test_pool().await;
    let mut uow = UnitOfWork::begin(&pool).await.unwrap();
    let err = uow
        .threads()
        .retrieve(Filters::new().eq("pk", Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound { entity: "Thread" }));
    uow.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_partial_update_leaves_other_fields() {
    let pool = test_pool().await;
    let mut uow = UnitOfWork::begin(&pool).await.unwrap();
    let user = seed_user(&mut uow).await;
    let thread = uow.add(&Thread::new(user.id, Some("before".to_string()))).await;
    assert!(thread.is_ok());

    let thread = uow
        .threads()
        .retrieve(Filters::new().eq("user_id", user.id))
        .await
        .unwrap();

    let updated = uow
        .threads()
        .update(
            Filters::new().eq("pk", thread.id),
            Fields::new().set("title", "after"),
        )
        .await
        .unwrap();
    assert_eq!(updated.title.as_deref(), Some("after"));
    assert_eq!(updated.user_id, thread.user_id);
    assert_eq!(updated.created_at, thread.created_at);

    uow.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_email_maps_to_duplicate_entry() {
    let pool = test_pool().await;
    let mut uow = UnitOfWork::begin(&pool).await.unwrap();
    let user = seed_user(&mut uow).await;

    let err = uow
        .users()
        .create(
            Fields::new()
                .set("id", Uuid::new_v4())
                .set("email", user.email.as_str())
                .set("hashed_password", "$2b$12$test")
                .set("is_active", true),
        )
        .await
        .unwrap_err();
    match err {
        DbError::Duplicate { entity, fields } => {
            assert_eq!(entity, "User");
            assert_eq!(fields, "email");
        }
        other => panic!("expected duplicate, got {other:?}"),
    }
    uow.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_zero_matches_is_not_an_error() {
    let pool = test_pool().await;
    let mut uow = UnitOfWork::begin(&pool).await.unwrap();
    let deleted = uow
        .threads()
        .delete(Filters::new().eq("pk", Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(deleted, 0);
    uow.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_exists_and_get_or_create() {
    let pool = test_pool().await;
    let mut uow = UnitOfWork::begin(&pool).await.unwrap();
    let user = seed_user(&mut uow).await;

    assert!(uow
        .users()
        .exists(Filters::new().eq("email", user.email.as_str()))
        .await
        .unwrap());

    let again = uow
        .users()
        .get_or_create(Filters::new().eq("email", user.email.as_str()))
        .await
        .unwrap();
    assert_eq!(again.id, user.id);

    uow.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_rollback_discards_created_rows() {
    let pool = test_pool().await;

    let mut uow = UnitOfWork::begin(&pool).await.unwrap();
    let user = seed_user(&mut uow).await;
    let email = user.email.clone();
    uow.rollback().await.unwrap();

    let mut uow = UnitOfWork::begin(&pool).await.unwrap();
    let found = uow.users().get_by_email(&email).await.unwrap();
    assert!(found.is_none());
    uow.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_run_commits_on_ok_and_rolls_back_on_err() {
    let pool = test_pool().await;
    let email = format!("{}@example.com", Uuid::new_v4());

    // Clean exit commits.
    let created_email = email.clone();
    let user_id: Uuid = UnitOfWork::run::<_, DbError, _>(&pool, move |uow| {
        async move {
            let user = uow
                .users()
                .create(
                    Fields::new()
                        .set("id", Uuid::new_v4())
                        .set("email", created_email.as_str())
                        .set("hashed_password", "$2b$12$test")
                        .set("is_active", true),
                )
                .await?;
            Ok(user.id)
        }
        .boxed()
    })
    .await
    .unwrap();

    // An error inside the scope rolls back and re-raises unchanged.
    let result: Result<(), DbError> = UnitOfWork::run(&pool, move |uow| {
        async move {
            uow.threads()
                .create(
                    Fields::new()
                        .set("id", Uuid::new_v4())
                        .set("title", "orphan")
                        .set("user_id", user_id),
                )
                .await?;
            Err(DbError::NotFound { entity: "Thread" })
        }
        .boxed()
    })
    .await;
    assert!(matches!(result, Err(DbError::NotFound { .. })));

    let mut uow = UnitOfWork::begin(&pool).await.unwrap();
    let threads = uow
        .threads()
        .list_page(user_id, 1, 10)
        .await
        .unwrap();
    assert_eq!(threads.count, 0, "rolled-back thread must not persist");
    uow.users().delete(Filters::new().eq("pk", user_id)).await.unwrap();
    uow.commit().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_reversed_message_pages_cover_thread_once() {
    let pool = test_pool().await;
    let mut uow = UnitOfWork::begin(&pool).await.unwrap();
    let user = seed_user(&mut uow).await;
    uow.add(&Thread::new(user.id, Some("chat".to_string()))).await.unwrap();
    let thread = uow
        .threads()
        .retrieve(Filters::new().eq("user_id", user.id))
        .await
        .unwrap();

    for i in 0..7 {
        let mut msg = Message::new(thread.id, ChatRole::User, &format!("m{i}"));
        // Stable ordering for the assertion below.
        msg.created_at = msg.created_at + chrono::Duration::milliseconds(i as i64);
        uow.add(&msg).await.unwrap();
    }

    // per_page=3, count=7: page 3 clips to the single oldest row.
    let page3 = uow.messages().list_page(thread.id, 3, 3).await.unwrap();
    assert_eq!(page3.count, 7);
    assert_eq!(page3.items.len(), 1);
    assert_eq!(page3.items[0].content, "m0");
    assert_eq!(page3.next_page, None);
    assert_eq!(page3.previous_page, Some(2));

    let page1 = uow.messages().list_page(thread.id, 1, 3).await.unwrap();
    let contents: Vec<_> = page1.items.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["m4", "m5", "m6"]);

    uow.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_bot_activity_log_roundtrip() {
    let pool = test_pool().await;
    let mut uow = UnitOfWork::begin(&pool).await.unwrap();
    let user = seed_user(&mut uow).await;

    let account = uow
        .exchange_accounts()
        .create(
            Fields::new()
                .set("id", Uuid::new_v4())
                .set("user_id", user.id)
                .set("name", "paper")
                .set("api_key", "k")
                .set("api_secret", "s")
                .set("testnet", true)
                .set("is_active", true),
        )
        .await
        .unwrap();
    let bot = uow
        .trading_bots()
        .create(
            Fields::new()
                .set("id", Uuid::new_v4())
                .set("user_id", user.id)
                .set("exchange_account_id", account.id)
                .set("name", "dca-bot")
                .set("is_active", false)
                .set("tickers", vec!["BTCUSDT".to_string()])
                .set("risk_tolerance", 3)
                .set("target_profit", 10),
        )
        .await
        .unwrap();

    uow.bot_activities()
        .record(bot.id, "ANALYSIS", Some("scanning BTCUSDT".to_string()))
        .await
        .unwrap();
    uow.bot_activities()
        .record(bot.id, "BUY", Some("bought 0.001 BTC".to_string()))
        .await
        .unwrap();

    let page = uow.bot_activities().list_page(bot.id, 1, 10).await.unwrap();
    assert_eq!(page.count, 2);
    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().any(|a| a.activity_type == "BUY"));

    uow.rollback().await.unwrap();
}
