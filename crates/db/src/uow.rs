use futures::future::BoxFuture;
use sqlx::{PgPool, Postgres, Transaction};
use tradechat_core::{BotActivity, ExchangeAccount, Message, Thread, TradingBot, User};

use crate::repository::{Entity, InsertFields, Repo};
use crate::DbError;

/// Binds a group of repository operations to one transaction.
///
/// Opening a unit of work checks one session out of the shared pool and
/// owns it exclusively for the scope; repositories are borrowed views over
/// that session and cannot outlive it. A unit of work is single-use:
/// `commit` and `rollback` consume it, and dropping one that is still open
/// rolls the transaction back.
pub struct UnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl UnitOfWork {
    /// Open a scope: closed → open.
    pub async fn begin(pool: &PgPool) -> Result<Self, DbError> {
        let tx = pool.begin().await?;
        Ok(Self { tx })
    }

    /// The live session, for free functions like [`crate::paginate`].
    pub fn conn(&mut self) -> &mut sqlx::PgConnection {
        &mut self.tx
    }

    pub fn users(&mut self) -> Repo<'_, User> {
        Repo::new(&mut self.tx)
    }

    pub fn threads(&mut self) -> Repo<'_, Thread> {
        Repo::new(&mut self.tx)
    }

    pub fn messages(&mut self) -> Repo<'_, Message> {
        Repo::new(&mut self.tx)
    }

    pub fn exchange_accounts(&mut self) -> Repo<'_, ExchangeAccount> {
        Repo::new(&mut self.tx)
    }

    pub fn trading_bots(&mut self) -> Repo<'_, TradingBot> {
        Repo::new(&mut self.tx)
    }

    pub fn bot_activities(&mut self) -> Repo<'_, BotActivity> {
        Repo::new(&mut self.tx)
    }

    /// Stage an instance for insertion without committing.
    pub async fn add<E>(&mut self, instance: &E) -> Result<(), DbError>
    where
        E: Entity + InsertFields,
    {
        Repo::<E>::new(&mut self.tx).add(instance).await
    }

    /// open → committed.
    pub async fn commit(self) -> Result<(), DbError> {
        self.tx.commit().await?;
        Ok(())
    }

    /// open → rolled-back.
    pub async fn rollback(self) -> Result<(), DbError> {
        self.tx.rollback().await?;
        Ok(())
    }

    /// Run `f` inside a fresh scope: commit on clean exit, log and roll
    /// back on error, re-raising the original error unchanged.
    pub async fn run<T, E, F>(pool: &PgPool, f: F) -> Result<T, E>
    where
        E: From<DbError> + std::fmt::Display,
        F: for<'a> FnOnce(&'a mut UnitOfWork) -> BoxFuture<'a, Result<T, E>>,
    {
        let mut uow = UnitOfWork::begin(pool).await.map_err(E::from)?;
        match f(&mut uow).await {
            Ok(value) => {
                uow.commit().await.map_err(E::from)?;
                Ok(value)
            }
            Err(err) => {
                tracing::error!(error = %err, "error inside unit of work, rolling back");
                if let Err(rollback_err) = uow.rollback().await {
                    tracing::error!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
