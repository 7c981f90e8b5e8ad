//! Ambient transaction carrier (spec.md §4.3, design note in §9).
//!
//! `WithTransaction` begins a transaction, stashes it in task-local
//! storage for the duration of the closure, and commits/rolls back on the
//! single return path. Repositories never see a `Transaction` argument —
//! they call `TransactionManager::execute`, which picks whichever
//! connection is ambient right now. Nested `with_transaction` calls detect
//! the ambient transaction and just run the closure directly, reusing the
//! outer transaction instead of opening a new one.

use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::cell::RefCell;
use std::future::Future;
use tokio::task_local;

use crate::domain::error::DomainError;

task_local! {
    static CURRENT_TX: RefCell<Option<Transaction<'static, Postgres>>>;
}

#[derive(Clone)]
pub struct TransactionManager {
    pool: PgPool,
}

impl TransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn in_transaction() -> bool {
        CURRENT_TX.try_with(|cell| cell.borrow().is_some()).unwrap_or(false)
    }

    /// Runs `f` inside a DB transaction. Commits if `f` returns `Ok`, rolls
    /// back otherwise — on every return path, including an early `?`.
    pub async fn with_transaction<F, Fut, T>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        if Self::in_transaction() {
            return f().await;
        }

        let tx = self.pool.begin().await.map_err(DomainError::from_sqlx)?;
        let cell = RefCell::new(Some(tx));

        let (result, tx) = CURRENT_TX
            .scope(cell, async {
                let result = f().await;
                let tx = CURRENT_TX.with(|c| c.borrow_mut().take());
                (result, tx)
            })
            .await;

        let tx = tx.expect("transaction must still be present after running the closure");
        match result {
            Ok(value) => {
                tx.commit().await.map_err(DomainError::from_sqlx)?;
                Ok(value)
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }

    /// Runs `f` against whichever connection is ambient: the in-progress
    /// transaction if one was opened by an enclosing `with_transaction`,
    /// otherwise a fresh connection acquired from the pool.
    ///
    /// Single-task access only: if two `execute` calls from the same task
    /// interleave (e.g. via `tokio::join!` without separate transactions)
    /// they would race on the task-local cell. Every use case in this
    /// crate calls `execute` sequentially, never concurrently, within one
    /// `with_transaction` scope.
    pub async fn execute<F, Fut, T>(&self, f: F) -> Result<T, sqlx::Error>
    where
        F: FnOnce(&mut PgConnection) -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        if Self::in_transaction() {
            let mut tx = CURRENT_TX
                .with(|cell| cell.borrow_mut().take())
                .expect("transaction present");
            let result = f(&mut tx).await;
            CURRENT_TX.with(|cell| *cell.borrow_mut() = Some(tx));
            result
        } else {
            let mut conn = self.pool.acquire().await?;
            f(&mut conn).await
        }
    }
}
