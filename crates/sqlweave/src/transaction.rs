//! Transaction controller: begin/savepoint/commit/rollback state on top of a
//! [`Connection`], plus the scoped helpers [`Transaction::run_new`] and
//! [`Transaction::run_within`].
//!
//! The helpers always roll back before returning an error, and the error
//! returned is the original one; a failing rollback is only logged.
//!
//! # Example
//!
//! ```ignore
//! use sqlweave::{Connection, Context, WeaveResult};
//!
//! # async fn demo(conn: &sqlweave::MemoryConnection) -> WeaveResult<()> {
//! let mut tx = conn.transaction();
//! tx.run_new(
//!     async |conn, tx| {
//!         let mut debit = conn.statement();
//!         debit.from("accounts")?.add_field("balance - {amount}", Some("balance"))?;
//!         debit.add_where("id = {id}", None)?;
//!         debit.update(Some(&Context::new().with("amount", 100).with("id", 1))).await?;
//!
//!         // failure here only undoes the audit insert
//!         let _ = tx
//!             .run_within(async |conn, _| audit(conn).await, Some("audit"), false)
//!             .await;
//!         Ok(())
//!     },
//!     true,
//! )
//! .await?;
//! # Ok(()) }
//! ```

use crate::connection::Connection;
use crate::error::{WeaveError, WeaveResult};

/// Transaction state for one connection: idle, or pending with a stack of
/// savepoints.
pub struct Transaction<'c, C: Connection> {
    connection: &'c C,
    pending: bool,
    savepoints: Vec<String>,
}

impl<'c, C: Connection> Transaction<'c, C> {
    /// Idle controller.
    pub fn new(connection: &'c C) -> Self {
        Self {
            connection,
            pending: false,
            savepoints: Vec::new(),
        }
    }

    pub fn connection(&self) -> &'c C {
        self.connection
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Active savepoints, oldest first.
    pub fn savepoints(&self) -> &[String] {
        &self.savepoints
    }

    /// Start a transaction.
    ///
    /// When already pending this is a no-op, or creates `savepoint` if given.
    /// When idle, `savepoint` (if given) is created right after `BEGIN`.
    pub async fn begin(&mut self, savepoint: Option<&str>) -> WeaveResult<()> {
        if !self.pending {
            self.connection
                .begin()
                .await
                .map_err(|e| self.wrap("begin", e))?;
            self.pending = true;
            tracing::debug!(target: "sqlweave.tx", connection = %self.connection.id(), "begin");
        }
        match savepoint {
            Some(name) => self.savepoint(name).await,
            None => Ok(()),
        }
    }

    /// Create a savepoint. Fails when idle.
    pub async fn savepoint(&mut self, name: &str) -> WeaveResult<()> {
        self.ensure_pending("savepoint")?;
        self.connection
            .create_savepoint(name)
            .await
            .map_err(|e| self.wrap("savepoint", e))?;
        self.savepoints.push(name.to_string());
        tracing::debug!(target: "sqlweave.tx", connection = %self.connection.id(), savepoint = name, "savepoint");
        Ok(())
    }

    /// Roll back to `savepoint` (staying pending), or the whole transaction.
    ///
    /// A whole rollback leaves the controller idle even when the driver fails.
    pub async fn rollback(&mut self, savepoint: Option<&str>) -> WeaveResult<()> {
        self.ensure_pending("rollback")?;
        match savepoint {
            Some(name) => {
                let depth = self.savepoint_depth(name)?;
                self.connection
                    .rollback_to_savepoint(name)
                    .await
                    .map_err(|e| self.wrap("rollback", e))?;
                // the savepoint itself survives ROLLBACK TO
                self.savepoints.truncate(depth + 1);
                tracing::debug!(target: "sqlweave.tx", connection = %self.connection.id(), savepoint = name, "rollback to savepoint");
            }
            None => {
                self.pending = false;
                self.savepoints.clear();
                self.connection
                    .rollback()
                    .await
                    .map_err(|e| self.wrap("rollback", e))?;
                tracing::debug!(target: "sqlweave.tx", connection = %self.connection.id(), "rollback");
            }
        }
        Ok(())
    }

    /// Release a savepoint and every savepoint created after it.
    pub async fn release(&mut self, name: &str) -> WeaveResult<()> {
        self.ensure_pending("release")?;
        let depth = self.savepoint_depth(name)?;
        self.connection
            .release_savepoint(name)
            .await
            .map_err(|e| self.wrap("release", e))?;
        self.savepoints.truncate(depth);
        tracing::debug!(target: "sqlweave.tx", connection = %self.connection.id(), savepoint = name, "release");
        Ok(())
    }

    /// Commit. On failure the controller stays pending so it can be rolled back.
    pub async fn commit(&mut self) -> WeaveResult<()> {
        self.ensure_pending("commit")?;
        self.connection
            .commit()
            .await
            .map_err(|e| self.wrap("commit", e))?;
        self.pending = false;
        self.savepoints.clear();
        tracing::debug!(target: "sqlweave.tx", connection = %self.connection.id(), "commit");
        Ok(())
    }

    /// Run `callback` in a new transaction.
    ///
    /// Fails before touching the driver if a transaction is already pending.
    /// Commits afterwards when `commit` is set. Any failure in begin, the
    /// callback or commit rolls back (if still pending) and is returned as is.
    pub async fn run_new<T, F>(&mut self, callback: F, commit: bool) -> WeaveResult<T>
    where
        F: AsyncFnOnce(&'c C, &mut Transaction<'c, C>) -> WeaveResult<T>,
    {
        if self.pending {
            return Err(WeaveError::TransactionState(format!(
                "transaction already pending on '{}'",
                self.connection.id()
            )));
        }
        match self.attempt(callback, None, commit).await {
            Ok(value) => Ok(value),
            Err(error) => {
                self.rollback_quietly(None, &error).await;
                Err(error)
            }
        }
    }

    /// Run `callback` inside the current transaction, starting one if idle.
    ///
    /// With `savepoint`, the savepoint is created first (after `BEGIN` when
    /// idle) and a failure rolls back to it; without, a failure rolls back the
    /// whole transaction. A transaction started by this call is always rolled
    /// back whole on failure, savepoint or not. Commit only happens after a
    /// successful callback.
    pub async fn run_within<T, F>(
        &mut self,
        callback: F,
        savepoint: Option<&str>,
        commit: bool,
    ) -> WeaveResult<T>
    where
        F: AsyncFnOnce(&'c C, &mut Transaction<'c, C>) -> WeaveResult<T>,
    {
        let started_here = !self.pending;
        match self.attempt(callback, savepoint, commit).await {
            Ok(value) => Ok(value),
            Err(error) => {
                let target = if started_here {
                    None
                } else {
                    savepoint.filter(|name| self.savepoints.iter().any(|s| s == name))
                };
                // a savepoint that was never created only guards work we started
                if target.is_some() || savepoint.is_none() || started_here {
                    self.rollback_quietly(target, &error).await;
                }
                Err(error)
            }
        }
    }

    async fn attempt<T, F>(
        &mut self,
        callback: F,
        savepoint: Option<&str>,
        commit: bool,
    ) -> WeaveResult<T>
    where
        F: AsyncFnOnce(&'c C, &mut Transaction<'c, C>) -> WeaveResult<T>,
    {
        self.begin(savepoint).await?;
        let value = callback(self.connection, self).await?;
        if commit {
            self.commit().await?;
        }
        Ok(value)
    }

    /// Roll back after `cause`, logging instead of returning a rollback failure.
    async fn rollback_quietly(&mut self, savepoint: Option<&str>, cause: &WeaveError) {
        if !self.pending {
            return;
        }
        if let Err(rollback_err) = self.rollback(savepoint).await {
            tracing::warn!(
                target: "sqlweave.tx",
                connection = %self.connection.id(),
                error = %rollback_err,
                cause = %cause,
                "rollback after failure failed"
            );
        }
    }

    fn ensure_pending(&self, action: &str) -> WeaveResult<()> {
        if self.pending {
            return Ok(());
        }
        Err(WeaveError::TransactionState(format!(
            "{action} requires a pending transaction on '{}'",
            self.connection.id()
        )))
    }

    fn savepoint_depth(&self, name: &str) -> WeaveResult<usize> {
        self.savepoints
            .iter()
            .rposition(|s| s == name)
            .ok_or_else(|| WeaveError::TransactionState(format!("unknown savepoint '{name}'")))
    }

    fn wrap(&self, action: &'static str, source: WeaveError) -> WeaveError {
        WeaveError::transaction(action, self.connection.id(), source)
    }
}

impl<C: Connection> std::fmt::Debug for Transaction<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("connection", &self.connection.id())
            .field("pending", &self.pending)
            .field("savepoints", &self.savepoints)
            .finish()
    }
}

impl<C: Connection> Drop for Transaction<'_, C> {
    fn drop(&mut self) {
        if self.pending {
            tracing::warn!(
                target: "sqlweave.tx",
                connection = %self.connection.id(),
                "transaction dropped while pending"
            );
        }
    }
}
