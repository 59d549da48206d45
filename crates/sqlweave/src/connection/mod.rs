//! The driver seam.
//!
//! A [`Connection`] executes fully quoted SQL text and knows its [`Dialect`]
//! and [`Compiler`]. Everything above it (templates, statements,
//! transactions) is written against this trait, so the same
//! [`Statement`]/[`Transaction`] code runs on [`MemoryConnection`] in tests
//! and on [`PgConnection`] against a live server.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryConnection;
#[cfg(feature = "postgres")]
pub use postgres::PgConnection;

use crate::compiler::Compiler;
use crate::context::Context;
use crate::dialect::Dialect;
use crate::error::WeaveResult;
use crate::result::ResultSet;
use crate::statement::Statement;
use crate::template;
use crate::transaction::Transaction;

/// A database connection statements and transactions run on.
///
/// Implementors provide [`Connection::execute`]; the transaction primitives
/// default to plain SQL (`BEGIN`, `SAVEPOINT name`, ...) run through it.
pub trait Connection: Send + Sync {
    /// Identifier used in errors and logs.
    fn id(&self) -> &str;

    fn dialect(&self) -> &Dialect;

    fn compiler(&self) -> &dyn Compiler;

    /// Execute one fully quoted statement.
    fn execute(&self, sql: &str) -> impl Future<Output = WeaveResult<ResultSet>> + Send;

    /// Execute multi-statement text, one result per statement.
    fn execute_script(
        &self,
        sql: &str,
    ) -> impl Future<Output = WeaveResult<Vec<ResultSet>>> + Send {
        async move {
            let mut results = Vec::new();
            for statement in template::split_statements(sql, self.dialect()) {
                results.push(self.execute(&statement).await?);
            }
            Ok(results)
        }
    }

    /// Escape text for inclusion between value quotes.
    fn escape(&self, text: &str) -> String {
        self.dialect().escape(text)
    }

    /// Resolve the placeholders of `template` against `context`.
    fn apply(&self, template: &str, context: &Context) -> String {
        template::apply(template, context, self.dialect())
    }

    // ==================== Transaction primitives ====================

    fn begin(&self) -> impl Future<Output = WeaveResult<()>> + Send {
        async move { self.execute("BEGIN").await.map(drop) }
    }

    fn create_savepoint(&self, name: &str) -> impl Future<Output = WeaveResult<()>> + Send {
        async move {
            let sql = format!("SAVEPOINT {}", self.dialect().quote_name(name));
            self.execute(&sql).await.map(drop)
        }
    }

    fn rollback_to_savepoint(&self, name: &str) -> impl Future<Output = WeaveResult<()>> + Send {
        async move {
            let sql = format!("ROLLBACK TO SAVEPOINT {}", self.dialect().quote_name(name));
            self.execute(&sql).await.map(drop)
        }
    }

    fn release_savepoint(&self, name: &str) -> impl Future<Output = WeaveResult<()>> + Send {
        async move {
            let sql = format!("RELEASE SAVEPOINT {}", self.dialect().quote_name(name));
            self.execute(&sql).await.map(drop)
        }
    }

    fn commit(&self) -> impl Future<Output = WeaveResult<()>> + Send {
        async move { self.execute("COMMIT").await.map(drop) }
    }

    fn rollback(&self) -> impl Future<Output = WeaveResult<()>> + Send {
        async move { self.execute("ROLLBACK").await.map(drop) }
    }

    // ==================== Factories ====================

    /// New statement declaring this connection's filter types and custom names.
    fn statement(&self) -> Statement<'_, Self>
    where
        Self: Sized,
    {
        Statement::new(self)
    }

    /// New idle transaction controller.
    fn transaction(&self) -> Transaction<'_, Self>
    where
        Self: Sized,
    {
        Transaction::new(self)
    }
}

/// Debug-log one statement about to run.
pub(crate) fn log_sql(connection: &str, dialect: &Dialect, sql: &str) {
    let shown = dialect.truncate_for_log(sql);
    if shown.len() < sql.len() {
        let shown = format!("{shown}...");
        tracing::debug!(target: "sqlweave.sql", connection, sql = %shown);
    } else {
        tracing::debug!(target: "sqlweave.sql", connection, sql = %shown);
    }
}
