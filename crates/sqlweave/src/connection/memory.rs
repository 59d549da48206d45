use super::{Connection, log_sql};
use crate::compiler::{Compiler, PostgresCompiler, StandardCompiler};
use crate::dialect::Dialect;
use crate::error::{WeaveError, WeaveResult};
use crate::result::ResultSet;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-process connection that records every statement it is given.
///
/// Useful for tests and dry runs:
/// - queued results (see [`MemoryConnection::push_result`]) are returned in
///   order by non-transaction statements; otherwise an empty result is returned;
/// - [`MemoryConnection::fail_when`] makes matching statements fail like a
///   driver error would.
#[derive(Debug)]
pub struct MemoryConnection {
    id: String,
    dialect: Dialect,
    compiler: Box<dyn Compiler>,
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    executed: Vec<String>,
    results: VecDeque<ResultSet>,
    failures: Vec<(String, String)>,
}

impl MemoryConnection {
    /// Standard dialect and compiler.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dialect: Dialect::standard(),
            compiler: Box::new(StandardCompiler),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Postgres dialect and compiler.
    pub fn postgres(id: impl Into<String>) -> Self {
        Self::new(id)
            .with_dialect(Dialect::postgres())
            .with_compiler(PostgresCompiler)
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_compiler(mut self, compiler: impl Compiler + 'static) -> Self {
        self.compiler = Box::new(compiler);
        self
    }

    /// Queue a result for the next non-transaction statement.
    pub fn push_result(&self, result: ResultSet) {
        self.state().results.push_back(result);
    }

    /// Fail every statement containing `pattern` with `message`.
    pub fn fail_when(&self, pattern: impl Into<String>, message: impl Into<String>) {
        self.state().failures.push((pattern.into(), message.into()));
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// Statements executed so far, failed ones included.
    pub fn executed(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    /// Return and forget the executed statements.
    pub fn take_executed(&self) -> Vec<String> {
        std::mem::take(&mut self.state().executed)
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_transaction_control(sql: &str) -> bool {
    let head = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        head.as_str(),
        "BEGIN" | "START" | "COMMIT" | "ROLLBACK" | "SAVEPOINT" | "RELEASE"
    )
}

impl Connection for MemoryConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    fn compiler(&self) -> &dyn Compiler {
        self.compiler.as_ref()
    }

    async fn execute(&self, sql: &str) -> WeaveResult<ResultSet> {
        log_sql(&self.id, &self.dialect, sql);
        let mut state = self.state();
        state.executed.push(sql.to_string());

        if let Some((_, message)) = state.failures.iter().find(|(p, _)| sql.contains(p.as_str())) {
            return Err(WeaveError::execution(&self.id, sql, message.clone()));
        }
        if is_transaction_control(sql) {
            return Ok(ResultSet::affected(0).with_sql(sql));
        }
        Ok(state.results.pop_front().unwrap_or_default().with_sql(sql))
    }
}
