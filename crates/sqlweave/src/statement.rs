//! A [`StatementModel`] bound to a connection.
//!
//! `Statement` derefs to its model, so every builder method is available on
//! it directly. Execution compiles the model fresh each time, merges the call
//! context over the statement's own, applies the template and runs it:
//!
//! ```ignore
//! let mut stmt = conn.statement();
//! stmt.from("users")?.add_where("id = {filter.where.id}", None)?;
//!
//! let ctx = Context::new().with("filter.where.id", 7);
//! let mut users = stmt.search(Some(&ctx)).await?.one()?;
//! ```

use crate::compiler::{Command, nested_context};
use crate::connection::Connection;
use crate::context::Context;
use crate::error::{WeaveError, WeaveResult};
use crate::model::StatementModel;
use crate::result::ResultSet;
use crate::template;
use crate::value::Value;
use std::ops::{Deref, DerefMut};

/// What one execution produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    /// Single-statement text.
    One(ResultSet),
    /// Multi-statement text, one result per statement.
    Many(Vec<ResultSet>),
}

impl Execution {
    /// The single result; an error for multi-statement executions.
    pub fn one(self) -> WeaveResult<ResultSet> {
        match self {
            Self::One(result) => Ok(result),
            Self::Many(mut results) if results.len() == 1 => Ok(results.remove(0)),
            Self::Many(results) => Err(WeaveError::Other(format!(
                "expected one result, got {}",
                results.len()
            ))),
        }
    }

    pub fn into_vec(self) -> Vec<ResultSet> {
        match self {
            Self::One(result) => vec![result],
            Self::Many(results) => results,
        }
    }
}

/// Statement builder bound to one connection.
pub struct Statement<'c, C: Connection> {
    connection: &'c C,
    model: StatementModel,
}

impl<'c, C: Connection> Statement<'c, C> {
    /// Declare the connection's filter types and custom names on a new model.
    pub fn new(connection: &'c C) -> Self {
        let compiler = connection.compiler();
        Self {
            connection,
            model: StatementModel::with_support(compiler.filter_types(), compiler.custom_names()),
        }
    }

    /// Bind an existing model. Its declarations are kept as they are.
    pub fn from_model(connection: &'c C, model: StatementModel) -> Self {
        Self { connection, model }
    }

    pub fn connection(&self) -> &'c C {
        self.connection
    }

    pub fn model(&self) -> &StatementModel {
        &self.model
    }

    pub fn into_model(self) -> StatementModel {
        self.model
    }

    /// Final SQL for `command` without executing it.
    ///
    /// The statement's context is copied and `overrides` merged on top; the
    /// stored context is never modified.
    pub fn render(&self, command: Command, overrides: Option<&Context>) -> WeaveResult<String> {
        let (text, context) = self.prepare(command, overrides)?;
        Ok(self.connection.apply(&text, &context))
    }

    /// Compiled template plus the context it is applied against.
    fn prepare(
        &self,
        command: Command,
        overrides: Option<&Context>,
    ) -> WeaveResult<(String, Context)> {
        let compiler = self.connection.compiler();
        let dialect = self.connection.dialect();
        let text = compiler.compile(command, &self.model, dialect)?;
        let mut context = self.model.context().merged(overrides);
        context.merge(nested_context(compiler, &self.model, dialect)?);
        Ok((text, context))
    }

    /// The applied SELECT as a parenthesized SQL value, for use as a context
    /// value in another statement.
    pub fn subquery(&self) -> WeaveResult<Value> {
        Ok(Value::sql(format!("({})", self.render(Command::Select, None)?)))
    }

    pub async fn search(&self, overrides: Option<&Context>) -> WeaveResult<Execution> {
        self.run(Command::Select, overrides).await
    }

    pub async fn create(&self, overrides: Option<&Context>) -> WeaveResult<Execution> {
        self.run(Command::Insert, overrides).await
    }

    pub async fn update(&self, overrides: Option<&Context>) -> WeaveResult<Execution> {
        self.run(Command::Update, overrides).await
    }

    pub async fn remove(&self, overrides: Option<&Context>) -> WeaveResult<Execution> {
        self.run(Command::Delete, overrides).await
    }

    /// The compiled template is split before values are applied, so bound
    /// text never decides where a statement ends.
    async fn run(&self, command: Command, overrides: Option<&Context>) -> WeaveResult<Execution> {
        let (text, context) = self.prepare(command, overrides)?;
        let pieces = template::split_statements(&text, self.connection.dialect());
        if pieces.len() <= 1 {
            let sql = self.connection.apply(&text, &context);
            return Ok(Execution::One(self.connection.execute(&sql).await?));
        }

        tracing::trace!(
            target: "sqlweave.sql",
            connection = %self.connection.id(),
            %command,
            statements = pieces.len(),
            "multi-statement execution"
        );
        let mut results = Vec::with_capacity(pieces.len());
        for piece in &pieces {
            let sql = self.connection.apply(piece, &context);
            results.push(self.connection.execute(&sql).await?);
        }
        Ok(Execution::Many(results))
    }
}

impl<C: Connection> Clone for Statement<'_, C> {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection,
            model: self.model.clone(),
        }
    }
}

impl<C: Connection> std::fmt::Debug for Statement<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("connection", &self.connection.id())
            .field("model", &self.model)
            .finish()
    }
}

impl<C: Connection> Deref for Statement<'_, C> {
    type Target = StatementModel;

    fn deref(&self) -> &StatementModel {
        &self.model
    }
}

impl<C: Connection> DerefMut for Statement<'_, C> {
    fn deref_mut(&mut self) -> &mut StatementModel {
        &mut self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MemoryConnection;
    use crate::model::{CUSTOM_SUFFIX, JoinKind};

    #[tokio::test]
    async fn overrides_do_not_leak_into_the_statement() {
        let conn = MemoryConnection::new("mem");
        let mut stmt = conn.statement();
        stmt.from("users")
            .unwrap()
            .add_where("id = {filter.where.id}", Some(Context::new().with("id", 1)))
            .unwrap();

        let ctx = Context::new().with("filter.where.id", 2);
        stmt.search(None).await.unwrap();
        stmt.search(Some(&ctx)).await.unwrap();

        assert_eq!(
            conn.executed(),
            vec![
                "SELECT * FROM users WHERE id = 1",
                "SELECT * FROM users WHERE id = 2",
            ]
        );
        assert_eq!(stmt.context().resolve("filter.where.id"), Value::Int(1));
    }

    #[tokio::test]
    async fn builder_changes_show_up_on_the_next_run() {
        let conn = MemoryConnection::new("mem");
        let mut stmt = conn.statement();
        stmt.from("t").unwrap();
        stmt.search(None).await.unwrap();
        stmt.set_limit(1, None).unwrap();
        stmt.search(None).await.unwrap();
        assert_eq!(
            conn.executed(),
            vec!["SELECT * FROM t", "SELECT * FROM t LIMIT 1"]
        );
    }

    #[tokio::test]
    async fn all_four_commands() {
        let conn = MemoryConnection::new("mem");
        let mut stmt = conn.statement();
        stmt.from("users")
            .unwrap()
            .add_field("{row.name}", Some("name"))
            .unwrap()
            .add_where("id = {id}", None)
            .unwrap();
        let ctx = Context::new().with("row.name", "o'neil").with("id", 9);

        stmt.create(Some(&ctx)).await.unwrap();
        stmt.update(Some(&ctx)).await.unwrap();
        stmt.remove(Some(&ctx)).await.unwrap();
        assert_eq!(
            conn.executed(),
            vec![
                "INSERT INTO users (`name`) VALUES ('o\\'neil')",
                "UPDATE users SET `name` = 'o\\'neil' WHERE id = 9",
                "DELETE FROM users WHERE id = 9",
            ]
        );
    }

    #[tokio::test]
    async fn multi_statement_text_yields_many_results() {
        let conn = MemoryConnection::new("mem");
        let mut stmt = conn.statement();
        stmt.from("t")
            .unwrap()
            .add_custom(CUSTOM_SUFFIX, "; SELECT FOUND_ROWS()")
            .unwrap();
        let results = stmt.search(None).await.unwrap();
        assert!(matches!(results, Execution::Many(ref r) if r.len() == 2));
        assert!(results.one().is_err());
        assert_eq!(conn.executed(), vec!["SELECT * FROM t", "SELECT FOUND_ROWS()"]);
    }

    #[tokio::test]
    async fn driver_failure_is_wrapped_with_sql() {
        let conn = MemoryConnection::new("mem");
        conn.fail_when("FROM missing", "no such table");
        let mut stmt = conn.statement();
        stmt.from("missing").unwrap();
        let err = stmt.search(None).await.unwrap_err();
        assert_eq!(err.sql(), Some("SELECT * FROM missing"));
    }

    #[test]
    fn subquery_is_applied_and_parenthesized() {
        let conn = MemoryConnection::new("mem");
        let mut inner = conn.statement();
        inner
            .from("orders")
            .unwrap()
            .add_field("user_id", None)
            .unwrap()
            .add_where("total > {min}", None)
            .unwrap();
        inner.bind("min", 10);

        let mut outer = conn.statement();
        outer
            .from("users")
            .unwrap()
            .add_where("id IN {ids}", None)
            .unwrap();
        outer.bind("ids", inner.subquery().unwrap());
        assert_eq!(
            outer.render(Command::Select, None).unwrap(),
            "SELECT * FROM users WHERE id IN (SELECT user_id FROM orders WHERE total > 10)"
        );
    }

    #[test]
    fn nested_model_as_table() {
        let conn = MemoryConnection::postgres("pg");
        let mut inner = conn.statement();
        inner.from("events").unwrap().add_field("count(*)", Some("n")).unwrap();

        let mut outer = conn.statement();
        outer
            .add_table(inner.into_model(), Some("e"), None, JoinKind::Inner)
            .unwrap();
        assert_eq!(
            outer.render(Command::Select, None).unwrap(),
            "SELECT * FROM (SELECT count(*) AS \"n\" FROM events) AS \"e\""
        );
    }

    #[tokio::test]
    async fn nested_model_keeps_its_values_and_outer_placeholders_resolve() {
        let conn = MemoryConnection::postgres("pg");
        let mut inner = conn.statement();
        inner
            .from("notes")
            .unwrap()
            .add_field("user_id", None)
            .unwrap()
            .add_where("path = {path}", None)
            .unwrap();
        inner.bind("path", r"C:\");

        let mut outer = conn.statement();
        outer
            .add_table(inner.into_model(), Some("n"), None, JoinKind::Inner)
            .unwrap()
            .add_where("n.user_id = {id}", None)
            .unwrap()
            .add_where("label <> {label}", None)
            .unwrap();
        let ctx = Context::new().with("id", 3).with("label", "a;b");

        let expected = r#"SELECT * FROM (SELECT user_id FROM notes WHERE path = 'C:\') AS "n" WHERE (n.user_id = 3) AND (label <> 'a;b')"#;
        assert_eq!(outer.render(Command::Select, Some(&ctx)).unwrap(), expected);

        let results = outer.search(Some(&ctx)).await.unwrap();
        assert!(matches!(results, Execution::One(_)));
        assert_eq!(conn.executed(), vec![expected]);
    }

    #[tokio::test]
    async fn bound_separator_never_splits_the_statement() {
        let conn = MemoryConnection::new("mem");
        let mut stmt = conn.statement();
        stmt.from("t")
            .unwrap()
            .add_where("note = {?note}", None)
            .unwrap();
        let ctx = Context::new().with("note", "1; DELETE FROM t");

        let results = stmt.search(Some(&ctx)).await.unwrap();
        assert!(matches!(results, Execution::One(_)));
        assert_eq!(
            conn.executed(),
            vec!["SELECT * FROM t WHERE note = 1; DELETE FROM t"]
        );
    }

    #[test]
    fn clone_deep_copies_context() {
        let conn = MemoryConnection::new("mem");
        let mut stmt = conn.statement();
        stmt.bind("a", 1);
        let mut copy = stmt.clone();
        copy.bind("a", 2);
        assert_eq!(stmt.context().resolve("a"), Value::Int(1));
        assert_eq!(copy.context().resolve("a"), Value::Int(2));
    }
}
