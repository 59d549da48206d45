//! Rendering a [`StatementModel`] into command template text.
//!
//! The output still contains `{...}` placeholders; the connection's `apply`
//! step resolves them against the merged context. A nested statement is
//! emitted as a raw placeholder under [`NESTED_CONTEXT_PATH`];
//! [`nested_context`] renders it against its own context into the matching
//! [`Value::Sql`], so applied text is never scanned twice.
//!
//! Clause order for SELECT:
//!
//! ```text
//! SELECT [prefix] [DISTINCT] fields FROM t0 [joins] [WHERE] [GROUP BY] [HAVING]
//!        [ORDER BY] [LIMIT n [OFFSET m]] [FOR UPDATE] [suffix]
//! ```

mod postgres;

pub use postgres::PostgresCompiler;

use crate::context::Context;
use crate::dialect::Dialect;
use crate::error::{WeaveError, WeaveResult};
use crate::model::{
    CUSTOM_PREFIX, CUSTOM_SUFFIX, Definition, FILTER_HAVING, FILTER_WHERE, FLAG_DISTINCT,
    FLAG_FOR_UPDATE, FLAG_IGNORE, JoinKind, OrderItem, StatementModel, TableRef,
};
use crate::template;
use crate::value::Value;
use std::fmt;

/// Context subtree holding the rendered sub-selects of nested definitions.
pub const NESTED_CONTEXT_PATH: &str = "__nested";

/// The four command texts a compiler can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Select,
    Insert,
    Update,
    Delete,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dialect-specific statement renderer.
///
/// Object safe: connections hand out `&dyn Compiler`.
pub trait Compiler: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Filter types declared on statements created by a connection.
    fn filter_types(&self) -> &'static [&'static str] {
        &[FILTER_WHERE, FILTER_HAVING]
    }

    /// Custom fragment names declared on statements created by a connection.
    fn custom_names(&self) -> &'static [&'static str] {
        &[CUSTOM_PREFIX, CUSTOM_SUFFIX]
    }

    fn select(&self, model: &StatementModel, dialect: &Dialect) -> WeaveResult<String>;

    fn insert(&self, model: &StatementModel, dialect: &Dialect) -> WeaveResult<String>;

    fn update(&self, model: &StatementModel, dialect: &Dialect) -> WeaveResult<String>;

    fn delete(&self, model: &StatementModel, dialect: &Dialect) -> WeaveResult<String>;

    /// Render one command.
    fn compile(
        &self,
        command: Command,
        model: &StatementModel,
        dialect: &Dialect,
    ) -> WeaveResult<String> {
        match command {
            Command::Select => self.select(model, dialect),
            Command::Insert => self.insert(model, dialect),
            Command::Update => self.update(model, dialect),
            Command::Delete => self.delete(model, dialect),
        }
    }
}

/// MySQL-flavoured renderer: `IGNORE` modifiers, `ORDER BY`/`LIMIT` on
/// UPDATE and DELETE, multi-table DELETE.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCompiler;

impl Compiler for StandardCompiler {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn select(&self, model: &StatementModel, dialect: &Dialect) -> WeaveResult<String> {
        select_statement(model, dialect)
    }

    fn insert(&self, model: &StatementModel, dialect: &Dialect) -> WeaveResult<String> {
        let mut sql = Clauses::new("INSERT");
        sql.push_opt(custom_clause(model, CUSTOM_PREFIX));
        if model.has_flag(FLAG_IGNORE) {
            sql.push("IGNORE");
        }
        sql.push("INTO");
        sql.push(insert_target(model)?);
        sql.push(insert_body(model, dialect)?);
        sql.push_opt(custom_clause(model, CUSTOM_SUFFIX));
        Ok(sql.finish())
    }

    fn update(&self, model: &StatementModel, dialect: &Dialect) -> WeaveResult<String> {
        let mut sql = Clauses::new("UPDATE");
        sql.push_opt(custom_clause(model, CUSTOM_PREFIX));
        if model.has_flag(FLAG_IGNORE) {
            sql.push("IGNORE");
        }
        sql.push(source_clause(model, dialect)?);
        sql.keyword("SET", assignment_list(model, dialect)?);
        sql.keyword_opt("WHERE", filter_clause(model, FILTER_WHERE));
        sql.keyword_opt("ORDER BY", order_clause(model.sort()));
        sql.push_opt(row_limit_clause(model));
        sql.push_opt(custom_clause(model, CUSTOM_SUFFIX));
        Ok(sql.finish())
    }

    fn delete(&self, model: &StatementModel, dialect: &Dialect) -> WeaveResult<String> {
        let mut sql = Clauses::new("DELETE");
        sql.push_opt(custom_clause(model, CUSTOM_PREFIX));
        if model.has_flag(FLAG_IGNORE) {
            sql.push("IGNORE");
        }
        let (alias, _) = first_table(model)?;
        let multi_table = model.tables().count() > 1;
        if multi_table {
            if !model.sort().is_empty() || model.limit() > 0 {
                return Err(WeaveError::invalid_argument(
                    "multi-table DELETE cannot use ORDER BY or LIMIT",
                ));
            }
            sql.push(dialect.quote_name(alias));
        }
        sql.keyword("FROM", source_clause(model, dialect)?);
        sql.keyword_opt("WHERE", filter_clause(model, FILTER_WHERE));
        sql.keyword_opt("ORDER BY", order_clause(model.sort()));
        sql.push_opt(row_limit_clause(model));
        sql.push_opt(custom_clause(model, CUSTOM_SUFFIX));
        Ok(sql.finish())
    }
}

/// Space-joined clause accumulator.
struct Clauses(Vec<String>);

impl Clauses {
    fn new(keyword: &str) -> Self {
        Self(vec![keyword.to_string()])
    }

    fn push(&mut self, part: impl Into<String>) {
        self.0.push(part.into());
    }

    fn push_opt(&mut self, part: Option<String>) {
        if let Some(part) = part {
            self.0.push(part);
        }
    }

    fn keyword(&mut self, keyword: &str, body: String) {
        self.0.push(format!("{keyword} {body}"));
    }

    fn keyword_opt(&mut self, keyword: &str, body: Option<String>) {
        if let Some(body) = body {
            self.keyword(keyword, body);
        }
    }

    fn finish(self) -> String {
        self.0.join(" ")
    }
}

fn select_statement(model: &StatementModel, dialect: &Dialect) -> WeaveResult<String> {
    let mut sql = Clauses::new("SELECT");
    sql.push_opt(custom_clause(model, CUSTOM_PREFIX));
    if model.has_flag(FLAG_DISTINCT) {
        sql.push("DISTINCT");
    }
    sql.push(field_list(model, dialect));
    sql.keyword("FROM", source_clause(model, dialect)?);
    sql.keyword_opt("WHERE", filter_clause(model, FILTER_WHERE));
    sql.keyword_opt("GROUP BY", order_clause(model.group()));
    sql.keyword_opt("HAVING", filter_clause(model, FILTER_HAVING));
    sql.keyword_opt("ORDER BY", order_clause(model.sort()));
    sql.push_opt(limit_clause(model));
    if model.has_flag(FLAG_FOR_UPDATE) {
        sql.push("FOR UPDATE");
    }
    sql.push_opt(custom_clause(model, CUSTOM_SUFFIX));
    Ok(sql.finish())
}

/// Where a definition sits in the model; names its nested placeholder.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Table(usize),
    Field(usize),
}

impl Slot {
    fn key(self) -> String {
        match self {
            Self::Table(i) => format!("{NESTED_CONTEXT_PATH}.table_{i}"),
            Self::Field(i) => format!("{NESTED_CONTEXT_PATH}.field_{i}"),
        }
    }
}

/// Text definitions are copied as-is; nested statements become a raw
/// placeholder filled by [`nested_context`].
fn render_definition(definition: &Definition, slot: Slot) -> String {
    match definition {
        Definition::Expr(text) => text.clone(),
        Definition::Nested(_) => format!("{{?{}}}", slot.key()),
    }
}

/// `definition AS alias`, or just the definition when it is its own alias.
fn render_aliased(
    alias: &str,
    definition: &Definition,
    slot: Slot,
    dialect: &Dialect,
) -> String {
    let rendered = render_definition(definition, slot);
    if definition.as_expr() == Some(alias) {
        return rendered;
    }
    format!("{rendered} AS {}", dialect.quote_name(alias))
}

/// Rendered `(SELECT ...)` of every nested table and field, keyed the way the
/// compiled text refers to them. Merge it over the execution context.
pub fn nested_context(
    compiler: &dyn Compiler,
    model: &StatementModel,
    dialect: &Dialect,
) -> WeaveResult<Context> {
    let tables = model
        .tables()
        .enumerate()
        .map(|(i, (_, t))| (Slot::Table(i), t.definition()));
    let fields = model
        .fields()
        .enumerate()
        .map(|(i, (_, d))| (Slot::Field(i), d));

    let mut context = Context::new();
    for (slot, definition) in tables.chain(fields) {
        if let Definition::Nested(nested) = definition {
            let sql = render_select(compiler, nested, dialect)?;
            context.set(&slot.key(), Value::sql(format!("({sql})")));
        }
    }
    Ok(context)
}

/// Fully applied SELECT of `model` against its own context.
pub fn render_select(
    compiler: &dyn Compiler,
    model: &StatementModel,
    dialect: &Dialect,
) -> WeaveResult<String> {
    let text = compiler.select(model, dialect)?;
    let mut context = model.context().clone();
    context.merge(nested_context(compiler, model, dialect)?);
    Ok(template::apply(&text, &context, dialect))
}

fn first_table(model: &StatementModel) -> WeaveResult<(&str, &TableRef)> {
    model
        .tables()
        .next()
        .ok_or_else(|| WeaveError::invalid_argument("statement has no table"))
}

fn field_list(model: &StatementModel, dialect: &Dialect) -> String {
    let fields: Vec<String> = model
        .fields()
        .enumerate()
        .map(|(i, (alias, def))| render_aliased(alias, def, Slot::Field(i), dialect))
        .collect();
    if fields.is_empty() {
        return "*".to_string();
    }
    fields.join(", ")
}

/// First table plus every join, in insertion order.
fn source_clause(model: &StatementModel, dialect: &Dialect) -> WeaveResult<String> {
    let (alias, table) = first_table(model)?;
    let mut parts = vec![render_aliased(alias, table.definition(), Slot::Table(0), dialect)];
    for (i, (alias, table)) in model.tables().enumerate().skip(1) {
        let target = render_aliased(alias, table.definition(), Slot::Table(i), dialect);
        parts.push(match (table.join_kind(), table.join_filter()) {
            (JoinKind::Inner, None) => format!("CROSS JOIN {target}"),
            (kind, Some(on)) => format!("{} {target} ON {on}", kind.as_sql()),
            (kind, None) => format!("{} {target} ON 1=1", kind.as_sql()),
        });
    }
    Ok(parts.join(" "))
}

/// Fragments of one filter type, glued in insertion order.
///
/// With more than one fragment each is parenthesized so an `OR` inside a
/// fragment cannot leak into its neighbours.
fn filter_clause(model: &StatementModel, kind: &str) -> Option<String> {
    let filters = model.filters(kind).ok().filter(|f| !f.is_empty())?;
    let wrap = filters.len() > 1;
    let mut out = String::new();
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            out.push(' ');
            out.push_str(filter.glue().as_sql());
            out.push(' ');
        }
        if wrap {
            out.push('(');
            out.push_str(filter.expression());
            out.push(')');
        } else {
            out.push_str(filter.expression());
        }
    }
    Some(out)
}

fn order_clause(items: &[OrderItem]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let rendered: Vec<String> = items
        .iter()
        .map(|item| {
            if item.descending() {
                format!("{} DESC", item.expression())
            } else {
                item.expression().to_string()
            }
        })
        .collect();
    Some(rendered.join(", "))
}

fn limit_clause(model: &StatementModel) -> Option<String> {
    match (model.limit(), model.offset()) {
        (0, _) => None,
        (count, 0) => Some(format!("LIMIT {count}")),
        (count, offset) => Some(format!("LIMIT {count} OFFSET {offset}")),
    }
}

/// UPDATE/DELETE take a row count only.
fn row_limit_clause(model: &StatementModel) -> Option<String> {
    match model.limit() {
        0 => None,
        count => Some(format!("LIMIT {count}")),
    }
}

fn custom_clause(model: &StatementModel, name: &str) -> Option<String> {
    let fragments = model.custom(name).ok().filter(|c| !c.is_empty())?;
    Some(fragments.join(" "))
}

/// `alias = definition` pairs for UPDATE ... SET.
fn assignment_list(model: &StatementModel, dialect: &Dialect) -> WeaveResult<String> {
    let assignments: Vec<String> = model
        .fields()
        .enumerate()
        .map(|(i, (alias, def))| {
            let value = render_definition(def, Slot::Field(i));
            format!("{} = {value}", dialect.quote_name(alias))
        })
        .collect();
    if assignments.is_empty() {
        return Err(WeaveError::invalid_argument("UPDATE requires at least one field"));
    }
    Ok(assignments.join(", "))
}

/// INSERT target: the first table's definition, never aliased.
fn insert_target(model: &StatementModel) -> WeaveResult<String> {
    let (_, table) = first_table(model)?;
    Ok(render_definition(table.definition(), Slot::Table(0)))
}

/// `(columns) VALUES (definitions)`: field aliases name the columns.
fn insert_body(model: &StatementModel, dialect: &Dialect) -> WeaveResult<String> {
    let mut columns = Vec::new();
    let mut values = Vec::new();
    for (i, (alias, def)) in model.fields().enumerate() {
        columns.push(dialect.quote_name(alias));
        values.push(render_definition(def, Slot::Field(i)));
    }
    if columns.is_empty() {
        return Err(WeaveError::invalid_argument("INSERT requires at least one field"));
    }
    Ok(format!(
        "({}) VALUES ({})",
        columns.join(", "),
        values.join(", ")
    ))
}
