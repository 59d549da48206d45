use super::{
    Clauses, Compiler, Slot, assignment_list, custom_clause, filter_clause, first_table,
    insert_body, insert_target, render_aliased, select_statement,
};
use crate::dialect::Dialect;
use crate::error::{WeaveError, WeaveResult};
use crate::model::{
    CUSTOM_PREFIX, CUSTOM_RETURNING, CUSTOM_SUFFIX, FILTER_WHERE, FLAG_IGNORE, JoinKind,
    StatementModel,
};

/// Postgres renderer.
///
/// - `RETURNING` is available as the `returning` custom fragment.
/// - The `ignore` flag on INSERT becomes `ON CONFLICT DO NOTHING`.
/// - Extra tables on UPDATE/DELETE go to `FROM`/`USING` and their join
///   filters are folded into `WHERE`; only inner joins are allowed there.
/// - `ORDER BY`, `LIMIT` and `ignore` on UPDATE/DELETE are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresCompiler;

impl Compiler for PostgresCompiler {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn custom_names(&self) -> &'static [&'static str] {
        &[CUSTOM_PREFIX, CUSTOM_SUFFIX, CUSTOM_RETURNING]
    }

    fn select(&self, model: &StatementModel, dialect: &Dialect) -> WeaveResult<String> {
        select_statement(model, dialect)
    }

    fn insert(&self, model: &StatementModel, dialect: &Dialect) -> WeaveResult<String> {
        let mut sql = Clauses::new("INSERT");
        sql.push_opt(custom_clause(model, CUSTOM_PREFIX));
        sql.push("INTO");
        sql.push(insert_target(model)?);
        sql.push(insert_body(model, dialect)?);
        if model.has_flag(FLAG_IGNORE) {
            sql.push("ON CONFLICT DO NOTHING");
        }
        sql.keyword_opt("RETURNING", returning_clause(model));
        sql.push_opt(custom_clause(model, CUSTOM_SUFFIX));
        Ok(sql.finish())
    }

    fn update(&self, model: &StatementModel, dialect: &Dialect) -> WeaveResult<String> {
        reject_unsupported(model, "UPDATE")?;
        let mut sql = Clauses::new("UPDATE");
        sql.push_opt(custom_clause(model, CUSTOM_PREFIX));
        let (alias, table) = first_table(model)?;
        sql.push(render_aliased(alias, table.definition(), Slot::Table(0), dialect));
        sql.keyword("SET", assignment_list(model, dialect)?);
        sql.keyword_opt("FROM", extra_tables(model, dialect));
        sql.keyword_opt("WHERE", folded_filter(model));
        sql.keyword_opt("RETURNING", returning_clause(model));
        sql.push_opt(custom_clause(model, CUSTOM_SUFFIX));
        Ok(sql.finish())
    }

    fn delete(&self, model: &StatementModel, dialect: &Dialect) -> WeaveResult<String> {
        reject_unsupported(model, "DELETE")?;
        let mut sql = Clauses::new("DELETE");
        sql.push_opt(custom_clause(model, CUSTOM_PREFIX));
        let (alias, table) = first_table(model)?;
        sql.keyword(
            "FROM",
            render_aliased(alias, table.definition(), Slot::Table(0), dialect),
        );
        sql.keyword_opt("USING", extra_tables(model, dialect));
        sql.keyword_opt("WHERE", folded_filter(model));
        sql.keyword_opt("RETURNING", returning_clause(model));
        sql.push_opt(custom_clause(model, CUSTOM_SUFFIX));
        Ok(sql.finish())
    }
}

fn reject_unsupported(model: &StatementModel, command: &str) -> WeaveResult<()> {
    if model.limit() > 0 {
        return Err(WeaveError::invalid_argument(format!(
            "{command} does not support LIMIT on postgres"
        )));
    }
    if !model.sort().is_empty() {
        return Err(WeaveError::invalid_argument(format!(
            "{command} does not support ORDER BY on postgres"
        )));
    }
    if model.has_flag(FLAG_IGNORE) {
        return Err(WeaveError::invalid_argument(format!(
            "{command} does not support the ignore flag on postgres"
        )));
    }
    let outer_join = model
        .tables()
        .skip(1)
        .any(|(_, t)| t.join_kind() != JoinKind::Inner);
    if outer_join {
        return Err(WeaveError::invalid_argument(format!(
            "{command} only supports inner joins on postgres"
        )));
    }
    Ok(())
}

/// Tables after the first, comma separated.
fn extra_tables(model: &StatementModel, dialect: &Dialect) -> Option<String> {
    let tables: Vec<String> = model
        .tables()
        .enumerate()
        .skip(1)
        .map(|(i, (alias, t))| render_aliased(alias, t.definition(), Slot::Table(i), dialect))
        .collect();
    (!tables.is_empty()).then(|| tables.join(", "))
}

/// Join filters of the extra tables ANDed with the `where` fragments.
fn folded_filter(model: &StatementModel) -> Option<String> {
    let mut parts: Vec<String> = model
        .tables()
        .skip(1)
        .filter_map(|(_, t)| t.join_filter())
        .map(|on| format!("({on})"))
        .collect();
    if let Some(filter) = filter_clause(model, FILTER_WHERE) {
        if parts.is_empty() {
            return Some(filter);
        }
        parts.push(format!("({filter})"));
    }
    (!parts.is_empty()).then(|| parts.join(" AND "))
}

fn returning_clause(model: &StatementModel) -> Option<String> {
    let columns = model.custom(CUSTOM_RETURNING).ok().filter(|c| !c.is_empty())?;
    Some(columns.join(", "))
}
