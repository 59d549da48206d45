use super::{Connection, log_sql};
use crate::compiler::{Compiler, PostgresCompiler};
use crate::dialect::Dialect;
use crate::error::{WeaveError, WeaveResult};
use crate::result::ResultSet;
use crate::value::Value;
use std::fmt;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, NoTls, Row};

/// [`Connection`] over a `tokio_postgres::Client`.
///
/// Statements arrive fully quoted, so they run without bind parameters.
/// Each one is prepared first: statements with result columns are queried
/// and decoded into [`Value`]s, the rest report their affected-row count.
pub struct PgConnection {
    id: String,
    dialect: Dialect,
    compiler: PostgresCompiler,
    client: Client,
}

impl PgConnection {
    /// Connect without TLS and drive the connection on a spawned task.
    pub async fn connect(id: impl Into<String>, url: &str) -> WeaveResult<Self> {
        let id = id.into();
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| WeaveError::connection(&id, e))?;
        let task_id = id.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(target: "sqlweave.sql", connection = %task_id, error = %e, "postgres connection closed");
            }
        });
        Ok(Self::from_client(id, client))
    }

    /// Wrap an already connected client.
    pub fn from_client(id: impl Into<String>, client: Client) -> Self {
        Self {
            id: id.into(),
            dialect: Dialect::postgres(),
            compiler: PostgresCompiler,
            client,
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConnection")
            .field("id", &self.id)
            .field("closed", &self.client.is_closed())
            .finish_non_exhaustive()
    }
}

impl Connection for PgConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    fn compiler(&self) -> &dyn Compiler {
        &self.compiler
    }

    async fn execute(&self, sql: &str) -> WeaveResult<ResultSet> {
        log_sql(&self.id, &self.dialect, sql);
        let fail = |e: tokio_postgres::Error| WeaveError::execution(&self.id, sql, e);

        let statement = self.client.prepare(sql).await.map_err(fail)?;
        if statement.columns().is_empty() {
            let affected = self.client.execute(&statement, &[]).await.map_err(fail)?;
            return Ok(ResultSet::affected(affected).with_sql(sql));
        }

        let columns = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = self.client.query(&statement, &[]).await.map_err(fail)?;
        let rows = rows.iter().map(decode_row).collect::<WeaveResult<Vec<_>>>()?;
        Ok(ResultSet::new(columns, rows).with_sql(sql))
    }
}

fn decode_row(row: &Row) -> WeaveResult<Vec<Value>> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            decode_column(row, idx, column.type_())
                .map_err(|e| WeaveError::decode(column.name(), e.to_string()))
        })
        .collect()
}

/// Text-like and unknown types fall through to `String`; a type that cannot
/// be read as text (e.g. `numeric`) is a decode error, cast it in SQL.
fn decode_column(row: &Row, idx: usize, ty: &Type) -> Result<Value, tokio_postgres::Error> {
    Ok(match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.into(),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.into(),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.into(),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx)?.into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.into(),
        Type::JSON | Type::JSONB => row.try_get::<_, Option<serde_json::Value>>(idx)?.into(),
        Type::UUID => row.try_get::<_, Option<uuid::Uuid>>(idx)?.into(),
        Type::DATE => row.try_get::<_, Option<chrono::NaiveDate>>(idx)?.into(),
        Type::TIMESTAMP => row.try_get::<_, Option<chrono::NaiveDateTime>>(idx)?.into(),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)?
            .into(),
        Type::INT4_ARRAY => row.try_get::<_, Option<Vec<i32>>>(idx)?.into(),
        Type::INT8_ARRAY => row.try_get::<_, Option<Vec<i64>>>(idx)?.into(),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => {
            row.try_get::<_, Option<Vec<String>>>(idx)?.into()
        }
        _ => row.try_get::<_, Option<String>>(idx)?.into(),
    })
}
