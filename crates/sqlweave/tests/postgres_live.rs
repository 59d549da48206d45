//! Live round trip against Postgres. Skipped unless `DATABASE_URL` is set.

#![cfg(feature = "postgres")]

use serde::Deserialize;
use sqlweave::model::CUSTOM_RETURNING;
use sqlweave::{Connection, Context, PgConnection, Value, WeaveError, WeaveResult};

#[derive(Debug, Deserialize)]
struct Row {
    id: i32,
    name: String,
    active: bool,
}

async fn connect(test: &str) -> WeaveResult<Option<PgConnection>> {
    let _ = dotenvy::dotenv();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            return Ok(None);
        }
    };
    let conn = PgConnection::connect("live", &database_url).await?;
    conn.execute(
        "CREATE TEMP TABLE weave_users (
            id serial PRIMARY KEY,
            name text NOT NULL,
            active boolean NOT NULL DEFAULT true
        )",
    )
    .await?;
    Ok(Some(conn))
}

#[tokio::test]
async fn insert_select_roundtrip() -> WeaveResult<()> {
    let Some(conn) = connect("insert_select_roundtrip").await? else {
        return Ok(());
    };

    let mut insert = conn.statement();
    insert
        .from("weave_users")?
        .add_field("{row.name}", Some("name"))?
        .add_custom(CUSTOM_RETURNING, "id")?;
    let mut created = insert
        .create(Some(&Context::new().with("row.name", "o'brien")))
        .await?
        .one()?;
    let id = created.get("id").and_then(Value::as_i64).unwrap();

    let mut select = conn.statement();
    select
        .from("weave_users")?
        .add_field("id", None)?
        .add_field("name", None)?
        .add_field("active", None)?
        .add_where("id = {filter.where.id}", Some(Context::new().with("id", id)))?;
    let rows: Vec<Row> = select.search(None).await?.one()?.fetch_all_objects()?;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id as i64, id);
    assert_eq!(rows[0].name, "o'brien");
    assert!(rows[0].active);
    assert_eq!(created.fetch_all_rows().len(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_transaction_leaves_no_rows() -> WeaveResult<()> {
    let Some(conn) = connect("failed_transaction_leaves_no_rows").await? else {
        return Ok(());
    };

    let mut tx = conn.transaction();
    let result = tx
        .run_new(
            async |conn, _| {
                conn.execute("INSERT INTO weave_users (name) VALUES ('ghost')")
                    .await?;
                conn.execute("INSERT INTO weave_users (name) VALUES (NULL)")
                    .await?;
                Ok(())
            },
            true,
        )
        .await;
    assert!(matches!(result, Err(WeaveError::Execution { .. })));
    assert!(!tx.is_pending());

    let mut count = conn
        .execute("SELECT count(*) AS n FROM weave_users WHERE name = 'ghost'")
        .await?;
    assert_eq!(count.fetch_row(), Some(vec![Value::Int(0)]));
    Ok(())
}

#[tokio::test]
async fn savepoint_keeps_outer_insert() -> WeaveResult<()> {
    let Some(conn) = connect("savepoint_keeps_outer_insert").await? else {
        return Ok(());
    };

    let mut tx = conn.transaction();
    tx.run_new(
        async |conn, tx| {
            conn.execute("INSERT INTO weave_users (name) VALUES ('kept')")
                .await?;
            let inner = tx
                .run_within(
                    async |conn, _| {
                        conn.execute("INSERT INTO weave_users (name) VALUES ('dropped')")
                            .await?;
                        conn.execute("SELECT 1/0").await.map(drop)
                    },
                    Some("inner"),
                    false,
                )
                .await;
            assert!(inner.is_err());
            Ok(())
        },
        true,
    )
    .await?;

    let mut names = conn
        .execute("SELECT name FROM weave_users ORDER BY id")
        .await?;
    let names: Vec<Value> = names
        .fetch_all_rows()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(names, vec![Value::from("kept")]);
    Ok(())
}
