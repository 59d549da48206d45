//! Transaction controller behaviour against the in-memory driver.

use sqlweave::{Connection, Context, MemoryConnection, WeaveError};

#[tokio::test]
async fn run_new_commits_on_success() {
    let conn = MemoryConnection::new("mem");
    let mut tx = conn.transaction();

    let affected = tx
        .run_new(
            async |conn, _| {
                let mut stmt = conn.statement();
                stmt.from("accounts")?
                    .add_field("balance - {amount}", Some("balance"))?
                    .add_where("id = {id}", None)?;
                let ctx = Context::new().with("amount", 10).with("id", 1);
                Ok(stmt.update(Some(&ctx)).await?.one()?.affected_rows())
            },
            true,
        )
        .await
        .unwrap();

    assert_eq!(affected, 0);
    assert!(!tx.is_pending());
    assert_eq!(
        conn.executed(),
        vec![
            "BEGIN",
            "UPDATE accounts SET `balance` = balance - 10 WHERE id = 1",
            "COMMIT",
        ]
    );
}

#[tokio::test]
async fn run_new_without_commit_leaves_transaction_open() {
    let conn = MemoryConnection::new("mem");
    let mut tx = conn.transaction();
    tx.run_new(async |conn, _| conn.execute("SELECT 1").await.map(drop), false)
        .await
        .unwrap();
    assert!(tx.is_pending());
    tx.commit().await.unwrap();
    assert_eq!(conn.executed(), vec!["BEGIN", "SELECT 1", "COMMIT"]);
}

#[tokio::test]
async fn run_new_while_pending_fails_without_touching_the_driver() {
    let conn = MemoryConnection::new("mem");
    let mut tx = conn.transaction();
    tx.begin(None).await.unwrap();
    conn.take_executed();

    let err = tx
        .run_new(async |conn, _| conn.execute("SELECT 1").await.map(drop), true)
        .await
        .unwrap_err();

    assert!(matches!(err, WeaveError::TransactionState(_)));
    assert!(conn.executed().is_empty());
    assert!(tx.is_pending());
    tx.rollback(None).await.unwrap();
}

#[tokio::test]
async fn run_new_rolls_back_and_returns_the_original_error() {
    let conn = MemoryConnection::new("mem");
    conn.fail_when("UPDATE", "deadlock detected");
    let mut tx = conn.transaction();

    let err = tx
        .run_new(
            async |conn, _| {
                conn.execute("UPDATE accounts SET balance = 0").await?;
                Ok(())
            },
            true,
        )
        .await
        .unwrap_err();

    assert!(err.is_execution());
    assert_eq!(err.sql(), Some("UPDATE accounts SET balance = 0"));
    assert!(!tx.is_pending());
    assert_eq!(
        conn.executed(),
        vec!["BEGIN", "UPDATE accounts SET balance = 0", "ROLLBACK"]
    );
}

#[tokio::test]
async fn rollback_failure_does_not_replace_the_original_error() {
    let conn = MemoryConnection::new("mem");
    conn.fail_when("ROLLBACK", "connection reset");
    let mut tx = conn.transaction();

    let err = tx
        .run_new(
            async |_, _| Err::<(), _>(WeaveError::Other("boom".into())),
            true,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, WeaveError::Other(ref m) if m == "boom"));
    assert!(!tx.is_pending());
    assert_eq!(conn.executed(), vec!["BEGIN", "ROLLBACK"]);
}

#[tokio::test]
async fn commit_failure_rolls_back() {
    let conn = MemoryConnection::new("mem");
    conn.fail_when("COMMIT", "could not serialize access");
    let mut tx = conn.transaction();

    let err = tx
        .run_new(async |_, _| Ok(()), true)
        .await
        .unwrap_err();

    assert!(matches!(err, WeaveError::Transaction { action: "commit", .. }));
    assert!(err.is_transaction());
    assert!(!tx.is_pending());
    assert_eq!(conn.executed(), vec!["BEGIN", "COMMIT", "ROLLBACK"]);
}

#[tokio::test]
async fn begin_failure_skips_callback_and_rollback() {
    let conn = MemoryConnection::new("mem");
    conn.fail_when("BEGIN", "too many connections");
    let mut tx = conn.transaction();

    let err = tx
        .run_new(async |conn, _| conn.execute("SELECT 1").await.map(drop), true)
        .await
        .unwrap_err();

    assert!(matches!(err, WeaveError::Transaction { action: "begin", .. }));
    assert_eq!(conn.executed(), vec!["BEGIN"]);
}

#[tokio::test]
async fn run_within_on_idle_never_commits_after_failure() {
    let conn = MemoryConnection::new("mem");
    let mut tx = conn.transaction();

    let err = tx
        .run_within(
            async |conn, _| {
                conn.execute("DELETE FROM sessions").await?;
                Err::<(), _>(WeaveError::Other("validation failed".into()))
            },
            None,
            true,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, WeaveError::Other(_)));
    assert!(!tx.is_pending());
    assert_eq!(
        conn.executed(),
        vec!["BEGIN", "DELETE FROM sessions", "ROLLBACK"]
    );
}

#[tokio::test]
async fn run_within_on_idle_with_savepoint_rolls_back_whole_transaction() {
    let conn = MemoryConnection::new("mem");
    let mut tx = conn.transaction();

    let result = tx
        .run_within(
            async |conn, _| {
                conn.execute("INSERT INTO orders VALUES (1)").await?;
                Err::<(), _>(WeaveError::Other("nope".into()))
            },
            Some("sp"),
            false,
        )
        .await;

    assert!(result.is_err());
    assert!(!tx.is_pending());
    assert!(tx.savepoints().is_empty());
    assert_eq!(
        conn.executed(),
        vec![
            "BEGIN",
            "SAVEPOINT `sp`",
            "INSERT INTO orders VALUES (1)",
            "ROLLBACK",
        ]
    );
}

#[tokio::test]
async fn run_within_on_idle_with_savepoint_can_start_again() {
    let conn = MemoryConnection::new("mem");
    let mut tx = conn.transaction();

    let _ = tx
        .run_within(
            async |_, _| Err::<(), _>(WeaveError::Other("nope".into())),
            Some("sp"),
            false,
        )
        .await;
    tx.run_new(async |_, _| Ok(()), true).await.unwrap();

    assert_eq!(
        conn.executed(),
        vec!["BEGIN", "SAVEPOINT `sp`", "ROLLBACK", "BEGIN", "COMMIT"]
    );
}

#[tokio::test]
async fn nested_savepoint_failure_keeps_outer_work() {
    let conn = MemoryConnection::new("mem");
    let mut tx = conn.transaction();

    tx.run_new(
        async |conn, tx| {
            conn.execute("INSERT INTO orders VALUES (1)").await?;
            let audit = tx
                .run_within(
                    async |conn, _| {
                        conn.execute("INSERT INTO audit VALUES (1)").await?;
                        Err::<(), _>(WeaveError::Other("audit failed".into()))
                    },
                    Some("audit"),
                    false,
                )
                .await;
            assert!(audit.is_err());
            assert!(tx.is_pending());
            Ok(())
        },
        true,
    )
    .await
    .unwrap();

    assert_eq!(
        conn.executed(),
        vec![
            "BEGIN",
            "INSERT INTO orders VALUES (1)",
            "SAVEPOINT `audit`",
            "INSERT INTO audit VALUES (1)",
            "ROLLBACK TO SAVEPOINT `audit`",
            "COMMIT",
        ]
    );
}

#[tokio::test]
async fn run_within_pending_without_savepoint_rolls_back_everything() {
    let conn = MemoryConnection::new("mem");
    let mut tx = conn.transaction();
    tx.begin(None).await.unwrap();

    let result = tx
        .run_within(
            async |_, _| Err::<(), _>(WeaveError::Other("nope".into())),
            None,
            false,
        )
        .await;

    assert!(result.is_err());
    assert!(!tx.is_pending());
    assert_eq!(conn.executed(), vec!["BEGIN", "ROLLBACK"]);
}

#[tokio::test]
async fn state_errors_and_savepoint_stack() {
    let conn = MemoryConnection::new("mem");
    let mut tx = conn.transaction();

    assert!(matches!(
        tx.savepoint("a").await,
        Err(WeaveError::TransactionState(_))
    ));
    assert!(tx.commit().await.is_err());
    assert!(tx.rollback(None).await.is_err());
    assert!(conn.executed().is_empty());

    tx.begin(Some("a")).await.unwrap();
    tx.begin(Some("b")).await.unwrap();
    tx.begin(None).await.unwrap();
    assert_eq!(tx.savepoints(), &["a".to_string(), "b".to_string()]);

    tx.rollback(Some("a")).await.unwrap();
    assert_eq!(tx.savepoints(), &["a".to_string()]);
    assert!(tx.rollback(Some("b")).await.is_err());

    tx.release("a").await.unwrap();
    assert!(tx.savepoints().is_empty());
    tx.commit().await.unwrap();

    assert_eq!(
        conn.executed(),
        vec![
            "BEGIN",
            "SAVEPOINT `a`",
            "SAVEPOINT `b`",
            "ROLLBACK TO SAVEPOINT `a`",
            "RELEASE SAVEPOINT `a`",
            "COMMIT",
        ]
    );
}
