//! # sqlweave
//!
//! Template-driven SQL statement construction for Rust.
//!
//! ## Features
//!
//! - **Injection-safe templates**: `{path}` value-quoted, `{!path}` identifier-quoted,
//!   `{?path}` raw; text inside literals is never touched
//! - **Statement builder**: tables, joins, fields, typed filter groups, group/sort,
//!   limit/offset, flags and custom fragments with explicit merge rules
//! - **Dialects as data**: quote characters, escaping and separators are configuration
//! - **Savepoint-aware transactions**: scoped helpers that always roll back on failure
//! - **Pluggable drivers**: anything implementing [`Connection`]; an in-memory driver
//!   for tests and a `tokio-postgres` adapter are included
//!
//! ## Example
//!
//! ```ignore
//! use sqlweave::{Connection, Context, PgConnection};
//!
//! let conn = PgConnection::connect("main", "postgres://localhost/app").await?;
//!
//! let mut stmt = conn.statement();
//! stmt.from("users")?
//!     .add_field("id", None)?
//!     .add_field("name", None)?
//!     .add_where("status = {filter.where.status}", None)?;
//! stmt.add_sort("created_at", true).set_limit(10, None)?;
//!
//! let ctx = Context::new().with("filter.where.status", "active");
//! let users: Vec<User> = stmt.search(Some(&ctx)).await?.one()?.fetch_all_objects()?;
//! ```
//!
//! ## Logging
//!
//! Executed SQL is emitted with `tracing` at DEBUG under target `sqlweave.sql`
//! (truncated per [`Dialect::max_logged_sql`]); transaction transitions under
//! `sqlweave.tx`.

pub mod compiler;
pub mod connection;
pub mod context;
pub mod dialect;
pub mod error;
pub mod model;
pub mod quote;
pub mod registry;
pub mod result;
pub mod statement;
pub mod template;
pub mod transaction;
pub mod value;

pub use compiler::{Command, Compiler, PostgresCompiler, StandardCompiler};
pub use connection::{Connection, MemoryConnection};
pub use context::Context;
pub use dialect::{Dialect, EscapeStyle};
pub use error::{DriverError, WeaveError, WeaveResult};
pub use model::{Definition, Filter, Glue, JoinKind, OrderItem, StatementModel, TableRef};
pub use registry::ConnectionRegistry;
pub use result::ResultSet;
pub use statement::{Execution, Statement};
pub use transaction::Transaction;
pub use value::Value;

#[cfg(feature = "postgres")]
pub use connection::PgConnection;
