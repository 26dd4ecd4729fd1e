//! The Postgres-backed store implementation.

pub mod pool;
pub mod schema;
pub mod store;

pub use pool::PgPool;
pub use store::{PgReadStore, PgTxStore};
