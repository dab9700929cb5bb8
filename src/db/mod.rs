//! Async PostgreSQL connection pooling and migrations.

mod pool;

pub use pool::{AsyncDbPool, MIGRATIONS, establish_async_connection_pool, run_migrations};
