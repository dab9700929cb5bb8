//! Bulk file-processing schedule engine.
//!
//! Manages parent schedules and their expanded per-date occurrences
//! inside (app, brand, platform) scopes: conflict detection against
//! occupied slots, recurrence expansion, edit-state rules for live
//! schedules and the status lifecycle.
//!
//! Embed it by wiring a repository into [`services::ScheduleService`]:
//!
//! ```ignore
//! let pool = db::establish_async_connection_pool(&settings.database).await?;
//! let repo = Arc::new(repositories::PgScheduleRepository::new(pool));
//! let service = services::ScheduleService::new(repo);
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod logger;
pub mod models;
pub mod repositories;
pub mod scheduling;
pub mod schema;
pub mod services;
pub mod storage;

pub use error::{AppError, AppResult};
