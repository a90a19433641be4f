//! SQLite-backed durable queue for the telemetry bridge.
//!
//! This crate provides:
//! - `QueueStore`: the ordered, retry-tracked record store
//! - Versioned migrations for the `event_queue` schema
//! - Standalone query functions over any `rusqlite::Connection`
//!
//! Every `QueueStore` operation runs on a single connection owned by a
//! dedicated executor thread (`AsyncDatabase`), so each mutation is atomic with
//! respect to concurrent callers and async callers never block on SQLite.

mod error;
mod executor;
mod migrations;
mod models;
pub mod queries;
mod store;

pub use error::{DatabaseError, DatabaseResult};
pub use executor::AsyncDatabase;
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use models::QueueRecord;
pub use store::QueueStore;
