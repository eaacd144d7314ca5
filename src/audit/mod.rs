//! SQLite-backed report log and bot liveness record.

mod schema;
pub mod status;
pub mod store;

pub use status::{BotStatus, StatusStore};
pub use store::AuditStore;
