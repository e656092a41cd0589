//! # solace-memory
//!
//! Persistent store for Solace (SQLite-backed).

pub mod store;

pub use store::rows::{ConversationTurn, DailyCheckin, ScheduledMessage, User, UserEvent};
pub use store::Store;
