//! Tenant-scoped datastores and messengers for BizPilot.
//!
//! All stores implement `bizpilot_core::BusinessStore`; all messengers
//! implement `bizpilot_core::Messenger`.

pub mod demo;
pub mod in_memory;
pub mod messenger;
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use messenger::{LogMessenger, RecordingMessenger};
pub use sqlite::SqliteStore;
