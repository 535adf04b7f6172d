//! Storage layer (`SQLite`)

pub mod bindings;
pub mod db;
pub mod migrations;
pub mod profiles;
pub mod snapshots;

pub use bindings::BindingStore;
pub use db::{Database, StorageError};
pub use profiles::ProfileStore;
pub use snapshots::SnapshotStore;
