//! Mirra Core - Collection model, diff engine, reconciliation, and storage
//!
//! This crate provides the addon collection data model, the structural
//! diff engine, the mirror reconciliation state machine, snapshot
//! backup/restore, and SQLite storage.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod apply;
pub mod backup;
pub mod collection;
pub mod diff;
pub mod gateway;
pub mod reconcile;
pub mod registry;
pub mod service;
pub mod storage;

pub use collection::{AddonCollection, AddonEntry, AddonKey, CatalogKey, Profile, ProfileId};
pub use diff::{diff, ExclusionSet, Operation};
pub use gateway::CollectionGateway;
pub use reconcile::{CancelFlag, MirrorOutcome, RunReport};
pub use service::MirrorService;
