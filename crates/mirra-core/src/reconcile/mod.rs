//! Reconciliation engine
//!
//! Drives one master profile and its mirrors through a fetch, diff,
//! apply cycle. Mirrors run concurrently; each mirror's sequence is
//! applied strictly in order, and failures are isolated per mirror.

pub mod engine;
pub mod locks;
pub mod report;

pub use engine::{apply_sequence, CancelFlag, ReconcileEngine};
pub use locks::ProfileLocks;
pub use report::{MirrorOutcome, MirrorReport, RunReport};
