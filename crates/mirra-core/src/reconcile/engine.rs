//! Reconciliation cycle driver

use crate::collection::{normalize, ProfileId};
use crate::diff::{diff, ExclusionSet, Operation};
use crate::gateway::{CollectionGateway, GatewayError};
use crate::reconcile::locks::ProfileLocks;
use crate::reconcile::report::{MirrorOutcome, MirrorReport, RunReport};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Cooperative cancellation flag, checked between operations
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Apply an operation sequence to a profile, one write at a time
///
/// Stops at the first failure or cancellation and reports the split
/// between applied and unapplied operations. Never rolls back: every
/// prefix of a computed sequence leaves the collection consistent.
pub async fn apply_sequence<G: CollectionGateway + ?Sized>(
    gateway: &G,
    profile: &ProfileId,
    ops: Vec<Operation>,
    cancel: &CancelFlag,
) -> MirrorOutcome {
    let mut applied = Vec::with_capacity(ops.len());
    let mut ops = ops.into_iter();

    while let Some(op) = ops.next() {
        if cancel.is_cancelled() {
            let mut unapplied = vec![op];
            unapplied.extend(ops);
            return MirrorOutcome::Partial {
                applied,
                unapplied,
                cause: "cancelled".to_string(),
            };
        }
        match gateway.apply_operation(profile, &op).await {
            Ok(()) => {
                debug!(profile = %profile, op = op.kind(), "applied operation");
                applied.push(op);
            }
            Err(e) => {
                warn!(profile = %profile, op = op.kind(), error = %e, "operation failed");
                let mut unapplied = vec![op];
                unapplied.extend(ops);
                return MirrorOutcome::Partial {
                    applied,
                    unapplied,
                    cause: e.to_string(),
                };
            }
        }
    }

    MirrorOutcome::Synced { applied }
}

/// Drives reconciliation runs for master profiles and their mirrors
pub struct ReconcileEngine<G> {
    gateway: Arc<G>,
    locks: Arc<ProfileLocks>,
}

impl<G: CollectionGateway + 'static> ReconcileEngine<G> {
    pub fn new(gateway: Arc<G>, locks: Arc<ProfileLocks>) -> Self {
        Self { gateway, locks }
    }

    /// Run one reconciliation cycle for a master and its mirrors
    ///
    /// The master's collection is fetched once under a read lock and
    /// shared across mirrors. Each mirror is processed on its own task
    /// under its own write lock; one mirror failing never touches the
    /// others.
    ///
    /// # Errors
    /// Fails only if the master's collection cannot be fetched; mirror
    /// failures are reported per mirror in the [`RunReport`].
    pub async fn run(
        &self,
        master: &ProfileId,
        mirrors: &[(ProfileId, ExclusionSet)],
        cancel: &CancelFlag,
    ) -> Result<RunReport, GatewayError> {
        let started_at = Utc::now();

        let master_guard = self.locks.read(master).await;
        let desired = normalize(&self.gateway.fetch_collection(master).await?);
        drop(master_guard);
        info!(master = %master, addons = desired.len(), "fetched master collection");

        let desired = Arc::new(desired);
        let mut tasks = JoinSet::new();
        for (idx, (mirror, protected)) in mirrors.iter().cloned().enumerate() {
            let gateway = Arc::clone(&self.gateway);
            let locks = Arc::clone(&self.locks);
            let desired = Arc::clone(&desired);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let _guard = locks.write(&mirror).await;
                let outcome =
                    reconcile_mirror(gateway.as_ref(), &desired, &mirror, &protected, &cancel)
                        .await;
                (idx, MirrorReport { mirror, outcome })
            });
        }

        let mut reports: Vec<Option<MirrorReport>> = Vec::new();
        reports.resize_with(mirrors.len(), || None);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, report)) => reports[idx] = Some(report),
                Err(e) => warn!(error = %e, "mirror task panicked"),
            }
        }

        let report = RunReport {
            master: master.clone(),
            mirrors: reports.into_iter().flatten().collect(),
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            master = %master,
            mirrors = report.mirrors.len(),
            applied = report.total_applied(),
            synced = report.all_synced(),
            "reconciliation run finished"
        );
        Ok(report)
    }
}

async fn reconcile_mirror<G: CollectionGateway + ?Sized>(
    gateway: &G,
    desired: &crate::collection::AddonCollection,
    mirror: &ProfileId,
    protected: &ExclusionSet,
    cancel: &CancelFlag,
) -> MirrorOutcome {
    let current = match gateway.fetch_collection(mirror).await {
        Ok(c) => normalize(&c),
        Err(e) => {
            warn!(mirror = %mirror, error = %e, "mirror fetch failed");
            return MirrorOutcome::FetchFailed {
                cause: e.to_string(),
            };
        }
    };

    let ops = diff(desired, &current, protected);
    if ops.is_empty() {
        debug!(mirror = %mirror, "already in sync");
        return MirrorOutcome::Synced { applied: Vec::new() };
    }
    info!(mirror = %mirror, ops = ops.len(), "applying operations");

    apply_sequence(gateway, mirror, ops, cancel).await
}
