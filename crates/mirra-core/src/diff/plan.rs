//! Diff computation between two addon collections
//!
//! Produces the operation sequence that transforms the target (mirror)
//! collection into the source (master) collection. Keys and positions
//! are computed against a simulated working copy so the sequence is safe
//! under strict left-to-right application: no operation ever refers to a
//! position or occurrence that an earlier operation has invalidated.

use crate::collection::{AddonCollection, AddonEntry, CatalogKey};
use crate::diff::{ExclusionSet, Operation};
use std::collections::HashMap;

/// Simulated addon slot; `uid` ties working positions back to the
/// matched target index (or to a pending insert)
struct Slot {
    uid: usize,
    url: String,
}

fn key_in(slots: &[Slot], pos: usize) -> crate::collection::AddonKey {
    let url = &slots[pos].url;
    let occurrence = slots[..pos].iter().filter(|s| s.url == *url).count();
    crate::collection::AddonKey {
        transport_url: url.clone(),
        occurrence,
    }
}

/// Compute the operations that make `target` match `source`
///
/// Addons are matched by manifest source first, then strictly by
/// occurrence order when the same source appears more than once; excess
/// entries on either side become inserts or removes rather than guesses.
/// Addons in the exclusion set are invisible to the diff: never removed,
/// re-anchored after the nearest preceding matched addon so their
/// relative placement survives reordering.
///
/// Deterministic: the same two inputs always yield the identical
/// sequence, and `diff(a, a, ..)` is empty.
#[must_use]
pub fn diff(
    source: &AddonCollection,
    target: &AddonCollection,
    protected: &ExclusionSet,
) -> Vec<Operation> {
    let mut ops = Vec::new();

    // Protection flags per target index, resolved through occurrence keys.
    let protected_flags: Vec<bool> = (0..target.len())
        .map(|i| target.key_at(i).is_some_and(|k| protected.contains(&k)))
        .collect();

    // Match k-th source occurrence of a URL with the k-th non-protected
    // target occurrence.
    let mut target_by_url: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, addon) in target.addons.iter().enumerate() {
        if !protected_flags[i] {
            target_by_url
                .entry(addon.transport_url.as_str())
                .or_default()
                .push(i);
        }
    }

    let mut source_match: Vec<Option<usize>> = vec![None; source.len()];
    let mut target_match: Vec<Option<usize>> = vec![None; target.len()];
    let mut source_occurrence: HashMap<&str, usize> = HashMap::new();
    for (si, addon) in source.addons.iter().enumerate() {
        let url = addon.transport_url.as_str();
        let k = source_occurrence.entry(url).or_insert(0);
        if let Some(candidates) = target_by_url.get(url) {
            if let Some(&ti) = candidates.get(*k) {
                source_match[si] = Some(ti);
                target_match[ti] = Some(si);
            }
        }
        *k += 1;
    }

    // Working copy of the target, mutated in lockstep with emission.
    let mut working: Vec<Slot> = target
        .addons
        .iter()
        .enumerate()
        .map(|(i, a)| Slot {
            uid: i,
            url: a.transport_url.clone(),
        })
        .collect();

    // Removes: unmatched, non-protected target addons.
    let mut wi = 0;
    while wi < working.len() {
        let uid = working[wi].uid;
        if protected_flags[uid] || target_match[uid].is_some() {
            wi += 1;
        } else {
            ops.push(Operation::RemoveAddon {
                addon: key_in(&working, wi),
            });
            working.remove(wi);
        }
    }

    // Desired final order: master order for matched and inserted addons,
    // protected addons re-anchored behind the nearest preceding match.
    let insert_base = target.len();
    let mut desired: Vec<usize> = Vec::with_capacity(source.len());
    let mut payloads: HashMap<usize, AddonEntry> = HashMap::new();
    for (si, addon) in source.addons.iter().enumerate() {
        match source_match[si] {
            Some(ti) => desired.push(ti),
            None => {
                let uid = insert_base + si;
                desired.push(uid);
                payloads.insert(uid, addon.clone());
            }
        }
    }

    let is_protected_uid = |uid: usize| uid < insert_base && protected_flags[uid];
    for ti in 0..target.len() {
        if !protected_flags[ti] {
            continue;
        }
        let anchor = (0..ti)
            .rev()
            .find(|&j| !protected_flags[j] && target_match[j].is_some());
        let mut at = match anchor.and_then(|a| desired.iter().position(|&u| u == a)) {
            Some(pos) => pos + 1,
            None => 0,
        };
        while at < desired.len() && is_protected_uid(desired[at]) {
            at += 1;
        }
        desired.insert(at, ti);
    }

    // Moves and inserts, greedily settling each desired position in turn.
    for i in 0..desired.len() {
        if i < working.len() && working[i].uid == desired[i] {
            continue;
        }
        let uid = desired[i];
        if let Some(addon) = payloads.get(&uid) {
            ops.push(Operation::InsertAddon {
                position: i,
                addon: Box::new(addon.clone()),
            });
            working.insert(
                i,
                Slot {
                    uid,
                    url: addon.transport_url.clone(),
                },
            );
        } else if let Some(j) = working.iter().position(|s| s.uid == uid) {
            ops.push(Operation::MoveAddon {
                addon: key_in(&working, j),
                to: i,
            });
            let slot = working.remove(j);
            working.insert(i, slot);
        }
    }

    // Field-level differences on matched pairs. Structure is settled, so
    // keys computed against the final arrangement stay valid.
    for (si, source_addon) in source.addons.iter().enumerate() {
        let Some(ti) = source_match[si] else { continue };
        let Some(wpos) = working.iter().position(|s| s.uid == ti) else {
            continue;
        };
        let key = key_in(&working, wpos);
        let target_addon = &target.addons[ti];

        if source_addon.name != target_addon.name {
            ops.push(Operation::RenameAddon {
                addon: key.clone(),
                name: source_addon.name.clone(),
            });
        }

        diff_catalogs(source_addon, target_addon, &key, &mut ops);
    }

    ops
}

/// Catalog-level diff for one matched addon pair, by the same
/// identity-then-position rule one level down
///
/// Catalogs are identified by their (type, id) key: the same id may
/// legitimately appear once per content type on one addon.
fn diff_catalogs(
    source: &AddonEntry,
    target: &AddonEntry,
    key: &crate::collection::AddonKey,
    ops: &mut Vec<Operation>,
) {
    // Simulated (key, enabled) list tracking the target's catalogs as
    // the emitted operations would mutate them.
    let mut sim: Vec<(CatalogKey, bool)> = target
        .catalogs
        .iter()
        .map(|c| (c.key(), c.enabled))
        .collect();

    for catalog in &source.catalogs {
        let ck = catalog.key();
        match sim.iter_mut().find(|(k, _)| *k == ck) {
            Some((_, enabled)) => {
                if *enabled != catalog.enabled {
                    ops.push(Operation::SetCatalogEnabled {
                        addon: key.clone(),
                        catalog: ck,
                        enabled: catalog.enabled,
                    });
                    *enabled = catalog.enabled;
                }
            }
            None => {
                // Source-only catalog: upserted, then positioned below.
                ops.push(Operation::SetCatalogEnabled {
                    addon: key.clone(),
                    catalog: ck.clone(),
                    enabled: catalog.enabled,
                });
                sim.push((ck, catalog.enabled));
            }
        }
    }

    // Target-only catalogs are disabled in place; the operation set has
    // no catalog removal.
    for (k, enabled) in &mut sim {
        if *enabled && !source.catalogs.iter().any(|c| c.key() == *k) {
            ops.push(Operation::SetCatalogEnabled {
                addon: key.clone(),
                catalog: k.clone(),
                enabled: false,
            });
            *enabled = false;
        }
    }

    // Order: source order first, leftover target-only catalogs keep
    // their relative order at the end. Deduplicated, so every desired
    // slot has a distinct key present in the simulation.
    let mut desired: Vec<CatalogKey> = Vec::with_capacity(sim.len());
    for catalog in &source.catalogs {
        let ck = catalog.key();
        if !desired.contains(&ck) {
            desired.push(ck);
        }
    }
    for (k, _) in &sim {
        if !desired.contains(k) {
            desired.push(k.clone());
        }
    }

    for (i, ck) in desired.iter().enumerate() {
        if sim[i].0 == *ck {
            continue;
        }
        if let Some(j) = sim.iter().position(|(k, _)| k == ck) {
            ops.push(Operation::MoveCatalog {
                addon: key.clone(),
                catalog: ck.clone(),
                to: i,
            });
            let item = sim.remove(j);
            sim.insert(i, item);
        }
    }
}
