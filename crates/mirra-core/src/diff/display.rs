//! Operation display formatting for user review

use crate::diff::Operation;
use std::fmt::Write;

/// One-line description of an operation
#[must_use]
pub fn describe(op: &Operation) -> String {
    match op {
        Operation::InsertAddon { position, addon } => {
            format!("install '{}' at position {position}", addon.name)
        }
        Operation::RemoveAddon { addon } => format!("remove {addon}"),
        Operation::MoveAddon { addon, to } => format!("move {addon} to position {to}"),
        Operation::RenameAddon { addon, name } => format!("rename {addon} to '{name}'"),
        Operation::SetCatalogEnabled {
            addon,
            catalog,
            enabled,
        } => {
            let verb = if *enabled { "enable" } else { "disable" };
            format!("{verb} catalog '{catalog}' on {addon}")
        }
        Operation::MoveCatalog { addon, catalog, to } => {
            format!("move catalog '{catalog}' on {addon} to position {to}")
        }
    }
}

/// Format an operation sequence for terminal display
#[must_use]
pub fn format_operations(ops: &[Operation]) -> String {
    let mut output = String::new();
    for (i, op) in ops.iter().enumerate() {
        let _ = writeln!(output, "  {:>3}. {}", i + 1, describe(op));
    }
    output
}

/// Summary statistics for an operation sequence
#[derive(Debug, Default)]
pub struct DiffSummary {
    /// Addons to install
    pub inserts: usize,
    /// Addons to remove
    pub removes: usize,
    /// Addons to reorder
    pub moves: usize,
    /// Addons to rename
    pub renames: usize,
    /// Catalog flag or order changes
    pub catalog_changes: usize,
}

impl DiffSummary {
    /// Generate a summary from an operation sequence
    #[must_use]
    pub fn from_ops(ops: &[Operation]) -> Self {
        let mut summary = Self::default();
        for op in ops {
            match op {
                Operation::InsertAddon { .. } => summary.inserts += 1,
                Operation::RemoveAddon { .. } => summary.removes += 1,
                Operation::MoveAddon { .. } => summary.moves += 1,
                Operation::RenameAddon { .. } => summary.renames += 1,
                Operation::SetCatalogEnabled { .. } | Operation::MoveCatalog { .. } => {
                    summary.catalog_changes += 1;
                }
            }
        }
        summary
    }

    /// Format as a one-line summary
    #[must_use]
    pub fn one_line(&self) -> String {
        format!(
            "{} install(s), {} remove(s), {} move(s), {} rename(s), {} catalog change(s)",
            self.inserts, self.removes, self.moves, self.renames, self.catalog_changes
        )
    }
}
