//! Idempotent label reconciliation for one content item.
//!
//! # Responsibility
//! - Turn decoded label names into persisted labels linked to a note.
//!
//! # Invariants
//! - Repeated calls with overlapping names never duplicate labels or links.
//! - Names are processed in input order; the first failure stops processing
//!   and earlier names stay reconciled (best-effort, no rollback).

use crate::model::label::{Label, LabelId};
use crate::model::note::NoteId;
use crate::repo::label_repo::LabelRepository;
use crate::repo::RepoError;
use log::{error, info};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// A label upsert or link failed part-way through a reconciliation.
#[derive(Debug)]
pub struct ReconcileError {
    /// Name whose upsert failed.
    pub name: String,
    /// Names reconciled before the failure; these are not rolled back.
    pub reconciled: usize,
    pub source: RepoError,
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to reconcile label `{}` after {} succeeded: {}",
            self.name, self.reconciled, self.source
        )
    }
}

impl Error for ReconcileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Create-or-reuse-and-link over a [`LabelRepository`].
pub struct LabelReconciler<R: LabelRepository> {
    repo: R,
}

impl<R: LabelRepository> LabelReconciler<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Upserts each name for `owner_id` and links it to `item_id`.
    ///
    /// Returns the linked labels in first-seen order, one entry per distinct
    /// label even when several names resolve to the same record.
    pub fn reconcile(
        &self,
        owner_id: &str,
        item_id: NoteId,
        names: &[String],
    ) -> Result<Vec<Label>, ReconcileError> {
        let mut linked: Vec<Label> = Vec::with_capacity(names.len());
        let mut seen: HashSet<LabelId> = HashSet::new();

        for (index, name) in names.iter().enumerate() {
            let label = self
                .repo
                .upsert_label(owner_id, name)
                .and_then(|label| {
                    self.repo
                        .upsert_association(item_id, label.id)
                        .map(|_| label)
                })
                .map_err(|source| {
                    error!(
                        "event=label_reconcile module=service status=error item_id={} position={} error={}",
                        item_id, index, source
                    );
                    ReconcileError {
                        name: name.clone(),
                        reconciled: index,
                        source,
                    }
                })?;

            if seen.insert(label.id) {
                linked.push(label);
            }
        }

        info!(
            "event=label_reconcile module=service status=ok item_id={} names={} labels={}",
            item_id,
            names.len(),
            linked.len()
        );
        Ok(linked)
    }
}
