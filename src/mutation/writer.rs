use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::codec::TermCodec;
use crate::model::{Field, Quad, Statement};
use crate::store::{BulkOp, Document, DocumentStore, ItemError, ItemOutcome};
use crate::types::{Identity, Result};

use super::batch::BatchReport;
use super::identity::identity_of;

/// Stages statement writes as bulk batches keyed by content identity.
#[derive(Clone)]
pub struct Writer {
    codec: Arc<dyn TermCodec>,
    max_batch: Option<usize>,
}

impl std::fmt::Debug for Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("max_batch", &self.max_batch)
            .finish_non_exhaustive()
    }
}

impl Writer {
    /// Writer encoding terms with `codec`. `max_batch` caps the operations
    /// sent per bulk request; `None` sends each logical batch as one request.
    pub fn new(codec: Arc<dyn TermCodec>, max_batch: Option<usize>) -> Self {
        Self {
            codec,
            max_batch: max_batch.filter(|n| *n > 0),
        }
    }

    /// Identity of `quad` under this writer's codec.
    pub fn identity_of(&self, quad: &Quad) -> Identity {
        identity_of(self.codec.as_ref(), quad)
    }

    /// Stored body of a statement: one encoded key per field.
    pub fn document_body(&self, quad: &Quad) -> Map<String, Value> {
        Field::ALL
            .into_iter()
            .map(|field| {
                (
                    field.name().to_owned(),
                    Value::String(self.codec.encode(quad.get(field))),
                )
            })
            .collect()
    }

    /// Upserts `statements`, assigning identities to those lacking one.
    ///
    /// Statements already stored are rewritten at their current revision, so
    /// inserting a quad twice leaves one record. A statement holding a term
    /// the codec cannot round-trip is never submitted; its outcome is
    /// [`ItemError::Rejected`].
    pub fn insert(
        &self,
        store: &dyn DocumentStore,
        statements: &mut [Statement],
    ) -> Result<BatchReport> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut staged = Vec::new();
        let mut rejected = FxHashMap::default();
        for statement in statements.iter_mut() {
            let id = self.assign(statement);
            if !seen.insert(id.clone()) {
                continue;
            }
            order.push(id.clone());
            match self.validate(statement.quad()) {
                Ok(()) => staged.push(Document::new(id, self.document_body(statement.quad()))),
                Err(err) => {
                    warn!(id = %id, error = %err, "mutation.insert.rejected");
                    rejected.insert(id, ItemError::Rejected(err.to_string()));
                }
            }
        }
        let mut report = if staged.is_empty() {
            BatchReport::default()
        } else {
            let ids: Vec<Identity> = staged.iter().map(|doc| doc.id.clone()).collect();
            let revisions = store.revisions(&ids)?;
            let ops = staged
                .into_iter()
                .zip(revisions)
                .map(|(doc, rev)| BulkOp::Put(doc.with_rev(rev)))
                .collect();
            self.submit(store, "insert", ops)?
        };
        if rejected.is_empty() {
            return Ok(report);
        }
        let mut submitted: FxHashMap<Identity, ItemOutcome> = report
            .outcomes
            .drain(..)
            .map(|outcome| (outcome.id.clone(), outcome))
            .collect();
        report.outcomes = order
            .into_iter()
            .filter_map(|id| match rejected.remove(&id) {
                Some(err) => Some(ItemOutcome { id, result: Err(err) }),
                None => submitted.remove(&id),
            })
            .collect();
        Ok(report)
    }

    /// Removes `statements`, assigning identities to those lacking one.
    ///
    /// Statements not currently stored are listed in
    /// [`BatchReport::skipped`] rather than submitted.
    pub fn delete(
        &self,
        store: &dyn DocumentStore,
        statements: &mut [Statement],
    ) -> Result<BatchReport> {
        let ids: Vec<Identity> = statements
            .iter_mut()
            .map(|statement| self.assign(statement))
            .collect();
        self.tombstone(store, ids)
    }

    /// Tombstones every identity in `ids` that the store currently holds.
    pub fn tombstone(&self, store: &dyn DocumentStore, ids: Vec<Identity>) -> Result<BatchReport> {
        let mut seen = FxHashSet::default();
        let ids: Vec<Identity> = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();
        if ids.is_empty() {
            return Ok(BatchReport::default());
        }
        let revisions = store.revisions(&ids)?;
        let mut ops = Vec::new();
        let mut skipped = Vec::new();
        for (id, rev) in ids.into_iter().zip(revisions) {
            match rev {
                Some(rev) => ops.push(BulkOp::Delete { id, rev }),
                None => skipped.push(id),
            }
        }
        if !skipped.is_empty() {
            debug!(skipped = skipped.len(), "mutation.delete.absent");
        }
        let mut report = if ops.is_empty() {
            BatchReport::default()
        } else {
            self.submit(store, "delete", ops)?
        };
        report.skipped = skipped;
        Ok(report)
    }

    fn validate(&self, quad: &Quad) -> Result<()> {
        Field::ALL
            .into_iter()
            .try_for_each(|field| self.codec.validate(quad.get(field)))
    }

    fn assign(&self, statement: &mut Statement) -> Identity {
        if let Some(id) = statement.identity() {
            return id.clone();
        }
        let id = self.identity_of(statement.quad());
        statement.assign_identity(id.clone());
        id
    }

    fn submit(
        &self,
        store: &dyn DocumentStore,
        kind: &'static str,
        ops: Vec<BulkOp>,
    ) -> Result<BatchReport> {
        let total = ops.len();
        let chunk = self.max_batch.unwrap_or(total).max(1);
        let mut report = BatchReport::default();
        let mut requests = 0usize;
        let mut pending = ops.into_iter().peekable();
        while pending.peek().is_some() {
            let batch: Vec<BulkOp> = pending.by_ref().take(chunk).collect();
            let outcomes = store.bulk_write(batch)?;
            requests += 1;
            report.extend(BatchReport {
                outcomes,
                skipped: Vec::new(),
            });
        }
        for failure in report.failures() {
            if let Err(err) = &failure.result {
                warn!(kind, id = %failure.id, error = %err, "mutation.batch.item_failed");
            }
        }
        debug!(
            kind,
            items = total,
            requests,
            succeeded = report.succeeded(),
            "mutation.batch.submitted"
        );
        Ok(report)
    }
}
