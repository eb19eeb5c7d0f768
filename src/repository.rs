#![forbid(unsafe_code)]

//! Quad repository facade.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::{debug, info};

use crate::codec::{NTriplesCodec, TermCodec};
use crate::index::{IndexCatalog, IndexMaintenance, MaintenanceReport, MaintenanceState};
use crate::model::{Pattern, Statement};
use crate::mutation::{BatchReport, Writer};
use crate::options::RepositoryOptions;
use crate::query::{ReadOptions, ResolvedQuery, Resolver};
use crate::store::{DocumentStore, IndexQuery, KeyRange, Staleness};
use crate::types::{Identity, Result};

/// Optional capabilities a caller may query.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Feature {
    /// Named-graph contexts are stored and queryable.
    Context,
    /// Entailment over stored statements.
    Inference,
}

/// Comparison of stored records against the full-scan index.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct AuditReport {
    /// Statement records in the store.
    pub records: usize,
    /// Records reachable through the full-scan index.
    pub indexed: usize,
    /// Records the full-scan index does not emit, typically malformed bodies.
    pub unindexed: Vec<Identity>,
}

impl AuditReport {
    /// Whether every record is indexed.
    pub fn is_consistent(&self) -> bool {
        self.unindexed.is_empty()
    }
}

/// Statement repository over a [`DocumentStore`].
///
/// Opening a repository verifies the store's persisted index definitions, so
/// every query issued through it runs against confirmed indexes.
pub struct QuadRepository {
    store: Arc<dyn DocumentStore>,
    catalog: Arc<IndexCatalog>,
    resolver: Resolver,
    writer: Writer,
    maintenance: IndexMaintenance,
    last_maintenance: MaintenanceReport,
    options: RepositoryOptions,
}

impl std::fmt::Debug for QuadRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadRepository")
            .field("options", &self.options)
            .field("state", &self.maintenance.state())
            .finish_non_exhaustive()
    }
}

impl QuadRepository {
    /// Opens a repository with the standard catalog and N-Triples keys.
    pub fn open(store: Arc<dyn DocumentStore>, options: RepositoryOptions) -> Result<Self> {
        let catalog = IndexCatalog::standard()?;
        Self::open_with(store, catalog, Arc::new(NTriplesCodec), options)
    }

    /// Opens a repository with a custom catalog and codec.
    ///
    /// Fails with [`crate::QuadError::IndexMaintenance`] when the persisted
    /// index record cannot be verified.
    pub fn open_with(
        store: Arc<dyn DocumentStore>,
        catalog: IndexCatalog,
        codec: Arc<dyn TermCodec>,
        options: RepositoryOptions,
    ) -> Result<Self> {
        options.validate()?;
        let catalog = Arc::new(catalog);
        let mut maintenance = IndexMaintenance::new(Arc::clone(&catalog), options.design_id.as_str());
        let report = maintenance.run(store.as_ref(), options.force_index_refresh)?;
        info!(
            design = %options.design_id,
            created = report.created,
            updated = report.updated.len(),
            "repository.opened"
        );
        Ok(Self {
            resolver: Resolver::new(Arc::clone(&catalog), Arc::clone(&codec)),
            writer: Writer::new(codec, options.max_batch_size),
            store,
            catalog,
            maintenance,
            last_maintenance: report,
            options,
        })
    }

    /// Whether the repository provides `feature`.
    pub fn supports(&self, feature: Feature) -> bool {
        match feature {
            Feature::Context => true,
            Feature::Inference => false,
        }
    }

    /// Statements matching `pattern` at the configured staleness.
    pub fn query(&self, pattern: &Pattern) -> Result<Vec<Statement>> {
        self.query_with(pattern, self.read_options())
    }

    /// Statements matching `pattern` with explicit read options.
    pub fn query_with(&self, pattern: &Pattern, opts: ReadOptions) -> Result<Vec<Statement>> {
        self.resolver.query(self.store.as_ref(), pattern, opts)
    }

    /// Every stored statement.
    pub fn statements(&self) -> Result<Vec<Statement>> {
        self.query(&Pattern::any())
    }

    /// Number of stored statements.
    pub fn count(&self) -> Result<u64> {
        self.count_matching(&Pattern::any())
    }

    /// Number of statements matching `pattern`.
    pub fn count_matching(&self, pattern: &Pattern) -> Result<u64> {
        self.count_with(pattern, self.read_options())
    }

    /// Number of statements matching `pattern` with explicit read options.
    pub fn count_with(&self, pattern: &Pattern, opts: ReadOptions) -> Result<u64> {
        self.resolver.count(self.store.as_ref(), pattern, opts)
    }

    /// Whether the repository holds no statements.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.count()? == 0)
    }

    /// Upserts `statements`; each one carries its identity afterwards.
    pub fn insert(&self, statements: &mut [Statement]) -> Result<BatchReport> {
        self.writer.insert(self.store.as_ref(), statements)
    }

    /// Upserts one statement.
    pub fn insert_statement(&self, statement: &mut Statement) -> Result<BatchReport> {
        self.insert(std::slice::from_mut(statement))
    }

    /// Removes `statements`; those not stored are skipped.
    pub fn delete(&self, statements: &mut [Statement]) -> Result<BatchReport> {
        self.writer.delete(self.store.as_ref(), statements)
    }

    /// Removes one statement.
    pub fn delete_statement(&self, statement: &mut Statement) -> Result<BatchReport> {
        self.delete(std::slice::from_mut(statement))
    }

    /// Removes every statement found by a fresh full scan in one batch.
    pub fn clear(&self) -> Result<BatchReport> {
        let ids = self.full_scan_ids()?;
        debug!(records = ids.len(), "repository.clear");
        self.writer.tombstone(self.store.as_ref(), ids)
    }

    /// Index access `pattern` would use, without touching the store.
    pub fn explain(&self, pattern: &Pattern) -> Result<ResolvedQuery> {
        self.resolver.resolve(pattern)
    }

    /// Re-verifies the persisted index record; `force` rewrites it even
    /// when nothing differs.
    pub fn refresh_indexes(&mut self, force: bool) -> Result<MaintenanceReport> {
        let report = self.maintenance.run(self.store.as_ref(), force)?;
        self.last_maintenance = report.clone();
        Ok(report)
    }

    /// Report of the most recent maintenance pass, including the one run by
    /// [`QuadRepository::open`].
    pub fn last_maintenance(&self) -> &MaintenanceReport {
        &self.last_maintenance
    }

    /// State of index verification.
    pub fn maintenance_state(&self) -> MaintenanceState {
        self.maintenance.state()
    }

    /// Compares the store's records against a fresh full scan.
    pub fn audit(&self) -> Result<AuditReport> {
        let records = self.store.list_identities()?;
        let indexed: FxHashSet<Identity> = self.full_scan_ids()?.into_iter().collect();
        let mut unindexed: Vec<Identity> = records
            .iter()
            .filter(|id| !indexed.contains(*id))
            .cloned()
            .collect();
        unindexed.sort();
        Ok(AuditReport {
            records: records.len(),
            indexed: indexed.len(),
            unindexed,
        })
    }

    /// Catalog in use.
    pub fn catalog(&self) -> &IndexCatalog {
        &self.catalog
    }

    /// Underlying store.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Options the repository was opened with.
    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    fn read_options(&self) -> ReadOptions {
        ReadOptions::with_staleness(self.options.staleness)
    }

    fn full_scan_ids(&self) -> Result<Vec<Identity>> {
        let index = &self.catalog.full_scan_index().name;
        let rows = self.store.query_index(
            index,
            &IndexQuery {
                range: KeyRange::All,
                include_docs: false,
                staleness: Staleness::Fresh,
            },
        )?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }
}
