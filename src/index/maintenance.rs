use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::store::{Document, DocumentStore};
use crate::types::{Identity, QuadError, Result};

use super::catalog::IndexCatalog;
use super::types::IndexRule;

/// Well-known id of the persisted index record.
pub const DEFAULT_DESIGN_ID: &str = "_design/rdf_quad_indexes";

const INDEXES_KEY: &str = "indexes";

/// Whether the persisted index record has been checked against the catalog.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceState {
    /// Not yet checked; query results are not guaranteed.
    Unverified,
    /// Persisted definitions match the catalog.
    Verified,
}

/// What a maintenance pass changed.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct MaintenanceReport {
    /// The persisted record did not exist and was created.
    pub created: bool,
    /// Indexes whose persisted rule was missing or different.
    pub updated: Vec<String>,
    /// Write requests issued against the store.
    pub writes: usize,
    /// Fingerprint of the catalog that was verified.
    pub fingerprint: u64,
}

/// Keeps the store's persisted index record in line with an [`IndexCatalog`].
///
/// Entries the catalog does not name are left untouched; nothing is ever
/// removed from the record.
#[derive(Debug)]
pub struct IndexMaintenance {
    catalog: Arc<IndexCatalog>,
    design_id: Identity,
    state: MaintenanceState,
}

impl IndexMaintenance {
    /// Starts unverified.
    pub fn new(catalog: Arc<IndexCatalog>, design_id: impl Into<Identity>) -> Self {
        Self {
            catalog,
            design_id: design_id.into(),
            state: MaintenanceState::Unverified,
        }
    }

    /// Current state.
    pub fn state(&self) -> MaintenanceState {
        self.state
    }

    /// Id of the persisted record.
    pub fn design_id(&self) -> &Identity {
        &self.design_id
    }

    /// Full record body for the catalog.
    pub fn expected_body(&self) -> Result<Map<String, Value>> {
        let mut indexes = Map::new();
        for def in self.catalog.definitions() {
            indexes.insert(def.name.clone(), serde_json::to_value(&def.rule)?);
        }
        let mut body = Map::new();
        body.insert(INDEXES_KEY.to_owned(), Value::Object(indexes));
        Ok(body)
    }

    /// Verifies the persisted record, creating or merging it as needed.
    ///
    /// With `force` the record is rewritten even when nothing differs. Any
    /// store failure other than absence of the record aborts with
    /// [`QuadError::IndexMaintenance`] and leaves the state unchanged.
    pub fn run(&mut self, store: &dyn DocumentStore, force: bool) -> Result<MaintenanceReport> {
        let fingerprint = self.catalog.fingerprint();
        let mut report = MaintenanceReport {
            fingerprint,
            ..MaintenanceReport::default()
        };
        let stored = store.get(&self.design_id).map_err(QuadError::maintenance)?;
        match stored {
            None => {
                let doc = Document::new(self.design_id.clone(), self.expected_body()?);
                store.put(doc).map_err(QuadError::maintenance)?;
                report.created = true;
                report.updated = self
                    .catalog
                    .definitions()
                    .iter()
                    .map(|def| def.name.clone())
                    .collect();
                report.writes = 1;
                info!(
                    design = %self.design_id,
                    indexes = report.updated.len(),
                    fingerprint = %format!("{fingerprint:016x}"),
                    "index.maintenance.created"
                );
            }
            Some(mut doc) => {
                report.updated = self.merge_into(&mut doc.body)?;
                if !report.updated.is_empty() || force {
                    store.put(doc).map_err(QuadError::maintenance)?;
                    report.writes = 1;
                    info!(
                        design = %self.design_id,
                        updated = ?report.updated,
                        force,
                        "index.maintenance.updated"
                    );
                } else {
                    debug!(
                        design = %self.design_id,
                        fingerprint = %format!("{fingerprint:016x}"),
                        "index.maintenance.unchanged"
                    );
                }
            }
        }
        self.state = MaintenanceState::Verified;
        Ok(report)
    }

    /// Writes the catalog's rule for every missing or differing index into
    /// `body`, returning the names written.
    fn merge_into(&self, body: &mut Map<String, Value>) -> Result<Vec<String>> {
        let indexes = body
            .entry(INDEXES_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        if !indexes.is_object() {
            *indexes = Value::Object(Map::new());
        }
        let Value::Object(indexes) = indexes else {
            return Err(QuadError::Corruption(
                "persisted index record is not an object".into(),
            ));
        };
        let mut updated = Vec::new();
        for def in self.catalog.definitions() {
            let persisted = indexes
                .get(&def.name)
                .and_then(|value| serde_json::from_value::<IndexRule>(value.clone()).ok());
            if persisted.as_ref() != Some(&def.rule) {
                indexes.insert(def.name.clone(), serde_json::to_value(&def.rule)?);
                updated.push(def.name.clone());
            }
        }
        Ok(updated)
    }
}
