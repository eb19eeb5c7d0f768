#![allow(missing_docs)]

use std::sync::Arc;

use serde_json::{json, Map, Value};
use sombra_quads::index::{
    standard_definitions, IndexCatalog, IndexDef, IndexMaintenance, MaintenanceState,
    DEFAULT_DESIGN_ID,
};
use sombra_quads::model::Field;
use sombra_quads::store::{BulkOp, Document, IndexQuery, IndexRow, ItemOutcome, KeyRange};
use sombra_quads::{
    DocumentStore, Identity, MemoryStore, QuadError, QuadRepository, RepositoryOptions, Result,
    Revision, Staleness,
};

fn standard() -> Arc<IndexCatalog> {
    Arc::new(IndexCatalog::standard().expect("standard catalog"))
}

fn design_body(store: &MemoryStore, id: &str) -> Map<String, Value> {
    store
        .get(&Identity::from(id))
        .expect("get")
        .expect("design record")
        .body
}

#[test]
fn second_run_on_empty_store_writes_nothing() -> Result<()> {
    let store = MemoryStore::new();
    let mut first = IndexMaintenance::new(standard(), DEFAULT_DESIGN_ID);
    let report = first.run(&store, false)?;
    assert!(report.created);
    assert_eq!(report.writes, 1);
    assert_eq!(first.state(), MaintenanceState::Verified);
    let writes_after_first = store.stats().write_requests();
    assert_eq!(writes_after_first, 1);

    let mut second = IndexMaintenance::new(standard(), DEFAULT_DESIGN_ID);
    let report = second.run(&store, false)?;
    assert!(!report.created);
    assert!(report.updated.is_empty());
    assert_eq!(report.writes, 0);
    assert_eq!(second.state(), MaintenanceState::Verified);
    assert_eq!(store.stats().write_requests(), writes_after_first);
    Ok(())
}

#[test]
fn stale_definitions_are_migrated_and_unknown_ones_kept() -> Result<()> {
    let store = MemoryStore::new();
    store.put(Document::new(
        DEFAULT_DESIGN_ID,
        match json!({
            "indexes": {
                "spoc": { "fields": ["subject", "predicate", "object", "context"], "reduce": "count" },
                "os": { "fields": ["object"] },
                "by_label": { "fields": ["object", "context"] }
            },
            "language": "javascript"
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        },
    ))?;

    let mut maintenance = IndexMaintenance::new(standard(), DEFAULT_DESIGN_ID);
    let report = maintenance.run(&store, false)?;
    assert!(!report.created);
    assert_eq!(report.updated, ["poc", "oc", "sco", "cps", "os"]);
    assert_eq!(report.writes, 1);

    let body = design_body(&store, DEFAULT_DESIGN_ID);
    assert_eq!(body["language"], json!("javascript"));
    assert_eq!(body["indexes"]["by_label"], json!({ "fields": ["object", "context"] }));
    assert_eq!(
        body["indexes"]["os"],
        json!({ "fields": ["object", "subject"], "reduce": "count" })
    );
    Ok(())
}

#[test]
fn force_rewrites_a_matching_record() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let mut repo = QuadRepository::open(store.clone(), RepositoryOptions::default())?;
    let rev_before = store.get(&Identity::from(DEFAULT_DESIGN_ID))?.and_then(|d| d.rev);

    let report = repo.refresh_indexes(false)?;
    assert_eq!(report.writes, 0);
    let report = repo.refresh_indexes(true)?;
    assert_eq!(report.writes, 1);
    assert!(report.updated.is_empty());

    let rev_after = store.get(&Identity::from(DEFAULT_DESIGN_ID))?.and_then(|d| d.rev);
    assert_eq!(rev_after, rev_before.map(Revision::next));
    Ok(())
}

#[test]
fn custom_design_id_is_honored() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    QuadRepository::open(
        store.clone(),
        RepositoryOptions::default().design_id("_design/custom"),
    )?;
    assert!(store.get(&Identity::from(DEFAULT_DESIGN_ID))?.is_none());
    let body = design_body(&store, "_design/custom");
    assert_eq!(
        body["indexes"].as_object().map(|m| m.len()),
        Some(standard_definitions().len())
    );
    Ok(())
}

#[test]
fn queries_need_persisted_definitions() {
    let store = MemoryStore::new();
    let err = store
        .query_index(
            "spoc",
            &IndexQuery {
                range: KeyRange::All,
                include_docs: false,
                staleness: Staleness::Fresh,
            },
        )
        .expect_err("no persisted definitions");
    assert!(matches!(err, QuadError::StoreUnavailable(_)));
}

/// Store whose reads fail with a connectivity error.
struct UnreachableStore;

impl DocumentStore for UnreachableStore {
    fn get(&self, _id: &Identity) -> Result<Option<Document>> {
        Err(QuadError::StoreUnavailable("timed out".into()))
    }

    fn put(&self, _doc: Document) -> Result<Revision> {
        Err(QuadError::StoreUnavailable("timed out".into()))
    }

    fn bulk_write(&self, _ops: Vec<BulkOp>) -> Result<Vec<ItemOutcome>> {
        Err(QuadError::StoreUnavailable("timed out".into()))
    }

    fn query_index(&self, _index: &str, _query: &IndexQuery) -> Result<Vec<IndexRow>> {
        Err(QuadError::StoreUnavailable("timed out".into()))
    }

    fn list_identities(&self) -> Result<Vec<Identity>> {
        Err(QuadError::StoreUnavailable("timed out".into()))
    }
}

#[test]
fn unreachable_store_aborts_startup() {
    let mut maintenance = IndexMaintenance::new(standard(), DEFAULT_DESIGN_ID);
    let err = maintenance
        .run(&UnreachableStore, false)
        .expect_err("fetch fails");
    assert!(matches!(err, QuadError::IndexMaintenance { .. }));
    assert_eq!(maintenance.state(), MaintenanceState::Unverified);

    let err = QuadRepository::open(Arc::new(UnreachableStore), RepositoryOptions::default())
        .expect_err("open fails");
    match err {
        QuadError::IndexMaintenance { source } => {
            assert!(matches!(*source, QuadError::StoreUnavailable(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn incomplete_catalogs_fail_at_construction() {
    let missing_full = standard_definitions()
        .into_iter()
        .filter(|def| def.name != "spoc")
        .collect();
    assert!(matches!(
        IndexCatalog::new(missing_full),
        Err(QuadError::Configuration(_))
    ));

    let only_subject = vec![IndexDef::new("s", [Field::Subject])];
    assert!(matches!(
        IndexCatalog::new(only_subject),
        Err(QuadError::Configuration(_))
    ));
}
