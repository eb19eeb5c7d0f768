#![allow(missing_docs)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use sombra_quads::store::{BulkOp, Document, IndexQuery, IndexRow, ItemError, ItemOutcome};
use sombra_quads::{
    BatchStatus, DocumentStore, Identity, MemoryStore, Pattern, Quad, QuadError, QuadRepository,
    ReadOptions, RepositoryOptions, Result, Revision, Staleness, Statement, Term,
};

fn ex(local: &str) -> Term {
    Term::iri(format!("http://example.org/{local}"))
}

fn statement(subject: &str, object: &str) -> Statement {
    Statement::new(Quad::triple(ex(subject), ex("p"), Term::literal(object)))
}

fn open(store: Arc<dyn DocumentStore>) -> Result<QuadRepository> {
    QuadRepository::open(store, RepositoryOptions::default())
}

fn quads(statements: &[Statement]) -> Vec<Quad> {
    statements.iter().map(|s| s.quad().clone()).collect()
}

#[test]
fn subject_predicate_and_object_patterns() -> Result<()> {
    let repo = open(Arc::new(MemoryStore::new()))?;
    let mut batch = vec![statement("a", "1"), statement("a", "2")];
    let report = repo.insert(&mut batch)?;
    assert_eq!(report.status(), BatchStatus::AllSucceeded);

    let by_sp = repo.query(&Pattern::any().subject(ex("a")).predicate(ex("p")))?;
    assert_eq!(quads(&by_sp), quads(&batch));

    let by_object = repo.query(&Pattern::any().object(Term::literal("1")))?;
    assert_eq!(quads(&by_object), quads(&batch[..1]));
    assert_eq!(by_object[0].identity(), batch[0].identity());
    Ok(())
}

#[test]
fn delete_by_value_leaves_the_other_statement() -> Result<()> {
    let repo = open(Arc::new(MemoryStore::new()))?;
    repo.insert(&mut [statement("a", "1"), statement("a", "2")])?;

    let mut target = statement("a", "1");
    let report = repo.delete_statement(&mut target)?;
    assert_eq!(report.succeeded(), 1);
    assert!(target.identity().is_some());

    let remaining = repo.statements()?;
    assert_eq!(quads(&remaining), vec![statement("a", "2").into_quad()]);
    assert_eq!(repo.count()?, 1);
    Ok(())
}

#[test]
fn clear_removes_everything() -> Result<()> {
    let repo = open(Arc::new(MemoryStore::new()))?;
    let mut batch: Vec<Statement> = (0..25)
        .map(|i| statement(&format!("s{}", i % 4), &i.to_string()))
        .collect();
    repo.insert(&mut batch)?;
    assert_eq!(repo.count()?, 25);

    let report = repo.clear()?;
    assert_eq!(report.succeeded(), 25);
    assert_eq!(repo.count()?, 0);
    assert!(repo.statements()?.is_empty());
    assert!(repo.is_empty()?);
    Ok(())
}

#[test]
fn inserting_twice_keeps_one_record() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let repo = open(store.clone())?;
    let mut first = statement("a", "1");
    repo.insert_statement(&mut first)?;
    let mut second = statement("a", "1");
    repo.insert_statement(&mut second)?;

    assert_eq!(first.identity(), second.identity());
    assert_eq!(store.list_identities()?.len(), 1);
    assert_eq!(repo.count()?, 1);
    let id = first.identity().cloned().expect("identity assigned");
    let doc = store.get(&id)?.expect("stored record");
    assert_eq!(doc.rev, Some(Revision(2)));
    Ok(())
}

#[test]
fn deleting_absent_statements_is_idempotent() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let repo = open(store.clone())?;
    let before = store.stats().bulk_writes;
    let report = repo.delete(&mut [statement("nope", "0")])?;
    assert_eq!(report.status(), BatchStatus::Empty);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(store.stats().bulk_writes, before);
    Ok(())
}

#[test]
fn undecodable_terms_never_reach_the_store() -> Result<()> {
    let repo = open(Arc::new(MemoryStore::new()))?;
    let mut batch = vec![
        Statement::new(Quad::triple(ex("a"), ex("p"), Term::lang_literal("x", "en_US"))),
        Statement::new(Quad::triple(Term::blank(""), ex("p"), Term::literal("1"))),
        statement("a", "1"),
    ];
    let report = repo.insert(&mut batch)?;
    assert_eq!(report.status(), BatchStatus::Partial);
    assert_eq!(report.failures().count(), 2);
    assert!(report
        .failures()
        .all(|outcome| matches!(outcome.result, Err(ItemError::Rejected(_)))));

    let stored = repo.statements()?;
    assert_eq!(quads(&stored), quads(&batch[2..]));
    assert_eq!(repo.count_matching(&Pattern::any().subject(ex("a")))?, 1);
    Ok(())
}

#[test]
fn named_graphs_are_queryable() -> Result<()> {
    let repo = open(Arc::new(MemoryStore::new()))?;
    let mut batch = vec![
        Statement::new(Quad::new(ex("a"), ex("p"), Term::literal("1"), ex("g1"))),
        Statement::new(Quad::new(ex("a"), ex("p"), Term::literal("1"), ex("g2"))),
        statement("a", "1"),
    ];
    repo.insert(&mut batch)?;
    assert_eq!(repo.count()?, 3);
    assert_eq!(repo.count_matching(&Pattern::any().context(ex("g1")))?, 1);
    assert_eq!(
        repo.count_matching(&Pattern::any().context(Term::DefaultGraph))?,
        1
    );
    let exact = repo.query(&Pattern::from(batch[1].quad()))?;
    assert_eq!(quads(&exact), quads(&batch[1..2]));
    Ok(())
}

#[test]
fn stale_reads_are_opt_in() -> Result<()> {
    let repo = open(Arc::new(MemoryStore::new()))?;
    let pattern = Pattern::any().subject(ex("a"));
    assert_eq!(repo.count_with(&pattern, ReadOptions::stale())?, 0);
    repo.insert(&mut [statement("a", "1")])?;

    assert_eq!(repo.count_with(&pattern, ReadOptions::stale())?, 0);
    assert_eq!(repo.count_matching(&pattern)?, 1);
    assert_eq!(
        repo.query_with(&pattern, ReadOptions::with_staleness(Staleness::Ok))?
            .len(),
        1
    );
    Ok(())
}

/// Refuses every write whose object key equals `rejected`.
struct RejectingStore {
    inner: MemoryStore,
    rejected: String,
}

impl DocumentStore for RejectingStore {
    fn get(&self, id: &Identity) -> Result<Option<Document>> {
        self.inner.get(id)
    }

    fn put(&self, doc: Document) -> Result<Revision> {
        self.inner.put(doc)
    }

    fn bulk_write(&self, ops: Vec<BulkOp>) -> Result<Vec<ItemOutcome>> {
        let mut outcomes = Vec::with_capacity(ops.len());
        for op in ops {
            let refused = matches!(
                &op,
                BulkOp::Put(doc) if doc.body.get("object").and_then(Value::as_str) == Some(self.rejected.as_str())
            );
            if refused {
                outcomes.push(ItemOutcome {
                    id: op.id().clone(),
                    result: Err(ItemError::Rejected("validation failed".into())),
                });
            } else {
                outcomes.extend(self.inner.bulk_write(vec![op])?);
            }
        }
        Ok(outcomes)
    }

    fn query_index(&self, index: &str, query: &IndexQuery) -> Result<Vec<IndexRow>> {
        self.inner.query_index(index, query)
    }

    fn reduce_count(&self, index: &str, query: &IndexQuery) -> Result<Option<u64>> {
        self.inner.reduce_count(index, query)
    }

    fn list_identities(&self) -> Result<Vec<Identity>> {
        self.inner.list_identities()
    }
}

#[test]
fn partial_batch_failure_is_reported_per_item() -> Result<()> {
    let repo = open(Arc::new(RejectingStore {
        inner: MemoryStore::new(),
        rejected: "\"bad\"".into(),
    }))?;
    let mut batch = vec![statement("a", "1"), statement("a", "bad"), statement("a", "2")];
    let report = repo.insert(&mut batch)?;

    assert_eq!(report.status(), BatchStatus::Partial);
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.succeeded(), 2);
    let failed: Vec<&Identity> = report.failures().map(|o| &o.id).collect();
    assert_eq!(failed, vec![batch[1].identity().expect("identity assigned")]);
    assert_eq!(repo.count()?, 2);

    let report = repo.insert(&mut [statement("b", "bad")])?;
    assert_eq!(report.status(), BatchStatus::AllFailed);
    Ok(())
}

/// Fails every request once `offline` is set.
struct FlakyStore {
    inner: MemoryStore,
    offline: AtomicBool,
}

impl FlakyStore {
    fn check(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(QuadError::StoreUnavailable("connection refused".into()));
        }
        Ok(())
    }
}

impl DocumentStore for FlakyStore {
    fn get(&self, id: &Identity) -> Result<Option<Document>> {
        self.check()?;
        self.inner.get(id)
    }

    fn put(&self, doc: Document) -> Result<Revision> {
        self.check()?;
        self.inner.put(doc)
    }

    fn bulk_write(&self, ops: Vec<BulkOp>) -> Result<Vec<ItemOutcome>> {
        self.check()?;
        self.inner.bulk_write(ops)
    }

    fn query_index(&self, index: &str, query: &IndexQuery) -> Result<Vec<IndexRow>> {
        self.check()?;
        self.inner.query_index(index, query)
    }

    fn list_identities(&self) -> Result<Vec<Identity>> {
        self.check()?;
        self.inner.list_identities()
    }
}

#[test]
fn store_faults_propagate_without_retry() -> Result<()> {
    let store = Arc::new(FlakyStore {
        inner: MemoryStore::new(),
        offline: AtomicBool::new(false),
    });
    let repo = open(store.clone())?;
    let mut batch = vec![statement("a", "1")];
    repo.insert(&mut batch)?;

    store.offline.store(true, Ordering::SeqCst);
    assert!(matches!(
        repo.query(&Pattern::any()),
        Err(QuadError::StoreUnavailable(_))
    ));
    assert!(matches!(repo.count(), Err(QuadError::StoreUnavailable(_))));
    let mut fresh = vec![statement("b", "1")];
    assert!(matches!(
        repo.insert(&mut fresh),
        Err(QuadError::StoreUnavailable(_))
    ));
    assert!(matches!(repo.clear(), Err(QuadError::StoreUnavailable(_))));

    store.offline.store(false, Ordering::SeqCst);
    assert_eq!(repo.count()?, 1);
    Ok(())
}

#[test]
fn counting_falls_back_to_rows_without_a_reduce() -> Result<()> {
    let store = Arc::new(FlakyStore {
        inner: MemoryStore::new(),
        offline: AtomicBool::new(false),
    });
    let repo = open(store.clone())?;
    repo.insert(&mut [statement("a", "1"), statement("b", "1")])?;
    let before = store.inner.stats().queries;
    assert_eq!(repo.count_matching(&Pattern::any().object(Term::literal("1")))?, 2);
    assert_eq!(store.inner.stats().queries, before + 1);
    Ok(())
}

#[test]
fn chunked_batches_report_every_item() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let repo = QuadRepository::open(
        store.clone(),
        RepositoryOptions::default().max_batch_size(3),
    )?;
    let mut batch: Vec<Statement> = (0..10).map(|i| statement("a", &i.to_string())).collect();
    let before = store.stats().bulk_writes;
    let report = repo.insert(&mut batch)?;
    assert_eq!(report.outcomes.len(), 10);
    assert_eq!(store.stats().bulk_writes - before, 4);
    assert_eq!(repo.count()?, 10);
    Ok(())
}
