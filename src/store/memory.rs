use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::index::{IndexRule, ReduceRule};
use crate::types::{Identity, QuadError, Result, Revision};

use super::{
    BulkOp, Document, DocumentStore, IndexQuery, IndexRow, ItemError, ItemOutcome, Staleness,
    DESIGN_PREFIX,
};

/// In-process [`DocumentStore`].
///
/// Views are built lazily from the index rules in design documents and are
/// only rebuilt when a query asks for [`Staleness::Fresh`] (or after an
/// [`Staleness::UpdateAfter`] read), mirroring backends that defer index
/// recomputation. Contents can be saved to and loaded from a JSON snapshot.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    counters: Counters,
}

#[derive(Default)]
struct State {
    docs: BTreeMap<Identity, Document>,
    /// Bumped on every applied write; views remember the value they were built at.
    seq: u64,
    views: FxHashMap<String, View>,
}

struct View {
    rule: IndexRule,
    built_at: u64,
    rows: Vec<(Vec<String>, Identity)>,
}

#[derive(Default)]
struct Counters {
    gets: AtomicU64,
    puts: AtomicU64,
    bulk_writes: AtomicU64,
    bulk_items: AtomicU64,
    queries: AtomicU64,
    view_builds: AtomicU64,
}

/// Snapshot of [`MemoryStore`] request counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct StoreStats {
    /// Single-document reads.
    pub gets: u64,
    /// Single-document writes.
    pub puts: u64,
    /// Bulk write requests.
    pub bulk_writes: u64,
    /// Operations carried by bulk write requests.
    pub bulk_items: u64,
    /// Index queries, including reduces.
    pub queries: u64,
    /// View (re)computations.
    pub view_builds: u64,
}

impl StoreStats {
    /// Write requests of either kind.
    pub fn write_requests(&self) -> u64 {
        self.puts + self.bulk_writes
    }
}

impl Counters {
    fn inc(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StoreStats {
        StoreStats {
            gets: self.gets.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            bulk_writes: self.bulk_writes.load(Ordering::Relaxed),
            bulk_items: self.bulk_items.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            view_builds: self.view_builds.load(Ordering::Relaxed),
        }
    }
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a snapshot written by [`MemoryStore::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        let docs: Vec<Document> = serde_json::from_slice(&bytes)?;
        let mut state = State::default();
        for doc in docs {
            if doc.rev.is_none() {
                return Err(QuadError::Corruption(format!(
                    "snapshot document {} has no revision",
                    doc.id
                )));
            }
            state.docs.insert(doc.id.clone(), doc);
        }
        debug!(
            path = %path.as_ref().display(),
            documents = state.docs.len(),
            "store.memory.loaded"
        );
        Ok(Self {
            state: RwLock::new(state),
            counters: Counters::default(),
        })
    }

    /// Writes every document to a JSON snapshot at `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let state = self.state.read();
        let docs: Vec<&Document> = state.docs.values().collect();
        let json = serde_json::to_vec_pretty(&docs)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Request counters so far.
    pub fn stats(&self) -> StoreStats {
        self.counters.snapshot()
    }

    fn rule_for(state: &State, index: &str) -> Option<IndexRule> {
        state
            .docs
            .range(Identity::from(DESIGN_PREFIX)..)
            .take_while(|(id, _)| id.as_str().starts_with(DESIGN_PREFIX))
            .find_map(|(_, doc)| {
                let rule = doc.body.get("indexes")?.get(index)?;
                serde_json::from_value(rule.clone()).ok()
            })
    }

    fn build_rows(state: &State, rule: &IndexRule) -> Vec<(Vec<String>, Identity)> {
        let mut rows: Vec<(Vec<String>, Identity)> = state
            .docs
            .values()
            .filter(|doc| !doc.is_design())
            .filter_map(|doc| {
                let key = rule
                    .fields
                    .iter()
                    .map(|f| doc.body.get(f.name()).and_then(Value::as_str).map(str::to_owned))
                    .collect::<Option<Vec<_>>>()?;
                Some((key, doc.id.clone()))
            })
            .collect();
        rows.sort();
        rows
    }

    fn refresh_view(&self, state: &mut State, index: &str, rule: IndexRule) {
        let rows = Self::build_rows(state, &rule);
        trace!(index, rows = rows.len(), "store.memory.view_built");
        Counters::inc(&self.counters.view_builds, 1);
        let built_at = state.seq;
        state.views.insert(
            index.to_owned(),
            View {
                rule,
                built_at,
                rows,
            },
        );
    }

    /// Runs `f` over the view's rows, honoring the requested staleness.
    fn with_view<T>(
        &self,
        index: &str,
        staleness: Staleness,
        f: impl FnOnce(&State, &View) -> T,
    ) -> Result<T> {
        Counters::inc(&self.counters.queries, 1);
        let mut state = self.state.write();
        let rule = Self::rule_for(&state, index).ok_or_else(|| {
            QuadError::StoreUnavailable(format!("index '{index}' is not defined"))
        })?;
        let seq = state.seq;
        let rebuild = match state.views.get(index) {
            None => true,
            Some(view) => {
                view.rule != rule || (staleness == Staleness::Fresh && view.built_at < seq)
            }
        };
        if rebuild {
            self.refresh_view(&mut state, index, rule.clone());
        }
        let (out, behind) = match state.views.get(index) {
            Some(view) => (f(&*state, view), view.built_at < seq),
            None => {
                return Err(QuadError::StoreUnavailable(format!(
                    "index '{index}' could not be built"
                )))
            }
        };
        if staleness == Staleness::UpdateAfter && behind {
            self.refresh_view(&mut state, index, rule);
        }
        Ok(out)
    }

    fn apply_put(state: &mut State, mut doc: Document) -> std::result::Result<Revision, ItemError> {
        let current = state.docs.get(&doc.id).and_then(|d| d.rev);
        let next = match (current, doc.rev) {
            (None, None) => Revision(1),
            (Some(cur), Some(base)) if cur == base => cur.next(),
            _ => return Err(ItemError::Conflict),
        };
        doc.rev = Some(next);
        state.docs.insert(doc.id.clone(), doc);
        state.seq += 1;
        Ok(next)
    }

    fn apply_delete(
        state: &mut State,
        id: &Identity,
        rev: Revision,
    ) -> std::result::Result<Revision, ItemError> {
        let current = state
            .docs
            .get(id)
            .and_then(|d| d.rev)
            .ok_or(ItemError::NotFound)?;
        if current != rev {
            return Err(ItemError::Conflict);
        }
        state.docs.remove(id);
        state.seq += 1;
        Ok(current.next())
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, id: &Identity) -> Result<Option<Document>> {
        Counters::inc(&self.counters.gets, 1);
        Ok(self.state.read().docs.get(id).cloned())
    }

    fn put(&self, doc: Document) -> Result<Revision> {
        Counters::inc(&self.counters.puts, 1);
        let id = doc.id.clone();
        let mut state = self.state.write();
        Self::apply_put(&mut state, doc).map_err(|_| QuadError::Conflict(id))
    }

    fn bulk_write(&self, ops: Vec<BulkOp>) -> Result<Vec<ItemOutcome>> {
        Counters::inc(&self.counters.bulk_writes, 1);
        Counters::inc(&self.counters.bulk_items, ops.len() as u64);
        let mut state = self.state.write();
        let outcomes = ops
            .into_iter()
            .map(|op| match op {
                BulkOp::Put(doc) => {
                    let id = doc.id.clone();
                    let result = Self::apply_put(&mut state, doc);
                    ItemOutcome { id, result }
                }
                BulkOp::Delete { id, rev } => {
                    let result = Self::apply_delete(&mut state, &id, rev);
                    ItemOutcome { id, result }
                }
            })
            .collect();
        Ok(outcomes)
    }

    fn revisions(&self, ids: &[Identity]) -> Result<Vec<Option<Revision>>> {
        let state = self.state.read();
        Ok(ids
            .iter()
            .map(|id| state.docs.get(id).and_then(|d| d.rev))
            .collect())
    }

    fn query_index(&self, index: &str, query: &IndexQuery) -> Result<Vec<IndexRow>> {
        self.with_view(index, query.staleness, |state, view| {
            view.rows
                .iter()
                .filter(|(key, _)| query.range.contains(key))
                .map(|(key, id)| IndexRow {
                    id: id.clone(),
                    key: key.clone(),
                    doc: if query.include_docs {
                        state.docs.get(id).cloned()
                    } else {
                        None
                    },
                })
                .collect()
        })
    }

    fn reduce_count(&self, index: &str, query: &IndexQuery) -> Result<Option<u64>> {
        self.with_view(index, query.staleness, |_, view| {
            (view.rule.reduce == Some(ReduceRule::Count)).then(|| {
                view.rows
                    .iter()
                    .filter(|(key, _)| query.range.contains(key))
                    .count() as u64
            })
        })
    }

    fn list_identities(&self) -> Result<Vec<Identity>> {
        Ok(self
            .state
            .read()
            .docs
            .values()
            .filter(|doc| !doc.is_design())
            .map(|doc| doc.id.clone())
            .collect())
    }
}
