#![forbid(unsafe_code)]

//! Document store collaborator.
//!
//! The repository reaches its backend only through [`DocumentStore`]: a
//! revisioned document map with bulk writes and ordered queries over named
//! composite indexes. Index definitions live in design documents (ids
//! starting with [`DESIGN_PREFIX`]) and the store computes rows from them.

mod memory;

pub use memory::{MemoryStore, StoreStats};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Identity, Result, Revision};

/// Id prefix marking documents that define indexes rather than hold statements.
pub const DESIGN_PREFIX: &str = "_design/";

/// Stored record: identity, current revision, and JSON body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Record identity.
    pub id: Identity,
    /// Revision the write is based on, or the stored revision when read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<Revision>,
    /// Record fields.
    pub body: Map<String, Value>,
}

impl Document {
    /// New document without a base revision.
    pub fn new(id: impl Into<Identity>, body: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            rev: None,
            body,
        }
    }

    /// Sets the base revision.
    pub fn with_rev(mut self, rev: Option<Revision>) -> Self {
        self.rev = rev;
        self
    }

    /// Whether this document defines indexes.
    pub fn is_design(&self) -> bool {
        self.id.as_str().starts_with(DESIGN_PREFIX)
    }
}

/// One write inside a bulk batch.
#[derive(Clone, Debug, PartialEq)]
pub enum BulkOp {
    /// Create (no revision) or update (matching revision) a document.
    Put(Document),
    /// Tombstone the document at `rev`.
    Delete {
        /// Target identity.
        id: Identity,
        /// Revision being deleted.
        rev: Revision,
    },
}

impl BulkOp {
    /// Identity the operation targets.
    pub fn id(&self) -> &Identity {
        match self {
            BulkOp::Put(doc) => &doc.id,
            BulkOp::Delete { id, .. } => id,
        }
    }
}

/// Why a single bulk item was not applied.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error, Serialize)]
#[serde(rename_all = "snake_case", tag = "error", content = "reason")]
pub enum ItemError {
    /// The supplied revision does not match the stored one.
    #[error("revision conflict")]
    Conflict,
    /// The document to delete does not exist.
    #[error("not found")]
    NotFound,
    /// The backend refused the item.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Outcome of one bulk item.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ItemOutcome {
    /// Identity the item targeted.
    pub id: Identity,
    /// New revision on success.
    pub result: std::result::Result<Revision, ItemError>,
}

impl ItemOutcome {
    /// Whether the item was applied.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// How current index rows must be when answering a query.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Staleness {
    /// Bring the index up to date before answering.
    #[default]
    Fresh,
    /// Answer from the index as it stands.
    Ok,
    /// Answer from the index as it stands, then bring it up to date.
    UpdateAfter,
}

/// Rows selected from an index by key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeyRange {
    /// Every row.
    All,
    /// Rows whose key equals this key.
    Exact(Vec<String>),
    /// Rows with `start <= key < end`, keys compared component-wise.
    Range {
        /// Inclusive lower bound.
        start: Vec<String>,
        /// Exclusive upper bound.
        end: Vec<String>,
    },
}

impl KeyRange {
    /// Whether `key` lies in the range.
    pub fn contains(&self, key: &[String]) -> bool {
        match self {
            KeyRange::All => true,
            KeyRange::Exact(exact) => key == exact.as_slice(),
            KeyRange::Range { start, end } => start.as_slice() <= key && key < end.as_slice(),
        }
    }
}

/// Request against a named index.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexQuery {
    /// Key selection.
    pub range: KeyRange,
    /// Attach the current document to each row.
    pub include_docs: bool,
    /// Acceptable index staleness.
    pub staleness: Staleness,
}

/// One index row.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexRow {
    /// Identity of the emitting document.
    pub id: Identity,
    /// Composite key.
    pub key: Vec<String>,
    /// Current document when requested and still present.
    pub doc: Option<Document>,
}

/// Backend operations the repository depends on.
///
/// Implementations may block on network I/O. Connectivity faults surface as
/// [`crate::types::QuadError::StoreUnavailable`]; retries are the
/// implementation's business.
pub trait DocumentStore: Send + Sync {
    /// Fetches a document; `Ok(None)` when absent.
    fn get(&self, id: &Identity) -> Result<Option<Document>>;

    /// Creates `doc` when absent and `doc.rev` is `None`, or updates it when
    /// `doc.rev` matches the stored revision. Fails with `Conflict` otherwise.
    fn put(&self, doc: Document) -> Result<Revision>;

    /// Applies every operation independently, one outcome per operation in order.
    fn bulk_write(&self, ops: Vec<BulkOp>) -> Result<Vec<ItemOutcome>>;

    /// Current revision of each identity, `None` where absent.
    ///
    /// The default issues one `get` per identity; backends with a batched
    /// existence lookup should override it.
    fn revisions(&self, ids: &[Identity]) -> Result<Vec<Option<Revision>>> {
        ids.iter()
            .map(|id| Ok(self.get(id)?.and_then(|doc| doc.rev)))
            .collect()
    }

    /// Rows of `index` selected by `query`, ordered by key then identity.
    fn query_index(&self, index: &str, query: &IndexQuery) -> Result<Vec<IndexRow>>;

    /// Row count for `query` using the index's reduce; `Ok(None)` when the
    /// backend or the index cannot reduce.
    fn reduce_count(&self, _index: &str, _query: &IndexQuery) -> Result<Option<u64>> {
        Ok(None)
    }

    /// Identities of every statement record, design documents excluded.
    fn list_identities(&self) -> Result<Vec<Identity>>;
}
