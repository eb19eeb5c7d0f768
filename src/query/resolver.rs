use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::trace;

use crate::codec::TermCodec;
use crate::index::IndexCatalog;
use crate::model::{Field, Pattern, Quad, Statement, Term};
use crate::store::{Document, DocumentStore, IndexQuery, IndexRow, KeyRange};
use crate::types::{QuadError, Result};

use super::ReadOptions;

/// Index access chosen for a pattern.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedQuery {
    /// Every key field is bound: point lookup.
    ExactMatch {
        /// Serving index.
        index: String,
        /// Complete key.
        key: Vec<String>,
    },
    /// A strict key prefix is bound: half-open range over its completions.
    RangeScan {
        /// Serving index.
        index: String,
        /// Inclusive start, the encoded prefix.
        start: Vec<String>,
        /// Exclusive end, the prefix followed by the codec's upper bound.
        end: Vec<String>,
    },
    /// Nothing is bound: every row of the full-scan index.
    FullScan {
        /// Serving index.
        index: String,
    },
}

impl ResolvedQuery {
    /// Name of the serving index.
    pub fn index(&self) -> &str {
        match self {
            ResolvedQuery::ExactMatch { index, .. }
            | ResolvedQuery::RangeScan { index, .. }
            | ResolvedQuery::FullScan { index } => index,
        }
    }

    /// Key selection to send to the store.
    pub fn key_range(&self) -> KeyRange {
        match self {
            ResolvedQuery::ExactMatch { key, .. } => KeyRange::Exact(key.clone()),
            ResolvedQuery::RangeScan { start, end, .. } => KeyRange::Range {
                start: start.clone(),
                end: end.clone(),
            },
            ResolvedQuery::FullScan { .. } => KeyRange::All,
        }
    }

    fn index_query(&self, include_docs: bool, opts: ReadOptions) -> IndexQuery {
        IndexQuery {
            range: self.key_range(),
            include_docs,
            staleness: opts.staleness,
        }
    }
}

impl fmt::Display for ResolvedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedQuery::ExactMatch { index, key } => {
                write!(f, "ExactMatch {index} key={key:?}")
            }
            ResolvedQuery::RangeScan { index, start, .. } => {
                write!(f, "RangeScan {index} prefix={start:?}")
            }
            ResolvedQuery::FullScan { index } => write!(f, "FullScan {index}"),
        }
    }
}

/// Maps patterns to index accesses and store rows back to statements.
#[derive(Clone)]
pub struct Resolver {
    catalog: Arc<IndexCatalog>,
    codec: Arc<dyn TermCodec>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("indexes", &self.catalog.definitions().len())
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Resolver over `catalog`, encoding keys with `codec`.
    pub fn new(catalog: Arc<IndexCatalog>, codec: Arc<dyn TermCodec>) -> Self {
        Self { catalog, codec }
    }

    /// Catalog in use.
    pub fn catalog(&self) -> &IndexCatalog {
        &self.catalog
    }

    /// Chooses the index and key (or range) serving `pattern`.
    ///
    /// Pure: touches neither the store nor any shared state.
    pub fn resolve(&self, pattern: &Pattern) -> Result<ResolvedQuery> {
        let bound = pattern.bound();
        if bound.is_empty() {
            let index = self.catalog.full_scan_index().name.clone();
            trace!(%index, "query.resolve.full_scan");
            return Ok(ResolvedQuery::FullScan { index });
        }
        let coverage = self
            .catalog
            .coverage(bound)
            .ok_or(QuadError::UnsupportedPattern(bound))?;
        let mut key = Vec::with_capacity(coverage.order.len());
        for field in coverage.order {
            let term = pattern
                .get(*field)
                .ok_or(QuadError::UnsupportedPattern(bound))?;
            key.push(self.codec.encode(term));
        }
        let index = coverage.index.name.clone();
        let resolved = if coverage.order.len() == coverage.index.arity() {
            ResolvedQuery::ExactMatch { index, key }
        } else {
            let mut end = key.clone();
            end.push(self.codec.upper_bound().to_owned());
            ResolvedQuery::RangeScan {
                index,
                start: key,
                end,
            }
        };
        trace!(bound = %bound, resolved = %resolved, "query.resolve");
        Ok(resolved)
    }

    /// Statements matching `pattern`, in the serving index's key order.
    pub fn query(
        &self,
        store: &dyn DocumentStore,
        pattern: &Pattern,
        opts: ReadOptions,
    ) -> Result<Vec<Statement>> {
        let resolved = self.resolve(pattern)?;
        let rows = store.query_index(resolved.index(), &resolved.index_query(true, opts))?;
        self.materialize(rows)
    }

    /// Number of statements matching `pattern`.
    ///
    /// Uses the serving index's count reduce when both the definition and the
    /// store support it; otherwise counts rows without loading documents.
    pub fn count(
        &self,
        store: &dyn DocumentStore,
        pattern: &Pattern,
        opts: ReadOptions,
    ) -> Result<u64> {
        let resolved = self.resolve(pattern)?;
        let index_query = resolved.index_query(false, opts);
        let reducible = self
            .catalog
            .get(resolved.index())
            .is_some_and(|def| def.supports_count());
        if reducible {
            if let Some(count) = store.reduce_count(resolved.index(), &index_query)? {
                trace!(index = resolved.index(), count, "query.count.reduced");
                return Ok(count);
            }
        }
        let rows = store.query_index(resolved.index(), &index_query)?;
        trace!(index = resolved.index(), count = rows.len(), "query.count.rows");
        Ok(rows.len() as u64)
    }

    /// Rebuilds statements from rows carrying documents.
    ///
    /// Rows whose document has disappeared since the index was computed are
    /// skipped.
    pub fn materialize(&self, rows: Vec<IndexRow>) -> Result<Vec<Statement>> {
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(doc) = row.doc else {
                trace!(id = %row.id, "query.materialize.missing_doc");
                continue;
            };
            let quad = self.decode_document(&doc)?;
            out.push(Statement::with_identity(quad, row.id));
        }
        Ok(out)
    }

    fn decode_document(&self, doc: &Document) -> Result<Quad> {
        let term = |field: Field| -> Result<Term> {
            let encoded = doc
                .body
                .get(field.name())
                .and_then(|value| value.as_str())
                .ok_or_else(|| {
                    QuadError::Corruption(format!("record {} has no {field} key", doc.id))
                })?;
            self.codec.decode(encoded)
        };
        Ok(Quad::new(
            term(Field::Subject)?,
            term(Field::Predicate)?,
            term(Field::Object)?,
            term(Field::Context)?,
        ))
    }
}
