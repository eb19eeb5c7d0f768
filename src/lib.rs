//! Quad-pattern queries over a sorted-key document store.
//!
//! Statements (subject, predicate, object, graph context) are stored as
//! content-addressed documents. A small catalog of composite indexes covers
//! every combination of bound fields, so any pattern resolves to one exact
//! key lookup, one key-range scan, or a full scan.
//!
//! ```
//! use std::sync::Arc;
//! use sombra_quads::{MemoryStore, Pattern, Quad, QuadRepository, RepositoryOptions, Statement, Term};
//!
//! # fn main() -> sombra_quads::Result<()> {
//! let repo = QuadRepository::open(Arc::new(MemoryStore::new()), RepositoryOptions::default())?;
//! let mut batch = vec![Statement::new(Quad::triple(
//!     Term::iri("http://example.org/a"),
//!     Term::iri("http://example.org/p"),
//!     Term::literal("1"),
//! ))];
//! repo.insert(&mut batch)?;
//! let hits = repo.query(&Pattern::any().subject(Term::iri("http://example.org/a")))?;
//! assert_eq!(hits.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod codec;
pub mod index;
pub mod logging;
pub mod model;
pub mod mutation;
pub mod options;
pub mod query;
pub mod repository;
pub mod store;
pub mod types;

pub use codec::{NTriplesCodec, TermCodec};
pub use index::{IndexCatalog, IndexDef, IndexMaintenance, MaintenanceState};
pub use model::{Field, FieldSet, Literal, LiteralKind, Pattern, Quad, Statement, Term};
pub use mutation::{BatchReport, BatchStatus};
pub use options::RepositoryOptions;
pub use query::{ReadOptions, ResolvedQuery, Resolver};
pub use repository::{AuditReport, Feature, QuadRepository};
pub use store::{DocumentStore, MemoryStore, Staleness};
pub use types::{Identity, QuadError, Result, Revision};
