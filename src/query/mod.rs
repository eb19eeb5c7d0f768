#![forbid(unsafe_code)]

//! Pattern resolution.
//!
//! A [`Pattern`](crate::model::Pattern) binds any subset of the four fields.
//! The [`Resolver`] looks the bound subset up in the catalog's coverage table
//! and turns it into an exact key, a half-open key range, or a full scan over
//! one named index, then rebuilds statements from the rows the store returns.

mod resolver;

pub use resolver::{ResolvedQuery, Resolver};

use serde::{Deserialize, Serialize};

use crate::store::Staleness;

/// Per-read consistency options.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReadOptions {
    /// How current the index must be.
    pub staleness: Staleness,
}

impl ReadOptions {
    /// Options requesting `staleness`.
    pub fn with_staleness(staleness: Staleness) -> Self {
        Self { staleness }
    }

    /// Read that may observe an index lagging recent writes.
    pub fn stale() -> Self {
        Self::with_staleness(Staleness::Ok)
    }
}
