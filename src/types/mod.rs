#![forbid(unsafe_code)]

//! Identifiers and the crate-wide error type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::FieldSet;

/// Content-addressed storage key of a statement.
///
/// Produced by [`crate::mutation::identity_of`]; two equal quads always
/// share one identity.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

/// Revision marker assigned by the store on every successful write.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub u64);

impl Identity {
    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Identity(value.to_owned())
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Identity(value)
    }
}

impl Revision {
    /// Revision following this one.
    pub fn next(self) -> Self {
        Revision(self.0 + 1)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors surfaced by catalog construction, resolution, maintenance and the
/// store collaborator.
///
/// Partial failure inside a bulk batch is not an error; see
/// [`crate::mutation::BatchReport`].
#[derive(thiserror::Error, Debug)]
pub enum QuadError {
    /// The index catalog is malformed or does not cover every field subset.
    #[error("invalid index catalog: {0}")]
    Configuration(String),
    /// No catalog entry serves the bound field subset.
    #[error("no index serves pattern over {0}")]
    UnsupportedPattern(FieldSet),
    /// Verifying or persisting index definitions failed during startup.
    #[error("index maintenance failed: {source}")]
    IndexMaintenance {
        /// Underlying failure.
        #[source]
        source: Box<QuadError>,
    },
    /// The store could not serve a request.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    /// A write carried a revision that no longer matches the stored record.
    #[error("update conflict on {0}")]
    Conflict(Identity),
    /// A stored key could not be decoded into a term.
    #[error("term codec: {0}")]
    Codec(String),
    /// A stored document is missing fields or has the wrong shape.
    #[error("corruption: {0}")]
    Corruption(String),
    /// I/O error.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// JSON (de)serialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// TOML configuration parse error.
    #[error("config: {0}")]
    Toml(#[from] toml::de::Error),
}

impl QuadError {
    pub(crate) fn maintenance(source: QuadError) -> Self {
        QuadError::IndexMaintenance {
            source: Box::new(source),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, QuadError>;
