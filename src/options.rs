#![forbid(unsafe_code)]

//! Repository configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::index::DEFAULT_DESIGN_ID;
use crate::store::{Staleness, DESIGN_PREFIX};
use crate::types::{QuadError, Result};

/// Options controlling how a [`crate::QuadRepository`] talks to its store.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// design_id = "_design/my_indexes"
/// staleness = "update_after"
/// max_batch_size = 500
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryOptions {
    /// Identifier of the persisted index record.
    pub design_id: String,
    /// Read consistency used by `query` and `count`.
    pub staleness: Staleness,
    /// Maximum operations per bulk request; `None` sends one request per batch.
    pub max_batch_size: Option<usize>,
    /// Rewrite the persisted index record at open even when it matches.
    pub force_index_refresh: bool,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            design_id: DEFAULT_DESIGN_ID.to_owned(),
            staleness: Staleness::Fresh,
            max_batch_size: None,
            force_index_refresh: false,
        }
    }
}

impl RepositoryOptions {
    /// Reads options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let options: Self = toml::from_str(&contents)?;
        options.validate()?;
        Ok(options)
    }

    /// Sets the persisted index record identifier.
    pub fn design_id(mut self, id: impl Into<String>) -> Self {
        self.design_id = id.into();
        self
    }

    /// Sets the default read consistency.
    pub fn staleness(mut self, staleness: Staleness) -> Self {
        self.staleness = staleness;
        self
    }

    /// Caps the operations per bulk request.
    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = Some(size);
        self
    }

    /// Forces the index record to be rewritten at open.
    pub fn force_index_refresh(mut self, enabled: bool) -> Self {
        self.force_index_refresh = enabled;
        self
    }

    /// Rejects settings no store could honor.
    pub fn validate(&self) -> Result<()> {
        if !self.design_id.starts_with(DESIGN_PREFIX) || self.design_id.len() == DESIGN_PREFIX.len()
        {
            return Err(QuadError::Configuration(format!(
                "design_id '{}' must start with '{DESIGN_PREFIX}' and name a record",
                self.design_id
            )));
        }
        if self.max_batch_size == Some(0) {
            return Err(QuadError::Configuration(
                "max_batch_size must be positive".into(),
            ));
        }
        Ok(())
    }
}
