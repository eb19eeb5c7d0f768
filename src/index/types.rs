use serde::{Deserialize, Serialize};

use crate::model::Field;

/// Aggregate a store may precompute over an index's rows.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReduceRule {
    /// Row count over any key range.
    Count,
}

/// Computation rule the store persists for one index: the composite key
/// layout plus an optional reduce.
///
/// Persisted rules are compared structurally against this value.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct IndexRule {
    /// Composite key fields, most significant first.
    pub fields: Vec<Field>,
    /// Optional aggregate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce: Option<ReduceRule>,
}

/// Named composite index.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct IndexDef {
    /// Index name as known to the store.
    pub name: String,
    /// Key layout and reduce.
    pub rule: IndexRule,
}

impl IndexDef {
    /// Index over `fields` without a reduce.
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            name: name.into(),
            rule: IndexRule {
                fields: fields.into_iter().collect(),
                reduce: None,
            },
        }
    }

    /// Index named after its field letters, e.g. `"spoc"`.
    ///
    /// Returns `None` when `letters` contains anything but `s`, `p`, `o`, `c`.
    pub fn from_letters(letters: &str) -> Option<Self> {
        let fields = letters
            .chars()
            .map(Field::from_letter)
            .collect::<Option<Vec<_>>>()?;
        Some(Self::new(letters, fields))
    }

    /// Attaches a reduce rule.
    pub fn with_reduce(mut self, reduce: ReduceRule) -> Self {
        self.rule.reduce = Some(reduce);
        self
    }

    /// Key fields in order.
    pub fn fields(&self) -> &[Field] {
        &self.rule.fields
    }

    /// Number of key fields.
    pub fn arity(&self) -> usize {
        self.rule.fields.len()
    }

    /// Whether the store can count rows without materializing them.
    pub fn supports_count(&self) -> bool {
        self.rule.reduce == Some(ReduceRule::Count)
    }
}
