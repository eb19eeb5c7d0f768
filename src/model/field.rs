use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{Quad, Term};

/// One position of a quad.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    /// Subject position.
    Subject,
    /// Predicate position.
    Predicate,
    /// Object position.
    Object,
    /// Named-graph context position.
    Context,
}

impl Field {
    /// All fields in canonical order.
    pub const ALL: [Field; 4] = [
        Field::Subject,
        Field::Predicate,
        Field::Object,
        Field::Context,
    ];

    /// Position in canonical order.
    pub const fn ordinal(self) -> usize {
        match self {
            Field::Subject => 0,
            Field::Predicate => 1,
            Field::Object => 2,
            Field::Context => 3,
        }
    }

    const fn bit(self) -> u8 {
        1 << self.ordinal()
    }

    /// Document property name holding this field.
    pub const fn name(self) -> &'static str {
        match self {
            Field::Subject => "subject",
            Field::Predicate => "predicate",
            Field::Object => "object",
            Field::Context => "context",
        }
    }

    /// Single-letter abbreviation used in index names.
    pub const fn letter(self) -> char {
        match self {
            Field::Subject => 's',
            Field::Predicate => 'p',
            Field::Object => 'o',
            Field::Context => 'c',
        }
    }

    /// Parses a single-letter abbreviation.
    pub fn from_letter(letter: char) -> Option<Self> {
        Field::ALL.into_iter().find(|f| f.letter() == letter)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| format!("unknown field '{s}'"))
    }
}

/// Set of quad fields encoded as a 4-bit mask.
///
/// The 15 non-empty values identify every queryable bound-field subset.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct FieldSet(u8);

impl FieldSet {
    /// No fields.
    pub const EMPTY: FieldSet = FieldSet(0);
    /// All four fields.
    pub const ALL: FieldSet = FieldSet(0b1111);

    /// Builds a set from raw mask bits; `None` when bits above the fourth are set.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits > Self::ALL.0 {
            None
        } else {
            Some(FieldSet(bits))
        }
    }

    /// Raw mask bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns the set with `field` added.
    pub const fn with(self, field: Field) -> Self {
        FieldSet(self.0 | field.bit())
    }

    /// Whether `field` is a member.
    pub const fn contains(self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    /// Number of members.
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether the set is empty.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Members in canonical order.
    pub fn fields(self) -> SmallVec<[Field; 4]> {
        Field::ALL
            .into_iter()
            .filter(|f| self.contains(*f))
            .collect()
    }

    /// Every non-empty subset of the four fields, ordered by mask value.
    pub fn non_empty_subsets() -> impl Iterator<Item = FieldSet> {
        (1..=Self::ALL.0).map(FieldSet)
    }
}

impl FromIterator<Field> for FieldSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        iter.into_iter().fold(FieldSet::EMPTY, FieldSet::with)
    }
}

impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, field) in self.fields().iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            f.write_str(field.name())?;
        }
        f.write_str("}")
    }
}

/// Query pattern: a term per bound field, `None` for wildcards.
///
/// A bound context of [`Term::DefaultGraph`] restricts matches to the
/// default graph; an unbound context matches every graph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pattern {
    terms: [Option<Term>; 4],
}

impl Pattern {
    /// Pattern with every field unbound.
    pub fn any() -> Self {
        Self::default()
    }

    /// Binds `field` to `term`.
    pub fn bind(mut self, field: Field, term: Term) -> Self {
        self.terms[field.ordinal()] = Some(term);
        self
    }

    /// Binds the subject.
    pub fn subject(self, term: Term) -> Self {
        self.bind(Field::Subject, term)
    }

    /// Binds the predicate.
    pub fn predicate(self, term: Term) -> Self {
        self.bind(Field::Predicate, term)
    }

    /// Binds the object.
    pub fn object(self, term: Term) -> Self {
        self.bind(Field::Object, term)
    }

    /// Binds the context.
    pub fn context(self, term: Term) -> Self {
        self.bind(Field::Context, term)
    }

    /// Term bound to `field`, if any.
    pub fn get(&self, field: Field) -> Option<&Term> {
        self.terms[field.ordinal()].as_ref()
    }

    /// Set of bound fields.
    pub fn bound(&self) -> FieldSet {
        Field::ALL
            .into_iter()
            .filter(|f| self.get(*f).is_some())
            .collect()
    }

    /// Whether `quad` agrees with every bound field.
    pub fn matches(&self, quad: &Quad) -> bool {
        Field::ALL
            .into_iter()
            .all(|f| self.get(f).map_or(true, |term| quad.get(f) == term))
    }
}

impl From<&Quad> for Pattern {
    fn from(quad: &Quad) -> Self {
        Field::ALL
            .into_iter()
            .fold(Pattern::any(), |p, f| p.bind(f, quad.get(f).clone()))
    }
}
