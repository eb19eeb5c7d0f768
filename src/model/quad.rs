use crate::types::Identity;

use super::{Field, Term};

/// Immutable subject/predicate/object/context tuple.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Quad {
    terms: [Term; 4],
}

impl Quad {
    /// Builds a quad in the given graph.
    pub fn new(subject: Term, predicate: Term, object: Term, context: Term) -> Self {
        Self {
            terms: [subject, predicate, object, context],
        }
    }

    /// Builds a quad in the default graph.
    pub fn triple(subject: Term, predicate: Term, object: Term) -> Self {
        Self::new(subject, predicate, object, Term::DefaultGraph)
    }

    /// Term stored at `field`.
    pub fn get(&self, field: Field) -> &Term {
        &self.terms[field.ordinal()]
    }

    /// Subject term.
    pub fn subject(&self) -> &Term {
        self.get(Field::Subject)
    }

    /// Predicate term.
    pub fn predicate(&self) -> &Term {
        self.get(Field::Predicate)
    }

    /// Object term.
    pub fn object(&self) -> &Term {
        self.get(Field::Object)
    }

    /// Context term.
    pub fn context(&self) -> &Term {
        self.get(Field::Context)
    }
}

/// A quad plus the identity it is stored under.
///
/// Statements built by callers start without an identity; inserting or
/// deleting one assigns it. Statements read back from a store always carry
/// the record identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statement {
    quad: Quad,
    identity: Option<Identity>,
}

impl Statement {
    /// Statement without an identity yet.
    pub fn new(quad: Quad) -> Self {
        Self {
            quad,
            identity: None,
        }
    }

    /// Statement with a known identity.
    pub fn with_identity(quad: Quad, identity: Identity) -> Self {
        Self {
            quad,
            identity: Some(identity),
        }
    }

    /// The statement's quad.
    pub fn quad(&self) -> &Quad {
        &self.quad
    }

    /// Identity, once assigned.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Consumes the statement, returning its quad.
    pub fn into_quad(self) -> Quad {
        self.quad
    }

    pub(crate) fn assign_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }
}

impl From<Quad> for Statement {
    fn from(quad: Quad) -> Self {
        Statement::new(quad)
    }
}
