/// One RDF component: an IRI, blank node, literal, or the default graph.
///
/// Terms deliberately do not implement `Ord`; index order is defined by the
/// strings a [`crate::codec::TermCodec`] produces, not by this enum.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    /// Absolute IRI, stored without angle brackets.
    Iri(String),
    /// Blank node label, stored without the `_:` prefix.
    BlankNode(String),
    /// Literal value.
    Literal(Literal),
    /// Sentinel context of statements outside any named graph.
    DefaultGraph,
}

/// Lexical value plus its language tag or datatype.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Literal {
    /// Lexical form.
    pub value: String,
    /// Tagging of the lexical form.
    pub kind: LiteralKind,
}

/// How a literal's lexical form is qualified.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    /// Plain string literal.
    Simple,
    /// Language-tagged string (`"chat"@fr`).
    Language(String),
    /// Literal with an explicit datatype IRI.
    Typed(String),
}

impl Term {
    /// IRI term.
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    /// Blank node term.
    pub fn blank(label: impl Into<String>) -> Self {
        Term::BlankNode(label.into())
    }

    /// Plain literal.
    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(Literal {
            value: value.into(),
            kind: LiteralKind::Simple,
        })
    }

    /// Language-tagged literal.
    pub fn lang_literal(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Term::Literal(Literal {
            value: value.into(),
            kind: LiteralKind::Language(lang.into()),
        })
    }

    /// Literal with a datatype IRI.
    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal(Literal {
            value: value.into(),
            kind: LiteralKind::Typed(datatype.into()),
        })
    }

    /// Whether this is the default-graph sentinel.
    pub fn is_default_graph(&self) -> bool {
        matches!(self, Term::DefaultGraph)
    }
}

impl From<Literal> for Term {
    fn from(value: Literal) -> Self {
        Term::Literal(value)
    }
}
