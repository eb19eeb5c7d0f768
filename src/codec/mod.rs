#![forbid(unsafe_code)]

//! Term codecs: reversible, order-preserving string encodings of terms.

mod ntriples;

pub use ntriples::{format_nquads_line, parse_nquads_line, NTriplesCodec};

use crate::model::Term;
use crate::types::Result;

/// Key component that sorts after every encoded term.
///
/// Codecs must never produce a key starting with this character.
pub const KEY_UPPER_BOUND: &str = "\u{10FFFF}";

/// Converts terms to comparable string keys and back.
///
/// Implementations must round-trip (`decode(encode(t)) == t`) and must keep
/// every encoded key below [`TermCodec::upper_bound`].
pub trait TermCodec: Send + Sync {
    /// Encodes a term as an index key component.
    fn encode(&self, term: &Term) -> String;
    /// Decodes a key component produced by [`TermCodec::encode`].
    fn decode(&self, key: &str) -> Result<Term>;
    /// Fails with [`crate::QuadError::Codec`] when `term` has no key that
    /// decodes back to it. Writers check every term before staging it.
    fn validate(&self, _term: &Term) -> Result<()> {
        Ok(())
    }
    /// Key component sorting after every encoded term; closes prefix ranges.
    fn upper_bound(&self) -> &str {
        KEY_UPPER_BOUND
    }
}
