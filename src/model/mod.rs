#![forbid(unsafe_code)]

//! Logical data model: terms, quads, statements and query patterns.

mod field;
mod quad;
mod term;

pub use field::{Field, FieldSet, Pattern};
pub use quad::{Quad, Statement};
pub use term::{Literal, LiteralKind, Term};
