#![forbid(unsafe_code)]

//! Write path: content-addressed identities and batched upsert/delete.
//!
//! Every statement is stored under the hash of its encoded quad, so writes
//! are idempotent. Bulk requests report one outcome per item; a batch in
//! which some items fail is a [`BatchReport`], not an error.

mod batch;
mod identity;
mod writer;

pub use batch::{BatchReport, BatchStatus};
pub use identity::identity_of;
pub use writer::Writer;
