use sha2::{Digest, Sha256};

use crate::codec::TermCodec;
use crate::model::{Field, Quad};
use crate::types::Identity;

/// Domain separator for statement identities. Bump on any framing change.
const IDENTITY_DOMAIN_TAG: &[u8] = b"sombra-quads:statement:v1";

/// SHA-256 over the encoded subject, predicate, object and context, in that
/// order, each length-prefixed. Rendered as lowercase hex.
///
/// Equal quads always map to equal identities, so re-inserting a quad
/// addresses the record already stored for it.
pub fn identity_of(codec: &dyn TermCodec, quad: &Quad) -> Identity {
    let mut hasher = Sha256::new();
    hasher.update(IDENTITY_DOMAIN_TAG);
    for field in Field::ALL {
        let encoded = codec.encode(quad.get(field));
        hasher.update((encoded.len() as u64).to_be_bytes());
        hasher.update(encoded.as_bytes());
    }
    Identity(hex::encode(hasher.finalize()))
}
