use sha2::{Digest, Sha256};

use crate::domain::value_objects::Fingerprint;

/// Compute a SHA-256 fingerprint of a file's raw text.
///
/// The bytes are hashed exactly as received: no line-ending normalisation,
/// so a CRLF → LF rewrite by an editor counts as a change.
pub fn fingerprint(raw: &str) -> Fingerprint {
    let hash = Sha256::digest(raw.as_bytes());
    Fingerprint(format!("{:x}", hash))
}
