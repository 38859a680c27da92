//! hash
//!
//! Git blob content addressing.
//!
//! GitHub reports blob SHAs in its recursive tree listings. To diff local
//! files against the remote tree without fetching blob contents, the local
//! hash must reproduce git's object addressing byte-for-byte: a `blob`
//! header with the decimal content length and a NUL terminator, followed by
//! the content, digested with SHA-1.

use sha1::{Digest, Sha1};

/// Compute the git blob SHA for a byte sequence, as lowercase hex.
///
/// Matches `git hash-object` for a plain file, so a local file is unchanged
/// iff this equals the SHA GitHub reports for the same path.
pub fn blob_sha(content: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content);
    hex::encode(hasher.finalize())
}
