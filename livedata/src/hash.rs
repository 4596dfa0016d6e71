//! Content hashing, used to tell registered templates apart.

use sha2::{Digest, Sha256};
use subtle_encoding::hex;

/// Lowercase hexadecimal SHA256 digest of the given content.
pub fn sha256<S: AsRef<[u8]>>(content: S) -> String {
    let digest = Sha256::digest(content.as_ref());
    hex::encode(digest).into_iter().map(char::from).collect()
}
