//! SHA-256 checksums of schema migration SQL

use sha2::{Digest, Sha256};

/// Hex SHA-256 of the migration text
pub fn compute_checksum(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
