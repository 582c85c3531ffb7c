use sha2::{Digest, Sha256};

use crate::types::FileSignature;

/// Compute the snapshot signature over a set of file signatures.
///
/// The input order does not matter: pairs are sorted by path first. Each
/// field is length-prefixed so that no two distinct sets hash the same input.
pub fn snapshot_signature(files: &[FileSignature]) -> String {
    let mut sorted: Vec<&FileSignature> = files.iter().collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    for file in sorted {
        for field in [&file.path, &file.signature] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

/// Modification signature of one file from its size and mtime.
pub fn modification_signature(len: u64, modified_nanos: u128) -> String {
    format!("{len}:{modified_nanos}")
}
