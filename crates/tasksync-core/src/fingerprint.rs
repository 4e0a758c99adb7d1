//! Cheap change detection for fetched snapshots.
//!
//! The digest covers each entity's id and tracked mutable fields, sorted by
//! id before hashing, so neither fetch order nor map iteration order affects
//! the result. It only needs to distinguish "same snapshot" from "something
//! changed"; it is not cryptographic.

use sha2::{Digest, Sha256};

use crate::constants::FINGERPRINT_HEX_LEN;
use crate::models::Entity;

pub fn snapshot_fingerprint(entities: &[Entity]) -> String {
    let mut lines: Vec<String> = entities
        .iter()
        .map(|e| {
            format!(
                "{}\x1f{}\x1f{}\x1f{}\x1f{}\x1f{}",
                e.id,
                e.title,
                e.done,
                e.list_id.as_deref().unwrap_or(""),
                e.position.map(|p| p.to_string()).unwrap_or_default(),
                e.modified_at
            )
        })
        .collect();
    lines.sort();

    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update([b'\n']);
    }

    let digest = hasher.finalize();
    let mut out = String::with_capacity(FINGERPRINT_HEX_LEN);
    for byte in digest.iter().take(FINGERPRINT_HEX_LEN / 2) {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
