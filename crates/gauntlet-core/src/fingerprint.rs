//! Submission content fingerprinting.
//!
//! A [`Fingerprint`] is the lowercase hex SHA-256 digest of the submission
//! code bytes followed by the explanation bytes. A missing explanation
//! hashes identically to an empty one. No separator is inserted between
//! the two parts, so the digest is sensitive to every byte but not to
//! where the code/explanation boundary falls (`("ab", "c")` and
//! `("a", "bc")` collide). Fingerprints are compared for equality only
//! and never decoded.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deterministic identity of one submission's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint a submission's code and optional explanation.
///
/// Deterministic across processes and hosts. `None` and `Some("")`
/// explanations produce the same digest; any other byte difference in
/// either part produces a different one.
pub fn fingerprint(code: &str, explanation: Option<&str>) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hasher.update(explanation.unwrap_or("").as_bytes());
    Fingerprint(format!("{:x}", hasher.finalize()))
}
