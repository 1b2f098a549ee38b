//! Content digests used as the payload dedup key.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content digest of a payload (e.g. `sha1:ABCD...` or `sha256:0f3a...`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Wrap a digest taken verbatim from the archive (`WARC-Payload-Digest`)
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into().trim().to_string())
    }

    /// Compute a `sha256:<hex>` digest over payload bytes
    pub fn compute(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let result = hasher.finalize();
        Self(format!("sha256:{}", hex::encode(result)))
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentDigest {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
