// ABOUTME: SHA-256 content digest used to name version directories.
// ABOUTME: Hashes raw upload bytes; parsing validates 64 lowercase hex chars.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("invalid digest length: expected {DIGEST_HEX_LEN} hex chars, got {0}")]
    InvalidLength(usize),

    #[error("invalid hex character in digest: '{0}'")]
    InvalidChar(char),
}

/// Identity of an uploaded archive: the SHA-256 of its raw (still compressed) bytes.
///
/// Two uploads with identical bytes always share a digest, which makes it the
/// idempotence key for extraction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Hash the given bytes. Never fails; empty input hashes to the SHA-256 of "".
    pub fn of(data: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(data)))
    }

    /// Validate a digest string, normalizing to lowercase.
    pub fn parse(value: &str) -> Result<Self, DigestError> {
        if value.len() != DIGEST_HEX_LEN {
            return Err(DigestError::InvalidLength(value.len()));
        }

        if let Some(c) = value.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(DigestError::InvalidChar(c));
        }

        Ok(Self(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
