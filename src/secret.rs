//! Secret and hashlock generation
//!
//! A swap commits to a 32-byte random secret via its Keccak-256 hash. The
//! hash is embedded in both escrows at creation; the secret stays with the
//! orchestrator until a withdrawal reveals it on-chain.

use crate::error::{ResolverError, ResolverResult};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// 32-byte swap secret. Redacted in `Debug` output so it never leaks into
/// logs before it is revealed on-chain.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret([u8; 32]);

impl Secret {
    /// Generate a fresh secret from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Secret(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Secret(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Keccak-256 commitment to this secret.
    pub fn hash(&self) -> SecretHash {
        let mut hasher = Keccak256::new();
        hasher.update(self.0);
        SecretHash(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<redacted>)")
    }
}

impl FromStr for Secret {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Secret(decode_hex32(s)?))
    }
}

/// Public hash commitment embedded in both escrows.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretHash([u8; 32]);

impl SecretHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        SecretHash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check that a revealed secret matches this commitment.
    pub fn verify(&self, secret: &Secret) -> bool {
        secret.hash() == *self
    }
}

impl fmt::Display for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretHash({})", self)
    }
}

impl FromStr for SecretHash {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SecretHash(decode_hex32(s)?))
    }
}

fn decode_hex32(s: &str) -> ResolverResult<[u8; 32]> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(stripped)
        .map_err(|e| ResolverError::InvalidParameter(format!("invalid hex: {}", e)))?;
    bytes
        .try_into()
        .map_err(|_| ResolverError::InvalidParameter("expected 32 bytes".to_string()))
}
