//! Operator identity: payer account plus signing capability

use crate::types::{AccountId, PublicKeyBytes};
use anyhow::{Context, Result};
use ed25519_dalek::{Signer, SigningKey};
use std::sync::Arc;

/// The client's own identity on the ledger.
///
/// Transactions whose identifier was generated under this account are
/// auto-signed with the operator key; only such identifiers are eligible for
/// rebuild-and-retry after a consensus-level throttle.
pub struct Operator {
    account: AccountId,
    signing_key: Arc<SigningKey>,
}

impl Operator {
    pub fn new(account: AccountId, signing_key: SigningKey) -> Self {
        Self {
            account,
            signing_key: Arc::new(signing_key),
        }
    }

    /// Load the operator key from a file containing either 32 raw seed bytes
    /// or a hex-encoded seed.
    pub fn from_file(account: AccountId, path: &str) -> Result<Self> {
        let raw = std::fs::read(path).with_context(|| format!("failed to read key file: {path}"))?;

        let seed: [u8; 32] = if raw.len() == 32 {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(&raw);
            seed
        } else {
            let text = std::str::from_utf8(&raw)
                .context("key file is neither 32 raw bytes nor valid UTF-8")?
                .trim();
            let decoded = hex::decode(text).context("failed to hex-decode key file")?;
            decoded
                .as_slice()
                .try_into()
                .map_err(|_| anyhow::anyhow!("expected 32-byte seed, got {} bytes", decoded.len()))?
        };
        if seed.iter().all(|&b| b == 0) {
            anyhow::bail!("invalid key: all-zero seed rejected");
        }

        Ok(Self::new(account, SigningKey::from_bytes(&seed)))
    }

    /// Generate a fresh random operator (tests and local development)
    pub fn generate(account: AccountId) -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self::new(account, SigningKey::generate(&mut csprng))
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn public_key(&self) -> PublicKeyBytes {
        PublicKeyBytes(self.signing_key.verifying_key().to_bytes())
    }

    /// Opaque signing capability: bytes in, signature bytes out
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

impl Clone for Operator {
    fn clone(&self) -> Self {
        Self {
            account: self.account,
            signing_key: Arc::clone(&self.signing_key),
        }
    }
}

impl std::fmt::Debug for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operator")
            .field("account", &self.account)
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}
