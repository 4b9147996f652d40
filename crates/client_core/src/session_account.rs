//! Burner secp256k1 signer used as the delegate ("session") account.

use std::fmt;

use chrono::{DateTime, Utc};
use libsecp256k1::{PublicKey, SecretKey};
use sha3::{Digest, Keccak256};
use shared::domain::Address;
use storage::StoredSessionAccount;
use thiserror::Error;
use zeroize::Zeroize;

#[derive(Debug, Error)]
pub enum SessionAccountError {
    #[error("session secret is not valid hex")]
    MalformedSecret,
    #[error("session secret is not a valid secp256k1 scalar")]
    InvalidSecret,
    #[error("stored address {stored} does not match key-derived address {derived}")]
    AddressMismatch { stored: Address, derived: Address },
}

#[derive(Clone)]
pub struct SessionSecret([u8; 32]);

impl SessionSecret {
    fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionSecret(<redacted>)")
    }
}

impl Drop for SessionSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[derive(Debug, Clone)]
pub struct SessionAccount {
    address: Address,
    secret: SessionSecret,
    created_at: DateTime<Utc>,
}

impl SessionAccount {
    pub fn generate() -> Self {
        let secret_key = SecretKey::random(&mut rand::thread_rng());
        Self::from_secret_key(&secret_key, Utc::now())
    }

    pub fn from_secret_hex(
        secret_hex: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SessionAccountError> {
        let digits = secret_hex.strip_prefix("0x").unwrap_or(secret_hex);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| SessionAccountError::MalformedSecret)?;
        let secret_key = SecretKey::parse(&bytes).map_err(|_| SessionAccountError::InvalidSecret);
        bytes.zeroize();
        Ok(Self::from_secret_key(&secret_key?, created_at))
    }

    /// Restores a persisted account, refusing records whose address does not
    /// belong to the stored key.
    pub fn from_stored(stored: &StoredSessionAccount) -> Result<Self, SessionAccountError> {
        let account = Self::from_secret_hex(&stored.secret_key_hex, stored.created_at)?;
        if account.address != stored.address {
            return Err(SessionAccountError::AddressMismatch {
                stored: stored.address,
                derived: account.address,
            });
        }
        Ok(account)
    }

    fn from_secret_key(secret_key: &SecretKey, created_at: DateTime<Utc>) -> Self {
        let public_key = PublicKey::from_secret_key(secret_key);
        Self {
            address: address_from_public_key(&public_key),
            secret: SessionSecret(secret_key.serialize()),
            created_at,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn to_stored(&self) -> StoredSessionAccount {
        StoredSessionAccount {
            address: self.address,
            secret_key_hex: self.secret.to_hex(),
            created_at: self.created_at,
        }
    }
}

/// Ethereum address: last 20 bytes of keccak256 over the uncompressed public
/// key without its 0x04 prefix.
pub fn address_from_public_key(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize();
    let digest = Keccak256::digest(&uncompressed[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[12..]);
    Address(address)
}

#[cfg(test)]
#[path = "tests/session_account_tests.rs"]
mod tests;
