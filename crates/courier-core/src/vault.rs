// Note: Deprecation warnings from generic-array 0.14.x are expected until
// aes-gcm moves to generic-array 1.x.
#![allow(deprecated)]

//! Per-tenant credential encryption and audit hashing
//!
//! Provider credentials are stored as `"ENC:" + base64(nonce || ciphertext)`
//! and decrypted transiently for the duration of a single delivery call. The
//! symmetric key is derived per tenant, so a ciphertext copied between tenant
//! documents does not decrypt. Values without the `"ENC:"` prefix are legacy
//! plaintext and pass through unchanged.

use aes_gcm::{
    aead::{Aead, KeyInit},
    AeadCore, Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::errors::DeliveryError;

/// Prefix marking a stored credential as encrypted.
pub const ENCRYPTED_PREFIX: &str = "ENC:";

const NONCE_LENGTH: usize = 12;

/// Encrypts, decrypts, and fingerprints per-tenant provider credentials.
pub struct CredentialVault {
    app_secret: String,
}

impl CredentialVault {
    /// Creates a vault bound to the application secret. Tenant keys are
    /// derived from this secret, never stored.
    pub fn new(app_secret: impl Into<String>) -> Self {
        Self {
            app_secret: app_secret.into(),
        }
    }

    /// Derives the tenant's symmetric key: SHA-256(tenant_id || app_secret).
    fn tenant_key(&self, tenant_id: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(tenant_id.as_bytes());
        hasher.update(self.app_secret.as_bytes());
        let digest = hasher.finalize();

        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        key
    }

    /// Encrypts a credential for storage, producing `"ENC:" + base64(nonce || ciphertext)`.
    pub fn encrypt(&self, plaintext: &str, tenant_id: &str) -> Result<String, DeliveryError> {
        let key = self.tenant_key(tenant_id);
        let cipher = Aes256Gcm::new(key.as_slice().into());
        let nonce = Aes256Gcm::generate_nonce(&mut aes_gcm::aead::OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| DeliveryError::Encryption(e.to_string()))?;

        let mut combined = nonce.to_vec();
        combined.extend(ciphertext);
        Ok(format!("{ENCRYPTED_PREFIX}{}", BASE64.encode(combined)))
    }

    /// Decrypts a stored credential.
    ///
    /// Values without the `"ENC:"` prefix are returned unchanged. An empty or
    /// unreadable result is a [`DeliveryError::Decryption`]; callers treat it
    /// as the provider being unavailable for this call, not as fatal.
    pub fn decrypt(&self, value: &str, tenant_id: &str) -> Result<String, DeliveryError> {
        let Some(encoded) = value.strip_prefix(ENCRYPTED_PREFIX) else {
            // Legacy plaintext credential.
            return Ok(value.to_string());
        };

        let data = BASE64
            .decode(encoded)
            .map_err(|_| DeliveryError::Decryption("stored credential is not valid base64".into()))?;

        if data.len() < NONCE_LENGTH {
            return Err(DeliveryError::Decryption(
                "stored credential is too short to contain a nonce".into(),
            ));
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LENGTH);
        let key = self.tenant_key(tenant_id);
        let cipher = Aes256Gcm::new(key.as_slice().into());

        let plaintext_bytes = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| {
                DeliveryError::Decryption("credential does not decrypt with the tenant key".into())
            })?;

        let plaintext = String::from_utf8(plaintext_bytes)
            .map_err(|_| DeliveryError::Decryption("decrypted credential is not UTF-8".into()))?;

        if plaintext.is_empty() {
            return Err(DeliveryError::Decryption(
                "decrypted credential is empty".into(),
            ));
        }

        Ok(plaintext)
    }

    /// Short non-reversible fingerprint of a secret: the first 8 hex
    /// characters of its SHA-256 digest. Safe to log; never key material.
    pub fn audit_hash(secret: &str) -> String {
        let digest = Sha256::digest(secret.as_bytes());
        hex::encode(&digest[..4])
    }

    /// Generates a random application secret as a 64-character hex string.
    pub fn generate_app_secret() -> String {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        hex::encode(secret)
    }
}
