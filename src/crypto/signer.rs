// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Row signatures and Merkle leaves.
//!
//! `signature = HMAC-SHA256(key, canonical)`, `leaf = SHA-256(signature)`.

use hmac::{Hmac, Mac};
use sha2::{Digest as _, Sha256};

use crate::config::HMAC_KEY_ENV;
use crate::error::{GatewayError, GatewayResult};
use crate::models::Digest;

type HmacSha256 = Hmac<Sha256>;

/// Keyed row signer. The key is absorbed at construction and cloned per use.
#[derive(Clone)]
pub struct RowSigner {
    mac: HmacSha256,
}

impl RowSigner {
    pub fn new(key: &[u8]) -> GatewayResult<Self> {
        if key.is_empty() {
            return Err(GatewayError::InvalidKeyMaterial {
                var: HMAC_KEY_ENV,
                reason: "key is empty".to_string(),
            });
        }
        let mac = HmacSha256::new_from_slice(key).map_err(|e| GatewayError::InvalidKeyMaterial {
            var: HMAC_KEY_ENV,
            reason: e.to_string(),
        })?;
        Ok(Self { mac })
    }

    /// Compute the tag over canonical row bytes.
    pub fn sign(&self, canonical: &[u8]) -> Digest {
        let mut mac = self.mac.clone();
        mac.update(canonical);
        mac.finalize().into_bytes().into()
    }

    /// Re-derive the tag and compare in constant time.
    pub fn verify(&self, canonical: &[u8], stored: &[u8]) -> bool {
        let mut mac = self.mac.clone();
        mac.update(canonical);
        mac.verify_slice(stored).is_ok()
    }
}

impl std::fmt::Debug for RowSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RowSigner { .. }")
    }
}

/// SHA-256 of arbitrary bytes.
pub fn sha256(data: &[u8]) -> Digest {
    Sha256::digest(data).into()
}

/// Merkle leaf for a row signature.
pub fn leaf_hash(signature: &Digest) -> Digest {
    sha256(signature)
}
