// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AES-GCM encryption of individual confidential fields.
//!
//! Each call to [`FieldCipher::encrypt`] draws a fresh 96-bit nonce from the
//! system CSPRNG. The tag is kept apart from the ciphertext so the row store
//! holds `{ciphertext, nonce, tag}` per field.
//!
//! Decryption never fails loudly: any tag mismatch, malformed nonce/tag or
//! unparsable plaintext yields [`FieldValue::IntegrityFail`] for that field.

use std::str::FromStr;

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_128_GCM, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};

use crate::config::AEAD_KEY_ENV;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{EncryptedField, FieldValue};

/// GCM authentication tag length.
pub const TAG_LEN: usize = 16;

pub struct FieldCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl FieldCipher {
    /// Create a cipher from a 16-byte (AES-128) or 32-byte (AES-256) key.
    pub fn new(key: &[u8]) -> GatewayResult<Self> {
        let algorithm = match key.len() {
            16 => &AES_128_GCM,
            32 => &AES_256_GCM,
            n => {
                return Err(GatewayError::InvalidKeyMaterial {
                    var: AEAD_KEY_ENV,
                    reason: format!("expected 16 or 32 bytes, got {n}"),
                })
            }
        };
        let unbound = UnboundKey::new(algorithm, key).map_err(|_| {
            GatewayError::InvalidKeyMaterial {
                var: AEAD_KEY_ENV,
                reason: "rejected by cipher".to_string(),
            }
        })?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt the textual form of a scalar value.
    pub fn encrypt(&self, plaintext: &str) -> GatewayResult<EncryptedField> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| GatewayError::Crypto("system random generator failed".to_string()))?;

        let mut in_out = plaintext.as_bytes().to_vec();
        let tag = self
            .key
            .seal_in_place_separate_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| GatewayError::Crypto("field encryption failed".to_string()))?;

        Ok(EncryptedField {
            ciphertext: in_out,
            nonce: nonce_bytes.to_vec(),
            tag: tag.as_ref().to_vec(),
        })
    }

    /// Verify and decrypt a field, parsing the plaintext as `T`.
    pub fn decrypt<T: FromStr>(&self, field: &EncryptedField) -> FieldValue<T> {
        match self.open(field).and_then(|text| text.parse::<T>().ok()) {
            Some(value) => FieldValue::Value(value),
            None => FieldValue::IntegrityFail,
        }
    }

    fn open(&self, field: &EncryptedField) -> Option<String> {
        if field.tag.len() != TAG_LEN {
            return None;
        }
        let nonce = Nonce::try_assume_unique_for_key(&field.nonce).ok()?;

        let mut in_out = Vec::with_capacity(field.ciphertext.len() + TAG_LEN);
        in_out.extend_from_slice(&field.ciphertext);
        in_out.extend_from_slice(&field.tag);

        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .ok()?;
        String::from_utf8(plaintext.to_vec()).ok()
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher")
            .field("algorithm", self.key.algorithm())
            .finish_non_exhaustive()
    }
}
