// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at process start and
//! passed by reference into the gateway. Core logic never looks up the
//! environment itself.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `RECORDS_DATA_DIR` | Root for the row database, trust anchor and audit log | `./data` |
//! | `RECORDS_AEAD_KEY_B64` | Base64 field-encryption key (16 or 32 bytes) | Required |
//! | `RECORDS_HMAC_KEY_B64` | Base64 row-signing key (non-empty) | Required |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use base64ct::{Base64, Encoding};

use crate::error::{GatewayError, GatewayResult};
use crate::storage::StoragePaths;

/// Environment variable name for the data directory.
pub const DATA_DIR_ENV: &str = "RECORDS_DATA_DIR";

/// Environment variable holding the base64 AEAD key.
pub const AEAD_KEY_ENV: &str = "RECORDS_AEAD_KEY_B64";

/// Environment variable holding the base64 HMAC key.
pub const HMAC_KEY_ENV: &str = "RECORDS_HMAC_KEY_B64";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Data directory used when `RECORDS_DATA_DIR` is unset.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Accepted AEAD key lengths (AES-128-GCM, AES-256-GCM).
pub const AEAD_KEY_LENGTHS: [usize; 2] = [16, 32];

/// Secret key material, immutable for the lifetime of the process.
///
/// `Debug` never prints key bytes.
#[derive(Clone)]
pub struct KeyMaterial {
    aead_key: Vec<u8>,
    hmac_key: Vec<u8>,
}

impl KeyMaterial {
    /// Build key material from raw bytes, validating lengths.
    pub fn new(aead_key: Vec<u8>, hmac_key: Vec<u8>) -> GatewayResult<Self> {
        if !AEAD_KEY_LENGTHS.contains(&aead_key.len()) {
            return Err(GatewayError::InvalidKeyMaterial {
                var: AEAD_KEY_ENV,
                reason: format!(
                    "expected 16 or 32 bytes, got {}",
                    aead_key.len()
                ),
            });
        }
        if hmac_key.is_empty() {
            return Err(GatewayError::InvalidKeyMaterial {
                var: HMAC_KEY_ENV,
                reason: "key is empty".to_string(),
            });
        }
        Ok(Self { aead_key, hmac_key })
    }

    /// Load both keys through `lookup` (normally the process environment).
    pub fn from_lookup<F>(lookup: F) -> GatewayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let aead_key = decode_key(&lookup, AEAD_KEY_ENV)?;
        let hmac_key = decode_key(&lookup, HMAC_KEY_ENV)?;
        Self::new(aead_key, hmac_key)
    }

    pub fn aead_key(&self) -> &[u8] {
        &self.aead_key
    }

    pub fn hmac_key(&self) -> &[u8] {
        &self.hmac_key
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("aead_key", &format_args!("<{} bytes redacted>", self.aead_key.len()))
            .field("hmac_key", &format_args!("<{} bytes redacted>", self.hmac_key.len()))
            .finish()
    }
}

/// Log output format for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    pub fn from_lookup<F>(lookup: F) -> GatewayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match env_optional(&lookup, LOG_FORMAT_ENV).as_deref() {
            None => Ok(LogFormat::default()),
            Some(v) if v.eq_ignore_ascii_case("json") => Ok(LogFormat::Json),
            Some(v) if v.eq_ignore_ascii_case("pretty") => Ok(LogFormat::Pretty),
            Some(other) => Err(GatewayError::InvalidConfig {
                var: LOG_FORMAT_ENV,
                reason: format!("unknown format '{other}', expected json or pretty"),
            }),
        }
    }
}

/// Complete gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub paths: StoragePaths,
    pub keys: KeyMaterial,
}

impl GatewayConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> GatewayResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> GatewayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir =
            env_optional(&lookup, DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let keys = KeyMaterial::from_lookup(&lookup)?;
        Ok(Self {
            paths: StoragePaths::new(data_dir),
            keys,
        })
    }
}

fn env_optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn decode_key<F>(lookup: &F, var: &'static str) -> GatewayResult<Vec<u8>>
where
    F: Fn(&str) -> Option<String>,
{
    let encoded =
        env_optional(lookup, var).ok_or(GatewayError::KeyMaterialMissing { var })?;
    Base64::decode_vec(&encoded).map_err(|e| GatewayError::InvalidKeyMaterial {
        var,
        reason: format!("not valid base64: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn loads_keys_and_default_data_dir() {
        let lookup = lookup_from(&[
            (AEAD_KEY_ENV, STANDARD.encode([7u8; 32])),
            (HMAC_KEY_ENV, STANDARD.encode([9u8; 32])),
        ]);
        let config = GatewayConfig::from_lookup(lookup).unwrap();
        assert_eq!(config.keys.aead_key(), &[7u8; 32]);
        assert_eq!(config.keys.hmac_key(), &[9u8; 32]);
        assert_eq!(config.paths.root(), std::path::Path::new(DEFAULT_DATA_DIR));
    }

    #[test]
    fn missing_aead_key_is_distinguishable() {
        let lookup = lookup_from(&[(HMAC_KEY_ENV, STANDARD.encode([9u8; 32]))]);
        let err = GatewayConfig::from_lookup(lookup).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::KeyMaterialMissing { var: AEAD_KEY_ENV }
        ));
    }

    #[test]
    fn blank_hmac_key_counts_as_missing() {
        let lookup = lookup_from(&[
            (AEAD_KEY_ENV, STANDARD.encode([7u8; 32])),
            (HMAC_KEY_ENV, "   ".to_string()),
        ]);
        let err = KeyMaterial::from_lookup(lookup).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::KeyMaterialMissing { var: HMAC_KEY_ENV }
        ));
    }

    #[test]
    fn wrong_aead_length_is_rejected() {
        let err = KeyMaterial::new(vec![1u8; 20], vec![2u8; 32]).unwrap_err();
        assert_eq!(err.error_code(), "invalid_key_material");
        assert!(KeyMaterial::new(vec![1u8; 16], vec![2u8; 32]).is_ok());
    }

    #[test]
    fn undecodable_key_is_invalid() {
        let lookup = lookup_from(&[
            (AEAD_KEY_ENV, "not*base64!".to_string()),
            (HMAC_KEY_ENV, STANDARD.encode([9u8; 32])),
        ]);
        let err = KeyMaterial::from_lookup(lookup).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::InvalidKeyMaterial { var: AEAD_KEY_ENV, .. }
        ));
    }

    #[test]
    fn debug_output_hides_key_bytes() {
        let keys = KeyMaterial::new(vec![0xAB; 32], vec![0xCD; 32]).unwrap();
        let rendered = format!("{keys:?}");
        assert!(rendered.contains("redacted"));
        assert!(!rendered.contains("171")); // 0xAB
        assert!(!rendered.to_lowercase().contains("ab, ab"));
    }

    #[test]
    fn log_format_parsing() {
        assert_eq!(
            LogFormat::from_lookup(|_| None).unwrap(),
            LogFormat::Pretty
        );
        assert_eq!(
            LogFormat::from_lookup(|_| Some("JSON".to_string())).unwrap(),
            LogFormat::Json
        );
        assert!(LogFormat::from_lookup(|_| Some("xml".to_string())).is_err());
    }
}
