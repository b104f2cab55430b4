// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Trust anchor: the last dataset root the client accepts as complete.
//!
//! The anchor is held outside the row store so that whoever controls the
//! store cannot silently move it. It is a single value with
//! last-writer-wins semantics; concurrent refreshes are not coordinated.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::models::Digest;

#[derive(Debug, thiserror::Error)]
pub enum AnchorError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("trust anchor at {path} is {len} bytes, expected 32")]
    Malformed { path: PathBuf, len: usize },
}

/// Load/save over one trusted root.
pub trait TrustAnchorStore {
    /// The stored root, or `None` if no anchor was ever saved.
    fn load(&self) -> Result<Option<Digest>, AnchorError>;

    /// Replace the stored root.
    fn save(&self, root: &Digest) -> Result<(), AnchorError>;
}

/// Trust anchor kept as 32 raw bytes in a local file.
#[derive(Debug, Clone)]
pub struct FileAnchorStore {
    path: PathBuf,
}

impl FileAnchorStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> AnchorError {
        AnchorError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TrustAnchorStore for FileAnchorStore {
    fn load(&self) -> Result<Option<Digest>, AnchorError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let root: Digest = bytes.as_slice().try_into().map_err(|_| AnchorError::Malformed {
            path: self.path.clone(),
            len: bytes.len(),
        })?;
        Ok(Some(root))
    }

    fn save(&self, root: &Digest) -> Result<(), AnchorError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path).map_err(|e| self.io_error(e))?;
            file.write_all(root).map_err(|e| self.io_error(e))?;
            file.sync_all().map_err(|e| self.io_error(e))?;
        }
        fs::rename(&temp_path, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }
}
