// src/keystore.rs

//! Keystore directory bound to scrypt cost parameters.

use crate::errors::{ClientError, Result};
use crate::{LIGHT_SCRYPT_N, LIGHT_SCRYPT_P, STANDARD_SCRYPT_N, STANDARD_SCRYPT_P};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Scrypt cost parameters used to encrypt key files
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScryptParams {
    /// CPU/memory cost
    pub n: u32,

    /// Parallelization
    pub p: u32,
}

impl ScryptParams {
    /// Parameters tuned for low resource devices
    pub const fn light() -> Self {
        Self {
            n: LIGHT_SCRYPT_N,
            p: LIGHT_SCRYPT_P,
        }
    }

    /// Full strength parameters
    pub const fn standard() -> Self {
        Self {
            n: STANDARD_SCRYPT_N,
            p: STANDARD_SCRYPT_P,
        }
    }
}

/// Keystore
///
/// Held by the node bridge for the lifetime of the node it was created with.
#[derive(Debug)]
pub struct KeyStore {
    /// Directory holding encrypted key files
    directory: PathBuf,

    /// Cost parameters for new keys
    scrypt: ScryptParams,
}

impl KeyStore {
    /// Opens a keystore, creating its directory if needed
    ///
    /// # Arguments
    /// * `directory` - Directory holding key files
    /// * `scrypt` - Cost parameters for new keys
    pub fn new<P: AsRef<Path>>(directory: P, scrypt: ScryptParams) -> Result<Self> {
        if scrypt.n < 2 || !scrypt.n.is_power_of_two() {
            return Err(ClientError::KeystoreError(format!(
                "scrypt N must be a power of two, got {}",
                scrypt.n
            )));
        }

        let directory = directory.as_ref().to_path_buf();
        Self::ensure_directory(&directory)?;

        Ok(Self { directory, scrypt })
    }

    /// Keystore directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Scrypt parameters
    pub fn scrypt(&self) -> ScryptParams {
        self.scrypt
    }

    /// Lists key files currently in the keystore
    pub fn key_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Creates the keystore directory if it doesn't exist
    pub fn ensure_directory<P: AsRef<Path>>(path: P) -> Result<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_keystore_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested").join("keystore");

        let keystore = KeyStore::new(&dir, ScryptParams::light()).unwrap();
        assert!(dir.is_dir());
        assert_eq!(keystore.directory(), dir.as_path());
        assert_eq!(keystore.scrypt(), ScryptParams::light());
    }

    #[test]
    fn test_key_files() {
        let temp_dir = TempDir::new().unwrap();
        let keystore = KeyStore::new(temp_dir.path(), ScryptParams::light()).unwrap();
        assert!(keystore.key_files().unwrap().is_empty());

        fs::write(temp_dir.path().join("UTC--key"), "{}").unwrap();
        assert_eq!(keystore.key_files().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_bad_scrypt_n() {
        let temp_dir = TempDir::new().unwrap();
        let result = KeyStore::new(temp_dir.path(), ScryptParams { n: 1000, p: 1 });
        assert!(matches!(result, Err(ClientError::KeystoreError(_))));
    }
}
