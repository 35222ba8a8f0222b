//! File-based keystore with encryption at rest
//!
//! One sealed file per alias: `<base_path>/<alias>.key.enc`.

use super::{sealed, validate_alias, Keystore, KeystoreError};
use crate::core_identity::keypair::Keypair;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const KEY_FILE_SUFFIX: &str = ".key.enc";

/// File-based encrypted keystore
pub struct FileKeystore {
    /// Directory where keys are stored
    base_path: PathBuf,
}

impl FileKeystore {
    /// Open (creating if needed) a keystore directory
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, KeystoreError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(FileKeystore { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, alias: &str) -> PathBuf {
        self.base_path.join(format!("{}{}", alias, KEY_FILE_SUFFIX))
    }

    /// Write file atomically (write to temp, then rename)
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), KeystoreError> {
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, data)?;
        fs::rename(temp_path, path)?;
        Ok(())
    }
}

impl Keystore for FileKeystore {
    fn save_keypair(
        &self,
        alias: &str,
        keypair: &Keypair,
        password: &str,
    ) -> Result<(), KeystoreError> {
        validate_alias(alias)?;
        let serialized = keypair
            .serialize()
            .map_err(|e| KeystoreError::Serialization(e.to_string()))?;
        let blob = sealed::seal(&serialized, password)?;

        let path = self.key_path(alias);
        self.write_atomic(&path, &blob)?;
        debug!(alias, path = %path.display(), "Keypair sealed to disk");
        Ok(())
    }

    fn load_keypair(&self, alias: &str, password: &str) -> Result<Keypair, KeystoreError> {
        validate_alias(alias)?;
        let path = self.key_path(alias);
        if !path.exists() {
            return Err(KeystoreError::NotFound(alias.to_string()));
        }

        let blob = fs::read(&path)?;
        let plaintext = sealed::open(&blob, password)?;
        Keypair::deserialize(&plaintext).map_err(|e| KeystoreError::Serialization(e.to_string()))
    }

    fn contains(&self, alias: &str) -> Result<bool, KeystoreError> {
        validate_alias(alias)?;
        Ok(self.key_path(alias).exists())
    }

    fn delete(&self, alias: &str) -> Result<(), KeystoreError> {
        validate_alias(alias)?;
        let path = self.key_path(alias);
        if !path.exists() {
            return Err(KeystoreError::NotFound(alias.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    fn list_aliases(&self) -> Result<Vec<String>, KeystoreError> {
        let mut aliases = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let filename = entry.file_name();
            let filename_str = filename.to_string_lossy();

            if let Some(alias) = filename_str.strip_suffix(KEY_FILE_SUFFIX) {
                if validate_alias(alias).is_ok() {
                    aliases.push(alias.to_string());
                }
            }
        }

        aliases.sort();
        Ok(aliases)
    }
}
