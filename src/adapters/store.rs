//! Key/value storage adapters.
//!
//! Implements [`StoragePort`] twice:
//!
//! - [`MemStore`]: in-memory map, for tests and short bench runs.
//! - [`DirStore`]: one file per key under `<root>/<namespace>/<key>`.
//!   Writes go to a temporary file first and are renamed into place, so
//!   a crash never leaves a half-written value behind.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::StoragePort;
use crate::error::StorageError;

fn valid_segment(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 32
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn check_key(namespace: &str, key: &str) -> Result<(), StorageError> {
    if valid_segment(namespace) && valid_segment(key) {
        Ok(())
    } else {
        Err(StorageError::InvalidKey)
    }
}

// ── In-memory ────────────────────────────────────────────────

#[derive(Default)]
pub struct MemStore {
    store: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }
}

impl StoragePort for MemStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        check_key(namespace, key)?;
        let store = self.store.borrow();
        let data = store
            .get(&Self::composite_key(namespace, key))
            .ok_or(StorageError::NotFound)?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        check_key(namespace, key)?;
        self.store
            .borrow_mut()
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        check_key(namespace, key)?;
        self.store
            .borrow_mut()
            .remove(&Self::composite_key(namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store
            .borrow()
            .contains_key(&Self::composite_key(namespace, key))
    }
}

// ── Directory-backed ─────────────────────────────────────────

pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            warn!("DirStore: cannot create {}: {}", root.display(), e);
            StorageError::IoError
        })?;
        info!("DirStore: using {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, namespace: &str, key: &str) -> PathBuf {
        self.root.join(namespace).join(key)
    }
}

impl StoragePort for DirStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        check_key(namespace, key)?;
        let data = fs::read(self.path(namespace, key)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound,
            _ => StorageError::IoError,
        })?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        check_key(namespace, key)?;
        let dir = self.root.join(namespace);
        fs::create_dir_all(&dir).map_err(|_| StorageError::IoError)?;
        let tmp = dir.join(format!(".{key}.tmp"));
        fs::write(&tmp, data).map_err(|e| match e.kind() {
            ErrorKind::StorageFull => StorageError::Full,
            _ => StorageError::IoError,
        })?;
        fs::rename(&tmp, dir.join(key)).map_err(|_| StorageError::IoError)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        check_key(namespace, key)?;
        match fs::remove_file(self.path(namespace, key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(_) => Err(StorageError::IoError),
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        check_key(namespace, key).is_ok() && self.path(namespace, key).is_file()
    }
}
