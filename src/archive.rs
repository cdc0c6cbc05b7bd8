//! Archive Module
//!
//! User-facing container of named arrays.
//!
//! ## Responsibilities
//! - Load and persist the container file
//! - Route put/get through the marshal engine
//! - Serialize writes so overwrite (delete + create) is atomic per name
//!
//! ## Lifecycle
//! ```text
//! create/open ──► put/get/delete ... ──► flush ──► ... ──► close
//!      │                                                      │
//!      └── loads container (ReadWrite)        writes container┘
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::config::{Config, OpenMode};
use crate::error::{MarshalError, Result};
use crate::marshal::{Marshaler, Unmarshaler};
use crate::store::container::{read_container, write_container};
use crate::store::{ArrayStore, MemoryStore};
use crate::types::TypeDescriptor;
use crate::value::{Marshal, Unmarshal};

/// A container of named arrays
///
/// Reads run concurrently; writes (put/delete/flush) are serialized by
/// `write_lock`.
pub struct Archive {
    /// None for an in-memory archive
    config: Option<Config>,

    store: MemoryStore,

    /// Set by every write, cleared by flush
    dirty: AtomicBool,

    write_lock: Mutex<()>,
}

impl Archive {
    /// Create a new, empty container at `path`
    ///
    /// The file is written on the first flush or on close.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(
            Config::builder()
                .path(path.as_ref())
                .mode(OpenMode::Create)
                .build(),
        )
    }

    /// Open an existing container at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(Config::builder().path(path.as_ref()).build())
    }

    /// Open or create a container as described by `config`
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;

        let (store, dirty) = match config.mode {
            OpenMode::ReadWrite => {
                let arrays = read_container(&config.path, config.verify_checksum)?;
                (MemoryStore::from_arrays(arrays), false)
            }
            OpenMode::Create => (MemoryStore::new(), true),
        };

        tracing::info!(
            path = %config.path.display(),
            mode = ?config.mode,
            arrays = store.len(),
            "opened archive"
        );

        Ok(Self {
            config: Some(config),
            store,
            dirty: AtomicBool::new(dirty),
            write_lock: Mutex::new(()),
        })
    }

    /// An archive with no backing file
    pub fn in_memory() -> Self {
        Self {
            config: None,
            store: MemoryStore::new(),
            dirty: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        }
    }

    // =========================================================================
    // Arrays
    // =========================================================================

    /// Store `value` under `name`, replacing any existing array
    pub fn put<T: Marshal + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        self.put_with_dims(name, value, &[])
    }

    /// Store a sequence under `name` with explicit native-order dimensions
    pub fn put_with_dims<T: Marshal + ?Sized>(
        &self,
        name: &str,
        value: &T,
        dims: &[usize],
    ) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        Marshaler::new(&self.store).put(name, value, dims)?;
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Load the array `name` into `destination`
    pub fn get<T: Unmarshal + ?Sized>(&self, name: &str, destination: &mut T) -> Result<()> {
        Unmarshaler::new(&self.store).get(name, destination)
    }

    /// Stored type of `name`
    pub fn describe(&self, name: &str) -> Result<TypeDescriptor> {
        self.store
            .descriptor(name)
            .ok_or_else(|| MarshalError::store("open array", format!("array not found: '{}'", name)))
    }

    /// Dimensions of an array-typed value, in native order
    pub fn dimensions(&self, name: &str) -> Result<Vec<usize>> {
        let ty = self.describe(name)?;
        ty.native_dims().ok_or_else(|| MarshalError::TypeMismatch {
            field: name.to_string(),
            expected: "array".to_string(),
            found: ty.to_string(),
        })
    }

    /// Remove the array `name`
    pub fn delete(&self, name: &str) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.store.delete_array(name)?;
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.store.descriptor(name).is_some()
    }

    /// Names of all arrays, sorted
    pub fn names(&self) -> Vec<String> {
        self.store.names()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// The backing store (handle diagnostics)
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Container file path; None for an in-memory archive
    pub fn path(&self) -> Option<&Path> {
        self.config.as_ref().map(|c| c.path.as_path())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write the container file if anything changed since the last flush
    pub fn flush(&self) -> Result<()> {
        let Some(config) = &self.config else {
            return Ok(());
        };

        let _write_guard = self.write_lock.lock();
        if !self.dirty.load(Ordering::SeqCst) {
            return Ok(());
        }

        let arrays = self.store.snapshot();
        write_container(&config.path, &arrays, config.sync_on_close)?;
        self.dirty.store(false, Ordering::SeqCst);

        tracing::debug!(path = %config.path.display(), arrays = arrays.len(), "flushed archive");
        Ok(())
    }

    /// Flush and release the archive
    pub fn close(self) -> Result<()> {
        self.flush()?;
        if let Some(config) = &self.config {
            tracing::info!(path = %config.path.display(), "closed archive");
        }
        Ok(())
    }
}

impl Drop for Archive {
    fn drop(&mut self) {
        if self.dirty.load(Ordering::SeqCst) {
            if let Err(e) = self.flush() {
                tracing::warn!(error = %e, "failed to flush archive on drop");
            }
        }
    }
}
