#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use crate::store::{CertStore, StorageError};

/// Thread-shareable handle over one `CertStore`. Each `with_store` call holds the
/// lock for its whole closure, so a transaction run inside it is serialized
/// against every other writer.
#[derive(Debug, Clone, Default)]
pub struct SharedCertStore {
    inner: Arc<Mutex<CertStore>>,
}

impl SharedCertStore {
    pub fn new(store: CertStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, CertStore>, StorageError> {
        self.inner.lock().map_err(|_| StorageError::Unavailable {
            details: "cert store lock poisoned".to_string(),
        })
    }

    pub fn with_store<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut CertStore) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut guard = self.lock_inner()?;
        f(&mut guard)
    }
}
