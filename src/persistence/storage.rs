//! Storage and lock collaborators.

use super::{LockError, StorageError, StoredSnapshot};
use crate::engine::BoxError;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Where an instance's snapshot lives between calls.
///
/// Implementations report failures as plain boxed errors; [`CheckedStorage`]
/// classifies them.
pub trait Storage {
    /// The stored snapshot, or `None` for an instance never persisted.
    fn get_data(&self) -> Result<Option<StoredSnapshot>, BoxError>;

    fn set_data(&self, data: &StoredSnapshot) -> Result<(), BoxError>;

    fn remove_data(&self) -> Result<(), BoxError>;
}

impl<T: Storage + ?Sized> Storage for &T {
    fn get_data(&self) -> Result<Option<StoredSnapshot>, BoxError> {
        (**self).get_data()
    }

    fn set_data(&self, data: &StoredSnapshot) -> Result<(), BoxError> {
        (**self).set_data(data)
    }

    fn remove_data(&self) -> Result<(), BoxError> {
        (**self).remove_data()
    }
}

/// Releases a lock taken by [`Lock::lock`].
pub type Unlock = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

/// Serializes calls against one instance.
pub trait Lock {
    fn lock(&self) -> Result<Unlock, BoxError>;
}

impl<T: Lock + ?Sized> Lock for &T {
    fn lock(&self) -> Result<Unlock, BoxError> {
        (**self).lock()
    }
}

/// Storage whose failures come back as [`StorageError`].
#[derive(Debug)]
pub struct CheckedStorage<S> {
    inner: S,
}

impl<S: Storage> CheckedStorage<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn get(&self) -> Result<Option<StoredSnapshot>, StorageError> {
        self.inner
            .get_data()
            .map_err(|source| StorageError::Read { source })
    }

    pub fn set(&self, data: &StoredSnapshot) -> Result<(), StorageError> {
        self.inner
            .set_data(data)
            .map_err(|source| StorageError::Write { source })
    }

    pub fn remove(&self) -> Result<(), StorageError> {
        self.inner
            .remove_data()
            .map_err(|source| StorageError::Remove { source })
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

/// Lock whose failures come back as [`LockError`].
#[derive(Debug)]
pub struct CheckedLock<L> {
    inner: L,
}

impl<L: Lock> CheckedLock<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }

    pub fn lock(&self) -> Result<CheckedUnlock, LockError> {
        self.inner
            .lock()
            .map(CheckedUnlock)
            .map_err(|source| LockError::Lock { source })
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

/// A held lock. Dropping it without calling [`unlock`](Self::unlock) leaves
/// the lock held.
pub struct CheckedUnlock(Unlock);

impl CheckedUnlock {
    pub fn unlock(self) -> Result<(), LockError> {
        (self.0)().map_err(|source| LockError::Unlock { source })
    }
}

impl fmt::Debug for CheckedUnlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CheckedUnlock")
    }
}

/// Run `op`; if it fails, run `recover` and return the original failure.
///
/// A failing `recover` is logged and otherwise ignored.
pub fn run_or_recover<T, E, R>(
    op: impl FnOnce() -> Result<T, E>,
    recover: impl FnOnce() -> Result<(), R>,
) -> Result<T, E>
where
    R: fmt::Display,
{
    op().map_err(|error| {
        if let Err(failure) = recover() {
            warn!(error = %failure, "recovery after a failed operation failed too");
        }
        error
    })
}

/// Storage holding one snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<Option<StoredSnapshot>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: StoredSnapshot) -> Self {
        Self {
            data: Mutex::new(Some(data)),
        }
    }
}

impl Storage for MemoryStorage {
    fn get_data(&self) -> Result<Option<StoredSnapshot>, BoxError> {
        let data = self.data.lock().map_err(|_| "storage mutex poisoned")?;
        Ok(data.clone())
    }

    fn set_data(&self, data: &StoredSnapshot) -> Result<(), BoxError> {
        let mut stored = self.data.lock().map_err(|_| "storage mutex poisoned")?;
        *stored = Some(data.clone());
        Ok(())
    }

    fn remove_data(&self) -> Result<(), BoxError> {
        let mut stored = self.data.lock().map_err(|_| "storage mutex poisoned")?;
        *stored = None;
        Ok(())
    }
}

/// Non-blocking in-process lock; locking while held fails.
#[derive(Clone, Debug, Default)]
pub struct MemoryLock {
    held: Arc<Mutex<bool>>,
}

impl MemoryLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.held.lock().map(|held| *held).unwrap_or(true)
    }
}

impl Lock for MemoryLock {
    fn lock(&self) -> Result<Unlock, BoxError> {
        let mut held = self.held.lock().map_err(|_| "lock mutex poisoned")?;
        if *held {
            return Err("already locked".into());
        }
        *held = true;

        let shared = Arc::clone(&self.held);
        Ok(Box::new(move || -> Result<(), BoxError> {
            let mut held = shared.lock().map_err(|_| "lock mutex poisoned")?;
            *held = false;
            Ok(())
        }))
    }
}
