//! Versioned, lock-protected values shared between the UI and pipeline threads.
//!
//! Writers replace the whole value under a write lock; readers take an `Arc`
//! snapshot, so a pipeline tick always sees one consistent version no matter
//! what the UI changes meanwhile.

use parking_lot::RwLock;
use std::ops::Deref;
use std::sync::Arc;

struct Slot<T> {
    version: u64,
    value: Arc<T>,
}

/// Shared value with a monotonically increasing version
pub struct Versioned<T> {
    slot: Arc<RwLock<Slot<T>>>,
}

/// Immutable view of a [`Versioned`] value at one version
#[derive(Debug)]
pub struct Snapshot<T> {
    version: u64,
    value: Arc<T>,
}

impl<T> Versioned<T> {
    /// Wrap an initial value at version 0
    pub fn new(value: T) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Slot {
                version: 0,
                value: Arc::new(value),
            })),
        }
    }

    /// Current value and version
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<T> {
        let slot = self.slot.read();
        Snapshot {
            version: slot.version,
            value: Arc::clone(&slot.value),
        }
    }

    /// Current version number
    #[must_use]
    pub fn version(&self) -> u64 {
        self.slot.read().version
    }

    /// Replace the value, returning the new version
    pub fn replace(&self, value: T) -> u64 {
        let mut slot = self.slot.write();
        slot.value = Arc::new(value);
        slot.version += 1;
        slot.version
    }
}

impl<T: Clone> Versioned<T> {
    /// Modify the value in place through the single write path
    ///
    /// Snapshots already handed out keep the old value.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut slot = self.slot.write();
        let result = f(Arc::make_mut(&mut slot.value));
        slot.version += 1;
        result
    }
}

impl<T> Clone for Versioned<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Default> Default for Versioned<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Versioned<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("Versioned")
            .field("version", &snapshot.version)
            .field("value", &*snapshot.value)
            .finish()
    }
}

impl<T> Snapshot<T> {
    /// Version this snapshot was taken at
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Shared handle to the value
    #[must_use]
    pub fn value(&self) -> Arc<T> {
        Arc::clone(&self.value)
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}
