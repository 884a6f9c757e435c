//! Per-volume operation locks.
//!
//! [`VolumeLocks`] is a non-blocking exclusivity gate: stage, unstage,
//! publish, unpublish and expand handlers call [`VolumeLocks::try_acquire`]
//! on entry and [`VolumeLocks::release`] on exit so that two overlapping
//! operations on the same volume id can never race on device or mount state.
//! A caller that fails to acquire is expected to surface a conflict (see
//! [`CsiError::in_progress`]) rather than wait.
//!
//! Each node backend (block, file storage, Lustre) owns its own instance,
//! since their volume id spaces are independent.

use std::collections::HashSet;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::CsiError;
use crate::types::VolumeId;

/// Set of volume ids currently checked out by an in-flight operation.
///
/// # Thread safety
///
/// Every read and write of the set happens under a single mutex, so
/// acquire/release are linearizable per id and operations on distinct ids
/// never interfere.
#[derive(Debug, Default)]
pub struct VolumeLocks {
    locks: Mutex<HashSet<VolumeId>>,
}

impl VolumeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `volume_id` as held.
    ///
    /// Returns `false` if it is already held, including by the calling
    /// operation itself: re-entrant acquisition is not supported.
    pub fn try_acquire(&self, volume_id: &VolumeId) -> bool {
        let mut locks = self.locks.lock();
        if locks.contains(volume_id) {
            debug!(%volume_id, "volume operation lock already held");
            return false;
        }
        locks.insert(volume_id.clone());
        true
    }

    /// Remove `volume_id` from the held set.  Releasing an id that is not
    /// held is a no-op.
    pub fn release(&self, volume_id: &VolumeId) {
        self.locks.lock().remove(volume_id);
    }

    /// Like [`Self::try_acquire`], but hands back a guard that releases the
    /// id when dropped, so early returns and cancelled futures cannot leak a
    /// held id.
    pub fn try_lock(&self, volume_id: &VolumeId) -> Option<VolumeLockGuard<'_>> {
        self.try_acquire(volume_id).then(|| VolumeLockGuard {
            locks: self,
            volume_id: volume_id.clone(),
        })
    }

    /// Acquire a guard or fail with [`CsiError::Aborted`].
    pub fn lock_or_abort(&self, volume_id: &VolumeId) -> Result<VolumeLockGuard<'_>, CsiError> {
        self.try_lock(volume_id)
            .ok_or_else(|| CsiError::in_progress(volume_id))
    }

    /// Whether `volume_id` is currently held.
    pub fn is_held(&self, volume_id: &VolumeId) -> bool {
        self.locks.lock().contains(volume_id)
    }

    /// Number of ids currently held.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

/// Held operation lock for one volume id.  Released on drop.
#[derive(Debug)]
#[must_use = "the volume lock is released as soon as the guard is dropped"]
pub struct VolumeLockGuard<'a> {
    locks: &'a VolumeLocks,
    volume_id: VolumeId,
}

impl VolumeLockGuard<'_> {
    pub fn volume_id(&self) -> &VolumeId {
        &self.volume_id
    }
}

impl Drop for VolumeLockGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.volume_id);
    }
}
