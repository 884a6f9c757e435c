//! Node backends hosted by one node driver process.
//!
//! Each [`NodeBackend`] pairs a backend's options with the
//! [`VolumeLocks`] its RPC handlers share.  Volume id spaces of the block,
//! file storage and Lustre backends are independent, so every backend owns
//! its own lock set and hands out references to it.

use std::sync::Arc;

use tracing::info;

use crate::config::{DriverKind, NodeDriverEnv, NodeOptions};
use crate::error::CsiError;
use crate::lock::{VolumeLockGuard, VolumeLocks};
use crate::types::VolumeId;

/// One node backend and its operation locks.
#[derive(Debug)]
pub struct NodeBackend {
    kind: DriverKind,
    options: NodeOptions,
    locks: VolumeLocks,
}

impl NodeBackend {
    pub fn new(kind: DriverKind, options: NodeOptions) -> Self {
        Self {
            kind,
            options,
            locks: VolumeLocks::new(),
        }
    }

    pub fn kind(&self) -> DriverKind {
        self.kind
    }

    pub fn options(&self) -> &NodeOptions {
        &self.options
    }

    /// The lock set shared by this backend's mutating handlers.
    pub fn locks(&self) -> &VolumeLocks {
        &self.locks
    }

    /// Enter a mutating operation on `volume_id`, failing with
    /// [`CsiError::Aborted`] if one is already running.
    pub fn begin_operation(&self, volume_id: &VolumeId) -> Result<VolumeLockGuard<'_>, CsiError> {
        self.locks.lock_or_abort(volume_id)
    }
}

/// Build the backends to run on `node_id`.
///
/// The block volume backend always runs; file storage runs when
/// `fss_enabled` is set and Lustre when the environment enables it.
pub fn enabled_backends(
    node_id: &str,
    fss_enabled: bool,
    env: &NodeDriverEnv,
) -> Vec<Arc<NodeBackend>> {
    let mut kinds = vec![DriverKind::BlockVolume];
    if fss_enabled {
        kinds.push(DriverKind::FileStorage);
    }
    if env.lustre_driver_enabled {
        kinds.push(DriverKind::Lustre);
    }

    kinds
        .into_iter()
        .map(|kind| {
            let options = NodeOptions::for_driver(kind, node_id);
            info!(
                backend = kind.name(),
                driver = %options.driver_name,
                endpoint = %options.endpoint,
                "configured node backend"
            );
            Arc::new(NodeBackend::new(kind, options))
        })
        .collect()
}
