//! # libcsi-node — node-side primitives for a CSI driver
//!
//! `libcsi-node` holds the pieces every node RPC path of a
//! [Container Storage Interface][csi] driver depends on, independent of the
//! transport that carries the RPCs.  Block, file-storage and Lustre node
//! backends use it to serialize operations per volume, negotiate volume
//! sizes, reason about IPv4/IPv6 addressing of iSCSI portals and mount
//! targets, and decode remote file-storage volume handles.  It follows the
//! RK8s conventions (`tracing` for observability, `thiserror` for
//! structured errors).
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Core data model: `VolumeId`, `CapacityRange`, `NodeIpFamily`, handles. |
//! | [`error`] | [`CsiError`] enum covering all failure modes. |
//! | [`lock`] | [`VolumeLocks`] — non-blocking per-volume operation gate. |
//! | [`capacity`] | Capacity range resolution and size policy. |
//! | [`address`] | IP family classification, iSCSI IPv6 synthesis, node families. |
//! | [`handle`] | `filesystemId:mountTarget:exportPath` handle parsing. |
//! | [`attributes`] | Volume context, node label and device path extraction. |
//! | [`config`] | Backend kinds, node options, log levels, env switches. |
//! | [`backend`] | [`NodeBackend`] — per-backend options and lock set. |
//! | [`logging`] | Tracing subscriber setup. |
//!
//! [csi]: https://github.com/container-storage-interface/spec

pub mod address;
pub mod attributes;
pub mod backend;
pub mod capacity;
pub mod config;
pub mod error;
pub mod handle;
pub mod lock;
pub mod logging;
pub mod types;

// Re-export the most commonly used items at crate root for convenience.
pub use backend::NodeBackend;
pub use capacity::extract_storage;
pub use error::CsiError;
pub use handle::{HandleParse, parse_remote_handle, parse_remote_handle_strict};
pub use lock::{VolumeLockGuard, VolumeLocks};
pub use types::*;
