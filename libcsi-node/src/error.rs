//! CSI node error types.
//!
//! All errors in the `libcsi-node` crate are represented by the [`CsiError`]
//! enum, which derives [`thiserror::Error`] for ergonomic error handling and
//! also implements [`Serialize`]/[`Deserialize`] so callers can forward them
//! unchanged to whatever RPC surface they expose.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::VolumeId;

/// Unified error type for node-side CSI helpers.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum CsiError {
    /// The caller supplied an invalid argument: malformed numbers, an
    /// out-of-range performance tier or an unsatisfiable capacity range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A required attribute or label was missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// An address could not be parsed as the expected IP family.
    #[error("address family error: {0}")]
    AddressFamily(String),

    /// Another operation on the same volume is still in flight.
    #[error("operation aborted: {0}")]
    Aborted(String),

    /// An unclassified internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CsiError {
    /// Create a [`CsiError::Aborted`] for a volume whose operation lock is
    /// already held.
    pub fn in_progress(volume_id: &VolumeId) -> Self {
        Self::Aborted(format!(
            "an operation for the volume {volume_id} already exists"
        ))
    }

    /// Create a [`CsiError::Internal`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }

    /// `true` for errors the RPC layer should report as an invalid argument.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CsiError::NotFound("iqn".into());
        assert_eq!(err.to_string(), "not found: iqn");
    }

    #[test]
    fn in_progress_names_volume() {
        let err = CsiError::in_progress(&VolumeId::from("vol-7"));
        assert!(matches!(err, CsiError::Aborted(_)));
        assert!(err.to_string().contains("vol-7"));
        assert!(!err.is_invalid_argument());
    }

    #[test]
    fn missing_attribute_maps_to_invalid_argument() {
        assert!(CsiError::NotFound("port".into()).is_invalid_argument());
        assert!(CsiError::InvalidArgument("tier".into()).is_invalid_argument());
        assert!(!CsiError::internal("boom").is_invalid_argument());
    }

    #[test]
    fn error_serde_roundtrip() {
        let err = CsiError::AddressFamily("invalid iSCSIIp identified foo".into());
        let json = serde_json::to_string(&err).expect("serialize");
        let de: CsiError = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(err, de);
    }
}
