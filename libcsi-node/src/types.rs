//! Core data model shared by the node-side primitives.
//!
//! These types carry the already-resolved inputs that callers (the CSI RPC
//! handlers of each node backend) hand to the lock, capacity, address and
//! handle modules.  They are all [`Serialize`]/[`Deserialize`] so they can be
//! logged or persisted as JSON alongside the rest of the driver state.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Volume identity
// ---------------------------------------------------------------------------

/// Opaque, unique identifier for a volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VolumeId(pub String);

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for VolumeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VolumeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

/// Requested / limit byte pair from a CSI capacity range.
///
/// A bound counts as set only when it is strictly positive, so a zero coming
/// off the wire is the same as an absent bound.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapacityRange {
    #[serde(default)]
    pub required_bytes: Option<i64>,
    #[serde(default)]
    pub limit_bytes: Option<i64>,
}

impl CapacityRange {
    /// Build a range from the raw CSI fields, where `0` means "not set".
    pub fn new(required_bytes: i64, limit_bytes: i64) -> Self {
        Self {
            required_bytes: Some(required_bytes),
            limit_bytes: Some(limit_bytes),
        }
    }

    /// The required bound, if it is set.
    pub fn required(&self) -> Option<i64> {
        self.required_bytes.filter(|b| *b > 0)
    }

    /// The limit bound, if it is set.
    pub fn limit(&self) -> Option<i64> {
        self.limit_bytes.filter(|b| *b > 0)
    }
}

// ---------------------------------------------------------------------------
// IP families
// ---------------------------------------------------------------------------

/// An IP address family, spelled the way Kubernetes spells IP stacks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IpFamily {
    #[serde(rename = "IPv4")]
    Ipv4,
    #[serde(rename = "IPv6")]
    Ipv6,
}

impl IpFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ipv4 => "IPv4",
            Self::Ipv6 => "IPv6",
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address-family posture of a cluster node.
///
/// Built from node labels by
/// [`node_ip_family_from_labels`](crate::address::node_ip_family_from_labels);
/// at least one of the two `*_enabled` flags is always true once resolved.
/// The default is the unlabelled posture: IPv4 only, preferring IPv4.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeIpFamily {
    /// Preferred family, `None` when the label is absent or unrecognized.
    #[serde(default)]
    pub preferred: Option<IpFamily>,
    pub ipv4_enabled: bool,
    pub ipv6_enabled: bool,
}

impl Default for NodeIpFamily {
    fn default() -> Self {
        Self {
            preferred: Some(IpFamily::Ipv4),
            ipv4_enabled: true,
            ipv6_enabled: false,
        }
    }
}

impl NodeIpFamily {
    /// `true` when the node only speaks IPv6.
    pub fn is_ipv6_single_stack(&self) -> bool {
        self.ipv6_enabled && !self.ipv4_enabled
    }
}

/// IPv6 CIDR blocks of a subnet.  The networking API reports either a
/// single block or a list, depending on the subnet's age.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Ipv6Cidrs {
    Single(String),
    Many(Vec<String>),
}

impl Ipv6Cidrs {
    /// At least one non-empty IPv6 CIDR is present.
    pub fn is_present(&self) -> bool {
        match self {
            Self::Single(cidr) => !cidr.is_empty(),
            Self::Many(cidrs) => !cidrs.is_empty(),
        }
    }
}

/// Subnet as reported by the cloud networking API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubnetDescriptor {
    #[serde(default)]
    pub primary_cidr: Option<String>,
    #[serde(default)]
    pub ipv6_cidrs: Option<Ipv6Cidrs>,
}

/// Address-family classification of a subnet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubnetStack {
    DualStack,
    Ipv4Only,
    Ipv6Only,
}

// ---------------------------------------------------------------------------
// Attachment descriptors
// ---------------------------------------------------------------------------

/// iSCSI coordinates of a block volume attachment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiskDescriptor {
    /// Target IQN.
    pub iqn: String,
    /// Target portal address, IPv4 or IPv6 without brackets.
    pub iscsi_ip: String,
    /// Target portal port.
    pub port: u16,
}

/// Location of a remote file-storage export, decoded from a volume handle of
/// the form `filesystemId:mountTargetAddress:exportPath`.
///
/// Either all three fields are populated or all three are empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteVolumeHandle {
    pub filesystem_id: String,
    /// Mount target IP (unbracketed) or DNS name.
    pub mount_target_address: String,
    pub export_path: String,
}

impl RemoteVolumeHandle {
    /// `true` for the all-empty handle produced by absent or rejected input.
    pub fn is_empty(&self) -> bool {
        self.filesystem_id.is_empty()
            && self.mount_target_address.is_empty()
            && self.export_path.is_empty()
    }
}
