//! Remote file-storage volume handles.
//!
//! A handle has the form `<filesystemId>:<mountTargetAddress>:<exportPath>`,
//! where the mount target may be an IPv6 literal (optionally bracketed) and
//! therefore contain colons of its own.  The filesystem id and export path
//! are taken from outside the first and last colon, and whatever lies
//! between must be an IP literal or a DNS name.
//!
//! [`parse_remote_handle`] keeps the long-standing contract of collapsing
//! both absent and malformed input into the all-empty handle; callers that
//! need to tell the two apart use [`parse_remote_handle_strict`].

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::address::{format_valid_ip, parse_ip, trim_brackets};
use crate::types::RemoteVolumeHandle;

/// Dot-separated alphanumeric/hyphen labels ending in an alphabetic TLD.
static DNS_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9]+(-[a-zA-Z0-9]+)*\.)+[a-zA-Z]{2,}$")
        .expect("DNS name pattern is valid")
});

/// `true` when `name` looks like a fully qualified DNS name.
pub fn validate_dns_name(name: &str) -> bool {
    DNS_NAME.is_match(name)
}

/// Outcome of a strict handle parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleParse {
    Parsed(RemoteVolumeHandle),
    /// The input was empty.
    Absent,
    /// The input was present but not a valid handle.
    Malformed,
}

impl HandleParse {
    /// Collapse into the compat form, mapping both failures to the empty
    /// handle.
    pub fn into_handle(self) -> RemoteVolumeHandle {
        match self {
            Self::Parsed(handle) => handle,
            Self::Absent | Self::Malformed => RemoteVolumeHandle::default(),
        }
    }
}

/// Parse a handle, distinguishing absent from malformed input.
pub fn parse_remote_handle_strict(id: &str) -> HandleParse {
    if id.is_empty() {
        return HandleParse::Absent;
    }

    let (Some(first), Some(last)) = (id.find(':'), id.rfind(':')) else {
        debug!(id, "volume handle has no separators");
        return HandleParse::Malformed;
    };
    if first == 0 || first == last || last == id.len() - 1 {
        debug!(id, "volume handle has an empty field");
        return HandleParse::Malformed;
    }

    let candidate = &id[first + 1..last];
    if parse_ip(candidate).is_none() && !validate_dns_name(candidate) {
        debug!(id, mount_target = candidate, "invalid mount target in volume handle");
        return HandleParse::Malformed;
    }

    HandleParse::Parsed(RemoteVolumeHandle {
        filesystem_id: id[..first].to_owned(),
        mount_target_address: trim_brackets(candidate).to_owned(),
        export_path: id[last + 1..].to_owned(),
    })
}

/// Parse a handle, returning the all-empty handle for absent or malformed
/// input.
pub fn parse_remote_handle(id: &str) -> RemoteVolumeHandle {
    parse_remote_handle_strict(id).into_handle()
}

impl fmt::Display for RemoteVolumeHandle {
    /// Canonical `filesystemId:mountTargetAddress:exportPath` form with IPv6
    /// mount targets re-bracketed.  The empty handle renders as `""`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        write!(
            f,
            "{}:{}:{}",
            self.filesystem_id,
            format_valid_ip(&self.mount_target_address),
            self.export_path
        )
    }
}

impl FromStr for RemoteVolumeHandle {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_remote_handle(s))
    }
}
