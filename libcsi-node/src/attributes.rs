//! Extraction helpers for request attributes, node labels and device paths.
//!
//! Volume context attributes arrive as a plain string map; node labels come
//! from the cluster node object, fetched by the caller.  Everything here is a
//! pure lookup over already-resolved data.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::error::CsiError;
use crate::types::DiskDescriptor;

/// Attribute key of the iSCSI target IQN.
pub const ISCSI_IQN: &str = "iqn";
/// Attribute key of the iSCSI portal address.
pub const ISCSI_IP: &str = "iscsi_ip";
/// Attribute key of the iSCSI portal port.
pub const ISCSI_PORT: &str = "port";

/// Storage class parameter carrying the block volume performance tier.
pub const VPUS_PER_GB: &str = "vpusPerGB";
pub const LOW_COST_PERFORMANCE_OPTION: i64 = 0;
pub const BALANCED_PERFORMANCE_OPTION: i64 = 10;
pub const HIGHER_PERFORMANCE_OPTION: i64 = 20;
pub const MAX_ULTRA_HIGH_PERFORMANCE_OPTION: i64 = 120;

/// Name of the bind-mounted file inside the staging path of a raw block
/// volume.
pub const RAW_BLOCK_STAGING_FILE: &str = "mountfile";

pub const LABEL_TOPOLOGY_ZONE: &str = "topology.kubernetes.io/zone";
pub const LABEL_ZONE_FAILURE_DOMAIN: &str = "failure-domain.beta.kubernetes.io/zone";
/// Node label carrying the full availability domain name.
pub const LABEL_FULL_AVAILABILITY_DOMAIN: &str = "csi-ipv6-full-ad-name";

const DEFAULT_FS_TYPE: &str = "ext4";
const SUPPORTED_FS_TYPES: [&str; 3] = ["ext4", "ext3", "xfs"];

/// Paravirtualized attachment device path.
pub const DISK_BY_PATH_PATTERN_PV: &str =
    r"/dev/disk/by-path/pci-\w{4}:\w{2}:\w{2}\.\d+-scsi-\d+:\d+:\d+:\d+$";

/// iSCSI attachment device path; captures portal address, port and IQN.
pub const DISK_BY_PATH_PATTERN_ISCSI: &str =
    r"^/dev/disk/by-path/ip-\[?([\w\.:]+?)\]?:(\d+)-iscsi-([\w\.\-:]+)-lun-\d+$";

static ISCSI_DEVICE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(DISK_BY_PATH_PATTERN_ISCSI).expect("iSCSI device path pattern is valid")
});

static PV_DEVICE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(DISK_BY_PATH_PATTERN_PV).expect("PV device path pattern is valid")
});

fn required_attribute<'a>(
    attributes: &'a HashMap<String, String>,
    key: &str,
    what: &str,
) -> Result<&'a str, CsiError> {
    attributes.get(key).map(String::as_str).ok_or_else(|| {
        CsiError::NotFound(format!("unable to get the {what} from the attribute list"))
    })
}

fn parse_port(port: &str) -> Result<u16, CsiError> {
    port.parse()
        .map_err(|e| CsiError::InvalidArgument(format!("invalid port number: {port}, error: {e}")))
}

/// Read the iSCSI coordinates of a block volume from its volume context.
pub fn extract_iscsi_information(
    attributes: &HashMap<String, String>,
) -> Result<DiskDescriptor, CsiError> {
    let iqn = required_attribute(attributes, ISCSI_IQN, "IQN")?;
    let iscsi_ip = required_attribute(attributes, ISCSI_IP, "iSCSIIp")?;
    let port = required_attribute(attributes, ISCSI_PORT, "port")?;

    Ok(DiskDescriptor {
        iqn: iqn.to_owned(),
        iscsi_ip: iscsi_ip.to_owned(),
        port: parse_port(port)?,
    })
}

/// Recover iSCSI coordinates from the device paths backing a mount point.
/// The first path matching the iSCSI by-path layout wins.
pub fn extract_iscsi_information_from_mount_path<S: AsRef<str>>(
    disk_paths: &[S],
) -> Result<DiskDescriptor, CsiError> {
    let Some(caps) = disk_paths
        .iter()
        .find_map(|p| ISCSI_DEVICE_PATH.captures(p.as_ref()))
    else {
        let paths: Vec<&str> = disk_paths.iter().map(|p| p.as_ref()).collect();
        warn!(?paths, "no iSCSI device path found for mount point");
        return Err(CsiError::InvalidArgument(format!(
            "invalid mount path: no iSCSI device among {paths:?}"
        )));
    };

    let disk = DiskDescriptor {
        iqn: caps[3].to_owned(),
        iscsi_ip: caps[1].to_owned(),
        port: parse_port(&caps[2])?,
    };
    info!(iqn = %disk.iqn, iscsi_ip = %disk.iscsi_ip, port = disk.port, "found iSCSI info for mount path");
    Ok(disk)
}

/// `true` when `path` is a paravirtualized attachment device path.
pub fn is_paravirtualized_device_path(path: &str) -> bool {
    PV_DEVICE_PATH.is_match(path)
}

/// Parse and bound-check a block volume performance tier.
pub fn extract_block_volume_performance_level(attribute: &str) -> Result<i64, CsiError> {
    let vpus_per_gb: i64 = attribute.parse().map_err(|_| {
        CsiError::InvalidArgument(format!(
            "unable to parse performance level value {attribute} as int64"
        ))
    })?;
    if !(LOW_COST_PERFORMANCE_OPTION..=MAX_ULTRA_HIGH_PERFORMANCE_OPTION).contains(&vpus_per_gb) {
        return Err(CsiError::InvalidArgument(format!(
            "invalid performance option : {attribute} provided for storage class. \
             Supported values for performance options are between \
             {LOW_COST_PERFORMANCE_OPTION} and {MAX_ULTRA_HIGH_PERFORMANCE_OPTION}"
        )));
    }
    Ok(vpus_per_gb)
}

/// Filesystem type to format with; unsupported or empty values fall back to
/// ext4.
pub fn validate_fs_type(fs_type: &str) -> &str {
    if SUPPORTED_FS_TYPES.contains(&fs_type) {
        return fs_type;
    }
    if !fs_type.is_empty() {
        warn!(fs_type, "supporting only ext4/ext3/xfs as fsType");
    }
    DEFAULT_FS_TYPE
}

/// Staging file used for raw block volumes inside `staging_path`.
pub fn path_for_block(staging_path: impl AsRef<Path>) -> PathBuf {
    staging_path.as_ref().join(RAW_BLOCK_STAGING_FILE)
}

/// Zone and full availability domain of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAvailabilityDomain {
    pub zone: String,
    /// Empty when the node carries no full availability domain label.
    pub full_name: String,
}

/// Read a node's availability domain from its labels, preferring the
/// topology zone label over the legacy failure-domain label.
pub fn availability_domain_from_labels(
    labels: &HashMap<String, String>,
) -> Result<NodeAvailabilityDomain, CsiError> {
    let zone = labels
        .get(LABEL_TOPOLOGY_ZONE)
        .or_else(|| labels.get(LABEL_ZONE_FAILURE_DOMAIN))
        .ok_or_else(|| {
            CsiError::NotFound(format!(
                "did not find the label for the fault domain. Checked topology labels: \
                 {LABEL_TOPOLOGY_ZONE}, {LABEL_ZONE_FAILURE_DOMAIN}"
            ))
        })?;

    Ok(NodeAvailabilityDomain {
        zone: zone.clone(),
        full_name: labels
            .get(LABEL_FULL_AVAILABILITY_DOMAIN)
            .cloned()
            .unwrap_or_default(),
    })
}

/// Strip the tenancy prefix from a full availability domain name,
/// e.g. `zkJl:US-ASHBURN-AD-1` becomes `US-ASHBURN-AD-1`.
pub fn available_domain_in_node_label(full_ad: &str) -> &str {
    let ad = full_ad.rsplit(':').next().unwrap_or(full_ad);
    info!(full_ad, ad, "converted availability domain");
    ad
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn iscsi_from_attributes() {
        let disk = extract_iscsi_information(&attrs(&[
            (ISCSI_IQN, "iqn.2015-12.com.oracleiaas:abc"),
            (ISCSI_IP, "169.254.2.2"),
            (ISCSI_PORT, "3260"),
        ]))
        .expect("complete attributes");
        assert_eq!(
            disk,
            DiskDescriptor {
                iqn: "iqn.2015-12.com.oracleiaas:abc".into(),
                iscsi_ip: "169.254.2.2".into(),
                port: 3260,
            }
        );
    }

    #[test]
    fn iscsi_missing_key_is_not_found() {
        let err = extract_iscsi_information(&attrs(&[(ISCSI_IQN, "iqn"), (ISCSI_PORT, "3260")]))
            .expect_err("missing ip");
        assert_eq!(
            err,
            CsiError::NotFound("unable to get the iSCSIIp from the attribute list".into())
        );
    }

    #[test]
    fn iscsi_bad_port_is_invalid() {
        let err = extract_iscsi_information(&attrs(&[
            (ISCSI_IQN, "iqn"),
            (ISCSI_IP, "10.0.0.1"),
            (ISCSI_PORT, "iscsi"),
        ]))
        .expect_err("bad port");
        assert!(matches!(err, CsiError::InvalidArgument(_)));
    }

    #[test]
    fn iscsi_from_ipv4_device_path() {
        let disk = extract_iscsi_information_from_mount_path(&[
            "/dev/sdb",
            "/dev/disk/by-path/ip-169.254.2.2:3260-iscsi-iqn.2015-12.com.oracleiaas:abc-lun-1",
        ])
        .expect("iscsi path");
        assert_eq!(disk.iscsi_ip, "169.254.2.2");
        assert_eq!(disk.port, 3260);
        assert_eq!(disk.iqn, "iqn.2015-12.com.oracleiaas:abc");
    }

    #[test]
    fn iscsi_from_ipv6_device_path() {
        let disk = extract_iscsi_information_from_mount_path(&[
            "/dev/disk/by-path/ip-[fd00:c1::a9fe:202]:3260-iscsi-iqn.2015-12.com.oracleiaas:abc-lun-2",
        ])
        .expect("iscsi path");
        assert_eq!(disk.iscsi_ip, "fd00:c1::a9fe:202");
        assert_eq!(disk.port, 3260);
    }

    #[test]
    fn no_iscsi_device_path() {
        let err = extract_iscsi_information_from_mount_path(&["/dev/sda1"]).expect_err("no match");
        assert!(matches!(err, CsiError::InvalidArgument(_)));
        let empty: [&str; 0] = [];
        assert!(extract_iscsi_information_from_mount_path(&empty).is_err());
    }

    #[test]
    fn paravirtualized_path() {
        assert!(is_paravirtualized_device_path(
            "/dev/disk/by-path/pci-0000:00:04.0-scsi-0:0:0:1"
        ));
        assert!(!is_paravirtualized_device_path("/dev/sda"));
    }

    #[test]
    fn performance_level_bounds() {
        assert_eq!(extract_block_volume_performance_level("0"), Ok(0));
        assert_eq!(extract_block_volume_performance_level("10"), Ok(BALANCED_PERFORMANCE_OPTION));
        assert_eq!(extract_block_volume_performance_level("120"), Ok(120));
        assert!(extract_block_volume_performance_level("121").is_err());
        assert!(extract_block_volume_performance_level("-1").is_err());
        let err = extract_block_volume_performance_level("fast").expect_err("not a number");
        assert!(err.to_string().contains("unable to parse performance level value fast"));
    }

    #[test]
    fn fs_type_fallback() {
        assert_eq!(validate_fs_type("xfs"), "xfs");
        assert_eq!(validate_fs_type("ext3"), "ext3");
        assert_eq!(validate_fs_type("btrfs"), "ext4");
        assert_eq!(validate_fs_type(""), "ext4");
    }

    #[test]
    fn block_staging_path() {
        assert_eq!(
            path_for_block("/var/lib/kubelet/staging/pv-1"),
            PathBuf::from("/var/lib/kubelet/staging/pv-1/mountfile")
        );
    }

    #[test]
    fn availability_domain_prefers_topology_label() {
        let ad = availability_domain_from_labels(&attrs(&[
            (LABEL_TOPOLOGY_ZONE, "PHX-AD-1"),
            (LABEL_ZONE_FAILURE_DOMAIN, "PHX-AD-2"),
            (LABEL_FULL_AVAILABILITY_DOMAIN, "zkJl:PHX-AD-1"),
        ]))
        .expect("zone present");
        assert_eq!(ad.zone, "PHX-AD-1");
        assert_eq!(ad.full_name, "zkJl:PHX-AD-1");

        let ad = availability_domain_from_labels(&attrs(&[(LABEL_ZONE_FAILURE_DOMAIN, "PHX-AD-2")]))
            .expect("legacy zone present");
        assert_eq!(ad.zone, "PHX-AD-2");
        assert!(ad.full_name.is_empty());
    }

    #[test]
    fn availability_domain_missing() {
        let err = availability_domain_from_labels(&HashMap::new()).expect_err("no labels");
        assert!(matches!(err, CsiError::NotFound(_)));
    }

    #[test]
    fn strip_ad_prefix() {
        assert_eq!(available_domain_in_node_label("zkJl:US-ASHBURN-AD-1"), "US-ASHBURN-AD-1");
        assert_eq!(available_domain_in_node_label("US-ASHBURN-AD-1"), "US-ASHBURN-AD-1");
    }
}
