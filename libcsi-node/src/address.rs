//! IP address family handling.
//!
//! This module is the single owner of address-literal rules for the node
//! driver: IPv4/IPv6 classification, bracket stripping and re-bracketing,
//! subnet stack classification, synthesis of IPv6 iSCSI portal addresses,
//! and resolution of a node's IP family from its labels.
//!
//! Address parsing follows the usual net semantics where an IPv4-mapped IPv6
//! literal (`::ffff:a.b.c.d`) counts as IPv4, since it carries a valid
//! 4-byte address.  Brackets are only stripped for the IPv6 check, so a
//! bracketed dotted quad such as `[10.0.0.1]` classifies as IPv6.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tracing::info;

use crate::error::CsiError;
use crate::types::{IpFamily, NodeIpFamily, SubnetDescriptor, SubnetStack};

/// Node label carrying the preferred IP family (`IPv4` / `IPv6`).
pub const LABEL_IP_FAMILY_PREFERRED: &str = "oci.oraclecloud.com/ip-family-preferred";
/// Node label set to `true` when IPv4 is enabled on the node.
pub const LABEL_IP_FAMILY_IPV4: &str = "oci.oraclecloud.com/ip-family-ipv4";
/// Node label set to `true` when IPv6 is enabled on the node.
pub const LABEL_IP_FAMILY_IPV6: &str = "oci.oraclecloud.com/ip-family-ipv6";

/// Textual form of the 96-bit prefix used for IPv6 iSCSI portals.
pub const ISCSI_IPV6_PREFIX: &str = "fd00:00c1::";

/// [`ISCSI_IPV6_PREFIX`] as an address; the low 32 bits are zero.
pub const ISCSI_IPV6_PREFIX_ADDR: Ipv6Addr = Ipv6Addr::new(0xfd00, 0x00c1, 0, 0, 0, 0, 0, 0);

/// Remove any enclosing `[` / `]` characters from an address literal.
pub fn trim_brackets(address: &str) -> &str {
    address.trim_matches(|c| c == '[' || c == ']')
}

/// Parse `address` as an IPv4 address, accepting IPv4-mapped IPv6 literals.
fn parse_ipv4(address: &str) -> Option<Ipv4Addr> {
    match address.parse::<IpAddr>().ok()? {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(v6) => v6.to_ipv4_mapped(),
    }
}

/// Parse an IP literal of either family, with or without brackets.
pub fn parse_ip(address: &str) -> Option<IpAddr> {
    trim_brackets(address).parse().ok()
}

pub fn is_ipv4(address: &str) -> bool {
    parse_ipv4(address).is_some()
}

/// `true` when `address` is not IPv4 but parses as an IP literal once
/// brackets are removed.
pub fn is_ipv6(address: &str) -> bool {
    !is_ipv4(address) && parse_ip(address).is_some()
}

/// Classify a literal address by family.
pub fn classify_address(address: &str) -> Result<IpFamily, CsiError> {
    if is_ipv4(address) {
        Ok(IpFamily::Ipv4)
    } else if is_ipv6(address) {
        Ok(IpFamily::Ipv6)
    } else {
        Err(CsiError::AddressFamily(format!(
            "{address} is neither a valid IPv4 nor IPv6 address"
        )))
    }
}

/// Wrap IPv6 literals in square brackets so they can be embedded in
/// colon-delimited strings.  IPv4 and unparseable input pass through.
pub fn format_valid_ip(address: &str) -> String {
    if is_ipv4(address) {
        return address.to_owned();
    }
    if is_ipv6(address) {
        format!("[{}]", trim_brackets(address))
    } else {
        address.to_owned()
    }
}

/// Place the IPv4 iSCSI portal address in the low 32 bits of
/// [`ISCSI_IPV6_PREFIX_ADDR`].
pub fn synthesize_iscsi_ipv6(ipv4_iscsi_ip: &str) -> Result<Ipv6Addr, CsiError> {
    let v4 = parse_ipv4(ipv4_iscsi_ip).ok_or_else(|| {
        CsiError::AddressFamily(format!("invalid iSCSIIp identified {ipv4_iscsi_ip}"))
    })?;
    let mut octets = ISCSI_IPV6_PREFIX_ADDR.octets();
    octets[12..].copy_from_slice(&v4.octets());
    Ok(Ipv6Addr::from(octets))
}

/// Inverse of [`synthesize_iscsi_ipv6`]: `None` when `address` does not carry
/// the iSCSI prefix.
pub fn recover_iscsi_ipv4(address: Ipv6Addr) -> Option<Ipv4Addr> {
    let octets = address.octets();
    if octets[..12] != ISCSI_IPV6_PREFIX_ADDR.octets()[..12] {
        return None;
    }
    Some(Ipv4Addr::new(octets[12], octets[13], octets[14], octets[15]))
}

// ---------------------------------------------------------------------------
// Subnets
// ---------------------------------------------------------------------------

fn has_primary_cidr(subnet: &SubnetDescriptor) -> bool {
    subnet
        .primary_cidr
        .as_deref()
        .is_some_and(|cidr| !cidr.is_empty() && !cidr.contains("null"))
}

pub fn is_dual_stack_subnet(subnet: &SubnetDescriptor) -> bool {
    has_primary_cidr(subnet)
        && subnet
            .ipv6_cidrs
            .as_ref()
            .is_some_and(|cidrs| cidrs.is_present())
}

pub fn is_ipv4_single_stack_subnet(subnet: &SubnetDescriptor) -> bool {
    !is_dual_stack_subnet(subnet) && has_primary_cidr(subnet)
}

pub fn is_ipv6_single_stack_subnet(subnet: &SubnetDescriptor) -> bool {
    !is_dual_stack_subnet(subnet) && !is_ipv4_single_stack_subnet(subnet)
}

pub fn classify_subnet(subnet: &SubnetDescriptor) -> SubnetStack {
    if is_dual_stack_subnet(subnet) {
        SubnetStack::DualStack
    } else if is_ipv4_single_stack_subnet(subnet) {
        SubnetStack::Ipv4Only
    } else {
        SubnetStack::Ipv6Only
    }
}

// ---------------------------------------------------------------------------
// IP stacks and node families
// ---------------------------------------------------------------------------

/// Case-insensitively map `ipv4` / `ipv6` onto an [`IpFamily`].
pub fn format_ip_stack(stack: &str) -> Option<IpFamily> {
    if stack.eq_ignore_ascii_case(IpFamily::Ipv4.as_str()) {
        Some(IpFamily::Ipv4)
    } else if stack.eq_ignore_ascii_case(IpFamily::Ipv6.as_str()) {
        Some(IpFamily::Ipv6)
    } else {
        None
    }
}

/// `true` when a cluster IP family string mentions `IPv4` or `IPv6`.
pub fn is_valid_ip_family_present_in_cluster_ip_family(cluster_ip_family: &str) -> bool {
    cluster_ip_family.contains(IpFamily::Ipv4.as_str())
        || cluster_ip_family.contains(IpFamily::Ipv6.as_str())
}

fn label_is_true(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Decision table over the three IP family label values.
///
/// If neither family is enabled the node defaults to IPv4 only, preferring
/// IPv4.  Otherwise the labels are reflected as given.
pub fn resolve_node_ip_family(
    preferred: Option<&str>,
    ipv4_enabled: Option<&str>,
    ipv6_enabled: Option<&str>,
) -> NodeIpFamily {
    let family = NodeIpFamily {
        preferred: preferred.and_then(format_ip_stack),
        ipv4_enabled: label_is_true(ipv4_enabled),
        ipv6_enabled: label_is_true(ipv6_enabled),
    };

    if !family.ipv4_enabled && !family.ipv6_enabled {
        return NodeIpFamily::default();
    }
    family
}

/// Resolve a node's IP family from its label mapping.
pub fn node_ip_family_from_labels(node_id: &str, labels: &HashMap<String, String>) -> NodeIpFamily {
    let get = |key: &str| labels.get(key).map(String::as_str);
    let family = resolve_node_ip_family(
        get(LABEL_IP_FAMILY_PREFERRED),
        get(LABEL_IP_FAMILY_IPV4),
        get(LABEL_IP_FAMILY_IPV6),
    );

    if label_is_true(get(LABEL_IP_FAMILY_IPV4)) || label_is_true(get(LABEL_IP_FAMILY_IPV6)) {
        info!(node_id, ?family, "node IP family identified");
    } else {
        info!(node_id, ?family, "no IP family labels identified on node, defaulting to ipv4");
    }
    family
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Ipv6Cidrs;

    #[test]
    fn classify_literals() {
        assert!(is_ipv4("10.0.0.5"));
        assert!(!is_ipv6("10.0.0.5"));

        for v6 in [
            "fd00:c1::a9fe:202",
            "fd00:00c1:0000:0000:0000:0000:a9fe:0202",
            "[fd00:00c1::a9fe:202]",
            "::1",
            "64:ff9b::192.0.2.33",
        ] {
            assert!(is_ipv6(v6), "{v6}");
            assert!(!is_ipv4(v6), "{v6}");
            assert_eq!(classify_address(v6), Ok(IpFamily::Ipv6));
        }
    }

    #[test]
    fn ipv4_mapped_counts_as_ipv4() {
        assert!(is_ipv4("::ffff:10.0.0.5"));
        assert!(!is_ipv6("::ffff:10.0.0.5"));
    }

    #[test]
    fn bracketed_ipv4_counts_as_ipv6() {
        assert!(!is_ipv4("[10.0.0.1]"));
        assert!(is_ipv6("[10.0.0.1]"));
        assert_eq!(classify_address("[10.0.0.1]"), Ok(IpFamily::Ipv6));
        assert_eq!(format_valid_ip("[10.0.0.1]"), "[10.0.0.1]");
    }

    #[test]
    fn garbage_is_neither_family() {
        for bad in ["", "not-an-ip", "10.0.0.256", "[10.0.0.256]", "fd00::1::2"] {
            assert!(!is_ipv4(bad), "{bad}");
            assert!(!is_ipv6(bad), "{bad}");
            assert!(matches!(classify_address(bad), Err(CsiError::AddressFamily(_))));
        }
    }

    #[test]
    fn format_valid_ip_brackets_ipv6_only() {
        assert_eq!(format_valid_ip("10.0.0.5"), "10.0.0.5");
        assert_eq!(format_valid_ip("fd00:c1::a9fe:202"), "[fd00:c1::a9fe:202]");
        assert_eq!(format_valid_ip("[fd00:c1::a9fe:202]"), "[fd00:c1::a9fe:202]");
        assert_eq!(format_valid_ip("fs.example.com"), "fs.example.com");
    }

    #[test]
    fn synthesize_places_ipv4_in_low_bits() {
        let v6 = synthesize_iscsi_ipv6("203.0.113.5").expect("valid ipv4");
        assert_eq!(v6, "fd00:c1::cb00:7105".parse::<Ipv6Addr>().expect("literal"));
        assert_eq!(&v6.octets()[12..], &[203, 0, 113, 5]);
        assert_eq!(&v6.octets()[..12], &ISCSI_IPV6_PREFIX_ADDR.octets()[..12]);
        assert_eq!(ISCSI_IPV6_PREFIX.parse::<Ipv6Addr>().expect("prefix"), ISCSI_IPV6_PREFIX_ADDR);
    }

    #[test]
    fn synthesize_is_deterministic_and_invertible() {
        let a = synthesize_iscsi_ipv6("169.254.2.2").expect("valid");
        let b = synthesize_iscsi_ipv6("169.254.2.2").expect("valid");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "fd00:c1::a9fe:202");
        assert_eq!(recover_iscsi_ipv4(a), Some(Ipv4Addr::new(169, 254, 2, 2)));
        assert_eq!(recover_iscsi_ipv4("2001:db8::1".parse().expect("literal")), None);
    }

    #[test]
    fn synthesize_rejects_non_ipv4() {
        let err = synthesize_iscsi_ipv6("fd00::1").expect_err("ipv6 input");
        assert_eq!(
            err,
            CsiError::AddressFamily("invalid iSCSIIp identified fd00::1".into())
        );
        assert!(synthesize_iscsi_ipv6("").is_err());
    }

    fn subnet(primary: Option<&str>, v6: Option<Ipv6Cidrs>) -> SubnetDescriptor {
        SubnetDescriptor {
            primary_cidr: primary.map(str::to_owned),
            ipv6_cidrs: v6,
        }
    }

    #[test]
    fn subnet_classification() {
        let dual = subnet(
            Some("10.0.0.0/16"),
            Some(Ipv6Cidrs::Single("2001:db8::/56".into())),
        );
        assert_eq!(classify_subnet(&dual), SubnetStack::DualStack);

        let dual_list = subnet(
            Some("10.0.0.0/16"),
            Some(Ipv6Cidrs::Many(vec!["2001:db8::/56".into()])),
        );
        assert!(is_dual_stack_subnet(&dual_list));

        let v4 = subnet(Some("10.0.0.0/16"), Some(Ipv6Cidrs::Many(Vec::new())));
        assert_eq!(classify_subnet(&v4), SubnetStack::Ipv4Only);
        assert!(is_ipv4_single_stack_subnet(&v4));

        let v6 = subnet(Some("<null>"), Some(Ipv6Cidrs::Single("2001:db8::/56".into())));
        assert_eq!(classify_subnet(&v6), SubnetStack::Ipv6Only);
        assert!(is_ipv6_single_stack_subnet(&v6));

        assert_eq!(classify_subnet(&SubnetDescriptor::default()), SubnetStack::Ipv6Only);
    }

    #[test]
    fn ip_stack_spelling() {
        assert_eq!(format_ip_stack("ipv6"), Some(IpFamily::Ipv6));
        assert_eq!(format_ip_stack("IPV4"), Some(IpFamily::Ipv4));
        assert_eq!(format_ip_stack("dual"), None);

        assert!(is_valid_ip_family_present_in_cluster_ip_family("IPv4,IPv6"));
        assert!(!is_valid_ip_family_present_in_cluster_ip_family(""));
        assert!(!is_valid_ip_family_present_in_cluster_ip_family("ipv4"));
    }

    #[test]
    fn node_family_defaults_to_ipv4() {
        let family = resolve_node_ip_family(None, None, None);
        assert_eq!(
            family,
            NodeIpFamily {
                preferred: Some(IpFamily::Ipv4),
                ipv4_enabled: true,
                ipv6_enabled: false,
            }
        );

        let family = resolve_node_ip_family(Some("IPv6"), Some("false"), Some("no"));
        assert_eq!(family.preferred, Some(IpFamily::Ipv4));
        assert!(family.ipv4_enabled);
    }

    #[test]
    fn node_family_reflects_labels() {
        let family = resolve_node_ip_family(Some("ipv6"), Some("False"), Some("TRUE"));
        assert_eq!(family.preferred, Some(IpFamily::Ipv6));
        assert!(!family.ipv4_enabled);
        assert!(family.ipv6_enabled);
        assert!(family.is_ipv6_single_stack());

        let family = resolve_node_ip_family(None, Some("true"), Some("true"));
        assert_eq!(family.preferred, None);
        assert!(family.ipv4_enabled && family.ipv6_enabled);
    }

    #[test]
    fn node_family_from_label_map() {
        let labels = HashMap::from([
            (LABEL_IP_FAMILY_PREFERRED.to_owned(), "IPv6".to_owned()),
            (LABEL_IP_FAMILY_IPV6.to_owned(), "true".to_owned()),
            ("unrelated".to_owned(), "x".to_owned()),
        ]);
        let family = node_ip_family_from_labels("node-1", &labels);
        assert!(family.is_ipv6_single_stack());

        let family = node_ip_family_from_labels("node-2", &HashMap::new());
        assert!(family.ipv4_enabled);
        assert_eq!(family.preferred, Some(IpFamily::Ipv4));
    }
}
