//! Volume size negotiation.
//!
//! [`extract_storage`] reconciles the required/limit pair of a CSI capacity
//! range against the fixed size policy of the block volume service.

use tracing::debug;

use crate::error::CsiError;
use crate::types::CapacityRange;

pub const KIB: i64 = 1 << 10;
pub const MIB: i64 = 1 << 20;
pub const GIB: i64 = 1 << 30;
pub const TIB: i64 = 1 << 40;

/// Smallest volume the service will provision.
pub const MINIMUM_VOLUME_SIZE_IN_BYTES: i64 = 50 * GIB;

/// Largest volume the service will provision.
pub const MAXIMUM_VOLUME_SIZE_IN_BYTES: i64 = 32 * TIB;

/// Size used when the caller expresses no preference.
pub const DEFAULT_VOLUME_SIZE_IN_BYTES: i64 = MINIMUM_VOLUME_SIZE_IN_BYTES;

/// Resolve a capacity range into a single volume size in bytes.
///
/// Precedence:
///
/// 1. no range, or neither bound set: the default size;
/// 2. both set with `limit < required`: [`CsiError::InvalidArgument`];
/// 3. only `required` set: `max(required, minimum)`;
/// 4. `limit` set: `max(limit, minimum)`.
///
/// Because rules 3 and 4 cover every remaining case, the maximum supported
/// size is never enforced here.  Callers that want it enforced run
/// [`check_maximum`] on the result.
pub fn extract_storage(range: Option<&CapacityRange>) -> Result<i64, CsiError> {
    let Some(range) = range else {
        return Ok(DEFAULT_VOLUME_SIZE_IN_BYTES);
    };

    let size = match (range.required(), range.limit()) {
        (None, None) => DEFAULT_VOLUME_SIZE_IN_BYTES,
        (Some(required), Some(limit)) if limit < required => {
            return Err(CsiError::InvalidArgument(format!(
                "limit ({}) can not be less than required ({}) size",
                format_bytes(limit),
                format_bytes(required)
            )));
        }
        (Some(required), None) => required.max(MINIMUM_VOLUME_SIZE_IN_BYTES),
        (_, Some(limit)) => limit.max(MINIMUM_VOLUME_SIZE_IN_BYTES),
    };

    debug!(?range, size, "resolved volume size");
    Ok(size)
}

/// Reject sizes above [`MAXIMUM_VOLUME_SIZE_IN_BYTES`].
pub fn check_maximum(size_bytes: i64) -> Result<i64, CsiError> {
    if size_bytes > MAXIMUM_VOLUME_SIZE_IN_BYTES {
        return Err(CsiError::InvalidArgument(format!(
            "required ({}) can not exceed maximum supported volume size ({})",
            format_bytes(size_bytes),
            format_bytes(MAXIMUM_VOLUME_SIZE_IN_BYTES)
        )));
    }
    Ok(size_bytes)
}

/// Number of `allocation_unit_bytes` units needed to hold `volume_size_bytes`.
///
/// Defined for every size [`extract_storage`] can return, including
/// `i64::MAX`.  A non-positive allocation unit is
/// [`CsiError::InvalidArgument`].
pub fn round_up_size(
    volume_size_bytes: i64,
    allocation_unit_bytes: i64,
) -> Result<i64, CsiError> {
    if allocation_unit_bytes <= 0 {
        return Err(CsiError::InvalidArgument(format!(
            "allocation unit must be positive, got {allocation_unit_bytes}"
        )));
    }
    Ok(volume_size_bytes / allocation_unit_bytes
        + i64::from(volume_size_bytes % allocation_unit_bytes != 0))
}

/// The minimum volume size in whole GiB.
pub fn round_up_min_size() -> i64 {
    MINIMUM_VOLUME_SIZE_IN_BYTES / GIB
}

/// Render a byte count with a binary suffix, e.g. `50Gi` or `1.5Ti`.
pub fn format_bytes(bytes: i64) -> String {
    if bytes == 0 {
        return "0".to_owned();
    }

    let (divisor, unit) = match bytes {
        b if b >= TIB => (TIB, "Ti"),
        b if b >= GIB => (GIB, "Gi"),
        b if b >= MIB => (MIB, "Mi"),
        b if b >= KIB => (KIB, "Ki"),
        _ => (1, ""),
    };

    let value = format!("{:.1}", bytes as f64 / divisor as f64);
    let value = value.strip_suffix(".0").unwrap_or(&value);
    format!("{value}{unit}")
}
