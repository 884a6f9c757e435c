//! Node driver configuration.
//!
//! Describes the node backends (block volume, file storage, Lustre), their
//! per-backend options, the log level vocabulary accepted on the command
//! line, and the environment switches that enable optional features.
//!
//! Environment variables:
//! - `LUSTRE_DRIVER_ENABLED`: set to `true` (any case) to run the Lustre node
//!   backend.  Defaults to disabled.

use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use tracing::{Level, error};

use crate::error::CsiError;

pub const LUSTRE_DRIVER_ENABLED_ENV: &str = "LUSTRE_DRIVER_ENABLED";

/// Environment switches, read once at first access.
#[derive(Debug, Clone, Copy)]
pub struct NodeDriverEnv {
    /// Whether the Lustre node backend should run.
    pub lustre_driver_enabled: bool,
}

/// Globally initialized environment configuration.
pub static NODE_DRIVER_ENV: LazyLock<NodeDriverEnv> =
    LazyLock::new(|| NodeDriverEnv::from_lookup(|key| std::env::var(key).ok()));

impl NodeDriverEnv {
    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            lustre_driver_enabled: lookup(LUSTRE_DRIVER_ENABLED_ENV)
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
        }
    }
}

/// Whether the Lustre node backend is enabled in the process environment.
pub fn lustre_driver_enabled() -> bool {
    NODE_DRIVER_ENV.lustre_driver_enabled
}

/// Parse a boolean the way flag values are usually spelled:
/// `1`, `t`, `true` and `0`, `f`, `false` in lower, upper or title case.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Read a boolean feature flag from `lookup`, falling back to
/// `default_value` when it is unset or unparseable.
pub fn feature_enabled_from(
    lookup: impl Fn(&str) -> Option<String>,
    feature_name: &str,
    default_value: bool,
) -> bool {
    let Some(raw) = lookup(feature_name) else {
        return default_value;
    };
    parse_bool(&raw).unwrap_or_else(|| {
        error!(
            feature_name,
            value = %raw,
            default_value,
            "failed to parse feature flag, using default"
        );
        default_value
    })
}

/// [`feature_enabled_from`] over the process environment.
pub fn feature_enabled_from_env(feature_name: &str, default_value: bool) -> bool {
    feature_enabled_from(|key| std::env::var(key).ok(), feature_name, default_value)
}

// ---------------------------------------------------------------------------
// Log level
// ---------------------------------------------------------------------------

/// Log levels accepted by the `--loglevel` option.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    DPanic,
    Panic,
    Fatal,
}

impl LogLevel {
    /// Parse a level name; unknown names mean `info`.
    pub fn parse_lenient(level: &str) -> Self {
        level.parse().unwrap_or_default()
    }

    /// The tracing level this maps onto.  The panic-class levels have no
    /// tracing counterpart and log as errors.
    pub fn as_tracing_level(&self) -> Level {
        match self {
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error | Self::DPanic | Self::Panic | Self::Fatal => Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = CsiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "dpanic" => Ok(Self::DPanic),
            "panic" => Ok(Self::Panic),
            "fatal" => Ok(Self::Fatal),
            other => Err(CsiError::InvalidArgument(format!("unknown log level {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// The independent node backends a node driver process can host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DriverKind {
    BlockVolume,
    FileStorage,
    Lustre,
}

impl DriverKind {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BlockVolume => "BV",
            Self::FileStorage => "FSS",
            Self::Lustre => "Lustre",
        }
    }

    /// CSI driver name registered with the kubelet.
    pub fn driver_name(&self) -> &'static str {
        match self {
            Self::BlockVolume => "blockvolume.csi.oraclecloud.com",
            Self::FileStorage => "fss.csi.oraclecloud.com",
            Self::Lustre => "lustre.csi.oraclecloud.com",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::BlockVolume => "unix://tmp/csi.sock",
            Self::FileStorage => "unix://tmp/fss/csi.sock",
            Self::Lustre => "unix:///lustre/csi.sock",
        }
    }
}

/// Options for one node backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeOptions {
    pub name: String,
    pub endpoint: String,
    pub node_id: String,
    #[serde(default)]
    pub kubeconfig: String,
    #[serde(default)]
    pub master: String,
    pub driver_name: String,
    pub driver_version: String,
    #[serde(default)]
    pub enable_controller_server: bool,
}

impl NodeOptions {
    /// Default options for `kind` on node `node_id`.
    pub fn for_driver(kind: DriverKind, node_id: impl Into<String>) -> Self {
        Self {
            name: kind.name().to_owned(),
            endpoint: kind.default_endpoint().to_owned(),
            node_id: node_id.into(),
            kubeconfig: String::new(),
            master: String::new(),
            driver_name: kind.driver_name().to_owned(),
            driver_version: env!("CARGO_PKG_VERSION").to_owned(),
            enable_controller_server: false,
        }
    }
}
