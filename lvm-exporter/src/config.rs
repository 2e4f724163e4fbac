// SPDX-License-Identifier: GPL-3.0-only

//! Exporter configuration
//!
//! Settings come from command line flags, an optional TOML file and
//! built-in defaults, in that order of precedence.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use lvm_sys::{DevicePolicy, InventoryOptions, SystemCommandRunner};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9101";
pub const DEFAULT_TELEMETRY_PATH: &str = "/metrics";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid listen address {0:?}")]
    ListenAddress(String),

    #[error("telemetry path {0:?} must start with '/' and must not be '/'")]
    TelemetryPath(String),

    #[error("command timeout must be greater than zero")]
    ZeroTimeout,

    #[error("lvm binary directory {0:?} does not exist")]
    BinDir(PathBuf),
}

#[derive(Debug, Default, Parser)]
#[command(name = "lvm-exporter")]
#[command(version, about = "Prometheus exporter for LVM volume groups, logical volumes and physical volumes")]
pub struct Args {
    /// Address to listen on for web interface and telemetry [default: 0.0.0.0:9101]
    #[arg(long = "web.listen-address", value_name = "ADDR")]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics [default: /metrics]
    #[arg(long = "web.telemetry-path", value_name = "PATH")]
    pub telemetry_path: Option<String>,

    /// Directory holding vgs, lvs, pvs and pvscan instead of a PATH lookup
    #[arg(long = "lvm.bin-dir", value_name = "DIR")]
    pub bin_dir: Option<PathBuf>,

    /// Kill an LVM command still running after this many seconds
    #[arg(long = "lvm.command-timeout", value_name = "SECS")]
    pub command_timeout: Option<u64>,

    /// Run `pvscan --cache` before every listing
    #[arg(long = "lvm.reload-cache")]
    pub reload_cache: bool,

    /// Drop logical volumes whose path does not resolve instead of failing the scrape
    #[arg(long = "lvm.skip-unresolved-devices")]
    pub skip_unresolved_devices: bool,

    /// TOML file with the same settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Tracing filter directive, e.g. `debug` or `lvm_sys=trace`
    #[arg(long = "log-level", value_name = "FILTER")]
    pub log_level: Option<String>,
}

/// On-disk form of the configuration
///
/// ```toml
/// log-level = "info"
///
/// [web]
/// listen-address = "127.0.0.1:9101"
/// telemetry-path = "/metrics"
///
/// [lvm]
/// bin-dir = "/usr/sbin"
/// command-timeout = 30
/// reload-cache = false
/// device-policy = "skip-unresolved"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub log_level: Option<String>,
    pub web: WebSection,
    pub lvm: LvmSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct WebSection {
    pub listen_address: Option<String>,
    pub telemetry_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct LvmSection {
    pub bin_dir: Option<PathBuf>,
    pub command_timeout: Option<u64>,
    pub reload_cache: Option<bool>,
    pub device_policy: Option<DevicePolicy>,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Effective exporter settings
#[derive(Debug, Clone, PartialEq)]
pub struct ExporterConfig {
    pub listen_address: SocketAddr,
    pub telemetry_path: String,
    pub bin_dir: Option<PathBuf>,
    pub command_timeout: Option<Duration>,
    pub inventory: InventoryOptions,
    pub log_level: Option<String>,
}

impl ExporterConfig {
    /// Resolve and validate the settings for `args`, reading `--config` when given
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };
        let config = Self::merge(args, file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn merge(args: &Args, file: FileConfig) -> Result<Self, ConfigError> {
        let listen_address = args
            .listen_address
            .clone()
            .or(file.web.listen_address)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_string());
        let listen_address = listen_address
            .parse()
            .map_err(|_| ConfigError::ListenAddress(listen_address))?;

        let device_policy = if args.skip_unresolved_devices {
            DevicePolicy::SkipUnresolved
        } else {
            file.lvm.device_policy.unwrap_or_default()
        };

        Ok(Self {
            listen_address,
            telemetry_path: args
                .telemetry_path
                .clone()
                .or(file.web.telemetry_path)
                .unwrap_or_else(|| DEFAULT_TELEMETRY_PATH.to_string()),
            bin_dir: args.bin_dir.clone().or(file.lvm.bin_dir),
            command_timeout: args
                .command_timeout
                .or(file.lvm.command_timeout)
                .map(Duration::from_secs),
            inventory: InventoryOptions {
                reload_cache: args.reload_cache || file.lvm.reload_cache.unwrap_or(false),
                device_policy,
            },
            log_level: args.log_level.clone().or(file.log_level),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.telemetry_path.starts_with('/') || self.telemetry_path == "/" {
            return Err(ConfigError::TelemetryPath(self.telemetry_path.clone()));
        }

        if self.command_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::ZeroTimeout);
        }

        if let Some(dir) = &self.bin_dir
            && !dir.is_dir()
        {
            return Err(ConfigError::BinDir(dir.clone()));
        }

        Ok(())
    }

    pub fn command_runner(&self) -> SystemCommandRunner {
        SystemCommandRunner::new()
            .with_bin_dir(self.bin_dir.clone())
            .with_timeout(self.command_timeout)
    }
}
