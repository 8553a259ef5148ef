use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Deserialize;
use url::Url;

use crate::cli::Args;
use crate::install::cron::DEFAULT_SCHEDULE;
use crate::install::download::platform::{OsKind, Platform};
use crate::install::error::InstallerError;
use crate::install::preflight;

/// Server port used when neither the command line nor the file sets one
pub const DEFAULT_SERVER_PORT: u16 = 8001;

/// Account the Linux agent is normally installed under
pub const DEFAULT_LINUX_USER: &str = "cloud";

const LINUX_INDEX_URL: &str = "http://10.191.22.9:8001/software/zabbix-4.0/zabbix_agentd_linux/";
const WINDOWS_INDEX_URL: &str =
    "http://10.191.22.9:8001/software/zabbix-4.0/zabbix_agentd_windows/";

/// Optional on-disk defaults (`installer.toml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server_port: Option<u16>,
    pub user: Option<String>,
    pub install_dir: Option<PathBuf>,
    pub index_url: Option<String>,
    pub cron_schedule: Option<String>,
}

impl FileConfig {
    /// Default location: `<config dir>/zabbix-agent-installer/installer.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("zabbix-agent-installer").join("installer.toml"))
    }

    /// Load `path` if given (it must exist), else the default location if
    /// present, else built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.is_file() => p,
                _ => {
                    debug!("no configuration file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let cfg: FileConfig = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        info!("loaded configuration from {}", path.display());
        Ok(cfg)
    }
}

/// Where the agent package comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    /// A named file already inside the install directory
    File(String),
    /// An explicit download URL
    Url(Url),
    /// Look in the install directory, then scrape this listing
    Search { index_url: Url },
}

/// Validated installer settings, built once and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    pub platform: Platform,
    pub server_ip: Ipv4Addr,
    pub server_port: u16,
    pub agent_ip: Ipv4Addr,
    pub install_dir: PathBuf,
    pub user: Option<String>,
    pub package: PackageSource,
    pub cron_schedule: String,
    pub register_cron: bool,
    pub start_agent: bool,
}

impl InstallConfig {
    /// Merge command line, file and built-in defaults (in that order of
    /// precedence) and validate the result.
    pub fn resolve(args: &Args, file: &FileConfig, platform: Platform) -> Result<Self, InstallerError> {
        Self::resolve_with(args, file, platform, preflight::outbound_ipv4)
    }

    /// As [`InstallConfig::resolve`], with the agent ip fallback supplied.
    pub fn resolve_with<F>(
        args: &Args,
        file: &FileConfig,
        platform: Platform,
        outbound_ip: F,
    ) -> Result<Self, InstallerError>
    where
        F: FnOnce() -> Result<Ipv4Addr, InstallerError>,
    {
        let server_ip = match args.server_ip.as_deref() {
            None | Some("") => return Err(InstallerError::MissingServerIp),
            Some(s) => preflight::parse_ipv4(s)
                .ok_or_else(|| InstallerError::InvalidServerIp(s.to_string()))?,
        };

        let agent_ip = match args.agent_ip.as_deref() {
            Some(s) if !s.is_empty() => preflight::parse_ipv4(s)
                .ok_or_else(|| InstallerError::InvalidAgentIp(s.to_string()))?,
            _ => outbound_ip()?,
        };

        let package = if let Some(name) = args.package_file.as_deref().filter(|s| !s.is_empty()) {
            PackageSource::File(name.to_string())
        } else if let Some(url) = args.package_url.as_deref().filter(|s| !s.is_empty()) {
            PackageSource::Url(parse_package_url(url)?)
        } else {
            let index = args
                .index_url
                .as_deref()
                .or(file.index_url.as_deref())
                .unwrap_or(default_index_url(platform));
            PackageSource::Search {
                index_url: parse_package_url(index)?,
            }
        };

        let install_dir = match args.install_dir.clone().or_else(|| file.install_dir.clone()) {
            Some(dir) => dir,
            None => default_install_dir(platform)?,
        };

        let user = args
            .user
            .clone()
            .or_else(|| file.user.clone())
            .or_else(|| default_user(platform).map(str::to_string))
            .filter(|u| !u.is_empty());

        Ok(Self {
            platform,
            server_ip,
            server_port: args
                .server_port
                .or(file.server_port)
                .unwrap_or(DEFAULT_SERVER_PORT),
            agent_ip,
            install_dir,
            user,
            package,
            cron_schedule: file
                .cron_schedule
                .clone()
                .unwrap_or_else(|| DEFAULT_SCHEDULE.to_string()),
            register_cron: !args.no_cron,
            start_agent: !args.no_start,
        })
    }
}

/// Accept only absolute `http`/`https` URLs with a host.
pub fn parse_package_url(s: &str) -> Result<Url, InstallerError> {
    let url = Url::parse(s).map_err(|e| InstallerError::InvalidPackageUrl(format!("{s}: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(url),
        _ => Err(InstallerError::InvalidPackageUrl(s.to_string())),
    }
}

fn default_index_url(platform: Platform) -> &'static str {
    match platform.os {
        OsKind::Linux => LINUX_INDEX_URL,
        OsKind::Windows => WINDOWS_INDEX_URL,
    }
}

fn default_user(platform: Platform) -> Option<&'static str> {
    match platform.os {
        OsKind::Linux => Some(DEFAULT_LINUX_USER),
        OsKind::Windows => None,
    }
}

fn default_install_dir(platform: Platform) -> Result<PathBuf, InstallerError> {
    match platform.os {
        OsKind::Linux => dirs::home_dir()
            .ok_or_else(|| InstallerError::System("cannot determine home directory".to_string())),
        OsKind::Windows => Ok(PathBuf::from("C:\\")),
    }
}
