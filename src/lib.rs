//! Zabbix agent installer library
//!
//! Validates the target server, locates or downloads the agent package,
//! unpacks it, rewrites the agent configuration and starts the agent.

pub mod cli;
pub mod config;
pub mod control;
pub mod install;

pub use config::{FileConfig, InstallConfig, PackageSource};
pub use install::error::InstallerError;
pub use install::{InstallReport, run_install};
