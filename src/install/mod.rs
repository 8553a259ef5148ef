//! Agent installation pipeline
//!
//! `run_install` drives the steps in order: user and server checks,
//! locating or downloading the package, unpacking, rewriting the agent's
//! configuration, starting it and registering the crontab health check.
//! Each step either succeeds or returns an error naming the step; nothing
//! is retried or rolled back.

pub mod cron;
pub mod download;
pub mod error;
pub mod extract;
pub mod keywords;
pub mod layout;
pub mod preflight;
pub mod rewrite;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info, warn};
use regex::bytes::Regex;

use crate::config::{InstallConfig, PackageSource};
use crate::control;
use download::platform::OsKind;
use error::InstallerError;
use extract::ExtractSummary;
use layout::AgentLayout;
use rewrite::Placeholders;

/// Config placeholder for the agent's home directory
pub const BASEPATH_TOKEN: &str = "%change_basepath%";
/// Config placeholder for the server address
pub const SERVER_IP_TOKEN: &str = "%change_serverip%";
/// Config placeholder for the agent's own address
pub const HOSTNAME_TOKEN: &str = "%change_hostname%";

/// What a completed run did
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub package: PathBuf,
    pub layout: AgentLayout,
    pub extracted: ExtractSummary,
    pub agent_pids: Vec<u32>,
    pub cron_registered: bool,
}

/// Run every installation step for `cfg`.
pub fn run_install(cfg: &InstallConfig) -> Result<InstallReport> {
    info!(
        "server ip: {}, server port: {}, agent user: {}, agent dir: {}, agent ip: {}",
        cfg.server_ip,
        cfg.server_port,
        cfg.user.as_deref().unwrap_or("-"),
        cfg.install_dir.display(),
        cfg.agent_ip
    );

    let current = preflight::current_user().context("Failed to determine current user")?;
    preflight::ensure_install_user(cfg.user.as_deref(), &current)?;

    preflight::probe_server(&cfg.server_ip.to_string(), cfg.server_port);

    let package = locate_package(cfg)?;
    info!("get the package name is {}", package.display());

    let layout = AgentLayout::for_platform(&cfg.install_dir, cfg.platform);
    if cfg.platform.os == OsKind::Windows {
        prepare_windows_home(&layout)?;
    }

    info!("starting unpacking {}", package.display());
    let extracted = extract::extract_package(&package, &cfg.install_dir)
        .with_context(|| format!("Failed to unpack {}", package.display()))?;
    info!(
        "unpacking {} successfully ({} dirs, {} files, {} bytes)",
        package.display(),
        extracted.directories,
        extracted.files,
        extracted.bytes
    );

    configure_agent(cfg, &layout)?;

    let mut agent_pids = Vec::new();
    if cfg.start_agent {
        info!("starting to start the zabbix agent...");
        control::start_agent(&layout)?;
        info!("starting the zabbix agent successfully.");

        agent_pids = control::running_agent_pids();
        for pid in &agent_pids {
            info!("pid: {pid}, name: {}", control::AGENT_PROCESS);
        }
    } else {
        info!("not starting the agent (--no-start)");
    }

    let mut cron_registered = false;
    if cfg.platform.os == OsKind::Linux && cfg.register_cron {
        info!("starting write cron...");
        match cron::install_crontab(&cfg.cron_schedule, &layout.launcher) {
            Ok(changed) => {
                cron_registered = changed;
                info!("write crontab successfully.");
            }
            Err(e) => error!("write crontab failed: {e:#}"),
        }
    }

    info!("the zabbix agent installer is running done.");
    Ok(InstallReport {
        package,
        layout,
        extracted,
        agent_pids,
        cron_registered,
    })
}

/// Resolve the package to install, downloading it when needed.
pub fn locate_package(cfg: &InstallConfig) -> Result<PathBuf> {
    let dir = &cfg.install_dir;
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create install dir {}", dir.display()))?;

    match &cfg.package {
        PackageSource::File(name) => {
            let path = dir.join(name);
            if path.is_file() {
                Ok(path)
            } else {
                Err(InstallerError::NoPackageFound(format!("{} does not exist", path.display())).into())
            }
        }
        PackageSource::Url(url) => {
            info!("get the zabbix package link: {url}");
            download::download_package(url, dir)
        }
        PackageSource::Search { index_url } => {
            info!("starting to get the zabbix agent package name.");
            let names = file_names(dir)?;
            match keywords::select_package_name(&names, cfg.platform) {
                Ok(name) => Ok(dir.join(name)),
                Err(e) => {
                    warn!("{e}");
                    info!("starting to search package from {index_url}");
                    let url = download::discover_package_url(index_url, cfg.platform)?;
                    info!("get the zabbix package link: {url}");
                    download::download_package(&url, dir)
                }
            }
        }
    }
}

/// Names of the regular files directly inside `dir`.
fn file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false)
            && let Some(name) = entry.file_name().to_str()
        {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// The Windows agent home must be a directory with no agent running in it.
fn prepare_windows_home(layout: &AgentLayout) -> Result<()> {
    match fs::symlink_metadata(&layout.home) {
        Ok(meta) if meta.is_dir() => {
            #[cfg(windows)]
            {
                control::stop_running_agents()?;
                info!("stop zabbix agent successfully.");
            }
            Ok(())
        }
        Ok(_) => Err(InstallerError::PathInUse(layout.home.clone()).into()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(&layout.home)
                .with_context(|| format!("Failed to create {}", layout.home.display()))
        }
        Err(e) => Err(InstallerError::io(&layout.home, e).into()),
    }
}

/// Point the unpacked agent at the server.
pub fn configure_agent(cfg: &InstallConfig, layout: &AgentLayout) -> Result<()> {
    let home = layout.home.display().to_string();

    info!("starting to modify the zabbix agent conf...");
    match cfg.platform.os {
        OsKind::Linux => {
            let placeholders = Placeholders::new()
                .with(BASEPATH_TOKEN, home.as_str())
                .with(SERVER_IP_TOKEN, cfg.server_ip.to_string())
                .with(HOSTNAME_TOKEN, cfg.agent_ip.to_string());
            rewrite::rewrite_placeholders(&layout.config, &placeholders)
                .with_context(|| format!("Failed to modify {}", layout.config.display()))?;
        }
        OsKind::Windows => {
            rewrite::rewrite_matching_lines(&layout.config, &windows_rules(cfg)?)
                .with_context(|| format!("Failed to modify {}", layout.config.display()))?;
        }
    }
    info!("modify the zabbix agent conf successfully.");

    if cfg.platform.os == OsKind::Linux {
        info!("starting to modify the zabbix agent script...");
        let placeholders = Placeholders::new().with(BASEPATH_TOKEN, home);
        rewrite::rewrite_placeholders(&layout.launcher, &placeholders)
            .with_context(|| format!("Failed to modify {}", layout.launcher.display()))?;
        info!("modify the zabbix agent script successfully.");
    }

    Ok(())
}

fn windows_rules(cfg: &InstallConfig) -> Result<Vec<(Regex, String)>> {
    Ok(vec![
        (
            Regex::new(r".*ServerActive=.*")?,
            format!("ServerActive={}", cfg.server_ip),
        ),
        (
            Regex::new(r".*Hostname=.*")?,
            format!("Hostname={}", cfg.agent_ip),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstallConfig;
    use crate::install::cron::DEFAULT_SCHEDULE;
    use crate::install::download::platform::{Arch, Platform};
    use std::net::Ipv4Addr;

    fn config(os: OsKind, dir: &Path, package: PackageSource) -> InstallConfig {
        InstallConfig {
            platform: Platform::new(os, Arch::X86_64),
            server_ip: Ipv4Addr::new(10, 0, 0, 5),
            server_port: 8001,
            agent_ip: Ipv4Addr::new(10, 0, 0, 9),
            install_dir: dir.to_path_buf(),
            user: None,
            package,
            cron_schedule: DEFAULT_SCHEDULE.to_string(),
            register_cron: false,
            start_agent: false,
        }
    }

    fn search() -> PackageSource {
        PackageSource::Search {
            index_url: url::Url::parse("http://127.0.0.1:9/unused/").unwrap(),
        }
    }

    #[test]
    fn finds_local_package() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("zabbix_agent-4.0.0-linux-amd64.tar.gz"), b"").unwrap();
        fs::write(dir.path().join("zabbix_agent-4.0.0-win-amd64.zip"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let cfg = config(OsKind::Linux, dir.path(), search());
        assert_eq!(
            locate_package(&cfg).unwrap(),
            dir.path().join("zabbix_agent-4.0.0-linux-amd64.tar.gz")
        );
    }

    #[test]
    fn named_package_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(
            OsKind::Linux,
            dir.path(),
            PackageSource::File("zabbix_agent.tar.gz".to_string()),
        );
        let err = locate_package(&cfg).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InstallerError>(),
            Some(InstallerError::NoPackageFound(_))
        ));
    }

    #[test]
    fn configures_linux_agent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = AgentLayout::linux(dir.path());
        fs::create_dir_all(layout.config.parent().unwrap()).unwrap();
        fs::write(
            &layout.config,
            "ServerActive=%change_serverip%\nHostname=%change_hostname%\nLogFile=%change_basepath%/log\n",
        )
        .unwrap();
        fs::write(&layout.launcher, "BASE=%change_basepath%\n").unwrap();

        let cfg = config(OsKind::Linux, dir.path(), search());
        configure_agent(&cfg, &layout).unwrap();

        let home = layout.home.display();
        assert_eq!(
            fs::read_to_string(&layout.config).unwrap(),
            format!("ServerActive=10.0.0.5\nHostname=10.0.0.9\nLogFile={home}/log\n")
        );
        assert_eq!(
            fs::read_to_string(&layout.launcher).unwrap(),
            format!("BASE={home}\n")
        );
    }

    #[test]
    fn configures_windows_agent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = AgentLayout::windows(dir.path());
        fs::create_dir_all(layout.config.parent().unwrap()).unwrap();
        fs::write(
            &layout.config,
            "ServerActive=127.0.0.1\r\n# Timeout=3\r\nHostname=Windows host\r\n",
        )
        .unwrap();

        let cfg = config(OsKind::Windows, dir.path(), search());
        configure_agent(&cfg, &layout).unwrap();

        assert_eq!(
            fs::read_to_string(&layout.config).unwrap(),
            "ServerActive=10.0.0.5\r\n# Timeout=3\r\nHostname=10.0.0.9\r\n"
        );
    }

    #[test]
    fn windows_home_must_not_be_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let layout = AgentLayout::windows(dir.path());
        fs::write(&layout.home, b"").unwrap();

        let err = prepare_windows_home(&layout).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InstallerError>(),
            Some(InstallerError::PathInUse(_))
        ));
    }

    #[cfg(not(windows))]
    #[test]
    fn existing_windows_home_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let layout = AgentLayout::windows(dir.path());
        fs::create_dir_all(layout.home.join("bin")).unwrap();

        prepare_windows_home(&layout).unwrap();
        assert!(layout.home.join("bin").is_dir());
    }

    #[test]
    fn windows_home_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let layout = AgentLayout::windows(dir.path());
        prepare_windows_home(&layout).unwrap();
        assert!(layout.home.is_dir());
    }
}
