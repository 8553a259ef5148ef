//! Windows agent control using the agent's service flags

use std::ffi::OsStr;
use std::process::Command;

use anyhow::{Context, Result};
use log::{info, warn};

use super::run_checked;
use crate::install::layout::AgentLayout;

/// Kill every running `zabbix_agentd.exe` and its children
///
/// taskkill exits non-zero when nothing matched, which is not an error here.
pub fn stop_running_agents() -> Result<()> {
    let output = Command::new("taskkill")
        .args(["/F", "/IM", "zabbix_agentd.exe", "/T"])
        .output()
        .context("Failed to execute taskkill")?;

    if output.status.success() {
        info!("stopped running zabbix_agentd.exe");
    } else {
        info!("no running zabbix_agentd.exe to stop");
    }
    Ok(())
}

/// Re-register and start the agent service
///
/// Removing a previous service (`-d`) only warns; installing (`-i`) and
/// starting (`-s`) must succeed.
pub fn start_agent(layout: &AgentLayout) -> Result<()> {
    let bin_dir = layout.launcher_dir();

    if let Err(e) = service_command(layout, "-d") {
        warn!("uninstall previous agent service failed: {e:#}");
    }

    service_command(layout, "-i")
        .with_context(|| format!("Failed to install agent service from {}", bin_dir.display()))?;
    service_command(layout, "-s")
        .with_context(|| format!("Failed to start agent service from {}", bin_dir.display()))?;

    info!("agent service started");
    Ok(())
}

fn service_command(layout: &AgentLayout, flag: &str) -> Result<()> {
    let program = format!("zabbix_agentd.exe {flag}");
    info!("running {program}");

    run_checked(
        Command::new("cmd").current_dir(layout.launcher_dir()),
        &program,
        [
            OsStr::new("/C"),
            layout.launcher.as_os_str(),
            OsStr::new("-c"),
            layout.config.as_os_str(),
            OsStr::new(flag),
        ],
    )
}
