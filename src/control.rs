//! Agent process control - delegates to the OS-native mechanism
//!
//! - Linux: the packaged `zabbix_script.sh` run through `sh`
//! - Windows: the agent executable's own service flags via `cmd /C`

use std::ffi::OsStr;
use std::process::Command;

use anyhow::{Context, Result};
use sysinfo::{ProcessesToUpdate, System};

use crate::install::layout::AgentLayout;

// Platform-specific implementations
cfg_if::cfg_if! {
    if #[cfg(target_os = "windows")] {
        mod windows_control;
        use windows_control as platform;
    } else {
        mod linux_control;
        use linux_control as platform;
    }
}

/// Process name the agent runs under
pub const AGENT_PROCESS: &str = "zabbix_agentd";

/// Stop agents left running by an earlier install (Windows only; the
/// Linux startup script restarts in place)
#[cfg(windows)]
pub fn stop_running_agents() -> Result<()> {
    platform::stop_running_agents()
}

/// Start (or restart) the installed agent
pub fn start_agent(layout: &AgentLayout) -> Result<()> {
    platform::start_agent(layout)
}

/// Pids of running processes whose name contains `zabbix_agentd`
pub fn running_agent_pids() -> Vec<u32> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let mut pids: Vec<u32> = system
        .processes()
        .iter()
        .filter(|(_, process)| process.name().to_string_lossy().contains(AGENT_PROCESS))
        .map(|(pid, _)| pid.as_u32())
        .collect();
    pids.sort_unstable();
    pids
}

/// Run `program args..` to completion and fail on a non-zero exit.
pub(crate) fn run_checked<I, S>(command: &mut Command, program: &str, args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = command
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute {program}"))?;

    if !output.status.success() {
        anyhow::bail!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(())
}
