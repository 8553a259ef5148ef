//! Linux agent control using the packaged startup script

use std::ffi::OsStr;
use std::process::Command;

use anyhow::{Context, Result};
use log::info;

use super::run_checked;
use crate::install::layout::AgentLayout;

/// Restart the agent via `sh zabbix_script.sh restart`
pub fn start_agent(layout: &AgentLayout) -> Result<()> {
    let script = &layout.launcher;
    info!("starting agent: sh {} restart", script.display());

    run_checked(
        Command::new("sh").current_dir(&layout.home),
        "sh zabbix_script.sh restart",
        [script.as_os_str(), OsStr::new("restart")],
    )
    .with_context(|| format!("Failed to start agent from {}", layout.home.display()))
}
