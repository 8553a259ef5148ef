//! Periodic health check through the user's crontab.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use log::{debug, info, warn};

use super::error::{InstallerError, Result};

/// Run the health check every ten minutes unless configured otherwise
pub const DEFAULT_SCHEDULE: &str = "*/10 * * * *";

/// Crontab line that invokes the startup script in daemon mode.
pub fn health_check_entry(schedule: &str, script: &Path) -> String {
    format!(
        "{schedule} /bin/sh {} daemon > /dev/null 2>&1",
        script.display()
    )
}

/// True when an uncommented line already runs the agent.
pub fn has_agent_entry(table: &str) -> bool {
    table
        .lines()
        .any(|line| !line.starts_with('#') && line.contains("zabbix_agentd"))
}

/// Append `entry` to `existing`, or `None` if the table already has one.
pub fn merge_crontab(existing: &str, entry: &str) -> Option<String> {
    if has_agent_entry(existing) {
        return None;
    }
    let mut table = existing.to_string();
    if !table.is_empty() && !table.ends_with('\n') {
        table.push('\n');
    }
    table.push_str(entry);
    table.push('\n');
    Some(table)
}

/// Current user's crontab; a missing table reads as empty.
fn read_crontab(crontab: &Path) -> String {
    match Command::new(crontab).arg("-l").output() {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).into_owned()
        }
        Ok(output) => {
            debug!(
                "crontab -l exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            String::new()
        }
        Err(e) => {
            debug!("crontab -l failed: {e}");
            String::new()
        }
    }
}

/// Register the health check, leaving an existing agent entry alone.
///
/// Returns whether the crontab was changed.
pub fn install_crontab(schedule: &str, script: &Path) -> Result<bool> {
    let crontab = which::which("crontab").map_err(|e| InstallerError::Command {
        command: "crontab".to_string(),
        detail: e.to_string(),
    })?;

    let existing = read_crontab(&crontab);
    let entry = health_check_entry(schedule, script);
    let Some(table) = merge_crontab(&existing, &entry) else {
        warn!("crontab already has a zabbix_agentd entry, skipping");
        return Ok(false);
    };

    let mut file = tempfile::Builder::new()
        .prefix("crontab-")
        .tempfile()
        .map_err(|e| InstallerError::io(std::env::temp_dir(), e))?;
    if let Err(e) = file.write_all(table.as_bytes()).and_then(|_| file.flush()) {
        return Err(InstallerError::io(file.path(), e));
    }

    let output = Command::new(&crontab)
        .arg(file.path())
        .output()
        .map_err(|e| InstallerError::Command {
            command: format!("crontab {}", file.path().display()),
            detail: e.to_string(),
        })?;
    if !output.status.success() {
        return Err(InstallerError::Command {
            command: format!("crontab {}", file.path().display()),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    info!("add crontab entry: {entry}");
    Ok(true)
}
