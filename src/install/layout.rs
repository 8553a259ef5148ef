//! Where the agent lives once unpacked.

use std::path::{Path, PathBuf};

use super::download::platform::{OsKind, Platform};

/// Paths of an installed agent, derived from the install directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentLayout {
    /// Directory the package unpacks into
    pub home: PathBuf,
    /// Agent configuration file
    pub config: PathBuf,
    /// Startup script (Linux) or agent executable (Windows)
    pub launcher: PathBuf,
}

impl AgentLayout {
    pub fn for_platform(install_dir: &Path, platform: Platform) -> Self {
        match platform.os {
            OsKind::Linux => Self::linux(install_dir),
            OsKind::Windows => Self::windows(install_dir),
        }
    }

    pub fn linux(install_dir: &Path) -> Self {
        let home = install_dir.join("zabbix_agentd");
        Self {
            config: home.join("etc").join("zabbix_agentd.conf"),
            launcher: home.join("zabbix_script.sh"),
            home,
        }
    }

    pub fn windows(install_dir: &Path) -> Self {
        let home = install_dir.join("zabbix");
        Self {
            config: home.join("conf").join("zabbix_agentd.conf"),
            launcher: home.join("bin").join("zabbix_agentd.exe"),
            home,
        }
    }

    /// Directory the launcher sits in; service commands run from here.
    pub fn launcher_dir(&self) -> &Path {
        self.launcher.parent().unwrap_or(&self.home)
    }
}
