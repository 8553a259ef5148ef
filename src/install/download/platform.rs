//! Platform detection for package and download-link selection

use once_cell::sync::OnceCell;

use crate::install::error::{InstallerError, Result};

/// Operating systems the installer knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKind {
    Linux,
    Windows,
}

/// CPU architectures recognised in package names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    X86,
    Aarch64,
}

/// Host platform as seen by package selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: OsKind,
    pub arch: Arch,
}

/// Global cache for platform detection (initialized once, used everywhere)
static PLATFORM_CACHE: OnceCell<Platform> = OnceCell::new();

impl Platform {
    pub const fn new(os: OsKind, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detect current platform (cached after first call)
    pub fn detect() -> Result<Self> {
        PLATFORM_CACHE
            .get_or_try_init(|| Self::from_consts(std::env::consts::OS, std::env::consts::ARCH))
            .copied()
    }

    /// Map Rust target names onto a supported platform
    pub fn from_consts(os: &str, arch: &str) -> Result<Self> {
        let unsupported = || InstallerError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let os_kind = match os {
            "linux" => OsKind::Linux,
            "windows" => OsKind::Windows,
            _ => return Err(unsupported()),
        };
        let arch_kind = match arch {
            "x86_64" => Arch::X86_64,
            "x86" => Arch::X86,
            "aarch64" => Arch::Aarch64,
            _ => return Err(unsupported()),
        };

        Ok(Self::new(os_kind, arch_kind))
    }

    /// Keyword a package name must contain for this OS
    pub fn os_keyword(&self) -> &'static str {
        match self.os {
            OsKind::Linux => "linux",
            OsKind::Windows => "win",
        }
    }

    /// Keywords of which a download link must contain at least one
    pub fn arch_keywords(&self) -> &'static [&'static str] {
        match self.arch {
            Arch::X86_64 => &["amd64", "x86_64"],
            Arch::X86 => &["386", "i686"],
            Arch::Aarch64 => &["arm64", "aarch64"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_supported_targets() {
        let p = Platform::from_consts("linux", "x86_64").unwrap();
        assert_eq!(p, Platform::new(OsKind::Linux, Arch::X86_64));
        assert_eq!(p.os_keyword(), "linux");
        assert!(p.arch_keywords().contains(&"amd64"));

        let w = Platform::from_consts("windows", "x86_64").unwrap();
        assert_eq!(w.os_keyword(), "win");
    }

    #[test]
    fn rejects_unknown_os() {
        let err = Platform::from_consts("macos", "aarch64").unwrap_err();
        assert!(matches!(err, InstallerError::UnsupportedPlatform { .. }));
    }

    #[test]
    fn rejects_unknown_arch() {
        assert!(Platform::from_consts("linux", "riscv64").is_err());
    }
}
