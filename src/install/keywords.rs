//! Keyword classification of package file names and download links.

use log::debug;

use super::download::platform::Platform;
use super::error::{InstallerError, Result};

/// Archive suffixes the extractor understands
pub const ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".zip"];

/// Keywords every package file name must contain
pub const PACKAGE_KEYWORDS: &[&str] = &["zabbix", "agent"];

/// Download links must carry one of these
pub const LINK_KEYWORDS: &[&str] = &["zabbix-agent", "zabbix_agent"];

/// True when `s` contains every keyword (vacuously true for none).
pub fn contains_all(s: &str, keywords: &[&str]) -> bool {
    keywords.iter().all(|k| s.contains(k))
}

/// True when `s` contains at least one keyword.
pub fn contains_any(s: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| s.contains(k))
}

/// True when `name` looks like an agent package for any platform.
pub fn is_package_candidate(name: &str) -> bool {
    contains_all(name, PACKAGE_KEYWORDS) && ARCHIVE_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Pick the agent package for `platform` out of a directory listing.
///
/// Names are compared in sorted order and the greatest match wins, so with
/// versioned names the newest package is chosen regardless of the order the
/// filesystem returned them in.
pub fn select_package_name<S: AsRef<str>>(names: &[S], platform: Platform) -> Result<String> {
    let mut matches: Vec<&str> = names
        .iter()
        .map(|s| s.as_ref())
        .filter(|name| is_package_candidate(name) && name.contains(platform.os_keyword()))
        .collect();
    matches.sort_unstable();

    debug!("package candidates: {matches:?}");

    matches
        .last()
        .map(|s| s.to_string())
        .ok_or_else(|| {
            InstallerError::NoPackageFound(format!(
                "no {} package in directory",
                platform.os_keyword()
            ))
        })
}

/// Last path segment of a link, without query or fragment.
///
/// Keywords are matched against this only: a listing's own URL (for
/// example `.../zabbix_agentd_linux/`) would otherwise satisfy them for
/// every link on the page.
pub fn link_file_name(link: &str) -> &str {
    let path = link.split(['?', '#']).next().unwrap_or(link);
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// True when `link` names an agent package for `platform`.
pub fn is_download_candidate(link: &str, platform: Platform) -> bool {
    let name = link_file_name(link);
    contains_any(name, LINK_KEYWORDS)
        && ARCHIVE_SUFFIXES.iter().any(|s| name.ends_with(s))
        && name.contains(platform.os_keyword())
        && contains_any(name, platform.arch_keywords())
}

/// Pick the download link for `platform` out of scraped links.
///
/// Links may be raw hrefs or already resolved against the listing URL.
/// The last matching link in page order wins.
pub fn select_download_link<S: AsRef<str>>(links: &[S], platform: Platform) -> Result<String> {
    links
        .iter()
        .map(|s| s.as_ref())
        .filter(|link| is_download_candidate(link, platform))
        .next_back()
        .map(str::to_string)
        .ok_or_else(|| {
            InstallerError::NoPackageFound(format!(
                "no {} {:?} link on the package index",
                platform.os_keyword(),
                platform.arch
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::download::platform::{Arch, OsKind};
    use crate::install::download::resolve_links;
    use url::Url;

    const LINUX: Platform = Platform::new(OsKind::Linux, Arch::X86_64);
    const WINDOWS: Platform = Platform::new(OsKind::Windows, Arch::X86_64);

    #[test]
    fn contains_helpers() {
        assert!(contains_any("windows", &["win", "linux"]));
        assert!(!contains_any("windows", &["winx", "linux"]));
        assert!(contains_all("windows", &["win", "wi", "w", "windows"]));
        assert!(!contains_all("windows", &["win", "linux"]));
        assert!(contains_all("anything", &[]));
        assert!(!contains_any("anything", &[]));
    }

    #[test]
    fn classifies_package_names() {
        assert!(is_package_candidate("zabbix-agent-5.0-linux.tar.gz"));
        assert!(!is_package_candidate("agent-5.0-linux.tar.gz"));
        assert!(!is_package_candidate("zabbix-agent-5.0-linux.rpm"));
    }

    #[test]
    fn selects_greatest_matching_package() {
        let names = [
            "notes.txt",
            "zabbix_agent-5.0-linux.tar.gz",
            "zabbix_agent-4.0-linux.tar.gz",
            "zabbix_agent-5.0-win-amd64.zip",
        ];
        assert_eq!(select_package_name(&names, LINUX).unwrap(), "zabbix_agent-5.0-linux.tar.gz");
        assert_eq!(select_package_name(&names, WINDOWS).unwrap(), "zabbix_agent-5.0-win-amd64.zip");
    }

    #[test]
    fn no_package_is_an_error() {
        let err = select_package_name(&["readme.md"], LINUX).unwrap_err();
        assert!(matches!(err, InstallerError::NoPackageFound(_)));
    }

    #[test]
    fn selects_last_link_for_platform() {
        let links = [
            "http://mirror/pkg/zabbix_agent-4.0-linux-3.0-386.tar.gz",
            "http://mirror/pkg/zabbix_agent-4.0-linux-3.0-amd64.tar.gz",
            "http://mirror/pkg/zabbix_agent-4.4-linux-3.0-amd64.tar.gz",
            "http://mirror/pkg/zabbix_agent-4.4-win-amd64.zip",
            "http://mirror/pkg/",
        ];
        assert_eq!(
            select_download_link(&links, LINUX).unwrap(),
            "http://mirror/pkg/zabbix_agent-4.4-linux-3.0-amd64.tar.gz"
        );
        assert_eq!(
            select_download_link(&links, WINDOWS).unwrap(),
            "http://mirror/pkg/zabbix_agent-4.4-win-amd64.zip"
        );

        let x86 = Platform::new(OsKind::Linux, Arch::X86);
        assert_eq!(
            select_download_link(&links, x86).unwrap(),
            "http://mirror/pkg/zabbix_agent-4.0-linux-3.0-386.tar.gz"
        );
    }

    #[test]
    fn file_name_of_link() {
        assert_eq!(link_file_name("http://m/zabbix_agentd_linux/a.tar.gz"), "a.tar.gz");
        assert_eq!(link_file_name("a.zip?download=1#top"), "a.zip");
        assert_eq!(link_file_name("http://m/zabbix_agentd_linux/"), "zabbix_agentd_linux");
        assert_eq!(link_file_name("plain"), "plain");
    }

    #[test]
    fn listing_directory_does_not_count_as_keyword() {
        let windows_index = Url::parse("http://10.191.22.9:8001/software/zabbix-4.0/zabbix_agentd_windows/").unwrap();
        let page = r#"<pre><a href="../">../</a>
<a href="zabbix_agent-4.0.0-win-amd64.zip">win</a>
<a href="zabbix_agent-4.0.0-linux-3.0-amd64.tar.gz">linux</a>
</pre>"#;
        let links = resolve_links(&windows_index, page);
        assert_eq!(
            select_download_link(&links, WINDOWS).unwrap(),
            "http://10.191.22.9:8001/software/zabbix-4.0/zabbix_agentd_windows/zabbix_agent-4.0.0-win-amd64.zip"
        );

        let linux_index = Url::parse("http://10.191.22.9:8001/software/zabbix-4.0/zabbix_agentd_linux/").unwrap();
        let page = r#"<a href="zabbix_agent-4.0.0-linux-3.0-amd64.tar.gz">pkg</a>
<a href="release-notes-amd64.txt">notes</a>
<a href="zabbix_agent-4.0.0-linux-3.0-amd64.tar.gz.sha256">sum</a>"#;
        let links = resolve_links(&linux_index, page);
        assert_eq!(
            select_download_link(&links, LINUX).unwrap(),
            "http://10.191.22.9:8001/software/zabbix-4.0/zabbix_agentd_linux/zabbix_agent-4.0.0-linux-3.0-amd64.tar.gz"
        );

        let only_notes = resolve_links(&linux_index, r#"<a href="release-notes-amd64.txt">n</a>"#);
        assert!(select_download_link(&only_notes, LINUX).is_err());
    }

    #[test]
    fn no_link_is_an_error() {
        let arm = Platform::new(OsKind::Linux, Arch::Aarch64);
        assert!(select_download_link(&["http://x/zabbix_agent-linux-amd64.tar.gz"], arm).is_err());
    }
}
