//! Package discovery and download over HTTP

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::info;
use url::Url;

use super::listing::resolve_links;
use super::platform::Platform;
use crate::install::keywords::select_download_link;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const INDEX_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);
const USER_AGENT: &str = concat!("zabbix-agent-installer/", env!("CARGO_PKG_VERSION"));

fn client(timeout: Duration) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// Fetch a directory listing and return every link on it, absolute.
pub fn fetch_links(index_url: &Url) -> Result<Vec<String>> {
    let response = client(INDEX_TIMEOUT)?
        .get(index_url.as_str())
        .send()
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("Failed to fetch package index {index_url}"))?;

    let body = response
        .text()
        .with_context(|| format!("Failed to read package index {index_url}"))?;

    Ok(resolve_links(index_url, &body))
}

/// Find the agent package link for `platform` on a directory listing.
pub fn discover_package_url(index_url: &Url, platform: Platform) -> Result<Url> {
    let links = fetch_links(index_url)?;
    info!("found {} links on {}", links.len(), index_url);

    let link = select_download_link(&links, platform)?;
    Url::parse(&link).with_context(|| format!("Invalid package link {link}"))
}

/// File name a download is stored under: the last non-empty path segment.
pub fn package_file_name(url: &Url) -> Result<String> {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Package URL {url} has no file name"))
}

/// Download `url` into `dest_dir`, returning the saved path.
///
/// The body is streamed into a temporary file next to the destination and
/// only renamed into place once complete.
pub fn download_package(url: &Url, dest_dir: &Path) -> Result<PathBuf> {
    let file_name = package_file_name(url)?;
    let final_path = dest_dir.join(&file_name);

    info!("downloading {url}");
    let mut response = client(DOWNLOAD_TIMEOUT)?
        .get(url.as_str())
        .send()
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("Failed to download {url}"))?;

    let temp = tempfile::Builder::new()
        .prefix(".download-")
        .tempfile_in(dest_dir)
        .with_context(|| format!("Failed to create temp file in {}", dest_dir.display()))?;

    let mut writer = BufWriter::new(temp);
    let bytes = response
        .copy_to(&mut writer)
        .with_context(|| format!("Failed to save {url}"))?;
    writer.flush()?;
    let temp = writer.into_inner().map_err(|e| e.into_error())?;

    temp.persist(&final_path)
        .with_context(|| format!("Failed to move download to {}", final_path.display()))?;

    info!("{file_name} ({bytes} bytes) was saved to {}", dest_dir.display());
    Ok(final_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_from_url() {
        let url = Url::parse("http://mirror/pkg/zabbix_agent-4.0-linux.tar.gz").unwrap();
        assert_eq!(package_file_name(&url).unwrap(), "zabbix_agent-4.0-linux.tar.gz");

        let trailing = Url::parse("http://mirror/pkg/zabbix_agent.zip/").unwrap();
        assert_eq!(package_file_name(&trailing).unwrap(), "zabbix_agent.zip");

        let bare = Url::parse("http://mirror/").unwrap();
        assert!(package_file_name(&bare).is_err());
    }
}
