//! Host and network checks run before anything touches the disk.

use std::net::{Ipv4Addr, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use log::{debug, info, warn};

use super::error::{InstallerError, Result};

/// Timeout for the advisory server reachability probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Public resolver used only to learn which local address routes outward
const ROUTE_PROBE: &str = "8.8.8.8:53";

/// Parse a dotted-quad IPv4 address.
pub fn parse_ipv4(s: &str) -> Option<Ipv4Addr> {
    s.parse().ok()
}

/// True for exactly four dot-separated decimal octets in 0..=255.
pub fn is_ipv4(s: &str) -> bool {
    parse_ipv4(s).is_some()
}

/// Try a TCP connection to `host:port` within `timeout`.
pub fn is_reachable(host: &str, port: u16, timeout: Duration) -> bool {
    let addrs: Vec<SocketAddr> = match (host, port).to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(e) => {
            debug!("cannot resolve {host}:{port}: {e}");
            return false;
        }
    };
    addrs
        .iter()
        .any(|addr| TcpStream::connect_timeout(addr, timeout).is_ok())
}

/// Log whether the server answers; never fails the install.
pub fn probe_server(host: &str, port: u16) -> bool {
    let reachable = is_reachable(host, port, PROBE_TIMEOUT);
    if reachable {
        info!("connect to {host}:{port} successfully");
    } else {
        warn!("connect to {host}:{port} failed");
    }
    reachable
}

/// Local IPv4 address the OS would use for outbound traffic.
///
/// Connecting a UDP socket only selects a route; nothing is sent.
pub fn outbound_ipv4() -> Result<Ipv4Addr> {
    let socket = UdpSocket::bind(("0.0.0.0", 0))
        .map_err(|e| InstallerError::System(format!("get agent ip failed: {e}")))?;
    socket
        .connect(ROUTE_PROBE)
        .map_err(|e| InstallerError::System(format!("get agent ip failed: {e}")))?;

    match socket.local_addr() {
        Ok(SocketAddr::V4(addr)) if !addr.ip().is_unspecified() => Ok(*addr.ip()),
        Ok(other) => Err(InstallerError::System(format!(
            "get agent ip failed: no usable local address ({})",
            other.ip()
        ))),
        Err(e) => Err(InstallerError::System(format!("get agent ip failed: {e}"))),
    }
}

/// Name of the user running the installer.
pub fn current_user() -> Result<String> {
    #[cfg(unix)]
    {
        let uid = nix::unistd::getuid();
        match nix::unistd::User::from_uid(uid) {
            Ok(Some(user)) => Ok(user.name),
            Ok(None) => Err(InstallerError::System(format!("no passwd entry for uid {uid}"))),
            Err(e) => Err(InstallerError::System(format!("get current user failed: {e}"))),
        }
    }

    #[cfg(not(unix))]
    {
        std::env::var("USERNAME")
            .map_err(|e| InstallerError::System(format!("get current user failed: {e}")))
    }
}

/// Refuse to install as anyone other than the configured user.
///
/// Windows reports `DOMAIN\user`, so only the trailing name is compared.
pub fn ensure_install_user(expected: Option<&str>, current: &str) -> Result<()> {
    let Some(expected) = expected.filter(|u| !u.is_empty()) else {
        return Ok(());
    };
    let current_name = current.rsplit('\\').next().unwrap_or(current);
    if current_name.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(InstallerError::UserMismatch {
            expected: expected.to_string(),
            current: current.to_string(),
        })
    }
}
