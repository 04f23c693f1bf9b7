//! Target string handling.
//!
//! A target is `host` or `host:port`; the port defaults to 443. Targets that
//! look like URLs (`https://host:port/path`) are reduced to `host:port`.

use std::net::IpAddr;
use url::Url;

pub const DEFAULT_PORT: u16 = 443;

/// Returns the `host:port` form of a target.
///
/// The last `:` separates the port, so `[::1]:8443` is kept as is. Anything
/// without a colon gets `:443` appended. Malformed targets are passed through
/// and fail later at connect time.
pub fn normalize_target(target: &str) -> String {
    if target.contains("://") {
        if let Some(address) = url_address(target) {
            return address;
        }
    }
    if target.rfind(':').is_none() {
        format!("{}:{}", target, DEFAULT_PORT)
    } else {
        target.to_string()
    }
}

/// Host name to send as SNI for a normalized target, `None` for IP literals.
pub fn sni_host(address: &str) -> Option<&str> {
    let host = match address.rsplit_once(':') {
        Some((host, _)) => host,
        None => address,
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() || host.parse::<IpAddr>().is_ok() {
        None
    } else {
        Some(host)
    }
}

fn url_address(target: &str) -> Option<String> {
    let url = Url::parse(target).ok()?;
    let host = url.host_str()?;
    let port = url.port_or_known_default().unwrap_or(DEFAULT_PORT);
    Some(format!("{}:{}", host, port))
}
