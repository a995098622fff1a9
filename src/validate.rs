//! Input validation for URLs handed to the remote service
//!
//! Target URLs must be http/https and must not point at private or
//! loopback addresses; the remote browser would otherwise be steered at
//! the service's own network.

use crate::error::{Error, Result};
use std::net::IpAddr;
use url::Url;

/// Validate a URL destined for the remote browser (task start URL,
/// scrape target, batch entry).
pub fn check_url(raw: &str) -> Result<()> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("URL is empty".to_string()));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| Error::Validation(format!("Invalid URL '{}': {}", trimmed, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::Validation(format!(
                "Unsupported URL scheme '{}': only http and https are allowed",
                other
            )));
        }
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| Error::Validation(format!("URL '{}' has no host", trimmed)))?;

    // Literal IP hosts must be publicly routable; domain names pass through.
    if let Ok(ip) = host.trim_matches(['[', ']']).parse::<IpAddr>() {
        if !is_public(ip) {
            return Err(Error::Validation(format!(
                "URL host {} is a private or local address",
                ip
            )));
        }
    }

    Ok(())
}

fn is_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            // IPv4-mapped addresses answer for their embedded v4 host.
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_public(IpAddr::V4(mapped));
            }
            let first = v6.segments()[0];
            let link_local = (first & 0xffc0) == 0xfe80;
            let unique_local = (first & 0xfe00) == 0xfc00;
            !(v6.is_loopback() || v6.is_unspecified() || link_local || unique_local)
        }
    }
}
