//! Public IP discovery.

use crate::error::{FwError, Result};
use std::net::Ipv4Addr;

/// Parse the body of a "what is my IP" service.
pub fn parse_ip_response(body: &str) -> Result<Ipv4Addr> {
    let body = body.trim();
    body.parse::<Ipv4Addr>()
        .map_err(|_| FwError::IpLookup(format!("response is not an IPv4 address: {body:?}")))
}

/// Ask `url` for the caller's public IPv4 address.
pub async fn resolve_public_ip(url: &str) -> Result<Ipv4Addr> {
    log::debug!("Looking up public IP via {url}");
    let response = reqwest::get(url)
        .await
        .map_err(|e| FwError::IpLookup(format!("{url}: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(FwError::IpLookup(format!("{url}: HTTP {status}")));
    }
    let body = response
        .text()
        .await
        .map_err(|e| FwError::IpLookup(format!("{url}: {e}")))?;
    let ip = parse_ip_response(&body)?;
    log::info!("Current public IP: {ip}");
    Ok(ip)
}
