use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Ledger key used for every loopback form.
pub const LOOPBACK: &str = "127.0.0.1";
/// Ledger key used when the client address could not be determined.
pub const UNKNOWN: &str = "unknown";

/// Collapses equivalent client address spellings into one ledger key.
///
/// Handles forwarded lists (`a, b`), ports (`1.2.3.4:80`, `[::1]:80`),
/// IPv4-mapped IPv6 (`::ffff:1.2.3.4`) and every loopback form.
pub fn normalize_address(raw: &str) -> String {
    let first_hop = raw.split(',').next().unwrap_or_default().trim();
    if first_hop.is_empty() {
        return UNKNOWN.to_string();
    }
    if first_hop.eq_ignore_ascii_case("localhost") {
        return LOOPBACK.to_string();
    }

    match parse_ip(first_hop) {
        Some(ip) => canonical_ip(ip).to_string(),
        None => first_hop.to_ascii_lowercase(),
    }
}

fn parse_ip(candidate: &str) -> Option<IpAddr> {
    if let Ok(ip) = candidate.parse::<IpAddr>() {
        return Some(ip);
    }
    if let Ok(socket) = candidate.parse::<SocketAddr>() {
        return Some(socket.ip());
    }
    // `[::1]` without a port
    candidate
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .and_then(|inner| inner.parse::<IpAddr>().ok())
}

fn canonical_ip(ip: IpAddr) -> IpAddr {
    let ip = match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    };

    if ip.is_loopback() {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        ip
    }
}
