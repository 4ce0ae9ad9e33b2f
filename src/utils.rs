use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;

/// Extracts the client IP address for rate-limit keys and X-Forwarded-For.
///
/// Priority: first entry of `X-Forwarded-For`, then `X-Real-IP`, then the
/// socket address of the connection. X-Forwarded-For is client-controlled,
/// so in production the reverse proxy in front of the gateway must strip
/// untrusted values.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> String {
    if let Some(first) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|chain| chain.split(',').next())
    {
        // "client, proxy1, proxy2" - the first entry is the original client
        if let Ok(ip) = first.trim().parse::<IpAddr>() {
            return normalize_ip(ip);
        }
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return normalize_ip(ip);
    }

    if let Some(ip) = direct_ip {
        return normalize_ip(ip);
    }

    "unknown".to_string()
}

/// Client IP for an in-flight axum request, using the connection's
/// `ConnectInfo` as the header fallback.
pub fn client_ip_from_request(request: &axum::extract::Request) -> String {
    let direct_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());
    extract_client_ip(request.headers(), direct_ip)
}

/// Normalizes an IP address to string form (strips IPv6 brackets)
fn normalize_ip(ip: IpAddr) -> String {
    ip.to_string()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string()
}
