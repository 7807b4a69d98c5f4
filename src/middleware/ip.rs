use axum::{
    extract::{connect_info::ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

/// Extract client IP from proxy headers and optional transport metadata.
pub fn extract_ip_from_headers(headers: &HeaderMap, fallback: Option<IpAddr>) -> IpAddr {
    if let Some(h) = headers.get("x-forwarded-for").and_then(|hv| hv.to_str().ok()) {
        if let Some(first) = h.split(',').next() {
            if let Ok(ip) = first.trim().parse::<IpAddr>() {
                return ip;
            }
        }
    }
    if let Some(h) = headers.get("x-real-ip").and_then(|hv| hv.to_str().ok()) {
        if let Ok(ip) = h.trim().parse::<IpAddr>() {
            return ip;
        }
    }
    fallback.unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

/// Remote socket address if the server was started with connect info. Never rejects,
/// so handlers also work under `oneshot` in tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaybeRemoteAddr(pub Option<SocketAddr>);

impl<S> FromRequestParts<S> for MaybeRemoteAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match ConnectInfo::<SocketAddr>::from_request_parts(parts, state).await {
            Ok(ConnectInfo(addr)) => Ok(MaybeRemoteAddr(Some(addr))),
            Err(_) => Ok(MaybeRemoteAddr(None)),
        }
    }
}

/// Client IP of a request: proxy headers first, then the socket address.
pub fn client_ip(headers: &HeaderMap, remote: MaybeRemoteAddr) -> IpAddr {
    extract_ip_from_headers(headers, remote.0.map(|a| a.ip()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_wins_over_real_ip_and_socket() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.7, 172.16.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.8"));
        let remote = MaybeRemoteAddr(Some("192.168.1.2:4000".parse().unwrap()));
        assert_eq!(client_ip(&headers, remote), IpAddr::from([10, 0, 0, 7]));
    }

    #[test]
    fn falls_back_to_socket_then_loopback() {
        let headers = HeaderMap::new();
        let remote = MaybeRemoteAddr(Some("192.168.1.2:4000".parse().unwrap()));
        assert_eq!(client_ip(&headers, remote), IpAddr::from([192, 168, 1, 2]));
        assert_eq!(client_ip(&headers, MaybeRemoteAddr(None)), IpAddr::from([127, 0, 0, 1]));
    }
}
