use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, header};
use senselearn_application::RequestContext;

use crate::state::AppState;

/// Identifier used when neither a trusted header nor a peer address exists.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolves the caller IP used for rate limiting and security events.
///
/// `X-Forwarded-For` is honoured only when the deployment sits behind a
/// trusted proxy; otherwise the TCP peer address is used.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        if let Some(forwarded) = forwarded {
            return forwarded.to_owned();
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| address.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_owned())
}

pub fn request_context(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_forwarded_for: bool,
) -> RequestContext {
    let ip_address = client_ip(headers, extensions, trust_forwarded_for);
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);

    RequestContext {
        ip_address: Some(ip_address).filter(|ip| ip != UNKNOWN_CLIENT),
        user_agent,
    }
}

/// Extractor for caller metadata attached to security events.
#[derive(Debug, Clone)]
pub struct ClientContext(pub RequestContext);

impl FromRequestParts<AppState> for ClientContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(request_context(
            &parts.headers,
            &parts.extensions,
            state.security.trust_forwarded_for,
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use axum::http::HeaderValue;

    use super::*;

    fn forwarded_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.7, 10.0.0.1"),
        );
        headers
    }

    fn peer_extensions() -> Extensions {
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10)),
            40_000,
        )));
        extensions
    }

    #[test]
    fn forwarded_header_is_ignored_unless_trusted() {
        let ip = client_ip(&forwarded_headers(), &peer_extensions(), false);
        assert_eq!(ip, "192.0.2.10");
    }

    #[test]
    fn first_forwarded_hop_wins_when_trusted() {
        let ip = client_ip(&forwarded_headers(), &peer_extensions(), true);
        assert_eq!(ip, "198.51.100.7");
    }

    #[test]
    fn missing_peer_falls_back_to_unknown() {
        let ip = client_ip(&HeaderMap::new(), &Extensions::new(), true);
        assert_eq!(ip, UNKNOWN_CLIENT);

        let context = request_context(&HeaderMap::new(), &Extensions::new(), false);
        assert_eq!(context.ip_address, None);
    }
}
