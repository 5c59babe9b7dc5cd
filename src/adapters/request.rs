use {
    crate::domain::record::RequestContext,
    axum::{
        extract::{ConnectInfo, Request},
        http::HeaderMap,
    },
    std::net::SocketAddr,
};

/// Principal resolved by the host's authentication layer. Stored as a
/// request extension; its absence means the caller is anonymous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedActor(pub String);

/// Snapshot of the request metadata the audit record needs. The response
/// status is filled in once the handler has run.
pub fn capture(request: &Request) -> RequestContext {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    RequestContext {
        actor: request
            .extensions()
            .get::<AuthenticatedActor>()
            .map(|AuthenticatedActor(name)| name.clone()),
        path: request.uri().path().to_string(),
        method: request.method().to_string(),
        client_ip: client_ip(request.headers(), peer),
        response_status: 0,
    }
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(first) = header(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return Some(first.to_string());
    }

    if let Some(real_ip) = header(headers, "x-real-ip") {
        return Some(real_ip.to_string());
    }

    peer.map(|addr| addr.ip().to_string())
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
