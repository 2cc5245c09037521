//! Audit trail recorder
//!
//! Mutating RBAC operations call [`AuditRecorder::record`] after their write
//! has committed. Recording is best effort: a failed append is logged and the
//! caller carries on, the triggering mutation stays in place.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use tracing::{debug, error};

use crate::{
    models::audit::{NewAuditRecord, RequestMeta},
    repositories::AuditRepository,
};

/// Label used when the OS or browser cannot be recognised
const UNKNOWN: &str = "Desconocido";

/// Appends audit records to the store
#[derive(Clone)]
pub struct AuditRecorder {
    repository: Arc<dyn AuditRepository>,
}

impl AuditRecorder {
    pub fn new(repository: Arc<dyn AuditRepository>) -> Self {
        Self { repository }
    }

    /// Append one record. Errors are logged, never returned.
    pub async fn record(&self, record: NewAuditRecord) {
        match self.repository.append(&record).await {
            Ok(stored) => debug!(
                id = %stored.id,
                action = %stored.action,
                user = %stored.user_id,
                "Audit record written"
            ),
            Err(e) => error!(
                action = %record.action,
                user = %record.user_id,
                "Failed to write audit record: {}", e
            ),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(request_meta(&parts.headers, peer))
    }
}

/// Client address and device details for an audit record
pub fn request_meta(headers: &HeaderMap, peer: Option<SocketAddr>) -> RequestMeta {
    let user_agent = header_value(headers, "user-agent");
    let device = user_agent.as_deref().map(device_summary);

    RequestMeta {
        ip: client_ip(headers, peer),
        user_agent,
        device,
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// First hop of `X-Forwarded-For`, then `X-Real-IP`, then the socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    header_value(headers, "x-forwarded-for")
        .and_then(|list| {
            list.split(',')
                .map(str::trim)
                .find(|hop| !hop.is_empty())
                .map(String::from)
        })
        .or_else(|| header_value(headers, "x-real-ip"))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

/// Short "<os> / <browser>" label derived from a user agent string.
pub fn device_summary(user_agent: &str) -> String {
    format!("{} / {}", operating_system(user_agent), browser(user_agent))
}

fn operating_system(ua: &str) -> &'static str {
    // iOS agents also mention "Mac OS X", Android agents also mention "Linux".
    if ua.contains("iPhone") || ua.contains("iPad") {
        "iOS"
    } else if ua.contains("Android") {
        "Android"
    } else if ua.contains("Windows") {
        "Windows"
    } else if ua.contains("Mac OS X") || ua.contains("Macintosh") {
        "macOS"
    } else if ua.contains("Linux") {
        "Linux"
    } else {
        UNKNOWN
    }
}

fn browser(ua: &str) -> &'static str {
    // Edge and Opera agents also carry "Chrome"; Chrome agents carry "Safari".
    if ua.contains("Edg/") {
        "Edge"
    } else if ua.contains("OPR/") {
        "Opera"
    } else if ua.contains("Firefox/") {
        "Firefox"
    } else if ua.contains("Chrome/") {
        "Chrome"
    } else if ua.contains("Safari/") {
        "Safari"
    } else {
        UNKNOWN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const EDGE_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const CHROME_ANDROID: &str = "Mozilla/5.0 (Linux; Android 14) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";

    #[test]
    fn test_device_summary() {
        assert_eq!(device_summary(CHROME_WINDOWS), "Windows / Chrome");
        assert_eq!(device_summary(EDGE_WINDOWS), "Windows / Edge");
        assert_eq!(device_summary(SAFARI_IPHONE), "iOS / Safari");
        assert_eq!(device_summary(FIREFOX_LINUX), "Linux / Firefox");
        assert_eq!(device_summary(CHROME_ANDROID), "Android / Chrome");
        assert_eq!(device_summary("curl/8.4.0"), "Desconocido / Desconocido");
    }

    #[test]
    fn test_client_ip_precedence() {
        let peer: SocketAddr = "192.168.1.20:51000".parse().unwrap();

        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("192.168.1.20"));

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("10.0.0.9"));

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("200.87.1.1, 10.0.0.9"),
        );
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("200.87.1.1"));
    }

    #[test]
    fn test_request_meta_without_headers() {
        let meta = request_meta(&HeaderMap::new(), None);
        assert_eq!(meta, RequestMeta::default());
    }
}
