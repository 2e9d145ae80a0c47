//! 嵌入探测
//!
//! 只检查 `X-Frame-Options`；CSP 的 `frame-ancestors` 不在判断范围内。

use reqwest::header::HeaderMap;

use super::session::Fetcher;
use crate::core::ProxyError;

const X_FRAME_OPTIONS: &str = "x-frame-options";

/// Returns `false` for `DENY` and `SAMEORIGIN`, `true` for anything else.
pub fn frame_options_allow(header: Option<&str>) -> bool {
    match header.map(|v| v.trim().to_ascii_lowercase()) {
        Some(value) => value != "deny" && value != "sameorigin",
        None => true,
    }
}

fn headers_allow(headers: &HeaderMap) -> bool {
    headers
        .get_all(X_FRAME_OPTIONS)
        .iter()
        .all(|value| frame_options_allow(value.to_str().ok()))
}

impl Fetcher {
    /// Probes `url` with a header-only request.
    ///
    /// Network failures are returned to the caller rather than treated as
    /// either answer.
    pub async fn can_embed(&self, url: &str) -> Result<bool, ProxyError> {
        let (status, headers) = self.head(url).await?;
        let allowed = headers_allow(&headers);

        tracing::debug!(url, %status, allowed, "frame check");
        Ok(allowed)
    }
}
