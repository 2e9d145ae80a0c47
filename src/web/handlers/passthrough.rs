//! 播放器接口透传处理器

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, RawQuery, State},
    http::{self, header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::web::types::AppState;

/// 拼出上游地址，查询字符串原样保留
pub fn passthrough_url(origin: &str, path: &str, query: Option<&str>) -> String {
    let mut url = format!(
        "{}/{}",
        origin.trim_end_matches('/'),
        path.trim_start_matches('/')
    );

    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }

    url
}

/// `/yt/*path` 透传
///
/// 上游的状态码、`Content-Type` 和响应体原样返回；
/// 传输失败时返回 500 和错误信息。
pub async fn youtube_passthrough(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let origin = &state.processor.options().passthrough_origin;
    let url = passthrough_url(origin, &path, query.as_deref());

    let upstream = match state.processor.fetcher().fetch(&url).await {
        Ok(upstream) => upstream,
        Err(e) => {
            tracing::warn!(%url, error = %e, "passthrough request failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let mut builder = http::Response::builder().status(upstream.status);
    if let Some(content_type) = upstream.headers.get(header::CONTENT_TYPE) {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }

    builder
        .body(Body::from(upstream.body))
        .unwrap_or_else(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_url() {
        assert_eq!(
            passthrough_url("https://www.youtube.com/", "iframe_api", None),
            "https://www.youtube.com/iframe_api"
        );
        assert_eq!(
            passthrough_url("https://www.youtube.com/", "/s/player/base.js", Some("v=1&x=2")),
            "https://www.youtube.com/s/player/base.js?v=1&x=2"
        );
        assert_eq!(
            passthrough_url("http://127.0.0.1:9000", "a", Some("")),
            "http://127.0.0.1:9000/a"
        );
    }
}
