//! 请求统计中间件
//!
//! 只在开启请求统计时挂载。

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::HttpBody,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::accounting::RequestLogEntry;
use crate::web::types::AppState;

/// Records duration, status and body size of every exchange.
pub async fn record_request(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let timestamp = Utc::now();
    let started = Instant::now();
    let url = request.uri().to_string();

    let response = {
        let _in_flight = state.accounting.track_in_flight();
        next.run(request).await
    };

    state.accounting.record(RequestLogEntry {
        timestamp,
        url,
        duration: started.elapsed(),
        status_code: response.status().as_u16(),
        response_size: response_size(&response),
    });

    response
}

fn response_size(response: &Response) -> u64 {
    if let Some(size) = response.body().size_hint().exact() {
        return size;
    }

    // 流式响应（例如静态文件）退回到 Content-Length
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}
