//! Web 路由定义

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::web::{handlers::*, types::AppState};

/// 创建路由结构
///
/// `/debug/stats` 只在开启请求统计时注册。
pub fn create_routes(accounting_enabled: bool) -> Router<Arc<AppState>> {
    let router = Router::new()
        .route("/", get(index))
        .route("/yt/*path", get(youtube_passthrough));

    if accounting_enabled {
        router.route("/debug/stats", get(debug_stats))
    } else {
        router
    }
}
