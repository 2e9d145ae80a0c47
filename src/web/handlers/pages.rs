//! 页面处理器

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Html,
};

use crate::web::{templates, types::{AppState, PageQuery}};

/// 主页与渲染处理器
///
/// 没有 `url` 参数时显示首页；否则渲染目标页面。
/// 无论成功与否都返回 200，失败信息显示在页面内的错误面板中。
pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Html<String> {
    let raw_target = query.url.unwrap_or_default();
    tracing::debug!(target_url = %raw_target, "processing render request");

    let outcome = state.processor.render(&raw_target).await;
    Html(templates::render_outcome(&outcome))
}
