//! 调试统计处理器

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::accounting::StatsSnapshot;
use crate::web::types::AppState;

/// 返回当前统计快照，只在开启请求统计时注册
pub async fn debug_stats(State(state): State<Arc<AppState>>) -> Json<StatsSnapshot> {
    Json(state.accounting.snapshot())
}
