//! Web 模块的数据类型定义

use std::sync::Arc;

use serde::Deserialize;

use crate::accounting::Accounting;
use crate::core::PageProcessor;

/// 应用状态
///
/// 启动时构造一次，所有请求共享。
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<PageProcessor>,
    pub accounting: Arc<Accounting>,
}

/// 渲染路由的查询参数
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub url: Option<String>,
}
