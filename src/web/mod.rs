//! Web 服务器模块
//!
//! 提供渲染路由、播放器接口透传和可选的调试统计接口

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod templates;
pub mod types;

pub use config::*;
pub use handlers::*;
pub use routes::*;
pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::accounting::{Accounting, DEFAULT_REPORT_INTERVAL};
use crate::core::{PageProcessor, ProxyError};

/// Web 服务器
pub struct WebServer {
    config: WebConfig,
    processor: Arc<PageProcessor>,
    accounting: Arc<Accounting>,
    report_interval: Duration,
}

impl WebServer {
    /// 创建新的 Web 服务器
    pub fn new(config: WebConfig, processor: PageProcessor, accounting: Arc<Accounting>) -> Self {
        Self {
            config,
            processor: Arc::new(processor),
            accounting,
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }

    /// 设置统计输出间隔
    pub fn with_report_interval(mut self, every: Duration) -> Self {
        self.report_interval = every;
        self
    }

    /// 启动 Web 服务器
    pub async fn start(&self) -> Result<(), ProxyError> {
        let app_state = Arc::new(AppState {
            processor: Arc::clone(&self.processor),
            accounting: Arc::clone(&self.accounting),
        });

        let app = create_router(app_state, &self.config);

        let listener = tokio::net::TcpListener::bind(self.config.listen_address())
            .await
            .map_err(|e| ProxyError::Server(format!("Failed to bind server: {}", e)))?;

        let _reporter = self.accounting.spawn_reporter(self.report_interval);

        tracing::info!(
            "Server starting at http://{} (strategy: {}, debug mode: {})",
            self.config.listen_address(),
            self.processor.options().strategy,
            self.accounting.is_enabled()
        );

        axum::serve(listener, app)
            .await
            .map_err(|e| ProxyError::Server(e.to_string()))?;

        Ok(())
    }
}

/// 创建路由器
pub fn create_router(app_state: Arc<AppState>, config: &WebConfig) -> Router {
    let accounting_enabled = app_state.accounting.is_enabled();
    let mut app = create_routes(accounting_enabled).with_state(Arc::clone(&app_state));

    // 添加静态文件服务（如果配置了）
    if let Some(static_dir) = &config.static_dir {
        app = app.nest_service("/static", ServeDir::new(static_dir));
    }

    if accounting_enabled {
        app = app.layer(axum::middleware::from_fn_with_state(
            app_state,
            middleware::record_request,
        ));
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
