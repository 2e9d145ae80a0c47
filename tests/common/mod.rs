// 集成测试公共模块
//
// 提供测试辅助工具和共享功能

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;

use frameproxy::accounting::Accounting;
use frameproxy::core::{PageProcessor, ProxyOptions};
use frameproxy::web::{create_router, AppState, WebConfig};

/// 快速失败的测试选项
#[allow(dead_code)]
pub fn test_options() -> ProxyOptions {
    ProxyOptions {
        fetch_timeout: Duration::from_secs(5),
        request_deadline: Duration::from_secs(10),
        ..ProxyOptions::default()
    }
}

/// 使用给定选项构造页面处理器
#[allow(dead_code)]
pub fn test_processor(options: ProxyOptions) -> PageProcessor {
    PageProcessor::new(options).expect("processor should build")
}

/// 构造不带静态目录的路由器
#[allow(dead_code)]
pub fn test_router(options: ProxyOptions, debug: bool) -> Router {
    let state = Arc::new(AppState {
        processor: Arc::new(test_processor(options)),
        accounting: Arc::new(Accounting::new(debug, 10)),
    });

    let config = WebConfig {
        bind_addr: "127.0.0.1".to_string(),
        port: 8080,
        static_dir: None,
    };

    create_router(state, &config)
}

/// 构造 GET 请求
#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

/// 读取完整响应体
#[allow(dead_code)]
pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8_lossy(&bytes).into_owned()
}

/// 接受连接但从不响应的本地服务器
#[allow(dead_code)]
pub async fn hanging_server() -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local listener");
    let addr = listener.local_addr().expect("local address");

    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    (format!("http://{}/", addr), handle)
}
