//! Web 路由集成测试

use axum::http::{header, StatusCode};
use mockito::Matcher;
use tower::ServiceExt;

use frameproxy::core::ProxyOptions;

mod common {
    include!("common/mod.rs");
}

use common::{body_string, get, test_options, test_router};

/// 测试首页
#[tokio::test]
async fn test_home_page() {
    let router = test_router(test_options(), false);

    let response = router.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("name=\"url\" value=\"\""));
    assert!(body.contains("Enter a web address above"));
}

/// 测试视频页面返回嵌入代码
#[tokio::test]
async fn test_video_page_is_embedded() {
    let router = test_router(test_options(), false);

    let response = router
        .oneshot(get("/?url=https://www.youtube.com/watch?v%3DABC123%26t%3D5"))
        .await
        .unwrap();
    let body = body_string(response).await;

    assert!(body.contains("<div class=\"video-container\">"));
    assert!(body.contains("https://www.youtube.com/embed/ABC123\""));
}

/// 测试渲染失败时仍然返回 200 和错误面板
#[tokio::test]
async fn test_render_failure_shows_error_panel() {
    let router = test_router(test_options(), false);

    let response = router
        .oneshot(get("/?url=http://127.0.0.1:1/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("class=\"error\""));
    assert!(body.contains("Error fetching http://127.0.0.1:1/"));
}

/// 测试渲染结果放入宿主模板
#[tokio::test]
async fn test_rendered_page_uses_host_template() {
    let mut server = mockito::Server::new_async().await;
    let _page = server
        .mock("GET", "/")
        .with_header("content-type", "text/html")
        .with_body("<html><body><a href=\"/next\">next</a></body></html>")
        .create_async()
        .await;

    let router = test_router(test_options(), false);
    let response = router
        .oneshot(get(&format!("/?url={}", server.url())))
        .await
        .unwrap();
    let body = body_string(response).await;

    assert!(body.contains(&format!("value=\"{}\"", server.url())));
    assert!(body.contains(&format!("href=\"/?url={}/next\"", server.url())));
}

/// 测试统计接口只在开启时注册
#[tokio::test]
async fn test_stats_route_requires_debug_mode() {
    let router = test_router(test_options(), false);
    let response = router.oneshot(get("/debug/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let router = test_router(test_options(), true);
    let response = router.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router.oneshot(get("/debug/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stats: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(stats["requestCount"], 1);
    assert_eq!(stats["lastRequests"][0]["url"], "/");
    assert_eq!(stats["lastRequests"][0]["statusCode"], 200);
    assert!(stats["bytesProcessed"].as_u64().unwrap() > 0);
    assert!(stats["uptime"].is_string());
    assert!(stats.get("memoryUsageMB").is_some());
}

/// 测试透传保留上游的内容类型和查询字符串
#[tokio::test]
async fn test_passthrough_preserves_content_type() {
    let mut server = mockito::Server::new_async().await;
    let api = server
        .mock("GET", "/iframe_api")
        .match_query(Matcher::UrlEncoded("v".to_string(), "2".to_string()))
        .with_header("content-type", "text/javascript; charset=utf-8")
        .with_body("var YT = {};")
        .create_async()
        .await;

    let options = ProxyOptions {
        passthrough_origin: format!("{}/", server.url()),
        ..test_options()
    };
    let router = test_router(options, false);

    let response = router.oneshot(get("/yt/iframe_api?v=2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/javascript; charset=utf-8"
    );
    assert_eq!(body_string(response).await, "var YT = {};");
    api.assert_async().await;
}

/// 测试透传保留上游状态码
#[tokio::test]
async fn test_passthrough_preserves_status() {
    let mut server = mockito::Server::new_async().await;
    let _missing = server
        .mock("GET", "/s/missing.js")
        .with_status(404)
        .with_header("content-type", "text/plain")
        .create_async()
        .await;

    let options = ProxyOptions {
        passthrough_origin: server.url(),
        ..test_options()
    };
    let router = test_router(options, false);

    let response = router.oneshot(get("/yt/s/missing.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
}

/// 测试透传的传输错误返回 500
#[tokio::test]
async fn test_passthrough_transport_error() {
    let options = ProxyOptions {
        passthrough_origin: "http://127.0.0.1:1/".to_string(),
        ..test_options()
    };
    let router = test_router(options, false);

    let response = router.oneshot(get("/yt/iframe_api")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(response).await.contains("Error fetching"));
}
