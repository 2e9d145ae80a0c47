//! 渲染流水线集成测试
//!
//! 使用 mockito 模拟目标站点，验证抓取、改写和准入策略的完整流程

use frameproxy::core::{AdmissionStrategy, PageOutcome, ProxyError, ProxyOptions};

mod common {
    include!("common/mod.rs");
}

use std::time::Duration;

use common::{hanging_server, test_options, test_processor};

const FIXTURE: &str = "<!DOCTYPE html><html><head>\
    <meta name=\"viewport\" content=\"width=1024\">\
    <link rel=\"stylesheet\" href=\"/style.css\">\
    <script src=\"/app.js\"></script>\
    </head><body>\
    <img src=\"/logo.png\">\
    <a href=\"/about\">About</a>\
    <a href=\"#top\">Top</a>\
    <form action=\"/search\"></form>\
    <script>\n  var answer = 40 + 2; // inline\n</script>\
    </body></html>";

fn rendered_html(outcome: PageOutcome) -> String {
    match outcome {
        PageOutcome::Rendered { html, .. } => html,
        other => panic!("expected a rendered page, got {:?}", other),
    }
}

/// 测试完整的抓取和改写流程
#[tokio::test]
async fn test_page_is_rewritten_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();

    let page = server
        .mock("GET", "/")
        .with_header("content-type", "text/html")
        .with_body(FIXTURE)
        .create_async()
        .await;
    let stylesheet = server
        .mock("GET", "/style.css")
        .with_header("content-type", "text/css")
        .with_body("body {\n  color: red;\n}\n")
        .create_async()
        .await;
    let script = server
        .mock("GET", "/app.js")
        .with_header("content-type", "application/javascript")
        .with_body("var message = 'hello';\n")
        .create_async()
        .await;

    let processor = test_processor(test_options());
    let html = rendered_html(processor.render(&base).await);

    page.assert_async().await;
    stylesheet.assert_async().await;
    script.assert_async().await;

    assert!(html.starts_with(
        "<!DOCTYPE html><html><head><meta charset=\"UTF-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">"
    ));
    assert!(!html.contains("width=1024"));
    assert!(html.contains("<style>body{color:red}</style>"));
    assert!(!html.contains("<link"));
    assert!(!html.contains("src=\"/app.js\""));
    assert!(html.contains("hello"));
    assert!(html.contains("<script>var answer=40+2;</script>"));
    assert!(html.contains(&format!("<img src=\"{}/logo.png\">", base)));
    assert!(html.contains(&format!("href=\"/?url={}/about\"", base)));
    assert!(html.contains("href=\"#top\""));
    assert!(html.contains(&format!("action=\"/?url={}/search\"", base)));
}

/// 测试子资源抓取失败时元素保持原样
#[tokio::test]
async fn test_failed_subresources_are_left_untouched() {
    let mut server = mockito::Server::new_async().await;

    let _page = server
        .mock("GET", "/")
        .with_header("content-type", "text/html")
        .with_body(
            "<html><head><link rel=\"stylesheet\" href=\"/missing.css\"></head>\
             <body><script src=\"/missing.js\"></script></body></html>",
        )
        .create_async()
        .await;
    let _missing_css = server
        .mock("GET", "/missing.css")
        .with_status(404)
        .with_body("not found")
        .create_async()
        .await;
    let _missing_js = server
        .mock("GET", "/missing.js")
        .with_status(500)
        .create_async()
        .await;

    let processor = test_processor(test_options());
    let html = rendered_html(processor.render(&server.url()).await);

    assert!(html.contains("<link rel=\"stylesheet\" href=\"/missing.css\">"));
    assert!(html.contains("<script src=\"/missing.js\"></script>"));
    assert!(!html.contains("not found"));
}

/// 测试非 2xx 的顶层页面仍然被渲染
#[tokio::test]
async fn test_non_success_page_is_still_rendered() {
    let mut server = mockito::Server::new_async().await;

    let _page = server
        .mock("GET", "/")
        .with_status(404)
        .with_header("content-type", "text/html")
        .with_body("<html><body><p>Page gone</p></body></html>")
        .create_async()
        .await;

    let processor = test_processor(test_options());
    let html = rendered_html(processor.render(&server.url()).await);

    assert!(html.contains("<p>Page gone</p>"));
}

/// 测试按响应头声明的字符集解码
#[tokio::test]
async fn test_page_is_decoded_with_declared_charset() {
    let mut server = mockito::Server::new_async().await;

    let _page = server
        .mock("GET", "/")
        .with_header("content-type", "text/html; charset=windows-1252")
        .with_body(b"<html><body><p>caf\xe9</p></body></html>".to_vec())
        .create_async()
        .await;

    let processor = test_processor(test_options());
    let html = rendered_html(processor.render(&server.url()).await);

    assert!(html.contains("<p>café</p>"));
    assert!(html.contains("<meta charset=\"UTF-8\">"));
}

/// 测试文档内 meta 声明的字符集
#[tokio::test]
async fn test_page_is_decoded_with_meta_charset() {
    let mut server = mockito::Server::new_async().await;

    let _page = server
        .mock("GET", "/")
        .with_header("content-type", "text/html")
        .with_body(
            b"<html><head><meta charset=\"iso-8859-1\"></head><body><p>na\xefve</p></body></html>"
                .to_vec(),
        )
        .create_async()
        .await;

    let processor = test_processor(test_options());
    let html = rendered_html(processor.render(&server.url()).await);

    assert!(html.contains("<p>naïve</p>"));
    assert!(!html.contains("iso-8859-1"));
}

/// 测试 frame-gated 策略遇到 DENY 时返回回退结果且不抓取页面
#[tokio::test]
async fn test_frame_gated_refuses_denied_pages() {
    let mut server = mockito::Server::new_async().await;

    let frame_check = server
        .mock("HEAD", "/")
        .with_header("x-frame-options", "DENY")
        .create_async()
        .await;
    let page = server.mock("GET", "/").expect(0).create_async().await;

    let options = ProxyOptions {
        strategy: AdmissionStrategy::FrameGated,
        ..test_options()
    };
    let processor = test_processor(options);

    match processor.render(&server.url()).await {
        PageOutcome::FrameRefused { target } => assert_eq!(target, server.url()),
        other => panic!("expected the frame fallback, got {:?}", other),
    }

    frame_check.assert_async().await;
    page.assert_async().await;
}

/// 测试 frame-gated 策略放行允许嵌入的页面
#[tokio::test]
async fn test_frame_gated_admits_frameable_pages() {
    let mut server = mockito::Server::new_async().await;

    let _frame_check = server
        .mock("HEAD", "/")
        .with_header("x-frame-options", "ALLOW-FROM https://viewer.example")
        .create_async()
        .await;
    let _page = server
        .mock("GET", "/")
        .with_header("content-type", "text/html")
        .with_body("<p>framed</p>")
        .create_async()
        .await;

    let options = ProxyOptions {
        strategy: AdmissionStrategy::FrameGated,
        ..test_options()
    };
    let html = rendered_html(test_processor(options).render(&server.url()).await);

    assert!(html.contains("<p>framed</p>"));
}

/// 测试 always-fetch 策略不发送探测请求
#[tokio::test]
async fn test_always_fetch_skips_frame_check() {
    let mut server = mockito::Server::new_async().await;

    let frame_check = server
        .mock("HEAD", "/")
        .with_header("x-frame-options", "DENY")
        .expect(0)
        .create_async()
        .await;
    let _page = server
        .mock("GET", "/")
        .with_header("content-type", "text/html")
        .with_body("<p>fetched anyway</p>")
        .create_async()
        .await;

    let html = rendered_html(test_processor(test_options()).render(&server.url()).await);

    assert!(html.contains("<p>fetched anyway</p>"));
    frame_check.assert_async().await;
}

/// 测试探测失败作为顶层错误
#[tokio::test]
async fn test_frame_check_failure_is_top_level() {
    let options = ProxyOptions {
        strategy: AdmissionStrategy::FrameGated,
        ..test_options()
    };

    match test_processor(options).render("http://127.0.0.1:1/").await {
        PageOutcome::Failed { error, .. } => {
            assert!(matches!(error, ProxyError::FetchFailure { .. }))
        }
        other => panic!("expected a failure, got {:?}", other),
    }
}

/// 测试非严格模式的脚本也能正常渲染
#[tokio::test]
async fn test_sloppy_mode_script_is_rendered() {
    let mut server = mockito::Server::new_async().await;

    let _page = server
        .mock("GET", "/")
        .with_header("content-type", "text/html")
        .with_body("<html><body><script>if (a) function f() {}</script></body></html>")
        .create_async()
        .await;

    let processor = test_processor(test_options());
    let html = rendered_html(processor.render(&server.url()).await);

    assert!(html.contains("<script>if(a)function f(){}</script>"));
}

/// 测试整个渲染超过截止时间时返回 Timeout
#[tokio::test]
async fn test_request_deadline_bounds_render() {
    let (url, server) = hanging_server().await;

    let options = ProxyOptions {
        fetch_timeout: Duration::from_secs(5),
        request_deadline: Duration::from_millis(300),
        ..test_options()
    };
    let outcome = test_processor(options).render(&url).await;

    match outcome {
        PageOutcome::Failed { target, error } => {
            assert_eq!(target, url);
            assert!(matches!(error, ProxyError::Timeout(_)), "{:?}", error);
        }
        other => panic!("expected a failed render, got {:?}", other),
    }
    server.abort();
}
