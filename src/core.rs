use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use encoding_rs::Encoding;
use thiserror::Error;

use crate::embed::{embed_markup, extract_video_id, AllowList};
use crate::network::session::{FetchResponse, Fetcher};
use crate::parsers::html::{
    collect_resources, fetch_resources, html_to_dom, rewrite_document, serialize_document,
    Document, RewriteContext,
};
use crate::parsers::minify::{Minifier, MinifierOptions};
use crate::utils::url::normalize_target;

/// Represents errors that can occur while rendering a proxied page
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Error fetching {url}: {message}")]
    FetchFailure { url: String, message: String },

    #[error("Timed out fetching {0}")]
    Timeout(String),

    #[error("Too many redirects fetching {0}")]
    TooManyRedirects(String),

    #[error("{url} responded with HTTP {status}")]
    NonSuccessStatus { url: String, status: u16 },

    #[error("Error parsing HTML: {0}")]
    ParseFailure(String),

    #[error("Error extracting content: {0}")]
    SerializationFailure(String),

    #[error("Invalid target URL: {0}")]
    InvalidTarget(String),

    #[error("Server error: {0}")]
    Server(String),
}

/// How a target page is admitted into the viewer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AdmissionStrategy {
    /// Probe `X-Frame-Options` first and refuse pages that forbid framing
    FrameGated,
    /// Always fetch and rewrite the page (default)
    #[default]
    AlwaysFetch,
}

impl AdmissionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionStrategy::FrameGated => "frame-gated",
            AdmissionStrategy::AlwaysFetch => "always-fetch",
        }
    }
}

impl FromStr for AdmissionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frame-gated" | "a" => Ok(AdmissionStrategy::FrameGated),
            "always-fetch" | "b" => Ok(AdmissionStrategy::AlwaysFetch),
            other => Err(format!(
                "unknown strategy '{}' (use always-fetch or frame-gated)",
                other
            )),
        }
    }
}

impl fmt::Display for AdmissionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration options for page rendering
#[derive(Clone, Debug)]
pub struct ProxyOptions {
    pub strategy: AdmissionStrategy,
    pub fetch_timeout: Duration,
    pub max_redirects: usize,
    pub request_deadline: Duration,
    pub max_outbound: usize,
    pub resource_concurrency: usize,
    pub allow_list: AllowList,
    pub player_markers: Vec<String>,
    pub minifier: MinifierOptions,
    /// `/yt/` 透传路由的上游地址前缀
    pub passthrough_origin: String,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        ProxyOptions {
            strategy: AdmissionStrategy::default(),
            fetch_timeout: Duration::from_secs(10),
            max_redirects: 10,
            request_deadline: Duration::from_secs(30),
            max_outbound: 64,
            resource_concurrency: 8,
            allow_list: AllowList::default(),
            player_markers: vec!["youtube.com".to_string(), "YT.Player".to_string()],
            minifier: MinifierOptions::default(),
            passthrough_origin: "https://www.youtube.com/".to_string(),
        }
    }
}

/// 一次渲染请求的结果
#[derive(Debug)]
pub enum PageOutcome {
    /// 没有目标地址，显示首页
    Home,
    /// 视频页面，替换为官方嵌入代码
    Embed { target: String, markup: String },
    /// 改写后的完整文档
    Rendered { target: String, html: String },
    /// 目标页面禁止被嵌入
    FrameRefused { target: String },
    /// 顶层失败，显示错误面板
    Failed { target: String, error: ProxyError },
}

/// Parses a Content-Type header value into its media type and charset
pub fn parse_content_type(content_type: &str) -> (String, String) {
    let mut media_type = String::new();
    let mut charset = String::new();

    let parts: Vec<&str> = content_type.split(';').collect();

    if !parts.is_empty() {
        media_type = parts[0].trim().to_lowercase();
    }

    for part in parts.iter().skip(1) {
        let part = part.trim();
        if let Some(value) = part
            .get(..8)
            .filter(|key| key.eq_ignore_ascii_case("charset="))
            .map(|_| &part[8..])
        {
            charset = value.trim_matches('"').to_string();
        }
    }

    (media_type, charset)
}

/// 页面处理器，负责协调整个渲染流程
///
/// 进程内只构造一次，所有请求共享同一个 [`Fetcher`]。
#[derive(Debug, Clone)]
pub struct PageProcessor {
    options: ProxyOptions,
    fetcher: Fetcher,
    minifier: Minifier,
}

impl PageProcessor {
    pub fn new(options: ProxyOptions) -> Result<Self, ProxyError> {
        let fetcher = Fetcher::new(&options)?;
        let minifier = Minifier::new(options.minifier);

        Ok(PageProcessor {
            options,
            fetcher,
            minifier,
        })
    }

    pub fn options(&self) -> &ProxyOptions {
        &self.options
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Renders the page behind a raw `url` query value.
    ///
    /// Never fails: every error becomes [`PageOutcome::Failed`]. The whole
    /// render is bounded by the request deadline.
    pub async fn render(&self, raw_target: &str) -> PageOutcome {
        let Some(target) = normalize_target(raw_target) else {
            return PageOutcome::Home;
        };

        // 1. 视频页面直接换成嵌入代码
        let video_id = extract_video_id(&target);
        if !video_id.is_empty() {
            tracing::debug!(%target, %video_id, "serving video embed");
            return PageOutcome::Embed {
                markup: embed_markup(&video_id),
                target,
            };
        }

        // 2. 其余页面在截止时间内完成抓取和改写
        let deadline = self.options.request_deadline;
        let result = match tokio::time::timeout(deadline, self.render_document(&target)).await {
            Ok(result) => result,
            Err(_) => Err(ProxyError::Timeout(target.clone())),
        };

        match result {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(%target, %error, "page render failed");
                PageOutcome::Failed { target, error }
            }
        }
    }

    async fn render_document(&self, target: &str) -> Result<PageOutcome, ProxyError> {
        if self.options.strategy == AdmissionStrategy::FrameGated
            && !self.fetcher.can_embed(target).await?
        {
            tracing::info!(%target, "page refuses to be framed");
            return Ok(PageOutcome::FrameRefused {
                target: target.to_string(),
            });
        }

        let response = self.fetcher.fetch(target).await?;
        if !response.status.is_success() {
            tracing::warn!(%target, status = %response.status, "rendering non-success response");
        }

        let base_url = response.final_url.to_string();
        let mut document = decode_document(&response)?;

        let urls = collect_resources(&document, &base_url, &self.options.allow_list);
        tracing::debug!(%target, resources = urls.len(), "prefetching resources");
        let resources =
            fetch_resources(&self.fetcher, urls, self.options.resource_concurrency).await;

        let context = RewriteContext {
            base_url: &base_url,
            allow_list: &self.options.allow_list,
            minifier: &self.minifier,
            player_markers: &self.options.player_markers,
            resources: &resources,
        };
        rewrite_document(&mut document, &context);

        let html = serialize_document(&document)?;
        tracing::info!(%target, bytes = html.len(), "page rendered");

        Ok(PageOutcome::Rendered {
            target: target.to_string(),
            html,
        })
    }
}

/// Parses the response body into a document.
///
/// The charset named by `Content-Type` wins; otherwise the document is parsed
/// as UTF-8 and re-parsed once if it declares a different charset itself.
fn decode_document(response: &FetchResponse) -> Result<Document, ProxyError> {
    if let Some(encoding) = response.declared_encoding() {
        return html_to_dom(&response.body, encoding.name());
    }

    let document = html_to_dom(&response.body, "utf-8")?;

    let declared = document
        .declared_charset()
        .and_then(|label| Encoding::for_label_no_replacement(label.as_bytes()));

    match declared {
        Some(encoding) if encoding != encoding_rs::UTF_8 => {
            tracing::debug!(charset = encoding.name(), "re-parsing with declared charset");
            html_to_dom(&response.body, encoding.name())
        }
        _ => Ok(document),
    }
}
