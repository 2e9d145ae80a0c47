//! HTTP 会话管理
//!
//! [`Fetcher`] 在进程内只构造一次，所有请求共享同一个连接池和出站信号量。

use std::sync::Arc;

use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::core::{parse_content_type, ProxyError, ProxyOptions};
use crate::utils::url::Url;

/// 浏览器身份标识
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.5"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
    ("upgrade-insecure-requests", "1"),
];

/// 一次完整读取的上游响应
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// 跟随重定向之后的最终地址
    pub final_url: Url,
}

impl FetchResponse {
    /// Turns a non-2xx response into [`ProxyError::NonSuccessStatus`].
    pub fn ensure_success(self) -> Result<Self, ProxyError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(ProxyError::NonSuccessStatus {
                url: self.final_url.to_string(),
                status: self.status.as_u16(),
            })
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// 响应头声明的字符集，未声明或无法识别时返回 `None`
    pub fn declared_encoding(&self) -> Option<&'static Encoding> {
        let (_, charset) = parse_content_type(self.content_type()?);
        Encoding::for_label_no_replacement(charset.as_bytes())
    }

    /// Decodes the body with the declared charset, UTF-8 otherwise.
    pub fn text(&self) -> String {
        let encoding = self.declared_encoding().unwrap_or(UTF_8);
        let (text, _, _) = encoding.decode(&self.body);
        text.into_owned()
    }
}

/// 共享的上游 HTTP 客户端
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    limiter: Arc<Semaphore>,
}

impl Fetcher {
    pub fn new(options: &ProxyOptions) -> Result<Self, ProxyError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static(BROWSER_USER_AGENT),
        );
        for (name, value) in BROWSER_HEADERS {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }

        let client = reqwest::Client::builder()
            .timeout(options.fetch_timeout)
            .redirect(Policy::limited(options.max_redirects))
            .default_headers(headers)
            .build()
            .map_err(|e| ProxyError::FetchFailure {
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Fetcher {
            client,
            limiter: Arc::new(Semaphore::new(options.max_outbound.max(1))),
        })
    }

    /// Number of outbound permits currently free.
    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    /// GET `url` and read the whole body. Non-2xx responses are returned as-is.
    pub async fn fetch(&self, url: &str) -> Result<FetchResponse, ProxyError> {
        let target = parse_target(url)?;
        let _permit = self.acquire(url).await?;

        tracing::debug!(url, "fetching");

        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(url, e))?
            .to_vec();

        tracing::debug!(url, %status, bytes = body.len(), "fetched");

        Ok(FetchResponse {
            status,
            headers,
            body,
            final_url,
        })
    }

    /// 只请求响应头
    pub async fn head(&self, url: &str) -> Result<(StatusCode, HeaderMap), ProxyError> {
        let target = parse_target(url)?;
        let _permit = self.acquire(url).await?;

        let response = self
            .client
            .head(target)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        Ok((response.status(), response.headers().clone()))
    }

    async fn acquire(&self, url: &str) -> Result<SemaphorePermit<'_>, ProxyError> {
        self.limiter
            .acquire()
            .await
            .map_err(|_| ProxyError::FetchFailure {
                url: url.to_string(),
                message: "outbound limiter closed".to_string(),
            })
    }
}

fn parse_target(url: &str) -> Result<Url, ProxyError> {
    let parsed =
        Url::parse(url).map_err(|e| ProxyError::InvalidTarget(format!("{}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(ProxyError::InvalidTarget(format!(
            "{}: unsupported scheme '{}'",
            url, scheme
        ))),
    }
}

fn map_reqwest_error(url: &str, e: reqwest::Error) -> ProxyError {
    if e.is_timeout() {
        ProxyError::Timeout(url.to_string())
    } else if e.is_redirect() {
        ProxyError::TooManyRedirects(url.to_string())
    } else {
        ProxyError::FetchFailure {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}
