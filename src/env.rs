//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量管理。每个变量是一个实现了 [`EnvVar`] 的零大小类型，
//! 按关注点分组：`core`、`proxy`、`accounting`、`web`。

use std::env;
use std::fmt;
use std::time::Duration;

use crate::core::{AdmissionStrategy, ProxyOptions};
use crate::embed::AllowList;
use crate::parsers::minify::MinifierOptions;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    /// 未设置时返回 `None`，设置了但无效时仍然报错
    fn get_optional() -> EnvResult<Option<T>> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value).map(Some),
            Err(_) => Ok(None),
        }
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    ///
    /// 没有默认值：未设置时由启动程序根据是否开启请求统计决定。
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "FRAMEPROXY_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str =
            "Log level: trace, debug, info, warn, error (default: info, debug with FRAMEPROXY_DEBUG)";

        fn parse(value: &str) -> EnvResult<String> {
            match value.trim().to_lowercase().as_str() {
                level @ ("trace" | "debug" | "info" | "warn" | "error") => Ok(level.to_string()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }
}

/// 代理流水线相关环境变量
pub mod proxy {
    use super::*;

    /// 页面准入策略
    pub struct Strategy;
    impl EnvVar<AdmissionStrategy> for Strategy {
        const NAME: &'static str = "FRAMEPROXY_STRATEGY";
        const DEFAULT: Option<AdmissionStrategy> = Some(AdmissionStrategy::AlwaysFetch);
        const DESCRIPTION: &'static str =
            "Admission strategy: always-fetch, or frame-gated to honour X-Frame-Options";

        fn parse(value: &str) -> EnvResult<AdmissionStrategy> {
            value.parse().map_err(|message| EnvError {
                variable: Self::NAME.to_string(),
                message,
            })
        }
    }

    /// 单次抓取超时
    pub struct FetchTimeout;
    impl EnvVar<Duration> for FetchTimeout {
        const NAME: &'static str = "FRAMEPROXY_FETCH_TIMEOUT";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(10));
        const DESCRIPTION: &'static str = "Total timeout of one outbound fetch in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            parse_seconds(value, Self::NAME, 1, 120)
        }
    }

    /// 最大重定向次数
    pub struct MaxRedirects;
    impl EnvVar<usize> for MaxRedirects {
        const NAME: &'static str = "FRAMEPROXY_MAX_REDIRECTS";
        const DEFAULT: Option<usize> = Some(10);
        const DESCRIPTION: &'static str = "Maximum redirects followed per fetch";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 0, 50)
        }
    }

    /// 整个页面渲染的截止时间
    pub struct RequestDeadline;
    impl EnvVar<Duration> for RequestDeadline {
        const NAME: &'static str = "FRAMEPROXY_REQUEST_DEADLINE";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(30));
        const DESCRIPTION: &'static str = "Deadline for rendering one page in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            parse_seconds(value, Self::NAME, 1, 600)
        }
    }

    /// 全局出站并发上限
    pub struct MaxOutbound;
    impl EnvVar<usize> for MaxOutbound {
        const NAME: &'static str = "FRAMEPROXY_MAX_OUTBOUND";
        const DEFAULT: Option<usize> = Some(64);
        const DESCRIPTION: &'static str = "Maximum concurrent outbound fetches across all requests";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 1024)
        }
    }

    /// 单个请求的资源抓取并发
    pub struct ResourceConcurrency;
    impl EnvVar<usize> for ResourceConcurrency {
        const NAME: &'static str = "FRAMEPROXY_RESOURCE_CONCURRENCY";
        const DEFAULT: Option<usize> = Some(8);
        const DESCRIPTION: &'static str = "Stylesheets and scripts fetched concurrently per page";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 64)
        }
    }

    /// 允许列表
    pub struct Allowlist;
    impl EnvVar<AllowList> for Allowlist {
        const NAME: &'static str = "FRAMEPROXY_ALLOWLIST";
        const DEFAULT: Option<AllowList> = None;

        fn get() -> EnvResult<AllowList> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(AllowList::default()),
            }
        }
        const DESCRIPTION: &'static str =
            "Trusted hosts as host=script+frame pairs, comma-separated (default: YouTube hosts)";

        fn parse(value: &str) -> EnvResult<AllowList> {
            AllowList::parse(value).map_err(|message| EnvError {
                variable: Self::NAME.to_string(),
                message,
            })
        }
    }

    /// 播放器脚本标记
    pub struct PlayerMarkers;
    impl EnvVar<Vec<String>> for PlayerMarkers {
        const NAME: &'static str = "FRAMEPROXY_PLAYER_MARKERS";
        const DEFAULT: Option<Vec<String>> = None;

        fn get() -> EnvResult<Vec<String>> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(ProxyOptions::default().player_markers),
            }
        }
        const DESCRIPTION: &'static str =
            "Inline scripts containing any of these markers are never minified (comma-separated)";

        fn parse(value: &str) -> EnvResult<Vec<String>> {
            Ok(value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect())
        }
    }

    /// CSS 压缩开关
    pub struct MinifyCss;
    impl EnvVar<bool> for MinifyCss {
        const NAME: &'static str = "FRAMEPROXY_MINIFY_CSS";
        const DEFAULT: Option<bool> = Some(true);
        const DESCRIPTION: &'static str = "Minify inline and inlined stylesheets";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// JavaScript 压缩开关
    pub struct MinifyJs;
    impl EnvVar<bool> for MinifyJs {
        const NAME: &'static str = "FRAMEPROXY_MINIFY_JS";
        const DEFAULT: Option<bool> = Some(true);
        const DESCRIPTION: &'static str = "Minify inline and inlined scripts";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// `/yt/` 透传的上游地址
    pub struct PassthroughOrigin;
    impl EnvVar<String> for PassthroughOrigin {
        const NAME: &'static str = "FRAMEPROXY_PASSTHROUGH_ORIGIN";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(ProxyOptions::default().passthrough_origin),
            }
        }
        const DESCRIPTION: &'static str = "Upstream origin served under /yt/";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Origin must start with http:// or https://".to_string(),
                });
            }

            if url.ends_with('/') {
                Ok(url.to_string())
            } else {
                Ok(format!("{}/", url))
            }
        }
    }
}

/// 请求统计相关环境变量
pub mod accounting {
    use super::*;

    /// 调试统计开关
    pub struct Debug;
    impl EnvVar<bool> for Debug {
        const NAME: &'static str = "FRAMEPROXY_DEBUG";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str =
            "Enable request accounting, the periodic report and /debug/stats";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 快照中的最近请求条数
    pub struct RecentLimit;
    impl EnvVar<usize> for RecentLimit {
        const NAME: &'static str = "FRAMEPROXY_STATS_RECENT";
        const DEFAULT: Option<usize> = Some(crate::accounting::DEFAULT_RECENT_LIMIT);
        const DESCRIPTION: &'static str = "Number of recent requests shown in statistics";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 1000)
        }
    }

    /// 统计输出间隔
    pub struct ReportInterval;
    impl EnvVar<Duration> for ReportInterval {
        const NAME: &'static str = "FRAMEPROXY_STATS_INTERVAL";
        const DEFAULT: Option<Duration> = Some(crate::accounting::DEFAULT_REPORT_INTERVAL);
        const DESCRIPTION: &'static str = "Seconds between statistics reports in the log";

        fn parse(value: &str) -> EnvResult<Duration> {
            parse_seconds(value, Self::NAME, 5, 3600)
        }
    }
}

/// Web服务器相关环境变量
pub mod web {
    use super::*;

    /// 绑定地址
    pub struct BindAddress;
    impl EnvVar<String> for BindAddress {
        const NAME: &'static str = "FRAMEPROXY_BIND_ADDRESS";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("127.0.0.1".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Web server bind address";

        fn parse(value: &str) -> EnvResult<String> {
            let addr = value.trim();
            if addr.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Address cannot be empty".to_string(),
                });
            }
            Ok(addr.to_string())
        }
    }

    /// 端口
    pub struct Port;
    impl EnvVar<u16> for Port {
        const NAME: &'static str = "FRAMEPROXY_PORT";
        const DEFAULT: Option<u16> = Some(8080);
        const DESCRIPTION: &'static str = "Web server port";

        fn parse(value: &str) -> EnvResult<u16> {
            let port: u16 = value.trim().parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid port number (1-65535)".to_string(),
            })?;

            if port == 0 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Port cannot be 0".to_string(),
                });
            }
            Ok(port)
        }
    }

    /// 静态文件目录
    pub struct StaticDir;
    impl EnvVar<String> for StaticDir {
        const NAME: &'static str = "FRAMEPROXY_STATIC_DIR";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("static".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Static files directory served under /static (empty to disable)";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.trim().to_string())
        }
    }
}

/// 辅助函数
fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!(
                "Invalid boolean value '{}'. Use: true/false, 1/0, yes/no, on/off, enabled/disabled",
                value
            ),
        }),
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

fn parse_seconds(value: &str, var_name: &str, min: u64, max: u64) -> EnvResult<Duration> {
    let seconds: u64 = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid number of seconds".to_string(),
    })?;

    if seconds < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Too short (minimum {} seconds)", min),
        });
    }

    if seconds > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Too long (maximum {} seconds)", max),
        });
    }

    Ok(Duration::from_secs(seconds))
}

/// 环境变量配置汇总
#[derive(Debug, Clone)]
pub struct EnvConfig {
    // 核心配置
    pub log_level: Option<String>,

    // 代理配置
    pub strategy: AdmissionStrategy,
    pub fetch_timeout: Duration,
    pub max_redirects: usize,
    pub request_deadline: Duration,
    pub max_outbound: usize,
    pub resource_concurrency: usize,
    pub allow_list: AllowList,
    pub player_markers: Vec<String>,
    pub minify_css: bool,
    pub minify_js: bool,
    pub passthrough_origin: String,

    // 统计配置
    pub debug: bool,
    pub stats_recent: usize,
    pub stats_interval: Duration,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> EnvResult<Self> {
        Ok(Self {
            log_level: core::LogLevel::get_optional()?,

            strategy: proxy::Strategy::get()?,
            fetch_timeout: proxy::FetchTimeout::get()?,
            max_redirects: proxy::MaxRedirects::get()?,
            request_deadline: proxy::RequestDeadline::get()?,
            max_outbound: proxy::MaxOutbound::get()?,
            resource_concurrency: proxy::ResourceConcurrency::get()?,
            allow_list: proxy::Allowlist::get()?,
            player_markers: proxy::PlayerMarkers::get()?,
            minify_css: proxy::MinifyCss::get()?,
            minify_js: proxy::MinifyJs::get()?,
            passthrough_origin: proxy::PassthroughOrigin::get()?,

            debug: accounting::Debug::get()?,
            stats_recent: accounting::RecentLimit::get()?,
            stats_interval: accounting::ReportInterval::get()?,
        })
    }

    /// 流水线选项
    pub fn proxy_options(&self) -> ProxyOptions {
        ProxyOptions {
            strategy: self.strategy,
            fetch_timeout: self.fetch_timeout,
            max_redirects: self.max_redirects,
            request_deadline: self.request_deadline,
            max_outbound: self.max_outbound,
            resource_concurrency: self.resource_concurrency,
            allow_list: self.allow_list.clone(),
            player_markers: self.player_markers.clone(),
            minifier: MinifierOptions {
                css: self.minify_css,
                javascript: self.minify_js,
            },
            passthrough_origin: self.passthrough_origin.clone(),
        }
    }

    /// 实际使用的日志级别
    pub fn effective_log_level(&self) -> &str {
        match &self.log_level {
            Some(level) => level,
            None if self.debug => "debug",
            None => "info",
        }
    }
}

fn describe<T: fmt::Debug, V: EnvVar<T>>(docs: &mut String) {
    match V::DEFAULT {
        Some(default) => docs.push_str(&format!(
            "- `{}`: {} (default: {:?})\n",
            V::NAME,
            V::DESCRIPTION,
            default
        )),
        None => docs.push_str(&format!("- `{}`: {}\n", V::NAME, V::DESCRIPTION)),
    }
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();

    docs.push_str("# Environment Variables Documentation\n\n");

    docs.push_str("## Core Configuration\n\n");
    describe::<_, core::LogLevel>(&mut docs);

    docs.push_str("\n## Proxy Configuration\n\n");
    describe::<_, proxy::Strategy>(&mut docs);
    describe::<_, proxy::FetchTimeout>(&mut docs);
    describe::<_, proxy::MaxRedirects>(&mut docs);
    describe::<_, proxy::RequestDeadline>(&mut docs);
    describe::<_, proxy::MaxOutbound>(&mut docs);
    describe::<_, proxy::ResourceConcurrency>(&mut docs);
    describe::<_, proxy::Allowlist>(&mut docs);
    describe::<_, proxy::PlayerMarkers>(&mut docs);
    describe::<_, proxy::MinifyCss>(&mut docs);
    describe::<_, proxy::MinifyJs>(&mut docs);
    describe::<_, proxy::PassthroughOrigin>(&mut docs);

    docs.push_str("\n## Accounting Configuration\n\n");
    describe::<_, accounting::Debug>(&mut docs);
    describe::<_, accounting::RecentLimit>(&mut docs);
    describe::<_, accounting::ReportInterval>(&mut docs);

    docs.push_str("\n## Web Server Configuration\n\n");
    describe::<_, web::BindAddress>(&mut docs);
    describe::<_, web::Port>(&mut docs);
    describe::<_, web::StaticDir>(&mut docs);

    docs
}
