//! # 第三方嵌入处理
//!
//! 视频站点的页面不走通用的抓取和改写流程，而是换成官方的嵌入代码。
//! 同时这里维护一份按主机名匹配的允许列表，决定哪些脚本必须留在原站点执行、
//! 哪些 iframe 可以原样跨域加载。

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::utils::url::Url;

/// Feature policy granted to trusted video frames.
pub const EMBED_ALLOW_POLICY: &str =
    "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture";

/// 官方嵌入播放器地址前缀
pub const EMBED_ORIGIN: &str = "https://www.youtube.com/embed/";

static WATCH_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"youtube\.com/watch\?v=([^&]+)").expect("valid regex"));
static SHORT_LINK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"youtu\.be/([^?&#/]+)").expect("valid regex"));

/// 主机需要的特殊处理
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostTreatment {
    /// 脚本必须从原站点加载，不内联
    ExternalScript,
    /// iframe 原样保留并授予播放器所需的权限
    TrustedFrame,
}

impl HostTreatment {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "script" => Some(HostTreatment::ExternalScript),
            "frame" => Some(HostTreatment::TrustedFrame),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            HostTreatment::ExternalScript => "script",
            HostTreatment::TrustedFrame => "frame",
        }
    }
}

/// One allow-list entry. `host` matches itself and any of its subdomains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllowRule {
    pub host: String,
    pub treatments: Vec<HostTreatment>,
}

impl AllowRule {
    pub fn new(host: &str, treatments: &[HostTreatment]) -> Self {
        AllowRule {
            host: host.trim().trim_start_matches('.').to_ascii_lowercase(),
            treatments: treatments.to_vec(),
        }
    }

    fn matches_host(&self, host: &str) -> bool {
        host == self.host
            || (host.len() > self.host.len()
                && host.ends_with(&self.host)
                && host.as_bytes()[host.len() - self.host.len() - 1] == b'.')
    }
}

/// 允许列表：主机名模式到处理方式的映射
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllowList {
    rules: Vec<AllowRule>,
}

impl Default for AllowList {
    fn default() -> Self {
        use HostTreatment::*;

        AllowList {
            rules: vec![
                AllowRule::new("youtube.com", &[ExternalScript, TrustedFrame]),
                AllowRule::new("youtube-nocookie.com", &[TrustedFrame]),
                AllowRule::new("youtu.be", &[TrustedFrame]),
                AllowRule::new("ytimg.com", &[ExternalScript]),
                AllowRule::new("googlevideo.com", &[ExternalScript]),
            ],
        }
    }
}

impl AllowList {
    pub fn new(rules: Vec<AllowRule>) -> Self {
        AllowList { rules }
    }

    pub fn rules(&self) -> &[AllowRule] {
        &self.rules
    }

    /// Parses `host=script+frame,host=frame`.
    pub fn parse(value: &str) -> Result<Self, String> {
        let mut rules = Vec::new();

        for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (host, treatments) = entry
                .split_once('=')
                .ok_or_else(|| format!("entry '{}' is missing '=<treatments>'", entry))?;

            if host.trim().is_empty() {
                return Err(format!("entry '{}' has an empty host", entry));
            }

            let treatments = treatments
                .split('+')
                .map(|t| {
                    HostTreatment::parse(t)
                        .ok_or_else(|| format!("unknown treatment '{}' (use script or frame)", t))
                })
                .collect::<Result<Vec<_>, _>>()?;

            rules.push(AllowRule::new(host, &treatments));
        }

        Ok(AllowList { rules })
    }

    /// Checks whether the host of `reference` carries `treatment`.
    ///
    /// Relative references have no host and never match.
    pub fn allows(&self, reference: &str, treatment: HostTreatment) -> bool {
        let Some(host) = host_of(reference) else {
            return false;
        };

        self.rules
            .iter()
            .any(|rule| rule.treatments.contains(&treatment) && rule.matches_host(&host))
    }
}

impl fmt::Display for AllowList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .rules
            .iter()
            .map(|rule| {
                let treatments: Vec<&str> = rule.treatments.iter().map(|t| t.as_str()).collect();
                format!("{}={}", rule.host, treatments.join("+"))
            })
            .collect();
        write!(f, "{}", entries.join(","))
    }
}

fn host_of(reference: &str) -> Option<String> {
    let reference = reference.trim();
    let parsed = if reference.starts_with("//") {
        Url::parse(&format!("https:{}", reference))
    } else {
        Url::parse(reference)
    };

    parsed
        .ok()
        .and_then(|url| url.host_str().map(|h| h.to_ascii_lowercase()))
}

/// 从视频页面地址中提取视频 ID
///
/// 支持 `youtube.com/watch?v=<id>`（ID 截止到下一个 `&`）和
/// `youtu.be/<id>` 两种形式；都不匹配时返回空字符串。
pub fn extract_video_id(url: &str) -> String {
    let captures = WATCH_ID
        .captures(url)
        .or_else(|| SHORT_LINK_ID.captures(url));

    captures
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// 生成官方嵌入片段
pub fn embed_markup(video_id: &str) -> String {
    let video_id = html_escape::encode_double_quoted_attribute(video_id);

    format!(
        r#"<div class="video-container">
    <iframe
        src="{origin}{id}"
        frameborder="0"
        allowfullscreen="true"
        allow="{allow}">
    </iframe>
</div>"#,
        origin = EMBED_ORIGIN,
        id = video_id,
        allow = EMBED_ALLOW_POLICY,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_watch_ids() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=ABC123&t=5"),
            "ABC123"
        );
        assert_eq!(
            extract_video_id("https://m.youtube.com/watch?v=dQw4w9WgXcQ"),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn extracts_short_link_ids() {
        assert_eq!(extract_video_id("https://youtu.be/XYZ789"), "XYZ789");
        assert_eq!(extract_video_id("https://youtu.be/XYZ789?t=42"), "XYZ789");
    }

    #[test]
    fn unknown_urls_yield_empty_id() {
        assert_eq!(extract_video_id("https://example.com/watch"), "");
        assert_eq!(extract_video_id("https://www.youtube.com/feed/trending"), "");
        assert_eq!(extract_video_id("https://youtu.be/"), "");
    }

    #[test]
    fn embed_markup_references_the_id() {
        let markup = embed_markup("ABC123");
        assert!(markup.contains(r#"src="https://www.youtube.com/embed/ABC123""#));
        assert!(markup.contains(EMBED_ALLOW_POLICY));
        assert!(markup.contains(r#"allowfullscreen="true""#));
    }

    #[test]
    fn allow_list_matches_hosts_and_subdomains() {
        let list = AllowList::default();

        assert!(list.allows("https://www.youtube.com/iframe_api", HostTreatment::ExternalScript));
        assert!(list.allows("//s.ytimg.com/yts/jsbin/www-widgetapi.js", HostTreatment::ExternalScript));
        assert!(list.allows("https://youtu.be/XYZ", HostTreatment::TrustedFrame));
        assert!(!list.allows("https://youtu.be/XYZ", HostTreatment::ExternalScript));
        assert!(!list.allows("https://notyoutube.com/x.js", HostTreatment::ExternalScript));
        assert!(!list.allows("https://youtube.com.evil.org/x.js", HostTreatment::ExternalScript));
        assert!(!list.allows("/youtube.com/player.js", HostTreatment::ExternalScript));
    }

    #[test]
    fn allow_list_parses_and_displays() {
        let list = AllowList::parse("vimeo.com=frame, player.vimeo.com=script+frame").unwrap();

        assert_eq!(list.rules().len(), 2);
        assert!(list.allows("https://player.vimeo.com/api.js", HostTreatment::ExternalScript));
        assert!(!list.allows("https://vimeo.com/api.js", HostTreatment::ExternalScript));
        assert_eq!(list.to_string(), "vimeo.com=frame,player.vimeo.com=script+frame");

        assert!(AllowList::parse("vimeo.com").is_err());
        assert!(AllowList::parse("vimeo.com=inline").is_err());
        assert!(AllowList::parse("=frame").is_err());
    }
}
