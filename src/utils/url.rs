//! URL 处理工具
//!
//! 资源引用在被改写之前总是先经过分类（[`classify_reference`]），
//! 之后才交给 [`resolve`] 或 [`absolutize`] 处理。

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

pub use url::Url;

/// 代理自身的渲染路由
pub const RENDER_ROUTE: &str = "/?url=";

/// Characters that would break the `url` query parameter of the render route.
/// Everything else is kept verbatim so proxied links stay readable.
const QUERY_VALUE_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'`');

/// 资源引用的分类
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `http://` 或 `https://` 开头的绝对地址
    Absolute,
    /// 相对于文档的地址
    Relative,
    /// `//host/path` 形式的协议相对地址
    ProtocolRelative,
    /// `javascript:`、`#fragment`、`mailto:` 等不应被改写的引用
    Special,
}

/// Joins a possibly-relative reference onto a base URL.
///
/// Absolute `http(s)://` references are returned unchanged. Anything else is
/// appended to `base` with exactly one separating slash. This is deliberately
/// not RFC 3986 resolution: `../`, query-relative and `//host` references are
/// not understood, so callers that may see protocol-relative references go
/// through [`absolutize`] instead.
pub fn resolve(base: &str, reference: &str) -> String {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return reference.to_string();
    }

    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        reference.trim_start_matches('/')
    )
}

/// 对资源引用进行分类
pub fn classify_reference(reference: &str) -> ReferenceKind {
    let reference = reference.trim();

    if reference.starts_with('#') {
        return ReferenceKind::Special;
    }

    if reference.starts_with("//") {
        return ReferenceKind::ProtocolRelative;
    }

    match scheme_of(reference) {
        Some(scheme)
            if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") =>
        {
            ReferenceKind::Absolute
        }
        Some(_) => ReferenceKind::Special,
        None => ReferenceKind::Relative,
    }
}

/// Turns a reference into an absolute URL, or `None` when it must not be touched.
///
/// Protocol-relative references borrow the scheme of `base`; an empty
/// reference points at the base document itself.
pub fn absolutize(base: &str, reference: &str) -> Option<String> {
    let trimmed = reference.trim();

    match classify_reference(trimmed) {
        ReferenceKind::Special => None,
        ReferenceKind::Absolute => Some(trimmed.to_string()),
        ReferenceKind::ProtocolRelative => {
            let scheme = scheme_of(base)
                .filter(|s| s.eq_ignore_ascii_case("http"))
                .unwrap_or("https");
            Some(format!("{}:{}", scheme, trimmed))
        }
        ReferenceKind::Relative if trimmed.is_empty() => Some(base.to_string()),
        ReferenceKind::Relative => Some(resolve(base, trimmed)),
    }
}

/// 规范化目标地址，缺少协议时补上 `http://`
///
/// 空输入返回 `None`（首页状态）。
pub fn normalize_target(raw: &str) -> Option<String> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(trimmed.to_string())
    } else {
        Some(format!("http://{}", trimmed.trim_start_matches('/')))
    }
}

/// 构造指向代理渲染路由的链接：`/?url=<absolute>`
pub fn proxied_url(absolute: &str) -> String {
    format!(
        "{}{}",
        RENDER_ROUTE,
        utf8_percent_encode(absolute, QUERY_VALUE_ENCODE_SET)
    )
}

/// Returns the scheme of `s` if it starts with one (`scheme:`), per RFC 3986 §3.1.
fn scheme_of(s: &str) -> Option<&str> {
    let colon = s.find(':')?;
    let scheme = &s[..colon];
    let mut chars = scheme.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return None,
    }

    if chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.') {
        Some(scheme)
    } else {
        None
    }
}
