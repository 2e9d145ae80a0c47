//! HTML 元素改写器模块
//!
//! 每个改写器负责一类元素，按固定顺序依次作用于整棵文档树。
//!
//! # 架构设计
//!
//! - `ElementTransform` trait 定义了改写器的统一接口
//! - 各种具体改写器实现该trait，处理特定元素类型
//! - [`super::walker::TransformPipeline`] 按固定顺序持有所有改写器
//!
//! 改写器之间不共享状态，所需的一切都通过 [`RewriteContext`] 传入。
//! 改写过程是同步的：样式表和脚本的网络请求在改写开始前就已经完成。

use crate::embed::{HostTreatment, EMBED_ALLOW_POLICY};
use crate::utils::url::absolutize;

use super::dom::{Document, NodeId};
use super::parser::{parse_link_type, LinkType};
use super::utils::VIEWPORT_CONTENT;
use super::walker::RewriteContext;

/// HTML 元素改写器特征
pub trait ElementTransform: Send + Sync {
    /// 改写器名称，用于日志
    fn name(&self) -> &'static str;

    /// 对整份文档执行改写
    ///
    /// 单个元素的失败只影响该元素本身，不会中断整个改写过程。
    fn apply(&self, document: &mut Document, context: &RewriteContext<'_>);
}

/// Rewrites the attribute `attr` of `node` to an absolute URL.
///
/// References that must not be rewritten (fragments, `javascript:` and the
/// like) are left alone.
pub(crate) fn absolutize_attr(
    document: &mut Document,
    node: NodeId,
    attr: &str,
    context: &RewriteContext<'_>,
) {
    let Some(value) = document.attr(node, attr) else {
        return;
    };

    if let Some(absolute) = absolutize(context.base_url, value) {
        document.set_attr(node, attr, &absolute);
    }
}

/// META 元素改写器
///
/// 依次完成三件事：
///
/// 1. 移除所有 `meta[name=viewport]`，在 `<head>` 开头插入固定视口声明
/// 2. 移除所有 `meta[charset]`，在 `<head>` 开头插入 `<meta charset="UTF-8">`
/// 3. 移除所有 `meta[http-equiv=Content-Security-Policy]`
///
/// 因为第二步后执行，字符集声明最终位于 `<head>` 的第一个位置。
pub struct MetaTransform;

impl MetaTransform {
    fn is_meta_where(document: &Document, node: NodeId, attr: &str, value: Option<&str>) -> bool {
        if !document
            .element_name(node)
            .is_some_and(|n| n.eq_ignore_ascii_case("meta"))
        {
            return false;
        }

        match (document.attr(node, attr), value) {
            (Some(actual), Some(expected)) => actual.trim().eq_ignore_ascii_case(expected),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

impl ElementTransform for MetaTransform {
    fn name(&self) -> &'static str {
        "meta"
    }

    fn apply(&self, document: &mut Document, _context: &RewriteContext<'_>) {
        let Some(head) = document.head() else {
            tracing::debug!("document has no head, skipping meta normalization");
            return;
        };

        document.remove_where(|d, n| Self::is_meta_where(d, n, "name", Some("viewport")));
        let viewport =
            document.create_element("meta", &[("name", "viewport"), ("content", VIEWPORT_CONTENT)]);
        document.prepend_child(head, viewport);

        document.remove_where(|d, n| Self::is_meta_where(d, n, "charset", None));
        let charset = document.create_element("meta", &[("charset", "UTF-8")]);
        document.prepend_child(head, charset);

        let removed = document.remove_where(|d, n| {
            Self::is_meta_where(d, n, "http-equiv", Some("Content-Security-Policy"))
        });
        if removed > 0 {
            tracing::debug!(removed, "removed content security policy meta tags");
        }
    }
}

/// HEAD 元素改写器
///
/// `<base href>` 和图标链接（`rel` 为 `icon` 或 `shortcut icon`）改为绝对地址。
pub struct HeadTransform;

impl ElementTransform for HeadTransform {
    fn name(&self) -> &'static str {
        "head"
    }

    fn apply(&self, document: &mut Document, context: &RewriteContext<'_>) {
        for base in document.elements_named("base") {
            absolutize_attr(document, base, "href", context);
        }

        for link in document.elements_named("link") {
            let is_icon = document
                .attr(link, "rel")
                .is_some_and(|rel| parse_link_type(rel).contains(&LinkType::Favicon));

            if is_icon {
                absolutize_attr(document, link, "href", context);
            }
        }
    }
}

/// IMG 元素改写器
///
/// 只把 `src` 改为绝对地址，不下载图片内容。
pub struct ImageTransform;

impl ElementTransform for ImageTransform {
    fn name(&self) -> &'static str {
        "img"
    }

    fn apply(&self, document: &mut Document, context: &RewriteContext<'_>) {
        for img in document.elements_named("img") {
            absolutize_attr(document, img, "src", context);
        }
    }
}

/// IFRAME 元素改写器
///
/// 允许列表中的视频站点保持原地址，并加上播放器所需的权限；
/// 其他 iframe 只把 `src` 改为绝对地址。
pub struct IframeTransform;

impl ElementTransform for IframeTransform {
    fn name(&self) -> &'static str {
        "iframe"
    }

    fn apply(&self, document: &mut Document, context: &RewriteContext<'_>) {
        for iframe in document.elements_named("iframe") {
            let Some(src) = document.attr(iframe, "src") else {
                continue;
            };

            if context.allow_list.allows(src, HostTreatment::TrustedFrame) {
                document.set_attr(iframe, "allowfullscreen", "true");
                document.set_attr(iframe, "allow", EMBED_ALLOW_POLICY);
            } else {
                absolutize_attr(document, iframe, "src", context);
            }
        }
    }
}
