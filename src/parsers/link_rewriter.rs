//! 链接重写模块
//!
//! 负责重写HTML中的链接和表单，使其经由代理的渲染路由打开

use crate::parsers::html::dom::{Document, NodeId};
use crate::parsers::html::element_handlers::ElementTransform;
use crate::parsers::html::walker::RewriteContext;
use crate::utils::url::{absolutize, proxied_url};

/// 判断是否应该跳过重写的表单地址
fn should_skip_action(action: &str) -> bool {
    action
        .get(..11)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"))
}

/// 重写单个URL，不应改写的引用返回 `None`
fn rewrite_url(url: &str, base_url: &str) -> Option<String> {
    absolutize(base_url, url).map(|absolute| proxied_url(&absolute))
}

fn rewrite_attr(document: &mut Document, node: NodeId, attr: &str, base_url: &str) {
    let Some(value) = document.attr(node, attr) else {
        return;
    };

    match rewrite_url(value, base_url) {
        Some(rewritten) => document.set_attr(node, attr, &rewritten),
        None => tracing::trace!(attr, "special reference left untouched"),
    }
}

/// 表单改写器
///
/// `action` 改为 `/?url=<绝对地址>`；`javascript:` 保持不变，
/// 空 `action` 指向当前页面。
pub struct FormTransform;

impl ElementTransform for FormTransform {
    fn name(&self) -> &'static str {
        "form"
    }

    fn apply(&self, document: &mut Document, context: &RewriteContext<'_>) {
        for form in document.elements_named("form") {
            let skip = document
                .attr(form, "action")
                .map_or(true, |action| should_skip_action(action.trim()));

            if !skip {
                rewrite_attr(document, form, "action", context.base_url);
            }
        }
    }
}

/// 锚点改写器
///
/// 和表单相同，`#片段`、`javascript:`、`mailto:` 等特殊引用保持原样。
pub struct AnchorTransform;

impl ElementTransform for AnchorTransform {
    fn name(&self) -> &'static str {
        "anchor"
    }

    fn apply(&self, document: &mut Document, context: &RewriteContext<'_>) {
        for anchor in document.elements_named("a") {
            rewrite_attr(document, anchor, "href", context.base_url);
        }
    }
}
