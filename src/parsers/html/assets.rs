//! 资源内联
//!
//! 外部样式表和脚本分两步处理：
//!
//! 1. 改写开始前，[`collect_resources`] 找出需要抓取的地址，
//!    [`fetch_resources`] 以受限并发把它们全部取回
//! 2. 改写阶段，[`StylesheetTransform`] 和 [`ScriptTransform`] 只从已取回的内容中查找，
//!    找不到（抓取失败）的元素保持原样

use std::collections::{HashMap, HashSet};

use futures::stream::{self, StreamExt};

use crate::embed::{AllowList, HostTreatment};
use crate::network::session::{FetchResponse, Fetcher};
use crate::parsers::css::escape_inline_css;
use crate::parsers::js::{escape_inline_js, script_kind, ScriptKind};
use crate::parsers::minify::ContentKind;
use crate::utils::url::absolutize;

use super::dom::{Attr, Document, NodeId};
use super::element_handlers::{absolutize_attr, ElementTransform};
use super::parser::{parse_link_type, LinkType};
use super::walker::RewriteContext;

/// 已成功取回的资源：绝对地址到解码后文本的映射
pub type ResourceBodies = HashMap<String, String>;

fn is_stylesheet_link(document: &Document, node: NodeId) -> bool {
    document
        .attr(node, "rel")
        .is_some_and(|rel| parse_link_type(rel).contains(&LinkType::Stylesheet))
}

/// 找出所有需要内联的外部样式表和脚本，返回去重后的绝对地址
pub fn collect_resources(document: &Document, base_url: &str, allow_list: &AllowList) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    let stylesheets = document
        .elements_named("link")
        .into_iter()
        .filter(|&link| is_stylesheet_link(document, link))
        .filter_map(|link| document.attr(link, "href"));

    let scripts = document
        .elements_named("script")
        .into_iter()
        .filter_map(|script| document.attr(script, "src"))
        .filter(|src| !allow_list.allows(src, HostTreatment::ExternalScript));

    for reference in stylesheets.chain(scripts) {
        if let Some(url) = absolutize(base_url, reference) {
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        }
    }

    urls
}

/// Fetches every URL with at most `concurrency` requests in flight.
///
/// Failures and non-2xx responses are logged and left out of the result.
pub async fn fetch_resources(
    fetcher: &Fetcher,
    urls: Vec<String>,
    concurrency: usize,
) -> ResourceBodies {
    stream::iter(urls)
        .map(|url| async move {
            let result = fetcher
                .fetch(&url)
                .await
                .and_then(FetchResponse::ensure_success);
            (url, result)
        })
        .buffer_unordered(concurrency.max(1))
        .filter_map(|(url, result)| async move {
            match result {
                Ok(response) => Some((url, response.text())),
                Err(e) => {
                    tracing::warn!(%url, error = %e, "resource fetch failed, element left untouched");
                    None
                }
            }
        })
        .collect::<ResourceBodies>()
        .await
}

/// 样式表改写器
///
/// 取回成功的 `link[rel~=stylesheet]` 被替换为内联 `<style>`（保留 `media`），
/// 其余 `<style>` 就地压缩。
pub struct StylesheetTransform;

impl ElementTransform for StylesheetTransform {
    fn name(&self) -> &'static str {
        "css"
    }

    fn apply(&self, document: &mut Document, context: &RewriteContext<'_>) {
        let mut inlined = HashSet::new();

        for link in document.elements_named("link") {
            if !is_stylesheet_link(document, link) {
                continue;
            }

            let Some(url) = document
                .attr(link, "href")
                .and_then(|href| absolutize(context.base_url, href))
            else {
                continue;
            };

            let Some(body) = context.resources.get(&url) else {
                continue;
            };

            let css = escape_inline_css(&context.minifier.minify_kind(ContentKind::Css, body));
            let attrs: Vec<Attr> = document
                .attr(link, "media")
                .map(|media| vec![Attr::new("media", media)])
                .unwrap_or_default();

            document.replace_element(link, "style", attrs, &css);
            inlined.insert(link);
            tracing::debug!(%url, bytes = css.len(), "stylesheet inlined");
        }

        for style in document.elements_named("style") {
            if inlined.contains(&style) {
                continue;
            }

            let text = document.text(style);
            let minified = context.minifier.minify_kind(ContentKind::Css, &text);
            if minified != text {
                document.set_text(style, &minified);
            }
        }
    }
}

/// 脚本改写器
///
/// - 允许列表中的脚本主机：`src` 改为绝对地址，仍从原站点加载
/// - 其他外部脚本：取回成功则移除 `src` 并内联压缩后的内容
/// - 内联脚本：包含播放器标记的原样保留，其余压缩
///
/// 非 JavaScript 类型的脚本（JSON 数据块、模板等）从不压缩。
pub struct ScriptTransform;

impl ScriptTransform {
    fn minify(context: &RewriteContext<'_>, kind: ScriptKind, text: &str) -> String {
        match kind {
            ScriptKind::Classic => context.minifier.minify_kind(ContentKind::JavaScript, text),
            ScriptKind::Module => context
                .minifier
                .minify_kind(ContentKind::JavaScriptModule, text),
            ScriptKind::Data => text.to_string(),
        }
    }

    fn inline_external(document: &mut Document, script: NodeId, context: &RewriteContext<'_>) {
        let Some(src) = document.attr(script, "src") else {
            return;
        };

        if context.allow_list.allows(src, HostTreatment::ExternalScript) {
            absolutize_attr(document, script, "src", context);
            return;
        }

        let Some(url) = absolutize(context.base_url, src) else {
            return;
        };

        let Some(body) = context.resources.get(&url) else {
            return;
        };

        let kind = script_kind(document.attr(script, "type"));
        let js = escape_inline_js(&Self::minify(context, kind, body));

        document.remove_attr(script, "src");
        document.remove_attr(script, "integrity");
        document.set_text(script, &js);
        tracing::debug!(%url, bytes = js.len(), "script inlined");
    }

    fn minify_inline(document: &mut Document, script: NodeId, context: &RewriteContext<'_>) {
        let text = document.text(script);
        if text.trim().is_empty() {
            return;
        }

        if context
            .player_markers
            .iter()
            .any(|marker| text.contains(marker.as_str()))
        {
            tracing::debug!("inline player script kept as-is");
            return;
        }

        let kind = script_kind(document.attr(script, "type"));
        let minified = Self::minify(context, kind, &text);
        if minified != text {
            document.set_text(script, &escape_inline_js(&minified));
        }
    }
}

impl ElementTransform for ScriptTransform {
    fn name(&self) -> &'static str {
        "js"
    }

    fn apply(&self, document: &mut Document, context: &RewriteContext<'_>) {
        for script in document.elements_named("script") {
            if document.has_attr(script, "src") {
                Self::inline_external(document, script, context);
            } else {
                Self::minify_inline(document, script, context);
            }
        }
    }
}
