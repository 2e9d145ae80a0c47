//! 资源压缩
//!
//! 按内容类型分发到 CSS 或 JavaScript 压缩器。压缩失败永远不会向上传播：
//! 调用方总能拿到可用的文本，最坏情况下就是原文。

use super::css::minify_css;
use super::js::{minify_js, ScriptKind};

/// 内容类型分类
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Css,
    JavaScript,
    JavaScriptModule,
    Other,
}

impl ContentKind {
    /// 根据 MIME 类型（可带参数）判断内容类型
    pub fn from_content_type(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "text/css" => ContentKind::Css,
            "application/javascript" | "text/javascript" | "application/x-javascript" => {
                ContentKind::JavaScript
            }
            _ => ContentKind::Other,
        }
    }
}

/// 按语言开关压缩
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MinifierOptions {
    pub css: bool,
    pub javascript: bool,
}

impl Default for MinifierOptions {
    fn default() -> Self {
        MinifierOptions {
            css: true,
            javascript: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Minifier {
    options: MinifierOptions,
}

impl Minifier {
    pub fn new(options: MinifierOptions) -> Self {
        Minifier { options }
    }

    pub fn options(&self) -> MinifierOptions {
        self.options
    }

    /// Minifies `text` according to its content type.
    ///
    /// Unknown types, disabled languages, malformed input and output that does
    /// not shrink all yield the original text.
    pub fn minify(&self, content_type: &str, text: &str) -> String {
        self.minify_kind(ContentKind::from_content_type(content_type), text)
    }

    pub fn minify_kind(&self, kind: ContentKind, text: &str) -> String {
        let result = match kind {
            ContentKind::Css if self.options.css => minify_css(text),
            ContentKind::JavaScript if self.options.javascript => {
                minify_js(text, ScriptKind::Classic)
            }
            ContentKind::JavaScriptModule if self.options.javascript => {
                minify_js(text, ScriptKind::Module)
            }
            _ => return text.to_string(),
        };

        match result {
            Ok(minified) if minified.len() < text.len() => minified,
            Ok(_) => text.to_string(),
            Err(e) => {
                tracing::debug!(?kind, error = %e, "minification failed, keeping original text");
                text.to_string()
            }
        }
    }
}
