//! 文档改写器模块
//!
//! 这个模块提供文档改写的主要入口点。改写分为固定顺序的若干步，
//! 每一步由一个 [`ElementTransform`] 完成：
//!
//! | 顺序 | 改写器 | 作用 |
//! |------|--------|------|
//! | 1 | `meta` | 规范化视口、字符集声明，移除 CSP |
//! | 2 | `head` | `<base>` 和图标链接改为绝对地址 |
//! | 3 | `css` | 内联外部样式表，压缩内联样式 |
//! | 4 | `js` | 内联外部脚本，压缩内联脚本 |
//! | 5 | `img` | 图片地址改为绝对地址 |
//! | 6 | `iframe` | 视频嵌入授权，其他地址改为绝对地址 |
//! | 7 | `form` | 表单提交经由代理 |
//! | 8 | `anchor` | 链接经由代理 |
//!
//! 这个顺序是对外承诺的行为，后面的步骤可以依赖前面步骤的结果。

use crate::embed::AllowList;
use crate::parsers::link_rewriter::{AnchorTransform, FormTransform};
use crate::parsers::minify::Minifier;

use super::assets::{ResourceBodies, ScriptTransform, StylesheetTransform};
use super::dom::Document;
use super::element_handlers::{
    ElementTransform, HeadTransform, IframeTransform, ImageTransform, MetaTransform,
};

/// 一次改写所需的全部输入
#[derive(Clone, Copy)]
pub struct RewriteContext<'a> {
    /// 解析相对地址所用的基础地址（重定向之后的最终地址）
    pub base_url: &'a str,
    pub allow_list: &'a AllowList,
    pub minifier: &'a Minifier,
    /// 内联脚本中出现这些字符串时不做压缩
    pub player_markers: &'a [String],
    /// 改写前已取回的样式表和脚本
    pub resources: &'a ResourceBodies,
}

/// 按固定顺序持有所有改写器
pub struct TransformPipeline {
    transforms: Vec<Box<dyn ElementTransform>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        TransformPipeline {
            transforms: vec![
                Box::new(MetaTransform),
                Box::new(HeadTransform),
                Box::new(StylesheetTransform),
                Box::new(ScriptTransform),
                Box::new(ImageTransform),
                Box::new(IframeTransform),
                Box::new(FormTransform),
                Box::new(AnchorTransform),
            ],
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    pub fn run(&self, document: &mut Document, context: &RewriteContext<'_>) {
        for transform in &self.transforms {
            tracing::debug!(transform = transform.name(), "applying transform");
            transform.apply(document, context);
        }
    }
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// 改写整份文档
pub fn rewrite_document(document: &mut Document, context: &RewriteContext<'_>) {
    TransformPipeline::new().run(document, context);
}

#[cfg(test)]
pub(crate) fn test_context_with<R>(
    base_url: &str,
    resources: &ResourceBodies,
    f: impl FnOnce(&RewriteContext<'_>) -> R,
) -> R {
    let allow_list = AllowList::default();
    let minifier = Minifier::default();
    let player_markers = vec!["youtube.com".to_string(), "YT.Player".to_string()];

    f(&RewriteContext {
        base_url,
        allow_list: &allow_list,
        minifier: &minifier,
        player_markers: &player_markers,
        resources,
    })
}

#[cfg(test)]
pub(crate) fn test_context<R>(base_url: &str, f: impl FnOnce(&RewriteContext<'_>) -> R) -> R {
    test_context_with(base_url, &ResourceBodies::new(), f)
}
