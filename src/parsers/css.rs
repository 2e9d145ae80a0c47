//! CSS 处理模块
//!
//! 使用 lightningcss 解析并压缩样式表。解析失败时调用方会拿到错误，
//! 由 [`crate::parsers::minify::Minifier`] 负责回退到原文。

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};

/// Minifies a stylesheet.
///
/// Parse errors are not recovered from: an invalid rule fails the whole sheet
/// so the caller can keep the author's original text instead.
pub fn minify_css(css: &str) -> Result<String, String> {
    let mut stylesheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| format!("Failed to parse CSS: {}", e))?;

    stylesheet
        .minify(MinifyOptions::default())
        .map_err(|e| format!("Failed to minify CSS: {}", e))?;

    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| format!("Failed to print CSS: {}", e))?;

    Ok(result.code)
}

/// 防止内联样式中的 `</style` 提前结束元素
pub fn escape_inline_css(css: &str) -> String {
    escape_end_tag(css, "</style")
}

/// Replaces every case-insensitive occurrence of `end_tag` with `<\/...`.
pub(crate) fn escape_end_tag(text: &str, end_tag: &str) -> String {
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for (idx, _) in lower.match_indices(end_tag) {
        out.push_str(&text[last..idx]);
        out.push_str("<\\/");
        last = idx + 2;
    }
    out.push_str(&text[last..]);

    out
}
