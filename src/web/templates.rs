//! HTML 模板生成
//!
//! 所有页面都使用同一个宿主模板：顶部是地址栏，下方是内容区。
//! 内容区按渲染结果填入改写后的文档、嵌入代码、回退提示或错误面板。

use crate::core::PageOutcome;

const HOST_TEMPLATE: &str = include_str!("../../templates/index.html");

/// 页面标题
pub const PAGE_TITLE: &str = "frameproxy";

/// 回退提示文案
pub const FRAME_REFUSED_MESSAGE: &str = "This page cannot be displayed inside the viewer";

/// 把内容填入宿主模板
///
/// `current_url` 会被转义后放进地址栏，`content` 原样插入。
pub fn host_page(current_url: &str, content: &str) -> String {
    let current_url = html_escape::encode_double_quoted_attribute(current_url);

    fill_template(
        HOST_TEMPLATE,
        &[
            ("TITLE", PAGE_TITLE),
            ("CURRENT_URL", &*current_url),
            ("CONTENT", content),
        ],
    )
}

/// 单遍替换 `{{NAME}}` 占位符，插入的值不会再被扫描
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let replaced = after.find("}}").and_then(|end| {
            let name = &after[..end];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, end + 2))
        });

        match replaced {
            Some((value, consumed)) => {
                out.push_str(value);
                rest = &after[consumed..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// 首页内容
pub fn home_panel() -> String {
    r#"<div class="panel">
        <h2>Browse through the viewer</h2>
        <p>Enter a web address above to open it here.</p>
    </div>"#
        .to_string()
}

/// 目标页面禁止嵌入时的回退内容
pub fn frame_refused_panel(target: &str) -> String {
    format!(
        r#"<div class="panel">
        <h2>{}</h2>
        <p><a href="{}" target="_blank" rel="noopener noreferrer">Open {} directly</a></p>
    </div>"#,
        FRAME_REFUSED_MESSAGE,
        html_escape::encode_double_quoted_attribute(target),
        html_escape::encode_text(target),
    )
}

/// 顶层错误面板
pub fn error_panel(message: &str) -> String {
    format!(
        r#"<div class="panel"><div class="error">{}</div></div>"#,
        html_escape::encode_text(message)
    )
}

/// 把渲染结果转换成完整的宿主页面
pub fn render_outcome(outcome: &PageOutcome) -> String {
    match outcome {
        PageOutcome::Home => host_page("", &home_panel()),
        PageOutcome::Embed { target, markup } => host_page(target, markup),
        PageOutcome::Rendered { target, html } => host_page(target, html),
        PageOutcome::FrameRefused { target } => host_page(target, &frame_refused_panel(target)),
        PageOutcome::Failed { target, error } => host_page(target, &error_panel(&error.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProxyError;

    #[test]
    fn test_host_page_escapes_current_url() {
        let page = host_page("https://a.com/?q=\"x\"&y=<z>", "<p>body</p>");
        assert!(page.contains("value=\"https://a.com/?q=&quot;x&quot;&amp;y=&lt;z&gt;\""));
        assert!(page.contains("<p>body</p>"));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn test_placeholders_in_values_are_not_expanded() {
        let page = host_page("http://x.test/{{CONTENT}}", "<p>{{CURRENT_URL}}</p>");

        assert!(page.contains("value=\"http://x.test/{{CONTENT}}\""));
        assert!(page.contains("<p>{{CURRENT_URL}}</p>"));
        assert_eq!(page.matches("<p>").count(), 1);
    }

    #[test]
    fn test_frame_refused_panel_links_original() {
        let page = render_outcome(&PageOutcome::FrameRefused {
            target: "https://bank.example/login".to_string(),
        });
        assert!(page.contains(FRAME_REFUSED_MESSAGE));
        assert!(page.contains("href=\"https://bank.example/login\""));
    }

    #[test]
    fn test_error_panel_is_escaped() {
        let page = render_outcome(&PageOutcome::Failed {
            target: "http://x".to_string(),
            error: ProxyError::ParseFailure("<broken>".to_string()),
        });
        assert!(page.contains("Error parsing HTML: &lt;broken&gt;"));
        assert!(page.contains("class=\"error\""));
    }

    #[test]
    fn test_home_has_empty_address_bar() {
        let page = render_outcome(&PageOutcome::Home);
        assert!(page.contains("name=\"url\" value=\"\""));
    }
}
