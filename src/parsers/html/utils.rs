/// Favicon 相关的值
pub const FAVICON_VALUES: &[&str] = &["icon", "shortcut icon"];

/// 固定注入的视口声明
pub const VIEWPORT_CONTENT: &str = "width=device-width, initial-scale=1.0";

/// 检查是否为 favicon
pub fn is_favicon(attr_value: &str) -> bool {
    FAVICON_VALUES.contains(&attr_value.to_lowercase().as_str())
}
