//! # 工具模块
//!
//! 这个模块包含各种工具函数和实用程序：
//!
//! - 资源引用的分类与解析
//! - 目标 URL 的规范化
//! - 代理渲染路由的 URL 构造
//!
//! # 模块组织
//!
//! - `url` - URL 处理、引用分类、代理链接等工具函数

pub mod url;

// Re-export commonly used items for convenience
pub use url::{
    absolutize, classify_reference, normalize_target, proxied_url, resolve, ReferenceKind, Url,
};
