//! # frameproxy
//!
//! 内容改写反向代理：抓取任意网页，把其中的资源引用改写为绝对地址或代理地址，
//! 内联并压缩样式和脚本，输出一份可以直接嵌入查看器的单一 HTML 文档。
//!
//! ## 模块组织
//!
//! - `core` - 错误类型、流水线选项和页面处理器
//! - `parsers` - 文档树、改写器、CSS/JavaScript 压缩
//! - `network` - 出站抓取和可嵌入性探测
//! - `embed` - 视频页面的嵌入代码和允许列表
//! - `accounting` - 可选的请求统计
//! - `env` - 环境变量配置
//! - `utils` - URL 处理工具
//! - `web` - Web服务器功能（可选）

pub mod accounting;
pub mod core;
pub mod embed;
pub mod env;
pub mod network;
pub mod parsers;
pub mod utils;
#[cfg(feature = "web")]
pub mod web;

// Re-export commonly used items for convenience
pub use crate::core::*;
pub use crate::network::*;
pub use crate::utils::*;
