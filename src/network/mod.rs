//! # 网络模块
//!
//! 这个模块包含所有与上游站点通信相关的功能：
//!
//! - 带浏览器请求头的 HTTP 抓取
//! - 全局出站并发限制
//! - 页面是否允许被嵌入的探测
//!
//! # 模块组织
//!
//! - `session` - HTTP 客户端、请求处理、响应解码
//! - `framing` - `X-Frame-Options` 探测

pub mod framing;
pub mod session;

// Re-export commonly used items for convenience
pub use framing::frame_options_allow;
pub use session::{FetchResponse, Fetcher};
