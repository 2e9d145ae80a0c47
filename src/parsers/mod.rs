//! # 解析器模块
//!
//! 这个模块包含所有用于解析和改写web资源的功能：
//!
//! - HTML解析、文档树操作和固定顺序的改写流程
//! - CSS与JavaScript压缩
//! - 链接和表单重写
//!
//! # 模块组织
//!
//! - `html` - HTML文档解析、文档树、改写器
//! - `css` - CSS样式表压缩
//! - `js` - JavaScript类型识别和压缩
//! - `minify` - 按内容类型分发的压缩入口
//! - `link_rewriter` - 链接重写功能，将链接和表单转换为代理链接

pub mod css;
pub mod html;
pub mod js;
pub mod link_rewriter;
pub mod minify;

// Re-export commonly used items for convenience
pub use html::{html_to_dom, rewrite_document, serialize_document, Document, RewriteContext};
pub use link_rewriter::{AnchorTransform, FormTransform};
pub use minify::{ContentKind, Minifier, MinifierOptions};
