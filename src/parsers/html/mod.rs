//! HTML解析和处理模块
//!
//! - `utils`: 基础工具函数和常量
//! - `parser`: 文档解析和链接类型
//! - `dom`: 独占所有权的文档树
//! - `serializer`: 序列化功能
//! - `element_handlers`: 元素改写器接口和简单改写器
//! - `assets`: 样式表和脚本的预取与内联
//! - `walker`: 固定顺序的改写流程

pub mod assets;
pub mod dom;
pub mod element_handlers;
pub mod parser;
pub mod serializer;
pub mod utils;
pub mod walker;

pub use assets::{collect_resources, fetch_resources, ResourceBodies};
pub use dom::{Attr, Document, NodeData, NodeId};
pub use element_handlers::ElementTransform;
pub use parser::{html_to_dom, parse_link_type, LinkType};
pub use serializer::serialize_document;
pub use utils::{is_favicon, FAVICON_VALUES};
pub use walker::{rewrite_document, RewriteContext, TransformPipeline};
