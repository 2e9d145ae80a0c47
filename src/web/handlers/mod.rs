//! Web 路由处理器

pub mod debug;
pub mod pages;
pub mod passthrough;

pub use debug::*;
pub use pages::*;
pub use passthrough::*;
