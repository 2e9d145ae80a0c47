//! HTML 解析器模块
//!
//! 使用 html5ever 把字节流解析成 [`Document`]。html5ever 的 rcdom 只在解析阶段使用，
//! 解析完成后立即转换成独占所有权的文档树，之后的改写和序列化都不再接触它。
//!
//! ## 主要功能
//!
//! - **文档解析**: 按给定字符集解码并解析 HTML
//! - **链接类型解析**: 解析 `<link>` 元素的 `rel` 属性

use encoding_rs::{Encoding, UTF_8};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use super::dom::{Attr, Document, NodeData, NodeId};
use super::utils::is_favicon;
use crate::core::ProxyError;

/// HTML链接类型枚举
///
/// 改写流程关心的 `<link rel>` 取值，其余值被忽略。
#[derive(Debug, PartialEq, Eq)]
pub enum LinkType {
    /// 网站图标
    Favicon,
    /// CSS样式表
    Stylesheet,
}

/// 解析HTML链接的rel属性值
///
/// 支持多个空格分隔的rel值，不区分大小写。
/// `shortcut icon` 这样的双词写法整体识别为 [`LinkType::Favicon`]。
///
/// ```rust
/// # use frameproxy::parsers::html::parser::{parse_link_type, LinkType};
/// let types = parse_link_type("preload STYLESHEET");
/// assert_eq!(types, vec![LinkType::Stylesheet]);
/// ```
pub fn parse_link_type(link_attr_rel_value: &str) -> Vec<LinkType> {
    let mut types: Vec<LinkType> = vec![];

    if is_favicon(link_attr_rel_value.trim()) {
        types.push(LinkType::Favicon);
        return types;
    }

    for link_attr_rel_type in link_attr_rel_value.split_whitespace() {
        if link_attr_rel_type.eq_ignore_ascii_case("stylesheet") {
            types.push(LinkType::Stylesheet);
        } else if is_favicon(link_attr_rel_type) {
            types.push(LinkType::Favicon);
        }
    }

    types
}

/// 将 HTML 字节按指定字符集解码并解析为文档树
///
/// 无法识别的字符集回退到 UTF-8。
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> Result<Document, ProxyError> {
    let encoding = Encoding::for_label(document_encoding.as_bytes()).unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(data);

    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut text.as_bytes())
        .map_err(|e| ProxyError::ParseFailure(e.to_string()))?;

    Ok(from_rcdom(&dom))
}

/// Copies an rcdom tree into an owned [`Document`].
///
/// Template contents become ordinary children of their `<template>` element.
fn from_rcdom(dom: &RcDom) -> Document {
    let mut document = Document::new();
    let root = document.root();
    let mut stack: Vec<(Handle, NodeId)> = dom
        .document
        .children
        .borrow()
        .iter()
        .rev()
        .map(|child| (child.clone(), root))
        .collect();

    // 先序遍历：兄弟节点按出现顺序依次追加到父节点
    while let Some((handle, parent)) = stack.pop() {
        let data = match &handle.data {
            RcNodeData::Document => continue,
            RcNodeData::Doctype {
                name,
                public_id,
                system_id,
            } => NodeData::Doctype {
                name: name.to_string(),
                public_id: public_id.to_string(),
                system_id: system_id.to_string(),
            },
            RcNodeData::Text { contents } => NodeData::Text(contents.borrow().to_string()),
            RcNodeData::Comment { contents } => NodeData::Comment(contents.to_string()),
            RcNodeData::Element { name, attrs, .. } => NodeData::Element {
                name: name.clone(),
                attrs: attrs
                    .borrow()
                    .iter()
                    .map(|a| Attr {
                        name: a.name.clone(),
                        value: a.value.to_string(),
                    })
                    .collect(),
            },
            RcNodeData::ProcessingInstruction { target, contents } => {
                NodeData::ProcessingInstruction {
                    target: target.to_string(),
                    contents: contents.to_string(),
                }
            }
        };

        let id = document.create(data);
        document.append_child(parent, id);

        let mut children: Vec<Handle> = handle.children.borrow().clone();
        if let RcNodeData::Element {
            template_contents, ..
        } = &handle.data
        {
            if let Some(contents) = template_contents.borrow().as_ref() {
                children.extend(contents.children.borrow().iter().cloned());
            }
        }

        stack.extend(children.into_iter().rev().map(|child| (child, id)));
    }

    document
}
