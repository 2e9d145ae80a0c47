//! 文档树
//!
//! 解析结果被转换成一棵由 [`Document`] 独占的树：节点存放在一个 `Vec` 中，
//! 通过 [`NodeId`] 索引，子节点以索引列表表示，没有父指针，也没有共享所有权。
//! 删除节点只是把它从父节点的子列表中摘掉，替换节点则直接覆盖其数据。

use std::collections::HashSet;

use html5ever::{namespace_url, ns, LocalName, QualName};

/// 节点在文档中的索引
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// 元素属性
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attr {
    pub name: QualName,
    pub value: String,
}

impl Attr {
    pub fn new(name: &str, value: &str) -> Self {
        Attr {
            name: QualName::new(None, ns!(), LocalName::from(name)),
            value: value.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
    Text(String),
    Comment(String),
    Element {
        name: QualName,
        attrs: Vec<Attr>,
    },
    ProcessingInstruction {
        target: String,
        contents: String,
    },
}

#[derive(Clone, Debug)]
pub struct Node {
    pub data: NodeData,
    pub children: Vec<NodeId>,
}

/// An owned HTML document tree.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl Document {
    /// Creates a document holding only its root node.
    pub fn new() -> Self {
        Document {
            nodes: vec![Node {
                data: NodeData::Document,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// 创建一个尚未挂到树上的节点
    pub fn create(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node {
            data,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    /// 创建 HTML 命名空间下的元素
    pub fn create_element(&mut self, local: &str, attrs: &[(&str, &str)]) -> NodeId {
        self.create(NodeData::Element {
            name: QualName::new(None, ns!(html), LocalName::from(local)),
            attrs: attrs.iter().map(|(n, v)| Attr::new(n, v)).collect(),
        })
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.insert(0, child);
    }

    /// 所有挂在树上的节点，按文档顺序（先序）
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![self.root()];

        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }

        order
    }

    /// 按本地名查找元素（不区分大小写），按文档顺序返回
    pub fn elements_named(&self, local: &str) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|&id| {
                self.element_name(id)
                    .is_some_and(|name| name.eq_ignore_ascii_case(local))
            })
            .collect()
    }

    pub fn first_element_named(&self, local: &str) -> Option<NodeId> {
        self.elements_named(local).into_iter().next()
    }

    pub fn head(&self) -> Option<NodeId> {
        self.first_element_named("head")
    }

    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { name, .. } => Some(name.local.as_ref()),
            _ => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[Attr] {
        match &self.nodes[id.0].data {
            NodeData::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    /// 获取属性值，属性名不区分大小写
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name.local.as_ref().eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Sets an attribute, adding it when the element does not carry it yet.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            match attrs
                .iter_mut()
                .find(|a| a.name.local.as_ref().eq_ignore_ascii_case(name))
            {
                Some(attr) => attr.value = value.to_string(),
                None => attrs.push(Attr::new(name, value)),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            attrs.retain(|a| !a.name.local.as_ref().eq_ignore_ascii_case(name));
        }
    }

    /// 直接子文本节点拼接后的内容
    pub fn text(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter_map(|&child| match &self.nodes[child.0].data {
                NodeData::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// 用单个文本节点替换全部子节点
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        let child = self.create(NodeData::Text(text.to_string()));
        self.nodes[id.0].children = vec![child];
    }

    /// Turns `id` into a different element in place, keeping its position.
    pub fn replace_element(&mut self, id: NodeId, local: &str, attrs: Vec<Attr>, text: &str) {
        self.nodes[id.0].data = NodeData::Element {
            name: QualName::new(None, ns!(html), LocalName::from(local)),
            attrs,
        };
        self.set_text(id, text);
    }

    /// Detaches every attached node for which `predicate` holds.
    ///
    /// Detached nodes stay in the arena but are no longer reachable from the root.
    pub fn remove_where<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        let this: &Document = self;
        let doomed: HashSet<NodeId> = this
            .descendants()
            .into_iter()
            .filter(|&id| id != this.root() && predicate(this, id))
            .collect();

        if doomed.is_empty() {
            return 0;
        }

        for node in &mut self.nodes {
            node.children.retain(|child| !doomed.contains(child));
        }

        doomed.len()
    }

    /// 文档中声明的字符集：`<meta charset>` 或 `http-equiv=Content-Type`
    pub fn declared_charset(&self) -> Option<String> {
        for meta in self.elements_named("meta") {
            if let Some(charset) = self.attr(meta, "charset") {
                return Some(charset.trim().to_string());
            }

            let is_content_type = self
                .attr(meta, "http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("content-type"));
            if is_content_type {
                if let Some(content) = self.attr(meta, "content") {
                    let (_, charset) = crate::core::parse_content_type(content);
                    if !charset.is_empty() {
                        return Some(charset);
                    }
                }
            }
        }

        None
    }
}
