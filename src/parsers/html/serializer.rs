use std::collections::VecDeque;
use std::io;

use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use html5ever::QualName;

use super::dom::{Document, NodeData, NodeId};
use crate::core::ProxyError;

enum SerializeOp {
    Open(NodeId),
    Close(QualName),
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let mut ops = VecDeque::new();
        match traversal_scope {
            TraversalScope::IncludeNode => ops.push_back(SerializeOp::Open(self.root())),
            TraversalScope::ChildrenOnly(_) => ops.extend(
                self.children(self.root())
                    .iter()
                    .map(|&child| SerializeOp::Open(child)),
            ),
        }

        while let Some(op) = ops.pop_front() {
            match op {
                SerializeOp::Open(id) => {
                    let node = self.node(id);
                    match &node.data {
                        NodeData::Element { name, attrs } => {
                            serializer.start_elem(
                                name.clone(),
                                attrs.iter().map(|a| (&a.name, a.value.as_str())),
                            )?;
                            ops.push_front(SerializeOp::Close(name.clone()));
                        }
                        NodeData::Document => {}
                        NodeData::Doctype { name, .. } => serializer.write_doctype(name)?,
                        NodeData::Text(text) => serializer.write_text(text)?,
                        NodeData::Comment(text) => serializer.write_comment(text)?,
                        NodeData::ProcessingInstruction { target, contents } => {
                            serializer.write_processing_instruction(target, contents)?
                        }
                    }

                    for &child in node.children.iter().rev() {
                        ops.push_front(SerializeOp::Open(child));
                    }
                }
                SerializeOp::Close(name) => serializer.end_elem(name)?,
            }
        }

        Ok(())
    }
}

/// 序列化文档
pub fn serialize_document(document: &Document) -> Result<String, ProxyError> {
    let mut buf: Vec<u8> = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };

    serialize(&mut buf, document, opts)
        .map_err(|e| ProxyError::SerializationFailure(e.to_string()))?;

    String::from_utf8(buf).map_err(|e| ProxyError::SerializationFailure(e.to_string()))
}
