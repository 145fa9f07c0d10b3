//! DOM 宿主模块
//!
//! 提供基于 `markup5ever_rcdom` 的可变文档、节点辅助函数以及变更观察机制。
//! 翻译管道只通过 [`LiveDocument`] 修改 DOM，从而保证每一次写入都会产生变更记录。

pub mod live;
pub mod mutation;

use std::io;
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::parse_document;
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

pub use live::LiveDocument;
pub use mutation::{MutationObserver, MutationRecord};

/// 基于指针的节点标识
///
/// 同一个物理节点始终得到相同的键，与其文本内容无关。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey(usize);

impl NodeKey {
    pub fn of(node: &Handle) -> Self {
        NodeKey(Rc::as_ptr(node) as usize)
    }
}

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> io::Result<RcDom> {
    let s = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => encoding.decode(data).0.into_owned(),
        None => String::from_utf8_lossy(data).into_owned(),
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
}

/// 序列化文档
pub fn serialize_document(dom: &RcDom, document_encoding: &str) -> io::Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();

    let serializable: SerializableHandle = dom.document.clone().into();
    serialize(&mut buf, &serializable, SerializeOpts::default())?;

    if !document_encoding.is_empty() {
        if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
            let s: &str = &String::from_utf8_lossy(&buf);
            let (data, _, _) = encoding.encode(s);
            buf = data.to_vec();
        }
    }

    Ok(buf)
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    let matching_children = children.iter().find(|child| match child.data {
        NodeData::Element { ref name, .. } => &*name.local == node_name,
        _ => false,
    });
    matching_children.cloned()
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取父节点
///
/// `parent` 是 `Cell`，读取时必须放回原值。
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 获取最近的元素祖先的标签名（小写）
pub fn parent_element_name(node: &Handle) -> Option<String> {
    let parent = get_parent_node(node)?;
    get_node_name(&parent).map(|name| name.to_ascii_lowercase())
}

/// 读取文本节点的当前值，非文本节点返回 `None`
pub fn text_value(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// 判断 `node` 是否是 `root` 本身或其后代
pub fn is_inclusive_descendant(root: &Handle, node: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(n) = current {
        if Rc::ptr_eq(&n, root) {
            return true;
        }
        current = get_parent_node(&n);
    }
    false
}

/// 定位 `<body>` 元素，文档没有 body 时退回文档根
pub fn find_body(dom: &RcDom) -> Handle {
    get_child_node_by_name(&dom.document, "html")
        .and_then(|html| get_child_node_by_name(&html, "body"))
        .unwrap_or_else(|| dom.document.clone())
}
