//! 可观察的活动文档
//!
//! 所有对文档树的修改都经过这里，并同步生成 [`MutationRecord`]。

use std::cell::RefCell;
use std::io;
use std::rc::{Rc, Weak};

use html5ever::tendril::StrTendril;
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

use super::mutation::{MutationObserver, MutationRecord};
use super::{find_body, get_parent_node, html_to_dom};

/// 活动文档
pub struct LiveDocument {
    dom: RcDom,
    body: Handle,
    observers: RefCell<Vec<Weak<MutationObserver>>>,
}

impl LiveDocument {
    /// 包装已解析的文档
    pub fn new(dom: RcDom) -> Self {
        let body = find_body(&dom);
        Self {
            dom,
            body,
            observers: RefCell::new(Vec::new()),
        }
    }

    /// 解析 UTF-8 HTML 字符串
    pub fn parse(html: &str) -> io::Result<Self> {
        Ok(Self::new(html_to_dom(html.as_bytes(), "utf-8")?))
    }

    pub fn dom(&self) -> &RcDom {
        &self.dom
    }

    pub fn body(&self) -> &Handle {
        &self.body
    }

    /// 注册观察者，文档只保存弱引用
    pub fn observe(&self, observer: &Rc<MutationObserver>) {
        self.observers.borrow_mut().push(Rc::downgrade(observer));
    }

    /// 创建一个游离的文本节点
    pub fn create_text(&self, text: &str) -> Handle {
        Node::new(NodeData::Text {
            contents: RefCell::new(StrTendril::from_slice(text)),
        })
    }

    /// 在 `parent` 末尾追加子节点
    pub fn append_child(&self, parent: &Handle, child: Handle) {
        self.detach(&child);
        attach(parent, child.clone());
        self.notify(MutationRecord::ChildList {
            target: parent.clone(),
            added: vec![child],
            removed: Vec::new(),
        });
    }

    /// 解析 HTML 片段并追加到 `parent`，返回插入的顶层节点
    pub fn append_html(&self, parent: &Handle, html: &str) -> io::Result<Vec<Handle>> {
        let fragment = html_to_dom(html.as_bytes(), "utf-8")?;
        let fragment_body = find_body(&fragment);
        let nodes: Vec<Handle> = fragment_body.children.borrow_mut().drain(..).collect();

        for node in &nodes {
            node.parent.set(None);
            attach(parent, node.clone());
        }

        if !nodes.is_empty() {
            self.notify(MutationRecord::ChildList {
                target: parent.clone(),
                added: nodes.clone(),
                removed: Vec::new(),
            });
        }

        Ok(nodes)
    }

    /// 从 `parent` 移除子节点，节点不在其中时返回 `false`
    pub fn remove_child(&self, parent: &Handle, child: &Handle) -> bool {
        let removed = {
            let mut children = parent.children.borrow_mut();
            match children.iter().position(|c| Rc::ptr_eq(c, child)) {
                Some(index) => {
                    children.remove(index);
                    true
                }
                None => false,
            }
        };

        if removed {
            child.parent.set(None);
            self.notify(MutationRecord::ChildList {
                target: parent.clone(),
                added: Vec::new(),
                removed: vec![child.clone()],
            });
        }

        removed
    }

    /// 改写文本节点内容，非文本节点返回 `false`
    pub fn set_text(&self, node: &Handle, value: &str) -> bool {
        let old_value = match &node.data {
            NodeData::Text { contents } => {
                let mut contents = contents.borrow_mut();
                let old = contents.to_string();
                contents.clear();
                contents.push_slice(value);
                old
            }
            _ => return false,
        };

        self.notify(MutationRecord::CharacterData {
            target: node.clone(),
            old_value,
        });
        true
    }

    fn detach(&self, child: &Handle) {
        if let Some(old_parent) = get_parent_node(child) {
            self.remove_child(&old_parent, child);
        }
    }

    fn notify(&self, record: MutationRecord) {
        let observers: Vec<Rc<MutationObserver>> = {
            let mut observers = self.observers.borrow_mut();
            observers.retain(|weak| weak.strong_count() > 0);
            observers.iter().filter_map(Weak::upgrade).collect()
        };

        for observer in observers {
            observer.enqueue(record.clone());
        }
    }
}

fn attach(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}
