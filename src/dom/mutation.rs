//! DOM 变更记录与观察者
//!
//! 语义参照浏览器的 MutationObserver：记录同步入队，回调异步批量投递。

use std::cell::{Cell, RefCell};
use std::mem;
use std::rc::Rc;

use markup5ever_rcdom::Handle;

use super::is_inclusive_descendant;

/// 单条变更记录
#[derive(Debug, Clone)]
pub enum MutationRecord {
    /// 子节点插入或移除
    ChildList {
        target: Handle,
        added: Vec<Handle>,
        removed: Vec<Handle>,
    },
    /// 文本节点内容变化
    CharacterData { target: Handle, old_value: String },
}

impl MutationRecord {
    pub fn target(&self) -> &Handle {
        match self {
            MutationRecord::ChildList { target, .. } => target,
            MutationRecord::CharacterData { target, .. } => target,
        }
    }
}

/// 变更观察者
///
/// 第一条记录入队时调用 `notify`，由宿主安排一次异步投递；
/// 投递方通过 [`MutationObserver::take_records`] 取走整批记录。
/// `mute` 置位期间产生的记录直接丢弃。
pub struct MutationObserver {
    root: Handle,
    records: RefCell<Vec<MutationRecord>>,
    connected: Cell<bool>,
    delivery_scheduled: Cell<bool>,
    mute: Rc<Cell<bool>>,
    notify: Box<dyn Fn()>,
}

impl MutationObserver {
    /// 创建观察 `root` 子树的观察者
    pub fn new<F>(root: Handle, mute: Rc<Cell<bool>>, notify: F) -> Rc<Self>
    where
        F: Fn() + 'static,
    {
        Rc::new(Self {
            root,
            records: RefCell::new(Vec::new()),
            connected: Cell::new(true),
            delivery_scheduled: Cell::new(false),
            mute,
            notify: Box::new(notify),
        })
    }

    pub(crate) fn enqueue(&self, record: MutationRecord) {
        if !self.connected.get() || self.mute.get() {
            return;
        }
        if !is_inclusive_descendant(&self.root, record.target()) {
            return;
        }

        self.records.borrow_mut().push(record);

        if !self.delivery_scheduled.replace(true) {
            (self.notify)();
        }
    }

    /// 取走当前排队的全部记录
    pub fn take_records(&self) -> Vec<MutationRecord> {
        self.delivery_scheduled.set(false);
        mem::take(&mut *self.records.borrow_mut())
    }

    /// 停止观察并丢弃未投递的记录
    pub fn disconnect(&self) {
        self.connected.set(false);
        self.take_records();
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    /// 尚未投递的记录数
    pub fn pending_records(&self) -> usize {
        self.records.borrow().len()
    }
}

impl std::fmt::Debug for MutationObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationObserver")
            .field("connected", &self.connected.get())
            .field("pending", &self.records.borrow().len())
            .field("muted", &self.mute.get())
            .finish()
    }
}
