//! 文本节点注册表
//!
//! 节点按首次发现的顺序存放，下标即稳定标识。注册表只增不减：
//! 已从文档移除的节点留下无害的陈旧槽位。

use std::collections::HashMap;

use markup5ever_rcdom::Handle;

use crate::dom::{text_value, NodeKey};

/// 单个已注册文本节点的元数据
#[derive(Debug, Clone)]
pub struct TextRecord {
    /// DOM节点引用
    pub node: Handle,
    /// 首次发现时的文本，之后不再改变
    pub original_text: String,
    /// 最近一次由管道写入的值
    pub last_applied: Option<String>,
    /// 最近一次写入对应的目标语言，空串表示默认语言
    pub last_lang: String,
    /// 是否包含在尚未返回的批次中
    pub in_flight: bool,
}

impl TextRecord {
    fn new(node: Handle, original_text: String) -> Self {
        Self {
            node,
            original_text,
            last_applied: None,
            last_lang: String::new(),
            in_flight: false,
        }
    }

    /// 节点当前的实际文本
    pub fn live_text(&self) -> String {
        text_value(&self.node).unwrap_or_default()
    }

    /// 针对 `target_lang` 是否仍需翻译
    ///
    /// 当前值与上次写入值不同，或上次写入的语言不同，都视为待处理；空白文本除外。
    pub fn is_pending(&self, target_lang: &str) -> bool {
        let live = self.live_text();
        if live.trim().is_empty() {
            return false;
        }

        match &self.last_applied {
            Some(last) => *last != live || self.last_lang != target_lang,
            None => true,
        }
    }

    /// 当前值是否正是管道上次写入的值
    pub fn holds_applied_value(&self, value: &str) -> bool {
        self.last_applied.as_deref() == Some(value)
    }
}

/// 注册表
#[derive(Debug, Default)]
pub struct Registry {
    records: Vec<TextRecord>,
    index: HashMap<NodeKey, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册节点，返回 `(标识, 是否为新注册)`
    ///
    /// 已注册的节点保持原有标识和原文。
    pub fn register(&mut self, node: &Handle, text: &str) -> (usize, bool) {
        let key = NodeKey::of(node);
        if let Some(&id) = self.index.get(&key) {
            return (id, false);
        }

        let id = self.records.len();
        self.records.push(TextRecord::new(node.clone(), text.to_string()));
        self.index.insert(key, id);
        (id, true)
    }

    pub fn identity_of(&self, node: &Handle) -> Option<usize> {
        self.index.get(&NodeKey::of(node)).copied()
    }

    pub fn get(&self, id: usize) -> Option<&TextRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut TextRecord> {
        self.records.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &TextRecord)> {
        self.records.iter().enumerate()
    }

    /// 记录一次写入
    pub fn record_applied(&mut self, id: usize, value: &str, target_lang: &str) {
        if let Some(record) = self.records.get_mut(id) {
            record.last_applied = Some(value.to_string());
            record.last_lang = target_lang.to_string();
        }
    }

    /// 标记或清除批次占用
    pub fn set_in_flight(&mut self, ids: &[usize], in_flight: bool) {
        for &id in ids {
            if let Some(record) = self.records.get_mut(id) {
                record.in_flight = in_flight;
            }
        }
    }

    /// 忘记所有写入记录，迫使全部节点重新评估
    pub fn clear_applied(&mut self) {
        for record in &mut self.records {
            record.last_applied = None;
            record.last_lang.clear();
        }
    }

    /// 针对 `target_lang` 仍待处理的节点数
    pub fn pending_count(&self, target_lang: &str) -> usize {
        self.records
            .iter()
            .filter(|record| record.is_pending(target_lang))
            .count()
    }
}
