//! 文本收集器模块
//!
//! 深度优先遍历 DOM 子树，发现可翻译的文本节点并登记到注册表。
//! 重复扫描同一棵子树不会产生重复标识。

use markup5ever_rcdom::{Handle, NodeData};

use super::filters::TextFilter;
use super::registry::Registry;
use crate::translation::config::TranslatorConfig;

/// 扫描统计信息
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    pub nodes_visited: usize,
    pub text_nodes_found: usize,
    pub filtered_texts: usize,
    pub newly_registered: usize,
}

impl ScanStats {
    /// 重置统计
    pub fn reset(&mut self) {
        *self = Default::default();
    }
}

/// DOM文本扫描器
pub struct TextScanner {
    filter: TextFilter,
    stats: ScanStats,
}

impl TextScanner {
    /// 创建新的扫描器
    pub fn new(config: &TranslatorConfig) -> Self {
        Self {
            filter: TextFilter::new(config),
            stats: ScanStats::default(),
        }
    }

    /// 扫描 `root` 子树，返回本次新注册的节点数
    pub fn scan(&mut self, root: &Handle, registry: &mut Registry) -> usize {
        let mut registered = 0;
        let mut stack = vec![root.clone()];

        while let Some(node) = stack.pop() {
            self.stats.nodes_visited += 1;

            match node.data {
                NodeData::Text { .. } => {
                    if self.visit_text(&node, registry) {
                        registered += 1;
                    }
                }
                _ => {
                    // 逆序入栈，保持文档顺序
                    let children = node.children.borrow();
                    stack.extend(children.iter().rev().cloned());
                }
            }
        }

        self.stats.newly_registered += registered;
        registered
    }

    /// 处理单个文本节点，新注册时返回 `true`
    pub fn visit_text(&mut self, node: &Handle, registry: &mut Registry) -> bool {
        self.stats.text_nodes_found += 1;

        if let Some(reason) = self.filter.skip_reason(node) {
            tracing::trace!("跳过文本节点: {:?}", reason);
            self.stats.filtered_texts += 1;
            return false;
        }

        let text = match &node.data {
            NodeData::Text { contents } => contents.borrow().to_string(),
            _ => return false,
        };

        // 节点内容正是上次写入的译文，无需处理
        if let Some(id) = registry.identity_of(node) {
            if registry
                .get(id)
                .is_some_and(|record| record.holds_applied_value(&text))
            {
                return false;
            }
        }

        registry.register(node, &text).1
    }

    pub fn filter(&self) -> &TextFilter {
        &self.filter
    }

    /// 获取扫描统计信息
    pub fn get_stats(&self) -> &ScanStats {
        &self.stats
    }

    /// 重置统计信息
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }
}

impl Default for TextScanner {
    fn default() -> Self {
        Self::new(&TranslatorConfig::default())
    }
}
