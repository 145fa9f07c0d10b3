//! 文本过滤器模块
//!
//! 判断一个节点是否可以进入注册表。被拒绝的节点永远不会被改写。

use std::collections::HashSet;
use std::sync::OnceLock;

use markup5ever_rcdom::{Handle, NodeData};
use regex::Regex;

use crate::dom::parent_element_name;
use crate::translation::config::TranslatorConfig;

/// 节点被拒绝的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 注释节点
    Comment,
    /// 元素、文档等非文本节点
    NotText,
    /// 位于 script/style 等容器内
    Container(String),
    /// 去除空白后为空
    Blank,
    /// 超过长度上限
    TooLong,
    /// 纯数字或占位符
    Untranslatable,
}

/// 文本过滤器
pub struct TextFilter {
    max_text_chars: usize,
    skip_containers: HashSet<String>,
    skip_untranslatable: bool,
}

impl TextFilter {
    /// 根据配置创建过滤器
    pub fn new(config: &TranslatorConfig) -> Self {
        Self {
            max_text_chars: config.max_text_chars,
            skip_containers: config
                .skip_containers
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
            skip_untranslatable: config.skip_untranslatable,
        }
    }

    /// 返回节点被拒绝的原因，可注册时返回 `None`
    pub fn skip_reason(&self, node: &Handle) -> Option<SkipReason> {
        let text = match &node.data {
            NodeData::Text { contents } => contents.borrow().to_string(),
            NodeData::Comment { .. } => return Some(SkipReason::Comment),
            _ => return Some(SkipReason::NotText),
        };

        if let Some(tag) = parent_element_name(node) {
            if self.skip_containers.contains(&tag) {
                return Some(SkipReason::Container(tag));
            }
        }

        self.text_skip_reason(&text)
    }

    /// 只看文本内容的检查
    pub fn text_skip_reason(&self, text: &str) -> Option<SkipReason> {
        if text.chars().count() > self.max_text_chars {
            return Some(SkipReason::TooLong);
        }

        if text.trim().is_empty() {
            return Some(SkipReason::Blank);
        }

        if self.skip_untranslatable && looks_untranslatable(text) {
            return Some(SkipReason::Untranslatable);
        }

        None
    }

    /// 节点是否应被跳过
    pub fn should_skip(&self, node: &Handle) -> bool {
        self.skip_reason(node).is_some()
    }
}

impl Default for TextFilter {
    fn default() -> Self {
        Self::new(&TranslatorConfig::default())
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"[{}]|%s|%\(|\$\{").unwrap_or_else(|_| Regex::new(r"[{}]").unwrap())
    })
}

/// 纯数字、或包含格式化占位符的文本
pub fn looks_untranslatable(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }

    placeholder_regex().is_match(trimmed)
}
