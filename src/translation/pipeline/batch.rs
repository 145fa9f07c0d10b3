//! 翻译批次模块
//!
//! 负责从注册表中按下标顺序挑选待处理节点、组装批次请求，以及并发准入控制。
//!
//! ## 批次规则
//!
//! - 每个批次最多 `max_batch_items` 条，先注册的节点先处理
//! - 发送的永远是节点的原文，而不是已翻译的值
//! - 语言切换会让已翻译的节点重新变为待处理
//! - 已在途批次中的节点不会被并发周期重复收集

use serde::{Deserialize, Serialize};

use super::apply::ResultItem;
use super::registry::Registry;
use crate::translation::storage::OriginCache;

/// 批次中的单个条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    /// 节点标识
    pub i: usize,
    /// 节点原文
    pub text: String,
}

/// 发往 `translate_batch` 的请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub items: Vec<BatchItem>,
    /// 没有覆盖语言时省略
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_lang: Option<String>,
}

impl BatchRequest {
    pub fn new(items: Vec<BatchItem>, target_lang: &str) -> Self {
        let target_lang = if target_lang.is_empty() {
            None
        } else {
            Some(target_lang.to_string())
        };

        Self { items, target_lang }
    }

    /// 批次涉及的节点标识
    pub fn identities(&self) -> Vec<usize> {
        self.items.iter().map(|item| item.i).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// 一次收集的结果
#[derive(Debug, Default)]
pub struct PendingCollection {
    /// 需要发往后端的条目
    pub items: Vec<BatchItem>,
    /// 原文缓存命中、可直接写回的结果
    pub cached: Vec<ResultItem>,
    /// 因达到批次上限而提前停止
    pub truncated: bool,
}

/// 按下标顺序收集待处理节点
///
/// 命中原文缓存的节点不占用批次名额。
pub fn collect_pending(
    registry: &Registry,
    cache: &mut OriginCache,
    target_lang: &str,
    max_items: usize,
) -> PendingCollection {
    let mut collection = PendingCollection::default();
    let total = registry.len();

    for (id, record) in registry.iter() {
        if record.in_flight || !record.is_pending(target_lang) {
            continue;
        }

        if let Some(result) = cache.get(target_lang, &record.original_text) {
            collection.cached.push(ResultItem { i: id, result });
            continue;
        }

        collection.items.push(BatchItem {
            i: id,
            text: record.original_text.clone(),
        });

        if collection.items.len() >= max_items {
            collection.truncated = id + 1 < total;
            break;
        }
    }

    collection
}

/// 在途批次的准入计数器
#[derive(Debug)]
pub struct ConcurrencyGate {
    limit: usize,
    in_flight: usize,
}

impl ConcurrencyGate {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            in_flight: 0,
        }
    }

    /// 还有名额时占用一个
    pub fn try_acquire(&mut self) -> bool {
        if self.in_flight >= self.limit {
            return false;
        }
        self.in_flight += 1;
        true
    }

    pub fn release(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn has_capacity(&self) -> bool {
        self.in_flight < self.limit
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use html5ever::tendril::StrTendril;
    use markup5ever_rcdom::{Handle, Node, NodeData};

    use super::*;

    fn text_node(text: &str) -> Handle {
        Node::new(NodeData::Text {
            contents: RefCell::new(StrTendril::from_slice(text)),
        })
    }

    fn registry_with(count: usize) -> (Registry, Vec<Handle>) {
        let mut registry = Registry::new();
        let nodes: Vec<Handle> = (0..count)
            .map(|n| text_node(&format!("text {}", n)))
            .collect();
        for (n, node) in nodes.iter().enumerate() {
            registry.register(node, &format!("text {}", n));
        }
        (registry, nodes)
    }

    #[test]
    fn test_batch_is_capped_and_ordered() {
        let (registry, _nodes) = registry_with(501);
        let mut cache = OriginCache::new(10);

        let collection = collect_pending(&registry, &mut cache, "", 500);
        assert_eq!(collection.items.len(), 500);
        assert_eq!(collection.items[0], BatchItem { i: 0, text: "text 0".to_string() });
        assert_eq!(collection.items[499].i, 499);
        assert!(collection.truncated);
    }

    #[test]
    fn test_exact_limit_is_not_truncated() {
        let (registry, _nodes) = registry_with(3);
        let mut cache = OriginCache::new(10);
        let collection = collect_pending(&registry, &mut cache, "", 3);
        assert_eq!(collection.items.len(), 3);
        assert!(!collection.truncated);
    }

    #[test]
    fn test_in_flight_and_cached_items_are_not_batched() {
        let (mut registry, _nodes) = registry_with(3);
        registry.set_in_flight(&[0], true);

        let mut cache = OriginCache::new(10);
        cache.insert("fr", "text 1", "texte 1");

        let collection = collect_pending(&registry, &mut cache, "fr", 500);
        assert_eq!(collection.items, vec![BatchItem { i: 2, text: "text 2".to_string() }]);
        assert_eq!(
            collection.cached,
            vec![ResultItem { i: 1, result: "texte 1".to_string() }]
        );
    }

    #[test]
    fn test_request_omits_empty_language() {
        let request = BatchRequest::new(vec![BatchItem { i: 0, text: "Hello".to_string() }], "");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"items": [{"i": 0, "text": "Hello"}]})
        );

        let request = BatchRequest::new(Vec::new(), "fr");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"items": [], "target_lang": "fr"})
        );
    }

    #[test]
    fn test_gate_caps_concurrency() {
        let mut gate = ConcurrencyGate::new(2);
        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
        assert_eq!(gate.in_flight(), 2);

        gate.release();
        assert!(gate.has_capacity());
        gate.release();
        gate.release();
        assert_eq!(gate.in_flight(), 0);
    }
}
