//! 结果写回模块
//!
//! 管道中唯一改写 DOM 文本的地方。写入期间置位写抑制标志，
//! 变更观察者因此不会把管道自己的输出再次入队。

use std::cell::Cell;

use serde_json::Value;

use super::registry::Registry;
use crate::dom::LiveDocument;
use crate::translation::storage::OriginCache;

/// 后端返回的单条结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultItem {
    pub i: usize,
    pub result: String,
}

/// 一次写回的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub applied: usize,
    pub skipped: usize,
}

/// 写抑制区间
///
/// 构造时置位，析构时清除。持有期间不得跨越任何 `.await`。
pub struct WriteSuppression<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> WriteSuppression<'a> {
    pub fn engage(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for WriteSuppression<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// 将响应规整为结果列表
///
/// 接受 `{items: [...]}` 与 `{result: {items: [...]}}` 两种外形；
/// 其他外形、缺少整数标识或字符串结果的条目一律忽略。
pub fn normalize_response(response: &Value) -> Vec<ResultItem> {
    let items = match response.get("items").and_then(Value::as_array) {
        Some(items) => items,
        None => match response
            .get("result")
            .and_then(|result| result.get("items"))
            .and_then(Value::as_array)
        {
            Some(items) => items,
            None => return Vec::new(),
        },
    };

    items
        .iter()
        .filter_map(|item| {
            let i = item.get("i")?.as_u64()?;
            let result = item.get("result")?.as_str()?;
            Some(ResultItem {
                i: usize::try_from(i).ok()?,
                result: result.to_string(),
            })
        })
        .collect()
}

/// 把结果写回对应的文本节点
///
/// 标识不存在的条目静默跳过（节点可能已被页面移除）。
pub fn apply_results(
    document: &LiveDocument,
    registry: &mut Registry,
    cache: &mut OriginCache,
    results: &[ResultItem],
    target_lang: &str,
    suppress: &Cell<bool>,
) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();
    let _guard = WriteSuppression::engage(suppress);

    for item in results {
        let (node, original) = match registry.get(item.i) {
            Some(record) => (record.node.clone(), record.original_text.clone()),
            None => {
                outcome.skipped += 1;
                continue;
            }
        };

        if !document.set_text(&node, &item.result) {
            outcome.skipped += 1;
            continue;
        }

        registry.record_applied(item.i, &item.result, target_lang);
        cache.insert(target_lang, &original, &item.result);
        outcome.applied += 1;
    }

    tracing::debug!(
        "写回 {} 条结果，跳过 {} 条 (语言: {:?})",
        outcome.applied,
        outcome.skipped,
        target_lang
    );

    outcome
}
