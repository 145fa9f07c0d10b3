//! 翻译管道模块
//!
//! 提供文本处理管道：过滤、注册、收集、批次与写回

pub mod apply;
pub mod batch;
pub mod collector;
pub mod filters;
pub mod registry;

// 重新导出主要类型
pub use apply::{apply_results, normalize_response, ApplyOutcome, ResultItem, WriteSuppression};
pub use batch::{collect_pending, BatchItem, BatchRequest, ConcurrencyGate, PendingCollection};
pub use collector::{ScanStats, TextScanner};
pub use filters::{looks_untranslatable, SkipReason, TextFilter};
pub use registry::{Registry, TextRecord};
