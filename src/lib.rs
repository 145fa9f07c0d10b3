//! # Autotranslate Library
//!
//! 在活动文档中增量翻译可见文本：发现文本节点、批量提交到翻译后端，
//! 并在结果返回时原地改写节点，同时跟踪文档变更以翻译新插入的文本。
//!
//! ## 模块组织
//!
//! - `dom` - 可观察的活动文档与变更记录
//! - `env` - 类型化环境变量
//! - `translation` - 翻译引擎、管道、缓存与配置

pub mod dom;
pub mod env;
pub mod translation;

pub use dom::{LiveDocument, MutationObserver, MutationRecord};
pub use translation::{TranslationError, TranslationResult, TranslatorConfig, TranslatorEngine};
