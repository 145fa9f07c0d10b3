//! 翻译模块
//!
//! 增量翻译活动文档中的文本节点：
//! - **core**: 翻译引擎、后端客户端与帧调度
//! - **pipeline**: 文本处理管道（过滤、注册、收集、批次、写回）
//! - **storage**: 原文缓存
//! - **session**: 会话目标语言与支持语言列表
//! - **config**: 配置管理
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::rc::Rc;
//!
//! use autotranslate::dom::LiveDocument;
//! use autotranslate::translation::{
//!     FixedLanguage, HttpBackend, TokioFrameScheduler, TranslatorConfig, TranslatorEngine,
//! };
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TranslatorConfig::with_api_base("http://localhost:8069");
//! let document = Rc::new(LiveDocument::parse("<p>Hello</p>")?);
//! let engine = TranslatorEngine::new(
//!     config.clone(),
//!     document,
//!     Rc::new(HttpBackend::new(&config)?),
//!     Rc::new(TokioFrameScheduler::new(config.frame_interval())),
//!     Rc::new(FixedLanguage::new("fr")),
//! )?;
//!
//! // 必须在 tokio::task::LocalSet 内调用
//! engine.start();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod storage;

pub use config::{constants, ConfigManager, TranslatorConfig};
pub use self::core::{
    EngineState, EngineStats, FrameScheduler, HttpBackend, ManualScheduler, TokioFrameScheduler,
    TranslatorBackend, TranslatorEngine,
};
pub use error::{ErrorCategory, TranslationError, TranslationResult};
pub use pipeline::{BatchItem, BatchRequest, ResultItem, TextFilter};
pub use session::{
    decorate_link, load_supported_languages, FixedLanguage, MemorySessionStore, SessionLanguage,
    SessionStore, TargetLanguage,
};
pub use storage::{CacheStats, OriginCache};

/// 检查配置文件是否存在
pub fn config_file_exists() -> bool {
    config::config_file_exists()
}

/// 在指定路径生成示例配置文件
pub fn generate_example_config(path: &str) -> TranslationResult<()> {
    ConfigManager::generate_example_config(path)?;
    tracing::info!("已生成示例配置文件: {}", path);
    Ok(())
}
