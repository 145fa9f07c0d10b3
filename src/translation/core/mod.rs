//! 翻译系统核心模块
//!
//! - **引擎** (`engine.rs`): 生命周期、派发周期与变更处理
//! - **客户端** (`client.rs`): 与翻译后端的三个 JSON 端点交互
//! - **调度器** (`scheduler.rs`): "下一帧"原语，可在测试中手动推进
//!
//! ## 模块依赖关系
//!
//! ```text
//! TranslatorEngine (engine.rs)
//!     ├── TextScanner (pipeline/collector.rs)
//!     ├── Registry (pipeline/registry.rs)
//!     ├── collect_pending / ConcurrencyGate (pipeline/batch.rs)
//!     ├── apply_results (pipeline/apply.rs)
//!     ├── OriginCache (storage/cache.rs)
//!     ├── TranslatorBackend (client.rs)
//!     └── FrameScheduler (scheduler.rs)
//! ```

pub mod client;
pub mod engine;
pub mod scheduler;

pub use client::{is_enabled_response, HttpBackend, TranslatorBackend};
pub use engine::{EngineState, EngineStats, TranslatorEngine};
pub use scheduler::{FrameScheduler, FrameTask, ManualScheduler, TokioFrameScheduler};
