//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, TranslatorConfig};

/// 配置常量
pub mod constants {
    // 批次处理相关
    pub const MAX_BATCH_ITEMS: usize = 500;
    pub const MAX_CONCURRENT_BATCHES: usize = 2;

    // 文本过滤相关
    pub const MAX_TEXT_CHARS: usize = 500;

    // 缓存设置
    pub const CACHE_CAPACITY: usize = 5000;

    // 调度
    pub const FRAME_INTERVAL_MS: u64 = 16;
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    // 默认后端设置
    pub const DEFAULT_API_BASE: &str = "http://localhost:8069";
    pub const ENABLED_PATH: &str = "/auto_system_translator/enabled";
    pub const TRANSLATE_BATCH_PATH: &str = "/auto_system_translator/translate_batch";
    pub const SUPPORTED_LANGUAGES_PATH: &str = "/auto_system_translator/supported_languages";

    // 文本永远不会被改写的容器
    pub const SKIP_CONTAINERS: &[&str] = &["script", "style", "noscript", "textarea"];

    // 会话存储键
    pub const SESSION_LANG_KEY: &str = "auto_system_translator.session_target_lang";
    pub const LANG_CACHE_KEY: &str = "auto_system_translator.supported_languages";
    pub const LANG_CACHE_VERSION: u32 = 2;
    pub const MIN_EXPECTED_LANGS: usize = 30;
    pub const URL_PARAM_KEY: &str = "ast_lang";
    pub const BACKEND_PATH_PREFIX: &str = "/web";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "autotranslate.toml",
        ".autotranslate.toml",
        "~/.config/autotranslate/config.toml",
        "/etc/autotranslate/config.toml",
    ];
}

/// 便利函数
pub fn config_file_exists() -> bool {
    constants::CONFIG_PATHS
        .iter()
        .any(|path| std::path::Path::new(shellexpand::tilde(path).as_ref()).exists())
}

/// 加载配置，失败时退回默认配置
pub fn load_translator_config() -> TranslatorConfig {
    match ConfigManager::new() {
        Ok(manager) => manager.get_config().clone(),
        Err(e) => {
            tracing::warn!("配置加载失败，使用默认配置: {}", e);
            TranslatorConfig::default()
        }
    }
}
