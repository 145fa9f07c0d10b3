//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::env::{translator, EnvResult, EnvVar};
use crate::translation::error::{TranslationError, TranslationResult};

/// 翻译管道配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslatorConfig {
    // 后端
    pub api_base: String,
    pub enabled_path: String,
    pub translate_batch_path: String,
    pub supported_languages_path: String,
    pub request_timeout_secs: u64,

    // 批次与并发
    pub max_batch_items: usize,
    pub max_concurrent_batches: usize,
    pub frame_interval_ms: u64,

    // 过滤
    pub max_text_chars: usize,
    pub skip_untranslatable: bool,
    pub skip_containers: Vec<String>,

    // 缓存
    pub cache_capacity: usize,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_base: constants::DEFAULT_API_BASE.to_string(),
            enabled_path: constants::ENABLED_PATH.to_string(),
            translate_batch_path: constants::TRANSLATE_BATCH_PATH.to_string(),
            supported_languages_path: constants::SUPPORTED_LANGUAGES_PATH.to_string(),
            request_timeout_secs: constants::REQUEST_TIMEOUT_SECS,

            max_batch_items: constants::MAX_BATCH_ITEMS,
            max_concurrent_batches: constants::MAX_CONCURRENT_BATCHES,
            frame_interval_ms: constants::FRAME_INTERVAL_MS,

            max_text_chars: constants::MAX_TEXT_CHARS,
            skip_untranslatable: false,
            skip_containers: constants::SKIP_CONTAINERS
                .iter()
                .map(|s| s.to_string())
                .collect(),

            cache_capacity: constants::CACHE_CAPACITY,
        }
    }
}

impl TranslatorConfig {
    /// 创建指定后端地址的默认配置
    pub fn with_api_base(api_base: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.max_batch_items == 0 {
            return Err(TranslationError::ConfigError("批次大小不能为0".to_string()));
        }

        if self.max_concurrent_batches == 0 {
            return Err(TranslationError::ConfigError("最大并发数不能为0".to_string()));
        }

        if self.max_text_chars == 0 {
            return Err(TranslationError::ConfigError("最大文本长度不能为0".to_string()));
        }

        if self.cache_capacity == 0 {
            return Err(TranslationError::ConfigError("缓存容量不能为0".to_string()));
        }

        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(TranslationError::ConfigError(format!(
                "后端地址必须以 http:// 或 https:// 开头: {}",
                self.api_base
            )));
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        if let Some(api_base) = take_env(translator::ApiBase::lookup()) {
            tracing::info!("环境变量覆盖后端地址: {}", api_base);
            self.api_base = api_base;
        }

        if let Some(items) = take_env(translator::MaxBatchItems::lookup()) {
            self.max_batch_items = items;
        }

        if let Some(concurrent) = take_env(translator::MaxConcurrentBatches::lookup()) {
            self.max_concurrent_batches = concurrent;
        }

        if let Some(chars) = take_env(translator::MaxTextChars::lookup()) {
            self.max_text_chars = chars;
        }

        if let Some(capacity) = take_env(translator::CacheCapacity::lookup()) {
            self.cache_capacity = capacity;
        }

        if let Some(interval) = take_env(translator::FrameInterval::lookup()) {
            self.frame_interval_ms = interval.as_millis() as u64;
        }

        if let Some(timeout) = take_env(translator::RequestTimeout::lookup()) {
            self.request_timeout_secs = timeout.as_secs();
        }

        if let Some(skip) = take_env(translator::SkipUntranslatable::lookup()) {
            self.skip_untranslatable = skip;
        }
    }

    /// 拼接后端端点地址
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 只接受显式设置且合法的环境变量
fn take_env<T>(result: Option<EnvResult<T>>) -> Option<T> {
    match result? {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("忽略无效的环境变量: {}", e);
            None
        }
    }
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: TranslatorConfig,
}

impl ConfigManager {
    /// 按默认搜索路径创建配置管理器
    pub fn new() -> TranslationResult<Self> {
        Self::load_dotenv();
        let config = Self::load_config()?;
        Self::finish(config)
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(path: &str) -> TranslationResult<Self> {
        Self::load_dotenv();
        let expanded = shellexpand::tilde(path);
        let config = Self::load_from_file(&expanded)?;
        Self::finish(config)
    }

    fn finish(mut config: TranslatorConfig) -> TranslationResult<Self> {
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn into_config(self) -> TranslatorConfig {
        self.config
    }

    /// 从搜索路径加载配置
    fn load_config() -> TranslationResult<TranslatorConfig> {
        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(&expanded_path);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(TranslatorConfig::default())
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &str) -> TranslationResult<TranslatorConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        if path.ends_with(".toml") {
            toml::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析TOML配置失败: {}", e)))
        } else {
            serde_json::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> TranslationResult<()> {
        let config = TranslatorConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
