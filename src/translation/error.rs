//! 翻译模块统一错误处理
//!
//! 管道内部的错误从不向页面暴露：调用方记录日志后按"零结果"处理。

use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl TranslationError {
    /// 检查错误是否可重试
    ///
    /// 调度循环本身就是隐式重试，这里只用于日志分级。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TranslationError::NetworkError(_) | TranslationError::ParseError(_)
        )
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::ConfigError(_) => ErrorCategory::Configuration,
            TranslationError::NetworkError(_) => ErrorCategory::Network,
            TranslationError::InvalidInput(_) => ErrorCategory::Input,
            TranslationError::ParseError(_) => ErrorCategory::Parsing,
            TranslationError::SerializationError(_) => ErrorCategory::Serialization,
            TranslationError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(self, context: T) -> Self {
        let new_msg = |msg: String| format!("{} (上下文: {})", msg, context);

        match self {
            TranslationError::ConfigError(msg) => TranslationError::ConfigError(new_msg(msg)),
            TranslationError::NetworkError(msg) => TranslationError::NetworkError(new_msg(msg)),
            TranslationError::InvalidInput(msg) => TranslationError::InvalidInput(new_msg(msg)),
            TranslationError::ParseError(msg) => TranslationError::ParseError(new_msg(msg)),
            TranslationError::SerializationError(msg) => {
                TranslationError::SerializationError(new_msg(msg))
            }
            TranslationError::InternalError(msg) => TranslationError::InternalError(new_msg(msg)),
        }
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Input,
    Parsing,
    Serialization,
    Internal,
}

impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::InternalError(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ConfigError(format!("TOML解析错误: {}", error))
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            TranslationError::ParseError(format!("响应解析失败: {}", error))
        } else {
            TranslationError::NetworkError(error.to_string())
        }
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;
