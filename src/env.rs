//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    /// 读取变量，未设置时退回默认值
    fn get() -> EnvResult<T> {
        match Self::lookup() {
            Some(result) => result,
            None => Self::DEFAULT.ok_or_else(|| EnvError {
                variable: Self::NAME.to_string(),
                message: "Required environment variable not set".to_string(),
            }),
        }
    }

    /// 仅在变量被显式设置时返回解析结果
    fn lookup() -> Option<EnvResult<T>> {
        env::var(Self::NAME).ok().map(|value| Self::parse(&value))
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "AUTOTRANSLATE_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match Self::lookup() {
                Some(result) => result,
                None => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Invalid log level '{}'. Use: trace, debug, info, warn, error", value),
                }),
            }
        }
    }
}

/// 翻译管道相关环境变量
pub mod translator {
    use super::*;

    /// 翻译后端地址
    pub struct ApiBase;
    impl EnvVar<String> for ApiBase {
        const NAME: &'static str = "AUTOTRANSLATE_API_BASE";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Base URL of the translation backend";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.trim_end_matches('/').to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API base must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// 单批次最大条目数
    pub struct MaxBatchItems;
    impl EnvVar<usize> for MaxBatchItems {
        const NAME: &'static str = "AUTOTRANSLATE_MAX_BATCH_ITEMS";
        const DEFAULT: Option<usize> = Some(500);
        const DESCRIPTION: &'static str = "Maximum text items per batch request";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 10_000)
        }
    }

    /// 最大并发批次数
    pub struct MaxConcurrentBatches;
    impl EnvVar<usize> for MaxConcurrentBatches {
        const NAME: &'static str = "AUTOTRANSLATE_MAX_CONCURRENT_BATCHES";
        const DEFAULT: Option<usize> = Some(2);
        const DESCRIPTION: &'static str = "Maximum batch requests in flight";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 32)
        }
    }

    /// 可翻译文本的最大字符数
    pub struct MaxTextChars;
    impl EnvVar<usize> for MaxTextChars {
        const NAME: &'static str = "AUTOTRANSLATE_MAX_TEXT_CHARS";
        const DEFAULT: Option<usize> = Some(500);
        const DESCRIPTION: &'static str = "Text nodes longer than this are never translated";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 100_000)
        }
    }

    /// 原文缓存容量
    pub struct CacheCapacity;
    impl EnvVar<usize> for CacheCapacity {
        const NAME: &'static str = "AUTOTRANSLATE_CACHE_CAPACITY";
        const DEFAULT: Option<usize> = Some(5000);
        const DESCRIPTION: &'static str = "Capacity of the source-text translation cache";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 1_000_000)
        }
    }

    /// 帧间隔
    pub struct FrameInterval;
    impl EnvVar<Duration> for FrameInterval {
        const NAME: &'static str = "AUTOTRANSLATE_FRAME_INTERVAL_MS";
        const DEFAULT: Option<Duration> = Some(Duration::from_millis(16));
        const DESCRIPTION: &'static str = "Delay between dispatch frames in milliseconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let millis = parse_positive_usize(value, Self::NAME, 1, 10_000)?;
            Ok(Duration::from_millis(millis as u64))
        }
    }

    /// 请求超时
    pub struct RequestTimeout;
    impl EnvVar<Duration> for RequestTimeout {
        const NAME: &'static str = "AUTOTRANSLATE_REQUEST_TIMEOUT";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(30));
        const DESCRIPTION: &'static str = "Backend request timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds = parse_positive_usize(value, Self::NAME, 1, 300)?;
            Ok(Duration::from_secs(seconds as u64))
        }
    }

    /// 跳过占位符样式的文本
    pub struct SkipUntranslatable;
    impl EnvVar<bool> for SkipUntranslatable {
        const NAME: &'static str = "AUTOTRANSLATE_SKIP_UNTRANSLATABLE";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Skip digits-only and placeholder-like text";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }
}

/// 辅助函数
fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Invalid boolean value '{}'. Use: true/false, 1/0, yes/no, on/off, enabled/disabled", value),
        }),
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}
