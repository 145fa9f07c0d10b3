//! 翻译后端客户端
//!
//! 后端只通过三个 JSON 端点交互；响应以原始 `serde_json::Value` 返回，
//! 外形的容错由调用方负责。

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde_json::{json, Value};

use crate::translation::config::TranslatorConfig;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::BatchRequest;

/// 翻译后端接口
pub trait TranslatorBackend {
    /// `POST enabled`，请求体 `{}`
    fn check_enabled(&self) -> LocalBoxFuture<'static, TranslationResult<Value>>;

    /// `POST translate_batch`
    fn translate_batch(&self, request: &BatchRequest) -> LocalBoxFuture<'static, TranslationResult<Value>>;

    /// `POST supported_languages`
    fn supported_languages(&self) -> LocalBoxFuture<'static, TranslationResult<Value>>;
}

/// 基于 reqwest 的 HTTP 后端
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    enabled_url: String,
    batch_url: String,
    languages_url: String,
}

impl HttpBackend {
    /// 根据配置创建客户端
    pub fn new(config: &TranslatorConfig) -> TranslationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TranslationError::ConfigError(format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self {
            client,
            enabled_url: config.endpoint(&config.enabled_path),
            batch_url: config.endpoint(&config.translate_batch_path),
            languages_url: config.endpoint(&config.supported_languages_path),
        })
    }

    fn post(&self, url: &str, body: Value) -> LocalBoxFuture<'static, TranslationResult<Value>> {
        let request = self.client.post(url).json(&body);
        let url = url.to_string();

        async move {
            let response = request
                .send()
                .await
                .map_err(|e| TranslationError::from(e).with_context(&url))?;

            let status = response.status();
            if !status.is_success() {
                return Err(TranslationError::NetworkError(format!(
                    "{} 返回状态码 {}",
                    url, status
                )));
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| TranslationError::ParseError(format!("{}: {}", url, e)))
        }
        .boxed_local()
    }
}

impl TranslatorBackend for HttpBackend {
    fn check_enabled(&self) -> LocalBoxFuture<'static, TranslationResult<Value>> {
        self.post(&self.enabled_url, json!({}))
    }

    fn translate_batch(&self, request: &BatchRequest) -> LocalBoxFuture<'static, TranslationResult<Value>> {
        match serde_json::to_value(request) {
            Ok(body) => self.post(&self.batch_url, body),
            Err(e) => futures::future::ready(Err(TranslationError::from(e))).boxed_local(),
        }
    }

    fn supported_languages(&self) -> LocalBoxFuture<'static, TranslationResult<Value>> {
        self.post(&self.languages_url, json!({ "params": {} }))
    }
}

/// 解读启用检查的响应
///
/// 只有显式的 `enabled: false` 才会关闭管道，缺失或无法识别时视为启用。
pub fn is_enabled_response(response: &Value) -> bool {
    let payload = response.get("result").unwrap_or(response);
    !matches!(payload.get("enabled"), Some(Value::Bool(false)))
}
