//! 会话级目标语言
//!
//! 目标语言只保存在会话存储的一个键里，管道在每次收集时读取。
//! 这里还包括语言参数在链接间的传播，以及支持语言列表的加载与缓存。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::config::constants;
use super::core::TranslatorBackend;

/// `(代码, 名称)`
pub type LanguagePair = (String, String);

/// 会话存储
///
/// 实现不得报错：任何失败都按"键不存在"处理。
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// 内存中的会话存储
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

/// 管道读取目标语言的接口，空串表示不覆盖
pub trait TargetLanguage {
    fn current(&self) -> String;
    fn set(&self, code: &str);
}

/// 固定的目标语言
#[derive(Debug, Default)]
pub struct FixedLanguage(RefCell<String>);

impl FixedLanguage {
    pub fn new(code: &str) -> Self {
        Self(RefCell::new(normalize_lang_code(code)))
    }
}

impl TargetLanguage for FixedLanguage {
    fn current(&self) -> String {
        self.0.borrow().clone()
    }

    fn set(&self, code: &str) {
        *self.0.borrow_mut() = normalize_lang_code(code);
    }
}

pub fn normalize_lang_code(code: &str) -> String {
    code.trim().to_string()
}

fn is_backend_path(path: &str) -> bool {
    path.starts_with(constants::BACKEND_PATH_PREFIX)
}

/// 基于会话存储的目标语言
pub struct SessionLanguage {
    store: Rc<dyn SessionStore>,
    page_path: RefCell<String>,
}

impl SessionLanguage {
    pub fn new(store: Rc<dyn SessionStore>) -> Self {
        Self {
            store,
            page_path: RefCell::new("/".to_string()),
        }
    }

    /// 设置当前页面路径；后台路径下不做任何翻译
    pub fn with_page_path(self, path: &str) -> Self {
        *self.page_path.borrow_mut() = path.to_string();
        self
    }

    pub fn store(&self) -> &Rc<dyn SessionStore> {
        &self.store
    }

    /// 读取 URL 中的语言参数并写入会话
    ///
    /// 返回去掉该参数后的 URL；没有参数、参数为空或位于后台路径时返回 `None`。
    pub fn sync_from_url(&self, page_url: &str) -> Option<String> {
        let mut url = Url::parse(page_url).ok()?;
        *self.page_path.borrow_mut() = url.path().to_string();

        if is_backend_path(url.path()) {
            return None;
        }

        let lang = url
            .query_pairs()
            .find(|(key, _)| key == constants::URL_PARAM_KEY)
            .map(|(_, value)| normalize_lang_code(&value))
            .filter(|value| !value.is_empty())?;

        self.set(&lang);

        let remaining: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != constants::URL_PARAM_KEY)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        if remaining.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(remaining);
        }

        tracing::debug!("从URL同步会话语言: {}", lang);
        Some(url.to_string())
    }
}

impl TargetLanguage for SessionLanguage {
    fn current(&self) -> String {
        if is_backend_path(&self.page_path.borrow()) {
            return String::new();
        }

        self.store
            .get(constants::SESSION_LANG_KEY)
            .map(|value| normalize_lang_code(&value))
            .unwrap_or_default()
    }

    fn set(&self, code: &str) {
        let code = normalize_lang_code(code);
        if code.is_empty() {
            self.store.remove(constants::SESSION_LANG_KEY);
        } else {
            self.store.set(constants::SESSION_LANG_KEY, &code);
        }
    }
}

/// 给同源、非后台链接附加语言参数
///
/// 链接无法解析、跨源、指向后台或语言为空时返回 `None`。
pub fn decorate_link(href: &str, page_url: &str, lang: &str) -> Option<String> {
    let lang = normalize_lang_code(lang);
    if href.is_empty() || lang.is_empty() {
        return None;
    }

    let base = Url::parse(page_url).ok()?;
    let mut url = base.join(href).ok()?;

    if url.origin() != base.origin() || is_backend_path(url.path()) {
        return None;
    }

    let remaining: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != constants::URL_PARAM_KEY)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(remaining)
        .append_pair(constants::URL_PARAM_KEY, &lang);

    Some(url.to_string())
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguageCacheEntry {
    v: u32,
    languages: Vec<LanguagePair>,
}

/// 后端不可用时的语言列表
pub fn fallback_languages() -> Vec<LanguagePair> {
    [
        ("en", "English"),
        ("fr", "French"),
        ("es", "Spanish"),
        ("de", "German"),
        ("ar", "Arabic"),
        ("hi", "Hindi"),
        ("zh-CN", "Chinese (Simplified)"),
    ]
    .iter()
    .map(|(code, name)| (code.to_string(), name.to_string()))
    .collect()
}

fn cached_languages(store: &dyn SessionStore) -> Option<Vec<LanguagePair>> {
    let raw = store.get(constants::LANG_CACHE_KEY)?;
    let entry: LanguageCacheEntry = serde_json::from_str(&raw).ok()?;

    if entry.v == constants::LANG_CACHE_VERSION
        && entry.languages.len() >= constants::MIN_EXPECTED_LANGS
    {
        Some(entry.languages)
    } else {
        None
    }
}

fn languages_from_response(response: &Value) -> Option<Vec<LanguagePair>> {
    let payload = response.get("result").unwrap_or(response);
    let languages = payload.get("languages")?.clone();
    serde_json::from_value(languages).ok()
}

/// 加载支持的语言列表
///
/// 优先使用会话缓存；缓存缺失或不可信时请求后端，结果足够完整才写回缓存。
/// 任何失败都退回 [`fallback_languages`]。
pub async fn load_supported_languages(
    backend: &dyn TranslatorBackend,
    store: &dyn SessionStore,
) -> Vec<LanguagePair> {
    if let Some(languages) = cached_languages(store) {
        return languages;
    }

    let response = match backend.supported_languages().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("获取支持语言失败: {}", e);
            return fallback_languages();
        }
    };

    match languages_from_response(&response) {
        Some(languages) if languages.len() >= constants::MIN_EXPECTED_LANGS => {
            let entry = LanguageCacheEntry {
                v: constants::LANG_CACHE_VERSION,
                languages,
            };
            if let Ok(raw) = serde_json::to_string(&entry) {
                store.set(constants::LANG_CACHE_KEY, &raw);
            }
            entry.languages
        }
        _ => {
            tracing::warn!("支持语言列表不完整，使用内置列表");
            fallback_languages()
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use futures::future::LocalBoxFuture;
    use futures::FutureExt;
    use serde_json::json;

    use super::*;
    use crate::translation::error::{TranslationError, TranslationResult};
    use crate::translation::pipeline::BatchRequest;

    struct LanguagesOnly(Option<Value>);

    impl TranslatorBackend for LanguagesOnly {
        fn check_enabled(&self) -> LocalBoxFuture<'static, TranslationResult<Value>> {
            futures::future::ready(Ok(json!({"enabled": true}))).boxed_local()
        }

        fn translate_batch(&self, _: &BatchRequest) -> LocalBoxFuture<'static, TranslationResult<Value>> {
            futures::future::ready(Ok(json!({"items": []}))).boxed_local()
        }

        fn supported_languages(&self) -> LocalBoxFuture<'static, TranslationResult<Value>> {
            let result = match &self.0 {
                Some(value) => Ok(value.clone()),
                None => Err(TranslationError::NetworkError("offline".to_string())),
            };
            futures::future::ready(result).boxed_local()
        }
    }

    fn many_languages(count: usize) -> Vec<Value> {
        (0..count)
            .map(|n| json!([format!("l{}", n), format!("Language {}", n)]))
            .collect()
    }

    #[test]
    fn test_session_language_set_and_clear() {
        let store: Rc<dyn SessionStore> = Rc::new(MemorySessionStore::new());
        let lang = SessionLanguage::new(store.clone());

        assert_eq!(lang.current(), "");
        lang.set("  fr ");
        assert_eq!(lang.current(), "fr");
        assert_eq!(store.get(constants::SESSION_LANG_KEY).as_deref(), Some("fr"));

        lang.set("   ");
        assert_eq!(lang.current(), "");
        assert!(store.get(constants::SESSION_LANG_KEY).is_none());
    }

    #[test]
    fn test_backend_paths_never_translate() {
        let store: Rc<dyn SessionStore> = Rc::new(MemorySessionStore::new());
        store.set(constants::SESSION_LANG_KEY, "de");

        let lang = SessionLanguage::new(store).with_page_path("/web#action=42");
        assert_eq!(lang.current(), "");
    }

    #[test]
    fn test_sync_from_url_strips_parameter() {
        let lang = SessionLanguage::new(Rc::new(MemorySessionStore::new()));

        let cleaned = lang.sync_from_url("https://shop.example.com/page?ast_lang=es&x=1");
        assert_eq!(cleaned.as_deref(), Some("https://shop.example.com/page?x=1"));
        assert_eq!(lang.current(), "es");

        let cleaned = lang.sync_from_url("https://shop.example.com/page?ast_lang=fr");
        assert_eq!(cleaned.as_deref(), Some("https://shop.example.com/page"));
        assert_eq!(lang.current(), "fr");

        assert!(lang.sync_from_url("https://shop.example.com/page?x=1").is_none());
        assert!(lang.sync_from_url("https://shop.example.com/web?ast_lang=de").is_none());
    }

    #[test]
    fn test_decorate_link() {
        let page = "https://shop.example.com/shop";

        assert_eq!(
            decorate_link("/contact?a=b", page, "fr").as_deref(),
            Some("https://shop.example.com/contact?a=b&ast_lang=fr")
        );
        assert_eq!(
            decorate_link("/about?ast_lang=es", page, "fr").as_deref(),
            Some("https://shop.example.com/about?ast_lang=fr")
        );
        assert!(decorate_link("https://other.example.org/", page, "fr").is_none());
        assert!(decorate_link("/web/login", page, "fr").is_none());
        assert!(decorate_link("/contact", page, "").is_none());
    }

    #[test]
    fn test_languages_fall_back_on_failure() {
        let store = MemorySessionStore::new();
        let languages = block_on(load_supported_languages(&LanguagesOnly(None), &store));
        assert_eq!(languages, fallback_languages());
        assert!(store.get(constants::LANG_CACHE_KEY).is_none());

        let short = LanguagesOnly(Some(json!({"languages": [["en", "English"]]})));
        let languages = block_on(load_supported_languages(&short, &store));
        assert_eq!(languages.len(), 7);
    }

    #[test]
    fn test_languages_fetched_and_cached() {
        let store = MemorySessionStore::new();
        let backend = LanguagesOnly(Some(json!({"result": {"languages": many_languages(30)}})));

        let languages = block_on(load_supported_languages(&backend, &store));
        assert_eq!(languages.len(), 30);
        assert_eq!(languages[0], ("l0".to_string(), "Language 0".to_string()));

        // 之后直接命中缓存
        let languages = block_on(load_supported_languages(&LanguagesOnly(None), &store));
        assert_eq!(languages.len(), 30);
    }

    #[test]
    fn test_stale_cache_version_is_ignored() {
        let store = MemorySessionStore::new();
        let stale = json!({"v": 1, "languages": many_languages(40)});
        store.set(constants::LANG_CACHE_KEY, &stale.to_string());

        let languages = block_on(load_supported_languages(&LanguagesOnly(None), &store));
        assert_eq!(languages, fallback_languages());
    }
}
