// 集成测试公共模块
//
// 提供模拟后端、测试环境和HTML辅助工具

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use markup5ever_rcdom::{Handle, NodeData};
use serde_json::{json, Value};

use autotranslate::dom::{text_value, LiveDocument};
use autotranslate::translation::{
    BatchRequest, ManualScheduler, MemorySessionStore, SessionLanguage, SessionStore,
    TargetLanguage, TranslationError, TranslationResult, TranslatorBackend, TranslatorConfig,
    TranslatorEngine,
};

/// 模拟后端应答批次的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// 立即按词典应答
    Auto,
    /// 挂起，直到测试调用 `release_next` / `fail_next`
    Hold,
    /// 立即返回网络错误
    Fail,
}

/// 词典翻译：已知词条按语言查表，其他文本附加语言标记
pub fn dictionary(text: &str, lang: &str) -> String {
    match (text, lang) {
        ("Hello", "" | "fr") => "Bonjour".to_string(),
        ("Hello", "es") => "Hola".to_string(),
        ("World", "" | "fr") => "Monde".to_string(),
        ("World", "es") => "Mundo".to_string(),
        _ => format!("{} [{}]", text, if lang.is_empty() { "default" } else { lang }),
    }
}

fn batch_response(request: &BatchRequest) -> Value {
    let lang = request.target_lang.clone().unwrap_or_default();
    let items: Vec<Value> = request
        .items
        .iter()
        .map(|item| json!({"i": item.i, "result": dictionary(&item.text, &lang)}))
        .collect();
    json!({ "items": items })
}

type PendingReply = (BatchRequest, oneshot::Sender<TranslationResult<Value>>);

/// 记录所有调用的模拟后端
pub struct MockBackend {
    enabled: RefCell<Result<Value, String>>,
    mode: Cell<BatchMode>,
    nested: Cell<bool>,
    pub enabled_calls: Cell<usize>,
    requests: RefCell<Vec<BatchRequest>>,
    pending: RefCell<VecDeque<PendingReply>>,
    outstanding: Rc<Cell<usize>>,
    max_outstanding: Rc<Cell<usize>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            enabled: RefCell::new(Ok(json!({"enabled": true}))),
            mode: Cell::new(BatchMode::Auto),
            nested: Cell::new(false),
            enabled_calls: Cell::new(0),
            requests: RefCell::new(Vec::new()),
            pending: RefCell::new(VecDeque::new()),
            outstanding: Rc::new(Cell::new(0)),
            max_outstanding: Rc::new(Cell::new(0)),
        }
    }

    pub fn set_enabled_response(&self, response: Value) {
        *self.enabled.borrow_mut() = Ok(response);
    }

    pub fn fail_enabled_check(&self) {
        *self.enabled.borrow_mut() = Err("connection refused".to_string());
    }

    pub fn set_mode(&self, mode: BatchMode) {
        self.mode.set(mode);
    }

    /// 使用 `{result: {items}}` 外形应答
    pub fn set_nested(&self, nested: bool) {
        self.nested.set(nested);
    }

    pub fn requests(&self) -> Vec<BatchRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn held_count(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn max_outstanding(&self) -> usize {
        self.max_outstanding.get()
    }

    /// 按词典应答最早挂起的批次
    pub fn release_next(&self) -> bool {
        match self.pending.borrow_mut().pop_front() {
            Some((request, reply)) => {
                let response = self.wrap(batch_response(&request));
                reply.send(Ok(response)).is_ok()
            }
            None => false,
        }
    }

    /// 用指定的响应应答最早挂起的批次
    pub fn release_next_with(&self, response: Value) -> bool {
        match self.pending.borrow_mut().pop_front() {
            Some((_, reply)) => reply.send(Ok(response)).is_ok(),
            None => false,
        }
    }

    /// 让最早挂起的批次以网络错误结束
    pub fn fail_next(&self) -> bool {
        match self.pending.borrow_mut().pop_front() {
            Some((_, reply)) => reply
                .send(Err(TranslationError::NetworkError("timeout".to_string())))
                .is_ok(),
            None => false,
        }
    }

    fn wrap(&self, response: Value) -> Value {
        if self.nested.get() {
            json!({ "result": response })
        } else {
            response
        }
    }

    fn track(
        &self,
        future: LocalBoxFuture<'static, TranslationResult<Value>>,
    ) -> LocalBoxFuture<'static, TranslationResult<Value>> {
        let outstanding = self.outstanding.clone();
        outstanding.set(outstanding.get() + 1);
        if outstanding.get() > self.max_outstanding.get() {
            self.max_outstanding.set(outstanding.get());
        }

        async move {
            let result = future.await;
            outstanding.set(outstanding.get() - 1);
            result
        }
        .boxed_local()
    }
}

impl TranslatorBackend for MockBackend {
    fn check_enabled(&self) -> LocalBoxFuture<'static, TranslationResult<Value>> {
        self.enabled_calls.set(self.enabled_calls.get() + 1);
        let result = self
            .enabled
            .borrow()
            .clone()
            .map_err(TranslationError::NetworkError);
        futures::future::ready(result).boxed_local()
    }

    fn translate_batch(&self, request: &BatchRequest) -> LocalBoxFuture<'static, TranslationResult<Value>> {
        self.requests.borrow_mut().push(request.clone());

        let future = match self.mode.get() {
            BatchMode::Auto => {
                let response = self.wrap(batch_response(request));
                futures::future::ready(Ok(response)).boxed_local()
            }
            BatchMode::Fail => futures::future::ready(Err(TranslationError::NetworkError(
                "connection reset".to_string(),
            )))
            .boxed_local(),
            BatchMode::Hold => {
                let (reply, receiver) = oneshot::channel();
                self.pending.borrow_mut().push_back((request.clone(), reply));
                receiver
                    .map(|result| {
                        result.unwrap_or_else(|_| {
                            Err(TranslationError::NetworkError("cancelled".to_string()))
                        })
                    })
                    .boxed_local()
            }
        };

        self.track(future)
    }

    fn supported_languages(&self) -> LocalBoxFuture<'static, TranslationResult<Value>> {
        futures::future::ready(Ok(json!({"languages": [["en", "English"], ["fr", "French"]]})))
            .boxed_local()
    }
}

/// 一个完整的、手动推进的测试环境
pub struct TestEnvironment {
    pub document: Rc<LiveDocument>,
    pub backend: Rc<MockBackend>,
    pub scheduler: Rc<ManualScheduler>,
    pub store: Rc<MemorySessionStore>,
    pub language: Rc<SessionLanguage>,
    pub engine: TranslatorEngine,
}

impl TestEnvironment {
    pub fn new(html: &str) -> Self {
        Self::with_config(html, TranslatorConfig::default())
    }

    pub fn with_config(html: &str, config: TranslatorConfig) -> Self {
        let document = Rc::new(LiveDocument::parse(html).expect("HTML should parse"));
        let backend = Rc::new(MockBackend::new());
        let scheduler = Rc::new(ManualScheduler::new());
        let store = Rc::new(MemorySessionStore::new());
        let session: Rc<dyn SessionStore> = store.clone();
        let language = Rc::new(SessionLanguage::new(session));

        let engine = TranslatorEngine::new(
            config,
            document.clone(),
            backend.clone(),
            scheduler.clone(),
            language.clone(),
        )
        .expect("config should be valid");

        Self {
            document,
            backend,
            scheduler,
            store,
            language,
            engine,
        }
    }

    /// 设置会话语言（不触发重新翻译）
    pub fn with_language(self, code: &str) -> Self {
        self.language.set(code);
        self
    }

    /// 启动引擎并完成启用检查
    pub fn start(&self) {
        self.engine.start();
        self.scheduler.run_until_stalled();
    }

    /// 推进到没有排队的帧
    pub fn settle(&self) -> usize {
        self.scheduler.settle(100)
    }

    /// 启动并推进到稳定
    pub fn run(&self) {
        self.start();
        self.settle();
    }

    pub fn text_nodes(&self) -> Vec<Handle> {
        HtmlTestHelper::text_nodes(self.document.body())
    }

    /// 正文中所有非空白文本
    pub fn visible_texts(&self) -> Vec<String> {
        self.text_nodes()
            .iter()
            .filter_map(text_value)
            .filter(|text| !text.trim().is_empty())
            .collect()
    }

    pub fn find_text(&self, value: &str) -> Handle {
        self.text_nodes()
            .into_iter()
            .find(|node| text_value(node).as_deref() == Some(value))
            .unwrap_or_else(|| panic!("no text node with value {:?}", value))
    }
}

/// HTML辅助工具
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    /// 按文档顺序列出 `root` 下的文本节点
    pub fn text_nodes(root: &Handle) -> Vec<Handle> {
        let mut found = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            if let NodeData::Text { .. } = node.data {
                found.push(node.clone());
            }
            stack.extend(node.children.borrow().iter().rev().cloned());
        }
        found
    }

    /// `count` 个段落，每段一条不同的文本
    pub fn paragraphs(count: usize) -> String {
        (0..count)
            .map(|n| format!("<p>Paragraph number {}</p>", n))
            .collect()
    }

    pub fn long_text(chars: usize) -> String {
        "a".repeat(chars)
    }
}
