//! 增量翻译引擎
//!
//! 引擎把扫描、变更观察、批次派发和结果写回串成一个自驱动的循环：
//!
//! 1. 启动时发出一次启用检查，只有显式的 `enabled: false` 会阻止启动
//! 2. 扫描文档正文并安装变更观察者
//! 3. 每一帧运行一个派发周期，周期完成后再请求下一帧
//! 4. 没有待处理节点时循环自然停止，直到新的变更再次唤醒它
//!
//! 所有状态只在单线程中访问，回调只持有弱引用，丢弃引擎即停止一切后续工作。

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures::FutureExt;
use serde_json::Value;

use super::client::{is_enabled_response, TranslatorBackend};
use super::scheduler::FrameScheduler;
use crate::dom::{LiveDocument, MutationObserver, MutationRecord};
use crate::translation::config::TranslatorConfig;
use crate::translation::error::TranslationResult;
use crate::translation::pipeline::{
    apply_results, collect_pending, normalize_response, BatchRequest, ConcurrencyGate, Registry,
    TextScanner,
};
use crate::translation::session::TargetLanguage;
use crate::translation::storage::{CacheStats, OriginCache};

/// 引擎生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// 尚未启动
    Idle,
    /// 等待启用检查的响应
    Checking,
    /// 管道运行中
    Running,
    /// 后端报告已禁用，管道永不启动
    Disabled,
    /// 已关闭
    Shutdown,
}

/// 引擎运行统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub cycles: usize,
    pub batches_sent: usize,
    pub batches_failed: usize,
    pub items_sent: usize,
    pub results_applied: usize,
    pub cache_applied: usize,
    pub mutation_deliveries: usize,
}

struct EngineInner {
    config: TranslatorConfig,
    document: Rc<LiveDocument>,
    backend: Rc<dyn TranslatorBackend>,
    scheduler: Rc<dyn FrameScheduler>,
    language: Rc<dyn TargetLanguage>,

    registry: RefCell<Registry>,
    cache: RefCell<OriginCache>,
    scanner: RefCell<TextScanner>,
    gate: RefCell<ConcurrencyGate>,

    writing: Rc<Cell<bool>>,
    observer: RefCell<Option<Rc<MutationObserver>>>,
    state: Cell<EngineState>,
    frame_pending: Cell<bool>,
    stats: RefCell<EngineStats>,
}

/// 翻译引擎实例
///
/// 每个实例拥有独立的注册表、缓存和写抑制标志，多个实例互不影响。
pub struct TranslatorEngine {
    inner: Rc<EngineInner>,
}

impl TranslatorEngine {
    /// 创建引擎，配置无效时返回错误
    pub fn new(
        config: TranslatorConfig,
        document: Rc<LiveDocument>,
        backend: Rc<dyn TranslatorBackend>,
        scheduler: Rc<dyn FrameScheduler>,
        language: Rc<dyn TargetLanguage>,
    ) -> TranslationResult<Self> {
        config.validate()?;

        let inner = EngineInner {
            registry: RefCell::new(Registry::new()),
            cache: RefCell::new(OriginCache::new(config.cache_capacity)),
            scanner: RefCell::new(TextScanner::new(&config)),
            gate: RefCell::new(ConcurrencyGate::new(config.max_concurrent_batches)),
            writing: Rc::new(Cell::new(false)),
            observer: RefCell::new(None),
            state: Cell::new(EngineState::Idle),
            frame_pending: Cell::new(false),
            stats: RefCell::new(EngineStats::default()),
            config,
            document,
            backend,
            scheduler,
            language,
        };

        Ok(Self {
            inner: Rc::new(inner),
        })
    }

    /// 发出启用检查，检查结束后启动管道
    pub fn start(&self) {
        self.inner.start();
    }

    /// 断开观察者并停止后续调度
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    /// 忘记所有写入记录，重新扫描并安排一个周期
    pub fn reset(&self) {
        self.inner.reset();
    }

    /// 切换会话目标语言并重新翻译
    pub fn set_target_language(&self, code: &str) {
        self.inner.language.set(code);
        tracing::info!("目标语言切换为 {:?}", self.inner.language.current());
        self.inner.reset();
    }

    pub fn state(&self) -> EngineState {
        self.inner.state.get()
    }

    pub fn target_language(&self) -> String {
        self.inner.language.current()
    }

    pub fn registered_count(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    /// 针对当前目标语言仍待处理的节点数（含在途）
    pub fn pending_count(&self) -> usize {
        let lang = self.inner.language.current();
        self.inner.registry.borrow().pending_count(&lang)
    }

    /// 在途批次数
    pub fn in_flight(&self) -> usize {
        self.inner.gate.borrow().in_flight()
    }

    /// 没有剩余工作：未运行，或者既无待处理节点也无在途批次
    pub fn is_idle(&self) -> bool {
        match self.state() {
            EngineState::Idle | EngineState::Checking => false,
            EngineState::Running => self.pending_count() == 0 && self.in_flight() == 0,
            EngineState::Disabled | EngineState::Shutdown => true,
        }
    }

    pub fn stats(&self) -> EngineStats {
        self.inner.stats.borrow().clone()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.borrow().stats().clone()
    }

    /// 某个标识对应节点的原文
    pub fn original_text(&self, id: usize) -> Option<String> {
        self.inner
            .registry
            .borrow()
            .get(id)
            .map(|record| record.original_text.clone())
    }

    pub fn document(&self) -> &Rc<LiveDocument> {
        &self.inner.document
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for TranslatorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslatorEngine")
            .field("state", &self.state())
            .field("registered", &self.registered_count())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl EngineInner {
    fn start(self: &Rc<Self>) {
        if self.state.get() != EngineState::Idle {
            tracing::debug!("引擎已启动过，忽略 start() (状态: {:?})", self.state.get());
            return;
        }
        self.state.set(EngineState::Checking);

        let check = self.backend.check_enabled();
        let weak = Rc::downgrade(self);

        self.scheduler.spawn(
            async move {
                let result = check.await;
                let inner = match weak.upgrade() {
                    Some(inner) => inner,
                    None => return,
                };
                if inner.state.get() != EngineState::Checking {
                    return;
                }

                match result {
                    Ok(response) if !is_enabled_response(&response) => {
                        tracing::info!("后端报告自动翻译已禁用");
                        inner.state.set(EngineState::Disabled);
                    }
                    Ok(_) => inner.boot(),
                    Err(e) => {
                        tracing::warn!("启用检查失败，仍然启动: {}", e);
                        inner.boot();
                    }
                }
            }
            .boxed_local(),
        );
    }

    fn boot(self: &Rc<Self>) {
        self.state.set(EngineState::Running);

        let registered = self
            .scanner
            .borrow_mut()
            .scan(self.document.body(), &mut self.registry.borrow_mut());
        tracing::info!("翻译管道已启动，注册 {} 个文本节点", registered);

        let weak = Rc::downgrade(self);
        let observer = MutationObserver::new(
            self.document.body().clone(),
            self.writing.clone(),
            move || schedule_delivery(&weak),
        );
        self.document.observe(&observer);
        *self.observer.borrow_mut() = Some(observer);

        self.request_cycle();
    }

    fn shutdown(&self) {
        self.state.set(EngineState::Shutdown);
        if let Some(observer) = self.observer.borrow_mut().take() {
            observer.disconnect();
        }
        tracing::info!("翻译引擎已关闭");
    }

    fn reset(self: &Rc<Self>) {
        if self.state.get() != EngineState::Running {
            tracing::debug!("引擎未运行，忽略 reset() (状态: {:?})", self.state.get());
            return;
        }

        let mut registry = self.registry.borrow_mut();
        registry.clear_applied();
        self.scanner.borrow_mut().scan(self.document.body(), &mut registry);
        drop(registry);

        self.request_cycle();
    }

    /// 请求在下一帧运行一个周期，已有请求时合并
    fn request_cycle(self: &Rc<Self>) {
        if self.state.get() != EngineState::Running {
            return;
        }
        if self.frame_pending.replace(true) {
            return;
        }

        let weak = Rc::downgrade(self);
        self.scheduler.request_frame(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.frame_pending.set(false);
                inner.cycle();
            }
        }));
    }

    /// 一个派发周期
    fn cycle(self: &Rc<Self>) {
        if self.state.get() != EngineState::Running {
            return;
        }
        if !self.gate.borrow().has_capacity() {
            tracing::trace!("并发名额已满，跳过本周期");
            return;
        }

        self.stats.borrow_mut().cycles += 1;
        let lang = self.language.current();

        let collection = collect_pending(
            &self.registry.borrow(),
            &mut self.cache.borrow_mut(),
            &lang,
            self.config.max_batch_items,
        );

        if !collection.cached.is_empty() {
            let outcome = apply_results(
                &self.document,
                &mut self.registry.borrow_mut(),
                &mut self.cache.borrow_mut(),
                &collection.cached,
                &lang,
                &self.writing,
            );
            self.stats.borrow_mut().cache_applied += outcome.applied;
        }

        if collection.items.is_empty() {
            return;
        }
        if !self.gate.borrow_mut().try_acquire() {
            return;
        }

        let request = BatchRequest::new(collection.items, &lang);
        let ids = request.identities();
        self.registry.borrow_mut().set_in_flight(&ids, true);
        {
            let mut stats = self.stats.borrow_mut();
            stats.batches_sent += 1;
            stats.items_sent += ids.len();
        }
        tracing::debug!("发送批次: {} 项 (语言: {:?})", ids.len(), lang);

        let response = self.backend.translate_batch(&request);
        let weak = Rc::downgrade(self);
        self.scheduler.spawn(
            async move {
                let result = response.await;
                if let Some(inner) = weak.upgrade() {
                    inner.complete_batch(&ids, &lang, result);
                }
            }
            .boxed_local(),
        );

        // 达到批次上限，让第二个并发名额尽快投入使用
        if collection.truncated {
            self.request_cycle();
        }
    }

    fn complete_batch(self: &Rc<Self>, ids: &[usize], lang: &str, result: TranslationResult<Value>) {
        self.registry.borrow_mut().set_in_flight(ids, false);
        self.gate.borrow_mut().release();

        if self.state.get() != EngineState::Running {
            return;
        }

        match result {
            Ok(response) => {
                let results = normalize_response(&response);
                let outcome = apply_results(
                    &self.document,
                    &mut self.registry.borrow_mut(),
                    &mut self.cache.borrow_mut(),
                    &results,
                    lang,
                    &self.writing,
                );
                self.stats.borrow_mut().results_applied += outcome.applied;
            }
            Err(e) => {
                self.stats.borrow_mut().batches_failed += 1;
                tracing::warn!("批次翻译失败，{} 项留待下个周期: {}", ids.len(), e);
            }
        }

        self.request_cycle();
    }

    fn deliver_mutations(self: &Rc<Self>) {
        let observer = match self.observer.borrow().clone() {
            Some(observer) => observer,
            None => return,
        };
        let records = observer.take_records();

        if records.is_empty() || self.writing.get() {
            return;
        }
        if self.state.get() != EngineState::Running {
            return;
        }

        self.stats.borrow_mut().mutation_deliveries += 1;
        {
            let mut registry = self.registry.borrow_mut();
            let mut scanner = self.scanner.borrow_mut();

            for record in &records {
                match record {
                    MutationRecord::ChildList { added, .. } => {
                        for node in added {
                            scanner.scan(node, &mut registry);
                        }
                    }
                    MutationRecord::CharacterData { target, .. } => {
                        scanner.visit_text(target, &mut registry);
                    }
                }
            }
        }
        tracing::trace!("处理 {} 条变更记录", records.len());

        self.request_cycle();
    }
}

fn schedule_delivery(weak: &Weak<EngineInner>) {
    let inner = match weak.upgrade() {
        Some(inner) => inner,
        None => return,
    };

    let weak = weak.clone();
    inner.scheduler.spawn(
        async move {
            if let Some(inner) = weak.upgrade() {
                inner.deliver_mutations();
            }
        }
        .boxed_local(),
    );
}
