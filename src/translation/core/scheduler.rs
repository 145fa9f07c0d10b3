//! 帧调度器
//!
//! "下一帧执行"是唯一可注入的时间原语。生产环境基于 tokio 的本地任务，
//! 测试使用 [`ManualScheduler`] 逐帧同步推进。

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;

/// 帧回调
pub type FrameTask = Box<dyn FnOnce() + 'static>;

/// 帧调度器接口
pub trait FrameScheduler {
    /// 在下一帧运行 `task`
    fn request_frame(&self, task: FrameTask);

    /// 运行一个本地异步任务（网络请求的后续处理、变更投递）
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// 基于 `tokio::task::spawn_local` 的调度器
///
/// 必须在 `tokio::task::LocalSet` 内使用。
#[derive(Debug, Clone)]
pub struct TokioFrameScheduler {
    frame_interval: Duration,
}

impl TokioFrameScheduler {
    pub fn new(frame_interval: Duration) -> Self {
        Self { frame_interval }
    }
}

impl Default for TokioFrameScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(16))
    }
}

impl FrameScheduler for TokioFrameScheduler {
    fn request_frame(&self, task: FrameTask) {
        let interval = self.frame_interval;
        tokio::task::spawn_local(async move {
            tokio::time::sleep(interval).await;
            task();
        });
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }
}

/// 手动推进的调度器
///
/// 帧回调排队等待 [`ManualScheduler::run_frame`]；异步任务由内部的
/// `LocalPool` 在 [`ManualScheduler::run_until_stalled`] 时推进。
pub struct ManualScheduler {
    frames: RefCell<VecDeque<FrameTask>>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
    frames_run: RefCell<usize>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            frames: RefCell::new(VecDeque::new()),
            pool: RefCell::new(pool),
            spawner,
            frames_run: RefCell::new(0),
        }
    }

    /// 推进所有异步任务直到无法继续
    pub fn run_until_stalled(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    /// 运行一帧：只执行调用前已排队的回调，返回执行数量
    pub fn run_frame(&self) -> usize {
        let tasks: Vec<FrameTask> = self.frames.borrow_mut().drain(..).collect();
        let count = tasks.len();
        for task in tasks {
            task();
        }
        *self.frames_run.borrow_mut() += 1;
        count
    }

    /// 交替推进异步任务与帧，直到没有排队的帧或达到 `max_frames`
    ///
    /// 返回实际运行的帧数。
    pub fn settle(&self, max_frames: usize) -> usize {
        let mut frames = 0;
        loop {
            self.run_until_stalled();
            if frames >= max_frames || self.frames.borrow().is_empty() {
                return frames;
            }
            self.run_frame();
            frames += 1;
        }
    }

    /// 排队中的帧回调数
    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    /// 已运行的帧数
    pub fn frames_run(&self) -> usize {
        *self.frames_run.borrow()
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&self, task: FrameTask) {
        self.frames.borrow_mut().push_back(task);
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(e) = self.spawner.spawn_local(task) {
            tracing::warn!("无法提交本地任务: {}", e);
        }
    }
}
