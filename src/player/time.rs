use std::time::Duration;

use log::debug;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::{PlayerError, Result};

/// 进度轮询器
///
/// 用于没有原生进度事件的厂商。同一时刻最多只有一个定时任务，
/// 重新启动前总会先取消旧任务，被丢弃时也会取消。
pub struct TimeUpdatePoller {
    interval: Duration,
    runtime: Handle,
    token: Mutex<Option<CancellationToken>>,
}

impl TimeUpdatePoller {
    /// 需要在 tokio 运行时内调用，定时任务会派发到该运行时
    pub fn new(interval: Duration) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| PlayerError::Vendor(format!("no async runtime for polling: {e}")))?;
        Self::with_runtime(interval, runtime)
    }

    /// 间隔必须大于零
    pub fn with_runtime(interval: Duration, runtime: Handle) -> Result<Self> {
        if interval.is_zero() {
            return Err(PlayerError::Vendor("poll interval must be non-zero".into()));
        }
        Ok(Self {
            interval,
            runtime,
            token: Mutex::new(None),
        })
    }

    /// 启动轮询，立即执行一次 `tick`，之后每个间隔执行一次
    pub fn start<F>(&self, tick: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.token.lock().replace(token.clone()) {
            previous.cancel();
        }
        debug!(target: "remu_embed::player", "time update interval set");

        let interval = self.interval;
        self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => tick(),
                }
            }
        });
    }

    pub fn stop(&self) {
        if let Some(token) = self.token.lock().take() {
            debug!(target: "remu_embed::player", "time update interval cleared");
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.token.lock().is_some()
    }
}

impl Drop for TimeUpdatePoller {
    fn drop(&mut self) {
        self.stop();
    }
}
