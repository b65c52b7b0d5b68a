use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

/// 播放进度事件
///
/// 任何字段在未知时为 `None`（例如元数据加载前的时长），
/// 不会被强制为 0，也不会把 NaN 传给调用方。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TimeEvent {
    pub duration: Option<f64>,
    pub percent: Option<f64>,
    pub seconds: Option<f64>,
}

impl TimeEvent {
    /// 由当前位置和时长计算进度，`percent = seconds / duration`
    pub fn new(seconds: Option<f64>, duration: Option<f64>) -> Self {
        let seconds = seconds.filter(|s| s.is_finite());
        let duration = duration.filter(|d| d.is_finite());
        let percent = match (seconds, duration) {
            (Some(s), Some(d)) if d > 0.0 => Some(s / d),
            _ => None,
        };
        Self {
            duration,
            percent,
            seconds,
        }
    }
}

/// 媒体加载完成事件（对应 loadeddata）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedEvent {
    pub id: String,
}

type Callback = Arc<dyn Fn() + Send + Sync + 'static>;
type ErrorCallback = Arc<dyn Fn(&Value) + Send + Sync + 'static>;
type LoadedCallback = Arc<dyn Fn(&LoadedEvent) + Send + Sync + 'static>;
type TimeUpdateCallback = Arc<dyn Fn(&TimeEvent) + Send + Sync + 'static>;

/// 调用方提供的事件回调，一个 attach 周期内不可变
///
/// 所有回调都是可选的，未设置表示调用方不关心该事件。
#[derive(Clone, Default)]
pub struct PlayerOptions {
    on_error: Option<ErrorCallback>,
    on_loaded: Option<LoadedCallback>,
    on_play: Option<Callback>,
    on_pause: Option<Callback>,
    on_ended: Option<Callback>,
    on_time_update: Option<TimeUpdateCallback>,
}

impl PlayerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 厂商报告的错误，原样转发
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn on_loaded<F>(mut self, callback: F) -> Self
    where
        F: Fn(&LoadedEvent) + Send + Sync + 'static,
    {
        self.on_loaded = Some(Arc::new(callback));
        self
    }

    pub fn on_play<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_play = Some(Arc::new(callback));
        self
    }

    pub fn on_pause<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_pause = Some(Arc::new(callback));
        self
    }

    pub fn on_ended<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_ended = Some(Arc::new(callback));
        self
    }

    pub fn on_time_update<F>(mut self, callback: F) -> Self
    where
        F: Fn(&TimeEvent) + Send + Sync + 'static,
    {
        self.on_time_update = Some(Arc::new(callback));
        self
    }

    pub(crate) fn emit_error(&self, event: &Value) {
        if let Some(ref cb) = self.on_error {
            cb(event);
        }
    }

    pub(crate) fn emit_loaded(&self, event: &LoadedEvent) {
        if let Some(ref cb) = self.on_loaded {
            cb(event);
        }
    }

    pub(crate) fn emit_play(&self) {
        if let Some(ref cb) = self.on_play {
            cb();
        }
    }

    pub(crate) fn emit_pause(&self) {
        if let Some(ref cb) = self.on_pause {
            cb();
        }
    }

    pub(crate) fn emit_ended(&self) {
        if let Some(ref cb) = self.on_ended {
            cb();
        }
    }

    pub(crate) fn emit_time_update(&self, event: &TimeEvent) {
        if let Some(ref cb) = self.on_time_update {
            cb(event);
        }
    }
}

impl fmt::Debug for PlayerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerOptions")
            .field("on_error", &self.on_error.is_some())
            .field("on_loaded", &self.on_loaded.is_some())
            .field("on_play", &self.on_play.is_some())
            .field("on_pause", &self.on_pause.is_some())
            .field("on_ended", &self.on_ended.is_some())
            .field("on_time_update", &self.on_time_update.is_some())
            .finish()
    }
}
