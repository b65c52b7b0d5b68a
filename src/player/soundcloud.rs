use std::sync::{Arc, Weak};

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::{clamp_volume, volume_percent, BackendState, PlaybackControl};
use crate::config::SoundCloudConfig;
use crate::dom::IFrameElement;
use crate::error::{PlayerError, Result};
use crate::events::{PlayerOptions, TimeEvent};
use crate::vendor::{
    SoundCloudEventKind, SoundCloudLoadOptions, SoundCloudSdk, SoundCloudWidget, WidgetCallback,
    WidgetEvent,
};

/// attach 之后绑定的事件，detach 时全部解绑
const BOUND_EVENTS: [SoundCloudEventKind; 5] = [
    SoundCloudEventKind::Error,
    SoundCloudEventKind::Play,
    SoundCloudEventKind::Pause,
    SoundCloudEventKind::Finish,
    SoundCloudEventKind::PlayProgress,
];

/// 把一次性回调接到 oneshot 上
fn callback<T: Send + 'static>() -> (WidgetCallback<T>, oneshot::Receiver<T>) {
    let (tx, rx) = oneshot::channel();
    let callback: WidgetCallback<T> = Box::new(move |value| {
        let _ = tx.send(value);
    });
    (callback, rx)
}

/// 毫秒转秒，0 表示时长未知
fn known_duration(milliseconds: f64) -> Option<f64> {
    Some(milliseconds / 1000.0).filter(|d| d.is_finite() && *d > 0.0)
}

/// 组件没有静音接口，静音通过音量 0 实现
#[derive(Debug, Clone, Copy)]
struct Volume {
    level: f64,
    muted: bool,
}

/// SoundCloud Widget API 后端
pub struct SoundCloudBackend {
    widget: Arc<dyn SoundCloudWidget>,
    options: Arc<PlayerOptions>,
    config: SoundCloudConfig,
    ready: Option<oneshot::Receiver<()>>,
    volume: Mutex<Volume>,
    state: BackendState,
}

impl SoundCloudBackend {
    pub fn new(
        sdk: &dyn SoundCloudSdk,
        iframe: Arc<dyn IFrameElement>,
        options: Arc<PlayerOptions>,
        config: SoundCloudConfig,
    ) -> Result<Self> {
        let widget = sdk.widget(iframe).map_err(PlayerError::vendor)?;

        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        widget.bind(
            SoundCloudEventKind::Ready,
            Arc::new(move |_: &WidgetEvent| {
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(());
                }
            }),
        );

        Ok(Self {
            widget,
            options,
            config,
            ready: Some(rx),
            volume: Mutex::new(Volume {
                level: 1.0,
                muted: false,
            }),
            state: BackendState::Unattached,
        })
    }

    /// 只取第一个空白分隔的片段作为曲目 id
    fn track_url(&self, id: &str) -> String {
        let track = id.split_whitespace().next().unwrap_or("");
        format!("{}{}", self.config.track_url_base, track)
    }

    fn bind_events(&self) {
        let options = &self.options;

        let o = Arc::clone(options);
        self.widget.bind(
            SoundCloudEventKind::Error,
            Arc::new(move |event: &WidgetEvent| o.emit_error(&event.data)),
        );
        let o = Arc::clone(options);
        self.widget
            .bind(SoundCloudEventKind::Play, Arc::new(move |_: &WidgetEvent| o.emit_play()));
        let o = Arc::clone(options);
        self.widget
            .bind(SoundCloudEventKind::Pause, Arc::new(move |_: &WidgetEvent| o.emit_pause()));
        let o = Arc::clone(options);
        self.widget
            .bind(SoundCloudEventKind::Finish, Arc::new(move |_: &WidgetEvent| o.emit_ended()));

        // 进度事件只有位置，时长需要再查一次
        let o = Arc::clone(options);
        let widget: Weak<dyn SoundCloudWidget> = Arc::downgrade(&self.widget);
        self.widget.bind(
            SoundCloudEventKind::PlayProgress,
            Arc::new(move |event: &WidgetEvent| {
                let Some(widget) = widget.upgrade() else {
                    return;
                };
                let seconds = event.current_position.map(|p| p / 1000.0);
                let o = Arc::clone(&o);
                widget.get_duration(Box::new(move |duration| {
                    o.emit_time_update(&TimeEvent::new(seconds, known_duration(duration)));
                }));
            }),
        );
    }

    fn send_volume(&self, volume: Volume) {
        let level = if volume.muted { 0.0 } else { volume.level };
        self.widget.set_volume(volume_percent(level));
    }
}

#[async_trait]
impl PlaybackControl for SoundCloudBackend {
    fn state(&self) -> BackendState {
        self.state
    }

    async fn attach(&mut self) -> Result<()> {
        if self.state == BackendState::Ready {
            return Ok(());
        }
        self.state.ensure_attachable()?;
        self.state = BackendState::Attaching;

        if let Some(ready) = self.ready.take() {
            ready.await.map_err(|_| PlayerError::CallbackDropped("ready"))?;
            self.widget.unbind(SoundCloudEventKind::Ready);
        }
        self.bind_events();

        debug!(target: "remu_embed::player", "soundcloud widget ready");
        self.state = BackendState::Ready;
        Ok(())
    }

    async fn detach(&mut self) -> Result<()> {
        self.widget.unbind(SoundCloudEventKind::Ready);
        for kind in BOUND_EVENTS {
            self.widget.unbind(kind);
        }
        self.ready = None;
        self.state = BackendState::Detached;
        Ok(())
    }

    async fn load_video(&self, id: &str) -> Result<()> {
        self.state.ensure_ready()?;
        let url = self.track_url(id);
        let (done, rx) = callback();
        self.widget.load(
            &url,
            SoundCloudLoadOptions {
                auto_play: self.config.auto_play,
            },
            done,
        );
        rx.await.map_err(|_| PlayerError::CallbackDropped("load"))
    }

    async fn play(&self) -> Result<()> {
        self.state.ensure_ready()?;
        self.widget.play();
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.state.ensure_ready()?;
        self.widget.pause();
        Ok(())
    }

    async fn set_current_time(&self, seconds: f64) -> Result<()> {
        self.state.ensure_ready()?;
        self.widget.seek_to(seconds * 1000.0);
        Ok(())
    }

    /// 静音期间只记录音量，取消静音时再生效
    async fn set_volume(&self, volume: f64) -> Result<()> {
        self.state.ensure_ready()?;
        let volume = {
            let mut current = self.volume.lock();
            current.level = clamp_volume(volume);
            *current
        };
        if !volume.muted {
            self.send_volume(volume);
        }
        Ok(())
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        self.state.ensure_ready()?;
        let volume = {
            let mut current = self.volume.lock();
            current.muted = muted;
            *current
        };
        self.send_volume(volume);
        Ok(())
    }

    async fn get_duration(&self) -> Result<Option<f64>> {
        self.state.ensure_ready()?;
        let (done, rx) = callback();
        self.widget.get_duration(done);
        let duration = rx
            .await
            .map_err(|_| PlayerError::CallbackDropped("getDuration"))?;
        Ok(known_duration(duration))
    }

    async fn get_current_time(&self) -> Result<Option<f64>> {
        self.state.ensure_ready()?;
        let (done, rx) = callback();
        self.widget.get_position(done);
        let position = rx
            .await
            .map_err(|_| PlayerError::CallbackDropped("getPosition"))?;
        Ok(Some(position / 1000.0).filter(|p| p.is_finite()))
    }
}
