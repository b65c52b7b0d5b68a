use std::sync::{Arc, Weak};

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::{volume_percent, BackendState, PlaybackControl, TimeUpdatePoller};
use crate::config::YouTubeConfig;
use crate::dom::{ContainerHandle, ListenerId};
use crate::error::{PlayerError, Result};
use crate::events::{PlayerOptions, TimeEvent};
use crate::vendor::{YouTubeEvent, YouTubePlayer, YouTubePlayerConfig, YouTubePlayerState, YouTubeSdk};

/// 轮询任务、事件监听与后端共享的部分
struct Inner {
    player: Arc<dyn YouTubePlayer>,
    options: Arc<PlayerOptions>,
    previous_time: Mutex<Option<f64>>,
    poller: TimeUpdatePoller,
}

impl Inner {
    /// 位置未变化时不派发
    fn invoke_time_update(&self) {
        let current_time = self.player.get_current_time();
        {
            let mut previous = self.previous_time.lock();
            if *previous == Some(current_time) {
                return;
            }
            *previous = Some(current_time);
        }

        let duration = known_duration(self.player.get_duration());
        self.options
            .emit_time_update(&TimeEvent::new(Some(current_time), duration));
    }

    fn set_time_update_interval(self: &Arc<Self>) {
        let inner = Arc::downgrade(self);
        self.poller.start(move || {
            if let Some(inner) = inner.upgrade() {
                inner.invoke_time_update();
            }
        });
    }

    fn handle_event(&self, event: &YouTubeEvent) {
        match event {
            YouTubeEvent::Ready => {}
            YouTubeEvent::Error(data) => self.options.emit_error(data),
            YouTubeEvent::StateChange(code) => {
                let state = YouTubePlayerState::from_code(*code);
                debug!(target: "remu_embed::player", "state changed: {state:?} ({code})");
                match state {
                    Some(YouTubePlayerState::Playing) => {
                        self.options.emit_play();
                    }
                    Some(YouTubePlayerState::Paused) => {
                        self.options.emit_pause();
                        self.poller.stop();
                    }
                    Some(YouTubePlayerState::Ended) => {
                        self.options.emit_ended();
                        self.poller.stop();
                    }
                    _ => {}
                }
            }
        }
    }
}

/// YouTube 返回 0 表示时长未知
fn known_duration(duration: f64) -> Option<f64> {
    Some(duration).filter(|d| d.is_finite() && *d > 0.0)
}

/// YouTube IFrame API 后端
///
/// 没有原生的进度事件，进入 PLAYING 后按固定间隔轮询位置，
/// PAUSED/ENDED/detach 时停止。
pub struct YouTubeBackend {
    inner: Option<Arc<Inner>>,
    ready: Option<oneshot::Receiver<()>>,
    listeners: Vec<ListenerId>,
    state: BackendState,
}

impl YouTubeBackend {
    pub fn new(
        sdk: &dyn YouTubeSdk,
        container: ContainerHandle,
        options: Arc<PlayerOptions>,
        config: &YouTubeConfig,
    ) -> Result<Self> {
        let poller = TimeUpdatePoller::new(config.poll_interval)?;
        let player = sdk
            .create_player(
                &container,
                &YouTubePlayerConfig {
                    host: config.host.clone(),
                    width: "100%".into(),
                    height: "100%".into(),
                },
            )
            .map_err(PlayerError::vendor)?;

        // 构造后马上监听 onReady，避免错过早到的就绪事件
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let ready_listener = player.add_event_listener(Arc::new(move |event: &YouTubeEvent| {
            if *event == YouTubeEvent::Ready {
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(());
                }
            }
        }));

        Ok(Self {
            inner: Some(Arc::new(Inner {
                player,
                options,
                previous_time: Mutex::new(None),
                poller,
            })),
            ready: Some(rx),
            listeners: vec![ready_listener],
            state: BackendState::Unattached,
        })
    }

    fn inner(&self) -> Result<&Arc<Inner>> {
        self.state.ensure_ready()?;
        self.inner.as_ref().ok_or(PlayerError::NotAttached)
    }
}

#[async_trait]
impl PlaybackControl for YouTubeBackend {
    fn state(&self) -> BackendState {
        self.state
    }

    async fn attach(&mut self) -> Result<()> {
        if self.state == BackendState::Ready {
            return Ok(());
        }
        self.state.ensure_attachable()?;
        self.state = BackendState::Attaching;

        let inner = self.inner.clone().ok_or(PlayerError::NotAttached)?;
        if let Some(ready) = self.ready.take() {
            ready
                .await
                .map_err(|_| PlayerError::CallbackDropped("onReady"))?;
        }
        for id in self.listeners.drain(..) {
            inner.player.remove_event_listener(id);
        }

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let listener = inner.player.add_event_listener(Arc::new(move |event: &YouTubeEvent| {
            if let Some(inner) = weak.upgrade() {
                if *event == YouTubeEvent::StateChange(YouTubePlayerState::Playing.code()) {
                    inner.set_time_update_interval();
                }
                inner.handle_event(event);
            }
        }));
        self.listeners.push(listener);

        self.state = BackendState::Ready;
        Ok(())
    }

    async fn detach(&mut self) -> Result<()> {
        if let Some(inner) = self.inner.take() {
            inner.poller.stop();
            for id in self.listeners.drain(..) {
                inner.player.remove_event_listener(id);
            }
        }
        self.ready = None;
        self.state = BackendState::Detached;
        Ok(())
    }

    async fn load_video(&self, id: &str) -> Result<()> {
        let inner = self.inner()?;
        *inner.previous_time.lock() = None;
        inner.player.load_video_by_id(id);
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.inner()?.player.play_video();
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.inner()?.player.pause_video();
        Ok(())
    }

    async fn set_current_time(&self, seconds: f64) -> Result<()> {
        let inner = self.inner()?;
        inner.player.seek_to(seconds);
        inner.invoke_time_update();
        Ok(())
    }

    async fn set_volume(&self, volume: f64) -> Result<()> {
        self.inner()?.player.set_volume(volume_percent(volume));
        Ok(())
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        let inner = self.inner()?;
        if muted {
            inner.player.mute();
        } else {
            inner.player.un_mute();
        }
        Ok(())
    }

    async fn get_duration(&self) -> Result<Option<f64>> {
        Ok(known_duration(self.inner()?.player.get_duration()))
    }

    async fn get_current_time(&self) -> Result<Option<f64>> {
        let current_time = self.inner()?.player.get_current_time();
        Ok(Some(current_time).filter(|t| t.is_finite()))
    }
}
