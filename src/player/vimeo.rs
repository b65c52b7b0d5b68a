use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use super::{clamp_volume, BackendState, PlaybackControl};
use crate::dom::IFrameElement;
use crate::error::{PlayerError, Result};
use crate::events::{PlayerOptions, TimeEvent};
use crate::vendor::{VimeoEvent, VimeoEventKind, VimeoPlayer, VimeoSdk};

const BOUND_EVENTS: [VimeoEventKind; 5] = [
    VimeoEventKind::Error,
    VimeoEventKind::Play,
    VimeoEventKind::Pause,
    VimeoEventKind::Ended,
    VimeoEventKind::TimeUpdate,
];

fn finite(value: f64) -> Option<f64> {
    Some(value).filter(|v| v.is_finite())
}

fn forward(options: &PlayerOptions, event: &VimeoEvent) {
    match event {
        VimeoEvent::Error(data) => options.emit_error(data),
        VimeoEvent::Play => options.emit_play(),
        VimeoEvent::Pause => options.emit_pause(),
        VimeoEvent::Ended => options.emit_ended(),
        // Vimeo 自带完整的进度数据，直接透传
        VimeoEvent::TimeUpdate {
            duration,
            percent,
            seconds,
        } => options.emit_time_update(&TimeEvent {
            duration: finite(*duration),
            percent: finite(*percent),
            seconds: finite(*seconds),
        }),
    }
}

/// Vimeo Player.js 后端，所有调用都是异步的
pub struct VimeoBackend {
    player: Arc<dyn VimeoPlayer>,
    options: Arc<PlayerOptions>,
    state: BackendState,
}

impl VimeoBackend {
    pub fn new(
        sdk: &dyn VimeoSdk,
        iframe: Arc<dyn IFrameElement>,
        options: Arc<PlayerOptions>,
    ) -> Result<Self> {
        let player = sdk.player(iframe).map_err(PlayerError::vendor)?;
        Ok(Self {
            player,
            options,
            state: BackendState::Unattached,
        })
    }

    fn player(&self) -> Result<&dyn VimeoPlayer> {
        self.state.ensure_ready()?;
        Ok(self.player.as_ref())
    }
}

#[async_trait]
impl PlaybackControl for VimeoBackend {
    fn state(&self) -> BackendState {
        self.state
    }

    async fn attach(&mut self) -> Result<()> {
        if self.state == BackendState::Ready {
            return Ok(());
        }
        self.state.ensure_attachable()?;
        self.state = BackendState::Attaching;

        self.player.ready().await.map_err(PlayerError::vendor)?;
        for kind in BOUND_EVENTS {
            let options = Arc::clone(&self.options);
            self.player
                .on(kind, Arc::new(move |event: &VimeoEvent| forward(&options, event)));
        }

        debug!(target: "remu_embed::player", "vimeo player ready");
        self.state = BackendState::Ready;
        Ok(())
    }

    async fn detach(&mut self) -> Result<()> {
        for kind in BOUND_EVENTS {
            self.player.off(kind);
        }
        self.state = BackendState::Detached;
        Ok(())
    }

    async fn load_video(&self, id: &str) -> Result<()> {
        self.player()?
            .load_video(id)
            .await
            .map_err(PlayerError::vendor)
    }

    async fn play(&self) -> Result<()> {
        self.player()?.play().await.map_err(PlayerError::vendor)
    }

    async fn pause(&self) -> Result<()> {
        self.player()?.pause().await.map_err(PlayerError::vendor)
    }

    async fn set_current_time(&self, seconds: f64) -> Result<()> {
        self.player()?
            .set_current_time(seconds)
            .await
            .map_err(PlayerError::vendor)
    }

    /// Vimeo 本身就是 0–1，不需要换算
    async fn set_volume(&self, volume: f64) -> Result<()> {
        self.player()?
            .set_volume(clamp_volume(volume))
            .await
            .map_err(PlayerError::vendor)
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        self.player()?
            .set_muted(muted)
            .await
            .map_err(PlayerError::vendor)
    }

    async fn get_duration(&self) -> Result<Option<f64>> {
        let duration = self
            .player()?
            .get_duration()
            .await
            .map_err(PlayerError::vendor)?;
        Ok(finite(duration))
    }

    async fn get_current_time(&self) -> Result<Option<f64>> {
        let current_time = self
            .player()?
            .get_current_time()
            .await
            .map_err(PlayerError::vendor)?;
        Ok(finite(current_time))
    }
}
