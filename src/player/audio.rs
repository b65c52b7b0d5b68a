use std::sync::{Arc, Weak};

use async_trait::async_trait;
use log::debug;
use serde_json::json;

use super::{clamp_volume, BackendState, PlaybackControl};
use crate::dom::{ListenerId, MediaElement, MediaEvent};
use crate::error::Result;
use crate::events::{LoadedEvent, PlayerOptions, TimeEvent};

/// 原生 `<audio>` 元素后端
///
/// 元素本身已经存在，attach 只需注册监听，立即就绪。
pub struct AudioBackend {
    element: Arc<dyn MediaElement>,
    options: Arc<PlayerOptions>,
    listener: Option<ListenerId>,
    state: BackendState,
}

impl AudioBackend {
    pub fn new(element: Arc<dyn MediaElement>, options: Arc<PlayerOptions>) -> Self {
        Self {
            element,
            options,
            listener: None,
            state: BackendState::Unattached,
        }
    }

    fn handle_event(element: &Weak<dyn MediaElement>, options: &PlayerOptions, event: &MediaEvent) {
        let Some(element) = element.upgrade() else {
            return;
        };
        match event {
            MediaEvent::Error(error) => {
                options.emit_error(&json!({ "code": error.code, "message": error.message }))
            }
            MediaEvent::LoadedData => options.emit_loaded(&LoadedEvent { id: element.src() }),
            MediaEvent::Play => options.emit_play(),
            MediaEvent::Pause => options.emit_pause(),
            MediaEvent::Ended => options.emit_ended(),
            MediaEvent::TimeUpdate => options.emit_time_update(&TimeEvent::new(
                Some(element.current_time()),
                element.duration(),
            )),
        }
    }
}

#[async_trait]
impl PlaybackControl for AudioBackend {
    fn state(&self) -> BackendState {
        self.state
    }

    async fn attach(&mut self) -> Result<()> {
        if self.state == BackendState::Ready {
            return Ok(());
        }
        self.state.ensure_attachable()?;
        self.state = BackendState::Attaching;

        let element = Arc::downgrade(&self.element);
        let options = Arc::clone(&self.options);
        self.listener = Some(self.element.add_listener(Arc::new(move |event: &MediaEvent| {
            Self::handle_event(&element, &options, event)
        })));

        debug!(target: "remu_embed::player", "audio element attached");
        self.state = BackendState::Ready;
        Ok(())
    }

    async fn detach(&mut self) -> Result<()> {
        if let Some(id) = self.listener.take() {
            self.element.remove_listener(id);
        }
        self.state = BackendState::Detached;
        Ok(())
    }

    async fn load_video(&self, id: &str) -> Result<()> {
        self.state.ensure_ready()?;
        self.element.set_src(id);
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.state.ensure_ready()?;
        self.element.play();
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.state.ensure_ready()?;
        self.element.pause();
        Ok(())
    }

    async fn set_current_time(&self, seconds: f64) -> Result<()> {
        self.state.ensure_ready()?;
        self.element.set_current_time(seconds);
        Ok(())
    }

    async fn set_volume(&self, volume: f64) -> Result<()> {
        self.state.ensure_ready()?;
        self.element.set_volume(clamp_volume(volume));
        Ok(())
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        self.state.ensure_ready()?;
        self.element.set_muted(muted);
        Ok(())
    }

    async fn get_duration(&self) -> Result<Option<f64>> {
        self.state.ensure_ready()?;
        Ok(self.element.duration().filter(|d| d.is_finite()))
    }

    async fn get_current_time(&self) -> Result<Option<f64>> {
        self.state.ensure_ready()?;
        Ok(Some(self.element.current_time()).filter(|t| t.is_finite()))
    }
}
