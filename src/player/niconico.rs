use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use super::{clamp_volume, BackendState, PlaybackControl};
use crate::config::NiconicoConfig;
use crate::dom::{IFrameElement, ListenerId, MessageWindow, WindowMessage};
use crate::error::{PlayerError, Result};
use crate::events::{PlayerOptions, TimeEvent};

/// 嵌入播放器上报的播放状态码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerStatus {
    Play = 2,
    Pause = 3,
    End = 4,
}

impl PlayerStatus {
    fn from_code(code: i64) -> Option<Self> {
        match code {
            2 => Some(PlayerStatus::Play),
            3 => Some(PlayerStatus::Pause),
            4 => Some(PlayerStatus::End),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusData {
    player_status: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataData {
    current_time: Option<f64>,
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoInfo {
    length_in_seconds: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadCompleteData {
    video_info: VideoInfo,
}

/// 从消息里取出 `data` 字段
fn payload<T: DeserializeOwned>(message: &Value) -> Option<T> {
    T::deserialize(message.get("data")?).ok()
}

/// 嵌入播放器通过 postMessage 推送的状态，单位秒
#[derive(Debug, Default)]
struct Playback {
    duration: Option<f64>,
    current_time: Option<f64>,
    last_status: Option<PlayerStatus>,
}

impl Playback {
    fn reset(&mut self) {
        *self = Playback::default();
    }
}

struct MessageHandler {
    origin: String,
    options: Arc<PlayerOptions>,
    playback: Arc<Mutex<Playback>>,
}

impl MessageHandler {
    fn handle(&self, message: &WindowMessage) {
        if message.origin != self.origin {
            return;
        }
        let data = &message.data;
        let event_name = data.get("eventName").and_then(Value::as_str).unwrap_or("");

        match event_name {
            // 同一次切换两个事件都会到达，只派发一次
            "playerStatusChange" | "statusChange" => {
                let Some(StatusData { player_status }) = payload(data) else {
                    return;
                };
                debug!(target: "remu_embed::player", "{event_name}: {player_status}");
                // 未映射的状态（如加载中）也会覆盖上一次状态
                let status = PlayerStatus::from_code(player_status);
                let previous = std::mem::replace(&mut self.playback.lock().last_status, status);
                let Some(status) = status else {
                    return;
                };
                if previous == Some(status) {
                    return;
                }
                match status {
                    PlayerStatus::Play => self.options.emit_play(),
                    PlayerStatus::Pause => self.options.emit_pause(),
                    PlayerStatus::End => self.options.emit_ended(),
                }
            }
            "playerMetadataChange" => {
                let Some(metadata) = payload::<MetadataData>(data) else {
                    return;
                };
                let event = {
                    let mut playback = self.playback.lock();
                    if let Some(duration) = metadata.duration {
                        playback.duration = Some(duration / 1000.0);
                    }
                    playback.current_time = metadata.current_time.map(|t| t / 1000.0);
                    TimeEvent::new(playback.current_time, playback.duration)
                };
                self.options.emit_time_update(&event);
            }
            "loadComplete" => {
                debug!(target: "remu_embed::player", "load completed");
                if let Some(complete) = payload::<LoadCompleteData>(data) {
                    self.playback.lock().duration = Some(complete.video_info.length_in_seconds);
                }
            }
            "error" => self.options.emit_error(data),
            name if name.starts_with("player-error:video:") => self.options.emit_error(data),
            _ => {
                debug!(target: "remu_embed::player", "message {event_name}: {:?}", data.get("data"));
            }
        }
    }
}

/// Niconico 嵌入播放器后端
///
/// 没有 SDK，控制命令通过 iframe 的 postMessage 发送，
/// 事件从顶层窗口的 message 事件接收。
pub struct NiconicoBackend {
    iframe: Arc<dyn IFrameElement>,
    window: Arc<dyn MessageWindow>,
    options: Arc<PlayerOptions>,
    config: NiconicoConfig,
    playback: Arc<Mutex<Playback>>,
    listener: Option<ListenerId>,
    state: BackendState,
}

impl NiconicoBackend {
    pub fn new(
        iframe: Arc<dyn IFrameElement>,
        window: Arc<dyn MessageWindow>,
        options: Arc<PlayerOptions>,
        config: NiconicoConfig,
    ) -> Self {
        Self {
            iframe,
            window,
            options,
            config,
            playback: Arc::new(Mutex::new(Playback::default())),
            listener: None,
            state: BackendState::Unattached,
        }
    }

    /// playerId 必须是字符串
    fn post_message(&self, event_name: &str, data: Option<Value>) -> Result<()> {
        self.state.ensure_ready()?;
        let mut message = json!({
            "eventName": event_name,
            "playerId": self.config.player_id,
            "sourceConnectorType": self.config.source_connector_type,
        });
        if let Some(data) = data {
            message["data"] = data;
        }
        self.iframe.post_message(message, &self.config.origin);
        Ok(())
    }
}

#[async_trait]
impl PlaybackControl for NiconicoBackend {
    fn state(&self) -> BackendState {
        self.state
    }

    async fn attach(&mut self) -> Result<()> {
        if self.state == BackendState::Ready {
            return Ok(());
        }
        self.state.ensure_attachable()?;

        let handler = MessageHandler {
            origin: self.config.origin.clone(),
            options: Arc::clone(&self.options),
            playback: Arc::clone(&self.playback),
        };
        self.listener = Some(
            self.window
                .add_message_listener(Arc::new(move |message| handler.handle(message))),
        );
        self.state = BackendState::Ready;
        Ok(())
    }

    async fn detach(&mut self) -> Result<()> {
        if let Some(id) = self.listener.take() {
            self.window.remove_message_listener(id);
        }
        self.iframe.set_onload(None);
        self.state = BackendState::Detached;
        Ok(())
    }

    /// 换 src 并等 iframe 的 load 事件
    async fn load_video(&self, id: &str) -> Result<()> {
        self.state.ensure_ready()?;
        self.playback.lock().reset();

        let (tx, rx) = oneshot::channel();
        self.iframe.set_onload(Some(Box::new(move || {
            let _ = tx.send(());
        })));
        self.iframe.set_src(&self.config.watch_url(id));
        rx.await.map_err(|_| PlayerError::CallbackDropped("load"))
    }

    async fn play(&self) -> Result<()> {
        self.post_message("play", None)
    }

    async fn pause(&self) -> Result<()> {
        self.post_message("pause", None)
    }

    async fn set_current_time(&self, seconds: f64) -> Result<()> {
        self.post_message("seek", Some(json!({ "time": seconds * 1000.0 })))
    }

    async fn set_volume(&self, volume: f64) -> Result<()> {
        self.post_message(
            "volumeChange",
            Some(json!({ "volume": clamp_volume(volume) })),
        )
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        self.post_message("mute", Some(json!({ "mute": muted })))
    }

    async fn get_duration(&self) -> Result<Option<f64>> {
        self.state.ensure_ready()?;
        Ok(self.playback.lock().duration)
    }

    async fn get_current_time(&self) -> Result<Option<f64>> {
        self.state.ensure_ready()?;
        Ok(self.playback.lock().current_time)
    }
}
