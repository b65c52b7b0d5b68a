//! 各厂商嵌入 SDK 的调用面。
//!
//! 这里只描述适配层需要的那部分接口：YouTube IFrame API、
//! SoundCloud Widget API、Vimeo Player.js。具体实现由宿主提供。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::dom::{ContainerHandle, Handler, IFrameElement, ListenerId};

// YouTube

/// `YT.Player` 构造参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YouTubePlayerConfig {
    pub host: String,
    pub width: String,
    pub height: String,
}

/// `YT.PlayerState`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YouTubePlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl YouTubePlayerState {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(YouTubePlayerState::Unstarted),
            0 => Some(YouTubePlayerState::Ended),
            1 => Some(YouTubePlayerState::Playing),
            2 => Some(YouTubePlayerState::Paused),
            3 => Some(YouTubePlayerState::Buffering),
            5 => Some(YouTubePlayerState::Cued),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            YouTubePlayerState::Unstarted => -1,
            YouTubePlayerState::Ended => 0,
            YouTubePlayerState::Playing => 1,
            YouTubePlayerState::Paused => 2,
            YouTubePlayerState::Buffering => 3,
            YouTubePlayerState::Cued => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum YouTubeEvent {
    /// onReady
    Ready,
    /// onStateChange，携带原始状态码
    StateChange(i32),
    /// onError，携带原始错误数据
    Error(Value),
}

pub trait YouTubePlayer: Send + Sync {
    fn add_event_listener(&self, handler: Handler<YouTubeEvent>) -> ListenerId;
    fn remove_event_listener(&self, id: ListenerId);
    fn load_video_by_id(&self, id: &str);
    fn play_video(&self);
    fn pause_video(&self);
    fn seek_to(&self, seconds: f64);
    /// 音量范围 0–100
    fn set_volume(&self, volume: f64);
    fn mute(&self);
    fn un_mute(&self);
    fn get_duration(&self) -> f64;
    fn get_current_time(&self) -> f64;
}

pub trait YouTubeSdk: Send + Sync {
    /// 在容器中创建 `YT.Player`，需在 iframe API 就绪之后调用
    fn create_player(
        &self,
        container: &ContainerHandle,
        config: &YouTubePlayerConfig,
    ) -> anyhow::Result<Arc<dyn YouTubePlayer>>;
}

// SoundCloud

/// `SC.Widget.Events`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCloudEventKind {
    Ready,
    Error,
    Play,
    Pause,
    Finish,
    PlayProgress,
}

/// 组件事件数据，位置单位为毫秒
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WidgetEvent {
    pub current_position: Option<f64>,
    pub relative_position: Option<f64>,
    pub data: Value,
}

/// `widget.load` 选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SoundCloudLoadOptions {
    pub auto_play: bool,
}

pub type WidgetCallback<T> = Box<dyn FnOnce(T) + Send + 'static>;

pub trait SoundCloudWidget: Send + Sync {
    fn bind(&self, kind: SoundCloudEventKind, handler: Handler<WidgetEvent>);
    fn unbind(&self, kind: SoundCloudEventKind);
    fn load(&self, url: &str, options: SoundCloudLoadOptions, callback: WidgetCallback<()>);
    fn play(&self);
    fn pause(&self);
    /// 单位毫秒
    fn seek_to(&self, milliseconds: f64);
    /// 音量范围 0–100
    fn set_volume(&self, volume: f64);
    /// 回调参数单位毫秒
    fn get_duration(&self, callback: WidgetCallback<f64>);
    fn get_position(&self, callback: WidgetCallback<f64>);
}

pub trait SoundCloudSdk: Send + Sync {
    /// `SC.Widget(iframe)`
    fn widget(&self, iframe: Arc<dyn IFrameElement>) -> anyhow::Result<Arc<dyn SoundCloudWidget>>;
}

// Vimeo

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VimeoEventKind {
    Error,
    Play,
    Pause,
    Ended,
    TimeUpdate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VimeoEvent {
    Error(Value),
    Play,
    Pause,
    Ended,
    TimeUpdate {
        duration: f64,
        percent: f64,
        seconds: f64,
    },
}

#[async_trait]
pub trait VimeoPlayer: Send + Sync {
    async fn ready(&self) -> anyhow::Result<()>;
    fn on(&self, kind: VimeoEventKind, handler: Handler<VimeoEvent>);
    fn off(&self, kind: VimeoEventKind);
    async fn load_video(&self, id: &str) -> anyhow::Result<()>;
    async fn play(&self) -> anyhow::Result<()>;
    async fn pause(&self) -> anyhow::Result<()>;
    async fn set_current_time(&self, seconds: f64) -> anyhow::Result<()>;
    /// 音量范围 0–1
    async fn set_volume(&self, volume: f64) -> anyhow::Result<()>;
    async fn set_muted(&self, muted: bool) -> anyhow::Result<()>;
    async fn get_duration(&self) -> anyhow::Result<f64>;
    async fn get_current_time(&self) -> anyhow::Result<f64>;
}

pub trait VimeoSdk: Send + Sync {
    /// `new Vimeo.Player(iframe)`
    fn player(&self, iframe: Arc<dyn IFrameElement>) -> anyhow::Result<Arc<dyn VimeoPlayer>>;
}
