//! 播放控制契约与各厂商后端。

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EmbedConfig;
use crate::dom::HostElement;
use crate::env::Environment;
use crate::error::{PlayerError, Result};
use crate::events::PlayerOptions;

mod audio;
mod facade;
mod niconico;
mod soundcloud;
mod time;
mod vimeo;
mod youtube;

pub use audio::AudioBackend;
pub use facade::Player;
pub use niconico::NiconicoBackend;
pub use soundcloud::SoundCloudBackend;
pub use time::TimeUpdatePoller;
pub use vimeo::VimeoBackend;
pub use youtube::YouTubeBackend;

/// 后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerType {
    Audio,
    Niconico,
    SoundCloud,
    Vimeo,
    YouTube,
}

impl PlayerType {
    pub const ALL: [PlayerType; 5] = [
        PlayerType::Audio,
        PlayerType::Niconico,
        PlayerType::SoundCloud,
        PlayerType::Vimeo,
        PlayerType::YouTube,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PlayerType::Audio => "Audio",
            PlayerType::Niconico => "Niconico",
            PlayerType::SoundCloud => "SoundCloud",
            PlayerType::Vimeo => "Vimeo",
            PlayerType::YouTube => "YouTube",
        }
    }

    /// 该类型需要预先加载的厂商脚本
    pub fn script(self, config: &EmbedConfig) -> Option<ScriptRequirement> {
        match self {
            PlayerType::Audio | PlayerType::Niconico => None,
            PlayerType::YouTube => Some(ScriptRequirement {
                url: config.youtube.script_url.clone(),
                ready_hook: Some(config.youtube.ready_hook.clone()),
            }),
            PlayerType::SoundCloud => Some(ScriptRequirement {
                url: config.soundcloud.script_url.clone(),
                ready_hook: None,
            }),
            PlayerType::Vimeo => Some(ScriptRequirement {
                url: config.vimeo.script_url.clone(),
                ready_hook: None,
            }),
        }
    }
}

impl fmt::Display for PlayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PlayerType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown player type: {s}"))
    }
}

/// 后端生命周期，`Detached` 为终态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Unattached,
    Attaching,
    Ready,
    Detached,
}

impl BackendState {
    /// 控制操作只在 `Ready` 状态下可用
    pub(crate) fn ensure_ready(self) -> Result<()> {
        match self {
            BackendState::Ready => Ok(()),
            _ => Err(PlayerError::NotAttached),
        }
    }

    /// 已分离的实例不能再次 attach，需要新建后端
    pub(crate) fn ensure_attachable(self) -> Result<()> {
        match self {
            BackendState::Detached => Err(PlayerError::NotAttached),
            _ => Ok(()),
        }
    }
}

/// 厂商脚本依赖：先等 script 加载，再（可选）等全局就绪钩子
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRequirement {
    pub url: String,
    pub ready_hook: Option<String>,
}

/// 所有后端共同实现的播放控制契约
///
/// 音量统一为 0–1，时间统一为秒；`get_duration`/`get_current_time`
/// 在值尚未可知时返回 `Ok(None)`。
#[async_trait]
pub trait PlaybackControl: Send + Sync {
    fn state(&self) -> BackendState;
    /// 等待厂商就绪并注册事件监听
    async fn attach(&mut self) -> Result<()>;
    /// 移除监听并释放原生对象，之后实例不可再用
    async fn detach(&mut self) -> Result<()>;
    async fn load_video(&self, id: &str) -> Result<()>;
    async fn play(&self) -> Result<()>;
    async fn pause(&self) -> Result<()>;
    async fn set_current_time(&self, seconds: f64) -> Result<()>;
    async fn set_volume(&self, volume: f64) -> Result<()>;
    async fn set_muted(&self, muted: bool) -> Result<()>;
    async fn get_duration(&self) -> Result<Option<f64>>;
    async fn get_current_time(&self) -> Result<Option<f64>>;
}

/// 按类型构造后端，原生对象在这里与宿主元素绑定
pub(crate) fn create_backend(
    kind: PlayerType,
    element: HostElement,
    options: Arc<PlayerOptions>,
    env: &Arc<Environment>,
) -> Result<Box<dyn PlaybackControl>> {
    let backend: Box<dyn PlaybackControl> = match kind {
        PlayerType::Audio => Box::new(AudioBackend::new(element.into_media()?, options)),
        PlayerType::YouTube => {
            let sdk = env
                .youtube
                .clone()
                .ok_or(PlayerError::SdkUnavailable(kind))?;
            Box::new(YouTubeBackend::new(
                sdk.as_ref(),
                element.into_container()?,
                options,
                &env.config.youtube,
            )?)
        }
        PlayerType::Niconico => {
            let window = env
                .window
                .clone()
                .ok_or(PlayerError::SdkUnavailable(kind))?;
            Box::new(NiconicoBackend::new(
                element.into_iframe()?,
                window,
                options,
                env.config.niconico.clone(),
            ))
        }
        PlayerType::SoundCloud => {
            let sdk = env
                .soundcloud
                .clone()
                .ok_or(PlayerError::SdkUnavailable(kind))?;
            Box::new(SoundCloudBackend::new(
                sdk.as_ref(),
                element.into_iframe()?,
                options,
                env.config.soundcloud.clone(),
            )?)
        }
        PlayerType::Vimeo => {
            let sdk = env.vimeo.clone().ok_or(PlayerError::SdkUnavailable(kind))?;
            Box::new(VimeoBackend::new(sdk.as_ref(), element.into_iframe()?, options)?)
        }
    };
    Ok(backend)
}

/// 把 0–1 的音量换算成厂商的 0–100
pub(crate) fn volume_percent(volume: f64) -> f64 {
    clamp_volume(volume) * 100.0
}

pub(crate) fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}
