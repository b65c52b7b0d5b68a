use thiserror::Error;

use crate::player::PlayerType;

/// 脚本加载失败（注入或执行失败）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load script {url}: {message}")]
pub struct ScriptLoadError {
    pub url: String,
    pub message: String,
}

/// 宿主元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// `<audio>` 之类的媒体元素
    Media,
    /// `<iframe>`
    IFrame,
    /// 普通容器 `<div>`
    Container,
}

/// 播放器错误
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error(transparent)]
    ScriptLoad(#[from] ScriptLoadError),

    /// 未 attach 时调用了控制操作
    #[error("player is not attached")]
    NotAttached,

    #[error("player element is not mounted")]
    ElementMissing,

    #[error("expected a {expected:?} element, got {found:?}")]
    ElementKind {
        expected: ElementKind,
        found: ElementKind,
    },

    #[error("no runtime registered for {0} players")]
    SdkUnavailable(PlayerType),

    /// 厂商 API 调用失败
    #[error("vendor call failed: {0}")]
    Vendor(String),

    /// 回调式 API 在未调用回调的情况下丢弃了回调
    #[error("vendor dropped the {0} callback")]
    CallbackDropped(&'static str),

    #[error("{0} timed out")]
    Timeout(&'static str),
}

impl PlayerError {
    pub(crate) fn vendor(err: anyhow::Error) -> Self {
        PlayerError::Vendor(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
