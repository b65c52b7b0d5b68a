use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// 嵌入播放器配置
///
/// 所有字段都有默认值，配置文件里只需写要覆盖的部分。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    pub youtube: YouTubeConfig,
    pub niconico: NiconicoConfig,
    pub soundcloud: SoundCloudConfig,
    pub vimeo: VimeoConfig,
    /// attach 整体超时，`None` 表示一直等待厂商就绪
    #[serde(with = "opt_millis")]
    pub attach_timeout: Option<Duration>,
    /// 拉取脚本的 HTTP 超时
    #[serde(with = "millis")]
    pub fetch_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    pub script_url: String,
    /// iframe API 就绪时调用的全局钩子名
    pub ready_hook: String,
    pub host: String,
    /// 进度轮询间隔，不能为零
    #[serde(deserialize_with = "millis::non_zero")]
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NiconicoConfig {
    pub origin: String,
    /// 必须是字符串
    pub player_id: String,
    pub source_connector_type: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SoundCloudConfig {
    pub script_url: String,
    pub track_url_base: String,
    pub auto_play: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VimeoConfig {
    pub script_url: String,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            youtube: YouTubeConfig::default(),
            niconico: NiconicoConfig::default(),
            soundcloud: SoundCloudConfig::default(),
            vimeo: VimeoConfig::default(),
            attach_timeout: None,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            script_url: "https://www.youtube.com/iframe_api".into(),
            ready_hook: "onYouTubeIframeAPIReady".into(),
            host: "https://www.youtube-nocookie.com".into(),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl Default for NiconicoConfig {
    fn default() -> Self {
        Self {
            origin: "https://embed.nicovideo.jp".into(),
            player_id: "1".into(),
            source_connector_type: 1,
        }
    }
}

impl Default for SoundCloudConfig {
    fn default() -> Self {
        Self {
            script_url: "https://w.soundcloud.com/player/api.js".into(),
            track_url_base: "https://api.soundcloud.com/tracks/".into(),
            auto_play: true,
        }
    }
}

impl Default for VimeoConfig {
    fn default() -> Self {
        Self {
            script_url: "https://player.vimeo.com/api/player.js".into(),
        }
    }
}

impl NiconicoConfig {
    /// 嵌入播放页地址
    pub fn watch_url(&self, id: &str) -> String {
        format!(
            "{}/watch/{}?jsapi=1&playerId={}",
            self.origin, id, self.player_id
        )
    }
}

impl EmbedConfig {
    /// 从 JSON 文件读取配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open config {}", path.display()))?;
        let config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }
}

mod millis {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }

    pub fn non_zero<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match u64::deserialize(deserializer)? {
            0 => Err(D::Error::custom("interval must be greater than 0 ms")),
            ms => Ok(Duration::from_millis(ms)),
        }
    }
}

mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}
