//! 当前播放器的持有者。
//!
//! 界面层在切换媒体类型时会替换播放器，控制按钮则始终作用于
//! 当前挂载的那一个；没有挂载时控制操作直接忽略。

use log::debug;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::player::Player;

#[derive(Default)]
struct Mounted {
    player: Option<Player>,
    video_id: Option<String>,
}

#[derive(Default)]
pub struct PlayerSlot {
    inner: Mutex<Mounted>,
}

impl PlayerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 挂载新的播放器并加载 `video_id`，旧播放器会先被分离
    ///
    /// attach 失败时不保留新播放器。
    pub async fn mount(&self, mut player: Player, video_id: &str) -> Result<()> {
        let mut mounted = self.inner.lock().await;
        if let Some(mut previous) = mounted.player.take() {
            debug!(target: "remu_embed::slot", "replacing {previous}");
            previous.detach().await?;
        }
        mounted.video_id = None;

        player.attach(Some(video_id)).await?;
        mounted.player = Some(player);
        mounted.video_id = Some(video_id.to_string());
        Ok(())
    }

    /// 分离并取出当前播放器
    pub async fn unmount(&self) -> Result<Option<Player>> {
        let mut mounted = self.inner.lock().await;
        mounted.video_id = None;
        match mounted.player.take() {
            Some(mut player) => {
                player.detach().await?;
                Ok(Some(player))
            }
            None => Ok(None),
        }
    }

    pub async fn is_mounted(&self) -> bool {
        self.inner.lock().await.player.is_some()
    }

    pub async fn video_id(&self) -> Option<String> {
        self.inner.lock().await.video_id.clone()
    }

    /// 只有 id 变化时才重新加载
    pub async fn set_video_id(&self, id: &str) -> Result<()> {
        let mut mounted = self.inner.lock().await;
        if mounted.video_id.as_deref() == Some(id) {
            return Ok(());
        }
        if let Some(player) = &mounted.player {
            player.load_video(id).await?;
        }
        mounted.video_id = Some(id.to_string());
        Ok(())
    }

    pub async fn play(&self) -> Result<()> {
        match &self.inner.lock().await.player {
            Some(player) => player.play().await,
            None => Ok(()),
        }
    }

    pub async fn pause(&self) -> Result<()> {
        match &self.inner.lock().await.player {
            Some(player) => player.pause().await,
            None => Ok(()),
        }
    }

    pub async fn set_current_time(&self, seconds: f64) -> Result<()> {
        match &self.inner.lock().await.player {
            Some(player) => player.set_current_time(seconds).await,
            None => Ok(()),
        }
    }

    /// 跳转后继续播放
    pub async fn seek_and_play(&self, seconds: f64) -> Result<()> {
        let mounted = self.inner.lock().await;
        if let Some(player) = &mounted.player {
            player.set_current_time(seconds).await?;
            player.play().await?;
        }
        Ok(())
    }

    pub async fn set_volume(&self, volume: f64) -> Result<()> {
        match &self.inner.lock().await.player {
            Some(player) => player.set_volume(volume).await,
            None => Ok(()),
        }
    }

    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        match &self.inner.lock().await.player {
            Some(player) => player.set_muted(muted).await,
            None => Ok(()),
        }
    }

    pub async fn get_duration(&self) -> Result<Option<f64>> {
        match &self.inner.lock().await.player {
            Some(player) => player.get_duration().await,
            None => Ok(None),
        }
    }

    pub async fn get_current_time(&self) -> Result<Option<f64>> {
        match &self.inner.lock().await.player {
            Some(player) => player.get_current_time().await,
            None => Ok(None),
        }
    }
}
