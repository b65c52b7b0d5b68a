use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, error};
use tokio::time::Instant;

use super::{create_backend, PlaybackControl, PlayerType};
use crate::dom::ElementRef;
use crate::env::Environment;
use crate::error::{PlayerError, Result};
use crate::events::PlayerOptions;

static NEXT_PLAYER_ID: AtomicUsize = AtomicUsize::new(1);

/// 对外的统一播放器
///
/// 负责脚本加载与就绪等待、按类型选择后端，以及在未 attach 时拒绝控制操作。
/// 同一个实例可以反复 attach/detach，每次 attach 都会创建新的后端。
pub struct Player {
    id: usize,
    kind: PlayerType,
    element: ElementRef,
    options: Arc<PlayerOptions>,
    env: Arc<Environment>,
    backend: Option<Box<dyn PlaybackControl>>,
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Player#{}", self.kind, self.id)
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl Player {
    pub fn new(
        kind: PlayerType,
        element: ElementRef,
        options: PlayerOptions,
        env: Arc<Environment>,
    ) -> Self {
        let player = Self {
            id: NEXT_PLAYER_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            element,
            options: Arc::new(options),
            env,
            backend: None,
        };
        debug!(target: "remu_embed::player", "{player}: ctor");
        player
    }

    pub fn kind(&self) -> PlayerType {
        self.kind
    }

    pub fn is_attached(&self) -> bool {
        self.backend.is_some()
    }

    /// 加载厂商脚本、等待就绪并绑定事件，给出 `initial_id` 时随后加载该媒体
    ///
    /// 已经 attach 时直接返回。失败后保持未 attach 状态，可以重试。
    pub async fn attach(&mut self, initial_id: Option<&str>) -> Result<()> {
        if self.backend.is_some() {
            debug!(target: "remu_embed::player", "{self}: player is already attached");
            return Ok(());
        }
        debug!(target: "remu_embed::player", "{self}: attaching player...");

        let deadline = self.env.config.attach_timeout.map(|limit| Instant::now() + limit);
        let backend = self.attach_backend(initial_id, deadline).await;
        match backend {
            Ok(backend) => {
                self.backend = Some(backend);
                debug!(target: "remu_embed::player", "{self}: player attached");
                Ok(())
            }
            Err(e) => {
                error!(target: "remu_embed::player", "{self}: failed to attach player: {e}");
                Err(e)
            }
        }
    }

    async fn attach_backend(
        &self,
        initial_id: Option<&str>,
        deadline: Option<Instant>,
    ) -> Result<Box<dyn PlaybackControl>> {
        within(deadline, self.prepare()).await?;

        let element = self.element.get()?;
        let mut backend = create_backend(self.kind, element, Arc::clone(&self.options), &self.env)?;

        // 超时也要走 detach，后端构造时就已经注册了监听
        if let Err(e) = within(deadline, start(backend.as_mut(), initial_id)).await {
            let _ = backend.detach().await;
            return Err(e);
        }
        Ok(backend)
    }

    /// 加载厂商脚本并等待全局就绪钩子
    async fn prepare(&self) -> Result<()> {
        if let Some(script) = self.kind.script(&self.env.config) {
            self.env.scripts.ensure_loaded(&script.url).await?;
            if let Some(hook) = &script.ready_hook {
                self.env.hooks.wait(hook).await;
            }
        }
        Ok(())
    }

    pub async fn detach(&mut self) -> Result<()> {
        let Some(mut backend) = self.backend.take() else {
            error!(target: "remu_embed::player", "{self}: player is not attached");
            return Err(PlayerError::NotAttached);
        };
        debug!(target: "remu_embed::player", "{self}: detaching player...");
        backend.detach().await?;
        debug!(target: "remu_embed::player", "{self}: player detached");
        Ok(())
    }

    fn backend(&self) -> Result<&dyn PlaybackControl> {
        match &self.backend {
            Some(backend) => Ok(backend.as_ref()),
            None => {
                error!(target: "remu_embed::player", "{self}: player is not attached");
                Err(PlayerError::NotAttached)
            }
        }
    }

    pub async fn load_video(&self, id: &str) -> Result<()> {
        debug!(target: "remu_embed::player", "{self}: load video {id}");
        self.backend()?.load_video(id).await
    }

    pub async fn play(&self) -> Result<()> {
        debug!(target: "remu_embed::player", "{self}: play");
        self.backend()?.play().await
    }

    pub async fn pause(&self) -> Result<()> {
        debug!(target: "remu_embed::player", "{self}: pause");
        self.backend()?.pause().await
    }

    pub async fn set_current_time(&self, seconds: f64) -> Result<()> {
        debug!(target: "remu_embed::player", "{self}: set current time {seconds}");
        self.backend()?.set_current_time(seconds).await
    }

    /// 音量范围 0–1
    pub async fn set_volume(&self, volume: f64) -> Result<()> {
        debug!(target: "remu_embed::player", "{self}: set volume {volume}");
        self.backend()?.set_volume(volume).await
    }

    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        debug!(target: "remu_embed::player", "{self}: set muted {muted}");
        self.backend()?.set_muted(muted).await
    }

    /// 时长未知时为 `None`
    pub async fn get_duration(&self) -> Result<Option<f64>> {
        self.backend()?.get_duration().await
    }

    pub async fn get_current_time(&self) -> Result<Option<f64>> {
        self.backend()?.get_current_time().await
    }
}

async fn start(backend: &mut dyn PlaybackControl, initial_id: Option<&str>) -> Result<()> {
    backend.attach().await?;
    if let Some(id) = initial_id {
        backend.load_video(id).await?;
    }
    Ok(())
}

/// 在 attach 截止时间前完成 `fut`
async fn within<T>(deadline: Option<Instant>, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| PlayerError::Timeout("attach"))?,
        None => fut.await,
    }
}
