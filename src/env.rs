use std::sync::{Arc, OnceLock};

use crate::config::EmbedConfig;
use crate::dom::MessageWindow;
use crate::loader::{ReadyHooks, ScriptHost, ScriptLoader};
use crate::vendor::{SoundCloudSdk, VimeoSdk, YouTubeSdk};

/// 进程级服务对象
///
/// 持有脚本加载缓存、全局就绪钩子、窗口消息通道以及各厂商运行时，
/// 由调用方构造一次后注入到每个播放器。
pub struct Environment {
    pub(crate) config: EmbedConfig,
    pub(crate) scripts: ScriptLoader,
    pub(crate) hooks: Arc<ReadyHooks>,
    pub(crate) window: Option<Arc<dyn MessageWindow>>,
    pub(crate) youtube: Option<Arc<dyn YouTubeSdk>>,
    pub(crate) soundcloud: Option<Arc<dyn SoundCloudSdk>>,
    pub(crate) vimeo: Option<Arc<dyn VimeoSdk>>,
}

static GLOBAL: OnceLock<Arc<Environment>> = OnceLock::new();

impl Environment {
    pub fn builder(host: Arc<dyn ScriptHost>) -> EnvironmentBuilder {
        EnvironmentBuilder {
            host,
            config: EmbedConfig::default(),
            hooks: None,
            window: None,
            youtube: None,
            soundcloud: None,
            vimeo: None,
        }
    }

    /// 注册进程级实例并返回生效的实例，只有第一次注册生效
    pub fn init(env: Arc<Environment>) -> Arc<Environment> {
        Arc::clone(GLOBAL.get_or_init(|| env))
    }

    pub fn global() -> Option<&'static Arc<Environment>> {
        GLOBAL.get()
    }

    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    pub fn scripts(&self) -> &ScriptLoader {
        &self.scripts
    }

    /// 厂商运行时通过它触发全局就绪钩子
    pub fn hooks(&self) -> &Arc<ReadyHooks> {
        &self.hooks
    }
}

pub struct EnvironmentBuilder {
    host: Arc<dyn ScriptHost>,
    config: EmbedConfig,
    hooks: Option<Arc<ReadyHooks>>,
    window: Option<Arc<dyn MessageWindow>>,
    youtube: Option<Arc<dyn YouTubeSdk>>,
    soundcloud: Option<Arc<dyn SoundCloudSdk>>,
    vimeo: Option<Arc<dyn VimeoSdk>>,
}

impl EnvironmentBuilder {
    pub fn config(mut self, config: EmbedConfig) -> Self {
        self.config = config;
        self
    }

    pub fn hooks(mut self, hooks: Arc<ReadyHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn window(mut self, window: Arc<dyn MessageWindow>) -> Self {
        self.window = Some(window);
        self
    }

    pub fn youtube(mut self, sdk: Arc<dyn YouTubeSdk>) -> Self {
        self.youtube = Some(sdk);
        self
    }

    pub fn soundcloud(mut self, sdk: Arc<dyn SoundCloudSdk>) -> Self {
        self.soundcloud = Some(sdk);
        self
    }

    pub fn vimeo(mut self, sdk: Arc<dyn VimeoSdk>) -> Self {
        self.vimeo = Some(sdk);
        self
    }

    pub fn build(self) -> Arc<Environment> {
        Arc::new(Environment {
            config: self.config,
            scripts: ScriptLoader::new(self.host),
            hooks: self.hooks.unwrap_or_default(),
            window: self.window,
            youtube: self.youtube,
            soundcloud: self.soundcloud,
            vimeo: self.vimeo,
        })
    }
}
