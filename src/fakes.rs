//! 测试用的宿主与厂商运行时替身。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;

use crate::dom::{
    ContainerHandle, Handler, IFrameElement, ListenerId, Listeners, MediaElement, MediaEvent,
    MessageWindow, WindowMessage,
};
use crate::loader::ScriptHost;
use crate::vendor::{
    SoundCloudEventKind, SoundCloudLoadOptions, SoundCloudSdk, SoundCloudWidget, VimeoEvent,
    VimeoEventKind, VimeoPlayer, VimeoSdk, WidgetCallback, WidgetEvent, YouTubeEvent,
    YouTubePlayer, YouTubePlayerConfig, YouTubeSdk,
};

type LoadHook = Arc<dyn Fn(&str) + Send + Sync>;

/// 脚本宿主替身：记录注入次数，可以挂起或让指定 URL 失败
pub struct FakeScriptHost {
    injected: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    gate: watch::Sender<bool>,
    hang: Mutex<bool>,
    on_load: Mutex<Vec<LoadHook>>,
}

impl FakeScriptHost {
    pub fn new() -> Self {
        Self {
            injected: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            gate: watch::channel(true).0,
            hang: Mutex::new(false),
            on_load: Mutex::new(Vec::new()),
        }
    }

    /// 加载在 `open` 之前一直挂起
    pub fn gated() -> Self {
        let host = Self::new();
        host.gate.send_replace(false);
        host
    }

    /// 加载永远不会完成
    pub fn hanging() -> Self {
        let host = Self::new();
        *host.hang.lock() = true;
        host
    }

    pub fn open(&self) {
        self.gate.send_replace(true);
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().insert(url.to_string());
    }

    pub fn heal(&self, url: &str) {
        self.failing.lock().remove(url);
    }

    /// 脚本加载成功后执行，模拟脚本自身的副作用（例如触发全局钩子）
    pub fn after_load<F>(&self, f: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_load.lock().push(Arc::new(f));
    }

    pub fn injection_count(&self, url: &str) -> usize {
        self.injected.lock().iter().filter(|u| *u == url).count()
    }

    pub fn total_injections(&self) -> usize {
        self.injected.lock().len()
    }
}

impl ScriptHost for FakeScriptHost {
    fn inject(&self, url: &str) -> BoxFuture<'static, anyhow::Result<()>> {
        self.injected.lock().push(url.to_string());
        let url = url.to_string();
        let fails = self.failing.lock().contains(&url);
        let hang = *self.hang.lock();
        let hooks: Vec<LoadHook> = self.on_load.lock().clone();
        let mut gate = self.gate.subscribe();
        async move {
            if hang {
                futures::future::pending::<()>().await;
            }
            let _ = gate.wait_for(|open| *open).await;
            if fails {
                return Err(anyhow!("404 Not Found"));
            }
            for hook in hooks {
                hook(&url);
            }
            Ok(())
        }
        .boxed()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaCall {
    Play,
    Pause,
    Seek(f64),
    Volume(f64),
    Muted(bool),
}

/// `<audio>` 替身，play/pause 会像浏览器一样派发事件
#[derive(Default)]
pub struct FakeMediaElement {
    src: Mutex<String>,
    current_time: Mutex<f64>,
    duration: Mutex<Option<f64>>,
    calls: Mutex<Vec<MediaCall>>,
    listeners: Listeners<MediaEvent>,
}

impl FakeMediaElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_position(&self, current_time: f64, duration: Option<f64>) {
        *self.current_time.lock() = current_time;
        *self.duration.lock() = duration;
    }

    pub fn dispatch(&self, event: MediaEvent) {
        self.listeners.emit(&event);
    }

    pub fn calls(&self) -> Vec<MediaCall> {
        self.calls.lock().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl MediaElement for FakeMediaElement {
    fn set_src(&self, src: &str) {
        *self.src.lock() = src.to_string();
    }

    fn src(&self) -> String {
        self.src.lock().clone()
    }

    fn play(&self) {
        self.calls.lock().push(MediaCall::Play);
        self.dispatch(MediaEvent::Play);
    }

    fn pause(&self) {
        self.calls.lock().push(MediaCall::Pause);
        self.dispatch(MediaEvent::Pause);
    }

    fn set_current_time(&self, seconds: f64) {
        self.calls.lock().push(MediaCall::Seek(seconds));
        *self.current_time.lock() = seconds;
    }

    fn current_time(&self) -> f64 {
        *self.current_time.lock()
    }

    fn duration(&self) -> Option<f64> {
        *self.duration.lock()
    }

    fn set_volume(&self, volume: f64) {
        self.calls.lock().push(MediaCall::Volume(volume));
    }

    fn set_muted(&self, muted: bool) {
        self.calls.lock().push(MediaCall::Muted(muted));
    }

    fn add_listener(&self, handler: Handler<MediaEvent>) -> ListenerId {
        self.listeners.add(handler)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

type OnLoad = Box<dyn FnOnce() + Send + 'static>;

/// `<iframe>` 替身
#[derive(Default)]
pub struct FakeIFrame {
    src: Mutex<String>,
    onload: Mutex<Option<OnLoad>>,
    auto_load: Mutex<bool>,
    posted: Mutex<Vec<(Value, String)>>,
}

impl FakeIFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置 src 后立即触发 load
    pub fn auto_loading() -> Self {
        let iframe = Self::new();
        *iframe.auto_load.lock() = true;
        iframe
    }

    /// 触发 load 事件
    pub fn finish_load(&self) {
        let onload = self.onload.lock().take();
        if let Some(onload) = onload {
            onload();
        }
    }

    pub fn has_onload(&self) -> bool {
        self.onload.lock().is_some()
    }

    pub fn posted(&self) -> Vec<(Value, String)> {
        self.posted.lock().clone()
    }
}

impl IFrameElement for FakeIFrame {
    fn set_src(&self, src: &str) {
        *self.src.lock() = src.to_string();
        if *self.auto_load.lock() {
            self.finish_load();
        }
    }

    fn src(&self) -> String {
        self.src.lock().clone()
    }

    fn set_onload(&self, callback: Option<OnLoad>) {
        *self.onload.lock() = callback;
    }

    fn post_message(&self, message: Value, target_origin: &str) {
        self.posted.lock().push((message, target_origin.to_string()));
    }
}

/// 顶层窗口替身
#[derive(Default)]
pub struct FakeWindow {
    listeners: Listeners<WindowMessage>,
}

impl FakeWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, origin: &str, data: Value) {
        self.listeners.emit(&WindowMessage {
            origin: origin.to_string(),
            data,
        });
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl MessageWindow for FakeWindow {
    fn add_message_listener(&self, handler: Handler<WindowMessage>) -> ListenerId {
        self.listeners.add(handler)
    }

    fn remove_message_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum YouTubeCall {
    Load(String),
    Play,
    Pause,
    Seek(f64),
    Volume(f64),
    Mute,
    UnMute,
}

/// `YT.Player` 替身
#[derive(Default)]
pub struct FakeYouTubePlayer {
    listeners: Listeners<YouTubeEvent>,
    current_time: Mutex<f64>,
    duration: Mutex<f64>,
    calls: Mutex<Vec<YouTubeCall>>,
    /// 为 true 时每个新监听器都会马上收到 onReady
    auto_ready: bool,
}

impl FakeYouTubePlayer {
    pub fn dispatch(&self, event: YouTubeEvent) {
        self.listeners.emit(&event);
    }

    pub fn set_position(&self, current_time: f64, duration: f64) {
        *self.current_time.lock() = current_time;
        *self.duration.lock() = duration;
    }

    pub fn calls(&self) -> Vec<YouTubeCall> {
        self.calls.lock().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl YouTubePlayer for FakeYouTubePlayer {
    fn add_event_listener(&self, handler: Handler<YouTubeEvent>) -> ListenerId {
        let id = self.listeners.add(handler.clone());
        if self.auto_ready {
            handler(&YouTubeEvent::Ready);
        }
        id
    }

    fn remove_event_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }

    fn load_video_by_id(&self, id: &str) {
        self.calls.lock().push(YouTubeCall::Load(id.to_string()));
    }

    fn play_video(&self) {
        self.calls.lock().push(YouTubeCall::Play);
    }

    fn pause_video(&self) {
        self.calls.lock().push(YouTubeCall::Pause);
    }

    fn seek_to(&self, seconds: f64) {
        self.calls.lock().push(YouTubeCall::Seek(seconds));
        *self.current_time.lock() = seconds;
    }

    fn set_volume(&self, volume: f64) {
        self.calls.lock().push(YouTubeCall::Volume(volume));
    }

    fn mute(&self) {
        self.calls.lock().push(YouTubeCall::Mute);
    }

    fn un_mute(&self) {
        self.calls.lock().push(YouTubeCall::UnMute);
    }

    fn get_duration(&self) -> f64 {
        *self.duration.lock()
    }

    fn get_current_time(&self) -> f64 {
        *self.current_time.lock()
    }
}

/// YouTube iframe API 替身，记录创建过的播放器
#[derive(Default)]
pub struct FakeYouTubeSdk {
    players: Mutex<Vec<Arc<FakeYouTubePlayer>>>,
    configs: Mutex<Vec<(ContainerHandle, YouTubePlayerConfig)>>,
    auto_ready: bool,
}

impl FakeYouTubeSdk {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建的播放器立即就绪
    pub fn auto_ready() -> Self {
        Self {
            auto_ready: true,
            ..Self::default()
        }
    }

    pub fn created(&self) -> usize {
        self.players.lock().len()
    }

    pub fn player_at(&self, index: usize) -> Arc<FakeYouTubePlayer> {
        Arc::clone(&self.players.lock()[index])
    }

    pub fn config(&self, index: usize) -> (ContainerHandle, YouTubePlayerConfig) {
        self.configs.lock()[index].clone()
    }
}

impl YouTubeSdk for FakeYouTubeSdk {
    fn create_player(
        &self,
        container: &ContainerHandle,
        config: &YouTubePlayerConfig,
    ) -> anyhow::Result<Arc<dyn YouTubePlayer>> {
        let player = Arc::new(FakeYouTubePlayer {
            auto_ready: self.auto_ready,
            ..FakeYouTubePlayer::default()
        });
        self.players.lock().push(player.clone());
        self.configs.lock().push((container.clone(), config.clone()));
        Ok(player)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetCall {
    Load(String, SoundCloudLoadOptions),
    Play,
    Pause,
    Seek(f64),
    Volume(f64),
}

/// `SC.Widget` 替身，时长和位置单位为毫秒
#[derive(Default)]
pub struct FakeWidget {
    bindings: Mutex<HashMap<SoundCloudEventKind, Handler<WidgetEvent>>>,
    calls: Mutex<Vec<WidgetCall>>,
    duration_ms: Mutex<f64>,
    position_ms: Mutex<f64>,
    /// 为 true 时丢弃回调而不调用
    drop_callbacks: Mutex<bool>,
    /// 为 true 时绑定 READY 会马上触发
    auto_ready: bool,
}

impl FakeWidget {
    pub fn dispatch(&self, kind: SoundCloudEventKind, event: WidgetEvent) {
        let handler = self.bindings.lock().get(&kind).cloned();
        if let Some(handler) = handler {
            handler(&event);
        }
    }

    pub fn is_bound(&self, kind: SoundCloudEventKind) -> bool {
        self.bindings.lock().contains_key(&kind)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.lock().len()
    }

    pub fn set_position(&self, position_ms: f64, duration_ms: f64) {
        *self.position_ms.lock() = position_ms;
        *self.duration_ms.lock() = duration_ms;
    }

    pub fn drop_callbacks(&self) {
        *self.drop_callbacks.lock() = true;
    }

    pub fn calls(&self) -> Vec<WidgetCall> {
        self.calls.lock().clone()
    }
}

impl SoundCloudWidget for FakeWidget {
    fn bind(&self, kind: SoundCloudEventKind, handler: Handler<WidgetEvent>) {
        self.bindings.lock().insert(kind, handler.clone());
        if self.auto_ready && kind == SoundCloudEventKind::Ready {
            handler(&WidgetEvent::default());
        }
    }

    fn unbind(&self, kind: SoundCloudEventKind) {
        self.bindings.lock().remove(&kind);
    }

    fn load(&self, url: &str, options: SoundCloudLoadOptions, callback: WidgetCallback<()>) {
        self.calls
            .lock()
            .push(WidgetCall::Load(url.to_string(), options));
        if !*self.drop_callbacks.lock() {
            callback(());
        }
    }

    fn play(&self) {
        self.calls.lock().push(WidgetCall::Play);
    }

    fn pause(&self) {
        self.calls.lock().push(WidgetCall::Pause);
    }

    fn seek_to(&self, milliseconds: f64) {
        self.calls.lock().push(WidgetCall::Seek(milliseconds));
    }

    fn set_volume(&self, volume: f64) {
        self.calls.lock().push(WidgetCall::Volume(volume));
    }

    fn get_duration(&self, callback: WidgetCallback<f64>) {
        if !*self.drop_callbacks.lock() {
            let duration = *self.duration_ms.lock();
            callback(duration);
        }
    }

    fn get_position(&self, callback: WidgetCallback<f64>) {
        if !*self.drop_callbacks.lock() {
            let position = *self.position_ms.lock();
            callback(position);
        }
    }
}

#[derive(Default)]
pub struct FakeSoundCloudSdk {
    widgets: Mutex<Vec<Arc<FakeWidget>>>,
    auto_ready: bool,
}

impl FakeSoundCloudSdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_ready() -> Self {
        Self {
            auto_ready: true,
            ..Self::default()
        }
    }

    pub fn created(&self) -> usize {
        self.widgets.lock().len()
    }

    pub fn widget_at(&self, index: usize) -> Arc<FakeWidget> {
        Arc::clone(&self.widgets.lock()[index])
    }
}

impl SoundCloudSdk for FakeSoundCloudSdk {
    fn widget(&self, _iframe: Arc<dyn IFrameElement>) -> anyhow::Result<Arc<dyn SoundCloudWidget>> {
        let widget = Arc::new(FakeWidget {
            auto_ready: self.auto_ready,
            ..FakeWidget::default()
        });
        self.widgets.lock().push(widget.clone());
        Ok(widget)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VimeoCall {
    Load(String),
    Play,
    Pause,
    Seek(f64),
    Volume(f64),
    Muted(bool),
}

/// `Vimeo.Player` 替身
pub struct FakeVimeoPlayer {
    ready: watch::Sender<Option<bool>>,
    handlers: Mutex<HashMap<VimeoEventKind, Handler<VimeoEvent>>>,
    calls: Mutex<Vec<VimeoCall>>,
    duration: Mutex<f64>,
    current_time: Mutex<f64>,
    reject_calls: Mutex<bool>,
}

impl Default for FakeVimeoPlayer {
    fn default() -> Self {
        Self {
            ready: watch::channel(None).0,
            handlers: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            duration: Mutex::new(0.0),
            current_time: Mutex::new(0.0),
            reject_calls: Mutex::new(false),
        }
    }
}

impl FakeVimeoPlayer {
    /// 完成 `ready()`，`false` 表示 ready 失败
    pub fn resolve_ready(&self, ok: bool) {
        self.ready.send_replace(Some(ok));
    }

    pub fn dispatch(&self, kind: VimeoEventKind, event: VimeoEvent) {
        let handler = self.handlers.lock().get(&kind).cloned();
        if let Some(handler) = handler {
            handler(&event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn set_position(&self, current_time: f64, duration: f64) {
        *self.current_time.lock() = current_time;
        *self.duration.lock() = duration;
    }

    pub fn reject_calls(&self) {
        *self.reject_calls.lock() = true;
    }

    pub fn calls(&self) -> Vec<VimeoCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: VimeoCall) -> anyhow::Result<()> {
        if *self.reject_calls.lock() {
            return Err(anyhow!("PasswordError"));
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

#[async_trait]
impl VimeoPlayer for FakeVimeoPlayer {
    async fn ready(&self) -> anyhow::Result<()> {
        let mut rx = self.ready.subscribe();
        let ok = rx
            .wait_for(|r| r.is_some())
            .await
            .map(|r| (*r).unwrap_or(false))
            .unwrap_or(false);
        if ok {
            Ok(())
        } else {
            Err(anyhow!("embed disallowed"))
        }
    }

    fn on(&self, kind: VimeoEventKind, handler: Handler<VimeoEvent>) {
        self.handlers.lock().insert(kind, handler);
    }

    fn off(&self, kind: VimeoEventKind) {
        self.handlers.lock().remove(&kind);
    }

    async fn load_video(&self, id: &str) -> anyhow::Result<()> {
        self.record(VimeoCall::Load(id.to_string()))
    }

    async fn play(&self) -> anyhow::Result<()> {
        self.record(VimeoCall::Play)
    }

    async fn pause(&self) -> anyhow::Result<()> {
        self.record(VimeoCall::Pause)
    }

    async fn set_current_time(&self, seconds: f64) -> anyhow::Result<()> {
        self.record(VimeoCall::Seek(seconds))
    }

    async fn set_volume(&self, volume: f64) -> anyhow::Result<()> {
        self.record(VimeoCall::Volume(volume))
    }

    async fn set_muted(&self, muted: bool) -> anyhow::Result<()> {
        self.record(VimeoCall::Muted(muted))
    }

    async fn get_duration(&self) -> anyhow::Result<f64> {
        Ok(*self.duration.lock())
    }

    async fn get_current_time(&self) -> anyhow::Result<f64> {
        Ok(*self.current_time.lock())
    }
}

#[derive(Default)]
pub struct FakeVimeoSdk {
    players: Mutex<Vec<Arc<FakeVimeoPlayer>>>,
    /// 新建的播放器是否立即 ready
    auto_ready: Mutex<bool>,
}

impl FakeVimeoSdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_ready() -> Self {
        let sdk = Self::default();
        *sdk.auto_ready.lock() = true;
        sdk
    }

    pub fn created(&self) -> usize {
        self.players.lock().len()
    }

    pub fn player_at(&self, index: usize) -> Arc<FakeVimeoPlayer> {
        Arc::clone(&self.players.lock()[index])
    }
}

impl VimeoSdk for FakeVimeoSdk {
    fn player(&self, _iframe: Arc<dyn IFrameElement>) -> anyhow::Result<Arc<dyn VimeoPlayer>> {
        let player = Arc::new(FakeVimeoPlayer::default());
        if *self.auto_ready.lock() {
            player.resolve_ready(true);
        }
        self.players.lock().push(player.clone());
        Ok(player)
    }
}
