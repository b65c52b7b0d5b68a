//! 宿主环境抽象：媒体元素、iframe、窗口消息通道。
//!
//! 播放器本身不关心这些句柄背后是浏览器 DOM、webview 还是本地实现，
//! 只依赖这里定义的调用与事件接口。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ElementKind, PlayerError, Result};

/// 监听器句柄，用于移除监听
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

impl ListenerId {
    pub fn next() -> Self {
        ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync + 'static>;

/// 监听器列表
///
/// 派发时先复制一份列表再调用，回调里可以安全地增删监听器。
pub struct Listeners<E> {
    handlers: Mutex<Vec<(ListenerId, Handler<E>)>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, handler: Handler<E>) -> ListenerId {
        let id = ListenerId::next();
        self.handlers.lock().push((id, handler));
        id
    }

    /// 返回是否确实移除了监听器
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(i, _)| *i != id);
        handlers.len() != before
    }

    pub fn clear(&self) {
        self.handlers.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn emit(&self, event: &E) {
        let handlers: Vec<Handler<E>> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in handlers {
            handler(event);
        }
    }
}

/// 媒体元素错误（对应 HTMLMediaElement 的 MediaError）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaError {
    pub code: u16,
    pub message: String,
}

impl MediaError {
    pub const ABORTED: u16 = 1;
    pub const NETWORK: u16 = 2;
    pub const DECODE: u16 = 3;
    pub const SRC_NOT_SUPPORTED: u16 = 4;

    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// 媒体元素事件
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// 对应 loadeddata 事件
    LoadedData,
    Play,
    Pause,
    Ended,
    TimeUpdate,
    Error(MediaError),
}

/// 媒体元素（`<audio>`）
///
/// 时长与位置以秒为单位；时长未知时可以返回 NaN 或 `None`，由适配层归一化。
pub trait MediaElement: Send + Sync {
    fn set_src(&self, src: &str);
    fn src(&self) -> String;
    fn play(&self);
    fn pause(&self);
    fn set_current_time(&self, seconds: f64);
    fn current_time(&self) -> f64;
    fn duration(&self) -> Option<f64>;
    fn set_volume(&self, volume: f64);
    fn set_muted(&self, muted: bool);
    fn add_listener(&self, handler: Handler<MediaEvent>) -> ListenerId;
    fn remove_listener(&self, id: ListenerId);
}

/// `<iframe>` 元素
pub trait IFrameElement: Send + Sync {
    fn set_src(&self, src: &str);
    fn src(&self) -> String;
    /// 设置一次性的 load 回调，`None` 表示清除
    fn set_onload(&self, callback: Option<Box<dyn FnOnce() + Send + 'static>>);
    /// 向 iframe 内容窗口发送消息
    fn post_message(&self, message: Value, target_origin: &str);
}

/// 窗口收到的 `message` 事件
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMessage {
    pub origin: String,
    pub data: Value,
}

/// 顶层窗口的消息通道
pub trait MessageWindow: Send + Sync {
    fn add_message_listener(&self, handler: Handler<WindowMessage>) -> ListenerId;
    fn remove_message_listener(&self, id: ListenerId);
}

/// 普通容器元素，厂商 SDK 会在其中创建自己的 iframe
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerHandle {
    pub id: String,
}

impl ContainerHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// 播放器绑定的宿主元素
#[derive(Clone)]
pub enum HostElement {
    Media(Arc<dyn MediaElement>),
    IFrame(Arc<dyn IFrameElement>),
    Container(ContainerHandle),
}

impl HostElement {
    pub fn kind(&self) -> ElementKind {
        match self {
            HostElement::Media(_) => ElementKind::Media,
            HostElement::IFrame(_) => ElementKind::IFrame,
            HostElement::Container(_) => ElementKind::Container,
        }
    }

    pub fn into_media(self) -> Result<Arc<dyn MediaElement>> {
        match self {
            HostElement::Media(element) => Ok(element),
            other => Err(PlayerError::ElementKind {
                expected: ElementKind::Media,
                found: other.kind(),
            }),
        }
    }

    pub fn into_iframe(self) -> Result<Arc<dyn IFrameElement>> {
        match self {
            HostElement::IFrame(element) => Ok(element),
            other => Err(PlayerError::ElementKind {
                expected: ElementKind::IFrame,
                found: other.kind(),
            }),
        }
    }

    pub fn into_container(self) -> Result<ContainerHandle> {
        match self {
            HostElement::Container(handle) => Ok(handle),
            other => Err(PlayerError::ElementKind {
                expected: ElementKind::Container,
                found: other.kind(),
            }),
        }
    }
}

/// 元素引用
///
/// 构造播放器时元素可能还没挂载，只保证在 attach 执行时已经填充。
#[derive(Clone, Default)]
pub struct ElementRef {
    current: Arc<RwLock<Option<HostElement>>>,
}

impl ElementRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(element: HostElement) -> Self {
        let r = Self::new();
        r.set(element);
        r
    }

    pub fn set(&self, element: HostElement) {
        *self.current.write() = Some(element);
    }

    pub fn clear(&self) {
        *self.current.write() = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.current.read().is_some()
    }

    /// 取出当前元素，未挂载时返回 `ElementMissing`
    pub fn get(&self) -> Result<HostElement> {
        self.current.read().clone().ok_or(PlayerError::ElementMissing)
    }
}
