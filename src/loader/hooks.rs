use std::collections::HashMap;

use log::debug;
use parking_lot::Mutex;
use tokio::sync::watch;

/// 全局就绪钩子
///
/// 部分厂商脚本加载后还要等一个全局回调（如 `onYouTubeIframeAPIReady`）
/// 才能使用。钩子一旦触发就保持触发状态，之后的等待会立即返回。
#[derive(Default)]
pub struct ReadyHooks {
    hooks: Mutex<HashMap<String, watch::Sender<bool>>>,
}

impl ReadyHooks {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, name: &str) -> watch::Sender<bool> {
        self.hooks
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| watch::channel(false).0)
            .clone()
    }

    /// 由厂商运行时调用
    pub fn fire(&self, name: &str) {
        debug!(target: "remu_embed::loader", "{name} fired");
        self.sender(name).send_replace(true);
    }

    pub fn is_fired(&self, name: &str) -> bool {
        *self.sender(name).borrow()
    }

    /// 等待钩子触发
    pub async fn wait(&self, name: &str) {
        let mut rx = self.sender(name).subscribe();
        // 发送端保存在表中，不会关闭
        let _ = rx.wait_for(|fired| *fired).await;
    }
}
