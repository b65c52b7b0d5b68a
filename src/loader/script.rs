use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, error};
use parking_lot::Mutex;

use crate::error::ScriptLoadError;

/// 负责真正注入并执行脚本的宿主
///
/// 返回的 future 在脚本加载完成（script 标签 onload）时就绪。
pub trait ScriptHost: Send + Sync {
    fn inject(&self, url: &str) -> BoxFuture<'static, anyhow::Result<()>>;
}

type SharedLoad = Shared<BoxFuture<'static, Result<(), ScriptLoadError>>>;

enum Entry {
    Loading(SharedLoad),
    Loaded,
}

/// 进程级的脚本加载缓存
///
/// 同一个 URL 在进程生命周期内最多成功加载一次，并发请求同一 URL
/// 的调用方共享同一次加载。
pub struct ScriptLoader {
    host: Arc<dyn ScriptHost>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl ScriptLoader {
    pub fn new(host: Arc<dyn ScriptHost>) -> Self {
        Self {
            host,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_loaded(&self, url: &str) -> bool {
        matches!(self.entries.lock().get(url), Some(Entry::Loaded))
    }

    /// 确保脚本已加载
    ///
    /// # 返回
    /// * `Ok(true)` - 本次调用完成了加载
    /// * `Ok(false)` - 脚本早已加载，或加入了其他调用方正在进行的加载
    /// * `Err(ScriptLoadError)` - 加载失败，缓存中不保留该 URL，之后可以重试
    pub async fn ensure_loaded(&self, url: &str) -> Result<bool, ScriptLoadError> {
        let (load, first) = {
            let mut entries = self.entries.lock();
            match entries.get(url) {
                Some(Entry::Loaded) => {
                    debug!(target: "remu_embed::loader", "{url} script is already loaded");
                    return Ok(false);
                }
                Some(Entry::Loading(load)) => {
                    debug!(target: "remu_embed::loader", "{url} script is loading, waiting");
                    (load.clone(), false)
                }
                None => {
                    debug!(target: "remu_embed::loader", "{url} loading script...");
                    let inject = self.host.inject(url);
                    let owned = url.to_string();
                    let load = async move {
                        inject.await.map_err(|e| ScriptLoadError {
                            url: owned,
                            message: format!("{e:#}"),
                        })
                    }
                    .boxed()
                    .shared();
                    entries.insert(url.to_string(), Entry::Loading(load.clone()));
                    (load, true)
                }
            }
        };

        let result = load.clone().await;

        let mut entries = self.entries.lock();
        match result {
            Ok(()) => {
                if first {
                    debug!(target: "remu_embed::loader", "{url} script loaded");
                }
                entries.insert(url.to_string(), Entry::Loaded);
                Ok(first)
            }
            Err(e) => {
                let ours = matches!(entries.get(url), Some(Entry::Loading(l)) if l.ptr_eq(&load));
                if ours {
                    error!(target: "remu_embed::loader", "{url} failed to load script");
                    entries.remove(url);
                }
                Err(e)
            }
        }
    }
}
