use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use bytes::{Bytes, BytesMut};
use futures::future::{BoxFuture, FutureExt};
use futures_util::StreamExt;
use log::debug;

use super::ScriptHost;

/// 脚本执行器，接收脚本 URL 和内容
pub type ScriptEvaluator = Arc<dyn Fn(&str, Bytes) -> anyhow::Result<()> + Send + Sync + 'static>;

/// 通过 HTTP 拉取脚本的宿主
///
/// 下载完成后把脚本内容交给执行器；执行器返回错误视为脚本加载失败。
pub struct HttpScriptHost {
    client: reqwest::Client,
    evaluator: ScriptEvaluator,
}

impl HttpScriptHost {
    pub fn new(timeout: Duration, evaluator: ScriptEvaluator) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self { client, evaluator })
    }

    async fn fetch(client: reqwest::Client, url: String) -> anyhow::Result<Bytes> {
        let response = client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to request {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{url} responded with {status}"));
        }

        // 预留容量，以防内存重新分配
        let content_length = response.content_length().unwrap_or(0);
        let mut body = BytesMut::with_capacity(content_length as usize);

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("error reading {url}"))?;
            body.extend_from_slice(&chunk);
        }

        debug!(target: "remu_embed::loader", "{url} fetched {} bytes", body.len());
        Ok(body.freeze())
    }
}

impl ScriptHost for HttpScriptHost {
    fn inject(&self, url: &str) -> BoxFuture<'static, anyhow::Result<()>> {
        let client = self.client.clone();
        let evaluator = Arc::clone(&self.evaluator);
        let url = url.to_string();
        async move {
            let body = Self::fetch(client, url.clone()).await?;
            evaluator(&url, body)
        }
        .boxed()
    }
}
