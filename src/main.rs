use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use remu_embed::loader::{HttpScriptHost, ScriptEvaluator};
use remu_embed::native::NativeAudioElement;
use remu_embed::{EmbedConfig, ElementRef, Environment, HostElement, Player, PlayerOptions, PlayerType};
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let source = args
        .next()
        .context("usage: remu-embed <file-or-url> [config.json]")?;
    let config = match args.next() {
        Some(path) => EmbedConfig::from_file(path)?,
        None => EmbedConfig::default(),
    };

    // 桌面端没有脚本引擎，音频播放也不需要厂商脚本
    let evaluator: ScriptEvaluator = Arc::new(|url, body| {
        log::debug!("skipping evaluation of {url} ({} bytes)", body.len());
        Ok(())
    });
    let host = HttpScriptHost::new(config.fetch_timeout, evaluator)?;
    let env = Environment::init(Environment::builder(Arc::new(host)).config(config).build());

    let element = Arc::new(NativeAudioElement::new()?);
    let options = PlayerOptions::new()
        .on_loaded(|e| println!("数据加载完成: {}", e.id))
        .on_play(|| println!("播放开始"))
        .on_pause(|| println!("播放已暂停"))
        .on_ended(|| println!("播放完成"))
        .on_error(|e| println!("错误: {e}"))
        .on_time_update(|t| {
            if let (Some(seconds), Some(duration)) = (t.seconds, t.duration) {
                println!("进度: {seconds:.1} / {duration:.1} 秒");
            }
        });

    let mut player = Player::new(
        PlayerType::Audio,
        ElementRef::with(HostElement::Media(element.clone())),
        options,
        env,
    );

    println!("当前文件: {source}");
    player.attach(Some(&source)).await?;
    sleep(Duration::from_secs(1)).await;

    match player.get_duration().await? {
        Some(d) => println!("时长: {d:.1} 秒"),
        None => println!("时长: 未知"),
    }

    player.set_volume(0.5).await?;
    player.play().await?;
    sleep(Duration::from_secs(5)).await;

    println!("测试暂停");
    player.pause().await?;
    sleep(Duration::from_secs(2)).await;
    player.play().await?;
    sleep(Duration::from_secs(3)).await;

    println!("测试跳转");
    player.set_current_time(20.0).await?;
    sleep(Duration::from_secs(5)).await;

    println!("测试静音");
    player.set_muted(true).await?;
    sleep(Duration::from_secs(2)).await;
    player.set_muted(false).await?;
    sleep(Duration::from_secs(3)).await;

    player.detach().await?;
    println!("测试完成！");
    Ok(())
}
