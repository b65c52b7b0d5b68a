//! 桌面端的 `<audio>` 实现。
//!
//! 基于 rodio 输出，播放线程独占输出流与 Sink，
//! 元素方法通过 crossbeam 通道向它发送命令。

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, warn};
use parking_lot::Mutex;
use rodio::{OutputStream, OutputStreamBuilder, Sink};

use crate::dom::{Handler, ListenerId, Listeners, MediaElement, MediaError, MediaEvent};

mod source;

use source::AudioData;

/// timeupdate 的派发间隔
const TICK: Duration = Duration::from_millis(250);
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

enum Command {
    Load(String),
    Play,
    Pause,
    Seek(f64),
    Output,
    Shutdown,
}

#[derive(Debug)]
struct ElementState {
    src: String,
    current_time: f64,
    duration: Option<f64>,
    paused: bool,
    volume: f64,
    muted: bool,
}

struct Shared {
    state: Mutex<ElementState>,
    listeners: Listeners<MediaEvent>,
}

impl Shared {
    /// 派发前必须释放状态锁，监听器会回读状态
    fn emit(&self, event: MediaEvent) {
        self.listeners.emit(&event);
    }

    fn fail(&self, code: u16, err: anyhow::Error) {
        error!(target: "remu_embed::native", "{err:#}");
        self.emit(MediaEvent::Error(MediaError::new(code, format!("{err:#}"))));
    }
}

/// 播放线程
struct Worker {
    shared: Arc<Shared>,
    stream: OutputStream,
    sink: Sink,
    client: reqwest::blocking::Client,
    data: Option<AudioData>,
    last_tick: Instant,
}

impl Worker {
    fn run(mut self, commands: Receiver<Command>) {
        loop {
            let timeout = TICK.saturating_sub(self.last_tick.elapsed());
            match commands.recv_timeout(timeout) {
                Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(command) => self.handle(command),
                Err(RecvTimeoutError::Timeout) => {}
            }
            if self.last_tick.elapsed() >= TICK {
                self.last_tick = Instant::now();
                self.tick();
            }
        }
        self.sink.stop();
        debug!(target: "remu_embed::native", "playback thread stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Load(src) => self.load(&src),
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::Seek(seconds) => self.seek(seconds),
            Command::Output => self.apply_output(),
            Command::Shutdown => {}
        }
    }

    /// 替换 Sink，新 Sink 处于暂停状态
    fn reset_sink(&mut self) {
        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.sink.pause();
        self.apply_output();
    }

    fn apply_output(&self) {
        let state = self.shared.state.lock();
        let volume = if state.muted { 0.0 } else { state.volume };
        self.sink.set_volume(volume as f32);
    }

    fn load(&mut self, src: &str) {
        self.reset_sink();
        self.data = None;
        {
            let mut state = self.shared.state.lock();
            state.current_time = 0.0;
            state.duration = None;
            state.paused = true;
        }
        debug!(target: "remu_embed::native", "loading {src}");

        let data = match source::read_source(&self.client, src) {
            Ok(data) => data,
            Err(e) => return self.shared.fail(MediaError::NETWORK, e),
        };
        let decoder = match source::decode(&data) {
            Ok(decoder) => decoder,
            Err(e) => return self.shared.fail(MediaError::DECODE, e),
        };

        let duration = source::duration_of(&decoder, &data);
        self.sink.append(decoder);
        self.data = Some(data);
        self.shared.state.lock().duration = duration;
        self.shared.emit(MediaEvent::LoadedData);
    }

    /// 播放结束后 Sink 为空，从缓存的数据重新解码一份
    fn rewind_if_ended(&mut self) -> bool {
        if !self.sink.empty() {
            return true;
        }
        let Some(data) = &self.data else {
            return false;
        };
        match source::decode(data) {
            Ok(decoder) => {
                self.sink.append(decoder);
                self.shared.state.lock().current_time = 0.0;
                true
            }
            Err(e) => {
                self.shared.fail(MediaError::DECODE, e);
                false
            }
        }
    }

    fn play(&mut self) {
        if !self.shared.state.lock().paused {
            return;
        }
        if !self.rewind_if_ended() {
            warn!(target: "remu_embed::native", "nothing to play");
            return;
        }
        self.sink.play();
        self.shared.state.lock().paused = false;
        self.shared.emit(MediaEvent::Play);
    }

    fn pause(&mut self) {
        {
            let mut state = self.shared.state.lock();
            if state.paused {
                return;
            }
            state.paused = true;
            state.current_time = self.sink.get_pos().as_secs_f64();
        }
        self.sink.pause();
        self.shared.emit(MediaEvent::Pause);
    }

    fn seek(&mut self, seconds: f64) {
        let duration = self.shared.state.lock().duration;
        let Some(position) = seek_target(seconds, duration) else {
            warn!(target: "remu_embed::native", "ignoring seek to {seconds}");
            return;
        };
        if !self.rewind_if_ended() {
            return;
        }
        if let Err(e) = self.sink.try_seek(position) {
            warn!(target: "remu_embed::native", "seek failed: {e}");
            return;
        }
        self.shared.state.lock().current_time = position.as_secs_f64();
        self.shared.emit(MediaEvent::TimeUpdate);
    }

    fn tick(&mut self) {
        let ended = {
            let mut state = self.shared.state.lock();
            if state.paused {
                return;
            }
            if self.sink.empty() {
                state.paused = true;
                if let Some(duration) = state.duration {
                    state.current_time = duration;
                }
                true
            } else {
                state.current_time = self.sink.get_pos().as_secs_f64();
                false
            }
        };

        self.shared.emit(MediaEvent::TimeUpdate);
        if ended {
            self.shared.emit(MediaEvent::Pause);
            self.shared.emit(MediaEvent::Ended);
        }
    }
}

/// 跳转目标，限制在 `[0, duration]` 内，非有限值返回 `None`
fn seek_target(seconds: f64, duration: Option<f64>) -> Option<Duration> {
    if !seconds.is_finite() {
        return None;
    }
    let seconds = match duration {
        Some(duration) => seconds.min(duration),
        None => seconds,
    };
    Duration::try_from_secs_f64(seconds.max(0.0)).ok()
}

/// 默认输出设备上的音频元素
pub struct NativeAudioElement {
    shared: Arc<Shared>,
    commands: Sender<Command>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl NativeAudioElement {
    /// 打开默认输出设备并启动播放线程
    pub fn new() -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(ElementState {
                src: String::new(),
                current_time: 0.0,
                duration: None,
                paused: true,
                volume: 1.0,
                muted: false,
            }),
            listeners: Listeners::new(),
        });
        let (commands, receiver) = crossbeam_channel::unbounded();
        let (opened, open_result) = crossbeam_channel::bounded(1);
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("remu-embed-audio".into())
            .spawn(move || {
                // 输出流不能跨线程移动，只能在播放线程里打开
                let stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = opened.send(Err(anyhow!("failed to open audio output: {e}")));
                        return;
                    }
                };
                // 阻塞客户端不能在异步运行时内构造
                let client = match reqwest::blocking::Client::builder().timeout(FETCH_TIMEOUT).build() {
                    Ok(client) => client,
                    Err(e) => {
                        let _ = opened.send(Err(e.into()));
                        return;
                    }
                };
                let sink = Sink::connect_new(stream.mixer());
                sink.pause();
                let _ = opened.send(Ok(()));

                Worker {
                    shared: worker_shared,
                    stream,
                    sink,
                    client,
                    data: None,
                    last_tick: Instant::now(),
                }
                .run(receiver);
            })?;

        open_result
            .recv()
            .map_err(|_| anyhow!("audio thread exited during startup"))??;

        Ok(Self {
            shared,
            commands,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn paused(&self) -> bool {
        self.shared.state.lock().paused
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!(target: "remu_embed::native", "playback thread is gone");
        }
    }
}

impl MediaElement for NativeAudioElement {
    fn set_src(&self, src: &str) {
        self.shared.state.lock().src = src.to_string();
        self.send(Command::Load(src.to_string()));
    }

    fn src(&self) -> String {
        self.shared.state.lock().src.clone()
    }

    fn play(&self) {
        self.send(Command::Play);
    }

    fn pause(&self) {
        self.send(Command::Pause);
    }

    fn set_current_time(&self, seconds: f64) {
        self.send(Command::Seek(seconds));
    }

    fn current_time(&self) -> f64 {
        self.shared.state.lock().current_time
    }

    fn duration(&self) -> Option<f64> {
        self.shared.state.lock().duration
    }

    fn set_volume(&self, volume: f64) {
        self.shared.state.lock().volume = volume;
        self.send(Command::Output);
    }

    fn set_muted(&self, muted: bool) {
        self.shared.state.lock().muted = muted;
        self.send(Command::Output);
    }

    fn add_listener(&self, handler: Handler<MediaEvent>) -> ListenerId {
        self.shared.listeners.add(handler)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.shared.listeners.remove(id);
    }
}

impl Drop for NativeAudioElement {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.lock().take() {
            // 在监听器里释放最后一个引用时不能等待自己
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}
