use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;
use rodio::{Decoder, Source};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

pub(crate) type SourceDecoder = Decoder<Cursor<Bytes>>;

/// 已读入内存的音频数据
#[derive(Clone)]
pub(crate) struct AudioData {
    pub bytes: Bytes,
    /// 文件扩展名，作为解码器的格式提示
    pub extension: Option<String>,
}

fn is_remote(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://")
}

fn extension_of(src: &str) -> Option<String> {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// 读取音频源，支持 http(s) 地址、`file://` 地址和本地路径
pub(crate) fn read_source(client: &reqwest::blocking::Client, src: &str) -> Result<AudioData> {
    let bytes = if is_remote(src) {
        client
            .get(src)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .with_context(|| format!("failed to fetch {src}"))?
    } else {
        let path = src.strip_prefix("file://").unwrap_or(src);
        let data = std::fs::read(path).with_context(|| format!("failed to read {path}"))?;
        Bytes::from(data)
    };
    Ok(AudioData {
        bytes,
        extension: extension_of(src),
    })
}

/// 构造可跳转的解码器
pub(crate) fn decode(data: &AudioData) -> Result<SourceDecoder> {
    let mut builder = Decoder::builder()
        .with_byte_len(data.bytes.len() as u64)
        .with_seekable(true)
        .with_data(Cursor::new(data.bytes.clone()));
    if let Some(extension) = &data.extension {
        builder = builder.with_hint(extension);
    }
    builder.build().context("unsupported audio format")
}

/// 解码器报不出时长时（如 VBR 的 mp3），用 symphonia 从容器里读帧数
pub(crate) fn duration_of(decoder: &SourceDecoder, data: &AudioData) -> Option<f64> {
    decoder
        .total_duration()
        .map(|d| d.as_secs_f64())
        .or_else(|| probe_duration(data))
}

pub(crate) fn probe_duration(data: &AudioData) -> Option<f64> {
    let stream = MediaSourceStream::new(
        Box::new(Cursor::new(data.bytes.clone())),
        Default::default(),
    );
    let mut hint = Hint::new();
    if let Some(extension) = &data.extension {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;
    let track = probed.format.default_track()?;
    let frames = track.codec_params.n_frames?;
    let time = track.codec_params.time_base?.calc_time(frames);
    Some(time.seconds as f64 + time.frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// 单声道 16 位 PCM 的 WAV 数据
    fn wav(sample_rate: u32, frames: u32) -> Vec<u8> {
        let data_len = frames * 2;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(44 + data_len as usize, 0);
        out
    }

    #[test]
    fn extension_ignores_query_string() {
        assert_eq!(
            extension_of("https://example.com/a/song.MP3?sig=abc").as_deref(),
            Some("mp3")
        );
        assert_eq!(extension_of("https://example.com/stream"), None);
    }

    #[test]
    fn reads_file_urls_and_plain_paths() {
        let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        file.write_all(&wav(8000, 800)).unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let client = reqwest::blocking::Client::new();

        let plain = read_source(&client, &path).unwrap();
        let url = read_source(&client, &format!("file://{path}")).unwrap();
        assert_eq!(plain.bytes, url.bytes);
        assert_eq!(plain.extension.as_deref(), Some("wav"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let client = reqwest::blocking::Client::new();
        assert!(read_source(&client, "/definitely/not/here.mp3").is_err());
    }

    #[test]
    fn duration_is_read_from_the_container() {
        let data = AudioData {
            bytes: Bytes::from(wav(8000, 16000)),
            extension: Some("wav".into()),
        };
        assert_eq!(probe_duration(&data), Some(2.0));

        let decoder = decode(&data).unwrap();
        let duration = duration_of(&decoder, &data).unwrap();
        assert!((duration - 2.0).abs() < 1e-3);
    }

    #[test]
    fn garbage_does_not_decode() {
        let data = AudioData {
            bytes: Bytes::from_static(b"not audio at all"),
            extension: None,
        };
        assert!(decode(&data).is_err());
        assert_eq!(probe_duration(&data), None);
    }
}
