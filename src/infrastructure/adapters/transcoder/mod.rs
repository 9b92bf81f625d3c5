//! Transcoder Adapter - 视频兼容性转码

mod ffmpeg_transcoder;

pub use ffmpeg_transcoder::{FfmpegTranscoder, TranscodeProfile};
