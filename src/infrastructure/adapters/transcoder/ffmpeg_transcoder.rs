//! FFmpeg Transcoder - 浏览器兼容性转码
//!
//! 固定输出 H.264 + AAC，`yuv420p` 像素格式，`+faststart` 便于流式播放。
//! 输出写到输入旁边的 `<stem>.transcoding.mp4`

use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::application::error::{PipelineError, PipelineStage};
use crate::application::ports::TranscoderPort;
use crate::infrastructure::adapters::process::{run_tool, ToolCommand};

/// 编码参数
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TranscodeProfile {
    /// x264 preset
    pub preset: String,
    /// 恒定质量因子，越小质量越高
    pub crf: u8,
    pub audio_bitrate: String,
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self {
            preset: "fast".to_string(),
            crf: 23,
            audio_bitrate: "128k".to_string(),
        }
    }
}

pub struct FfmpegTranscoder {
    encoder: ToolCommand,
    profile: TranscodeProfile,
}

impl FfmpegTranscoder {
    pub fn new(encoder: ToolCommand, profile: TranscodeProfile) -> Self {
        Self { encoder, profile }
    }

    /// 临时输出路径：`<dir>/<stem>.transcoding.mp4`
    pub fn temp_path(input_path: &Path) -> PathBuf {
        let stem = input_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        input_path.with_file_name(format!("{}.transcoding.mp4", stem))
    }

    fn args(&self, input_path: &Path, temp_path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-i".into()];
        args.push(input_path.as_os_str().to_owned());
        for arg in [
            "-c:v",
            "libx264",
            "-preset",
            self.profile.preset.as_str(),
            "-crf",
        ] {
            args.push(arg.into());
        }
        args.push(self.profile.crf.to_string().into());
        for arg in [
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            "aac",
            "-b:a",
            self.profile.audio_bitrate.as_str(),
            "-movflags",
            "+faststart",
        ] {
            args.push(arg.into());
        }
        args.push(temp_path.as_os_str().to_owned());
        args
    }

    async fn remove_temp(temp_path: &Path) {
        if let Err(e) = tokio::fs::remove_file(temp_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %temp_path.display(), error = %e, "Failed to remove temp file");
            }
        }
    }
}

#[async_trait]
impl TranscoderPort for FfmpegTranscoder {
    async fn reencode(&self, input_path: &Path) -> Result<PathBuf, PipelineError> {
        let temp_path = Self::temp_path(input_path);
        let args = self.args(input_path, &temp_path);

        tracing::debug!(
            input = %input_path.display(),
            output = %temp_path.display(),
            preset = %self.profile.preset,
            crf = self.profile.crf,
            "Transcoding video"
        );

        let output = match run_tool(PipelineStage::Transcode, &self.encoder, &args, &[], |_| {}).await
        {
            Ok(output) => output,
            Err(e) => {
                Self::remove_temp(&temp_path).await;
                return Err(e);
            }
        };

        if !output.success() {
            Self::remove_temp(&temp_path).await;
            return Err(output.exit_error(PipelineStage::Transcode, &self.encoder));
        }

        if !tokio::fs::try_exists(&temp_path).await.unwrap_or(false) {
            return Err(PipelineError::stage_failure(
                PipelineStage::Transcode,
                format!("encoder produced no output at {}", temp_path.display()),
                output.stderr_tail(),
            ));
        }

        Ok(temp_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::process::test_tools;
    use tempfile::tempdir;

    #[test]
    fn test_args_follow_compatibility_profile() {
        let transcoder = FfmpegTranscoder::new(ToolCommand::new("ffmpeg"), TranscodeProfile::default());
        let args: Vec<String> = transcoder
            .args(Path::new("/w/clip_annotated.mp4"), Path::new("/w/clip_annotated.transcoding.mp4"))
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(&args[..3], &["-y", "-i", "/w/clip_annotated.mp4"]);
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|w| w == ["-pix_fmt", "yuv420p"]));
        assert!(args.windows(2).any(|w| w == ["-movflags", "+faststart"]));
        assert_eq!(args.last().unwrap(), "/w/clip_annotated.transcoding.mp4");
    }

    #[tokio::test]
    async fn test_reencode_writes_temp_beside_input() {
        let temp_dir = tempdir().unwrap();
        let input = temp_dir.path().join("clip_annotated.mp4");
        std::fs::write(&input, b"annotated").unwrap();
        let transcoder =
            FfmpegTranscoder::new(test_tools::encoder(temp_dir.path()), TranscodeProfile::default());

        let output = transcoder.reencode(&input).await.unwrap();

        assert_eq!(output, temp_dir.path().join("clip_annotated.transcoding.mp4"));
        assert_eq!(std::fs::read(&output).unwrap(), b"annotatedtranscoded");
    }

    #[tokio::test]
    async fn test_failed_encode_removes_temp() {
        let temp_dir = tempdir().unwrap();
        let input = temp_dir.path().join("clip_annotated.mp4");
        std::fs::write(&input, b"annotated").unwrap();
        let tool = test_tools::script(
            temp_dir.path(),
            "bad_encoder.sh",
            "for arg in \"$@\"; do last=\"$arg\"; done\nprintf 'partial' > \"$last\"\necho 'Unknown encoder libx264' >&2\nexit 1",
        );
        let transcoder = FfmpegTranscoder::new(tool, TranscodeProfile::default());

        let err = transcoder.reencode(&input).await.unwrap_err();

        assert!(matches!(err, PipelineError::Transcode { .. }));
        assert!(!FfmpegTranscoder::temp_path(&input).exists());
    }

    #[tokio::test]
    async fn test_missing_encoder_is_spawn_error() {
        let temp_dir = tempdir().unwrap();
        let input = temp_dir.path().join("clip_annotated.mp4");
        std::fs::write(&input, b"annotated").unwrap();
        let transcoder = FfmpegTranscoder::new(
            ToolCommand::new("framewatch-missing-ffmpeg"),
            TranscodeProfile::default(),
        );

        let err = transcoder.reencode(&input).await.unwrap_err();

        assert!(matches!(err, PipelineError::ProcessSpawn { .. }));
        assert!(!err.is_fatal());
    }
}
