//! Process Video Commands - 视频检测流水线命令

use std::path::PathBuf;

/// 单次运行的流水线参数
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// 工作根目录（会话帧目录、检测结果、标注视频都放在这里）
    pub work_dir: PathBuf,
    /// 每隔 N 帧采样一次
    pub frame_interval: u32,
    pub max_frames: Option<u32>,
    /// 推理批大小（会被限制到上限）
    pub batch_size: u32,
    /// 保留会话帧目录
    pub keep_intermediate_files: bool,
    pub annotation_enabled: bool,
    pub transcode_enabled: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("data/work"),
            frame_interval: 30,
            max_frames: None,
            batch_size: 2,
            keep_intermediate_files: false,
            annotation_enabled: true,
            transcode_enabled: true,
        }
    }
}

/// 处理视频命令
///
/// 一次运行内不可变
#[derive(Debug, Clone)]
pub struct ProcessVideoCommand {
    pub video_path: PathBuf,
    pub task_description: String,
    /// 标注视频输出路径，为 None 时按视频文件名推导
    pub output_path: Option<PathBuf>,
    /// 上游已优化过提示词时跳过
    pub skip_refinement: bool,
    pub options: PipelineOptions,
}

impl ProcessVideoCommand {
    pub fn new(video_path: impl Into<PathBuf>, task_description: impl Into<String>) -> Self {
        Self {
            video_path: video_path.into(),
            task_description: task_description.into(),
            output_path: None,
            skip_refinement: false,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn skip_refinement(mut self, skip: bool) -> Self {
        self.skip_refinement = skip;
        self
    }
}
