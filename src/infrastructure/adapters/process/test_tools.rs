//! 测试用的外部工具脚本
//!
//! 用 `sh` 脚本模拟抽帧、分析、标注和编码工具，行为与真实工具的进程约定一致

use std::path::Path;

use super::ToolCommand;

/// 写出脚本并返回 `sh <script>` 命令
pub fn script(dir: &Path, name: &str, body: &str) -> ToolCommand {
    let path = dir.join(name);
    std::fs::write(&path, format!("set -e\n{}\n", body)).unwrap();
    ToolCommand::new("sh").with_args([path.display().to_string()])
}

/// 抽帧：写一帧和 manifest.json（90 帧 @30fps 视频按 90 间隔采样）
pub fn extractor(dir: &Path) -> ToolCommand {
    script(
        dir,
        "fake_extractor.sh",
        r#"
mkdir -p "$2"
printf 'jpg' > "$2/frame_000000.jpg"
cat > "$2/manifest.json" <<EOF
{"video_path": "$1", "video_stem": "clip", "output_dir": "$2", "fps": 30.0, "width": 64, "height": 64, "total_frames": 90, "duration_s": 3.0, "frame_interval": $3, "saved_count": 1, "frames": [{"index": 0, "filename": "frame_000000.jpg", "path": "$2/frame_000000.jpg", "original_frame_number": 0, "timestamp_s": 0.0}]}
EOF
echo "Extracted 1 frames to $2"
echo "Manifest path: $2/manifest.json"
"#,
    )
}

/// 抽帧失败：不写 manifest
pub fn broken_extractor(dir: &Path) -> ToolCommand {
    script(
        dir,
        "broken_extractor.sh",
        r#"
mkdir -p "$2"
echo "Could not open video: $1" >&2
"#,
    )
}

/// 分析：把 detections 写到工作根目录，stdout 最后一行是路径
pub fn analyzer(dir: &Path) -> ToolCommand {
    script(
        dir,
        "fake_analyzer.sh",
        r#"
frames_dir=$(dirname "$1")
work_root=$(dirname "$frames_dir")
out="$work_root/clip_detections.json"
printf '%s' "$3" > "$work_root/batch_size.txt"
printf '%s' "${HF_TOKEN:-}" > "$work_root/token.txt"
echo "Manifest loaded from: $1" >&2
echo "Using model: Qwen/Qwen2.5-VL-7B-Instruct" >&2
echo "Fallback configured: OpenRouter with model Qwen/Qwen2.5-VL-7B-Instruct" >&2
echo "Processing batch 1/1 (frames 0 to 0)..." >&2
echo "Batch 1 complete: 1 frames analyzed, 1 people detected" >&2
cat > "$out" <<EOF
{"video_info": {"video_path": "/uploads/clip.mp4", "video_stem": "clip", "fps": 30.0, "total_frames": 1}, "task_description": "$2", "frame_detections": [{"frame_index": 0, "frame_filename": "frame_000000.jpg", "timestamp_s": 0.0, "image_width": 64, "image_height": 64, "people_detected": 1, "people": [{"person_id": 0, "bbox": {"x_min": 1, "y_min": 2, "x_max": 30, "y_max": 60}, "bbox_confidence": 0.9, "analysis_result": {"emotion": "happy", "confidence": 0.8}, "visual_description": "Smiling person"}]}]}
EOF
echo "$out"
"#,
    )
}

/// 标注：输出进度行和一行噪声，复制源视频作为标注结果
pub fn annotator(dir: &Path) -> ToolCommand {
    script(
        dir,
        "fake_annotator.sh",
        r#"
echo "Loading video: $1" >&2
echo "Progress: 0.0% (0/90 frames)" >&2
echo "Resolution: 64x64" >&2
echo "Progress: 50.0% (45/90 frames)" >&2
cp "$1" "$3"
echo "Annotation complete!" >&2
echo "$3"
"#,
    )
}

/// 标注失败
pub fn failing_annotator(dir: &Path) -> ToolCommand {
    script(
        dir,
        "failing_annotator.sh",
        r#"
echo "Error: Detections file not found: $2" >&2
exit 1
"#,
    )
}

/// 编码：ffmpeg 参数中 `-i` 后是输入，最后一个是输出
pub fn encoder(dir: &Path) -> ToolCommand {
    script(
        dir,
        "fake_encoder.sh",
        r#"
for arg in "$@"; do last="$arg"; done
cp "$3" "$last"
printf 'transcoded' >> "$last"
"#,
    )
}
