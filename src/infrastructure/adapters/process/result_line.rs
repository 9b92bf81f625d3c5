//! Result Line - 从 stdout 读取结果文件路径
//!
//! 约定：工具在 stdout 报告结果文件路径。从最后一行往前找，
//! 第一个 `{"path": "..."}` JSON 行或指向已存在文件的行生效，
//! 末尾多打一行日志不会破坏约定

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize)]
struct ResultLine {
    path: PathBuf,
}

pub async fn find_result_path(stdout: &[String]) -> Option<PathBuf> {
    for line in stdout.iter().rev() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('{') {
            if let Ok(result) = serde_json::from_str::<ResultLine>(line) {
                return Some(result.path);
            }
            continue;
        }

        let candidate = PathBuf::from(line);
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_last_existing_path_wins_over_trailing_log() {
        let temp_dir = tempdir().unwrap();
        let file = temp_dir.path().join("clip_detections.json");
        std::fs::write(&file, b"{}").unwrap();

        let stdout = vec![
            "Manifest loaded".to_string(),
            file.display().to_string(),
            "Done.".to_string(),
            String::new(),
        ];

        assert_eq!(find_result_path(&stdout).await, Some(file));
    }

    #[tokio::test]
    async fn test_structured_result_line() {
        let stdout = vec![r#"{"path": "/work/clip_annotated.mp4"}"#.to_string()];
        assert_eq!(
            find_result_path(&stdout).await,
            Some(PathBuf::from("/work/clip_annotated.mp4"))
        );
    }

    #[tokio::test]
    async fn test_no_path_reported() {
        let stdout = vec!["nothing useful".to_string()];
        assert_eq!(find_result_path(&stdout).await, None);
    }
}
