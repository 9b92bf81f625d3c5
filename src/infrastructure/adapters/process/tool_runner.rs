//! Tool Runner - 外部进程执行
//!
//! 所有阶段共用的子进程封装：
//! - 位置参数追加在配置的固定参数之后
//! - stdout 收集为行，stderr 逐行回调（用于进度和观测）
//! - 非 UTF-8 字节按 lossy 解码，两个管道都读到 EOF
//! - 程序无法启动时返回 ProcessSpawn，并指明程序名

use serde::Deserialize;
use std::ffi::OsString;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::application::error::{PipelineError, PipelineStage};

/// 错误信息里保留的 stderr 行数
const STDERR_TAIL_LINES: usize = 20;

/// 外部工具命令
///
/// 例如 `{ program = "python3", args = ["scripts/frame_analyzer.py"] }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// 程序 + 固定参数，用于日志
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// 进程输出
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// stderr 最后若干行
    pub fn stderr_tail(&self) -> String {
        let start = self.stderr.len().saturating_sub(STDERR_TAIL_LINES);
        self.stderr[start..].join("\n")
    }

    /// 非零退出时的统一错误
    pub fn exit_error(&self, stage: PipelineStage, tool: &ToolCommand) -> PipelineError {
        PipelineError::stage_failure(
            stage,
            format!("`{}` exited with {}", tool.display(), self.status),
            self.stderr_tail(),
        )
    }
}

/// 运行外部工具直到退出
///
/// 只等待进程结束，不设超时
pub async fn run_tool<F>(
    stage: PipelineStage,
    tool: &ToolCommand,
    args: &[OsString],
    envs: &[(String, String)],
    mut on_stderr_line: F,
) -> Result<ToolOutput, PipelineError>
where
    F: FnMut(&str) + Send,
{
    let mut command = Command::new(&tool.program);
    command
        .args(&tool.args)
        .args(args)
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(
        stage = %stage,
        program = %tool.program,
        args = ?args,
        "Spawning external tool"
    );

    let mut child = command.spawn().map_err(|source| PipelineError::ProcessSpawn {
        stage,
        program: tool.program.clone(),
        source,
    })?;

    let stdout_task = child.stdout.take().map(|stdout| {
        tokio::spawn(async move {
            let mut collected = Vec::new();
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                match next_lossy_line(&mut reader, &mut buf).await {
                    Ok(Some(line)) => collected.push(line),
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(stage = %stage, error = %e, "Failed to read tool stdout");
                        drain(&mut reader).await;
                        break;
                    }
                }
            }
            collected
        })
    });

    let mut stderr_lines = Vec::new();
    if let Some(stderr) = child.stderr.take() {
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        loop {
            match next_lossy_line(&mut reader, &mut buf).await {
                Ok(Some(line)) => {
                    tracing::debug!(stage = %stage, "{}", line);
                    on_stderr_line(&line);
                    stderr_lines.push(line);
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(stage = %stage, error = %e, "Failed to read tool stderr");
                    drain(&mut reader).await;
                    break;
                }
            }
        }
    }

    let status = child.wait().await.map_err(|e| {
        PipelineError::stage_failure(
            stage,
            format!("failed to wait for `{}`: {}", tool.program, e),
            stderr_lines.join("\n"),
        )
    })?;

    let stdout = match stdout_task {
        Some(task) => task.await.unwrap_or_default(),
        None => Vec::new(),
    };

    tracing::debug!(
        stage = %stage,
        program = %tool.program,
        status = %status,
        stdout_lines = stdout.len(),
        stderr_lines = stderr_lines.len(),
        "External tool exited"
    );

    Ok(ToolOutput {
        status,
        stdout,
        stderr: stderr_lines,
    })
}

/// 读取一行原始字节并 lossy 解码，EOF 时返回 None
async fn next_lossy_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

/// 读取出错后继续丢弃剩余输出，避免子进程写管道时收到 SIGPIPE
async fn drain<R>(reader: &mut R)
where
    R: AsyncBufRead + Unpin,
{
    if let Err(e) = tokio::io::copy_buf(reader, &mut tokio::io::sink()).await {
        tracing::debug!(error = %e, "Stopped draining tool output");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh").with_args(["-c", script])
    }

    #[tokio::test]
    async fn test_collects_stdout_and_streams_stderr() {
        let tool = sh("echo out-1; echo err-1 >&2; echo out-2; echo err-2 >&2");
        let mut seen = Vec::new();

        let output = run_tool(PipelineStage::Analysis, &tool, &[], &[], |line| {
            seen.push(line.to_string())
        })
        .await
        .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, vec!["out-1", "out-2"]);
        assert_eq!(seen, vec!["err-1", "err-2"]);
        assert_eq!(output.stderr_tail(), "err-1\nerr-2");
    }

    #[tokio::test]
    async fn test_appends_positional_args_and_env() {
        let tool = sh("echo \"$0|$1|$FRAMEWATCH_TEST_TOKEN\"");
        let args = vec![OsString::from("first"), OsString::from("second")];
        let envs = vec![("FRAMEWATCH_TEST_TOKEN".to_string(), "secret".to_string())];

        let output = run_tool(PipelineStage::Extraction, &tool, &args, &envs, |_| {})
            .await
            .unwrap();

        assert_eq!(output.stdout, vec!["first|second|secret"]);
    }

    #[tokio::test]
    async fn test_non_zero_exit_error_carries_stderr() {
        let tool = sh("echo 'Error: Video file not found' >&2; exit 3");

        let output = run_tool(PipelineStage::Annotation, &tool, &[], &[], |_| {})
            .await
            .unwrap();

        assert!(!output.success());
        let err = output.exit_error(PipelineStage::Annotation, &tool);
        assert!(matches!(err, PipelineError::Annotation { .. }));
        assert!(err.to_string().contains("Video file not found"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let tool = ToolCommand::new("framewatch-no-such-program");

        let err = run_tool(PipelineStage::Transcode, &tool, &[], &[], |_| {})
            .await
            .unwrap_err();

        match err {
            PipelineError::ProcessSpawn { program, stage, .. } => {
                assert_eq!(program, "framewatch-no-such-program");
                assert_eq!(stage, PipelineStage::Transcode);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_on_stderr_keeps_reading() {
        let tool = sh(
            "printf 'Loading video: \\377\\376\\n' >&2; \
             echo 'Progress: 50.0% (45/90 frames)' >&2; \
             echo done-out",
        );
        let mut seen = Vec::new();

        let output = run_tool(PipelineStage::Annotation, &tool, &[], &[], |line| {
            seen.push(line.to_string())
        })
        .await
        .unwrap();

        assert!(output.success(), "status: {}", output.status);
        assert_eq!(seen.len(), 2);
        assert!(seen[0].starts_with("Loading video: "));
        assert!(seen[0].contains('\u{FFFD}'));
        let progress = crate::infrastructure::adapters::process::parse_progress_line(&seen[1]);
        assert_eq!(progress.unwrap().frame_idx, 45);
        assert_eq!(output.stdout, vec!["done-out"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_on_stdout_is_lossy() {
        let tool = sh("printf 'bad \\377\\n'; echo /tmp/result.json");

        let output = run_tool(PipelineStage::Analysis, &tool, &[], &[], |_| {})
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, vec!["bad \u{FFFD}", "/tmp/result.json"]);
    }
}
