//! Framewatch - 视频人物检测流水线
//!
//! 对每个输入视频执行: 提示词优化 → 抽帧 → 帧分析 → 标注 → 转码 → 清理，
//! 结果以 JSON 输出到 stdout，日志输出到 stderr

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use framewatch::application::{ChatCompletionPort, PipelineCoordinator, ProcessVideoCommand};
use framewatch::config::{load_config_from_path, print_config, AppConfig, LogConfig, ProviderConfig};
use framewatch::infrastructure::adapters::{
    FallbackChatClient, FfmpegTranscoder, HttpChatClient, HttpChatClientConfig, LlmPromptRefiner,
    ProcessFrameAnalyzer, ProcessFrameExtractor, ProcessVideoAnnotator, PromptRefinerConfig,
};
use framewatch::infrastructure::events::{next_job_event, EventPublisher, JobEvent};
use framewatch::infrastructure::worker::{PipelineJob, PipelineWorker, PipelineWorkerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 输入视频
    #[arg(required = true)]
    videos: Vec<PathBuf>,

    /// 检测任务描述，例如 "find people who look surprised"
    #[arg(short, long)]
    task: String,

    /// 任务描述已优化过，跳过提示词优化
    #[arg(long)]
    skip_refinement: bool,

    /// 标注视频输出路径（只支持单个视频）
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 保留会话帧目录
    #[arg(long)]
    keep_intermediate: bool,
}

fn init_logging(log: &LogConfig) {
    let log_filter = format!("{},framewatch={}", log.level, log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn chat_client(provider: &ProviderConfig, timeout_secs: u64) -> Result<HttpChatClient> {
    let config = HttpChatClientConfig::new(&provider.name, &provider.base_url)
        .with_api_key(provider.api_key.clone())
        .with_model(&provider.model)
        .with_timeout(timeout_secs);
    Ok(HttpChatClient::new(config)?)
}

fn build_coordinator(config: &AppConfig) -> Result<PipelineCoordinator> {
    let primary: Arc<dyn ChatCompletionPort> =
        Arc::new(chat_client(&config.llm.primary, config.llm.timeout_secs)?);
    let fallback: Option<Arc<dyn ChatCompletionPort>> = if config.llm.fallback.has_credentials() {
        Some(Arc::new(chat_client(
            &config.llm.fallback,
            config.llm.timeout_secs,
        )?))
    } else {
        tracing::warn!("No fallback provider credentials, quota errors will not fail over");
        None
    };
    let chat = Arc::new(FallbackChatClient::new(primary, fallback));

    let refiner = LlmPromptRefiner::new(
        chat,
        PromptRefinerConfig {
            model: config.llm.refine_model.clone(),
            max_tokens: config.llm.max_tokens,
            ..Default::default()
        },
    );

    Ok(PipelineCoordinator::new(
        Arc::new(refiner),
        Arc::new(ProcessFrameExtractor::new(config.tools.extractor.clone())),
        Arc::new(ProcessFrameAnalyzer::new(
            config.tools.analyzer.clone(),
            config.llm.child_env(),
        )),
        Arc::new(ProcessVideoAnnotator::new(config.tools.annotator.clone())),
        Arc::new(FfmpegTranscoder::new(
            config.tools.encoder.clone(),
            config.transcode.clone(),
        )),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config_from_path(args.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_logging(&config.log);
    tracing::info!("Framewatch - 视频人物检测流水线");
    print_config(&config);

    if args.output.is_some() && args.videos.len() > 1 {
        anyhow::bail!("--output can only be used with a single video");
    }

    tokio::fs::create_dir_all(&config.pipeline.work_dir).await?;

    let coordinator = Arc::new(build_coordinator(&config)?);
    let event_publisher = EventPublisher::new().arc();

    let (job_tx, job_rx) = mpsc::channel(config.worker.queue_capacity.max(1));
    let worker = PipelineWorker::new(
        PipelineWorkerConfig {
            max_concurrent: config.worker.max_concurrent,
        },
        job_rx,
        coordinator,
        event_publisher.clone(),
    );
    let worker_handle = tokio::spawn(worker.run());

    let mut options = config.pipeline.to_pipeline_options();
    options.keep_intermediate_files |= args.keep_intermediate;

    let mut pending = Vec::with_capacity(args.videos.len());
    for video in &args.videos {
        let mut command = ProcessVideoCommand::new(video, &args.task)
            .with_options(options.clone())
            .skip_refinement(args.skip_refinement);
        if let Some(output) = &args.output {
            command = command.with_output_path(output);
        }

        let (job, result_rx) = PipelineJob::new(command).with_reply();
        let job_id = job.job_id.clone();

        // 把状态事件转成进度日志
        let mut events = event_publisher.register_job(&job_id);
        let video_name = video.display().to_string();
        tokio::spawn(async move {
            while let Some(event) = next_job_event(&mut events).await {
                match event {
                    JobEvent::StatusChanged { event, .. } => {
                        tracing::info!(
                            video = %video_name,
                            status = %event.status,
                            stage = event.stage,
                            details = %event.details,
                            "Status"
                        );
                    }
                    JobEvent::Finished { .. } => break,
                }
            }
        });

        job_tx.send(job).await?;
        pending.push((job_id, result_rx));
    }
    drop(job_tx);

    let mut failed = 0usize;
    for (job_id, result_rx) in pending {
        let result = result_rx.await?;
        event_publisher.unregister_job(&job_id);
        if !result.success {
            failed += 1;
        }
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    worker_handle.await?;

    if failed > 0 {
        anyhow::bail!("{} of {} pipeline runs failed", failed, args.videos.len());
    }

    Ok(())
}
