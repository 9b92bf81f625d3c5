//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（framewatch.toml）
//! 3. 默认值

use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, ProviderConfig};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["framewatch", "framewatch.local"];

/// 加载应用配置
///
/// # 环境变量示例
/// - `FRAMEWATCH_PIPELINE__FRAME_INTERVAL=15`
/// - `FRAMEWATCH_TOOLS__ENCODER__PROGRAM=/usr/local/bin/ffmpeg`
/// - `FRAMEWATCH_LLM__PRIMARY__MODEL=Qwen/Qwen2.5-VL-7B-Instruct`
/// - `FRAMEWATCH_WORKER__MAX_CONCURRENT=4`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("pipeline.work_dir", "data/work")?
        .set_default("pipeline.frame_interval", 30)?
        .set_default("pipeline.batch_size", 2)?
        .set_default("pipeline.keep_intermediate_files", false)?
        .set_default("pipeline.annotation_enabled", true)?
        .set_default("pipeline.transcode_enabled", true)?
        .set_default("llm.timeout_secs", 60)?
        .set_default("llm.max_tokens", 256)?
        .set_default("worker.max_concurrent", 2)?
        .set_default("worker.queue_capacity", 100)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // provider 按字段设置默认值，部分覆盖（例如只改 model）时其余字段沿用预设
    builder = provider_defaults(builder, "llm.primary", &ProviderConfig::huggingface())?;
    builder = provider_defaults(builder, "llm.fallback", &ProviderConfig::openrouter())?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 前缀: FRAMEWATCH_，层级分隔符: __
    builder = builder.add_source(
        Environment::with_prefix("FRAMEWATCH")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let mut app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    // 4. 凭据只在加载时读取一次
    resolve_credentials(&mut app_config, |name| std::env::var(name).ok());

    validate_config(&app_config)?;

    Ok(app_config)
}

fn provider_defaults(
    builder: ConfigBuilder<DefaultState>,
    prefix: &str,
    preset: &ProviderConfig,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder
        .set_default(format!("{prefix}.name"), preset.name.as_str())?
        .set_default(format!("{prefix}.base_url"), preset.base_url.as_str())?
        .set_default(format!("{prefix}.model"), preset.model.as_str())?
        .set_default(
            format!("{prefix}.credential_env"),
            preset.credential_env.as_str(),
        )?)
}

/// 未显式配置 api_key 的 provider 从各自的凭据环境变量读取
fn resolve_credentials<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for provider in [&mut config.llm.primary, &mut config.llm.fallback] {
        if provider.has_credentials() {
            continue;
        }
        provider.api_key = lookup(&provider.credential_env).filter(|k| !k.is_empty());
    }
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.pipeline.frame_interval == 0 {
        return Err(ConfigError::ValidationError(
            "Frame interval cannot be 0".to_string(),
        ));
    }

    if config.pipeline.batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "Batch size cannot be 0".to_string(),
        ));
    }

    if config.pipeline.max_frames == Some(0) {
        return Err(ConfigError::ValidationError(
            "Max frames cannot be 0 (omit it for no limit)".to_string(),
        ));
    }

    if config.worker.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "Worker concurrency cannot be 0".to_string(),
        ));
    }

    let tools = [
        ("extractor", &config.tools.extractor),
        ("analyzer", &config.tools.analyzer),
        ("annotator", &config.tools.annotator),
        ("encoder", &config.tools.encoder),
    ];
    for (name, tool) in tools {
        if tool.program.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Program for tool '{}' cannot be empty",
                name
            )));
        }
    }

    for provider in [&config.llm.primary, &config.llm.fallback] {
        if provider.base_url.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Base URL for provider '{}' cannot be empty",
                provider.name
            )));
        }
    }

    Ok(())
}

fn credential_state(provider: &ProviderConfig) -> &'static str {
    if provider.has_credentials() {
        "set"
    } else {
        "unset"
    }
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Framewatch Configuration ===");
    tracing::info!("Work Directory: {:?}", config.pipeline.work_dir);
    tracing::info!(
        "Sampling: every {} frames, max {:?}",
        config.pipeline.frame_interval,
        config.pipeline.max_frames
    );
    tracing::info!("Batch Size: {}", config.pipeline.batch_size);
    tracing::info!(
        "Keep Intermediate Files: {}",
        config.pipeline.keep_intermediate_files
    );
    tracing::info!(
        "Annotation: {}, Transcode: {}",
        config.pipeline.annotation_enabled,
        config.pipeline.transcode_enabled
    );
    tracing::info!("Extractor: {}", config.tools.extractor.display());
    tracing::info!("Analyzer: {}", config.tools.analyzer.display());
    tracing::info!("Annotator: {}", config.tools.annotator.display());
    tracing::info!("Encoder: {}", config.tools.encoder.display());
    tracing::info!(
        "Primary LLM: {} ({}, key {})",
        config.llm.primary.name,
        config.llm.primary.model,
        credential_state(&config.llm.primary)
    );
    tracing::info!(
        "Fallback LLM: {} ({}, key {})",
        config.llm.fallback.name,
        config.llm.fallback.model,
        credential_state(&config.llm.fallback)
    );
    tracing::info!("Worker Concurrency: {}", config.worker.max_concurrent);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_interval() {
        let mut config = AppConfig::default();
        config.pipeline.frame_interval = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_batch_size() {
        let mut config = AppConfig::default();
        config.pipeline.batch_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_concurrency() {
        let mut config = AppConfig::default();
        config.worker.max_concurrent = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_program() {
        let mut config = AppConfig::default();
        config.tools.annotator.program = "  ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("annotator"));
    }

    #[test]
    fn test_credentials_resolved_from_lookup() {
        let mut config = AppConfig::default();
        config.llm.fallback.api_key = Some("explicit".to_string());

        resolve_credentials(&mut config, |name| match name {
            "HF_TOKEN" => Some("hf_env".to_string()),
            "OPEN_ROUTER_API_KEY" => Some("or_env".to_string()),
            _ => None,
        });

        assert_eq!(config.llm.primary.api_key.as_deref(), Some("hf_env"));
        assert_eq!(config.llm.fallback.api_key.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("framewatch.toml");
        std::fs::write(
            &path,
            r#"
[pipeline]
frame_interval = 15
max_frames = 40

[tools.encoder]
program = "/opt/ffmpeg/bin/ffmpeg"
args = ["-hide_banner"]

[worker]
max_concurrent = 4
"#,
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();

        assert_eq!(config.pipeline.frame_interval, 15);
        assert_eq!(config.pipeline.max_frames, Some(40));
        assert_eq!(config.pipeline.batch_size, 2);
        assert_eq!(config.tools.encoder.program, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.tools.encoder.args, vec!["-hide_banner"]);
        assert_eq!(config.tools.analyzer.program, "python3");
        assert_eq!(config.worker.max_concurrent, 4);
    }

    #[test]
    fn test_partial_provider_override_keeps_preset() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("framewatch.toml");
        std::fs::write(
            &path,
            r#"
[llm.primary]
model = "Qwen/Qwen2.5-VL-72B-Instruct"
"#,
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();

        let primary = &config.llm.primary;
        let preset = ProviderConfig::huggingface();
        assert_eq!(primary.model, "Qwen/Qwen2.5-VL-72B-Instruct");
        assert_eq!(primary.name, preset.name);
        assert_eq!(primary.base_url, preset.base_url);
        assert_eq!(primary.credential_env, "HF_TOKEN");
        assert_eq!(config.llm.fallback.name, "openrouter");
        assert_eq!(config.llm.fallback.credential_env, "OPEN_ROUTER_API_KEY");
    }
}
