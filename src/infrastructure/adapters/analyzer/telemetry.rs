//! Analyzer Telemetry - 从分析进程 stderr 提取观测信息
//!
//! 识别的行:
//! - `Using model: <model>`
//! - `Fallback configured: OpenRouter with model <model>`
//! - `Processing batch <n>/<m> ...`
//! - `Fallback successful`
//! - `Batch <n> complete: ...`
//! - `Batch <n> failed ...` / `Error processing batch <n>: ...`

use regex::Regex;
use std::sync::LazyLock;

use crate::application::ports::{AnalyzerTelemetry, BatchProvider, BatchRecord};

static RE_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Using model:\s*(\S+)").expect("valid model regex"));

static RE_FALLBACK_MODEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Fallback configured:.*\bmodel\s+(\S+)").expect("valid fallback regex")
});

static RE_BATCH_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Processing batch\s+(\d+)/(\d+)").expect("valid batch start regex")
});

static RE_BATCH_DONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Batch\s+(\d+)\s+complete").expect("valid batch done regex"));

static RE_BATCH_FAILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:Batch\s+(\d+)\s+failed|Error processing batch\s+(\d+))")
        .expect("valid batch failed regex")
});

/// 逐行累积遥测数据
#[derive(Debug, Default)]
pub struct TelemetryCollector {
    telemetry: AnalyzerTelemetry,
    current_batch: Option<u32>,
    fallback_used: bool,
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, line: &str) {
        let line = line.trim();

        if let Some(c) = RE_BATCH_START.captures(line) {
            self.current_batch = c.get(1).and_then(|m| m.as_str().parse().ok());
            self.telemetry.total_batches = c.get(2).and_then(|m| m.as_str().parse().ok());
            self.fallback_used = false;
        } else if line.starts_with("Fallback successful") {
            self.fallback_used = true;
        } else if let Some(c) = RE_BATCH_DONE.captures(line) {
            let provider = if self.fallback_used {
                BatchProvider::Fallback
            } else {
                BatchProvider::Primary
            };
            self.record(c.get(1).and_then(|m| m.as_str().parse().ok()), provider);
        } else if let Some(c) = RE_BATCH_FAILED.captures(line) {
            let batch = c
                .get(1)
                .or_else(|| c.get(2))
                .and_then(|m| m.as_str().parse().ok());
            self.record(batch, BatchProvider::Failed);
        } else if let Some(c) = RE_MODEL.captures(line) {
            self.telemetry.model = c.get(1).map(|m| m.as_str().to_string());
        } else if let Some(c) = RE_FALLBACK_MODEL.captures(line) {
            self.telemetry.fallback_model = c.get(1).map(|m| m.as_str().to_string());
        }
    }

    fn record(&mut self, batch: Option<u32>, provider: BatchProvider) {
        let Some(batch) = batch.or(self.current_batch) else {
            return;
        };
        if provider == BatchProvider::Fallback {
            tracing::info!(batch, "Analysis batch served by fallback provider");
        }
        self.telemetry.batches.push(BatchRecord { batch, provider });
        self.fallback_used = false;
    }

    pub fn finish(self) -> AnalyzerTelemetry {
        self.telemetry
    }
}
