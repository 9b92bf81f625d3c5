//! Frames Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FramesError {
    #[error("manifest not found: {0}")]
    ManifestMissing(String),

    #[error("manifest is not valid JSON: {0}")]
    ManifestInvalid(String),

    #[error("manifest lists {listed} frames but saved_count is {saved_count}")]
    CountMismatch { saved_count: u64, listed: usize },

    #[error("manifest saved_count {saved_count} exceeds sampling limit {limit}")]
    TooManyFrames { saved_count: u64, limit: u64 },
}
