use coach_common::error::ApiError;

/// Application errors for the coaching client. API-boundary failures wrap
/// `ApiError`; everything else is a consumer-visible workflow state.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("unsupported video type: {0} (allowed: MP4, AVI, MOV)")]
    UnsupportedVideo(String),

    #[error("analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("progress tracking was cancelled")]
    Cancelled,
}
