/// HTTP client for the swim analysis service.
///
/// The service exposes three endpoints per uploaded video:
/// - `POST /api/upload` — multipart upload (field `video`), returns a job id
/// - `GET /api/status/{id}` — one progress snapshot per call
/// - `GET /api/result/{id}/report` — the final coaching report text
///
/// The report text is loosely formatted and parsed elsewhere; this module
/// only moves bytes and decodes the JSON envelopes.
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ApiError;

/// Video extensions the analysis service accepts.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["mp4", "avi", "mov"];

#[derive(Clone, Debug)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub default_timeout: Duration,
    pub max_error_body_bytes: usize,
}

impl ApiClientConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("COACH_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5001".to_string());

        let default_timeout = std::env::var("COACH_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        let max_error_body_bytes = std::env::var("COACH_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(8 * 1024);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_timeout,
            max_error_body_bytes,
        }
    }
}

/// Lifecycle state reported by the analysis service for one job.
///
/// The backend seeds a freshly uploaded job as `"queued"` before the worker
/// picks it up; that wire value maps onto `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[serde(alias = "queued")]
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One status/progress reading for a job at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub status: JobStatus,
    /// Percentage 0–100 as reported by the service; not required to be
    /// monotonic across snapshots.
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub message: String,
    /// Present only when `status` is `Failed`.
    #[serde(default)]
    pub error: Option<String>,
}

/// Response to a successful video upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Job identifier correlating the upload with its analysis session.
    pub video_id: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ReportEnvelope {
    report: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: Option<String>,
}

/// The slice of the analysis API consumed by the poller and session
/// controller. Kept as a trait so tests can script snapshot sequences
/// without a live service.
#[async_trait]
pub trait AnalysisApi: Send + Sync + 'static {
    async fn job_status(&self, job_id: &str) -> Result<ProgressSnapshot, ApiError>;

    async fn fetch_report(&self, job_id: &str) -> Result<String, ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    config: ApiClientConfig,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent("stroke-coach")
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// Fetch one progress snapshot for a job.
    pub async fn job_status(&self, job_id: &str) -> Result<ProgressSnapshot, ApiError> {
        let url = format!("{}/api/status/{job_id}", self.config.base_url);
        let resp = self
            .http
            .get(&url)
            .timeout(self.config.default_timeout)
            .send()
            .await?;
        Self::parse_json_response(resp, self.config.max_error_body_bytes).await
    }

    /// Fetch the final coaching report text for a completed job.
    pub async fn fetch_report(&self, job_id: &str) -> Result<String, ApiError> {
        let url = format!("{}/api/result/{job_id}/report", self.config.base_url);
        let resp = self
            .http
            .get(&url)
            .timeout(self.config.default_timeout)
            .send()
            .await?;
        let envelope: ReportEnvelope =
            Self::parse_json_response(resp, self.config.max_error_body_bytes).await?;
        Ok(envelope.report)
    }

    /// Upload a video for analysis. The returned `video_id` keys all
    /// subsequent status and result requests.
    pub async fn upload_video(&self, path: &Path) -> Result<UploadResponse, ApiError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video")
            .to_string();
        let media_type = media_type_for(path).unwrap_or("application/octet-stream");
        let bytes = tokio::fs::read(path).await?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(media_type)?;
        let form = reqwest::multipart::Form::new().part("video", part);

        let url = format!("{}/api/upload", self.config.base_url);
        let resp = self.http.post(&url).multipart(form).send().await?;
        Self::parse_json_response(resp, self.config.max_error_body_bytes).await
    }

    /// URL of the annotated result video, for display or download once the
    /// job completes.
    pub fn annotated_video_url(&self, job_id: &str) -> String {
        format!("{}/api/result/{job_id}/video", self.config.base_url)
    }

    async fn parse_json_response<T: for<'de> Deserialize<'de>>(
        resp: reqwest::Response,
        max_error_body_bytes: usize,
    ) -> Result<T, ApiError> {
        if resp.status().is_success() {
            let json = resp.json::<T>().await?;
            return Ok(json);
        }
        Err(Self::to_upstream_error(resp, max_error_body_bytes).await)
    }

    async fn to_upstream_error(resp: reqwest::Response, max_error_body_bytes: usize) -> ApiError {
        let status = resp.status();
        let body = read_limited_text(resp, max_error_body_bytes).await;
        if let Ok(parsed) = serde_json::from_str::<ApiErrorEnvelope>(&body) {
            if let Some(message) = parsed.error {
                return ApiError::Upstream { status, message };
            }
        }
        ApiError::UpstreamBody { status, body }
    }
}

#[async_trait]
impl AnalysisApi for ApiClient {
    async fn job_status(&self, job_id: &str) -> Result<ProgressSnapshot, ApiError> {
        ApiClient::job_status(self, job_id).await
    }

    async fn fetch_report(&self, job_id: &str) -> Result<String, ApiError> {
        ApiClient::fetch_report(self, job_id).await
    }
}

/// Client-side gate mirroring the service's allowed upload types.
pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

fn media_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "mp4" => Some("video/mp4"),
        "avi" => Some("video/avi"),
        "mov" => Some("video/quicktime"),
        _ => None,
    }
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            "<failed to read error body>".to_string()
        }
    }
}
