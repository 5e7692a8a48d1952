mod error;
mod model;
mod parser;
mod poller;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use coach_common::api::{is_supported_video, ApiClient, ApiClientConfig};

use error::AppError;
use session::SessionController;

/// Upload a swim video for analysis and print the coaching report.
#[derive(Debug, Parser)]
#[command(name = "stroke-coach", version)]
struct Cli {
    /// Path to the swim video (.mp4, .avi or .mov)
    video: PathBuf,

    /// Analysis service base URL (overrides COACH_API_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Tracing to stderr; stdout carries the report itself.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    let mut config = ApiClientConfig::from_env();
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url.trim_end_matches('/').to_string();
    }
    info!(base_url = %config.base_url, "configuration loaded");

    if !is_supported_video(&cli.video) {
        return Err(AppError::UnsupportedVideo(cli.video.display().to_string()).into());
    }

    let client = Arc::new(ApiClient::new(config)?);

    info!(video = %cli.video.display(), "uploading video");
    let upload = client.upload_video(&cli.video).await?;
    info!(job_id = %upload.video_id, "upload accepted, analysis started");

    let controller = SessionController::new(Arc::clone(&client));
    let report = controller
        .track(&upload.video_id, |snapshot| {
            info!(
                progress = snapshot.progress,
                message = %snapshot.message,
                "analysis progress"
            );
        })
        .await?;

    println!("{}", report.render_text());
    println!();
    println!(
        "Annotated video: {}",
        client.annotated_video_url(&upload.video_id)
    );
    Ok(())
}
