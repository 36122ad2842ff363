use anyhow::{bail, Context, Result};
use std::io::{self, Write};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pose_coach::config::Config;
use pose_coach::recommend::RecommendationEngine;
use pose_coach::reference::ReferenceLibrary;
use pose_coach::replay::Recording;
use pose_coach::sequence::SequenceAnalyzer;

const CONFIG_PATH: &str = "config.toml";

// Usage: analyze_session <recording.json>
fn parse_recording_arg() -> Result<String> {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1) {
        Some(path) => Ok(path.clone()),
        None => bail!("usage: analyze_session <recording.json>"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let path = parse_recording_arg()?;
    let config = Config::load_or_default(CONFIG_PATH);
    let library = Arc::new(ReferenceLibrary::load_or_builtin(
        config.data.reference_poses.as_deref(),
    )?);
    let recommender = Arc::new(RecommendationEngine::load_or_builtin(
        config.data.recommendations.as_deref(),
    )?);

    let recording = Recording::load(&path)?;
    let video_name = recording.video_name.clone().unwrap_or_else(|| path.clone());
    let (mut source, mut detector) = recording.into_replay();

    // Ctrl-C でフレーム間に中断
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling analysis");
            on_signal.cancel();
        }
    });

    let analyzer = SequenceAnalyzer::new(library, recommender, config);
    let mut last = 0u8;
    let mut report = analyzer
        .analyze(&mut source, &mut detector, &cancel, |progress| {
            if progress >= last.saturating_add(10) || progress == 100 {
                info!(progress, "extracting frames");
                last = progress;
            }
        })
        .await
        .with_context(|| format!("Failed to analyze {}", path))?;
    report.video_name = Some(video_name);

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &report)?;
    writeln!(stdout)?;
    Ok(())
}
