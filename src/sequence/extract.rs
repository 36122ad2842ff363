use anyhow::Context;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SequenceConfig;
use crate::error::{PoseError, Result};
use crate::pose::{average_visibility, Landmark, LandmarkDetector, LandmarkIndex, VideoSource};

/// 人物が検出できたサンプルフレーム
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFrame {
    pub time: f64,
    pub landmarks: Vec<Landmark>,
    /// 全ランドマークの平均可視度
    pub visibility: f32,
    pub thumbnail: Option<String>,
}

impl ExtractedFrame {
    pub fn new(time: f64, landmarks: Vec<Landmark>) -> Self {
        let visibility = average_visibility(&landmarks);
        Self {
            time,
            landmarks,
            visibility,
            thumbnail: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }
}

/// サンプリング時刻 0, Δ, 2Δ, ... (< duration)
pub fn sample_times(duration: f64, interval: f64) -> impl Iterator<Item = f64> {
    let interval = if interval > 0.0 { interval } else { 0.5 };
    (0u64..)
        .map(move |i| i as f64 * interval)
        .take_while(move |&t| t < duration)
}

/// 1フレームの処理時間の上限
fn frame_timeout(config: &SequenceConfig) -> Duration {
    Duration::try_from_secs_f64(config.frame_timeout)
        .ok()
        .filter(|d| !d.is_zero())
        .unwrap_or(Duration::from_secs(3))
}

/// 動画を一定間隔でシークし、人物が写っているフレームだけを集める
///
/// シーク失敗・検出失敗・タイムアウトのフレームは警告を出して飛ばす。
/// 中断はシークの前に確認し、`PoseError::Cancelled` を返す。
pub async fn extract_frames<S, D, F>(
    source: &mut S,
    detector: &mut D,
    duration: f64,
    config: &SequenceConfig,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<Vec<ExtractedFrame>>
where
    S: VideoSource,
    D: LandmarkDetector<S::Image>,
    F: FnMut(u8),
{
    let timeout = frame_timeout(config);
    let mut frames = Vec::new();
    let mut skipped = 0usize;

    for time in sample_times(duration, config.sample_interval) {
        if cancel.is_cancelled() {
            return Err(PoseError::Cancelled);
        }

        let step = async {
            let image = source
                .seek(time)
                .await
                .with_context(|| format!("seek to {:.2}s failed", time))?;
            let landmarks = detector
                .detect(&image)
                .await
                .with_context(|| format!("detection at {:.2}s failed", time))?;
            anyhow::Ok(landmarks.map(|l| (l, source.thumbnail(&image))))
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PoseError::Cancelled),
            outcome = tokio::time::timeout(timeout, step) => outcome,
        };

        match outcome {
            Ok(Ok(Some((landmarks, thumbnail)))) => {
                if landmarks.len() != LandmarkIndex::COUNT {
                    warn!(time, got = landmarks.len(), "wrong landmark count, skipping frame");
                    skipped += 1;
                } else {
                    let mut frame = ExtractedFrame::new(time, landmarks);
                    frame.thumbnail = thumbnail;
                    frames.push(frame);
                }
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                warn!("{:#}, skipping frame", e);
                skipped += 1;
            }
            Err(_) => {
                warn!(time, "frame timed out, skipping");
                skipped += 1;
            }
        }

        let progress = ((time + config.sample_interval) / duration * 100.0).round();
        on_progress(progress.clamp(0.0, 100.0) as u8);
    }

    debug!(kept = frames.len(), skipped, "frame extraction done");
    Ok(frames)
}
