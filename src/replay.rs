//! 記録済みセッションの再生
//!
//! 検出済みランドマークの時系列を JSON で保存しておき、
//! `VideoSource` + `LandmarkDetector` として解析器に流し直す。

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::pose::{Landmark, LandmarkDetector, VideoSource};

// --- データ構造 ---

/// 1サンプル分の検出結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub time: f64,
    /// 人物が検出されなかったフレームは null
    #[serde(default)]
    pub landmarks: Option<Vec<Landmark>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// 1本の動画の記録
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_name: Option<String>,
    /// 動画の長さ（秒）
    pub duration: Option<f64>,
    pub frames: Vec<RecordedFrame>,
}

// --- Save / Load ---

impl Recording {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read recording {}", path.display()))?;
        let recording: Recording = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse recording {}", path.display()))?;
        Ok(recording)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json).context("Failed to write recording")?;
        Ok(())
    }

    /// 指定時刻に最も近いフレームの番号
    pub fn nearest(&self, time: f64) -> Option<usize> {
        self.frames
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1.time - time).abs().total_cmp(&(b.1.time - time).abs()))
            .map(|(i, _)| i)
    }

    /// 再生用のソースと検出器の組
    pub fn into_replay(self) -> (ReplaySource, ReplayDetector) {
        let recording = Arc::new(self);
        (
            ReplaySource {
                recording: recording.clone(),
            },
            ReplayDetector::new(recording),
        )
    }
}

// --- 再生 ---

/// 記録を動画ソースとして扱う（シーク結果はフレーム番号）
pub struct ReplaySource {
    recording: Arc<Recording>,
}

impl VideoSource for ReplaySource {
    type Image = usize;

    fn duration(&self) -> Option<f64> {
        self.recording.duration
    }

    async fn seek(&mut self, time: f64) -> Result<usize> {
        match self.recording.nearest(time) {
            Some(index) => Ok(index),
            None => bail!("recording has no frames"),
        }
    }

    fn thumbnail(&self, image: &usize) -> Option<String> {
        self.recording.frames.get(*image)?.thumbnail.clone()
    }
}

/// 記録済みランドマークを返す検出器
pub struct ReplayDetector {
    recording: Arc<Recording>,
    ready: bool,
    delay: Option<Duration>,
}

impl ReplayDetector {
    pub fn new(recording: Arc<Recording>) -> Self {
        Self {
            recording,
            ready: true,
            delay: None,
        }
    }

    /// 推論時間を模した遅延
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// モデル未読み込みの状態にする
    pub fn unavailable(mut self) -> Self {
        self.ready = false;
        self
    }
}

impl LandmarkDetector<usize> for ReplayDetector {
    async fn detect(&mut self, image: &usize) -> Result<Option<Vec<Landmark>>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let frame = self
            .recording
            .frames
            .get(*image)
            .with_context(|| format!("frame {} out of range", image))?;
        Ok(frame.landmarks.clone())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> Recording {
        Recording {
            video_name: Some("session.mp4".into()),
            duration: Some(1.5),
            frames: vec![
                RecordedFrame {
                    time: 0.0,
                    landmarks: None,
                    thumbnail: None,
                },
                RecordedFrame {
                    time: 0.5,
                    landmarks: Some(vec![Landmark::new(0.1, 0.2, 0.0, 0.9)]),
                    thumbnail: Some("thumb-0.5".into()),
                },
                RecordedFrame {
                    time: 1.0,
                    landmarks: None,
                    thumbnail: None,
                },
            ],
        }
    }

    #[test]
    fn test_nearest_frame() {
        let r = recording();
        assert_eq!(r.nearest(0.0), Some(0));
        assert_eq!(r.nearest(0.6), Some(1));
        assert_eq!(r.nearest(9.0), Some(2));
        assert_eq!(Recording::default().nearest(0.0), None);
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "duration": 1.0,
            "frames": [
                {"time": 0.0, "landmarks": null},
                {"time": 0.5, "landmarks": [{"x": 0.1, "y": 0.2}]}
            ]
        }"#;
        let r: Recording = serde_json::from_str(json).unwrap();
        assert_eq!(r.video_name, None);
        assert_eq!(r.frames.len(), 2);
        let lm = r.frames[1].landmarks.as_ref().unwrap()[0];
        assert_eq!(lm.z, 0.0);
    }

    #[tokio::test]
    async fn test_replay_pair() {
        let (mut source, mut detector) = recording().into_replay();
        assert_eq!(source.duration(), Some(1.5));
        let image = source.seek(0.4).await.unwrap();
        assert_eq!(image, 1);
        assert_eq!(source.thumbnail(&image).as_deref(), Some("thumb-0.5"));
        let landmarks = detector.detect(&image).await.unwrap().unwrap();
        assert_eq!(landmarks.len(), 1);
        assert!(detector.detect(&0).await.unwrap().is_none());
        assert!(detector.detect(&7).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_recording_seek_fails() {
        let (mut source, _) = Recording::default().into_replay();
        assert!(source.seek(0.0).await.is_err());
    }
}
