//! バッチ解析の出力（JSON でそのまま UI に渡す）

use serde::Serialize;
use std::collections::BTreeMap;

use crate::evaluator::Level;
use crate::recommend::Recommendation;

/// セグメント内の動きの質（0〜100）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DynamicMetrics {
    pub stability: u32,
    pub endurance: u32,
    pub fluidity: u32,
}

/// 1セグメント（同じポーズが続いた区間）の評価
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentResult {
    pub pose: String,
    /// `M:SS`
    pub start_time: String,
    pub end_time: String,
    /// 小数1桁
    pub duration_sec: f64,
    /// 区間内の分類スコア最大値
    pub confidence: f32,
    pub key_frame: Option<String>,
    pub global_score: u32,
    /// 評価できるフレームがなければ None（"N/A"）
    pub level: Option<Level>,
    pub detected_variant: Option<String>,
    /// 指標ごとのベストフレーム平均
    pub score: BTreeMap<String, u32>,
    pub feedback: Vec<String>,
    pub apex_timestamp: Option<f64>,
    pub dynamic_metrics: DynamicMetrics,
}

impl SegmentResult {
    /// 指標の平均（指標がなければ None）
    pub fn mean_score(&self) -> Option<f32> {
        if self.score.is_empty() {
            return None;
        }
        let sum: u32 = self.score.values().sum();
        Some(sum as f32 / self.score.len() as f32)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseScore {
    pub name: String,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdvancedMetrics {
    pub consistency: u32,
    pub stability: u32,
    pub endurance: u32,
    pub fluidity: u32,
}

/// セッション全体のまとめ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub scores: BTreeMap<String, u32>,
    pub weakest_indicator: String,
    pub best_poses: Vec<PoseScore>,
    pub worst_poses: Vec<PoseScore>,
    pub feedback: String,
    pub recommendation: Option<Recommendation>,
    pub total_poses: usize,
    pub global_score: u32,
    pub level: Level,
    pub advanced_metrics: AdvancedMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceReport {
    pub video_name: Option<String>,
    pub posture_sequence: Vec<SegmentResult>,
    pub session_summary: SessionSummary,
}

/// 秒 → `M:SS`
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// 小数1桁に丸める
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// 0〜100 のスコアを整数に丸める
pub(crate) fn round_score(value: f32) -> u32 {
    crate::evaluator::clamp_score(value).round() as u32
}
