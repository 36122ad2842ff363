use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 習熟度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    /// スコアから習熟度を決める（しきい値は以上判定）
    pub fn from_score(score: f32, advanced: f32, intermediate: f32) -> Self {
        if score >= advanced {
            Level::Advanced
        } else if score >= intermediate {
            Level::Intermediate
        } else {
            Level::Beginner
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
        }
    }
}

/// レーダーチャート1軸
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarEntry {
    pub subject: String,
    pub score: f32,
}

impl RadarEntry {
    pub fn new(subject: impl Into<String>, score: f32) -> Self {
        Self {
            subject: subject.into(),
            score,
        }
    }
}

/// 1フレームの評価結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub pose: String,
    /// 指標名 → 0〜100
    pub indicators: BTreeMap<String, f32>,
    pub feedback: Vec<String>,
    pub radar: Vec<RadarEntry>,
    pub global_score: f32,
    pub level: Level,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_variant: Option<String>,
}

impl Evaluation {
    /// 最もスコアの低い指標
    pub fn weakest_indicator(&self) -> Option<(&str, f32)> {
        self.indicators
            .iter()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, v)| (k.as_str(), *v))
    }
}

/// 0〜100 に丸め込む
pub fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}
