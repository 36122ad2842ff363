use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::buffer::SmoothingBuffer;
use crate::config::{ClassifierConfig, Config};
use crate::pose::{cosine_similarity, Landmark, LandmarkIndex, NormalizedVector, Normalizer};
use crate::reference::ReferenceLibrary;

/// 該当なしのラベル
pub const UNKNOWN_POSE: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Mode {
    #[default]
    Idle,
    Stable,
}

/// 分類器の内部状態（インスタンスごとに専有）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassifierState {
    pub mode: Mode,
    pub confirmed_pose: Option<String>,
    pub pending_pose: Option<String>,
    pub frames_stable: u32,
}

impl ClassifierState {
    fn decay(&mut self) {
        self.mode = Mode::Idle;
        self.pending_pose = None;
        self.frames_stable = 0;
    }
}

/// 1フレームの分類結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// しきい値判定後の名前（下限未満は "Unknown"）
    pub name: String,
    /// しきい値に関係なく最も近い参照ポーズ
    pub raw_name: String,
    pub score: f32,
    /// 確定済みかつ体幹が静止している
    pub is_steady: bool,
    pub velocity: f32,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_POSE.to_string(),
            raw_name: UNKNOWN_POSE.to_string(),
            score: 0.0,
            is_steady: false,
            velocity: 0.0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_POSE
    }
}

/// ベクトル類似度によるリアルタイム分類器
///
/// ジッタ除去のためEMAで平滑化し、同じ候補が `confirm_frames` 回続いたら確定する。
/// ライブ用とバッチ用でインスタンスを共有しないこと。
pub struct PoseClassifier {
    library: Arc<ReferenceLibrary>,
    normalizer: Normalizer,
    buffer: SmoothingBuffer,
    state: ClassifierState,
    config: ClassifierConfig,
}

impl PoseClassifier {
    pub fn new(library: Arc<ReferenceLibrary>, config: &Config) -> Self {
        Self {
            library,
            normalizer: Normalizer::from_config(&config.normalize),
            buffer: SmoothingBuffer::from_config(&config.smoothing),
            state: ClassifierState::default(),
            config: config.classifier.clone(),
        }
    }

    pub fn with_defaults(library: Arc<ReferenceLibrary>) -> Self {
        Self::new(library, &Config::default())
    }

    pub fn state(&self) -> &ClassifierState {
        &self.state
    }

    /// 1フレームを分類する。エラーは返さず、使えないフレームは "Unknown"
    pub fn classify(&mut self, landmarks: &[Landmark]) -> Classification {
        let vector = match self.normalizer.normalize(landmarks) {
            Ok(Some(v)) => v,
            Ok(None) => return Classification::unknown(),
            Err(e) => {
                debug!("frame rejected: {}", e);
                return Classification::unknown();
            }
        };

        self.buffer.add(&vector);
        let velocity = self.buffer.velocity(Some(&LandmarkIndex::CORE));
        let is_core_stable = velocity < self.config.core_velocity_threshold;

        let Some(smoothed) = self.buffer.average() else {
            return Classification::unknown();
        };
        let Some((best_name, score)) = best_match(&self.library, smoothed) else {
            self.state.decay();
            return Classification {
                velocity,
                ..Classification::unknown()
            };
        };
        let best_name = best_name.to_string();

        let name = if score >= self.config.match_threshold {
            self.advance(&best_name);
            best_name.clone()
        } else if score >= self.config.rescue_floor {
            self.state.decay();
            best_name.clone()
        } else {
            self.state.decay();
            UNKNOWN_POSE.to_string()
        };

        Classification {
            name,
            raw_name: best_name,
            score,
            is_steady: self.state.mode == Mode::Stable && is_core_stable,
            velocity,
        }
    }

    fn advance(&mut self, candidate: &str) {
        if self.state.pending_pose.as_deref() == Some(candidate) {
            self.state.frames_stable = self.state.frames_stable.saturating_add(1);
        } else {
            self.state.pending_pose = Some(candidate.to_string());
            self.state.frames_stable = 1;
            self.state.mode = Mode::Idle;
        }

        if self.state.frames_stable >= self.config.confirm_frames && self.state.mode != Mode::Stable {
            debug!(pose = candidate, "pose confirmed");
            self.state.confirmed_pose = Some(candidate.to_string());
            self.state.mode = Mode::Stable;
        }
    }

    /// 平滑化バッファと状態を初期化する（別の動画・セッションに使う前に呼ぶ）
    pub fn reset(&mut self) {
        self.buffer.reset();
        self.state = ClassifierState::default();
    }
}

/// 全アンカー＋バリエーション中の最高類似度（名前は親アンカー）
pub fn best_match<'a>(
    library: &'a ReferenceLibrary,
    vector: &NormalizedVector,
) -> Option<(&'a str, f32)> {
    let mut best: Option<(&str, f32)> = None;
    for anchor in library.anchors() {
        let candidates = std::iter::once(&anchor.vector)
            .chain(anchor.variations.iter().map(|v| &v.vector));
        for target in candidates {
            let score = cosine_similarity(vector.as_slice(), target.as_slice());
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((anchor.name.as_str(), score));
            }
        }
    }
    best
}
