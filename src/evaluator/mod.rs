pub mod evaluation;
pub mod rules;
pub mod vector;

pub use evaluation::{clamp_score, Evaluation, Level, RadarEntry};
pub use rules::evaluate_by_rules;
pub use vector::{BodyRegion, VectorEvaluator};

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::classifier::is_rule_exercise;
use crate::config::{Config, EvaluatorConfig};
use crate::pose::{Landmark, Normalizer, Pose};
use crate::reference::ReferenceLibrary;

/// 参照未登録時の暫定スコア
const PLACEHOLDER_SCORE: f32 = 50.0;

/// ラベルに応じて評価器を選ぶ
///
/// 1. 参照ライブラリにあればベクトル評価
/// 2. 旧カタログにあり `rule_fallback` が有効なら角度評価
/// 3. 旧カタログにのみあるなら暫定評価（Accuracy 50）
/// 4. それ以外は `None`
pub struct PoseEvaluator {
    library: Arc<ReferenceLibrary>,
    normalizer: Normalizer,
    vector: VectorEvaluator,
    config: EvaluatorConfig,
}

impl PoseEvaluator {
    pub fn new(library: Arc<ReferenceLibrary>, config: &Config) -> Self {
        Self {
            library,
            normalizer: Normalizer::from_config(&config.normalize),
            vector: VectorEvaluator::new(config.evaluator.clone()),
            config: config.evaluator.clone(),
        }
    }

    pub fn with_defaults(library: Arc<ReferenceLibrary>) -> Self {
        Self::new(library, &Config::default())
    }

    /// 1フレームを指定ラベルで評価する
    ///
    /// ランドマーク数が不正、またはアンカーが見えないフレームは `None`。
    pub fn evaluate(&self, landmarks: &[Landmark], label: &str) -> Option<Evaluation> {
        let pose = Pose::from_slice(landmarks).ok()?;

        if let Some((anchor, variation)) = self.library.resolve(label) {
            let vector = self.normalizer.normalize_pose(&pose)?;
            return Some(self.vector.evaluate(&pose, &vector, anchor, variation));
        }

        if !is_rule_exercise(label) {
            return None;
        }
        if self.config.rule_fallback {
            return evaluate_by_rules(&pose, label, &self.config);
        }
        Some(placeholder(label))
    }
}

fn placeholder(label: &str) -> Evaluation {
    let mut indicators = BTreeMap::new();
    indicators.insert("Accuracy".to_string(), PLACEHOLDER_SCORE);
    Evaluation {
        pose: label.to_string(),
        indicators,
        feedback: vec![format!(
            "No reference captured for {}. Record a reference pose to enable scoring.",
            label
        )],
        radar: vec![RadarEntry::new("Accuracy", PLACEHOLDER_SCORE)],
        global_score: PLACEHOLDER_SCORE,
        level: Level::Beginner,
        detected_variant: None,
    }
}
