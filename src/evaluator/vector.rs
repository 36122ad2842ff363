use std::collections::BTreeMap;

use super::evaluation::{clamp_score, Evaluation, Level, RadarEntry};
use crate::classifier::rules::leg_angle;
use crate::config::EvaluatorConfig;
use crate::pose::{weighted_distance, LandmarkIndex, NormalizedVector, Pose};
use crate::reference::{GeometryCheck, ReferenceAnchor, Variation};

/// 部位グループ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRegion {
    UpperBody,
    Core,
    LowerBody,
}

impl BodyRegion {
    pub const ALL: [BodyRegion; 3] = [BodyRegion::UpperBody, BodyRegion::Core, BodyRegion::LowerBody];

    pub fn name(self) -> &'static str {
        match self {
            BodyRegion::UpperBody => "Upper Body",
            BodyRegion::Core => "Core",
            BodyRegion::LowerBody => "Lower Body",
        }
    }

    pub fn joints(self) -> &'static [LandmarkIndex] {
        use LandmarkIndex::*;
        match self {
            BodyRegion::UpperBody => &[
                LeftShoulder, RightShoulder, LeftElbow, RightElbow, LeftWrist, RightWrist,
            ],
            BodyRegion::Core => &[LeftHip, RightHip],
            BodyRegion::LowerBody => &[LeftKnee, RightKnee, LeftAnkle, RightAnkle],
        }
    }

    fn feedback(self) -> &'static str {
        match self {
            BodyRegion::UpperBody => "Align your arms and shoulders with the target position.",
            BodyRegion::Core => "Stabilize your pelvis and keep your hips level.",
            BodyRegion::LowerBody => "Adjust your legs to match the target form.",
        }
    }
}

const DEFAULT_TIP: &str = "Excellent form! Hold the position with control.";

/// 評価対象（基本形またはバリエーション）
struct Target<'a> {
    vector: &'a NormalizedVector,
    variation: Option<&'a Variation>,
}

/// 正規化ベクトルの部位距離による評価
#[derive(Debug, Clone)]
pub struct VectorEvaluator {
    config: EvaluatorConfig,
}

impl VectorEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    /// 部位ごとの平均関節距離 [Upper, Core, Lower]
    pub fn region_distances(user: &NormalizedVector, target: &NormalizedVector) -> [f32; 3] {
        BodyRegion::ALL.map(|r| weighted_distance(user.as_slice(), target.as_slice(), r.joints()))
    }

    fn total_distance(user: &NormalizedVector, target: &NormalizedVector) -> f32 {
        Self::region_distances(user, target).iter().sum::<f32>() / 3.0
    }

    pub fn distance_to_score(&self, distance: f32) -> f32 {
        clamp_score(100.0 - distance * self.config.distance_scale)
    }

    /// 基本形と全バリエーションのうち最も近いものを選ぶ（同距離なら要求された対象を優先）
    fn rescue_target<'a>(
        anchor: &'a ReferenceAnchor,
        requested: Option<&'a Variation>,
        user: &NormalizedVector,
    ) -> Target<'a> {
        let start = match requested {
            Some(v) => Target { vector: &v.vector, variation: Some(v) },
            None => Target { vector: &anchor.vector, variation: None },
        };
        let others = std::iter::once(Target { vector: &anchor.vector, variation: None }).chain(
            anchor
                .variations
                .iter()
                .map(|v| Target { vector: &v.vector, variation: Some(v) }),
        );

        let mut best_distance = Self::total_distance(user, start.vector);
        let mut best = start;
        for candidate in others {
            let d = Self::total_distance(user, candidate.vector);
            if d < best_distance {
                best_distance = d;
                best = candidate;
            }
        }
        best
    }

    pub fn evaluate(
        &self,
        pose: &Pose,
        user: &NormalizedVector,
        anchor: &ReferenceAnchor,
        requested: Option<&Variation>,
    ) -> Evaluation {
        let target = Self::rescue_target(anchor, requested, user);
        let distances = Self::region_distances(user, target.vector);
        let mean_distance = distances.iter().sum::<f32>() / distances.len() as f32;
        let global_score = self.distance_to_score(mean_distance);

        let mut indicators = BTreeMap::new();
        let mut radar = Vec::with_capacity(BodyRegion::ALL.len());
        let mut feedback = Vec::new();
        for (region, distance) in BodyRegion::ALL.iter().zip(distances) {
            let score = self.distance_to_score(distance);
            indicators.insert(region.name().to_string(), score);
            radar.push(RadarEntry::new(region.name(), score));
            if score < self.config.feedback_threshold {
                feedback.push(region.feedback().to_string());
            }
        }
        if feedback.is_empty() {
            feedback.push(anchor.tip.clone().unwrap_or_else(|| DEFAULT_TIP.to_string()));
        }

        let mut level = Level::from_score(
            global_score,
            self.config.advanced,
            self.config.intermediate,
        );
        if let Some(variation) = target.variation {
            if let Some(floor) = variation.min_level {
                if self.check_passes(variation.check, pose) {
                    level = level.max(floor);
                }
            }
        }

        Evaluation {
            pose: anchor.name.clone(),
            indicators,
            feedback,
            radar,
            global_score,
            level,
            detected_variant: target.variation.map(|v| v.name.clone()),
        }
    }

    fn check_passes(&self, check: Option<GeometryCheck>, pose: &Pose) -> bool {
        match check {
            None => true,
            Some(GeometryCheck::LegsExtended) => {
                let threshold = self.config.extended_leg_angle;
                leg_angle(pose, true) >= threshold && leg_angle(pose, false) >= threshold
            }
        }
    }
}

impl Default for VectorEvaluator {
    fn default() -> Self {
        Self::new(EvaluatorConfig::default())
    }
}
