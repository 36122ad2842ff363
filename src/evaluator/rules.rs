//! 角度ベースの旧評価器
//!
//! 参照ベクトルのないエクササイズ用。部位距離ではなく関節角度と
//! 上下関係だけで指標を出す。レーダーの補助軸は固定値。

use std::collections::BTreeMap;

use super::evaluation::{clamp_score, Evaluation, Level, RadarEntry};
use crate::classifier::rules::leg_angle;
use crate::config::EvaluatorConfig;
use crate::pose::{angle, LandmarkIndex, Pose};

/// 評価の途中結果
#[derive(Default)]
struct Sheet {
    indicators: BTreeMap<String, f32>,
    feedback: Vec<String>,
    radar: Vec<RadarEntry>,
}

impl Sheet {
    fn indicator(&mut self, name: &str, score: f32) {
        self.indicators.insert(name.to_string(), clamp_score(score));
    }

    fn hint(&mut self, text: &str) {
        self.feedback.push(text.to_string());
    }

    fn radar(&mut self, axes: &[(&str, f32)]) {
        self.radar = axes
            .iter()
            .map(|&(subject, score)| RadarEntry::new(subject, clamp_score(score)))
            .collect();
    }
}

/// 旧評価器で扱えるラベルなら評価する
pub fn evaluate_by_rules(pose: &Pose, label: &str, config: &EvaluatorConfig) -> Option<Evaluation> {
    let mut sheet = Sheet::default();
    match label {
        "Pelvic Curl" => pelvic_curl(pose, &mut sheet),
        "Chest Lift" => chest_lift(pose, &mut sheet),
        "The Hundred" => the_hundred(pose, &mut sheet),
        "One-Leg Circle" => one_leg_circle(pose, &mut sheet),
        "Roll-Up" => roll_up(pose, &mut sheet),
        "Spine Stretch" => spine_stretch(&mut sheet),
        _ => return None,
    }

    let global_score = if sheet.indicators.is_empty() {
        0.0
    } else {
        clamp_score(sheet.indicators.values().sum::<f32>() / sheet.indicators.len() as f32)
    };
    let level = Level::from_score(global_score, config.advanced, config.intermediate);

    Some(Evaluation {
        pose: label.to_string(),
        indicators: sheet.indicators,
        feedback: sheet.feedback,
        radar: sheet.radar,
        global_score,
        level,
        detected_variant: None,
    })
}

fn pelvic_curl(pose: &Pose, sheet: &mut Sheet) {
    use LandmarkIndex::*;
    // 肩・腰・膝が一直線になるほど高得点
    let body = angle(pose.get(LeftShoulder), pose.get(LeftHip), pose.get(LeftKnee));
    let alignment = 100.0 - (180.0 - body).abs();
    sheet.indicator("Alignment", alignment);
    sheet.indicator("Stability", 85.0);
    if body < 160.0 {
        sheet.hint("Lift hips higher to create a straight line.");
    }
    sheet.radar(&[
        ("Core Control", 85.0),
        ("Glute Strength", 80.0),
        ("Alignment", alignment),
        ("Stability", 85.0),
        ("Breath", 70.0),
    ]);
}

fn chest_lift(pose: &Pose, sheet: &mut Sheet) {
    use LandmarkIndex::*;
    let lifted = pose.get(LeftHip).y - pose.get(LeftShoulder).y > 0.1;
    let lift = if lifted { 90.0 } else { 60.0 };
    sheet.indicator("Amplitude", lift);
    if !lifted {
        sheet.hint("Curl up higher using your abdominals.");
    }
    sheet.radar(&[
        ("Core Strength", 85.0),
        ("Neck Comfort", 90.0),
        ("Lift Height", lift),
        ("Pelvic Neutral", 80.0),
        ("Breath", 75.0),
    ]);
}

fn the_hundred(pose: &Pose, sheet: &mut Sheet) {
    let leg = leg_angle(pose, true);
    let extension = leg / 180.0 * 100.0;
    sheet.indicator("Extension", extension);
    if leg < 160.0 {
        sheet.hint("Try to straighten your legs further.");
    }
    sheet.hint("Pump arms vigorously with breath.");
    sheet.radar(&[
        ("Stamina", 90.0),
        ("Core Stability", 85.0),
        ("Leg Extension", extension),
        ("Arm Vigor", 80.0),
        ("Breath", 85.0),
    ]);
}

fn one_leg_circle(pose: &Pose, sheet: &mut Sheet) {
    let leg = leg_angle(pose, true);
    let straightness = leg / 180.0 * 100.0;
    sheet.indicator("Flexibility", straightness);
    if leg < 160.0 {
        sheet.hint("Extend reaching leg fully.");
    }
    sheet.radar(&[
        ("Pelvic Stability", 80.0),
        ("Hip Mobility", 85.0),
        ("Leg Straightness", straightness),
        ("Core Control", 85.0),
        ("Flow", 75.0),
    ]);
}

fn roll_up(pose: &Pose, sheet: &mut Sheet) {
    use LandmarkIndex::*;
    // 左向き前提: 肩が腰より前に出ているか
    let reach = if pose.get(LeftShoulder).x < pose.get(LeftHip).x {
        95.0
    } else {
        50.0
    };
    sheet.indicator("Articulation", reach);
    sheet.hint("Peel spine off mat one vertebra at a time.");
    sheet.radar(&[
        ("Articulation", reach),
        ("Abdominal Strength", 90.0),
        ("Hamstring Flexibility", 80.0),
        ("Shoulder Relax", 85.0),
        ("Flow", 80.0),
    ]);
}

fn spine_stretch(sheet: &mut Sheet) {
    sheet.indicator("Posture", 90.0);
    sheet.hint("Imagine peeling off a wall.");
    sheet.radar(&[
        ("Posture", 90.0),
        ("Articulation", 85.0),
        ("Abdominal Scoop", 80.0),
        ("Shoulder Stability", 90.0),
        ("Breath", 85.0),
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Landmark;

    fn pose(points: &[(LandmarkIndex, f32, f32)]) -> Pose {
        let mut p = Pose::default();
        for &(idx, x, y) in points {
            p.landmarks[idx as usize] = Landmark::new(x, y, 0.0, 1.0);
        }
        p
    }

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_unknown_label() {
        let config = EvaluatorConfig::default();
        assert!(evaluate_by_rules(&Pose::default(), "Plank", &config).is_none());
    }

    #[test]
    fn test_straight_bridge_scores_high() {
        use LandmarkIndex::*;
        let p = pose(&[
            (LeftShoulder, 0.2, 0.8),
            (LeftHip, 0.45, 0.6),
            (LeftKnee, 0.7, 0.4),
        ]);
        let ev = evaluate_by_rules(&p, "Pelvic Curl", &EvaluatorConfig::default()).unwrap();
        assert!(ev.indicators["Alignment"] > 99.0);
        assert_eq!(ev.indicators["Stability"], 85.0);
        assert!(ev.feedback.is_empty());
        assert_eq!(ev.radar.len(), 5);
        assert_eq!(ev.level, Level::Advanced);
    }

    #[test]
    fn test_bent_legs_get_hint() {
        use LandmarkIndex::*;
        // 膝90度
        let p = pose(&[
            (LeftHip, 0.5, 0.5),
            (LeftKnee, 0.6, 0.5),
            (LeftAnkle, 0.6, 0.6),
        ]);
        let ev = evaluate_by_rules(&p, "The Hundred", &EvaluatorConfig::default()).unwrap();
        assert!(approx_eq(ev.indicators["Extension"], 50.0, 0.1));
        assert_eq!(ev.feedback.len(), 2);
        assert_eq!(ev.feedback[0], "Try to straighten your legs further.");
        assert_eq!(ev.level, Level::Beginner);
    }

    #[test]
    fn test_scores_stay_in_range() {
        let config = EvaluatorConfig::default();
        for name in crate::classifier::RULE_EXERCISES {
            let ev = evaluate_by_rules(&Pose::default(), name, &config).unwrap();
            assert!((0.0..=100.0).contains(&ev.global_score));
            for entry in &ev.radar {
                assert!((0.0..=100.0).contains(&entry.score));
            }
        }
    }
}
