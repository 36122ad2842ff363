//! 角度しきい値による旧分類器
//!
//! 参照ベクトルを必要としない簡易版。ベクトル分類器の代替ではなく、
//! 参照が未登録のエクササイズ名を知るためのカタログも兼ねる。

use crate::pose::{angle, LandmarkIndex, Pose};

/// 旧ルールで識別できるエクササイズ
pub const RULE_EXERCISES: [&str; 6] = [
    "Pelvic Curl",
    "Chest Lift",
    "The Hundred",
    "One-Leg Circle",
    "Roll-Up",
    "Spine Stretch",
];

const RULE_CONFIDENCE: f32 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleMatch {
    pub name: &'static str,
    pub confidence: f32,
}

pub fn is_rule_exercise(name: &str) -> bool {
    RULE_EXERCISES.contains(&name)
}

/// 上から順に最初に当てはまったエクササイズを返す
pub fn classify_by_rules(pose: &Pose) -> Option<RuleMatch> {
    let checks: [(&'static str, fn(&Pose) -> bool); 6] = [
        ("Pelvic Curl", is_pelvic_curl),
        ("Chest Lift", is_chest_lift),
        ("The Hundred", is_the_hundred),
        ("One-Leg Circle", is_one_leg_circle),
        ("Roll-Up", is_roll_up),
        ("Spine Stretch", is_spine_stretch),
    ];
    checks
        .iter()
        .find(|(_, check)| check(pose))
        .map(|&(name, _)| RuleMatch {
            name,
            confidence: RULE_CONFIDENCE,
        })
}

/// 膝角度 (hip-knee-ankle)
pub(crate) fn leg_angle(pose: &Pose, left: bool) -> f32 {
    use LandmarkIndex::*;
    let (hip, knee, ankle) = if left {
        (LeftHip, LeftKnee, LeftAnkle)
    } else {
        (RightHip, RightKnee, RightAnkle)
    };
    angle(pose.get(hip), pose.get(knee), pose.get(ankle))
}

fn is_pelvic_curl(pose: &Pose) -> bool {
    use LandmarkIndex::*;
    let body = angle(pose.get(LeftShoulder), pose.get(LeftHip), pose.get(LeftKnee));
    let knee = leg_angle(pose, true);
    // 画像座標は下が正なので、y が小さいほど高い
    let hips_high = pose.get(LeftHip).y < pose.get(LeftAnkle).y;
    body > 150.0 && knee > 60.0 && knee < 120.0 && hips_high
}

fn is_chest_lift(pose: &Pose) -> bool {
    use LandmarkIndex::*;
    leg_angle(pose, true) < 120.0 && pose.get(LeftShoulder).y < pose.get(LeftHip).y
}

fn is_the_hundred(pose: &Pose) -> bool {
    use LandmarkIndex::*;
    let hip = pose.get(LeftHip);
    let feet_high = pose.get(LeftAnkle).y < hip.y;
    feet_high || (leg_angle(pose, true) > 150.0 && pose.get(LeftKnee).y < hip.y + 0.1)
}

fn is_one_leg_circle(pose: &Pose) -> bool {
    use LandmarkIndex::*;
    let leg_up = |hip: LandmarkIndex, ankle: LandmarkIndex| {
        let (h, a) = (pose.get(hip), pose.get(ankle));
        a.y < h.y && (a.x - h.x).abs() < 0.2
    };
    let one_up = leg_up(LeftHip, LeftAnkle) || leg_up(RightHip, RightAnkle);
    one_up && leg_angle(pose, true) > 150.0 && leg_angle(pose, false) > 150.0
}

fn is_roll_up(pose: &Pose) -> bool {
    use LandmarkIndex::*;
    let seated = pose.get(LeftHip).y > pose.get(LeftShoulder).y;
    let (wrist, ankle) = (pose.get(LeftWrist), pose.get(LeftAnkle));
    let reach = (wrist.x - ankle.x).abs() < 0.3 && (wrist.y - ankle.y).abs() < 0.3;
    seated && reach
}

fn is_spine_stretch(pose: &Pose) -> bool {
    use LandmarkIndex::*;
    let legs_straight = leg_angle(pose, true) > 160.0;
    let torso_vertical = (pose.get(LeftShoulder).x - pose.get(LeftHip).x).abs() < 0.2;
    legs_straight && torso_vertical
}
