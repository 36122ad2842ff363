//! セグメント単位の評価（アペックス・指標平均・動きの質）

use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use super::report::{format_time, round1, round_score, DynamicMetrics, SegmentResult};
use super::segment::{ClassifiedFrame, Segment};
use crate::config::{Config, SequenceConfig};
use crate::evaluator::{Evaluation, Level, PoseEvaluator};
use crate::pose::geometry::variance;
use crate::pose::{Landmark, LandmarkIndex};

const LOW_VISIBILITY_FEEDBACK: &str = "Visibility too low for quality analysis.";

/// 時刻付きの評価
struct TimedEvaluation<'a> {
    evaluation: Evaluation,
    frame: &'a ClassifiedFrame,
}

pub fn score_segment(segment: &Segment, evaluator: &PoseEvaluator, config: &Config) -> SegmentResult {
    let seq = &config.sequence;
    let pool = candidate_pool(segment, seq);
    if pool.is_empty() {
        warn!(pose = %segment.pose, start = segment.start_time, "no visible frames in segment");
        return empty_result(segment);
    }

    let best = best_frames(pool, seq);
    let mut evaluations: Vec<TimedEvaluation> = best
        .into_iter()
        .filter_map(|frame| {
            evaluator
                .evaluate(&frame.frame.landmarks, &segment.pose)
                .map(|evaluation| TimedEvaluation { evaluation, frame })
        })
        .collect();
    if evaluations.is_empty() {
        warn!(pose = %segment.pose, start = segment.start_time, "segment could not be evaluated");
        return empty_result(segment);
    }
    evaluations.sort_by(|a, b| a.frame.time().total_cmp(&b.frame.time()));

    // 同点なら時刻の早いフレーム
    let mut apex = &evaluations[0];
    for e in &evaluations {
        if e.evaluation.global_score > apex.evaluation.global_score {
            apex = e;
        }
    }

    let n = evaluations.len() as f32;
    let score: BTreeMap<String, u32> = apex
        .evaluation
        .indicators
        .keys()
        .map(|key| {
            let sum: f32 = evaluations
                .iter()
                .map(|e| e.evaluation.indicators.get(key).copied().unwrap_or(0.0))
                .sum();
            (key.clone(), round_score(sum / n))
        })
        .collect();

    let confident = most_confident(&segment.frames);

    let mut seen = HashSet::new();
    let feedback: Vec<String> = evaluations
        .iter()
        .flat_map(|e| e.evaluation.feedback.iter())
        .filter(|f| seen.insert(f.as_str()))
        .take(seq.max_feedback)
        .cloned()
        .collect();

    let global = apex.evaluation.global_score;
    let level = Level::from_score(global, config.evaluator.advanced, config.evaluator.intermediate);
    let scores: Vec<f32> = evaluations.iter().map(|e| e.evaluation.global_score).collect();

    SegmentResult {
        pose: segment.pose.clone(),
        start_time: format_time(segment.start_time),
        end_time: format_time(segment.end_time),
        duration_sec: round1(segment.duration()),
        confidence: confident.map_or(0.0, |f| f.score),
        key_frame: apex
            .frame
            .frame
            .thumbnail
            .clone()
            .or_else(|| confident.and_then(|f| f.frame.thumbnail.clone())),
        global_score: round_score(global),
        level: Some(level),
        detected_variant: apex.evaluation.detected_variant.clone(),
        score,
        feedback,
        apex_timestamp: Some(apex.frame.time()),
        dynamic_metrics: dynamic_metrics(&segment.frames, &scores),
    }
}

/// 前後の遷移区間を除いた見えているフレーム（少なければ全区間から拾う）
fn candidate_pool<'a>(segment: &'a Segment, config: &SequenceConfig) -> Vec<&'a ClassifiedFrame> {
    let margin = (segment.duration() * config.transition_ratio).min(config.transition_max);
    let lo = segment.start_time + margin;
    let hi = segment.end_time - margin;
    let stable: Vec<&ClassifiedFrame> = segment
        .frames
        .iter()
        .filter(|f| f.time() >= lo && f.time() <= hi && f.frame.visibility > config.stable_visibility)
        .collect();
    if stable.len() > 2 {
        return stable;
    }
    segment
        .frames
        .iter()
        .filter(|f| f.frame.visibility > config.fallback_visibility)
        .collect()
}

/// 可視度の高い順に上位を残す
fn best_frames<'a>(mut pool: Vec<&'a ClassifiedFrame>, config: &SequenceConfig) -> Vec<&'a ClassifiedFrame> {
    pool.sort_by(|a, b| b.frame.visibility.total_cmp(&a.frame.visibility));
    let keep = ((pool.len() as f64 * config.best_frame_ratio).ceil() as usize)
        .max(config.min_best_frames)
        .min(pool.len());
    pool.truncate(keep);
    pool
}

fn most_confident(frames: &[ClassifiedFrame]) -> Option<&ClassifiedFrame> {
    let mut best: Option<&ClassifiedFrame> = None;
    for f in frames {
        if best.map_or(true, |b| f.score > b.score) {
            best = Some(f);
        }
    }
    best
}

fn empty_result(segment: &Segment) -> SegmentResult {
    SegmentResult {
        pose: segment.pose.clone(),
        start_time: format_time(segment.start_time),
        end_time: format_time(segment.end_time),
        duration_sec: round1(segment.duration()),
        confidence: 0.0,
        key_frame: segment.frames.first().and_then(|f| f.frame.thumbnail.clone()),
        global_score: 0,
        level: None,
        detected_variant: None,
        score: BTreeMap::new(),
        feedback: vec![LOW_VISIBILITY_FEEDBACK.to_string()],
        apex_timestamp: None,
        dynamic_metrics: DynamicMetrics::default(),
    }
}

fn center(landmarks: &[Landmark], joints: &[LandmarkIndex]) -> Option<(f32, f32)> {
    let mut x = 0.0;
    let mut y = 0.0;
    for &idx in joints {
        let lm = landmarks.get(idx as usize)?;
        x += lm.x;
        y += lm.y;
    }
    let n = joints.len() as f32;
    Some((x / n, y / n))
}

/// 動きの質
///
/// - stability: 肩＋腰の中心の分散が小さいほど高い
/// - endurance: 前半30%と後半30%のスコア差（時刻順の評価スコア）
/// - fluidity: 腰中心の軌跡の二階差分（ジャーク）が小さいほど高い
pub fn dynamic_metrics(frames: &[ClassifiedFrame], scores: &[f32]) -> DynamicMetrics {
    DynamicMetrics {
        stability: round_score(stability(frames)),
        endurance: round_score(endurance(scores)),
        fluidity: round_score(fluidity(frames)),
    }
}

fn stability(frames: &[ClassifiedFrame]) -> f32 {
    let centers: Vec<(f32, f32)> = frames
        .iter()
        .filter_map(|f| center(&f.frame.landmarks, &LandmarkIndex::ANCHORS))
        .collect();
    if centers.len() < 2 {
        return 100.0;
    }
    let xs: Vec<f32> = centers.iter().map(|c| c.0).collect();
    let ys: Vec<f32> = centers.iter().map(|c| c.1).collect();
    (100.0 - (variance(&xs) + variance(&ys)) * 20000.0).max(0.0)
}

fn endurance(scores: &[f32]) -> f32 {
    if scores.len() <= 3 {
        return 100.0;
    }
    let split = (scores.len() as f32 * 0.3).floor() as usize;
    let mean = |s: &[f32]| s.iter().sum::<f32>() / s.len() as f32;
    let drop = mean(&scores[..split]) - mean(&scores[scores.len() - split..]);
    if drop > 0.0 {
        (100.0 - drop * 2.0).max(0.0)
    } else {
        100.0
    }
}

fn fluidity(frames: &[ClassifiedFrame]) -> f32 {
    const HIPS: [LandmarkIndex; 2] = [LandmarkIndex::LeftHip, LandmarkIndex::RightHip];
    let points: Vec<(f32, f32)> = frames
        .iter()
        .filter_map(|f| center(&f.frame.landmarks, &HIPS))
        .collect();
    if points.len() < 3 {
        return 100.0;
    }
    let total: f32 = points
        .windows(3)
        .map(|w| {
            let (v1x, v1y) = (w[1].0 - w[0].0, w[1].1 - w[0].1);
            let (v2x, v2y) = (w[2].0 - w[1].0, w[2].1 - w[1].1);
            ((v2x - v1x).powi(2) + (v2y - v1y).powi(2)).sqrt()
        })
        .sum();
    let mean_jerk = total / (points.len() - 2) as f32;
    (100.0 - mean_jerk * 5000.0).max(0.0)
}
