use std::collections::BTreeMap;

use super::report::{round_score, AdvancedMetrics, PoseScore, SegmentResult, SessionSummary};
use crate::config::Config;
use crate::evaluator::Level;
use crate::pose::geometry::variance;
use crate::recommend::{Recommendation, RecommendationEngine};

const EMPTY_SESSION_FEEDBACK: &str =
    "No poses were successfully analyzed. Ensure you are fully visible in the frame.";
const EMPTY_SESSION_WEAKEST: &str = "Visibility";
const RANKED_POSES: usize = 3;

/// 全セグメントを集計する
pub fn summarize(
    sequence: &[SegmentResult],
    recommender: &RecommendationEngine,
    config: &Config,
) -> SessionSummary {
    let scored: Vec<(&SegmentResult, f32)> = sequence
        .iter()
        .filter_map(|s| s.mean_score().map(|m| (s, m)))
        .collect();
    if scored.is_empty() {
        return empty_summary(sequence.len());
    }

    // 指標ごとの平均
    let mut totals: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
    for (segment, _) in &scored {
        for (key, value) in &segment.score {
            let entry = totals.entry(key.as_str()).or_insert((0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }
    let scores: BTreeMap<String, u32> = totals
        .into_iter()
        .map(|(key, (sum, count))| (key.to_string(), round_score(sum as f32 / count as f32)))
        .collect();

    let (weakest, min_score) = scores
        .iter()
        .fold(None, |acc: Option<(&String, u32)>, (k, &v)| match acc {
            Some((_, best)) if best <= v => acc,
            _ => Some((k, v)),
        })
        .map(|(k, v)| (k.clone(), v))
        .unwrap_or_else(|| (EMPTY_SESSION_WEAKEST.to_string(), 0));

    let mut ranked: Vec<PoseScore> = scored
        .iter()
        .map(|(s, mean)| PoseScore {
            name: s.pose.clone(),
            score: *mean,
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    let best_poses: Vec<PoseScore> = ranked.iter().take(RANKED_POSES).cloned().collect();
    let worst_poses: Vec<PoseScore> = ranked.iter().rev().take(RANKED_POSES).cloned().collect();

    let global_mean = scores.values().sum::<u32>() as f32 / scores.len() as f32;
    let level = Level::from_score(
        global_mean,
        config.evaluator.advanced,
        config.evaluator.intermediate,
    );

    let mut feedback = format!("Level: {} ({}/100). ", level.as_str(), round_score(global_mean));
    if min_score > 80 {
        feedback.push_str("Excellent session! Your form is very consistent.");
    } else if min_score > 60 {
        feedback.push_str(&format!(
            "Good effort. Focus on improving your {} to reach the next level.",
            weakest
        ));
    } else {
        feedback.push_str(&format!(
            "Keep practicing. Your {} needs significant attention.",
            weakest
        ));
    }

    let recommendation = Recommendation {
        exercise: recommender.recommend_for_indicator(&weakest).clone(),
        reason: Some(format!(
            "We noticed your {} score was {}/100. This exercise will help you improve it.",
            weakest, min_score
        )),
    };

    SessionSummary {
        scores,
        weakest_indicator: weakest,
        best_poses,
        worst_poses,
        feedback,
        recommendation: Some(recommendation),
        total_poses: sequence.len(),
        global_score: round_score(global_mean),
        level,
        advanced_metrics: advanced_metrics(sequence, &scored),
    }
}

fn empty_summary(total_poses: usize) -> SessionSummary {
    SessionSummary {
        scores: BTreeMap::new(),
        weakest_indicator: EMPTY_SESSION_WEAKEST.to_string(),
        best_poses: Vec::new(),
        worst_poses: Vec::new(),
        feedback: EMPTY_SESSION_FEEDBACK.to_string(),
        recommendation: None,
        total_poses,
        global_score: 0,
        level: Level::Beginner,
        advanced_metrics: AdvancedMetrics::default(),
    }
}

/// 繰り返したポーズのばらつき（標準偏差 × 5 を減点）
pub fn consistency(scored: &[(&SegmentResult, f32)]) -> u32 {
    let mut by_pose: BTreeMap<&str, Vec<f32>> = BTreeMap::new();
    for (segment, mean) in scored {
        by_pose.entry(segment.pose.as_str()).or_default().push(*mean);
    }
    let repeated: Vec<f32> = by_pose
        .values()
        .filter(|scores| scores.len() > 1)
        .map(|scores| (100.0 - variance(scores).sqrt() * 5.0).max(0.0))
        .collect();
    if repeated.is_empty() {
        return 100;
    }
    round_score(repeated.iter().sum::<f32>() / repeated.len() as f32)
}

fn advanced_metrics(sequence: &[SegmentResult], scored: &[(&SegmentResult, f32)]) -> AdvancedMetrics {
    let n = sequence.len().max(1) as f32;
    let mean = |f: fn(&SegmentResult) -> u32| -> u32 {
        round_score(sequence.iter().map(|s| f(s) as f32).sum::<f32>() / n)
    };
    AdvancedMetrics {
        consistency: consistency(scored),
        stability: mean(|s| s.dynamic_metrics.stability),
        endurance: mean(|s| s.dynamic_metrics.endurance),
        fluidity: mean(|s| s.dynamic_metrics.fluidity),
    }
}
