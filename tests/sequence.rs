mod common;

use std::sync::Arc;
use std::time::Duration;

use common::synthetic_pose::{hidden_body, landmarks_from_vector, recording};
use pose_coach::config::Config;
use pose_coach::pose::Landmark;
use pose_coach::recommend::RecommendationEngine;
use pose_coach::reference::ReferenceLibrary;
use pose_coach::sequence::{ExtractedFrame, SequenceAnalyzer};
use pose_coach::PoseError;
use tokio_util::sync::CancellationToken;

fn analyzer() -> (SequenceAnalyzer, Arc<ReferenceLibrary>) {
    let library = Arc::new(ReferenceLibrary::builtin().unwrap());
    let recommender = Arc::new(RecommendationEngine::builtin().unwrap());
    (
        SequenceAnalyzer::new(library.clone(), recommender, Config::default()),
        library,
    )
}

fn pose(library: &ReferenceLibrary, name: &str) -> Vec<Landmark> {
    landmarks_from_vector(&library.get(name).unwrap().vector, 0.3, (0.5, 0.6))
}

/// 0〜3 秒は人物なし、3〜8 秒は Pelvic Curl、それ以降も人物なし
#[tokio::test]
async fn single_pose_between_empty_stretches() {
    let (analyzer, library) = analyzer();
    let curl = pose(&library, "Pelvic Curl");
    let session = recording(10.0, |t| (3.0..8.0).contains(&t).then(|| curl.clone()));
    let (mut source, mut detector) = session.into_replay();

    let mut progress = Vec::new();
    let report = analyzer
        .analyze(&mut source, &mut detector, &CancellationToken::new(), |p| progress.push(p))
        .await
        .unwrap();

    assert_eq!(report.posture_sequence.len(), 1);
    let segment = &report.posture_sequence[0];
    assert_eq!(segment.pose, "Pelvic Curl");
    assert_eq!(segment.start_time, "0:03");
    assert_eq!(segment.end_time, "0:07");
    assert_eq!(segment.duration_sec, 4.5);
    assert!(segment.global_score >= 98);
    assert!(segment.confidence > 0.99);
    assert!(segment.key_frame.as_deref().unwrap().starts_with("frame-"));
    assert_eq!(segment.dynamic_metrics.stability, 100);
    assert_eq!(segment.dynamic_metrics.fluidity, 100);
    assert!(segment.feedback.len() <= 4);

    let summary = &report.session_summary;
    assert_eq!(summary.total_poses, 1);
    assert!(summary.global_score >= 98);
    assert!(summary.recommendation.is_some());
    assert_eq!(summary.advanced_metrics.consistency, 100);

    assert_eq!(progress.len(), 20);
    assert_eq!(progress.last(), Some(&100));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
}

fn frames(spans: &[(f64, f64, Option<&[Landmark]>)]) -> Vec<ExtractedFrame> {
    let mut out = Vec::new();
    for &(start, end, landmarks) in spans {
        let mut t = start;
        while t <= end + 1e-9 {
            let lms = landmarks.map_or_else(hidden_body, |l| l.to_vec());
            out.push(ExtractedFrame::new(t, lms));
            t += 0.5;
        }
    }
    out
}

#[test]
fn short_gap_is_merged_long_gap_is_not() {
    let (analyzer, library) = analyzer();
    let roll = pose(&library, "Roll-Up");

    // 1.0 秒の空白
    let report = analyzer.analyze_frames(frames(&[
        (0.0, 3.0, Some(roll.as_slice())),
        (3.5, 3.5, None),
        (4.0, 7.0, Some(roll.as_slice())),
    ]));
    assert_eq!(report.posture_sequence.len(), 1);
    assert_eq!(report.posture_sequence[0].end_time, "0:07");

    // 2.0 秒の空白
    let report = analyzer.analyze_frames(frames(&[
        (0.0, 3.0, Some(roll.as_slice())),
        (3.5, 4.5, None),
        (5.0, 8.0, Some(roll.as_slice())),
    ]));
    assert_eq!(report.posture_sequence.len(), 2);
    assert_eq!(report.session_summary.total_poses, 2);
    assert_eq!(report.session_summary.advanced_metrics.consistency, 100);
}

#[test]
fn short_segments_are_dropped() {
    let (analyzer, library) = analyzer();
    let roll = pose(&library, "Roll-Up");
    let report = analyzer.analyze_frames(frames(&[(0.0, 1.5, Some(roll.as_slice()))]));
    assert!(report.posture_sequence.is_empty());
    assert_eq!(report.session_summary.weakest_indicator, "Visibility");
    assert!(report
        .session_summary
        .feedback
        .starts_with("No poses were successfully analyzed"));
}

#[test]
fn report_json_shape() {
    let (analyzer, library) = analyzer();
    let curl = pose(&library, "Pelvic Curl");
    let report = analyzer.analyze_frames(frames(&[(0.0, 4.0, Some(curl.as_slice()))]));
    let json = serde_json::to_value(&report).unwrap();

    assert!(json["video_name"].is_null());
    let segment = &json["posture_sequence"][0];
    assert_eq!(segment["pose"], "Pelvic Curl");
    assert_eq!(segment["start_time"], "0:00");
    assert_eq!(segment["level"], "Advanced");
    for key in ["Upper Body", "Core", "Lower Body"] {
        assert!(segment["score"][key].is_u64(), "{}", key);
    }
    for key in ["stability", "endurance", "fluidity"] {
        assert!(segment["dynamic_metrics"][key].is_u64());
    }
    let summary = &json["session_summary"];
    assert_eq!(summary["total_poses"], 1);
    assert!(summary["recommendation"]["title"].is_string());
    assert!(summary["advanced_metrics"]["consistency"].is_u64());
}

#[tokio::test]
async fn unknown_duration_fails_before_extraction() {
    let (analyzer, _) = analyzer();
    let mut session = recording(2.0, |_| None);
    session.duration = None;
    let (mut source, mut detector) = session.into_replay();
    let mut called = false;
    let result = analyzer
        .analyze(&mut source, &mut detector, &CancellationToken::new(), |_| called = true)
        .await;
    assert!(matches!(result, Err(PoseError::UnknownDuration)));
    assert!(!called);
}

#[tokio::test]
async fn missing_detector_fails_before_extraction() {
    let (analyzer, _) = analyzer();
    let (mut source, detector) = recording(2.0, |_| None).into_replay();
    let mut detector = detector.unavailable();
    let result = analyzer
        .analyze(&mut source, &mut detector, &CancellationToken::new(), |_| {})
        .await;
    assert!(matches!(result, Err(PoseError::DetectorUnavailable)));
}

#[tokio::test]
async fn cancelled_run_returns_no_report() {
    let (analyzer, library) = analyzer();
    let curl = pose(&library, "Pelvic Curl");
    let (mut source, mut detector) = recording(5.0, |_| Some(curl.clone())).into_replay();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let result = analyzer
        .analyze(&mut source, &mut detector, &cancel, |p| {
            if p >= 30 {
                trigger.cancel();
            }
        })
        .await;
    assert!(matches!(result, Err(PoseError::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn slow_detector_frames_are_skipped() {
    let (analyzer, library) = analyzer();
    let curl = pose(&library, "Pelvic Curl");
    let (mut source, detector) = recording(3.0, |_| Some(curl.clone())).into_replay();
    let mut detector = detector.with_delay(Duration::from_secs(10));
    let report = analyzer
        .analyze(&mut source, &mut detector, &CancellationToken::new(), |_| {})
        .await
        .unwrap();
    assert!(report.posture_sequence.is_empty());
    assert_eq!(report.session_summary.total_poses, 0);
}
