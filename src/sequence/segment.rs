use std::sync::Arc;
use tracing::debug;

use super::extract::ExtractedFrame;
use crate::classifier::{PoseClassifier, UNKNOWN_POSE};
use crate::config::{Config, SequenceConfig};
use crate::reference::ReferenceLibrary;

/// 分類済みフレーム
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedFrame {
    pub frame: ExtractedFrame,
    pub pose: String,
    pub score: f32,
    pub is_steady: bool,
}

impl ClassifiedFrame {
    pub fn time(&self) -> f64 {
        self.frame.time
    }
}

/// 同じポーズが続いた区間
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub pose: String,
    pub start_time: f64,
    pub end_time: f64,
    pub frames: Vec<ClassifiedFrame>,
}

impl Segment {
    fn start(frame: ClassifiedFrame) -> Self {
        Self {
            pose: frame.pose.clone(),
            start_time: frame.time(),
            end_time: frame.time(),
            frames: vec![frame],
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// バッチ専用の新しい分類器で全フレームを分類する
pub fn classify_frames(
    frames: Vec<ExtractedFrame>,
    library: Arc<ReferenceLibrary>,
    config: &Config,
) -> Vec<ClassifiedFrame> {
    let mut classifier = PoseClassifier::new(library, config);
    frames
        .into_iter()
        .map(|frame| {
            let result = classifier.classify(&frame.landmarks);
            ClassifiedFrame {
                frame,
                pose: result.name,
                score: result.score,
                is_steady: result.is_steady,
            }
        })
        .collect()
}

/// 連続する同一ラベルのフレームをまとめる
pub fn group_segments(frames: Vec<ClassifiedFrame>) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    for frame in frames {
        match segments.last_mut() {
            Some(current) if current.pose == frame.pose => {
                current.end_time = frame.time();
                current.frames.push(frame);
            }
            _ => segments.push(Segment::start(frame)),
        }
    }
    segments
}

/// ノイズ除去
///
/// 1. "Unknown" を捨てる
/// 2. `min_segment` 秒未満を捨てる
/// 3. 間隔が `merge_gap` 秒未満の同一ポーズを結合する
///
/// 出力に再適用しても変化しない。
pub fn clean_segments(segments: Vec<Segment>, config: &SequenceConfig) -> Vec<Segment> {
    let before = segments.len();
    let mut merged: Vec<Segment> = Vec::new();
    for segment in segments
        .into_iter()
        .filter(|s| s.pose != UNKNOWN_POSE)
        .filter(|s| s.duration() >= config.min_segment)
    {
        match merged.last_mut() {
            Some(prev)
                if prev.pose == segment.pose
                    && segment.start_time - prev.end_time < config.merge_gap =>
            {
                prev.end_time = segment.end_time;
                prev.frames.extend(segment.frames);
            }
            _ => merged.push(segment),
        }
    }
    debug!(before, after = merged.len(), "segments cleaned");
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Landmark, LandmarkIndex};

    fn frame(time: f64, pose: &str) -> ClassifiedFrame {
        ClassifiedFrame {
            frame: ExtractedFrame::new(time, vec![Landmark::default(); LandmarkIndex::COUNT]),
            pose: pose.to_string(),
            score: 0.9,
            is_steady: false,
        }
    }

    /// [start, end] を 0.5 秒刻みで埋める
    fn run(pose: &str, start: f64, end: f64) -> Vec<ClassifiedFrame> {
        let n = ((end - start) / 0.5).round() as usize;
        (0..=n).map(|i| frame(start + i as f64 * 0.5, pose)).collect()
    }

    #[test]
    fn test_grouping() {
        let mut frames = run("A", 0.0, 1.0);
        frames.extend(run("B", 1.5, 2.0));
        frames.extend(run("A", 2.5, 2.5));
        let segments = group_segments(frames);
        let labels: Vec<_> = segments.iter().map(|s| s.pose.as_str()).collect();
        assert_eq!(labels, ["A", "B", "A"]);
        assert_eq!(segments[0].frames.len(), 3);
        assert_eq!(segments[0].end_time, 1.0);
        assert_eq!(segments[2].duration(), 0.0);
        assert!(group_segments(Vec::new()).is_empty());
    }

    #[test]
    fn test_clean_drops_unknown_and_short() {
        let mut frames = run(UNKNOWN_POSE, 0.0, 4.0);
        frames.extend(run("A", 4.5, 5.5));
        frames.extend(run("B", 6.0, 9.0));
        let cleaned = clean_segments(group_segments(frames), &SequenceConfig::default());
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].pose, "B");
    }

    #[test]
    fn test_merge_gap() {
        let config = SequenceConfig::default();

        // 1.0 秒の空白は結合
        let mut frames = run("A", 0.0, 3.0);
        frames.extend(run(UNKNOWN_POSE, 3.5, 3.5));
        frames.extend(run("A", 4.0, 7.0));
        let merged = clean_segments(group_segments(frames), &config);
        assert_eq!(merged.len(), 1);
        assert_eq!((merged[0].start_time, merged[0].end_time), (0.0, 7.0));
        assert_eq!(merged[0].frames.len(), 14);

        // 2.0 秒なら別
        let mut frames = run("A", 0.0, 3.0);
        frames.extend(run(UNKNOWN_POSE, 3.5, 4.5));
        frames.extend(run("A", 5.0, 8.0));
        assert_eq!(clean_segments(group_segments(frames), &config).len(), 2);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let config = SequenceConfig::default();
        let mut frames = run("A", 0.0, 3.0);
        frames.extend(run("B", 3.5, 3.5));
        frames.extend(run("A", 4.0, 6.0));
        frames.extend(run(UNKNOWN_POSE, 6.5, 7.0));
        frames.extend(run("A", 7.5, 10.0));
        frames.extend(run("C", 10.5, 13.0));
        let once = clean_segments(group_segments(frames), &config);
        let twice = clean_segments(once.clone(), &config);
        assert_eq!(once, twice);
        // 1.5 秒ちょうどの空白は結合しない
        let spans: Vec<_> = once.iter().map(|s| (s.pose.as_str(), s.start_time)).collect();
        assert_eq!(spans, [("A", 0.0), ("A", 7.5), ("C", 10.5)]);
    }
}
