//! 動画1本の一括解析
//!
//! 抽出 → 分類 → グループ化 → 整理 → 採点 → 集計 の順に1回だけ流す。
//! 途中結果は返さず、全段階が終わってからレポートを返す。

pub mod extract;
pub mod report;
pub mod score;
pub mod segment;
pub mod summary;

pub use extract::{extract_frames, sample_times, ExtractedFrame};
pub use report::{
    format_time, AdvancedMetrics, DynamicMetrics, PoseScore, SegmentResult, SequenceReport,
    SessionSummary,
};
pub use score::{dynamic_metrics, score_segment};
pub use segment::{classify_frames, clean_segments, group_segments, ClassifiedFrame, Segment};
pub use summary::summarize;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{PoseError, Result};
use crate::evaluator::PoseEvaluator;
use crate::pose::{LandmarkDetector, VideoSource};
use crate::recommend::RecommendationEngine;
use crate::reference::ReferenceLibrary;

/// バッチ解析器
///
/// 参照ライブラリと推薦表は読み取り専用で共有する。
/// 分類器は実行ごとに新しく作るので、ライブ用の分類器と状態が混ざらない。
pub struct SequenceAnalyzer {
    library: Arc<ReferenceLibrary>,
    recommender: Arc<RecommendationEngine>,
    config: Config,
}

impl SequenceAnalyzer {
    pub fn new(
        library: Arc<ReferenceLibrary>,
        recommender: Arc<RecommendationEngine>,
        config: Config,
    ) -> Self {
        Self {
            library,
            recommender,
            config,
        }
    }

    /// 動画を解析する
    ///
    /// 長さが取れない動画と未準備の検出器は、どの段階も始める前にエラーにする。
    pub async fn analyze<S, D, F>(
        &self,
        source: &mut S,
        detector: &mut D,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<SequenceReport>
    where
        S: VideoSource,
        D: LandmarkDetector<S::Image>,
        F: FnMut(u8),
    {
        let duration = match source.duration() {
            Some(d) if d.is_finite() && d > 0.0 => d,
            _ => return Err(PoseError::UnknownDuration),
        };
        if !detector.is_ready() {
            return Err(PoseError::DetectorUnavailable);
        }

        info!(duration, "sequence analysis started");
        let frames = extract_frames(
            source,
            detector,
            duration,
            &self.config.sequence,
            cancel,
            on_progress,
        )
        .await?;
        let report = self.analyze_frames(frames);
        info!(
            segments = report.posture_sequence.len(),
            score = report.session_summary.global_score,
            "sequence analysis finished"
        );
        Ok(report)
    }

    /// 抽出済みフレームから残りの段階を実行する
    pub fn analyze_frames(&self, frames: Vec<ExtractedFrame>) -> SequenceReport {
        let extracted = frames.len();
        let classified = classify_frames(frames, self.library.clone(), &self.config);
        let grouped = group_segments(classified);
        debug!(extracted, segments = grouped.len(), "frames grouped");
        let segments = clean_segments(grouped, &self.config.sequence);

        let evaluator = PoseEvaluator::new(self.library.clone(), &self.config);
        let posture_sequence: Vec<SegmentResult> = segments
            .iter()
            .map(|s| score_segment(s, &evaluator, &self.config))
            .collect();
        let session_summary = summarize(&posture_sequence, &self.recommender, &self.config);

        SequenceReport {
            video_name: None,
            posture_sequence,
            session_summary,
        }
    }
}
