use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{info, warn};

use pose_coach::classifier::{classify_by_rules, Classification, PoseClassifier};
use pose_coach::config::Config;
use pose_coach::evaluator::{Evaluation, PoseEvaluator};
use pose_coach::pose::{Landmark, Pose};
use pose_coach::recommend::{Recommendation, RecommendationEngine};
use pose_coach::reference::ReferenceLibrary;

const CONFIG_PATH: &str = "config.toml";

/// 入力1行: ランドマーク配列そのもの、または {"landmarks": [...]}
#[derive(Deserialize)]
#[serde(untagged)]
enum FrameInput {
    Bare(Vec<Landmark>),
    Wrapped { landmarks: Vec<Landmark> },
}

impl FrameInput {
    fn into_landmarks(self) -> Vec<Landmark> {
        match self {
            FrameInput::Bare(l) | FrameInput::Wrapped { landmarks: l } => l,
        }
    }
}

#[derive(Serialize)]
struct FrameOutput {
    classification: Classification,
    evaluation: Option<Evaluation>,
    recommendation: Option<Recommendation>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::load_or_default(CONFIG_PATH);
    let library = Arc::new(ReferenceLibrary::load_or_builtin(
        config.data.reference_poses.as_deref(),
    )?);
    let recommender =
        RecommendationEngine::load_or_builtin(config.data.recommendations.as_deref())?;
    info!(poses = library.len(), "reference library loaded");

    let mut classifier = PoseClassifier::new(library.clone(), &config);
    let evaluator = PoseEvaluator::new(library, &config);
    // 指定があれば分類結果ではなくこのラベルで評価する
    let mut target: Option<String> = None;

    eprintln!("=== Pose Coach - live ===");
    eprintln!("1行に1フレーム (33ランドマークのJSON)");
    eprintln!("  target <name> - 評価するポーズを固定");
    eprintln!("  auto          - 分類結果で評価");
    eprintln!("  reset         - 分類器を初期化");
    eprintln!("  q             - 終了");

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "q" => break,
            "reset" => {
                classifier.reset();
                info!("classifier reset");
                continue;
            }
            "auto" => {
                target = None;
                continue;
            }
            _ => {}
        }
        if let Some(name) = input.strip_prefix("target ") {
            target = Some(name.trim().to_string());
            info!(target = name.trim(), "evaluation target fixed");
            continue;
        }

        let landmarks = match serde_json::from_str::<FrameInput>(input) {
            Ok(frame) => frame.into_landmarks(),
            Err(e) => {
                warn!("invalid frame: {}", e);
                continue;
            }
        };

        let classification = classifier.classify(&landmarks);
        // ベクトル分類で不明なら角度ルールで補う
        let by_rules = if classification.is_unknown() && config.evaluator.rule_fallback {
            Pose::from_slice(&landmarks)
                .ok()
                .and_then(|pose| classify_by_rules(&pose))
                .map(|m| m.name)
        } else {
            None
        };
        let label = target
            .as_deref()
            .or(by_rules)
            .unwrap_or(&classification.name);
        let evaluation = evaluator.evaluate(&landmarks, label);
        let recommendation = evaluation.as_ref().and_then(|ev| {
            ev.weakest_indicator()
                .map(|(name, score)| recommender.recommend_with_reason(&ev.pose, name, Some(score)))
        });

        let output = FrameOutput {
            classification,
            evaluation,
            recommendation,
        };
        serde_json::to_writer(&mut stdout, &output)?;
        writeln!(stdout)?;
        stdout.flush()?;
    }

    Ok(())
}
