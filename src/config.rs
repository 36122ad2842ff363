use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub sequence: SequenceConfig,
    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NormalizeConfig {
    /// 肩・腰の可視度下限（これ未満は正規化しない）
    #[serde(default = "default_visibility_floor")]
    pub visibility_floor: f32,
    /// 奥行き (z) 成分の重み
    #[serde(default = "default_depth_weight")]
    pub depth_weight: f32,
    /// 胴体長がゼロのときに使う代替スケール
    #[serde(default = "default_fallback_torso")]
    pub fallback_torso: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmoothingConfig {
    /// 履歴バッファの容量
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// EMA係数 (0.0〜1.0, 大きいほど新しい値を重視)
    #[serde(default = "default_alpha")]
    pub alpha: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    /// 確定候補とみなすコサイン類似度
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f32,
    /// これ以上なら名前だけは報告する
    #[serde(default = "default_rescue_floor")]
    pub rescue_floor: f32,
    /// 体幹（肩・腰）の速度がこれ未満なら静止とみなす
    #[serde(default = "default_core_velocity_threshold")]
    pub core_velocity_threshold: f32,
    /// 確定に必要な連続フレーム数
    #[serde(default = "default_confirm_frames")]
    pub confirm_frames: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EvaluatorConfig {
    /// 距離→スコア変換の係数: score = 100 - distance * scale
    #[serde(default = "default_distance_scale")]
    pub distance_scale: f32,
    /// これ未満の部位にフィードバックを出す
    #[serde(default = "default_feedback_threshold")]
    pub feedback_threshold: f32,
    #[serde(default = "default_advanced")]
    pub advanced: f32,
    #[serde(default = "default_intermediate")]
    pub intermediate: f32,
    /// 参照ベクトルがないポーズに角度ベースの評価を使う
    #[serde(default)]
    pub rule_fallback: bool,
    /// 脚が伸びているとみなす膝角度（度）
    #[serde(default = "default_extended_leg_angle")]
    pub extended_leg_angle: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SequenceConfig {
    /// サンプリング間隔（秒）
    #[serde(default = "default_sample_interval")]
    pub sample_interval: f64,
    /// これより短いセグメントはノイズとして捨てる（秒）
    #[serde(default = "default_min_segment")]
    pub min_segment: f64,
    /// 同一ポーズのセグメントを結合する最大ギャップ（秒）
    #[serde(default = "default_merge_gap")]
    pub merge_gap: f64,
    /// 前後をトランジションとして除外する割合
    #[serde(default = "default_transition_ratio")]
    pub transition_ratio: f64,
    /// トランジション除外の上限（秒）
    #[serde(default = "default_transition_max")]
    pub transition_max: f64,
    #[serde(default = "default_stable_visibility")]
    pub stable_visibility: f32,
    #[serde(default = "default_fallback_visibility")]
    pub fallback_visibility: f32,
    /// 可視度上位から評価に使う割合
    #[serde(default = "default_best_frame_ratio")]
    pub best_frame_ratio: f64,
    #[serde(default = "default_min_best_frames")]
    pub min_best_frames: usize,
    #[serde(default = "default_max_feedback")]
    pub max_feedback: usize,
    /// 1フレームの検出タイムアウト（秒）
    #[serde(default = "default_frame_timeout")]
    pub frame_timeout: f64,
}

/// データファイルの差し替え
///
/// 組み込みライブラリは旧カタログの6種目すべてに参照ベクトルを持つ。
/// 一部の種目だけを含むライブラリを指定すると、残りの種目は暫定評価
/// (Accuracy 50) になり、`rule_fallback` を有効にすると角度評価になる。
///
/// ```toml
/// [data]
/// reference_poses = "my_poses.json"
/// recommendations = "my_recommendations.toml"
///
/// [evaluator]
/// rule_fallback = true
/// ```
#[derive(Debug, Default, Deserialize, Clone)]
pub struct DataConfig {
    /// 参照ポーズライブラリ (JSON)。未指定なら組み込み版
    pub reference_poses: Option<String>,
    /// 推薦テーブル (TOML)。未指定なら組み込み版
    pub recommendations: Option<String>,
}

fn default_visibility_floor() -> f32 { 0.3 }
fn default_depth_weight() -> f32 { 1.5 }
fn default_fallback_torso() -> f32 { 1.0 }
fn default_capacity() -> usize { 30 }
fn default_alpha() -> f32 { 0.6 }
fn default_match_threshold() -> f32 { 0.75 }
fn default_rescue_floor() -> f32 { 0.5 }
fn default_core_velocity_threshold() -> f32 { 0.12 }
fn default_confirm_frames() -> u32 { 3 }
fn default_distance_scale() -> f32 { 150.0 }
fn default_feedback_threshold() -> f32 { 80.0 }
fn default_advanced() -> f32 { 85.0 }
fn default_intermediate() -> f32 { 70.0 }
fn default_extended_leg_angle() -> f32 { 160.0 }
fn default_sample_interval() -> f64 { 0.5 }
fn default_min_segment() -> f64 { 2.0 }
fn default_merge_gap() -> f64 { 1.5 }
fn default_transition_ratio() -> f64 { 0.15 }
fn default_transition_max() -> f64 { 1.0 }
fn default_stable_visibility() -> f32 { 0.4 }
fn default_fallback_visibility() -> f32 { 0.3 }
fn default_best_frame_ratio() -> f64 { 0.7 }
fn default_min_best_frames() -> usize { 2 }
fn default_max_feedback() -> usize { 4 }
fn default_frame_timeout() -> f64 { 3.0 }

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            visibility_floor: default_visibility_floor(),
            depth_weight: default_depth_weight(),
            fallback_torso: default_fallback_torso(),
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            alpha: default_alpha(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            rescue_floor: default_rescue_floor(),
            core_velocity_threshold: default_core_velocity_threshold(),
            confirm_frames: default_confirm_frames(),
        }
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            distance_scale: default_distance_scale(),
            feedback_threshold: default_feedback_threshold(),
            advanced: default_advanced(),
            intermediate: default_intermediate(),
            rule_fallback: false,
            extended_leg_angle: default_extended_leg_angle(),
        }
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            sample_interval: default_sample_interval(),
            min_segment: default_min_segment(),
            merge_gap: default_merge_gap(),
            transition_ratio: default_transition_ratio(),
            transition_max: default_transition_max(),
            stable_visibility: default_stable_visibility(),
            fallback_visibility: default_fallback_visibility(),
            best_frame_ratio: default_best_frame_ratio(),
            min_best_frames: default_min_best_frames(),
            max_feedback: default_max_feedback(),
            frame_timeout: default_frame_timeout(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// ファイルがなければデフォルト設定
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("config load failed, using defaults: {:#}", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.smoothing.capacity, 30);
        assert!((config.classifier.match_threshold - 0.75).abs() < 1e-6);
        assert_eq!(config.classifier.confirm_frames, 3);
        assert!((config.sequence.merge_gap - 1.5).abs() < 1e-9);
        assert!(!config.evaluator.rule_fallback);
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [classifier]
            match_threshold = 0.8

            [sequence]
            sample_interval = 0.25
            "#,
        )
        .unwrap();
        assert!((config.classifier.match_threshold - 0.8).abs() < 1e-6);
        assert!((config.classifier.rescue_floor - 0.5).abs() < 1e-6);
        assert!((config.sequence.sample_interval - 0.25).abs() < 1e-9);
        assert!((config.sequence.min_segment - 2.0).abs() < 1e-9);
        assert!((config.normalize.depth_weight - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_data_section() {
        let config: Config = toml::from_str(
            r#"
            [data]
            reference_poses = "my_poses.json"
            recommendations = "my_recommendations.toml"

            [evaluator]
            rule_fallback = true
            "#,
        )
        .unwrap();
        assert_eq!(config.data.reference_poses.as_deref(), Some("my_poses.json"));
        assert_eq!(
            config.data.recommendations.as_deref(),
            Some("my_recommendations.toml")
        );
        assert!(config.evaluator.rule_fallback);
        assert!((config.evaluator.advanced - 85.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_or_default("does/not/exist.toml");
        assert_eq!(config.smoothing.capacity, 30);
        assert!(config.data.reference_poses.is_none());
    }
}
