//! 補強エクササイズの推薦
//!
//! (ポーズ, 弱点指標) → 指標のみ → 既定 の順に引く。
//! 表はデータファイルで持ち、読み込み時に参照先IDを検証する。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use crate::error::PoseError;

const BUILTIN_TABLE: &str = include_str!("../data/recommendations.toml");

/// 補強エクササイズ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub title: String,
    pub target_indicator: String,
    pub level: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
}

/// 推薦結果（スコアが分かっていれば理由付き）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub exercise: Exercise,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableFile {
    default: String,
    exercises: Vec<Exercise>,
    #[serde(default)]
    by_indicator: BTreeMap<String, String>,
    #[serde(default)]
    by_pose: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    exercises: HashMap<String, Exercise>,
    default_id: String,
    by_indicator: BTreeMap<String, String>,
    by_pose: BTreeMap<String, BTreeMap<String, String>>,
}

impl RecommendationEngine {
    pub fn builtin() -> crate::error::Result<Self> {
        Self::from_toml(BUILTIN_TABLE)
    }

    pub fn from_toml(content: &str) -> crate::error::Result<Self> {
        let file: TableFile =
            toml::from_str(content).map_err(|e| PoseError::Library(e.to_string()))?;
        Self::from_table(file)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read recommendation table {}", path.display()))?;
        let engine = Self::from_toml(&content)
            .with_context(|| format!("Invalid recommendation table {}", path.display()))?;
        Ok(engine)
    }

    /// パスがあればファイル、なければ組み込み版
    pub fn load_or_builtin(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::builtin()?),
        }
    }

    fn from_table(file: TableFile) -> crate::error::Result<Self> {
        let mut exercises = HashMap::new();
        for exercise in file.exercises {
            let id = exercise.id.clone();
            if exercises.insert(id.clone(), exercise).is_some() {
                return Err(PoseError::Library(format!("duplicate exercise id {:?}", id)));
            }
        }

        let known = |id: &String| -> crate::error::Result<()> {
            if exercises.contains_key(id) {
                Ok(())
            } else {
                Err(PoseError::Library(format!("unknown exercise id {:?}", id)))
            }
        };
        known(&file.default)?;
        for id in file.by_indicator.values() {
            known(id)?;
        }
        for id in file.by_pose.values().flat_map(|m| m.values()) {
            known(id)?;
        }

        Ok(Self {
            exercises,
            default_id: file.default,
            by_indicator: file.by_indicator,
            by_pose: file.by_pose,
        })
    }

    pub fn exercise(&self, id: &str) -> Option<&Exercise> {
        self.exercises.get(id)
    }

    pub fn default_exercise(&self) -> &Exercise {
        // 構築時に存在を検証済み
        &self.exercises[&self.default_id]
    }

    /// 必ず何かを返す
    pub fn recommend(&self, pose: &str, indicator: &str) -> &Exercise {
        self.by_pose
            .get(pose)
            .and_then(|m| m.get(indicator))
            .or_else(|| self.by_indicator.get(indicator))
            .and_then(|id| self.exercises.get(id))
            .unwrap_or_else(|| self.default_exercise())
    }

    /// セッション全体の弱点指標だけで引く
    pub fn recommend_for_indicator(&self, indicator: &str) -> &Exercise {
        self.by_indicator
            .get(indicator)
            .and_then(|id| self.exercises.get(id))
            .unwrap_or_else(|| self.default_exercise())
    }

    pub fn recommend_with_reason(
        &self,
        pose: &str,
        indicator: &str,
        score: Option<f32>,
    ) -> Recommendation {
        Recommendation {
            exercise: self.recommend(pose, indicator).clone(),
            reason: score.map(|s| reason(indicator, s)),
        }
    }
}

fn reason(indicator: &str, score: f32) -> String {
    format!(
        "We noticed your {} score was {}/100. This exercise will help you improve it.",
        indicator,
        score.round() as i32
    )
}
