//! 参照ポーズライブラリ
//!
//! ポーズ名 → 正規化ベクトル（＋名前付きバリエーション）の静的カタログ。
//! 起動時に一度読み込み、以後は `Arc` で読み取り専用に共有する。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::PoseError;
use crate::evaluator::Level;
use crate::pose::NormalizedVector;

const BUILTIN_LIBRARY: &str = include_str!("../data/reference_poses.json");

/// ラベル中のバリエーション区切り ("Parent - Variation")
pub const VARIATION_SEPARATOR: &str = " - ";

/// バリエーションに付く幾何チェック
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryCheck {
    /// 両膝がほぼ伸展している
    LegsExtended,
}

/// 名前付きバリエーション（難易度違いなど）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variation {
    pub name: String,
    pub vector: NormalizedVector,
    /// このバリエーションを達成した場合の最低レベル
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_level: Option<Level>,
    /// `min_level` を適用する前に満たすべき幾何条件
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<GeometryCheck>,
}

/// 1つのエクササイズの基準姿勢
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceAnchor {
    pub name: String,
    pub vector: NormalizedVector,
    #[serde(default)]
    pub variations: Vec<Variation>,
    /// 全部位が合格したときのヒント
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
}

impl ReferenceAnchor {
    pub fn new(name: impl Into<String>, vector: NormalizedVector) -> Self {
        Self {
            name: name.into(),
            vector,
            variations: Vec::new(),
            tip: None,
        }
    }

    pub fn with_variation(mut self, name: impl Into<String>, vector: NormalizedVector) -> Self {
        self.variations.push(Variation {
            name: name.into(),
            vector,
            min_level: None,
            check: None,
        });
        self
    }

    pub fn variation(&self, name: &str) -> Option<&Variation> {
        self.variations.iter().find(|v| v.name == name)
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct LibraryFile {
    #[serde(default = "default_version")]
    version: u32,
    poses: Vec<ReferenceAnchor>,
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceLibrary {
    anchors: Vec<ReferenceAnchor>,
}

impl ReferenceLibrary {
    pub fn new(anchors: Vec<ReferenceAnchor>) -> crate::error::Result<Self> {
        let mut names = HashSet::new();
        for anchor in &anchors {
            if anchor.name.is_empty() || anchor.name.contains(VARIATION_SEPARATOR) {
                return Err(PoseError::Library(format!(
                    "invalid pose name {:?}",
                    anchor.name
                )));
            }
            if !names.insert(anchor.name.as_str()) {
                return Err(PoseError::Library(format!(
                    "duplicate pose {:?}",
                    anchor.name
                )));
            }
            let mut variation_names = HashSet::new();
            for v in &anchor.variations {
                if !variation_names.insert(v.name.as_str()) {
                    return Err(PoseError::Library(format!(
                        "duplicate variation {:?} in {:?}",
                        v.name, anchor.name
                    )));
                }
            }
        }
        Ok(Self { anchors })
    }

    /// 組み込みライブラリ
    pub fn builtin() -> crate::error::Result<Self> {
        Self::from_json(BUILTIN_LIBRARY)
    }

    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        let file: LibraryFile =
            serde_json::from_str(json).map_err(|e| PoseError::Library(e.to_string()))?;
        Self::new(file.poses)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read reference library {}", path.display()))?;
        let library = Self::from_json(&content)?;
        Ok(library)
    }

    /// パスがあればファイル、なければ組み込み版
    pub fn load_or_builtin(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::builtin()?),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let file = LibraryFile {
            version: default_version(),
            poses: self.anchors.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn anchors(&self) -> &[ReferenceAnchor] {
        &self.anchors
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ReferenceAnchor> {
        self.anchors.iter().find(|a| a.name == name)
    }

    /// "Parent" または "Parent - Variation" を解決する
    pub fn resolve(&self, label: &str) -> Option<(&ReferenceAnchor, Option<&Variation>)> {
        if let Some(anchor) = self.get(label) {
            return Some((anchor, None));
        }
        let (parent, variation) = label.split_once(VARIATION_SEPARATOR)?;
        let anchor = self.get(parent)?;
        let variation = anchor.variation(variation)?;
        Some((anchor, Some(variation)))
    }
}
