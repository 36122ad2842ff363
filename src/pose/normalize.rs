use serde::{Deserialize, Serialize};

use super::landmark::{Landmark, LandmarkIndex, Pose};
use crate::config::NormalizeConfig;
use crate::error::{PoseError, Result};

/// 位置・スケール不変の姿勢ベクトル (33 × xyz = 99次元)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct NormalizedVector(Vec<f32>);

impl NormalizedVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.0
    }

    /// 指定関節の (x, y, z)
    pub fn joint(&self, index: LandmarkIndex) -> [f32; 3] {
        let base = index.offset();
        [self.0[base], self.0[base + 1], self.0[base + 2]]
    }
}

impl TryFrom<Vec<f32>> for NormalizedVector {
    type Error = PoseError;

    fn try_from(values: Vec<f32>) -> Result<Self> {
        if values.len() != LandmarkIndex::VECTOR_LEN {
            return Err(PoseError::Library(format!(
                "vector must have {} components, got {}",
                LandmarkIndex::VECTOR_LEN,
                values.len()
            )));
        }
        Ok(Self(values))
    }
}

impl From<NormalizedVector> for Vec<f32> {
    fn from(v: NormalizedVector) -> Self {
        v.0
    }
}

impl AsRef<[f32]> for NormalizedVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// ランドマーク正規化
///
/// 1. 腰の中点を原点に移動
/// 2. 腰中点〜肩中点の距離（胴体長）で割る
/// 3. 奥行きの潰れを補うため z に重みをかける
#[derive(Debug, Clone)]
pub struct Normalizer {
    visibility_floor: f32,
    depth_weight: f32,
    fallback_torso: f32,
}

impl Normalizer {
    pub fn new(visibility_floor: f32, depth_weight: f32) -> Self {
        Self {
            visibility_floor,
            depth_weight,
            fallback_torso: 1.0,
        }
    }

    pub fn from_config(config: &NormalizeConfig) -> Self {
        Self {
            visibility_floor: config.visibility_floor,
            depth_weight: config.depth_weight,
            fallback_torso: config.fallback_torso,
        }
    }

    /// ランドマーク列を正規化する
    ///
    /// - 33個でなければ `InvalidInput`
    /// - アンカー（両肩・両腰）の可視度が足りなければ `Ok(None)`（フレームを飛ばす）
    /// - 座標に非有限値が含まれる場合も `Ok(None)`
    pub fn normalize(&self, landmarks: &[Landmark]) -> Result<Option<NormalizedVector>> {
        let pose = Pose::from_slice(landmarks)?;
        Ok(self.normalize_pose(&pose))
    }

    pub fn normalize_pose(&self, pose: &Pose) -> Option<NormalizedVector> {
        if LandmarkIndex::ANCHORS
            .iter()
            .any(|&idx| !pose.get(idx).is_visible(self.visibility_floor))
        {
            return None;
        }

        let hip = midpoint(
            pose.get(LandmarkIndex::LeftHip),
            pose.get(LandmarkIndex::RightHip),
        );
        let shoulder = midpoint(
            pose.get(LandmarkIndex::LeftShoulder),
            pose.get(LandmarkIndex::RightShoulder),
        );

        let torso = ((shoulder[0] - hip[0]).powi(2)
            + (shoulder[1] - hip[1]).powi(2)
            + (shoulder[2] - hip[2]).powi(2))
        .sqrt();
        let torso = if torso > 0.0 { torso } else { self.fallback_torso };

        let mut values = Vec::with_capacity(LandmarkIndex::VECTOR_LEN);
        for lm in pose.landmarks.iter() {
            values.push((lm.x - hip[0]) / torso);
            values.push((lm.y - hip[1]) / torso);
            values.push((lm.z - hip[2]) / torso * self.depth_weight);
        }
        // NaN/inf を平滑化に流すと以後のEMAが壊れるので、そのフレームごと捨てる
        if values.iter().any(|c| !c.is_finite()) {
            return None;
        }
        Some(NormalizedVector(values))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_config(&NormalizeConfig::default())
    }
}

fn midpoint(a: &Landmark, b: &Landmark) -> [f32; 3] {
    [(a.x + b.x) / 2.0, (a.y + b.y) / 2.0, (a.z + b.z) / 2.0]
}
