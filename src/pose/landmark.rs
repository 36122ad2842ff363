use serde::{Deserialize, Serialize};

use crate::error::{PoseError, Result};

/// BlazePose の 33 ランドマークインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    /// 正規化ベクトルの次元数 (33 × xyz)
    pub const VECTOR_LEN: usize = Self::COUNT * 3;

    /// 正規化のアンカー（両肩・両腰）
    pub const ANCHORS: [LandmarkIndex; 4] = [
        LandmarkIndex::LeftShoulder,
        LandmarkIndex::RightShoulder,
        LandmarkIndex::LeftHip,
        LandmarkIndex::RightHip,
    ];

    /// 体幹の静止判定に使う関節
    pub const CORE: [LandmarkIndex; 4] = Self::ANCHORS;

    pub fn from_index(index: usize) -> Option<Self> {
        use LandmarkIndex::*;
        const ALL: [LandmarkIndex; LandmarkIndex::COUNT] = [
            Nose, LeftEyeInner, LeftEye, LeftEyeOuter, RightEyeInner, RightEye,
            RightEyeOuter, LeftEar, RightEar, MouthLeft, MouthRight,
            LeftShoulder, RightShoulder, LeftElbow, RightElbow, LeftWrist, RightWrist,
            LeftPinky, RightPinky, LeftIndex, RightIndex, LeftThumb, RightThumb,
            LeftHip, RightHip, LeftKnee, RightKnee, LeftAnkle, RightAnkle,
            LeftHeel, RightHeel, LeftFootIndex, RightFootIndex,
        ];
        ALL.get(index).copied()
    }

    /// 正規化ベクトル内の先頭オフセット
    pub fn offset(self) -> usize {
        self as usize * 3
    }
}

/// 単一ランドマーク
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f32,
    /// 正規化されたY座標 (0.0〜1.0, 下が正)
    pub y: f32,
    /// 腰中心を基準とした奥行き
    #[serde(default)]
    pub z: f32,
    /// 可視度 (0.0〜1.0)
    #[serde(default)]
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// 可視度が閾値以上か
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility >= threshold
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
        }
    }
}

/// 33ランドマークからなる1フレームの姿勢
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub landmarks: [Landmark; LandmarkIndex::COUNT],
}

impl Pose {
    pub fn new(landmarks: [Landmark; LandmarkIndex::COUNT]) -> Self {
        Self { landmarks }
    }

    /// 長さを検証してから取り込む
    pub fn from_slice(landmarks: &[Landmark]) -> Result<Self> {
        let landmarks: [Landmark; LandmarkIndex::COUNT] =
            landmarks.try_into().map_err(|_| PoseError::InvalidInput {
                expected: LandmarkIndex::COUNT,
                got: landmarks.len(),
            })?;
        Ok(Self { landmarks })
    }

    /// インデックスでランドマークを取得
    pub fn get(&self, index: LandmarkIndex) -> &Landmark {
        &self.landmarks[index as usize]
    }

    /// 全ランドマークの平均可視度
    pub fn average_visibility(&self) -> f32 {
        average_visibility(&self.landmarks)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            landmarks: [Landmark::default(); LandmarkIndex::COUNT],
        }
    }
}

/// 任意長のランドマーク列の平均可視度（空なら0）
pub fn average_visibility(landmarks: &[Landmark]) -> f32 {
    if landmarks.is_empty() {
        return 0.0;
    }
    let sum: f32 = landmarks.iter().map(|l| l.visibility).sum();
    sum / landmarks.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_index_count() {
        assert_eq!(LandmarkIndex::COUNT, 33);
        assert_eq!(LandmarkIndex::VECTOR_LEN, 99);
    }

    #[test]
    fn test_landmark_index_from_index() {
        assert_eq!(LandmarkIndex::from_index(0), Some(LandmarkIndex::Nose));
        assert_eq!(LandmarkIndex::from_index(23), Some(LandmarkIndex::LeftHip));
        assert_eq!(
            LandmarkIndex::from_index(32),
            Some(LandmarkIndex::RightFootIndex)
        );
        assert_eq!(LandmarkIndex::from_index(33), None);
    }

    #[test]
    fn test_offset() {
        assert_eq!(LandmarkIndex::LeftShoulder.offset(), 33);
        assert_eq!(LandmarkIndex::RightHip.offset(), 72);
    }

    #[test]
    fn test_landmark_is_visible() {
        let lm = Landmark::new(0.5, 0.5, 0.0, 0.7);
        assert!(lm.is_visible(0.5));
        assert!(!lm.is_visible(0.8));
    }

    #[test]
    fn test_pose_from_slice_rejects_wrong_count() {
        let short = vec![Landmark::default(); 17];
        match Pose::from_slice(&short) {
            Err(PoseError::InvalidInput { expected, got }) => {
                assert_eq!(expected, 33);
                assert_eq!(got, 17);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_pose_get() {
        let mut landmarks = vec![Landmark::default(); LandmarkIndex::COUNT];
        landmarks[LandmarkIndex::Nose as usize] = Landmark::new(0.5, 0.3, -0.1, 0.9);

        let pose = Pose::from_slice(&landmarks).unwrap();
        let nose = pose.get(LandmarkIndex::Nose);
        assert_eq!(nose.x, 0.5);
        assert_eq!(nose.y, 0.3);
        assert_eq!(nose.z, -0.1);
        assert_eq!(nose.visibility, 0.9);
    }

    #[test]
    fn test_average_visibility() {
        let pose = Pose::new([Landmark::new(0.0, 0.0, 0.0, 0.5); LandmarkIndex::COUNT]);
        assert!((pose.average_visibility() - 0.5).abs() < 0.001);
        assert_eq!(average_visibility(&[]), 0.0);
    }

    #[test]
    fn test_landmark_deserialize_without_z() {
        let lm: Landmark = serde_json::from_str(r#"{"x":0.1,"y":0.2,"visibility":0.9}"#).unwrap();
        assert_eq!(lm.z, 0.0);
        assert_eq!(lm.visibility, 0.9);
    }
}
