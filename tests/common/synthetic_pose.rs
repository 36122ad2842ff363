#![allow(dead_code)]

use pose_coach::pose::{Landmark, LandmarkIndex, NormalizedVector};
use pose_coach::replay::{RecordedFrame, Recording};

/// 正規化ベクトルから画像座標のランドマークを作り直す（拡大・平行移動つき）
pub fn landmarks_from_vector(vector: &NormalizedVector, scale: f32, offset: (f32, f32)) -> Vec<Landmark> {
    let depth_weight = 1.5;
    (0..LandmarkIndex::COUNT)
        .map(|i| {
            let v = &vector.as_slice()[i * 3..i * 3 + 3];
            Landmark::new(
                v[0] * scale + offset.0,
                v[1] * scale + offset.1,
                v[2] / depth_weight * scale,
                1.0,
            )
        })
        .collect()
}

/// 肩・腰が見えない（正規化できない）フレーム
pub fn hidden_body() -> Vec<Landmark> {
    vec![Landmark::new(0.5, 0.5, 0.0, 0.05); LandmarkIndex::COUNT]
}

/// 0.5 秒刻みの記録。`frame_at` が None を返した時刻は人物なし
pub fn recording<F>(duration: f64, frame_at: F) -> Recording
where
    F: Fn(f64) -> Option<Vec<Landmark>>,
{
    let frames = (0..)
        .map(|i| i as f64 * 0.5)
        .take_while(|&t| t < duration)
        .map(|time| RecordedFrame {
            time,
            landmarks: frame_at(time),
            thumbnail: Some(format!("frame-{:.1}", time)),
        })
        .collect();
    Recording {
        video_name: Some("synthetic.mp4".into()),
        duration: Some(duration),
        frames,
    }
}
