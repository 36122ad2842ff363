//! 幾何ユーティリティ
//!
//! 角度・距離はランドマークの画像平面 (x, y) で計算する。
//! ベクトル同士の比較（コサイン類似度・部位距離）は正規化ベクトル上で行う。

use nalgebra::{Vector2, Vector3};

use super::landmark::{Landmark, LandmarkIndex};

/// 3点 a-b-c の b における角度（度, 0〜180）
pub fn angle(a: &Landmark, b: &Landmark, c: &Landmark) -> f32 {
    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let mut degrees = radians.to_degrees().abs();
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }
    degrees
}

/// 画像平面上のユークリッド距離
pub fn distance(a: &Landmark, b: &Landmark) -> f32 {
    (Vector2::new(a.x, a.y) - Vector2::new(b.x, b.y)).norm()
}

/// コサイン類似度 (-1.0〜1.0)
///
/// 長さ不一致またはゼロベクトルの場合は 0。
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

fn joint(vector: &[f32], index: LandmarkIndex) -> Option<Vector3<f32>> {
    let base = index.offset();
    vector
        .get(base..base + 3)
        .map(Vector3::from_column_slice)
}

/// 指定関節の3D距離の平均（正規化ベクトル上）
pub fn weighted_distance(a: &[f32], b: &[f32], joints: &[LandmarkIndex]) -> f32 {
    let mut total = 0.0f32;
    let mut count = 0usize;
    for &idx in joints {
        if let (Some(pa), Some(pb)) = (joint(a, idx), joint(b, idx)) {
            total += (pa - pb).norm();
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f32
    }
}

/// 標本分散（母分散, 空なら0）
pub fn variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n
}
