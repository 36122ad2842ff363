use std::collections::VecDeque;

use crate::config::SmoothingConfig;
use crate::pose::{LandmarkIndex, NormalizedVector};

/// 正規化ベクトルの時間平滑化バッファ
///
/// 平均: 成分ごとのEMA（最初のベクトルで初期化）
/// 速度: 直近2つの生ベクトルのL1距離
pub struct SmoothingBuffer {
    capacity: usize,
    alpha: f32,
    history: VecDeque<NormalizedVector>,
    ema: Option<NormalizedVector>,
}

impl SmoothingBuffer {
    pub fn new(capacity: usize, alpha: f32) -> Self {
        let capacity = capacity.max(2);
        Self {
            capacity,
            alpha,
            history: VecDeque::with_capacity(capacity),
            ema: None,
        }
    }

    pub fn from_config(config: &SmoothingConfig) -> Self {
        Self::new(config.capacity, config.alpha)
    }

    pub fn add(&mut self, vector: &NormalizedVector) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(vector.clone());

        let a = self.alpha;
        match self.ema.as_mut() {
            Some(ema) => {
                for (e, v) in ema.as_mut_slice().iter_mut().zip(vector.as_slice()) {
                    *e = a * v + (1.0 - a) * *e;
                }
            }
            None => self.ema = Some(vector.clone()),
        }
    }

    /// 現在のEMA（未入力なら None）
    pub fn average(&self) -> Option<&NormalizedVector> {
        self.ema.as_ref()
    }

    /// 直近2フレーム間の移動量
    ///
    /// `joints` を指定するとその関節の xyz 成分のみで計算する。
    pub fn velocity(&self, joints: Option<&[LandmarkIndex]>) -> f32 {
        let n = self.history.len();
        if n < 2 {
            return 0.0;
        }
        let current = self.history[n - 1].as_slice();
        let previous = self.history[n - 2].as_slice();

        match joints {
            Some(joints) => joints
                .iter()
                .flat_map(|idx| {
                    let base = idx.offset();
                    base..base + 3
                })
                .map(|i| (current[i] - previous[i]).abs())
                .sum(),
            None => current
                .iter()
                .zip(previous)
                .map(|(c, p)| (c - p).abs())
                .sum(),
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.ema = None;
    }
}

impl Default for SmoothingBuffer {
    fn default() -> Self {
        Self::from_config(&SmoothingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(value: f32) -> NormalizedVector {
        NormalizedVector::try_from(vec![value; LandmarkIndex::VECTOR_LEN]).unwrap()
    }

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_empty_average_is_none() {
        let buf = SmoothingBuffer::default();
        assert!(buf.average().is_none());
        assert_eq!(buf.velocity(None), 0.0);
    }

    #[test]
    fn test_first_vector_passthrough() {
        let mut buf = SmoothingBuffer::new(30, 0.6);
        buf.add(&filled(2.0));
        assert_eq!(buf.average(), Some(&filled(2.0)));
    }

    #[test]
    fn test_ema_update() {
        let mut buf = SmoothingBuffer::new(30, 0.6);
        buf.add(&filled(0.0));
        buf.add(&filled(1.0));
        // 0.6 * 1.0 + 0.4 * 0.0
        let avg = buf.average().unwrap();
        assert!(avg.as_slice().iter().all(|v| approx_eq(*v, 0.6, 1e-6)));
        buf.add(&filled(1.0));
        // 0.6 * 1.0 + 0.4 * 0.6
        let avg = buf.average().unwrap();
        assert!(avg.as_slice().iter().all(|v| approx_eq(*v, 0.84, 1e-6)));
    }

    #[test]
    fn test_full_smoothing() {
        let mut buf = SmoothingBuffer::new(30, 0.0);
        buf.add(&filled(1.0));
        buf.add(&filled(5.0));
        assert_eq!(buf.average(), Some(&filled(1.0)));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut buf = SmoothingBuffer::new(3, 0.6);
        for i in 0..5 {
            buf.add(&filled(i as f32));
        }
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_velocity_uses_raw_vectors() {
        let mut buf = SmoothingBuffer::new(30, 0.1);
        buf.add(&filled(0.0));
        buf.add(&filled(0.5));
        // EMAではなく生ベクトルの差: 99 * 0.5
        assert!(approx_eq(buf.velocity(None), 49.5, 1e-3));
    }

    #[test]
    fn test_velocity_joint_subset() {
        let mut buf = SmoothingBuffer::new(30, 0.6);
        let still = filled(0.0);
        let mut moved = filled(0.0);
        let base = LandmarkIndex::LeftWrist.offset();
        moved.as_mut_slice()[base] = 1.0;
        buf.add(&still);
        buf.add(&moved);

        // 手首だけ動いても体幹の速度は0
        assert_eq!(buf.velocity(Some(&LandmarkIndex::CORE)), 0.0);
        assert!(approx_eq(
            buf.velocity(Some(&[LandmarkIndex::LeftWrist])),
            1.0,
            1e-6
        ));
    }

    #[test]
    fn test_reset() {
        let mut buf = SmoothingBuffer::new(30, 0.0);
        buf.add(&filled(1.0));
        buf.reset();
        assert!(buf.is_empty());
        buf.add(&filled(4.0));
        assert_eq!(buf.average(), Some(&filled(4.0)));
    }
}
