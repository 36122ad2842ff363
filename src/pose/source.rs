//! 外部コラボレータとの境界
//!
//! 画像のデコードや姿勢推定モデルの推論はこのクレートの外で行う。
//! バッチ解析はここで定義するトレイト越しに1フレームずつ await する。

use anyhow::Result;

use super::landmark::Landmark;

/// シーク可能な動画ソース
#[allow(async_fn_in_trait)]
pub trait VideoSource {
    /// シークで得られるフレーム（検出器に渡す）
    type Image;

    /// 動画の長さ（秒）。取得できなければ None
    fn duration(&self) -> Option<f64>;

    /// 指定時刻へシークし、そのフレームを返す
    async fn seek(&mut self, time: f64) -> Result<Self::Image>;

    /// レポート用の低解像度サムネイル（参照文字列: data URL やパス）
    fn thumbnail(&self, _image: &Self::Image) -> Option<String> {
        None
    }
}

/// 1フレームから33ランドマークを推定する検出器
#[allow(async_fn_in_trait)]
pub trait LandmarkDetector<I> {
    /// 人物が検出されなければ `Ok(None)`
    async fn detect(&mut self, image: &I) -> Result<Option<Vec<Landmark>>>;

    /// モデルが読み込み済みか
    fn is_ready(&self) -> bool {
        true
    }
}
