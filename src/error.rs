use thiserror::Error;

/// ライブラリ共通のエラー
#[derive(Debug, Error)]
pub enum PoseError {
    /// ランドマーク数が不正（このフレームは「検出なし」扱い）
    #[error("expected {expected} landmarks, got {got}")]
    InvalidInput { expected: usize, got: usize },

    /// 参照ポーズ／推薦テーブルのデータ不正
    #[error("invalid library data: {0}")]
    Library(String),

    /// 動画の長さが取得できない
    #[error("video duration unknown")]
    UnknownDuration,

    /// 姿勢検出器が利用できない
    #[error("landmark detector unavailable")]
    DetectorUnavailable,

    /// 外部から中断された
    #[error("analysis cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, PoseError>;
