//! パイプラインのエラー分類
//!
//! 1件の録画・クリップ・フレームの失敗でバッチ全体を止めないため、
//! スキップ理由はこの型で各アイテムの結果に載せて報告する。

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// 必須入力（キャリブレーション、アノテーション、オフセット行、ファイル）が無い
    #[error("missing input: {what} ({})", path.display())]
    MissingInput { what: String, path: PathBuf },

    /// ファイル名が命名規則に一致しない
    #[error("unresolved naming: {0}")]
    UnresolvedNaming(String),

    /// 関節スロットのマーカー列が見つからない
    #[error("schema gap: joint {joint} has no columns for {label} ({kind})")]
    SchemaGap {
        joint: usize,
        label: String,
        kind: String,
    },

    /// スライス範囲が実際の系列長を超えた
    #[error("boundary overrun: wanted frames up to {wanted}, only {available} available")]
    BoundaryOverrun { wanted: usize, available: usize },

    /// 入力の内容が不正（形状違い、数値でない値など）
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl PipelineError {
    pub fn missing_input(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingInput {
            what: what.into(),
            path: path.into(),
        }
    }

    pub fn unresolved_naming(name: impl Into<String>) -> Self {
        Self::UnresolvedNaming(name.into())
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }
}

/// バッチ内1アイテムの処理結果
#[derive(Debug)]
pub enum ItemOutcome<T> {
    Done(T),
    Skipped(PipelineError),
    Failed(anyhow::Error),
}

impl<T> ItemOutcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}
