//! 全録画・全クリップに対するバッチ処理
//!
//! 1件の失敗はログに残して次へ進む。止まるのは設定・オフセット表・
//! キャリブレーションが読めないときだけ。

pub mod check;
pub mod extract;
pub mod preview;
pub mod slice;

pub use check::check_inputs;
pub use extract::{extract_all, extract_recording, ExtractStatus};
pub use preview::{preview_all, preview_clip, preview_recording, PreviewSummary};
pub use slice::{slice_all, slice_recording, SliceSummary};

use std::fmt::Display;
use std::path::Path;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::ItemOutcome;
use crate::render::Overlay;
use crate::slicing::OffsetTable;
use crate::video::VideoBackend;

/// バッチ1段分の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub done: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.done + self.skipped + self.failed
    }

    /// 結果を1行ログに出して数える
    pub fn record<T: Display>(&mut self, stage: &str, item: &str, outcome: &ItemOutcome<T>) {
        match outcome {
            ItemOutcome::Done(summary) => {
                info!("[{}] [ok] {}: {}", stage, item, summary);
                self.done += 1;
            }
            ItemOutcome::Skipped(reason) => {
                warn!("[{}] [skip] {}: {}", stage, item, reason);
                self.skipped += 1;
            }
            ItemOutcome::Failed(err) => {
                error!("[{}] [fail] {}: {:#}", stage, item, err);
                self.failed += 1;
            }
        }
    }
}

/// `01_boss_C.mp4` → `01_boss_C`
pub fn video_stem(video_name: &str) -> String {
    Path::new(video_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(video_name)
        .to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub extract: BatchReport,
    pub slice: BatchReport,
    pub preview: BatchReport,
}

/// check → extract → slice → preview
///
/// 入力が欠けていれば抽出に進まずエラーを返す。
pub fn run_all<B>(config: &Config, backend: &B) -> Result<RunReport>
where
    B: VideoBackend,
    B::Frame: Overlay,
{
    let offsets = OffsetTable::load(&config.paths.offset_table)?;

    let missing = check_inputs(&config.paths, &offsets);
    if !missing.is_empty() {
        warn!("[run] {} input files are missing, affected recordings will be skipped", missing.len());
    }

    let extract = extract_all(config, &offsets, backend);
    let slice = slice_all(config, &offsets, backend);
    let preview = preview_all(config, backend)?;
    info!(
        "[run] extract {}/{}, slice {}/{}, preview {}/{}",
        extract.done,
        extract.total(),
        slice.done,
        slice.total(),
        preview.done,
        preview.total()
    );

    Ok(RunReport {
        extract,
        slice,
        preview,
    })
}
