use std::fmt;
use std::path::PathBuf;

use tracing::info;

use super::{video_stem, BatchReport};
use crate::config::Config;
use crate::error::{ItemOutcome, PipelineError};
use crate::marker::{extract_file, ExtractOptions};
use crate::slicing::{OffsetEntry, OffsetTable};
use crate::video::VideoBackend;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractStatus {
    Written { path: PathBuf, frames: usize },
    /// 出力が既にあるので何もしない
    AlreadyExists(PathBuf),
}

impl fmt::Display for ExtractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Written { path, frames } => write!(f, "{} frames -> {}", frames, path.display()),
            Self::AlreadyExists(path) => write!(f, "{} already exists", path.display()),
        }
    }
}

/// オフセット表1行分の抽出
///
/// 出力フレーム数は動画のフレーム数に合わせる。
pub fn extract_recording<B: VideoBackend>(
    config: &Config,
    entry: &OffsetEntry,
    backend: &B,
) -> ItemOutcome<ExtractStatus> {
    let paths = &config.paths;
    let video = paths.raw_video(&entry.session, &entry.video_name);
    let csv = paths.raw_csv(&entry.csv_name);
    if !video.is_file() {
        return ItemOutcome::Skipped(PipelineError::missing_input("raw video", video));
    }
    if !csv.is_file() {
        return ItemOutcome::Skipped(PipelineError::missing_input("marker CSV", csv));
    }

    let output = paths.joint_table(&entry.session, &video_stem(&entry.video_name));
    if output.exists() {
        return ItemOutcome::Done(ExtractStatus::AlreadyExists(output));
    }

    let total_frames = match backend.frame_count(&video) {
        Ok(n) if n > 0 => n,
        Ok(_) => {
            return ItemOutcome::Skipped(PipelineError::invalid_input(format!(
                "{} reports no frames",
                video.display()
            )))
        }
        Err(e) => {
            return ItemOutcome::Skipped(PipelineError::invalid_input(format!(
                "cannot read frame count of {}: {:#}",
                video.display(),
                e
            )))
        }
    };

    let options = ExtractOptions {
        offset: entry.extraction_offset(),
        total_frames: Some(total_frames),
        metadata_rows: config.extract.metadata_rows,
    };
    match extract_file(&csv, &output, config.extract.skip_rows, &options) {
        Ok(extraction) => ItemOutcome::Done(ExtractStatus::Written {
            path: output,
            frames: extraction.sequence.len(),
        }),
        Err(e) => ItemOutcome::Failed(e),
    }
}

/// オフセット表の全行を抽出
pub fn extract_all<B: VideoBackend>(config: &Config, offsets: &OffsetTable, backend: &B) -> BatchReport {
    let mut report = BatchReport::default();
    for entry in offsets.entries() {
        let outcome = extract_recording(config, entry, backend);
        report.record("extract", &format!("{}/{}", entry.session, entry.video_name), &outcome);
    }
    info!(
        "[extract] done {}, skipped {}, failed {}",
        report.done, report.skipped, report.failed
    );
    report
}
