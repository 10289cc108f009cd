use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use super::{video_stem, BatchReport};
use crate::calibration::load_calibration;
use crate::config::{Config, RecordingConfig};
use crate::error::{ItemOutcome, PipelineError};
use crate::pose::load_point_track;
use crate::projection::CameraProjector;
use crate::render::{Overlay, PreviewReport, PreviewRenderer};
use crate::slicing::ClipIdentity;
use crate::video::{FrameSource, VideoBackend};

/// 1録画分のプレビュー結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreviewSummary {
    pub rendered: usize,
    /// 動画が先に尽きたクリップ
    pub stopped_early: usize,
    /// テーブルと動画の片方しかないクリップ
    pub unpaired: usize,
    /// 命名規則に合わないファイル
    pub unresolved: usize,
    pub failed: usize,
}

impl fmt::Display for PreviewSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rendered ({} short), {} unpaired, {} unresolved, {} failed",
            self.rendered, self.stopped_early, self.unpaired, self.unresolved, self.failed
        )
    }
}

/// `dir` 内の `.{extension}` ファイルをクリップ識別子で引けるようにする
fn list_clips(dir: &Path, extension: &str, summary: &mut PreviewSummary) -> Result<BTreeMap<String, PathBuf>> {
    let mut clips = BTreeMap::new();
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        match ClipIdentity::from_file_name(name) {
            Ok(identity) => {
                clips.insert(identity.stem(), path);
            }
            Err(e) => {
                warn!("[preview] [skip] {}", e);
                summary.unresolved += 1;
            }
        }
    }
    Ok(clips)
}

/// 関節クリップ1本を動画クリップに重ねて `output` に書く
pub fn preview_clip<B>(
    renderer: &PreviewRenderer,
    backend: &B,
    table: &Path,
    video: &Path,
    output: &Path,
) -> Result<PreviewReport>
where
    B: VideoBackend,
    B::Frame: Overlay,
{
    let track = load_point_track(table)?;
    let mut source = backend.open(video)?;
    let sink = backend.create(output, &source.properties())?;
    renderer.render(&track, &mut source, sink)
}

/// 1録画分のクリップを識別子で対にしてプレビューを作る
pub fn preview_recording<B>(
    config: &Config,
    renderer: &PreviewRenderer,
    recording: &RecordingConfig,
    backend: &B,
) -> ItemOutcome<PreviewSummary>
where
    B: VideoBackend,
    B::Frame: Overlay,
{
    let paths = &config.paths;
    let stem = video_stem(&recording.video);
    let table_dir = paths.clip_table_dir(&stem);
    let video_dir = paths.clip_video_dir(&stem);
    for (what, dir) in [("clip tables", &table_dir), ("clip videos", &video_dir)] {
        if !dir.is_dir() {
            return ItemOutcome::Skipped(PipelineError::missing_input(what, dir));
        }
    }

    let mut summary = PreviewSummary::default();
    let tables = match list_clips(&table_dir, "csv", &mut summary) {
        Ok(t) => t,
        Err(e) => return ItemOutcome::Failed(e),
    };
    let videos = match list_clips(&video_dir, &config.video.extension, &mut summary) {
        Ok(v) => v,
        Err(e) => return ItemOutcome::Failed(e),
    };

    for clip in videos.keys().filter(|k| !tables.contains_key(*k)) {
        warn!("[preview] [skip] {}: no clip table", clip);
        summary.unpaired += 1;
    }

    let output_dir = paths.preview_video_dir(&stem);
    for (clip, table) in &tables {
        let video = match videos.get(clip) {
            Some(v) => v,
            None => {
                warn!("[preview] [skip] {}: no clip video", clip);
                summary.unpaired += 1;
                continue;
            }
        };
        let output = output_dir.join(format!("preview_{}.{}", clip, config.video.extension));
        match preview_clip(renderer, backend, table, video, &output) {
            Ok(report) => {
                info!(
                    "[preview] [ok] {}: {} frames, {} markers",
                    clip, report.frames_written, report.markers_drawn
                );
                summary.rendered += 1;
                if report.stopped_early {
                    summary.stopped_early += 1;
                }
            }
            Err(e) => {
                error!("[preview] [fail] {}: {:#}", clip, e);
                summary.failed += 1;
            }
        }
    }

    ItemOutcome::Done(summary)
}

/// 設定された全録画のプレビューを作る
///
/// キャリブレーションが読めなければ何もせずエラー。
pub fn preview_all<B>(config: &Config, backend: &B) -> Result<BatchReport>
where
    B: VideoBackend,
    B::Frame: Overlay,
{
    let camera = load_calibration(&config.paths.calibration_file)?;
    let renderer = PreviewRenderer::new(CameraProjector::new(&camera), config.preview.style());

    let mut report = BatchReport::default();
    for recording in &config.recordings {
        let outcome = preview_recording(config, &renderer, recording, backend);
        report.record("preview", &format!("{}/{}", recording.session, recording.video), &outcome);
    }
    info!(
        "[preview] done {}, skipped {}, failed {}",
        report.done, report.skipped, report.failed
    );
    Ok(report)
}
