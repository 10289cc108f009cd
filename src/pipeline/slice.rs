use std::fmt;
use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::{error, info};

use super::{video_stem, BatchReport};
use crate::config::{Config, RecordingConfig};
use crate::error::{ItemOutcome, PipelineError};
use crate::pose::{load_joint_csv, save_joint_csv};
use crate::slicing::{load_descriptors, slice_video, ClipPlan, OffsetTable, RecordingId, RepetitionSlicer};
use crate::video::{FrameSource, VideoBackend};

/// 1録画分のスライス結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceSummary {
    pub clips: usize,
    pub tables_written: usize,
    pub videos_written: usize,
    /// 系列・動画が足りず短くなったクリップ
    pub truncated: usize,
    /// 書き出しに失敗したテーブル・動画
    pub failed: usize,
}

impl fmt::Display for SliceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} clips, {} tables, {} videos, {} truncated, {} failed",
            self.clips, self.tables_written, self.videos_written, self.truncated, self.failed
        )
    }
}

fn write_video_clip<B: VideoBackend>(
    backend: &B,
    raw_video: &Path,
    output: &Path,
    plan: &ClipPlan,
) -> Result<bool> {
    let mut source = backend.open(raw_video)?;
    let sink = backend.create(output, &source.properties())?;
    let report = slice_video(&mut source, sink, &plan.range)?;
    Ok(report.is_truncated())
}

/// 1録画分の関節テーブルと動画を、同じ識別子で切り出す
pub fn slice_recording<B: VideoBackend>(
    config: &Config,
    offsets: &OffsetTable,
    recording: &RecordingConfig,
    backend: &B,
) -> ItemOutcome<SliceSummary> {
    let paths = &config.paths;
    let id = match RecordingId::from_video_name(&recording.video) {
        Ok(id) => id,
        Err(e) => return ItemOutcome::Skipped(e),
    };
    let offset = match offsets.offset_for(&recording.session, &recording.video) {
        Some(offset) => offset,
        None => {
            return ItemOutcome::Skipped(PipelineError::missing_input(
                format!("offset for {}/{}", recording.session, recording.video),
                &paths.offset_table,
            ))
        }
    };

    let stem = video_stem(&recording.video);
    let joint_table = paths.joint_table(&recording.session, &stem);
    let raw_video = paths.raw_video(&recording.session, &recording.video);
    for (what, path) in [
        ("annotations", &recording.annotations),
        ("joint table", &joint_table),
        ("raw video", &raw_video),
    ] {
        if !path.is_file() {
            return ItemOutcome::Skipped(PipelineError::missing_input(what, path));
        }
    }

    let descriptors = match load_descriptors(&recording.annotations) {
        Ok(d) => d,
        Err(e) => return ItemOutcome::Failed(e),
    };
    let sequence = match load_joint_csv(&joint_table) {
        Ok(s) => s,
        Err(e) => return ItemOutcome::Failed(e),
    };

    let slicer = RepetitionSlicer::new(id, &descriptors, offset);
    let mut summary = SliceSummary {
        clips: slicer.plans().len(),
        ..SliceSummary::default()
    };

    let table_dir = paths.clip_table_dir(&stem);
    for clip in slicer.slice_sequence(&sequence) {
        let path = table_dir.join(clip.identity.file_name("csv"));
        match save_joint_csv(&path, &clip.clip) {
            Ok(()) => {
                summary.tables_written += 1;
                if clip.overrun.is_some() {
                    summary.truncated += 1;
                }
            }
            Err(e) => {
                error!("[slice] [fail] {}: {:#}", clip.identity, e);
                summary.failed += 1;
            }
        }
    }

    // 動画の読み書きはクリップごとに開いて閉じる
    let video_dir = paths.clip_video_dir(&stem);
    for plan in slicer.plans() {
        let path = video_dir.join(plan.identity.file_name(&config.video.extension));
        match write_video_clip(backend, &raw_video, &path, plan) {
            Ok(truncated) => {
                summary.videos_written += 1;
                if truncated {
                    summary.truncated += 1;
                }
            }
            Err(e) => {
                error!("[slice] [fail] {}: {:#}", plan.identity, e);
                summary.failed += 1;
            }
        }
    }

    // 書けたクリップは残すが、録画としては失敗扱い
    if summary.failed > 0 {
        return ItemOutcome::Failed(anyhow!("clip writes failed ({})", summary));
    }
    ItemOutcome::Done(summary)
}

/// 設定された全録画をスライス
pub fn slice_all<B: VideoBackend>(config: &Config, offsets: &OffsetTable, backend: &B) -> BatchReport {
    let mut report = BatchReport::default();
    for recording in &config.recordings {
        let outcome = slice_recording(config, offsets, recording, backend);
        report.record("slice", &format!("{}/{}", recording.session, recording.video), &outcome);
    }
    info!(
        "[slice] done {}, skipped {}, failed {}",
        report.done, report.skipped, report.failed
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract_all;
    use crate::pipeline::tests::{files_in, fixture};
    use crate::pose::JointIndex;
    use std::fs;

    #[test]
    fn test_slice_recording() {
        let fx = fixture();
        let offsets = fx.offsets();
        extract_all(&fx.config, &offsets, &fx.backend);

        let outcome = slice_recording(&fx.config, &offsets, &fx.config.recordings[0], &fx.backend);
        let summary = match outcome {
            ItemOutcome::Done(s) => s,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(
            summary,
            SliceSummary {
                clips: 3,
                tables_written: 3,
                videos_written: 3,
                truncated: 0,
                failed: 0
            }
        );

        let tables = files_in(&fx.config.paths.clip_table_dir("01_boss_C"));
        let names: Vec<String> = tables
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "01_boss_C_raise-arm_row1_rep1.csv",
                "01_boss_C_raise-arm_row1_rep2.csv",
                "01_boss_C_raise-arm_row2_rep1.csv",
            ]
        );

        // 関節テーブルは [12, 22)、動画は 12..=22
        let table = load_joint_csv(&tables[0]).unwrap();
        assert_eq!(table.len(), 10);
        // 抽出済みテーブルの行 12 は生行 14（x = 18）
        assert_eq!(table.frames()[0].get(JointIndex::Pelvis)[0], 18.0);

        let video_path = fx
            .config
            .paths
            .clip_video_dir("01_boss_C")
            .join("01_boss_C_raise-arm_row1_rep1.mp4");
        let video = fx.backend.video(&video_path).unwrap();
        assert!(video.finished);
        assert_eq!(video.indices(), (12..=22).collect::<Vec<_>>());
        assert_eq!(video.frames.len(), table.len() + 1);
    }

    #[test]
    fn test_missing_offset_produces_no_clips() {
        let fx = fixture();
        let offsets = fx.offsets();
        extract_all(&fx.config, &offsets, &fx.backend);

        let report = slice_all(&fx.config, &offsets, &fx.backend);
        assert_eq!(report, BatchReport { done: 1, skipped: 1, failed: 0 });
        assert!(!fx.config.paths.clip_table_dir("01_candy_C").exists());
        assert!(!fx.config.paths.clip_video_dir("01_candy_C").exists());
        // 他の録画はそのまま処理される
        assert_eq!(files_in(&fx.config.paths.clip_video_dir("01_boss_C")).len(), 3);
    }

    #[test]
    fn test_clip_write_failure_fails_recording() {
        let fx = fixture();
        let offsets = fx.offsets();
        extract_all(&fx.config, &offsets, &fx.backend);
        // テーブルの出力先をファイルで塞ぐ
        let table_dir = fx.config.paths.clip_table_dir("01_boss_C");
        fs::create_dir_all(table_dir.parent().unwrap()).unwrap();
        fs::write(&table_dir, "").unwrap();

        let outcome = slice_recording(&fx.config, &offsets, &fx.config.recordings[0], &fx.backend);
        let message = match outcome {
            ItemOutcome::Failed(e) => e.to_string(),
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert!(message.contains("0 tables, 3 videos, 0 truncated, 3 failed"), "{}", message);
        // 動画は書けている
        assert_eq!(files_in(&fx.config.paths.clip_video_dir("01_boss_C")).len(), 3);

        let report = slice_all(&fx.config, &offsets, &fx.backend);
        assert_eq!(report, BatchReport { done: 0, skipped: 1, failed: 1 });
    }

    #[test]
    fn test_missing_joint_table_is_skipped() {
        let fx = fixture();
        let outcome = slice_recording(&fx.config, &fx.offsets(), &fx.config.recordings[0], &fx.backend);
        assert!(matches!(outcome, ItemOutcome::Skipped(PipelineError::MissingInput { .. })));
    }

    #[test]
    fn test_overrun_is_counted() {
        let fx = fixture();
        let offsets = fx.offsets();
        extract_all(&fx.config, &offsets, &fx.backend);
        fs::write(
            &fx.config.recordings[0].annotations,
            "Action,Repetition 1 Start,Repetition 1 End\nJump,90,110\n",
        )
        .unwrap();

        let outcome = slice_recording(&fx.config, &offsets, &fx.config.recordings[0], &fx.backend);
        let summary = match outcome {
            ItemOutcome::Done(s) => s,
            other => panic!("unexpected outcome: {:?}", other),
        };
        // テーブルも動画も 100 フレームで切れる
        assert_eq!(summary.truncated, 2);
        let video = fx
            .backend
            .video(
                &fx.config
                    .paths
                    .clip_video_dir("01_boss_C")
                    .join("01_boss_C_jump_row1_rep1.mp4"),
            )
            .unwrap();
        assert_eq!(video.indices(), (92..100).collect::<Vec<_>>());
    }
}
