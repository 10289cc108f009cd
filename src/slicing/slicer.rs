use std::ops::Range;

use anyhow::Result;
use tracing::warn;

use crate::error::PipelineError;
use crate::pose::JointSequence;
use crate::slicing::{ClipIdentity, RecordingId, RepetitionDescriptor};
use crate::video::{FrameSink, FrameSource};

/// 区間終端の扱い
///
/// 関節テーブルは終了フレームを含まず、動画は含む。
/// そのため同じ区間でも動画クリップの方が1フレーム長い。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndPolicy {
    /// `[start, end)`
    Exclusive,
    /// `[start, end]`
    Inclusive,
}

/// オフセット適用済みの区間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    /// 0 未満は 0 に切り上げ済み
    pub start: usize,
    pub end: i64,
    /// 開始が負になって切り上げたか
    pub start_clamped: bool,
}

impl FrameRange {
    pub fn from_descriptor(descriptor: &RepetitionDescriptor, offset: i64) -> Self {
        let start = descriptor.start_frame.saturating_add(offset);
        let end = descriptor.end_frame.saturating_add(offset);
        Self {
            start: start.max(0) as usize,
            end,
            start_clamped: start < 0,
        }
    }

    /// 終端の扱いに応じた半開区間
    pub fn indices(&self, policy: EndPolicy) -> Range<usize> {
        let end = match policy {
            EndPolicy::Exclusive => self.end,
            EndPolicy::Inclusive => self.end.saturating_add(1),
        };
        let end = end.max(0) as usize;
        self.start..end.max(self.start)
    }

    pub fn len(&self, policy: EndPolicy) -> usize {
        self.indices(policy).len()
    }

    pub fn is_empty(&self, policy: EndPolicy) -> bool {
        self.len(policy) == 0
    }
}

/// 1反復分の切り出し計画。識別子はここで1回だけ作り、両方の切り出しで共有する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipPlan {
    pub identity: ClipIdentity,
    pub range: FrameRange,
}

/// 切り出し結果
#[derive(Debug)]
pub struct SlicedClip<T> {
    pub identity: ClipIdentity,
    pub clip: T,
    /// 系列が足りず短くなった場合
    pub overrun: Option<PipelineError>,
}

/// 動画クリップの書き出し結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoClipReport {
    pub frames_written: usize,
    pub frames_requested: usize,
}

impl VideoClipReport {
    pub fn is_truncated(&self) -> bool {
        self.frames_written < self.frames_requested
    }
}

/// 反復区間で関節テーブルと動画を切り出す
#[derive(Debug, Clone)]
pub struct RepetitionSlicer {
    recording: RecordingId,
    offset: i64,
    plans: Vec<ClipPlan>,
}

impl RepetitionSlicer {
    pub fn new(recording: RecordingId, descriptors: &[RepetitionDescriptor], offset: i64) -> Self {
        let plans = descriptors
            .iter()
            .map(|d| {
                let range = FrameRange::from_descriptor(d, offset);
                if range.start_clamped {
                    warn!(
                        "[slice] {} row {} rep {}: start {} + offset {} < 0, clamped to 0",
                        recording, d.row_index, d.repetition, d.start_frame, offset
                    );
                }
                ClipPlan {
                    identity: ClipIdentity::new(recording.clone(), &d.action, d.row_index, d.repetition),
                    range,
                }
            })
            .collect();

        Self {
            recording,
            offset,
            plans,
        }
    }

    pub fn recording(&self) -> &RecordingId {
        &self.recording
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn plans(&self) -> &[ClipPlan] {
        &self.plans
    }

    /// 関節テーブルを `[start, end)` で切り出す
    pub fn slice_sequence(&self, sequence: &JointSequence) -> Vec<SlicedClip<JointSequence>> {
        self.plans
            .iter()
            .map(|plan| {
                let (clip, overrun) = slice_rows(sequence, &plan.range);
                if let Some(err) = &overrun {
                    warn!("[slice] {}: {}", plan.identity, err);
                }
                SlicedClip {
                    identity: plan.identity.clone(),
                    clip,
                    overrun,
                }
            })
            .collect()
    }
}

/// 関節テーブルの切り出し。終端が系列長を超えたら切り詰める
pub fn slice_rows(sequence: &JointSequence, range: &FrameRange) -> (JointSequence, Option<PipelineError>) {
    let indices = range.indices(EndPolicy::Exclusive);
    let overrun = if indices.end > sequence.len() {
        Some(PipelineError::BoundaryOverrun {
            wanted: indices.end,
            available: sequence.len(),
        })
    } else {
        None
    };
    (sequence.sub_sequence(indices), overrun)
}

/// 動画を `[start, end]` で切り出して `sink` に書く
///
/// 途中で動画が尽きたらそこまでで止める。`sink` はどの経路でも閉じる。
pub fn slice_video<S, K>(source: &mut S, mut sink: K, range: &FrameRange) -> Result<VideoClipReport>
where
    S: FrameSource,
    K: FrameSink<Frame = S::Frame>,
{
    let copied = copy_frames(source, &mut sink, range);
    let closed = sink.finish();
    let report = copied?;
    closed?;
    Ok(report)
}

fn copy_frames<S, K>(source: &mut S, sink: &mut K, range: &FrameRange) -> Result<VideoClipReport>
where
    S: FrameSource,
    K: FrameSink<Frame = S::Frame>,
{
    let indices = range.indices(EndPolicy::Inclusive);
    let frames_requested = indices.len();
    let mut frames_written = 0;

    if frames_requested > 0 {
        source.seek(indices.start)?;
    }
    for _ in indices {
        match source.read_frame()? {
            Some(frame) => {
                sink.write_frame(&frame)?;
                frames_written += 1;
            }
            None => break,
        }
    }

    Ok(VideoClipReport {
        frames_written,
        frames_requested,
    })
}
