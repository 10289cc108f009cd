use std::path::Path;

use anyhow::Result;
use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::marker::MarkerTable;
use crate::pose::{sources, table::parse_cell, JointFrame, JointIndex, JointSequence};

/// ラベル行を含む、データ行より前の固定メタデータ行数
pub const METADATA_ROWS: usize = 4;

/// 抽出パラメータ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// モーキャプ時計 → 動画時計のフレームずれ
    pub offset: i64,
    /// 出力フレーム数の上限（通常は動画のフレーム数）。None は制限なし
    pub total_frames: Option<usize>,
    pub metadata_rows: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            total_frames: None,
            metadata_rows: METADATA_ROWS,
        }
    }
}

/// オフセットから決まる読み取り窓
///
/// 負のオフセットは行の読み捨てには使えないので 0 に置き換え、
/// 代わりに先頭へ欠損フレームを `pad` 個入れて動画のフレーム番号に揃える。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionWindow {
    pub requested_offset: i64,
    /// テーブル先頭から読み捨てる行数
    pub skip: usize,
    /// 読み取るデータ行数。None は末尾まで
    pub take: Option<usize>,
    /// 出力先頭に足す欠損フレーム数
    pub pad: usize,
}

impl ExtractionWindow {
    pub fn plan(options: &ExtractOptions) -> Self {
        let total = options.total_frames.filter(|&t| t > 0);
        let skip = options.metadata_rows + options.offset.max(0) as usize;

        let (take, pad) = if options.offset < 0 {
            let k = options.offset.unsigned_abs() as usize;
            match total {
                Some(t) => {
                    let pad = k.min(t);
                    (Some(t - pad), pad)
                }
                None => (None, k),
            }
        } else {
            (total, 0)
        };

        Self {
            requested_offset: options.offset,
            skip,
            take,
            pad,
        }
    }

    /// 負のオフセットを置き換えたか
    pub fn is_clamped(&self) -> bool {
        self.requested_offset < 0
    }
}

/// 関節スロットごとの解決済み列位置
///
/// ヘッダー照合は読み込み時に1回だけ行い、フレーム処理は位置アクセスのみ。
#[derive(Debug, Clone)]
pub struct ColumnMap {
    /// [joint][source] → (x, y, z) 列。見つからなければ None
    slots: Vec<Vec<Option<[usize; 3]>>>,
    /// 解決済み列の最小位置
    first_column: usize,
}

impl ColumnMap {
    /// 照合条件に合う列のうち最後の3列を採用する
    pub fn resolve(table: &MarkerTable) -> (Self, Vec<PipelineError>) {
        let mut gaps = Vec::new();
        let mut first_column = usize::MAX;

        let slots: Vec<Vec<Option<[usize; 3]>>> = JointIndex::ALL
            .iter()
            .map(|&joint| {
                sources(joint)
                    .iter()
                    .map(|source| {
                        let cols = table.matching_columns(source.label, source.kind.as_str());
                        if cols.len() < 3 {
                            gaps.push(PipelineError::SchemaGap {
                                joint: joint as usize,
                                label: source.label.to_string(),
                                kind: source.kind.as_str().to_string(),
                            });
                            return None;
                        }
                        let last = &cols[cols.len() - 3..];
                        first_column = first_column.min(last[0]);
                        Some([last[0], last[1], last[2]])
                    })
                    .collect()
            })
            .collect();

        (Self { slots, first_column }, gaps)
    }

    pub fn columns(&self, joint: JointIndex) -> &[Option<[usize; 3]>] {
        &self.slots[joint as usize]
    }

    /// 1行を JointFrame に変換
    ///
    /// 途中で切れた行は足りないセルだけ NaN。解決済み列に1つも届かない行は None。
    pub fn convert_row(&self, row: &StringRecord) -> Option<JointFrame> {
        if row.len() <= self.first_column {
            return None;
        }

        let mut frame = JointFrame::missing();
        for (joint, slot) in self.slots.iter().enumerate() {
            let values: Vec<[f64; 3]> = slot
                .iter()
                .map(|cols| match *cols {
                    Some(cols) => cols.map(|c| row.get(c).map_or(f64::NAN, parse_cell)),
                    None => [f64::NAN; 3],
                })
                .collect();

            frame.joints[joint] = match values.as_slice() {
                [single] => *single,
                [a, b] => [
                    (a[0] + b[0]) / 2.0,
                    (a[1] + b[1]) / 2.0,
                    (a[2] + b[2]) / 2.0,
                ],
                _ => [f64::NAN; 3],
            };
        }
        Some(frame)
    }
}

/// 抽出結果と、その過程で補正・代用した内容
#[derive(Debug)]
pub struct Extraction {
    pub sequence: JointSequence,
    pub window: ExtractionWindow,
    /// 列が見つからなかったマーカー
    pub gaps: Vec<PipelineError>,
    /// 値を1つも読めず全欠損で置き換えたフレーム（出力フレーム番号）
    pub failed_frames: Vec<usize>,
    /// 要求行数に対してテーブルが足りなかった場合
    pub overrun: Option<PipelineError>,
}

/// 生マーカーテーブルから 24 関節の JointSequence を作る
pub fn extract_keypoints(table: &MarkerTable, options: &ExtractOptions) -> Extraction {
    let window = ExtractionWindow::plan(options);
    if window.is_clamped() {
        warn!(
            "[extract] offset {} is negative: dropping {} rows with offset 0, prepending {} missing frames",
            window.requested_offset, window.skip, window.pad
        );
    }

    let (columns, gaps) = ColumnMap::resolve(table);
    for gap in &gaps {
        warn!("[extract] {}", gap);
    }

    let available = table.row_count().saturating_sub(window.skip);
    let wanted = window.take.unwrap_or(available);
    let overrun = if wanted > available {
        let err = PipelineError::BoundaryOverrun {
            wanted,
            available,
        };
        warn!("[extract] requested frames exceed the marker table: {}", err);
        Some(err)
    } else {
        None
    };
    let count = wanted.min(available);

    let mut frames = Vec::with_capacity(count + window.pad);
    let mut failed_frames = Vec::new();
    for (i, row) in table.rows().iter().skip(window.skip).take(count).enumerate() {
        match columns.convert_row(row) {
            Some(frame) => frames.push(frame),
            None => {
                let output_index = window.pad + i;
                debug!(
                    "[extract] row {} has {} fields, frame {} filled with NaN",
                    window.skip + i,
                    row.len(),
                    output_index
                );
                failed_frames.push(output_index);
                frames.push(JointFrame::missing());
            }
        }
    }
    if !failed_frames.is_empty() {
        warn!("[extract] {} empty rows replaced with missing frames", failed_frames.len());
    }

    let sequence = JointSequence::new(frames).with_missing_prefix(window.pad);

    Extraction {
        sequence,
        window,
        gaps,
        failed_frames,
        overrun,
    }
}

/// マーカー CSV を読み込み、抽出して 24 関節テーブルとして保存
pub fn extract_file(
    input: &Path,
    output: &Path,
    skip_rows: usize,
    options: &ExtractOptions,
) -> Result<Extraction> {
    let table = MarkerTable::load(input, skip_rows)?;
    let extraction = extract_keypoints(&table, options);
    crate::pose::save_joint_csv(output, &extraction.sequence)?;
    info!(
        "[extract] {} -> {} ({} frames, offset {})",
        input.display(),
        output.display(),
        extraction.sequence.len(),
        options.offset
    );
    Ok(extraction)
}
