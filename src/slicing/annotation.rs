//! 反復区間アノテーション（ワークブックの CSV 書き出し）の読み込み
//!
//! 列: `Action`, `Repetition N Start`, `Repetition N End`（N = 1, 2, ...）。
//! フレーム番号はモーキャプ側の生フレーム番号（オフセット適用前）。

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// `Action` が1つも無い先頭行に付けるラベル
pub const UNLABELED_ACTION: &str = "unlabeled";

/// 1反復分の区間
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepetitionDescriptor {
    /// アノテーションの行番号（1始まり）
    pub row_index: usize,
    /// 反復番号（1始まり）
    pub repetition: usize,
    pub start_frame: i64,
    pub end_frame: i64,
    /// 前方補完済みのアクション名
    pub action: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

/// `Repetition N Start` / `Repetition N End` を (N, 端) に分解
fn parse_repetition_header(header: &str) -> Option<(usize, Bound)> {
    let mut words = header.split_whitespace();
    if words.next()? != "Repetition" {
        return None;
    }
    let n: usize = words.next()?.parse().ok()?;
    let bound = match words.next()? {
        "Start" => Bound::Start,
        "End" => Bound::End,
        _ => return None,
    };
    if words.next().is_some() {
        return None;
    }
    Some((n, bound))
}

/// フレーム番号セル。空欄・数値でない値は None、小数は切り捨て
fn parse_frame_cell(cell: &str) -> Option<i64> {
    let value: f64 = cell.trim().parse().ok()?;
    if value.is_finite() {
        Some(value.trunc() as i64)
    } else {
        None
    }
}

/// 空欄のアクション名を直前の行の値で埋める
///
/// 最初のラベルより前の行は [`UNLABELED_ACTION`]。
pub fn forward_fill(cells: &[Option<String>]) -> Vec<String> {
    let mut current: Option<&str> = None;
    cells
        .iter()
        .map(|cell| {
            if let Some(label) = cell.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                current = Some(label);
            }
            current.unwrap_or(UNLABELED_ACTION).to_string()
        })
        .collect()
}

/// アノテーション CSV から反復区間の一覧を作る
///
/// 開始・終了のどちらかが欠けた反復は記録なしとして読み飛ばす。
pub fn read_descriptors<R: Read>(reader: R) -> Result<Vec<RepetitionDescriptor>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let action_col = headers.iter().position(|h| h.trim() == "Action");
    if action_col.is_none() {
        warn!("[annotation] no `Action` column, all rows are {}", UNLABELED_ACTION);
    }

    // N → (Start 列, End 列)
    let mut repetition_cols: BTreeMap<usize, (Option<usize>, Option<usize>)> = BTreeMap::new();
    for (col, header) in headers.iter().enumerate() {
        if let Some((n, bound)) = parse_repetition_header(header.trim()) {
            let entry = repetition_cols.entry(n).or_default();
            match bound {
                Bound::Start => entry.0 = Some(col),
                Bound::End => entry.1 = Some(col),
            }
        }
    }
    let max_repetition = repetition_cols.keys().next_back().copied().unwrap_or(0);

    let records = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;

    // 行ごとのラベルを先に確定させる
    let raw_actions: Vec<Option<String>> = records
        .iter()
        .map(|r| action_col.and_then(|c| r.get(c)).map(|s| s.to_string()))
        .collect();
    let actions = forward_fill(&raw_actions);

    let mut descriptors = Vec::new();
    for (i, (record, action)) in records.iter().zip(actions).enumerate() {
        let row_index = i + 1;
        for repetition in 1..=max_repetition {
            let (start_col, end_col) = repetition_cols.get(&repetition).copied().unwrap_or_default();
            let start = start_col.and_then(|c| record.get(c)).and_then(parse_frame_cell);
            let end = end_col.and_then(|c| record.get(c)).and_then(parse_frame_cell);

            match (start, end) {
                (Some(start_frame), Some(end_frame)) if start_frame <= end_frame => {
                    descriptors.push(RepetitionDescriptor {
                        row_index,
                        repetition,
                        start_frame,
                        end_frame,
                        action: action.clone(),
                    });
                }
                (Some(start_frame), Some(end_frame)) => {
                    warn!(
                        "[annotation] row {} repetition {}: start {} > end {}, skipped",
                        row_index, repetition, start_frame, end_frame
                    );
                }
                _ => {
                    debug!(
                        "[annotation] row {} repetition {}: missing data, skipped",
                        row_index, repetition
                    );
                }
            }
        }
    }

    Ok(descriptors)
}

pub fn load_descriptors(path: &Path) -> Result<Vec<RepetitionDescriptor>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_descriptors(file).with_context(|| format!("Failed to read annotations {}", path.display()))
}
