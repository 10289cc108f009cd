use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::PipelineError;
use crate::pose::{JointFrame, JointIndex, JointSequence};

const AXES: [char; 3] = ['x', 'y', 'z'];

/// JointSequence の列名 `0_x, 0_y, 0_z, ..., 23_z`
pub fn column_names() -> Vec<String> {
    (0..JointIndex::COUNT)
        .flat_map(|j| AXES.iter().map(move |axis| format!("{}_{}", j, axis)))
        .collect()
}

/// `{joint}_{axis}` 形式の列名を (joint, axis) に分解
pub fn parse_joint_column(name: &str) -> Option<(usize, usize)> {
    let (joint, axis) = name.trim().split_once('_')?;
    let joint: usize = joint.parse().ok()?;
    let axis = match axis {
        "x" => 0,
        "y" => 1,
        "z" => 2,
        _ => return None,
    };
    Some((joint, axis))
}

/// セル値を数値化。空欄や数値でない値は NaN
pub fn parse_cell(cell: &str) -> f64 {
    cell.trim().parse::<f64>().unwrap_or(f64::NAN)
}

fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

pub fn write_joint_csv<W: Write>(sequence: &JointSequence, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(column_names())?;
    for frame in sequence.frames() {
        out.write_record(frame.to_fields().iter().map(|v| format_cell(*v)))?;
    }
    out.flush()?;
    Ok(())
}

/// JointSequence を CSV に保存（親ディレクトリも作成）
pub fn save_joint_csv(path: &Path, sequence: &JointSequence) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_joint_csv(sequence, file)
}

/// 24関節テーブルを読み込む。欠けている列は NaN として扱う
pub fn read_joint_csv<R: Read>(reader: R) -> Result<JointSequence> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut positions = [[None::<usize>; 3]; JointIndex::COUNT];
    let mut found = false;
    for (col, name) in rdr.headers()?.iter().enumerate() {
        if let Some((joint, axis)) = parse_joint_column(name) {
            if joint < JointIndex::COUNT {
                positions[joint][axis] = Some(col);
                found = true;
            }
        }
    }
    if !found {
        return Err(PipelineError::invalid_input("no `{joint}_{axis}` columns in joint table").into());
    }

    let mut frames = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let mut frame = JointFrame::missing();
        for (joint, axes) in positions.iter().enumerate() {
            for (axis, col) in axes.iter().enumerate() {
                if let Some(value) = col.and_then(|c| record.get(c)) {
                    frame.joints[joint][axis] = parse_cell(value);
                }
            }
        }
        frames.push(frame);
    }
    Ok(JointSequence::new(frames))
}

pub fn load_joint_csv(path: &Path) -> Result<JointSequence> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_joint_csv(file).with_context(|| format!("Failed to read joint table {}", path.display()))
}

/// プレビュー用の行レイアウト
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackLayout {
    /// `{joint}_{axis}` 列を持つ関節テーブル（関節 ID 昇順）
    Joints(Vec<usize>),
    /// `x, y, z` 列だけの単一点テーブル
    Single,
}

/// 1フレームあたり1つ以上の3D点を持つ列
#[derive(Debug, Clone)]
pub struct PointTrack {
    pub layout: TrackLayout,
    pub frames: Vec<Vec<[f64; 3]>>,
}

impl PointTrack {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl From<&JointSequence> for PointTrack {
    fn from(sequence: &JointSequence) -> Self {
        Self {
            layout: TrackLayout::Joints((0..JointIndex::COUNT).collect()),
            frames: sequence.frames().iter().map(|f| f.joints.to_vec()).collect(),
        }
    }
}

/// スライス済みテーブルをプレビュー用に読み込む
///
/// 関節列が無ければ `x, y, z`（大文字小文字・前後空白を無視）の単一点として扱う。
pub fn read_point_track<R: Read>(reader: R) -> Result<PointTrack> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let joint_ids: BTreeSet<usize> = headers
        .iter()
        .filter_map(parse_joint_column)
        .map(|(joint, _)| joint)
        .collect();

    // 各出力点の (x, y, z) 列位置
    let (layout, columns): (TrackLayout, Vec<[Option<usize>; 3]>) = if joint_ids.is_empty() {
        let find = |axis: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(axis))
        };
        match (find("x"), find("y"), find("z")) {
            (Some(x), Some(y), Some(z)) => (TrackLayout::Single, vec![[Some(x), Some(y), Some(z)]]),
            _ => {
                return Err(PipelineError::invalid_input(
                    "table has neither joint columns nor x/y/z columns",
                )
                .into())
            }
        }
    } else {
        let ids: Vec<usize> = joint_ids.into_iter().collect();
        let mut columns = vec![[None; 3]; ids.len()];
        for (col, name) in headers.iter().enumerate() {
            if let Some((joint, axis)) = parse_joint_column(name) {
                if let Ok(slot) = ids.binary_search(&joint) {
                    columns[slot][axis] = Some(col);
                }
            }
        }
        (TrackLayout::Joints(ids), columns)
    };

    let mut frames = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let points = columns
            .iter()
            .map(|cols| {
                let mut p = [f64::NAN; 3];
                for (axis, col) in cols.iter().enumerate() {
                    if let Some(value) = col.and_then(|c| record.get(c)) {
                        p[axis] = parse_cell(value);
                    }
                }
                p
            })
            .collect();
        frames.push(points);
    }

    Ok(PointTrack { layout, frames })
}

pub fn load_point_track(path: &Path) -> Result<PointTrack> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_point_track(file).with_context(|| format!("Failed to read {}", path.display()))
}
