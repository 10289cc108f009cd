use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::StringRecord;

use crate::error::PipelineError;

/// モーキャプ書き出し CSV（生のマーカーテーブル）
///
/// レイアウト:
/// - 先頭 `skip_rows` レコード: ファイル情報（読み捨て）
/// - 次の1レコード: 列種別 (`Bone`, `Bone Marker`, ...)
/// - 以降 `rows`: 行0 = マーカーラベル (`Skeleton 001:Hip`)、行1〜3 = ID / 種類 / 軸名、
///   行4以降 = フレームデータ
#[derive(Debug, Clone)]
pub struct MarkerTable {
    kinds: Vec<String>,
    rows: Vec<StringRecord>,
}

/// ラベルセルからスケルトン名の接頭辞 (`Skeleton 001:`) を外したマーカー名
pub fn marker_label(cell: &str) -> &str {
    match cell.rsplit_once(':') {
        Some((_, label)) => label.trim(),
        None => cell.trim(),
    }
}

impl MarkerTable {
    pub fn new(kinds: Vec<String>, rows: Vec<StringRecord>) -> Self {
        Self { kinds, rows }
    }

    pub fn from_reader<R: Read>(reader: R, skip_rows: usize) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = rdr.records().skip(skip_rows);
        let kinds: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(|s| s.to_string()).collect(),
            None => {
                return Err(PipelineError::invalid_input(format!(
                    "marker table has no kind header after {} skipped rows",
                    skip_rows
                ))
                .into())
            }
        };
        let rows = records.collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { kinds, rows })
    }

    pub fn load(path: &Path, skip_rows: usize) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        Self::from_reader(file, skip_rows)
            .with_context(|| format!("Failed to parse marker table {}", path.display()))
    }

    /// 列種別ヘッダー
    pub fn kinds(&self) -> &[String] {
        &self.kinds
    }

    pub fn column_count(&self) -> usize {
        self.kinds.len()
    }

    /// 列 `col` のマーカー名（接頭辞なし）。ラベル行が無い・短い場合は None
    pub fn label(&self, col: usize) -> Option<&str> {
        self.rows.first()?.get(col).map(marker_label)
    }

    /// ラベル行を含む全行数
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    /// 種別が `kind` で始まり、ラベルが `label` に一致する列（宣言順）
    pub fn matching_columns(&self, label: &str, kind: &str) -> Vec<usize> {
        (0..self.column_count())
            .filter(|&col| {
                self.kinds[col].starts_with(kind) && self.label(col) == Some(label)
            })
            .collect()
    }
}
