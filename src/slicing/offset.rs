//! オフセット表（録画の一覧を兼ねる）
//!
//! 列: `session, video_name, csv_name, offset`。セッションは生動画のサブフォルダ名。

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::warn;

const COLUMNS: [&str; 4] = ["session", "video_name", "csv_name", "offset"];

#[derive(Debug, Deserialize)]
struct OffsetRecord {
    session: String,
    video_name: String,
    csv_name: String,
    #[serde(default)]
    offset: Option<f64>,
}

/// 録画1件分の行
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetEntry {
    pub session: String,
    pub video_name: String,
    pub csv_name: String,
    /// 空欄なら None
    pub offset: Option<i64>,
}

impl OffsetEntry {
    /// 抽出時のオフセット。空欄は 0
    pub fn extraction_offset(&self) -> i64 {
        self.offset.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OffsetTable {
    entries: Vec<OffsetEntry>,
}

impl OffsetTable {
    pub fn new(entries: Vec<OffsetEntry>) -> Self {
        Self { entries }
    }

    /// 読めない行は警告して飛ばす。列が揃っていなければ表ごとエラー
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers().context("Failed to read offset table header")?;
        for column in COLUMNS {
            if !headers.iter().any(|h| h == column) {
                bail!("Offset table has no `{}` column", column);
            }
        }

        let mut entries = Vec::new();
        for (i, record) in rdr.deserialize::<OffsetRecord>().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!("[offset] row {} skipped: {}", i + 1, e);
                    continue;
                }
            };
            entries.push(OffsetEntry {
                session: record.session,
                video_name: record.video_name,
                csv_name: record.csv_name,
                offset: record.offset.filter(|v| v.is_finite()).map(|v| v.trunc() as i64),
            });
        }
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open offset table {}", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("Failed to read offset table {}", path.display()))
    }

    pub fn entries(&self) -> &[OffsetEntry] {
        &self.entries
    }

    pub fn entry(&self, session: &str, video_name: &str) -> Option<&OffsetEntry> {
        self.entries
            .iter()
            .find(|e| e.session == session && e.video_name == video_name)
    }

    /// スライス用のオフセット。行が無い・空欄なら None（その録画は処理しない）
    pub fn offset_for(&self, session: &str, video_name: &str) -> Option<i64> {
        self.entry(session, video_name).and_then(|e| e.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
session,video_name,csv_name,offset
25.1.20_01,01_boss_C.mp4,01_boss.csv,4
25.1.20_01,01_candy_C.mp4,01_candy.csv,-3.0
25.1.20_01,01_museum_C.mp4,01_museum.csv,
";

    #[test]
    fn test_from_reader() {
        let table = OffsetTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.entries().len(), 3);
        assert_eq!(table.entries()[0].csv_name, "01_boss.csv");
        assert_eq!(table.offset_for("25.1.20_01", "01_boss_C.mp4"), Some(4));
        assert_eq!(table.offset_for("25.1.20_01", "01_candy_C.mp4"), Some(-3));
    }

    #[test]
    fn test_blank_offset() {
        let table = OffsetTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.offset_for("25.1.20_01", "01_museum_C.mp4"), None);
        let entry = table.entry("25.1.20_01", "01_museum_C.mp4").unwrap();
        assert_eq!(entry.extraction_offset(), 0);
    }

    #[test]
    fn test_missing_entry() {
        let table = OffsetTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.offset_for("25.1.20_01", "01_gallery_C.mp4"), None);
        assert_eq!(table.offset_for("other", "01_boss_C.mp4"), None);
    }

    #[test]
    fn test_bad_offset_row_is_skipped() {
        let data = "session,video_name,csv_name,offset\ns,a.mp4,a.csv,abc\ns,b.mp4,b.csv,7\n";
        let table = OffsetTable::from_reader(data.as_bytes()).unwrap();
        assert_eq!(table.entries().len(), 1);
        assert_eq!(table.entry("s", "a.mp4"), None);
        assert_eq!(table.offset_for("s", "b.mp4"), Some(7));
    }

    #[test]
    fn test_missing_column_is_error() {
        let data = "session,video_name,offset\ns,a.mp4,1\n";
        assert!(OffsetTable::from_reader(data.as_bytes()).is_err());
    }
}
