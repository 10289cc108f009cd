use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::marker::METADATA_ROWS;
use crate::render::OverlayStyle;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    /// スライス・プレビュー対象の録画
    #[serde(default)]
    pub recordings: Vec<RecordingConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// `<raw_video_dir>/<session>/<video_name>`
    #[serde(default = "default_raw_video_dir")]
    pub raw_video_dir: PathBuf,
    /// `<raw_csv_dir>/<csv_name>`
    #[serde(default = "default_raw_csv_dir")]
    pub raw_csv_dir: PathBuf,
    /// オフセット表（session, video_name, csv_name, offset）
    #[serde(default = "default_offset_table")]
    pub offset_table: PathBuf,
    /// `<joint_dir>/<session>/<video_stem>_3d.csv`
    #[serde(default = "default_joint_dir")]
    pub joint_dir: PathBuf,
    /// `<clip_dir>/{csv,videos}/<video_stem>/`
    #[serde(default = "default_clip_dir")]
    pub clip_dir: PathBuf,
    /// `<preview_dir>/<video_stem>/preview_<clip>.mp4`
    #[serde(default = "default_preview_dir")]
    pub preview_dir: PathBuf,
    #[serde(default = "default_calibration_file")]
    pub calibration_file: PathBuf,
}

fn default_raw_video_dir() -> PathBuf { PathBuf::from("mocap_data/raw_video") }
fn default_raw_csv_dir() -> PathBuf { PathBuf::from("mocap_data/smoothed") }
fn default_offset_table() -> PathBuf { PathBuf::from("input/csv_offset.csv") }
fn default_joint_dir() -> PathBuf { PathBuf::from("output/joints") }
fn default_clip_dir() -> PathBuf { PathBuf::from("output/clips") }
fn default_preview_dir() -> PathBuf { PathBuf::from("output/previews") }
fn default_calibration_file() -> PathBuf { PathBuf::from("camera_data/extrinsics_middle.json") }

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_video_dir: default_raw_video_dir(),
            raw_csv_dir: default_raw_csv_dir(),
            offset_table: default_offset_table(),
            joint_dir: default_joint_dir(),
            clip_dir: default_clip_dir(),
            preview_dir: default_preview_dir(),
            calibration_file: default_calibration_file(),
        }
    }
}

impl PathsConfig {
    pub fn raw_video(&self, session: &str, video_name: &str) -> PathBuf {
        self.raw_video_dir.join(session).join(video_name)
    }

    pub fn raw_csv(&self, csv_name: &str) -> PathBuf {
        self.raw_csv_dir.join(csv_name)
    }

    pub fn joint_table(&self, session: &str, video_stem: &str) -> PathBuf {
        self.joint_dir.join(session).join(format!("{}_3d.csv", video_stem))
    }

    pub fn clip_table_dir(&self, video_stem: &str) -> PathBuf {
        self.clip_dir.join("csv").join(video_stem)
    }

    pub fn clip_video_dir(&self, video_stem: &str) -> PathBuf {
        self.clip_dir.join("videos").join(video_stem)
    }

    pub fn preview_video_dir(&self, video_stem: &str) -> PathBuf {
        self.preview_dir.join(video_stem)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    /// マーカー種別ヘッダより前に捨てる行数
    #[serde(default = "default_skip_rows")]
    pub skip_rows: usize,
    /// 種別ヘッダの後のメタデータ行数
    #[serde(default = "default_metadata_rows")]
    pub metadata_rows: usize,
}

fn default_skip_rows() -> usize { 1 }
fn default_metadata_rows() -> usize { METADATA_ROWS }

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            skip_rows: default_skip_rows(),
            metadata_rows: default_metadata_rows(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct VideoConfig {
    #[serde(default = "default_fourcc")]
    pub fourcc: String,
    /// 書き出す動画の拡張子
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_fourcc() -> String { "mp4v".to_string() }
fn default_extension() -> String { "mp4".to_string() }

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fourcc: default_fourcc(),
            extension: default_extension(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PreviewConfig {
    #[serde(default = "default_marker_radius")]
    pub marker_radius: i32,
    /// BGR
    #[serde(default = "default_marker_color")]
    pub marker_color: [u8; 3],
    #[serde(default = "default_text_color")]
    pub text_color: [u8; 3],
    #[serde(default = "default_font_scale")]
    pub font_scale: f64,
    #[serde(default = "default_text_thickness")]
    pub text_thickness: i32,
}

fn default_marker_radius() -> i32 { 5 }
fn default_marker_color() -> [u8; 3] { [0, 0, 255] }
fn default_text_color() -> [u8; 3] { [255, 255, 255] }
fn default_font_scale() -> f64 { 0.6 }
fn default_text_thickness() -> i32 { 2 }

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            marker_radius: default_marker_radius(),
            marker_color: default_marker_color(),
            text_color: default_text_color(),
            font_scale: default_font_scale(),
            text_thickness: default_text_thickness(),
        }
    }
}

impl PreviewConfig {
    pub fn style(&self) -> OverlayStyle {
        OverlayStyle {
            marker_radius: self.marker_radius,
            marker_color: self.marker_color,
            text_color: self.text_color,
            font_scale: self.font_scale,
            text_thickness: self.text_thickness,
        }
    }
}

/// 録画1件（オフセット表の session / video_name と対応）
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RecordingConfig {
    pub session: String,
    /// 拡張子付きの動画ファイル名（例: `01_boss_C.mp4`）
    pub video: String,
    /// アノテーション CSV
    pub annotations: PathBuf,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.extract.skip_rows, 1);
        assert_eq!(config.extract.metadata_rows, 4);
        assert_eq!(config.video.fourcc, "mp4v");
        assert_eq!(config.preview.style(), OverlayStyle::default());
        assert!(config.recordings.is_empty());
    }

    #[test]
    fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mocap_slicer.toml");
        fs::write(
            &path,
            r#"
[paths]
raw_video_dir = "raw"
joint_dir = "out/joints"

[preview]
marker_radius = 3

[[recordings]]
session = "25.1.20_01"
video = "01_boss_C.mp4"
annotations = "excel/01/boss.csv"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.paths.raw_video("25.1.20_01", "01_boss_C.mp4"), Path::new("raw/25.1.20_01/01_boss_C.mp4"));
        assert_eq!(config.paths.joint_table("25.1.20_01", "01_boss_C"), Path::new("out/joints/25.1.20_01/01_boss_C_3d.csv"));
        assert_eq!(config.paths.offset_table, Path::new("input/csv_offset.csv"));
        assert_eq!(config.preview.marker_radius, 3);
        assert_eq!(config.preview.font_scale, 0.6);
        assert_eq!(config.recordings.len(), 1);
        assert_eq!(config.recordings[0].annotations, Path::new("excel/01/boss.csv"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(dir.path().join("none.toml")).is_err());
    }
}
