use anyhow::{bail, Context, Result};
use nalgebra::{Matrix3, Matrix3x4};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// --- データ構造 ---

/// キャリブレーションファイルの中身（行優先の入れ子配列）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationFile {
    /// 内部パラメータ行列 K (3x3)
    pub camera_matrix: Vec<Vec<f64>>,
    /// 外部パラメータ [R|t] (3x4)
    pub best_extrinsic: Vec<Vec<f64>>,
}

/// 検証済みのカメラモデル
#[derive(Debug, Clone, PartialEq)]
pub struct CameraModel {
    pub intrinsic: Matrix3<f64>,
    pub extrinsic: Matrix3x4<f64>,
}

fn check_shape(name: &str, rows: &[Vec<f64>], cols: usize) -> Result<()> {
    if rows.len() != 3 {
        bail!("{} must have 3 rows, got {}", name, rows.len());
    }
    for (i, row) in rows.iter().enumerate() {
        if row.len() != cols {
            bail!("{} row {} must have {} values, got {}", name, i, cols, row.len());
        }
        if row.iter().any(|v| !v.is_finite()) {
            bail!("{} row {} contains a non-finite value", name, i);
        }
    }
    Ok(())
}

impl CameraModel {
    pub fn new(intrinsic: Matrix3<f64>, extrinsic: Matrix3x4<f64>) -> Self {
        Self { intrinsic, extrinsic }
    }

    pub fn from_file(file: &CalibrationFile) -> Result<Self> {
        check_shape("camera_matrix", &file.camera_matrix, 3)?;
        check_shape("best_extrinsic", &file.best_extrinsic, 4)?;

        let intrinsic = Matrix3::from_fn(|r, c| file.camera_matrix[r][c]);
        let extrinsic = Matrix3x4::from_fn(|r, c| file.best_extrinsic[r][c]);
        Ok(Self { intrinsic, extrinsic })
    }

    #[cfg(test)]
    pub fn to_file(&self) -> CalibrationFile {
        CalibrationFile {
            camera_matrix: (0..3)
                .map(|r| (0..3).map(|c| self.intrinsic[(r, c)]).collect())
                .collect(),
            best_extrinsic: (0..3)
                .map(|r| (0..4).map(|c| self.extrinsic[(r, c)]).collect())
                .collect(),
        }
    }
}

// --- Save / Load ---

#[cfg(test)]
pub fn save_calibration(path: &Path, model: &CameraModel) -> Result<()> {
    let json = serde_json::to_string_pretty(&model.to_file())?;
    fs::write(path, json).context("Failed to write calibration file")?;
    Ok(())
}

pub fn load_calibration(path: &Path) -> Result<CameraModel> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read calibration file {}", path.display()))?;
    let file: CalibrationFile = serde_json::from_str(&content)
        .with_context(|| format!("Invalid calibration JSON {}", path.display()))?;
    CameraModel::from_file(&file).with_context(|| format!("Invalid calibration {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "camera_matrix": [[1000.0, 0.0, 640.0], [0.0, 1000.0, 360.0], [0.0, 0.0, 1.0]],
        "best_extrinsic": [[1.0, 0.0, 0.0, 0.1], [0.0, 1.0, 0.0, -0.2], [0.0, 0.0, 1.0, 3.0]]
    }"#;

    #[test]
    fn test_from_file() {
        let file: CalibrationFile = serde_json::from_str(SAMPLE).unwrap();
        let model = CameraModel::from_file(&file).unwrap();
        assert_eq!(model.intrinsic[(0, 2)], 640.0);
        assert_eq!(model.intrinsic[(1, 2)], 360.0);
        // 行優先で読めているか
        assert_eq!(model.extrinsic[(0, 3)], 0.1);
        assert_eq!(model.extrinsic[(1, 3)], -0.2);
        assert_eq!(model.extrinsic[(2, 3)], 3.0);
    }

    #[test]
    fn test_rejects_bad_shape() {
        let file = CalibrationFile {
            camera_matrix: vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
            best_extrinsic: vec![vec![0.0; 4]; 3],
        };
        assert!(CameraModel::from_file(&file).is_err());

        let file = CalibrationFile {
            camera_matrix: vec![vec![0.0; 3]; 3],
            best_extrinsic: vec![vec![0.0; 3]; 3],
        };
        assert!(CameraModel::from_file(&file).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        let file: CalibrationFile = serde_json::from_str(SAMPLE).unwrap();
        let model = CameraModel::from_file(&file).unwrap();

        save_calibration(&path, &model).unwrap();
        assert_eq!(load_calibration(&path).unwrap(), model);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_calibration(&dir.path().join("none.json")).is_err());
    }
}
