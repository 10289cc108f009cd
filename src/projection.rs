use nalgebra::{Matrix3x4, Vector4};

use crate::calibration::CameraModel;

/// カメラ射影 P = K[R|t]
///
/// ワールド座標の3D点をピクセル座標に写す。
#[derive(Debug, Clone, PartialEq)]
pub struct CameraProjector {
    pub projection: Matrix3x4<f64>,
}

impl CameraProjector {
    pub fn new(camera: &CameraModel) -> Self {
        Self {
            projection: camera.intrinsic * camera.extrinsic,
        }
    }

    /// 3D点をピクセル座標へ（四捨五入）
    ///
    /// 欠損（NaN）、カメラ平面上（深度 0）、結果が有限でない点は None。
    pub fn project(&self, point: [f64; 3]) -> Option<(i32, i32)> {
        if point.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let p = self.projection * Vector4::new(point[0], point[1], point[2], 1.0);
        if p[2] == 0.0 {
            return None;
        }
        let u = (p[0] / p[2]).round();
        let v = (p[1] / p[2]).round();
        if !u.is_finite() || !v.is_finite() || u.abs() > i32::MAX as f64 || v.abs() > i32::MAX as f64 {
            return None;
        }
        Some((u as i32, v as i32))
    }
}

/// 画角・位置・回転から合成カメラを作る（テスト用）
///
/// - fov_v_deg: 垂直画角（度）
/// - position: カメラ位置 [x, y, z]
/// - rotation_deg: カメラ回転 [rx, ry, rz] 度 (Euler XYZ)
#[cfg(test)]
pub(crate) fn synthetic_camera(
    fov_v_deg: f64,
    width: u32,
    height: u32,
    position: [f64; 3],
    rotation_deg: [f64; 3],
) -> CameraModel {
    use nalgebra::{Matrix3, Rotation3, Vector3};

    let w = width as f64;
    let h = height as f64;
    let fy = h / (2.0 * (fov_v_deg.to_radians() / 2.0).tan());
    let fx = fy;
    let k = Matrix3::new(fx, 0.0, w / 2.0, 0.0, fy, h / 2.0, 0.0, 0.0, 1.0);

    let r = Rotation3::from_euler_angles(
        rotation_deg[0].to_radians(),
        rotation_deg[1].to_radians(),
        rotation_deg[2].to_radians(),
    )
    .into_inner();
    // t = -R * position
    let t = -(r * Vector3::new(position[0], position[1], position[2]));

    let mut rt = Matrix3x4::zeros();
    rt.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
    rt.set_column(3, &t);
    CameraModel::new(k, rt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn front_camera() -> CameraProjector {
        CameraProjector::new(&synthetic_camera(55.0, 640, 480, [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]))
    }

    #[test]
    fn test_principal_point() {
        // 光軸上の点は画像中心へ
        let cam = front_camera();
        assert_eq!(cam.project([0.0, 0.0, 3.0]), Some((320, 240)));
    }

    #[test]
    fn test_projection_is_deterministic() {
        let cam = front_camera();
        let p = [0.31, -0.12, 2.7];
        assert_eq!(cam.project(p), cam.project(p));
        assert!(cam.project(p).is_some());
    }

    #[test]
    fn test_offset_point_moves_right() {
        let cam = front_camera();
        let (u, v) = cam.project([0.5, 0.0, 3.0]).unwrap();
        assert!(u > 320, "u: {}", u);
        assert_eq!(v, 240);
    }

    #[test]
    fn test_camera_translation() {
        // カメラを右に1m動かすと同じ点は左に写る
        let moved = CameraProjector::new(&synthetic_camera(55.0, 640, 480, [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]));
        let (u, _) = moved.project([0.0, 0.0, 3.0]).unwrap();
        assert!(u < 320, "u: {}", u);
    }

    #[test]
    fn test_zero_depth_is_none() {
        let cam = front_camera();
        assert_eq!(cam.project([1.0, 1.0, 0.0]), None);
    }

    #[test]
    fn test_missing_point_is_none() {
        let cam = front_camera();
        assert_eq!(cam.project([f64::NAN, 0.0, 3.0]), None);
        assert_eq!(cam.project([0.0, f64::INFINITY, 3.0]), None);
    }
}
