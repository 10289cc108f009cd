use anyhow::Result;
use tracing::warn;

use crate::pose::PointTrack;
use crate::projection::CameraProjector;
use crate::video::{FrameSink, FrameSource};

/// マーカーとカウンタの描画設定（色は BGR）
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub marker_radius: i32,
    pub marker_color: [u8; 3],
    pub text_color: [u8; 3],
    pub font_scale: f64,
    pub text_thickness: i32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            marker_radius: 5,
            marker_color: [0, 0, 255],
            text_color: [255, 255, 255],
            font_scale: 0.6,
            text_thickness: 2,
        }
    }
}

/// フレームへの描画
pub trait Overlay {
    /// 塗りつぶし円
    fn draw_marker(&mut self, center: (i32, i32), style: &OverlayStyle) -> Result<()>;

    /// `origin` は文字列の左下
    fn draw_text(&mut self, text: &str, origin: (i32, i32), style: &OverlayStyle) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewReport {
    pub frames_written: usize,
    pub markers_drawn: usize,
    /// 関節テーブルより先に動画が尽きた
    pub stopped_early: bool,
}

/// 切り出し済みの関節テーブルを対応する動画クリップに重ねて描く
pub struct PreviewRenderer {
    projector: CameraProjector,
    style: OverlayStyle,
}

impl PreviewRenderer {
    pub fn new(projector: CameraProjector, style: OverlayStyle) -> Self {
        Self { projector, style }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// `track` の各行を `source` の同じ順番のフレームに描いて `sink` に書く
    ///
    /// `sink` はどの経路でも閉じる。
    pub fn render<S, K>(&self, track: &PointTrack, source: &mut S, mut sink: K) -> Result<PreviewReport>
    where
        S: FrameSource,
        S::Frame: Overlay,
        K: FrameSink<Frame = S::Frame>,
    {
        let rendered = self.render_frames(track, source, &mut sink);
        let closed = sink.finish();
        let report = rendered?;
        closed?;
        Ok(report)
    }

    fn render_frames<S, K>(&self, track: &PointTrack, source: &mut S, sink: &mut K) -> Result<PreviewReport>
    where
        S: FrameSource,
        S::Frame: Overlay,
        K: FrameSink<Frame = S::Frame>,
    {
        let total = track.len();
        let height = source.properties().height as i32;
        let mut report = PreviewReport::default();

        for (i, points) in track.frames.iter().enumerate() {
            let mut frame = match source.read_frame()? {
                Some(frame) => frame,
                None => {
                    warn!("[preview] video ended at frame {}/{}, stopping early", i, total);
                    report.stopped_early = true;
                    break;
                }
            };

            for point in points {
                if let Some(pixel) = self.projector.project(*point) {
                    match frame.draw_marker(pixel, &self.style) {
                        Ok(()) => report.markers_drawn += 1,
                        Err(e) => warn!("[preview] frame {}: marker draw failed: {}", i, e),
                    }
                }
            }

            let counter = format!("frame {}/{}", i + 1, total);
            if let Err(e) = frame.draw_text(&counter, (10, height - 10), &self.style) {
                warn!("[preview] frame {}: text draw failed: {}", i, e);
            }

            sink.write_frame(&frame)?;
            report.frames_written += 1;
        }

        Ok(report)
    }
}

#[cfg(feature = "opencv")]
mod mat {
    use anyhow::Result;
    use opencv::core::{Mat, Point, Scalar};
    use opencv::imgproc;

    use super::{Overlay, OverlayStyle};

    fn bgr(color: [u8; 3]) -> Scalar {
        Scalar::new(color[0] as f64, color[1] as f64, color[2] as f64, 0.0)
    }

    impl Overlay for Mat {
        fn draw_marker(&mut self, center: (i32, i32), style: &OverlayStyle) -> Result<()> {
            imgproc::circle(
                self,
                Point::new(center.0, center.1),
                style.marker_radius,
                bgr(style.marker_color),
                imgproc::FILLED,
                imgproc::LINE_8,
                0,
            )?;
            Ok(())
        }

        fn draw_text(&mut self, text: &str, origin: (i32, i32), style: &OverlayStyle) -> Result<()> {
            imgproc::put_text(
                self,
                text,
                Point::new(origin.0, origin.1),
                imgproc::FONT_HERSHEY_SIMPLEX,
                style.font_scale,
                bgr(style.text_color),
                style.text_thickness,
                imgproc::LINE_8,
                false,
            )?;
            Ok(())
        }
    }
}
