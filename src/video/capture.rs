use anyhow::{bail, Context, Result};
use opencv::{
    core::{Mat, Size},
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs, VideoWriter},
};
use std::path::Path;
use tracing::debug;

use super::{FrameSink, FrameSource, VideoBackend, VideoProperties};

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .with_context(|| format!("Non UTF-8 path: {}", path.display()))
}

/// OpenCVを使用した動画ファイル読み込み
pub struct VideoFileReader {
    capture: VideoCapture,
    properties: VideoProperties,
}

impl VideoFileReader {
    pub fn open(path: &Path) -> Result<Self> {
        let capture = VideoCapture::from_file(path_str(path)?, VideoCaptureAPIs::CAP_ANY as i32)
            .with_context(|| format!("Failed to open video {}", path.display()))?;

        if !capture.is_opened()? {
            bail!("Video {} is not readable", path.display());
        }

        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let count = capture.get(videoio::CAP_PROP_FRAME_COUNT)?;
        // コンテナによっては負値や 0 を返す
        let frame_count = if count.is_finite() && count > 0.0 {
            Some(count as usize)
        } else {
            None
        };
        debug!(
            "[video] {}: {}x{} @ {} fps, {:?} frames",
            path.display(),
            width,
            height,
            fps,
            frame_count
        );

        Ok(Self {
            capture,
            properties: VideoProperties {
                fps,
                width,
                height,
                frame_count,
            },
        })
    }
}

impl FrameSource for VideoFileReader {
    type Frame = Mat;

    fn properties(&self) -> VideoProperties {
        self.properties
    }

    fn seek(&mut self, frame_index: usize) -> Result<()> {
        if !self.capture.set(videoio::CAP_PROP_POS_FRAMES, frame_index as f64)? {
            bail!("Failed to seek to frame {}", frame_index);
        }
        Ok(())
    }

    /// フレームを読み込む（BGR形式）。末尾なら None
    fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let ok = self
            .capture
            .read(&mut frame)
            .context("Failed to read frame")?;

        if !ok || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

/// OpenCVを使用した動画ファイル書き出し
pub struct VideoFileWriter {
    writer: VideoWriter,
    finished: bool,
}

impl VideoFileWriter {
    pub fn create(path: &Path, fourcc: &str, properties: &VideoProperties) -> Result<Self> {
        let code: Vec<char> = fourcc.chars().collect();
        let code = match code.as_slice() {
            [a, b, c, d] => VideoWriter::fourcc(*a, *b, *c, *d)?,
            _ => bail!("FourCC must be 4 characters: {:?}", fourcc),
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let size = Size::new(properties.width as i32, properties.height as i32);
        let writer = VideoWriter::new(path_str(path)?, code, properties.fps, size, true)
            .with_context(|| format!("Failed to create video {}", path.display()))?;

        if !writer.is_opened()? {
            bail!("Video writer for {} could not be opened", path.display());
        }

        Ok(Self {
            writer,
            finished: false,
        })
    }
}

impl FrameSink for VideoFileWriter {
    type Frame = Mat;

    fn write_frame(&mut self, frame: &Mat) -> Result<()> {
        if self.finished {
            bail!("Video writer is already closed");
        }
        self.writer.write(frame).context("Failed to write frame")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if !self.finished {
            self.finished = true;
            self.writer.release().context("Failed to close video writer")?;
        }
        Ok(())
    }
}

impl Drop for VideoFileWriter {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

/// OpenCV のファイル入出力
#[derive(Debug, Clone)]
pub struct OpenCvBackend {
    fourcc: String,
}

impl OpenCvBackend {
    pub fn new(fourcc: &str) -> Self {
        Self {
            fourcc: fourcc.to_string(),
        }
    }
}

impl VideoBackend for OpenCvBackend {
    type Frame = Mat;
    type Source = VideoFileReader;
    type Sink = VideoFileWriter;

    fn open(&self, path: &Path) -> Result<VideoFileReader> {
        VideoFileReader::open(path)
    }

    fn create(&self, path: &Path, properties: &VideoProperties) -> Result<VideoFileWriter> {
        VideoFileWriter::create(path, &self.fourcc, properties)
    }
}
