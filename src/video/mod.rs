//! 動画の読み書き
//!
//! スライスとプレビューはこのトレイト越しに動画を扱う。OpenCV 実装は `opencv` feature。

#[cfg(feature = "opencv")]
pub mod capture;
#[cfg(test)]
pub mod memory;

#[cfg(feature = "opencv")]
pub use capture::{OpenCvBackend, VideoFileReader, VideoFileWriter};

use std::path::Path;

use anyhow::Result;

/// 動画のフレームレート・解像度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProperties {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    /// コンテナが報告するフレーム数（不明なら None）
    pub frame_count: Option<usize>,
}

/// フレームを先頭から順に読むソース
pub trait FrameSource {
    type Frame;

    fn properties(&self) -> VideoProperties;

    /// 次に読むフレーム番号を設定
    fn seek(&mut self, frame_index: usize) -> Result<()>;

    /// 次のフレーム。末尾に達したら None
    fn read_frame(&mut self) -> Result<Option<Self::Frame>>;
}

/// フレームを書き出す先
pub trait FrameSink {
    type Frame;

    fn write_frame(&mut self, frame: &Self::Frame) -> Result<()>;

    /// フラッシュして閉じる。2回目以降は何もしない
    fn finish(&mut self) -> Result<()>;
}

/// 動画ファイルを開く・作る
pub trait VideoBackend {
    type Frame;
    type Source: FrameSource<Frame = Self::Frame>;
    type Sink: FrameSink<Frame = Self::Frame>;

    fn open(&self, path: &Path) -> Result<Self::Source>;

    fn create(&self, path: &Path, properties: &VideoProperties) -> Result<Self::Sink>;

    /// フレーム数。読めなければ 0
    fn frame_count(&self, path: &Path) -> Result<usize> {
        let source = self.open(path)?;
        Ok(source.properties().frame_count.unwrap_or(0))
    }
}
