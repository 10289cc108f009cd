//! テスト用のメモリ上の動画
//!
//! フレームは自分のフレーム番号と描画内容だけを持つ。ディレクトリ走査が通るように
//! 開く・作るたびに空のプレースホルダーファイルを置く。

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{bail, Result};

use super::{FrameSink, FrameSource, VideoBackend, VideoProperties};
use crate::render::{Overlay, OverlayStyle};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TestFrame {
    /// 元動画でのフレーム番号
    pub index: usize,
    pub markers: Vec<(i32, i32)>,
    pub texts: Vec<(String, (i32, i32))>,
}

impl Overlay for TestFrame {
    fn draw_marker(&mut self, center: (i32, i32), _style: &OverlayStyle) -> Result<()> {
        self.markers.push(center);
        Ok(())
    }

    fn draw_text(&mut self, text: &str, origin: (i32, i32), _style: &OverlayStyle) -> Result<()> {
        self.texts.push((text.to_string(), origin));
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StoredVideo {
    pub properties: VideoProperties,
    pub frames: Vec<TestFrame>,
    pub finished: bool,
}

impl StoredVideo {
    pub fn indices(&self) -> Vec<usize> {
        self.frames.iter().map(|f| f.index).collect()
    }
}

pub fn test_properties(frame_count: usize) -> VideoProperties {
    VideoProperties {
        fps: 30.0,
        width: 640,
        height: 480,
        frame_count: Some(frame_count),
    }
}

fn touch(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::File::create(path)?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    videos: Rc<RefCell<BTreeMap<PathBuf, StoredVideo>>>,
    /// 開いたソースが n フレーム読んだ後の読み込みでエラーにする
    fail_read_after: Rc<Cell<Option<usize>>>,
    /// 作ったシンクが n フレーム書いた後の書き込みでエラーにする
    fail_write_after: Rc<Cell<Option<usize>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// フレーム番号 0..frame_count の動画を置く
    pub fn insert(&self, path: &Path, frame_count: usize) {
        touch(path).unwrap();
        let frames = (0..frame_count)
            .map(|index| TestFrame {
                index,
                ..TestFrame::default()
            })
            .collect();
        self.videos.borrow_mut().insert(
            path.to_path_buf(),
            StoredVideo {
                properties: test_properties(frame_count),
                frames,
                finished: true,
            },
        );
    }

    pub fn fail_reads_after(&self, frames: usize) {
        self.fail_read_after.set(Some(frames));
    }

    pub fn fail_writes_after(&self, frames: usize) {
        self.fail_write_after.set(Some(frames));
    }

    pub fn video(&self, path: &Path) -> Option<StoredVideo> {
        self.videos.borrow().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.videos.borrow().keys().cloned().collect()
    }
}

pub struct MemorySource {
    frames: Vec<TestFrame>,
    position: usize,
    properties: VideoProperties,
    reads: usize,
    fail_after: Option<usize>,
}

impl FrameSource for MemorySource {
    type Frame = TestFrame;

    fn properties(&self) -> VideoProperties {
        self.properties
    }

    fn seek(&mut self, frame_index: usize) -> Result<()> {
        self.position = frame_index;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<TestFrame>> {
        if self.fail_after == Some(self.reads) {
            bail!("decode error after {} frames", self.reads);
        }
        self.reads += 1;
        let frame = self.frames.get(self.position).cloned();
        if frame.is_some() {
            self.position += 1;
        }
        Ok(frame)
    }
}

pub struct MemorySink {
    videos: Rc<RefCell<BTreeMap<PathBuf, StoredVideo>>>,
    path: PathBuf,
    writes: usize,
    fail_after: Option<usize>,
}

impl FrameSink for MemorySink {
    type Frame = TestFrame;

    fn write_frame(&mut self, frame: &TestFrame) -> Result<()> {
        if self.fail_after == Some(self.writes) {
            bail!("encode error after {} frames", self.writes);
        }
        self.writes += 1;
        match self.videos.borrow_mut().get_mut(&self.path) {
            Some(video) if !video.finished => {
                video.frames.push(frame.clone());
                Ok(())
            }
            _ => bail!("writer for {} is closed", self.path.display()),
        }
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(video) = self.videos.borrow_mut().get_mut(&self.path) {
            video.finished = true;
        }
        Ok(())
    }
}

impl VideoBackend for MemoryBackend {
    type Frame = TestFrame;
    type Source = MemorySource;
    type Sink = MemorySink;

    fn open(&self, path: &Path) -> Result<MemorySource> {
        match self.videos.borrow().get(path) {
            Some(video) => Ok(MemorySource {
                frames: video.frames.clone(),
                position: 0,
                properties: video.properties,
                reads: 0,
                fail_after: self.fail_read_after.get(),
            }),
            None => bail!("Failed to open video {}", path.display()),
        }
    }

    fn create(&self, path: &Path, properties: &VideoProperties) -> Result<MemorySink> {
        touch(path)?;
        self.videos.borrow_mut().insert(
            path.to_path_buf(),
            StoredVideo {
                properties: VideoProperties {
                    frame_count: None,
                    ..*properties
                },
                frames: Vec::new(),
                finished: false,
            },
        );
        Ok(MemorySink {
            videos: Rc::clone(&self.videos),
            path: path.to_path_buf(),
            writes: 0,
            fail_after: self.fail_write_after.get(),
        })
    }
}
