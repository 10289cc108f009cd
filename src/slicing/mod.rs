//! 反復区間での切り出し
//!
//! アノテーションの区間にオフセットを足し、関節テーブルは終端を含まず、
//! 動画は終端を含めて切り出す。

pub mod annotation;
pub mod identity;
pub mod offset;
pub mod slicer;

pub use annotation::{forward_fill, load_descriptors, read_descriptors, RepetitionDescriptor, UNLABELED_ACTION};
pub use identity::{action_slug, ClipIdentity, RecordingId};
pub use offset::{OffsetEntry, OffsetTable};
pub use slicer::{
    slice_rows, slice_video, ClipPlan, EndPolicy, FrameRange, RepetitionSlicer, SlicedClip,
    VideoClipReport,
};
