pub mod preview;

pub use preview::{Overlay, OverlayStyle, PreviewReport, PreviewRenderer};
