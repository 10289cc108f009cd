pub mod extract;
pub mod table;

pub use extract::{
    extract_file, extract_keypoints, ColumnMap, ExtractOptions, Extraction, ExtractionWindow,
    METADATA_ROWS,
};
pub use table::{marker_label, MarkerTable};
