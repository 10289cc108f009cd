use tracing::{info, warn};

use crate::config::PathsConfig;
use crate::error::PipelineError;
use crate::slicing::OffsetTable;

/// オフセット表の全行について生動画と生マーカー CSV があるか確認
///
/// 見つからなかったファイルを返す。空なら全部そろっている。
pub fn check_inputs(paths: &PathsConfig, offsets: &OffsetTable) -> Vec<PipelineError> {
    let mut missing = Vec::new();

    for entry in offsets.entries() {
        let video = paths.raw_video(&entry.session, &entry.video_name);
        if !video.is_file() {
            missing.push(PipelineError::missing_input("raw video", video));
        }
        let csv = paths.raw_csv(&entry.csv_name);
        if !csv.is_file() {
            missing.push(PipelineError::missing_input("marker CSV", csv));
        }
    }

    for err in &missing {
        warn!("[check] {}", err);
    }
    if missing.is_empty() {
        info!("[check] all {} recordings have their inputs", offsets.entries().len());
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{fixture, SESSION};
    use std::fs;

    #[test]
    fn test_all_present() {
        let fx = fixture();
        assert!(check_inputs(&fx.config.paths, &fx.offsets()).is_empty());
    }

    #[test]
    fn test_reports_each_missing_file() {
        let fx = fixture();
        fs::remove_file(fx.config.paths.raw_video(SESSION, "01_boss_C.mp4")).unwrap();
        fs::remove_file(fx.config.paths.raw_csv("01_candy.csv")).unwrap();

        let missing = check_inputs(&fx.config.paths, &fx.offsets());
        assert_eq!(missing.len(), 2);
        assert!(missing.iter().all(|e| matches!(e, PipelineError::MissingInput { .. })));
        assert!(missing[0].to_string().contains("raw video"));
        assert!(missing[1].to_string().contains("01_candy.csv"));
    }
}
