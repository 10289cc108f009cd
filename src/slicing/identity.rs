use std::fmt;
use std::path::Path;

use crate::error::PipelineError;

/// 録画の識別子 `{code}_{name}_{suffix}`（例: `01_boss_C`）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordingId {
    pub code: String,
    pub name: String,
    pub suffix: String,
}

impl RecordingId {
    pub fn new(code: &str, name: &str, suffix: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            suffix: suffix.to_string(),
        }
    }

    /// 動画ファイル名（拡張子あり・なし）から識別子を取り出す
    pub fn from_video_name(file_name: &str) -> Result<Self, PipelineError> {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        let parts: Vec<&str> = stem.split('_').collect();
        match parts.as_slice() {
            [code, name, suffix] if !code.is_empty() && !name.is_empty() && !suffix.is_empty() => {
                Ok(Self::new(code, name, suffix))
            }
            _ => Err(PipelineError::unresolved_naming(format!(
                "{} (expected {{code}}_{{name}}_{{suffix}})",
                file_name
            ))),
        }
    }

    pub fn stem(&self) -> String {
        format!("{}_{}_{}", self.code, self.name, self.suffix)
    }
}

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stem())
    }
}

/// アクション名をファイル名用に変換（空白 → `-`、小文字化）
pub fn action_slug(label: &str) -> String {
    label.trim().replace(' ', "-").to_lowercase()
}

/// 1反復分のクリップ識別子
///
/// 関節クリップと動画クリップは別々に書き出され、このファイル名だけで対応付けられる。
/// `action` はファイル名形式（slug）で保持する。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClipIdentity {
    pub recording: RecordingId,
    pub action: String,
    /// アノテーションの行番号（1始まり）
    pub row_index: usize,
    /// 反復番号（1始まり）
    pub repetition: usize,
}

fn parse_digits(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl ClipIdentity {
    pub fn new(recording: RecordingId, action_label: &str, row_index: usize, repetition: usize) -> Self {
        Self {
            recording,
            action: action_slug(action_label),
            row_index,
            repetition,
        }
    }

    /// `{code}_{name}_{suffix}_{action}_row{R}_rep{N}`
    pub fn stem(&self) -> String {
        format!(
            "{}_{}_row{}_rep{}",
            self.recording.stem(),
            self.action,
            self.row_index,
            self.repetition
        )
    }

    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.stem(), extension)
    }

    /// ファイル名の stem を識別子に戻す
    pub fn parse(stem: &str) -> Result<Self, PipelineError> {
        let unresolved = || PipelineError::unresolved_naming(stem.to_string());

        let (rest, rep) = stem.rsplit_once("_rep").ok_or_else(unresolved)?;
        let repetition = parse_digits(rep).ok_or_else(unresolved)?;
        let (rest, row) = rest.rsplit_once("_row").ok_or_else(unresolved)?;
        let row_index = parse_digits(row).ok_or_else(unresolved)?;

        let mut parts = rest.splitn(4, '_');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(code), Some(name), Some(suffix), Some(action))
                if [code, name, suffix, action].iter().all(|p| !p.is_empty()) =>
            {
                Ok(Self {
                    recording: RecordingId::new(code, name, suffix),
                    action: action.to_string(),
                    row_index,
                    repetition,
                })
            }
            _ => Err(unresolved()),
        }
    }

    /// 拡張子付きファイル名から識別子を取り出す
    pub fn from_file_name(file_name: &str) -> Result<Self, PipelineError> {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| PipelineError::unresolved_naming(file_name.to_string()))?;
        Self::parse(stem)
    }
}

impl fmt::Display for ClipIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stem())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boss() -> RecordingId {
        RecordingId::new("01", "boss", "C")
    }

    #[test]
    fn test_recording_from_video_name() {
        let id = RecordingId::from_video_name("01_boss_C.mp4").unwrap();
        assert_eq!(id, boss());
        assert_eq!(id.stem(), "01_boss_C");
        assert_eq!(RecordingId::from_video_name("01_boss_C").unwrap(), boss());
    }

    #[test]
    fn test_recording_rejects_other_shapes() {
        assert!(RecordingId::from_video_name("boss.mp4").is_err());
        assert!(RecordingId::from_video_name("01_boss_C_extra.mp4").is_err());
        assert!(RecordingId::from_video_name("01__C.mp4").is_err());
    }

    #[test]
    fn test_action_slug() {
        assert_eq!(action_slug("Raise Left Arm"), "raise-left-arm");
        assert_eq!(action_slug(" Jump "), "jump");
    }

    #[test]
    fn test_clip_stem() {
        let clip = ClipIdentity::new(boss(), "Raise Left Arm", 3, 2);
        assert_eq!(clip.stem(), "01_boss_C_raise-left-arm_row3_rep2");
        assert_eq!(clip.file_name("csv"), "01_boss_C_raise-left-arm_row3_rep2.csv");
    }

    #[test]
    fn test_parse_matches_formatted_identity() {
        let clip = ClipIdentity::new(boss(), "Raise Left Arm", 3, 2);
        let parsed = ClipIdentity::parse(&clip.stem()).unwrap();
        assert_eq!(parsed, clip);
    }

    #[test]
    fn test_parse_action_with_underscore() {
        let parsed = ClipIdentity::parse("01_boss_C_side_step_row10_rep1").unwrap();
        assert_eq!(parsed.action, "side_step");
        assert_eq!(parsed.row_index, 10);
        assert_eq!(parsed.repetition, 1);
    }

    #[test]
    fn test_parse_rejects_unrecognized_names() {
        assert!(ClipIdentity::parse("clip_0001").is_err());
        assert!(ClipIdentity::parse("01_boss_C_jump_row_rep1").is_err());
        assert!(ClipIdentity::parse("01_boss_C_jump_row1_rep+2").is_err());
        assert!(ClipIdentity::parse("01_boss_row1_rep2").is_err());
    }

    #[test]
    fn test_from_file_name() {
        let parsed = ClipIdentity::from_file_name("01_boss_C_jump_row1_rep2.mp4").unwrap();
        assert_eq!(parsed.stem(), "01_boss_C_jump_row1_rep2");
        assert!(matches!(
            ClipIdentity::from_file_name("notes.txt"),
            Err(PipelineError::UnresolvedNaming(_))
        ));
    }
}
