use crate::pose::JointIndex;

/// モーキャプ出力の列種別（ヘッダー1段目）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Bone,
    BoneMarker,
}

impl MarkerKind {
    /// ヘッダーに書かれる種別名。列の照合は前方一致で行う
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bone => "Bone",
            Self::BoneMarker => "Bone Marker",
        }
    }
}

/// 関節スロットの元になるマーカー (ラベル, 種別)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerSource {
    pub label: &'static str,
    pub kind: MarkerKind,
}

const fn bone(label: &'static str) -> MarkerSource {
    MarkerSource {
        label,
        kind: MarkerKind::Bone,
    }
}

const fn bone_marker(label: &'static str) -> MarkerSource {
    MarkerSource {
        label,
        kind: MarkerKind::BoneMarker,
    }
}

/// 関節スロット → マーカーの対応表
///
/// 2つのマーカーが並ぶスロットは成分ごとの平均を取る。
pub const JOINT_SOURCES: [&[MarkerSource]; JointIndex::COUNT] = [
    &[bone("Hip")],
    &[bone("LThigh")],
    &[bone("RThigh")],
    &[bone("Ab")],
    &[bone("LShin")],
    &[bone("RShin")],
    &[bone_marker("BackLeft"), bone_marker("BackRight")],
    &[bone("LFoot")],
    &[bone("RFoot")],
    &[bone_marker("BackTop")],
    &[bone("LToe")],
    &[bone("RToe")],
    &[bone("Neck")],
    &[bone("LShoulder")],
    &[bone("RShoulder")],
    &[bone("Head")],
    &[bone("LUArm")],
    &[bone("RUArm")],
    &[bone("LFArm")],
    &[bone("RFArm")],
    &[bone_marker("LWristIn"), bone_marker("LWristOut")],
    &[bone_marker("RWristIn"), bone_marker("RWristOut")],
    // 左手スロットも RHandOut を読む（収録データの定義どおり）
    &[bone_marker("RHandOut")],
    &[bone_marker("RHandOut")],
];

/// 関節スロットのマーカー定義（1つまたは2つ）
pub fn sources(joint: JointIndex) -> &'static [MarkerSource] {
    JOINT_SOURCES[joint as usize]
}
