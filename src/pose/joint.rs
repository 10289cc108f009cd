use std::ops::Range;

/// 出力スケルトンの 24 関節スロット（SMPL 順）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum JointIndex {
    Pelvis = 0,
    LeftHip = 1,
    RightHip = 2,
    Spine1 = 3,
    LeftKnee = 4,
    RightKnee = 5,
    Spine2 = 6,
    LeftAnkle = 7,
    RightAnkle = 8,
    Spine3 = 9,
    LeftFoot = 10,
    RightFoot = 11,
    Neck = 12,
    LeftCollar = 13,
    RightCollar = 14,
    Head = 15,
    LeftShoulder = 16,
    RightShoulder = 17,
    LeftElbow = 18,
    RightElbow = 19,
    LeftWrist = 20,
    RightWrist = 21,
    LeftHand = 22,
    RightHand = 23,
}

impl JointIndex {
    pub const COUNT: usize = 24;

    pub const ALL: [JointIndex; Self::COUNT] = [
        Self::Pelvis,
        Self::LeftHip,
        Self::RightHip,
        Self::Spine1,
        Self::LeftKnee,
        Self::RightKnee,
        Self::Spine2,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::Spine3,
        Self::LeftFoot,
        Self::RightFoot,
        Self::Neck,
        Self::LeftCollar,
        Self::RightCollar,
        Self::Head,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHand,
        Self::RightHand,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// 1フレーム分の 24 関節 × (x, y, z)
///
/// 欠損は NaN で表し、フィールドそのものが欠けることはない。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointFrame {
    pub joints: [[f64; 3]; JointIndex::COUNT],
}

impl JointFrame {
    /// 1フレームあたりの数値フィールド数
    pub const FIELD_COUNT: usize = JointIndex::COUNT * 3;

    pub fn new(joints: [[f64; 3]; JointIndex::COUNT]) -> Self {
        Self { joints }
    }

    /// 全関節が欠損したフレーム
    pub fn missing() -> Self {
        Self {
            joints: [[f64::NAN; 3]; JointIndex::COUNT],
        }
    }

    pub fn get(&self, index: JointIndex) -> [f64; 3] {
        self.joints[index as usize]
    }

    /// 全フィールドが NaN か
    pub fn is_missing(&self) -> bool {
        self.joints.iter().flatten().all(|v| v.is_nan())
    }

    /// `{joint}_x, {joint}_y, {joint}_z` の順に平坦化した 72 値
    pub fn to_fields(&self) -> [f64; Self::FIELD_COUNT] {
        let mut fields = [f64::NAN; Self::FIELD_COUNT];
        for (j, xyz) in self.joints.iter().enumerate() {
            fields[j * 3..j * 3 + 3].copy_from_slice(xyz);
        }
        fields
    }

    pub fn from_fields(fields: &[f64; Self::FIELD_COUNT]) -> Self {
        let mut joints = [[f64::NAN; 3]; JointIndex::COUNT];
        for (j, xyz) in joints.iter_mut().enumerate() {
            xyz.copy_from_slice(&fields[j * 3..j * 3 + 3]);
        }
        Self { joints }
    }
}

impl Default for JointFrame {
    fn default() -> Self {
        Self::missing()
    }
}

/// フレーム番号 0 から連続する JointFrame の列
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JointSequence {
    frames: Vec<JointFrame>,
}

impl JointSequence {
    pub fn new(frames: Vec<JointFrame>) -> Self {
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[JointFrame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&JointFrame> {
        self.frames.get(index)
    }

    /// 先頭に欠損フレームを `count` 個足した新しい系列
    pub fn with_missing_prefix(self, count: usize) -> Self {
        let mut frames = Vec::with_capacity(self.frames.len() + count);
        frames.resize(count, JointFrame::missing());
        frames.extend(self.frames);
        Self { frames }
    }

    /// 範囲 [start, end) の部分系列。範囲外は系列長で切り詰める
    pub fn sub_sequence(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.frames.len());
        let start = range.start.min(end);
        Self {
            frames: self.frames[start..end].to_vec(),
        }
    }
}
