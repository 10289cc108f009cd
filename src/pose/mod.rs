pub mod joint;
pub mod schema;
pub mod table;

pub use joint::{JointFrame, JointIndex, JointSequence};
pub use schema::{sources, MarkerKind, MarkerSource, JOINT_SOURCES};
pub use table::{load_joint_csv, load_point_track, save_joint_csv, PointTrack, TrackLayout};
