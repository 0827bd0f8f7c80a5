//! Indices into the fixed 33-joint snapshot the pose model emits.

pub const LANDMARK_COUNT: usize = 33;

pub const RIGHT_EAR: usize = 8;
pub const RIGHT_SHOULDER: usize = 12;
