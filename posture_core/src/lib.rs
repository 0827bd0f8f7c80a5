mod alert;
mod angle;
mod classifier;

pub mod landmark;

pub use alert::AlertTimer;
pub use angle::{neck_angle, Point2};
pub use classifier::{PolicyError, PosturePolicy, Verdict, BAD_POSTURE, GOOD_POSTURE};
