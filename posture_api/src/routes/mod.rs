mod health;
mod metrics;
mod pose_stream;
mod process_image;

pub use health::healthcheck;
pub use metrics::metrics_handler;
pub use pose_stream::pose_stream;
pub use process_image::process_image;
