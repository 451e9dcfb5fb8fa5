/// File and console logging through `fern`, with rotation of old log files.
pub mod logger;

pub use logger::{cleanup_old_logs, parse_level, setup_logging};
