pub mod subscriber;

pub use subscriber::{init_logging, build_filter, LoggingError};
