pub mod logger;

pub use logger::{init_global_logger, LogConfig, UnifiedLogger};
