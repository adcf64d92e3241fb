pub mod config;
pub mod json;
pub mod logging;
pub mod models;
pub mod paths;

pub use config::{BackendConfig, Config, ConfigError, LogLevel, LoggingConfig, ValidationError};
pub use logging::{init_logging, LoggingError, LoggingGuard};
pub use paths::{AppDirs, DirsError};

pub const APP_NAME: &str = "tunebridge";
pub const APP_AUTHOR: &str = "Tunebridge";
pub const APP_QUALIFIER: &str = "io";
