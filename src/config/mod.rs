pub mod app_config;
pub mod error;
pub mod model;

pub use app_config::{AppConfig, SweepConfig, load_config, setup_resolver};
pub use error::ConfigError;
pub use model::ServiceConfig;
