mod cli;
mod client_error;
mod config;
mod request;

pub use cli::Cli;
pub use client_error::ClientError;
pub use config::{
    DatabaseSettings, PricingSettings, RetentionSettings, ServerSettings, SessionSettings,
    Settings, get_config_settings,
};
pub use request::{
    ApiJson, REQUEST_TIMEOUT_HEADER, RequestDeadline, RequestIdentity, session_middleware,
};
