use std::time::Duration;

use anyhow::Context;
use camino::Utf8PathBuf;
use config::Config;
use jiff::SignedDuration;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_aux::field_attributes::{deserialize_bool_from_anything, deserialize_number_from_string};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::path::PathBuf;

#[derive(Clone, Deserialize, Debug)]
pub struct Settings {
    pub environment: String,
    pub application: ServerSettings,
    pub database: DatabaseSettings,
    pub session: SessionSettings,
    pub pricing: PricingSettings,
    pub retention: RetentionSettings,
}

#[derive(Clone, Deserialize, Debug)]
pub struct ServerSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub logs_directory: String,
    /// Upper bound for a single cart operation. Callers may ask for less.
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub request_timeout_ms: u64,
    /// Storefront origin allowed to call the API with credentials.
    pub client_origin: String,
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", &self.host, &self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(deserialize_with = "deserialize_bool_from_anything")]
    pub require_ssl: bool,
}

impl DatabaseSettings {
    pub fn without_db_name(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(&self.password)
            .port(self.port)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db_name(&self) -> PgConnectOptions {
        self.without_db_name().database(&self.database_name)
    }
}

/// Guest identity. When disabled, only requests carrying a user id can reach a cart.
#[derive(Clone, Deserialize, Debug)]
pub struct SessionSettings {
    #[serde(deserialize_with = "deserialize_bool_from_anything")]
    pub enabled: bool,
    pub cookie_name: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub ttl_days: u32,
    /// Header the authentication gateway uses to forward the signed in user's id.
    pub user_header: String,
    /// Adds `Secure` to the session cookie. Needs HTTPS in front of the server.
    #[serde(default, deserialize_with = "deserialize_bool_from_anything")]
    pub secure_cookie: bool,
}

impl SessionSettings {
    pub fn ttl(&self) -> SignedDuration {
        SignedDuration::from_hours(i64::from(self.ttl_days) * 24)
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct PricingSettings {
    /// Orders with a subtotal strictly above this ship for free.
    pub free_shipping_threshold: Decimal,
    pub flat_shipping_fee: Decimal,
    pub tax_rate: Decimal,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Decimal::new(50, 0),
            flat_shipping_fee: Decimal::new(599, 2),
            tax_rate: Decimal::new(10, 2),
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct RetentionSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub session_cart_ttl_days: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub sweep_interval_secs: u64,
}

impl RetentionSettings {
    pub fn session_cart_ttl(&self) -> SignedDuration {
        SignedDuration::from_hours(i64::from(self.session_cart_ttl_days) * 24)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn find_config_dir() -> anyhow::Result<PathBuf> {
    let current_dir =
        std::env::current_dir().context("Failed to determine the current directory.")?;
    let current_dir =
        Utf8PathBuf::try_from(current_dir).context("Could not convert PathBuf to Utf8PathBuf")?;

    current_dir
        .ancestors()
        .map(|p| p.join("config"))
        .find(|p| {
            let base_path = p.join("base.yaml");
            p.exists() && p.is_dir() && base_path.exists() && base_path.is_file()
        })
        .and_then(|p| p.canonicalize().ok())
        .ok_or_else(|| anyhow::anyhow!("Cannot find config directory!"))
}

pub fn get_config_settings() -> anyhow::Result<Settings> {
    let config_directory = find_config_dir()?;

    // Detect the running environment - default to `development` if unspecified.
    let environment: String =
        std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".to_owned());

    // Read a the base configuration file called "base".
    let base_source = config::File::from(config_directory.join("base")).required(true);

    // Read another file for environment-specific values.
    let env_source = config::File::from(config_directory.join(environment.as_str())).required(true);

    // Finally grab any override settings from environment variables
    // (with a prefix of APP and '__' as separator).
    // e.g. `APP_PRICING__TAX_RATE=0.2 would set `Settings.pricing.tax_rate`
    let overrides_source = config::Environment::with_prefix("app").separator("__");

    let config = Config::builder()
        .add_source(base_source)
        .add_source(env_source)
        .add_source(overrides_source)
        .build()?;

    // Try converting the configuration values into our Settings type.
    config
        .try_deserialize()
        .context("Could not deserialise config settings.")
}
