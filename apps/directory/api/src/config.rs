use core_config::{AppInfo, FromEnv, app_info, env_optional, env_or_default, server::ServerConfig};
use database::postgres::PostgresConfig;
use domain_users::events::DEFAULT_TOPIC;

pub use core_config::Environment;

/// Application configuration, composed from the shared config components
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    pub server: ServerConfig,
    pub environment: Environment,
    /// Notifications are disabled when unset
    pub nats_url: Option<String>,
    pub events_topic: String,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?; // DATABASE_URL is required
        let server = ServerConfig::from_env()?;

        Ok(Self {
            app: app_info!(),
            database,
            server,
            environment,
            nats_url: env_optional("NATS_URL"),
            events_topic: env_or_default("USER_EVENTS_TOPIC", DEFAULT_TOPIC),
        })
    }
}
