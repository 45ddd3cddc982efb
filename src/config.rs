use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::BotError;

pub const DEFAULT_WHEEL_SECTORS: [i64; 10] =
    [0, 100, 250, 350, 400, 450, 500, 600, 750, 1000];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub admin: AdminConfig,
    pub bot: BotConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(alias = "aiohttp_session")]
    pub session: SessionConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub game: GameConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            database: "wordwheel".to_string(),
        }
    }
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub number_queues: u32,
    pub prefetch_count: u16,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            host: "localhost".to_string(),
            port: 5672,
            user: "guest".to_string(),
            password: "guest".to_string(),
            number_queues: 2,
            prefetch_count: 1,
        }
    }
}

impl BrokerConfig {
    pub fn url(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/%2f",
            self.user, self.password, self.host, self.port
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub min_number_of_participants: i64,
    pub wheel_sectors: Vec<i64>,
    pub sector_weights: Vec<u32>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            min_number_of_participants: 2,
            wheel_sectors: DEFAULT_WHEEL_SECTORS.to_vec(),
            sector_weights: vec![1; DEFAULT_WHEEL_SECTORS.len()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub port: u16,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, BotError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BotError::Config(format!("cannot read {}: {e}", path.display())))?;
        Config::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Config, BotError> {
        let config: Config =
            serde_yaml::from_str(raw).map_err(|e| BotError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), BotError> {
        if self.broker.number_queues == 0 {
            return Err(BotError::Config("broker.number_queues must be >= 1".into()));
        }
        if self.broker.prefetch_count == 0 {
            return Err(BotError::Config("broker.prefetch_count must be >= 1".into()));
        }
        if self.game.min_number_of_participants < 2 {
            return Err(BotError::Config(
                "game.min_number_of_participants must be >= 2".into(),
            ));
        }
        if self.game.wheel_sectors.is_empty() {
            return Err(BotError::Config("game.wheel_sectors must not be empty".into()));
        }
        if !self.game.sector_weights.is_empty()
            && self.game.sector_weights.len() != self.game.wheel_sectors.len()
        {
            return Err(BotError::Config(
                "game.sector_weights must match game.wheel_sectors in length".into(),
            ));
        }
        Ok(())
    }
}

/// `ENV=dev` reads the developer override, anything else the deployed path.
pub fn config_path() -> PathBuf {
    if std::env::var("ENV").is_ok_and(|v| v == "dev") {
        PathBuf::from("local/etc/config.yaml")
    } else {
        PathBuf::from("etc/config.yaml")
    }
}
