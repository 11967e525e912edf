use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Top-level config (defaults + `MAILWAVE_*` env overrides, `__` nesting).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mongo: MongoConfig,
    #[serde(default)]
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Mail API endpoint messages are POSTed to.
    pub api_url: String,
    /// Bearer token for the mail API.
    pub api_key: String,
    /// Sender address stamped on every outbound message.
    pub from: String,
    pub subject: String,
    /// Maximum in-flight sends per campaign firing.
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            server: ServerConfig::default(),
            mongo: MongoConfig::default(),
            mail: MailConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Default for MongoConfig {
    fn default() -> MongoConfig {
        MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "mailwave".to_string(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> MailConfig {
        MailConfig {
            api_url: "http://localhost:8025/api/send".to_string(),
            api_key: String::new(),
            from: "newsletter@pattseheadshot.example".to_string(),
            subject: "Newsletter".to_string(),
            concurrency: 8,
        }
    }
}

impl Config {
    pub fn load() -> Result<Config, Error> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("MAILWAVE_").split("__"))
            .extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_environment() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load().unwrap();
            assert_eq!(config.server.bind, "127.0.0.1:8080");
            assert_eq!(config.mongo.database, "mailwave");
            assert_eq!(config.mail.concurrency, 8);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_nested_fields() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MAILWAVE_MONGO__URI", "mongodb://db:27017");
            jail.set_env("MAILWAVE_MAIL__FROM", "ops@example.com");
            let config = Config::load().unwrap();
            assert_eq!(config.mongo.uri, "mongodb://db:27017");
            assert_eq!(config.mail.from, "ops@example.com");
            Ok(())
        });
    }
}
