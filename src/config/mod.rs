use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub telegram: TelegramConfig,
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
}

/// Telegram forwarder settings. Empty token or chat id means "not configured"
/// and the forwarder short-circuits without calling the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
}

/// Identity-provider admin endpoint used for best-effort account deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub admin_url: String,
    pub admin_key: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::defaults().with_env_overrides()
    }

    fn defaults() -> Self {
        Self {
            server: ServerConfig {
                port: 3000,
                cors_origins: vec![],
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
            },
            telegram: TelegramConfig {
                bot_token: String::new(),
                chat_id: String::new(),
                api_base: "https://api.telegram.org".to_string(),
            },
            identity: IdentityConfig {
                admin_url: String::new(),
                admin_key: String::new(),
            },
        }
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.server.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }

        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }

        if let Ok(v) = env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Ok(v) = env::var("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = v;
        }
        if let Ok(v) = env::var("TELEGRAM_API_BASE") {
            self.telegram.api_base = v;
        }

        if let Ok(v) = env::var("IDENTITY_ADMIN_URL") {
            self.identity.admin_url = v;
        }
        if let Ok(v) = env::var("IDENTITY_ADMIN_KEY") {
            self.identity.admin_key = v;
        }

        self
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = AppConfig::defaults();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert!(config.telegram.bot_token.is_empty());
    }
}
