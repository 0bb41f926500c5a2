//! Server Configuration
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | HTTP_PORT | 8080 | HTTP listen port |
//! | SESSION_TTL_HOURS | 24 | Session lifetime |
//! | ENVIRONMENT | development | development \| staging \| production |
//! | SEED_DEMO_USERS | true outside production | Seed demo accounts at startup |

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API listen port
    pub http_port: u16,
    /// Fixed session lifetime in hours
    pub session_ttl_hours: i64,
    /// Running environment: development | staging | production
    pub environment: String,
    /// Whether to seed the demo accounts at startup
    pub seed_demo_users: bool,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable
    pub fn from_env() -> Self {
        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            session_ttl_hours: std::env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(24),
            seed_demo_users: std::env::var("SEED_DEMO_USERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(environment != "production"),
            environment,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
