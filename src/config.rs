use std::env;
use std::time::Duration;

/// Deployment environment, selected via `APP_ENV`.
///
/// Production never falls back to the in-memory store; development does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Connection string for the backing store. There is deliberately no
    /// built-in default: credentials must come from the environment.
    pub database_url: Option<String>,
    pub environment: Environment,
    /// Delay before the single production reconnect attempt.
    pub retry_delay: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env if present; absence is fine.
        dotenvy::dotenv().ok();

        // Build database_url from individual fields or use DATABASE_URL if provided.
        // A partial DB_* set without a password yields no URL at all rather than
        // a guessed credential.
        let database_url = if let Ok(url) = env::var("DATABASE_URL") {
            Some(url)
        } else if let (Ok(db_host), Ok(db_user), Ok(db_password)) = (
            env::var("DB_HOST"),
            env::var("DB_USER"),
            env::var("DB_PASSWORD"),
        ) {
            let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
            let db_name = env::var("DB_NAME").unwrap_or_else(|_| "docbridge".to_string());

            // URL-encode password to handle special characters
            let encoded_password = urlencoding::encode(&db_password);

            Some(format!(
                "postgres://{}:{}@{}:{}/{}",
                db_user, encoded_password, db_host, db_port, db_name
            ))
        } else {
            None
        };

        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        let retry_delay_secs: u64 = env::var("CONNECT_RETRY_DELAY_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        Ok(Config {
            database_url,
            environment,
            retry_delay: Duration::from_secs(retry_delay_secs),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            environment: Environment::Development,
            retry_delay: Duration::from_secs(5),
        }
    }
}
