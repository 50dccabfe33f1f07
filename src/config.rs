// config.rs
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub app_url: String,
    pub jwt_secret: String,
    /// Session lifetime in hours.
    pub jwt_maxage: i64,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub smtp_host: Option<String>,
    pub smtp_username: String,
    pub smtp_password: String,
    pub smtp_from: String,
    pub realtime_capacity: usize,
}

impl Config {
    pub fn init() -> Result<Config, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = lookup("JWT_SECRET_KEY").ok_or(ConfigError::Missing("JWT_SECRET_KEY"))?;
        let jwt_maxage = parse_or(&lookup, "JWT_MAXAGE", 24i64)?;
        let app_url = lookup("APP_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        let port = parse_or(&lookup, "PORT", 8000u16)?;
        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?;
        let realtime_capacity = parse_or(&lookup, "REALTIME_CAPACITY", 256usize)?;

        if jwt_maxage <= 0 {
            return Err(ConfigError::Invalid { key: "JWT_MAXAGE", value: jwt_maxage.to_string() });
        }
        if realtime_capacity == 0 {
            return Err(ConfigError::Invalid { key: "REALTIME_CAPACITY", value: "0".to_string() });
        }

        let allowed_origins = match lookup("ALLOWED_ORIGINS") {
            Some(origins) => origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            None => vec![app_url.clone()],
        };

        let smtp_host = lookup("SMTP_HOST").filter(|host| !host.is_empty());
        let smtp_username = lookup("SMTP_USERNAME").unwrap_or_default();
        let smtp_password = lookup("SMTP_PASSWORD").unwrap_or_default();
        let smtp_from = lookup("SMTP_FROM")
            .unwrap_or_else(|| "RailMatch <no-reply@railmatch.local>".to_string());

        Ok(Config {
            database_url,
            database_max_connections,
            app_url,
            jwt_secret,
            jwt_maxage,
            port,
            allowed_origins,
            smtp_host,
            smtp_username,
            smtp_password,
            smtp_from,
            realtime_capacity,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/railmatch"),
            ("JWT_SECRET_KEY", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8000);
        assert_eq!(config.jwt_maxage, 24);
        assert_eq!(config.app_url, "http://localhost:3000");
        assert_eq!(config.allowed_origins, vec!["http://localhost:3000".to_string()]);
        assert!(config.smtp_host.is_none());
        assert_eq!(config.realtime_capacity, 256);
    }

    #[test]
    fn missing_secret_is_reported() {
        let err = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET_KEY"));
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET_KEY", "secret"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Invalid { key: "PORT", value: "eighty".to_string() });
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET_KEY", "secret"),
            ("APP_URL", "https://railmatch.example/"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example ,"),
        ]))
        .unwrap();
        assert_eq!(config.app_url, "https://railmatch.example");
        assert_eq!(config.allowed_origins, vec!["https://a.example", "https://b.example"]);
    }
}
