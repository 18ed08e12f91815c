//! Process configuration read from the environment.

use std::net::SocketAddr;

use actix_web::cookie::Key;
use thiserror::Error;
use tracing::warn;

/// Configuration failures that abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid socket address: {message}")]
    InvalidBindAddr { name: &'static str, message: String },
    #[error("failed to read session key at {path}: {message}")]
    UnreadableSessionKey { path: String, message: String },
}

/// Settings controlling the server process.
#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_uri: String,
    pub database_name: String,
    pub bind_addr: SocketAddr,
    pub session_key_file: String,
    pub session_cookie_secure: bool,
    pub session_allow_ephemeral: bool,
    pub mapbox_token: Option<String>,
    pub geocoding_country: String,
}

impl Config {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".into());
        let bind_addr = bind_addr
            .parse()
            .map_err(|err: std::net::AddrParseError| ConfigError::InvalidBindAddr {
                name: "BIND_ADDR",
                message: err.to_string(),
            })?;
        Ok(Self {
            mongodb_uri: get("MONGODB_URI").unwrap_or_else(|| "mongodb://localhost:27017".into()),
            database_name: get("DATABASE_NAME").unwrap_or_else(|| "riada".into()),
            bind_addr,
            session_key_file: get("SESSION_KEY_FILE")
                .unwrap_or_else(|| "/var/run/secrets/session_key".into()),
            session_cookie_secure: get("SESSION_COOKIE_SECURE").as_deref() != Some("0"),
            session_allow_ephemeral: get("SESSION_ALLOW_EPHEMERAL").as_deref() == Some("1"),
            mapbox_token: get("MAPBOX_TOKEN").filter(|token| !token.is_empty()),
            geocoding_country: get("GEOCODING_COUNTRY").unwrap_or_else(|| "ES".into()),
        })
    }

    /// Load the session signing key from disk.
    ///
    /// Outside debug builds an unreadable key file aborts startup unless
    /// `SESSION_ALLOW_EPHEMERAL=1` explicitly opts into a generated key.
    pub fn session_key(&self) -> Result<Key, ConfigError> {
        match std::fs::read(&self.session_key_file) {
            Ok(bytes) => Ok(Key::derive_from(&bytes)),
            Err(err) => {
                if cfg!(debug_assertions) || self.session_allow_ephemeral {
                    warn!(
                        path = %self.session_key_file,
                        error = %err,
                        "using temporary session key (dev only)"
                    );
                    Ok(Key::generate())
                } else {
                    Err(ConfigError::UnreadableSessionKey {
                        path: self.session_key_file.clone(),
                        message: err.to_string(),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[rstest]
    fn defaults_apply_when_the_environment_is_empty() {
        let config = config_from(&[]).expect("defaults");
        assert_eq!(config.mongodb_uri, "mongodb://localhost:27017");
        assert_eq!(config.database_name, "riada");
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.session_cookie_secure);
        assert!(!config.session_allow_ephemeral);
        assert!(config.mapbox_token.is_none());
        assert_eq!(config.geocoding_country, "ES");
    }

    #[rstest]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            ("BIND_ADDR", "127.0.0.1:9999"),
            ("DATABASE_NAME", "riada_test"),
            ("SESSION_COOKIE_SECURE", "0"),
            ("MAPBOX_TOKEN", "pk.test"),
            ("GEOCODING_COUNTRY", "PT"),
        ])
        .expect("valid");
        assert_eq!(config.bind_addr.port(), 9999);
        assert_eq!(config.database_name, "riada_test");
        assert!(!config.session_cookie_secure);
        assert_eq!(config.mapbox_token.as_deref(), Some("pk.test"));
        assert_eq!(config.geocoding_country, "PT");
    }

    #[rstest]
    fn blank_mapbox_tokens_count_as_absent() {
        let config = config_from(&[("MAPBOX_TOKEN", "")]).expect("valid");
        assert!(config.mapbox_token.is_none());
    }

    #[rstest]
    fn malformed_bind_addresses_are_rejected() {
        let err = config_from(&[("BIND_ADDR", "not-an-addr")]).expect_err("invalid");
        assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
    }
}
