use http::HeaderValue;

use crate::notify::PushCredentials;

const DEFAULT_API_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_LOG: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("incomplete push credentials: {0} is not set")]
    IncompletePush(&'static str),

    #[error("invalid origin in BAZAAR_ALLOWED_ORIGINS: {0:?}")]
    InvalidOrigin(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<HeaderValue>),
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_addr: String,
    /// `tracing-subscriber` env-filter directive.
    pub log: String,
    pub allowed_origins: AllowedOrigins,
    pub push: Option<PushCredentials>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_addr: DEFAULT_API_ADDR.into(),
            log: DEFAULT_LOG.into(),
            allowed_origins: AllowedOrigins::Any,
            push: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let allowed_origins = match get("BAZAAR_ALLOWED_ORIGINS") {
            None => AllowedOrigins::Any,
            Some(raw) if raw.trim() == "*" => AllowedOrigins::Any,
            Some(raw) => AllowedOrigins::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(|o| {
                        HeaderValue::from_str(o).map_err(|_| ConfigError::InvalidOrigin(o.into()))
                    })
                    .collect::<Result<_, _>>()?,
            ),
        };

        let project_id = get("BAZAAR_PUSH_PROJECT_ID");
        let client_email = get("BAZAAR_PUSH_CLIENT_EMAIL");
        let private_key = get("BAZAAR_PUSH_PRIVATE_KEY");
        let push = match (project_id, client_email, private_key) {
            (None, None, None) => None,
            (Some(project_id), Some(client_email), Some(private_key)) => Some(PushCredentials {
                project_id,
                client_email,
                private_key,
            }),
            (None, _, _) => return Err(ConfigError::IncompletePush("BAZAAR_PUSH_PROJECT_ID")),
            (_, None, _) => return Err(ConfigError::IncompletePush("BAZAAR_PUSH_CLIENT_EMAIL")),
            (_, _, None) => return Err(ConfigError::IncompletePush("BAZAAR_PUSH_PRIVATE_KEY")),
        };

        Ok(Self {
            api_addr: get("BAZAAR_API_ADDR").unwrap_or_else(|| DEFAULT_API_ADDR.into()),
            log: get("BAZAAR_LOG").unwrap_or_else(|| DEFAULT_LOG.into()),
            allowed_origins,
            push,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_addr, "0.0.0.0:3000");
        assert_eq!(config.log, "info");
        assert_eq!(config.allowed_origins, AllowedOrigins::Any);
        assert!(config.push.is_none());
    }

    #[test]
    fn origin_list() {
        let config = load(&[(
            "BAZAAR_ALLOWED_ORIGINS",
            "https://a.example, https://b.example",
        )])
        .unwrap();
        assert_eq!(
            config.allowed_origins,
            AllowedOrigins::List(vec![
                HeaderValue::from_static("https://a.example"),
                HeaderValue::from_static("https://b.example"),
            ])
        );
    }

    #[test]
    fn push_credentials_are_all_or_nothing() {
        let partial = load(&[
            ("BAZAAR_PUSH_PROJECT_ID", "bazaar"),
            ("BAZAAR_PUSH_PRIVATE_KEY", "key"),
        ]);
        assert!(matches!(
            partial,
            Err(ConfigError::IncompletePush("BAZAAR_PUSH_CLIENT_EMAIL"))
        ));

        let full = load(&[
            ("BAZAAR_PUSH_PROJECT_ID", "bazaar"),
            ("BAZAAR_PUSH_CLIENT_EMAIL", "push@bazaar.example"),
            ("BAZAAR_PUSH_PRIVATE_KEY", "key"),
        ])
        .unwrap();
        assert_eq!(full.push.unwrap().project_id, "bazaar");
    }
}
